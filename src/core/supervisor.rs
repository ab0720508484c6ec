//! # Supervisor: one pipeline per unit, staggered, with graceful shutdown.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], and the
//! global runtime configuration. It spawns one schedule-over-session
//! pipeline per discovered unit, handles OS signals, and waits for every
//! pipeline to reach a terminal state before the program exits.
//!
//! ```text
//! Inputs to run():
//!   Vec<Unit>  ──►  Supervisor::run()
//!
//! Spawn pipelines:
//!   Unit[0]   Unit[1]   ...   Unit[N-1]       (stagger baked into each Unit)
//!     │          │               │
//!     └──► schedule::supervise(unit, ...)     (one JoinSet task per unit)
//!               └──► child CancellationToken = root.child_token()
//!
//! Event flow:
//!   Session/Runner ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!
//! Shutdown path:
//!   shutdown::wait_for_shutdown_signal()
//!         └─► Bus.publish(ShutdownRequested)
//!         └─► root token.cancel()             → fans out to every unit
//!         └─► collect_with_grace():
//!                ├─ all joined in time  → AllStoppedWithin
//!                └─ grace exceeded      → GraceExceeded
//!                                         (AliveTracker names stuck units)
//! ```
//!
//! One unit's fatal failure never aborts sibling units: each pipeline
//! returns its own [`UnitReport`], and the supervisor only collects them.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::config::Config;
use crate::core::{schedule, shutdown};
use crate::error::{RuntimeError, UnitError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{AliveTracker, Subscriber, SubscriberSet};
use crate::units::Unit;

/// Final outcome of one unit's pipeline, for the CLI to summarize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Requested shutdown or schedule exhausted.
    Clean,
    /// Exec-format or configuration failure; the unit was given up on.
    FatalError,
    /// The circuit breaker halted a crash loop.
    RunawayRestart,
}

impl UnitOutcome {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            UnitOutcome::Clean => "clean",
            UnitOutcome::FatalError => "fatal_error",
            UnitOutcome::RunawayRestart => "runaway_restart",
        }
    }
}

/// Terminal report for one unit.
#[derive(Debug)]
pub struct UnitReport {
    /// Unit name (config base name).
    pub unit: String,
    /// The pipeline's result; `Ok` means a clean end.
    pub result: Result<(), UnitError>,
}

impl UnitReport {
    /// Collapses the result into the three-way outcome of the contract.
    pub fn outcome(&self) -> UnitOutcome {
        match &self.result {
            Ok(()) => UnitOutcome::Clean,
            Err(UnitError::RunawayRestart { .. }) => UnitOutcome::RunawayRestart,
            Err(_) => UnitOutcome::FatalError,
        }
    }
}

/// Coordinates unit pipelines, event delivery, and graceful shutdown.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    alive: Arc<AliveTracker>,
}

impl Supervisor {
    /// Creates a supervisor with the given config and subscribers. An
    /// [`AliveTracker`] is always appended so graceful shutdown can name
    /// stuck units.
    pub fn new(cfg: Config, mut subscribers: Vec<Arc<dyn Subscriber>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let alive = Arc::new(AliveTracker::new());
        subscribers.push(alive.clone());
        let subs = Arc::new(SubscriberSet::new(subscribers));
        Self {
            cfg,
            bus,
            subs,
            alive,
        }
    }

    /// The event bus shared with all pipelines.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs the given units until either:
    /// - every pipeline reaches a terminal state on its own, or
    /// - a termination signal arrives → graceful shutdown (which may end
    ///   with [`RuntimeError::GraceExceeded`]).
    pub async fn run(&self, units: Vec<Unit>) -> Result<Vec<UnitReport>, RuntimeError> {
        let token = CancellationToken::new();
        self.subscriber_listener();

        let mut set = JoinSet::new();
        self.spawn_pipelines(&mut set, &token, units);
        self.drive_shutdown(&mut set, &token).await
    }

    /// Subscribes to the bus and forwards events to the subscriber set
    /// (fire-and-forget).
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                set.emit(&ev);
            }
        });
    }

    /// Spawns one pipeline per unit into the join set.
    fn spawn_pipelines(&self, set: &mut JoinSet<UnitReport>, root: &CancellationToken, units: Vec<Unit>) {
        for unit in units {
            let token = root.child_token();
            let cfg = self.cfg.clone();
            let bus = self.bus.clone();
            set.spawn(async move {
                let result = schedule::supervise(&unit, &cfg, &bus, &token).await;
                let report = UnitReport {
                    unit: unit.name().to_string(),
                    result,
                };
                let mut ev = Event::new(EventKind::UnitTerminal)
                    .with_unit(&report.unit)
                    .with_reason(report.outcome().as_label());
                if let Err(e) = &report.result {
                    ev = ev.with_reason(format!("{}: {}", report.outcome().as_label(), e));
                }
                bus.publish(ev);
                report
            });
        }
    }

    /// Waits until all pipelines finish or a shutdown signal is received.
    async fn drive_shutdown(
        &self,
        set: &mut JoinSet<UnitReport>,
        root: &CancellationToken,
    ) -> Result<Vec<UnitReport>, RuntimeError> {
        let mut reports = Vec::new();
        tokio::select! {
            _ = shutdown::wait_for_shutdown_signal() => {
                self.bus.publish(Event::new(EventKind::ShutdownRequested));
                root.cancel();
                self.collect_with_grace(set, &mut reports).await?;
            }
            _ = collect_all(set, &mut reports) => {}
        }
        Ok(reports)
    }

    /// Collects the remaining pipelines within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns
    /// [`RuntimeError::GraceExceeded`] with the list of stuck units.
    async fn collect_with_grace(
        &self,
        set: &mut JoinSet<UnitReport>,
        reports: &mut Vec<UnitReport>,
    ) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, collect_all(set, reports)).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.alive.snapshot();
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

/// Drains the join set, keeping every pipeline's report.
async fn collect_all(set: &mut JoinSet<UnitReport>, reports: &mut Vec<UnitReport>) {
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            // A pipeline panicking is a bug; runs recover their own setup
            // failures. Log it and keep collecting siblings.
            Err(e) => error!(error = %e, "unit pipeline aborted"),
        }
    }
}

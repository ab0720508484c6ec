//! # Runtime events emitted by the supervisor and unit pipelines.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Run lifecycle**: a unit's process is starting, stopped, cooling down
//! - **Schedule**: a window opened or closed
//! - **Shutdown**: OS signal observed, all pipelines finished, grace exceeded
//! - **Terminal**: a unit's pipeline reached its final outcome
//!
//! The [`Event`] struct carries additional metadata such as timestamps, unit
//! names, exit-reason labels, and cooldown delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Run lifecycle ===
    /// A unit is about to spawn its process.
    ///
    /// Sets: `unit`, `attempt` (1-based within the session), `reason`
    /// (the command line being launched).
    UnitStarting,

    /// One process run ended and was classified.
    ///
    /// Sets: `unit`, `attempt`, `reason` (exit-reason label plus detail).
    RunStopped,

    /// The session is waiting out a cooldown before the next attempt.
    ///
    /// Sets: `unit`, `attempt`, `delay_ms`.
    CooldownScheduled,

    /// The output classifier observed the in-process shutdown command.
    ///
    /// Sets: `unit`, `actor` (identifier captured from the marker line).
    ShutdownMarkerSeen,

    // === Schedule ===
    /// A schedule window opened and a deadline-bound session begins.
    ///
    /// Sets: `unit`, `reason` (window bounds).
    WindowOpened,

    /// A schedule window's session ended, by deadline or shutdown.
    ///
    /// Sets: `unit`.
    WindowClosed,

    // === Shutdown ===
    /// Global shutdown requested (OS signal observed).
    ShutdownRequested,

    /// All unit pipelines finished within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some pipelines were abandoned.
    GraceExceeded,

    // === Terminal ===
    /// A unit's pipeline reached its final outcome.
    ///
    /// Sets: `unit`, `reason` (outcome label, error detail if any).
    UnitTerminal,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the unit, if applicable.
    pub unit: Option<Arc<str>>,
    /// Attempt count within the current session (starting from 1).
    pub attempt: Option<u32>,
    /// Cooldown delay before the next attempt, in milliseconds.
    pub delay_ms: Option<u64>,
    /// Human-readable detail (exit reasons, window bounds, errors).
    pub reason: Option<Arc<str>>,
    /// Actor identifier captured from a shutdown marker line.
    pub actor: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next global sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            unit: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            actor: None,
        }
    }

    /// Sets the unit name.
    pub fn with_unit(mut self, unit: impl AsRef<str>) -> Self {
        self.unit = Some(Arc::from(unit.as_ref()));
        self
    }

    /// Sets the attempt number (1-based within the session).
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Sets the cooldown delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Sets the human-readable detail string.
    pub fn with_reason(mut self, reason: impl AsRef<str>) -> Self {
        self.reason = Some(Arc::from(reason.as_ref()));
        self
    }

    /// Sets the actor identifier from a shutdown marker line.
    pub fn with_actor(mut self, actor: impl AsRef<str>) -> Self {
        self.actor = Some(Arc::from(actor.as_ref()));
        self
    }
}

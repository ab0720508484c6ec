//! # fleetvisor
//!
//! **Fleetvisor** supervises a fleet of independently configured server
//! processes on a single host: it discovers matching executable/config
//! pairs, launches each as a subprocess, restarts it on unexpected exit
//! with cooldowns, optionally enforces a recurring start/stop schedule,
//! and tells an operator-initiated shutdown apart from a crash by scanning
//! the child's live output for the admin shutdown marker.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │     Unit     │   │     Unit     │   │     Unit     │
//!     │ (exe + cfg)  │   │ (exe + cfg)  │   │ (exe + cfg)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (runtime orchestrator)                                │
//! │  - Bus (broadcast events)                                         │
//! │  - AliveTracker (names stuck units on grace timeout)              │
//! │  - SubscriberSet (fans out to subscribers, e.g. LogWriter)        │
//! │  - root CancellationToken (global shutdown, one per process)      │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌───────────┐     ┌───────────┐     ┌───────────┐
//!   │ pipeline  │     │ pipeline  │     │ pipeline  │   (one task per unit,
//!   │ (windows) │     │ (windows) │     │ (windows) │    staggered startup)
//!   └─────┬─────┘     └─────┬─────┘     └─────┬─────┘
//!         ▼                 ▼                 ▼
//!   ┌───────────┐     ┌───────────┐     ┌───────────┐
//!   │  Session  │     │  Session  │     │  Session  │   (restart loop +
//!   │           │     │           │     │           │    runaway breaker)
//!   └─────┬─────┘     └─────┬─────┘     └─────┬─────┘
//!         ▼                 ▼                 ▼
//!     run_once():  spawn child ──► stdout ──► classifier ──► run log file
//!                               └► stderr ──► buffer            + verdict
//!                  join(exit status, verdict) ──► ExitReason
//! ```
//!
//! ### Lifecycle of one unit
//! ```text
//! discover() ──► Unit ──► Supervisor ──► schedule::supervise()
//!
//! per window (or once, unscheduled):
//!   ├─► wait for (start + stagger), cancellable
//!   ├─► Session::run(deadline-bound token)
//!   │     loop {
//!   │       ├─► breaker tripped?  → RunawayRestart
//!   │       ├─► run_once()        → ExitReason
//!   │       └─► RestartPolicy::decide()
//!   │            ├─ Stop(Clean)   → manual/global shutdown
//!   │            ├─ Stop(Fatal)   → ExecFormat
//!   │            └─ Cool(delay)   → cancellable sleep, retry
//!   │     }
//!   └─► deadline expiry is expected; continue with the next window
//!
//! On exit: UnitTerminal event, UnitReport {clean | fatal | runaway}
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / functions                      |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Discovery**     | Pair executables with configs by filename convention.         | [`discover`], [`Unit`]                     |
//! | **Supervision**   | Restart loop, cooldowns, runaway breaker, schedule windows.   | [`Supervisor`], [`RestartPolicy`], [`Window`] |
//! | **Classification**| Tee child output to run logs, watch for the shutdown marker.  | [`ExitReason`], [`Verdict`]                |
//! | **Errors**        | Typed terminal outcomes per unit and for the runtime.         | [`UnitError`], [`RuntimeError`]            |
//! | **Observability** | Broadcast events, pluggable subscribers, log narration.       | [`Event`], [`Subscriber`], [`LogWriter`]   |
//! | **Configuration** | Centralized runtime knobs.                                    | [`Config`]                                 |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use fleetvisor::{Config, LogWriter, Subscriber, Supervisor, Unit};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let subs: Vec<Arc<dyn Subscriber>> = vec![Arc::new(LogWriter::new())];
//!     let supervisor = Supervisor::new(cfg.clone(), subs);
//!
//!     let units = vec![Unit::new(
//!         "./executables/zcatch_srv".into(),
//!         "./configs/autoexec_zcatch_srv_1.cfg".into(),
//!         "1",
//!         std::time::Duration::ZERO,
//!         Vec::new(),
//!     )];
//!
//!     for report in supervisor.run(units).await? {
//!         println!("{}: {}", report.unit, report.outcome().as_label());
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod policies;
mod process;
mod subscribers;
mod units;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::{Supervisor, UnitOutcome, UnitReport, Window};
pub use error::{RuntimeError, UnitError};
pub use events::{Bus, Event, EventKind};
pub use policies::{Decision, RestartPolicy, RestartStats, SessionState, StopKind};
pub use process::{ExitReason, Verdict};
pub use subscribers::{AliveTracker, LogWriter, Subscriber, SubscriberSet};
pub use units::{discover, Unit};

// The schedule builders are part of the public surface so the CLI can
// validate operator input before any unit starts.
pub use crate::core::schedule::{build_windows, start_wait};

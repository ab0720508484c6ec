//! Restart policy and session statistics.
//!
//! This module groups the knobs that control **if/when** a unit's process is
//! restarted and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`RestartPolicy`] maps an exit reason to stop/cool decisions and hosts
//!   the runaway-restart breaker
//! - [`RestartStats`] cumulative per-session restart bookkeeping
//! - [`SessionState`], [`Decision`], [`StopKind`] the state machine alphabet
//!
//! ## Quick wiring
//! ```text
//! Config ──► Config::restart_policy() ──► core::session::Session uses:
//!             - tripped(stats) before each spawn (breaker)
//!             - decide(exit_reason) after each run (stop / cool)
//! ```

mod restart;

pub use restart::{Decision, RestartPolicy, RestartStats, SessionState, StopKind};

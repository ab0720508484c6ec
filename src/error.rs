//! Error types used by the fleetvisor runtime and unit pipelines.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] — errors raised by the orchestration runtime itself.
//! - [`UnitError`] — terminal per-unit failures reported by a unit's pipeline.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging
//! and summaries. Run-level problems (a crashed child, a blocked port) are
//! not errors at this level: the session absorbs them and either retries or
//! converts them into one of the [`UnitError`] variants below.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the fleetvisor runtime.
///
/// These represent failures in the supervision system itself, such as a
/// shutdown sequence exceeding its grace period. Per-unit failures are
/// reported separately as [`UnitError`] and never abort sibling units.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some unit pipelines were still
    /// running and had to be abandoned.
    #[error("shutdown grace {grace:?} exceeded; still running: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of units whose pipelines did not finish in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck units={stuck:?}")
            }
        }
    }
}

/// # Terminal errors for one supervised unit.
///
/// A unit pipeline ends with `Ok(())` when its process was shut down on
/// purpose (in-process shutdown command, OS signal, schedule exhausted) and
/// with one of these variants otherwise. One unit's error never propagates
/// past its own pipeline.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UnitError {
    /// Schedule start/stop lists have different lengths. Reported before the
    /// unit's first session; no process is ever spawned for it.
    #[error("schedule mismatch: {starts} start times vs {stops} stop times")]
    ScheduleMismatch {
        /// Number of configured start instants.
        starts: usize,
        /// Number of configured stop instants.
        stops: usize,
    },

    /// The executable is not valid for this host platform. Never retried.
    #[error("executable not built for this platform: {executable}")]
    ExecFormat {
        /// Path of the offending executable.
        executable: String,
    },

    /// The circuit breaker tripped: the process kept dying almost
    /// immediately after each restart.
    #[error("too many restarts within a short period: {restarts} restarts, {avg_run:?} average run time")]
    RunawayRestart {
        /// Restarts performed before the breaker tripped.
        restarts: u32,
        /// Average run duration across those restarts.
        avg_run: Duration,
    },
}

impl UnitError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use fleetvisor::UnitError;
    ///
    /// let err = UnitError::ScheduleMismatch { starts: 2, stops: 1 };
    /// assert_eq!(err.as_label(), "schedule_mismatch");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            UnitError::ScheduleMismatch { .. } => "schedule_mismatch",
            UnitError::ExecFormat { .. } => "exec_format",
            UnitError::RunawayRestart { .. } => "runaway_restart",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            UnitError::ScheduleMismatch { starts, stops } => {
                format!("schedule mismatch: starts={starts} stops={stops}")
            }
            UnitError::ExecFormat { executable } => {
                format!("not built for this platform: {executable}")
            }
            UnitError::RunawayRestart { restarts, avg_run } => {
                format!("runaway restarts: count={restarts} avg={avg_run:?}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let e = UnitError::ExecFormat {
            executable: "srv".into(),
        };
        assert_eq!(e.as_label(), "exec_format");

        let e = UnitError::RunawayRestart {
            restarts: 6,
            avg_run: Duration::from_secs(1),
        };
        assert_eq!(e.as_label(), "runaway_restart");

        let e = RuntimeError::GraceExceeded {
            grace: Duration::from_secs(5),
            stuck: vec!["a".into()],
        };
        assert_eq!(e.as_label(), "runtime_grace_exceeded");
    }

    #[test]
    fn test_messages_carry_details() {
        let e = UnitError::ScheduleMismatch { starts: 3, stops: 2 };
        assert!(e.as_message().contains("starts=3"));
        assert!(e.as_message().contains("stops=2"));
    }
}

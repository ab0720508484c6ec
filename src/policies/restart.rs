//! # Restart policy: the session state machine, as pure data.
//!
//! A session moves through the states below; the mapping from one run's
//! [`ExitReason`] to the next transition lives here so it can be tested
//! without spawning real processes.
//!
//! ```text
//! Idle ──► Starting ──► Running ──┬─► Cooling ──► Starting (next attempt)
//!                                 └─► Stopped  (shutdown / fatal / breaker)
//! ```
//!
//! ## Rules
//! - Requested shutdowns (manual or global) stop the session **successfully**.
//! - An exec-format failure stops it with a fatal error; no retry.
//! - Every other exit cools down for the flat [`RestartPolicy::cooldown`];
//!   a port conflict additionally waits [`RestartPolicy::conflict_cooldown`]
//!   first.
//! - The runaway breaker is evaluated **before** a new spawn, never after:
//!   a crash-looping process does not get one more free attempt.

use std::time::Duration;

use crate::process::ExitReason;

/// States a supervision session moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created, nothing spawned yet.
    Idle,
    /// About to spawn the process.
    Starting,
    /// Process is running.
    Running,
    /// Waiting out a cooldown before the next attempt.
    Cooling,
    /// Terminal; the session never resumes.
    Stopped,
}

/// How a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    /// Requested shutdown; reported as success.
    Clean,
    /// Fatal failure; reported as a per-unit error.
    Fatal,
}

/// Next step after one run, as decided by [`RestartPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Stop the session; no further attempt.
    Stop(StopKind),
    /// Wait `after`, then spawn again.
    Cool {
        /// Total cooldown before the next attempt.
        after: Duration,
    },
}

impl Decision {
    /// State the session enters when acting on this decision.
    pub fn next_state(&self) -> SessionState {
        match self {
            Decision::Stop(_) => SessionState::Stopped,
            Decision::Cool { .. } => SessionState::Cooling,
        }
    }
}

/// Cumulative restart statistics for one session.
///
/// The restart count only increases; a session is never resumed once ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartStats {
    /// Completed runs in this session.
    pub restarts: u32,
    /// Cumulative wall time the process spent running across all runs.
    pub busy: Duration,
}

impl RestartStats {
    /// Records one completed run of the given duration.
    pub fn record(&mut self, ran_for: Duration) {
        self.restarts = self.restarts.saturating_add(1);
        self.busy = self.busy.saturating_add(ran_for);
    }

    /// Average run duration, or zero before the first run.
    pub fn avg_run(&self) -> Duration {
        if self.restarts == 0 {
            Duration::ZERO
        } else {
            self.busy / self.restarts
        }
    }
}

/// Parameters of the restart loop: cooldowns and the runaway breaker.
///
/// Derived from [`Config`](crate::Config) via
/// [`Config::restart_policy`](crate::Config::restart_policy); all values are
/// configuration, not fixed behavior.
#[derive(Debug, Clone, Copy)]
pub struct RestartPolicy {
    /// Flat pause applied after every exit.
    pub cooldown: Duration,
    /// Additional pause after a port conflict.
    pub conflict_cooldown: Duration,
    /// Restart count after which the breaker arms.
    pub breaker_min_restarts: u32,
    /// Average run duration below which an armed breaker trips.
    pub breaker_avg_floor: Duration,
}

impl RestartPolicy {
    /// Maps one run's exit reason to the session's next step.
    ///
    /// Pure: no clocks, no I/O. The session applies the returned decision
    /// and owns the actual sleeping.
    pub fn decide(&self, reason: &ExitReason) -> Decision {
        match reason {
            ExitReason::ManualShutdown { .. } | ExitReason::GlobalShutdown => {
                Decision::Stop(StopKind::Clean)
            }
            ExitReason::ExecFormatError => Decision::Stop(StopKind::Fatal),
            ExitReason::PortConflict => Decision::Cool {
                after: self.cooldown.saturating_add(self.conflict_cooldown),
            },
            ExitReason::OtherError { .. } | ExitReason::CleanExit => Decision::Cool {
                after: self.cooldown,
            },
        }
    }

    /// True when the runaway breaker should halt the session.
    ///
    /// Trips once the restart count exceeds
    /// [`RestartPolicy::breaker_min_restarts`] and the average run duration
    /// sits below [`RestartPolicy::breaker_avg_floor`]. Call this at the top
    /// of the loop, before spawning.
    pub fn tripped(&self, stats: &RestartStats) -> bool {
        stats.restarts > self.breaker_min_restarts
            && stats.avg_run() < self.breaker_avg_floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RestartPolicy {
        RestartPolicy {
            cooldown: Duration::from_secs(3),
            conflict_cooldown: Duration::from_secs(10),
            breaker_min_restarts: 5,
            breaker_avg_floor: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_shutdown_reasons_stop_cleanly() {
        let p = policy();
        let manual = ExitReason::ManualShutdown { actor: "12".into() };
        assert_eq!(p.decide(&manual), Decision::Stop(StopKind::Clean));
        assert_eq!(
            p.decide(&ExitReason::GlobalShutdown),
            Decision::Stop(StopKind::Clean)
        );
    }

    #[test]
    fn test_exec_format_stops_fatally() {
        assert_eq!(
            policy().decide(&ExitReason::ExecFormatError),
            Decision::Stop(StopKind::Fatal)
        );
    }

    #[test]
    fn test_port_conflict_gets_extended_cooldown() {
        let p = policy();
        assert_eq!(
            p.decide(&ExitReason::PortConflict),
            Decision::Cool {
                after: Duration::from_secs(13)
            }
        );
    }

    #[test]
    fn test_plain_exits_get_flat_cooldown() {
        let p = policy();
        for reason in [
            ExitReason::CleanExit,
            ExitReason::OtherError {
                message: "exit status 1".into(),
            },
        ] {
            assert_eq!(
                p.decide(&reason),
                Decision::Cool {
                    after: Duration::from_secs(3)
                }
            );
        }
    }

    #[test]
    fn test_decision_states() {
        assert_eq!(
            Decision::Stop(StopKind::Clean).next_state(),
            SessionState::Stopped
        );
        assert_eq!(
            Decision::Cool {
                after: Duration::ZERO
            }
            .next_state(),
            SessionState::Cooling
        );
    }

    #[test]
    fn test_breaker_requires_count_above_threshold() {
        let p = policy();
        let mut stats = RestartStats::default();
        for _ in 0..5 {
            stats.record(Duration::from_secs(1));
        }
        // Exactly at the threshold: still allowed one more run.
        assert!(!p.tripped(&stats));

        stats.record(Duration::from_secs(1));
        assert!(p.tripped(&stats));
    }

    #[test]
    fn test_breaker_spares_long_running_processes() {
        let p = policy();
        let mut stats = RestartStats::default();
        for _ in 0..10 {
            stats.record(Duration::from_secs(3600));
        }
        assert!(!p.tripped(&stats));
    }

    #[test]
    fn test_breaker_uses_cumulative_average() {
        let p = policy();
        let mut stats = RestartStats::default();
        // One long run followed by quick crashes: average stays high enough
        // until the crashes dominate.
        stats.record(Duration::from_secs(3600));
        for _ in 0..5 {
            stats.record(Duration::from_millis(100));
        }
        assert_eq!(stats.restarts, 6);
        assert_eq!(stats.avg_run(), stats.busy / 6);
        assert!(!p.tripped(&stats));
    }

    #[test]
    fn test_stats_only_increase() {
        let mut stats = RestartStats::default();
        stats.record(Duration::from_secs(2));
        stats.record(Duration::from_secs(4));
        assert_eq!(stats.restarts, 2);
        assert_eq!(stats.busy, Duration::from_secs(6));
        assert_eq!(stats.avg_run(), Duration::from_secs(3));
    }
}

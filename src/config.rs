//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the supervisor runtime.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::new(config, subscribers)`
//! 2. **Session policy**: `config.restart_policy()` feeds the per-session
//!    restart state machine.
//!
//! The cooldown and breaker values default to the knobs the fleet has been
//! operated with for years: a flat few-second pause after every exit, a
//! longer pause after a port conflict, and a breaker that halts a process
//! dying almost immediately more than a handful of times in a row.

use std::path::PathBuf;
use std::time::Duration;

use crate::policies::RestartPolicy;

/// Global configuration for the supervisor runtime.
///
/// Defines:
/// - **Restart behavior**: cooldowns and the runaway-restart breaker
/// - **Scheduling**: startup stagger step and minimum window length
/// - **Shutdown behavior**: grace period for pipelines to finish
/// - **Event system**: bus capacity for event delivery
/// - **Log sink**: directory for per-run child log files
#[derive(Clone, Debug)]
pub struct Config {
    /// Flat pause applied after every process exit before the next attempt.
    pub cooldown: Duration,

    /// Additional pause applied after a port-conflict exit, on top of
    /// [`Config::cooldown`].
    pub conflict_cooldown: Duration,

    /// Number of restarts after which the runaway breaker arms.
    pub breaker_min_restarts: u32,

    /// Average run duration below which an armed breaker trips.
    pub breaker_avg_floor: Duration,

    /// Per-unit startup delay step; unit `i` waits `i × stagger_step` before
    /// its first spawn. Purely keeps interleaved log output readable.
    pub stagger_step: Duration,

    /// Minimum effective length of a schedule window. A window whose stop
    /// instant is not strictly after its start is stretched to this length.
    pub min_window: Duration,

    /// Maximum time to wait for unit pipelines to finish after a shutdown
    /// signal before reporting them stuck.
    pub grace: Duration,

    /// Capacity of the event bus broadcast ring buffer (min 1; clamped).
    pub bus_capacity: usize,

    /// Directory receiving one timestamped log file per process run.
    pub logs_dir: PathBuf,
}

impl Config {
    /// Returns the restart policy derived from the cooldown and breaker
    /// fields, ready to hand to a session.
    #[inline]
    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy {
            cooldown: self.cooldown,
            conflict_cooldown: self.conflict_cooldown,
            breaker_min_restarts: self.breaker_min_restarts,
            breaker_avg_floor: self.breaker_avg_floor,
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `cooldown = 3s`, `conflict_cooldown = 10s`
    /// - `breaker_min_restarts = 5`, `breaker_avg_floor = 60s`
    /// - `stagger_step = 1s`, `min_window = 5s`
    /// - `grace = 60s`, `bus_capacity = 1024`
    /// - `logs_dir = ./logs`
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(3),
            conflict_cooldown: Duration::from_secs(10),
            breaker_min_restarts: 5,
            breaker_avg_floor: Duration::from_secs(60),
            stagger_step: Duration::from_secs(1),
            min_window: Duration::from_secs(5),
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            logs_dir: PathBuf::from("./logs"),
        }
    }
}

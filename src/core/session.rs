//! # Session: one bounded attempt to keep a unit's process running.
//!
//! A session repeatedly invokes the process runner until a terminal
//! condition, applying the restart policy between runs. It is scoped either
//! to the lifetime of the program (no schedule) or to one schedule window
//! (deadline-bound token); once a session ends it is never resumed.
//!
//! ```text
//! loop {
//!   ├─► token cancelled?           → stop, success
//!   ├─► breaker tripped?           → stop, RunawayRestart   (before spawn!)
//!   ├─► publish UnitStarting
//!   ├─► run_once()                 → ExitReason
//!   ├─► record run duration
//!   ├─► publish RunStopped
//!   └─► RestartPolicy::decide()
//!        ├─► Stop(Clean)           → success (manual/global shutdown)
//!        ├─► Stop(Fatal)           → UnitError::ExecFormat
//!        └─► Cool { after }        → cancellable sleep, next attempt
//! }
//! ```
//!
//! ## Rules
//! - Runs are strictly sequential; there is never a second live process.
//! - Cancellation is observed at the top of every iteration and during the
//!   cooldown sleep; it always wins over starting a new run.
//! - The breaker is checked before a spawn so a crash-looping process does
//!   not get one more free attempt.

use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::UnitError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{Decision, RestartPolicy, RestartStats, StopKind};
use crate::process::{run_once, ExitReason};
use crate::units::Unit;

/// Drives one unit's restart loop under a cancellable context.
pub struct Session<'a> {
    unit: &'a Unit,
    policy: RestartPolicy,
    logs_dir: &'a Path,
    bus: &'a Bus,
}

impl<'a> Session<'a> {
    /// Creates a session for one unit.
    pub fn new(unit: &'a Unit, policy: RestartPolicy, logs_dir: &'a Path, bus: &'a Bus) -> Self {
        Self {
            unit,
            policy,
            logs_dir,
            bus,
        }
    }

    /// Runs until a requested shutdown (success), a fatal exit reason, or
    /// the runaway breaker. Cancellation of `token` ends the session
    /// successfully, whether it fired mid-run or mid-cooldown.
    pub async fn run(&self, token: &CancellationToken) -> Result<(), UnitError> {
        let mut stats = RestartStats::default();

        loop {
            if token.is_cancelled() {
                return Ok(());
            }
            if self.policy.tripped(&stats) {
                return Err(UnitError::RunawayRestart {
                    restarts: stats.restarts,
                    avg_run: stats.avg_run(),
                });
            }

            let attempt = stats.restarts + 1;
            self.bus.publish(
                Event::new(EventKind::UnitStarting)
                    .with_unit(self.unit.name())
                    .with_attempt(attempt)
                    .with_reason(self.unit.command_line()),
            );

            let started = Instant::now();
            let reason = run_once(self.unit, self.logs_dir, token, self.bus).await;
            stats.record(started.elapsed());

            self.bus.publish(
                Event::new(EventKind::RunStopped)
                    .with_unit(self.unit.name())
                    .with_attempt(attempt)
                    .with_reason(describe(&reason)),
            );

            let decision = self.policy.decide(&reason);
            debug!(
                unit = self.unit.name(),
                reason = reason.as_label(),
                next = ?decision.next_state(),
                "restart decision"
            );

            match decision {
                Decision::Stop(StopKind::Clean) => return Ok(()),
                Decision::Stop(StopKind::Fatal) => {
                    return Err(UnitError::ExecFormat {
                        executable: self.unit.executable.display().to_string(),
                    })
                }
                Decision::Cool { after } => {
                    self.bus.publish(
                        Event::new(EventKind::CooldownScheduled)
                            .with_unit(self.unit.name())
                            .with_attempt(attempt)
                            .with_delay(after),
                    );
                    if !sleep_cancellable(after, token).await {
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Sleeps for `dur`; returns false if the token fired first.
async fn sleep_cancellable(dur: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(dur) => true,
        _ = token.cancelled() => false,
    }
}

fn describe(reason: &ExitReason) -> String {
    match reason {
        ExitReason::ManualShutdown { actor } => {
            format!("manual shutdown by actor {actor}")
        }
        ExitReason::OtherError { message } => format!("error: {message}"),
        other => other.as_label().to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn unit_for(dir: &Path, executable: PathBuf) -> Unit {
        let config = dir.join("autoexec_test_srv_1.cfg");
        std::fs::write(&config, b"# test\n").unwrap();
        Unit::new(executable, config, "1", Duration::ZERO, Vec::new())
    }

    /// Fast policy so crash-loop tests finish in milliseconds.
    fn fast_policy() -> RestartPolicy {
        RestartPolicy {
            cooldown: Duration::from_millis(10),
            conflict_cooldown: Duration::from_millis(20),
            breaker_min_restarts: 2,
            breaker_avg_floor: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_manual_shutdown_ends_session_without_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = script(
            tmp.path(),
            "srv",
            "echo \"[x][y]: 0=1 rcon='shutdown'\"\nexit 1",
        );
        let unit = unit_for(tmp.path(), exe);
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();

        let logs = tmp.path().join("logs");
        let session = Session::new(&unit, fast_policy(), &logs, &bus);
        session.run(&token).await.unwrap();

        let mut starts = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::UnitStarting {
                starts += 1;
            }
        }
        assert_eq!(starts, 1, "a requested shutdown must not be restarted");
    }

    #[tokio::test]
    async fn test_crash_loop_trips_breaker() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = script(tmp.path(), "srv", "exit 1");
        let unit = unit_for(tmp.path(), exe);
        let bus = Bus::new(64);
        let token = CancellationToken::new();

        let logs = tmp.path().join("logs");
        let session = Session::new(&unit, fast_policy(), &logs, &bus);
        let err = session.run(&token).await.unwrap_err();
        match err {
            UnitError::RunawayRestart { restarts, .. } => {
                assert_eq!(restarts, 3, "breaker trips before attempt N+1 spawns");
            }
            other => panic!("expected RunawayRestart, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exec_format_stops_after_single_attempt() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = tmp.path().join("srv");
        std::fs::write(&exe, [0u8, 1, 2, 3]).unwrap();
        let mut perms = std::fs::metadata(&exe).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&exe, perms).unwrap();
        let unit = unit_for(tmp.path(), exe);
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();

        let logs = tmp.path().join("logs");
        let session = Session::new(&unit, fast_policy(), &logs, &bus);
        let err = session.run(&token).await.unwrap_err();
        assert!(matches!(err, UnitError::ExecFormat { .. }));

        let mut starts = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::UnitStarting {
                starts += 1;
            }
        }
        assert_eq!(starts, 1);
    }

    #[tokio::test]
    async fn test_port_conflict_selects_extended_cooldown() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = script(tmp.path(), "srv", "exit 255");
        let unit = unit_for(tmp.path(), exe);
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();

        let policy = fast_policy();
        let logs = tmp.path().join("logs");
        let session = Session::new(&unit, policy, &logs, &bus);
        // Breaker ends the loop after a few conflict exits.
        let _ = session.run(&token).await;

        let mut cooldowns = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::CooldownScheduled {
                cooldowns.push(ev.delay_ms.unwrap());
            }
        }
        assert!(!cooldowns.is_empty());
        for delay in cooldowns {
            assert_eq!(
                delay, 30,
                "conflict cooldown is flat + extended, not flat alone"
            );
        }
    }

    #[tokio::test]
    async fn test_cancellation_during_cooldown_ends_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = script(tmp.path(), "srv", "exit 0");
        let unit = unit_for(tmp.path(), exe);
        let bus = Bus::new(64);
        let token = CancellationToken::new();

        let policy = RestartPolicy {
            cooldown: Duration::from_secs(3600),
            ..fast_policy()
        };
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        });

        let logs = tmp.path().join("logs");
        let session = Session::new(&unit, policy, &logs, &bus);
        let started = Instant::now();
        session.run(&token).await.unwrap();
        assert!(
            started.elapsed() < Duration::from_secs(30),
            "cooldown sleep must observe cancellation"
        );
    }
}

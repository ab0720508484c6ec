//! # Process runner: one invocation of one unit's child process.
//!
//! Runs the child to completion with its stdout flowing through the
//! [`classifier`](crate::process::classifier) into a fresh per-run log
//! file, stderr captured into a buffer, and the whole run bound to a
//! cancellable context.
//!
//! ```text
//! spawn ──► child stdout ──► classifier task ──► log file + verdict
//!       └─► child stderr ──► collector task ──► buffer
//!
//! select! { child exits | context cancelled → kill, then wait }
//! join classifier + collector            (pipe fully drained)
//! reconcile(status, verdict, stderr) ──► ExitReason
//! ```
//!
//! ## Rules
//! - Cancellation wins over everything: a run whose context fired is
//!   [`ExitReason::GlobalShutdown`] no matter how the process actually died.
//! - The shutdown marker beats the exit status: an in-process shutdown can
//!   still exit non-zero.
//! - Every setup failure (log file, spawn, missing pipes) is converted into
//!   a retryable [`ExitReason::OtherError`] instead of unwinding, so the
//!   owning session survives and can try again. The one exception is an
//!   exec-format spawn error, which is fatal.

use std::io;
use std::path::Path;

use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::events::{Bus, Event, EventKind};
use crate::process::classifier::{self, Verdict};
use crate::process::exit::ExitReason;
use crate::process::logfile;
use crate::units::Unit;

/// Cap on the stderr excerpt carried into an [`ExitReason::OtherError`].
const STDERR_EXCERPT: usize = 512;

/// Runs the unit's process once and classifies how it ended.
///
/// Blocks until the process has actually exited **and** its stdout stream
/// is fully drained; only then is the exit reconciled.
pub async fn run_once(
    unit: &Unit,
    logs_dir: &Path,
    token: &CancellationToken,
    bus: &Bus,
) -> ExitReason {
    let (log_path, log_file) = match logfile::create(logs_dir, &unit.config_file).await {
        Ok(created) => created,
        Err(e) => {
            return ExitReason::OtherError {
                message: format!("failed to create log file: {e}"),
            }
        }
    };
    debug!(unit = unit.name(), log = %log_path.display(), "run log file created");

    let mut child = match unit.command().spawn() {
        Ok(child) => child,
        Err(e) if is_exec_format(&e) => return ExitReason::ExecFormatError,
        Err(e) => {
            return ExitReason::OtherError {
                message: format!("failed to start {}: {e}", unit.command_line()),
            }
        }
    };

    let Some(stdout) = child.stdout.take() else {
        let _ = child.start_kill();
        let _ = child.wait().await;
        return ExitReason::OtherError {
            message: "child stdout pipe missing".to_string(),
        };
    };
    let stderr = child.stderr.take();

    let classify = classifier::spawn(BufReader::new(stdout), log_file);
    let collect_stderr = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_end(&mut buf).await;
        }
        buf
    });

    let status = tokio::select! {
        status = child.wait() => status,
        _ = token.cancelled() => {
            // Deliver the kill, then wait for the real exit; reporting
            // completion before the process is gone would let a second
            // live child overlap the next run.
            let _ = child.start_kill();
            child.wait().await
        }
    };

    // The run is not over until the pipe is drained: join the classifier
    // before reconciling so no buffered output is lost.
    let verdict = match classify.await {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(_)) | Err(_) => Verdict::Eof,
    };
    let stderr_buf = collect_stderr.await.unwrap_or_default();

    reconcile(unit, token, status, verdict, &stderr_buf, bus)
}

/// Produces the single [`ExitReason`] for a finished run.
fn reconcile(
    unit: &Unit,
    token: &CancellationToken,
    status: io::Result<std::process::ExitStatus>,
    verdict: Verdict,
    stderr: &[u8],
    bus: &Bus,
) -> ExitReason {
    if token.is_cancelled() {
        return ExitReason::GlobalShutdown;
    }

    if let Verdict::Marker { actor } = verdict {
        bus.publish(
            Event::new(EventKind::ShutdownMarkerSeen)
                .with_unit(unit.name())
                .with_actor(&actor),
        );
        return ExitReason::ManualShutdown { actor };
    }

    match status {
        Ok(status) if status.success() => ExitReason::CleanExit,
        Ok(status) if status.code() == Some(255) => ExitReason::PortConflict,
        Ok(status) => ExitReason::OtherError {
            message: describe_failure(&status, stderr),
        },
        Err(e) => ExitReason::OtherError {
            message: format!("failed to wait for {}: {e}", unit.command_line()),
        },
    }
}

fn describe_failure(status: &std::process::ExitStatus, stderr: &[u8]) -> String {
    let excerpt = String::from_utf8_lossy(stderr);
    let excerpt = excerpt.trim();
    if excerpt.is_empty() {
        format!("{status}")
    } else {
        let excerpt: String = excerpt.chars().take(STDERR_EXCERPT).collect();
        format!("{status}: {excerpt}")
    }
}

/// ENOEXEC from the spawn: the file exists and is executable, but is not a
/// valid binary for this platform.
#[cfg(unix)]
fn is_exec_format(err: &io::Error) -> bool {
    err.raw_os_error() == Some(8) // ENOEXEC
}

#[cfg(not(unix))]
fn is_exec_format(_err: &io::Error) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Writes an executable shell script standing in for a server binary.
    /// The runner invokes it as `<script> -f <config>`; the scripts ignore
    /// the arguments.
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
        std::fs::write(&config, b"# test config\n").unwrap();
        Unit::new(executable, config, "1", Duration::ZERO, Vec::new())
    }

    fn fixture() -> (tempfile::TempDir, Bus, CancellationToken) {
        (tempfile::tempdir().unwrap(), Bus::new(64), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_clean_exit() {
        let (tmp, bus, token) = fixture();
        let exe = script(tmp.path(), "srv", "exit 0");
        let unit = unit_for(tmp.path(), exe);
        let reason = run_once(&unit, &tmp.path().join("logs"), &token, &bus).await;
        assert_eq!(reason, ExitReason::CleanExit);
    }

    #[tokio::test]
    async fn test_exit_255_is_port_conflict() {
        let (tmp, bus, token) = fixture();
        let exe = script(tmp.path(), "srv", "exit 255");
        let unit = unit_for(tmp.path(), exe);
        let reason = run_once(&unit, &tmp.path().join("logs"), &token, &bus).await;
        assert_eq!(reason, ExitReason::PortConflict);
    }

    #[tokio::test]
    async fn test_marker_beats_error_exit_code() {
        let (tmp, bus, token) = fixture();
        let exe = script(
            tmp.path(),
            "srv",
            "echo \"[x][y]: 0=123 rcon='shutdown'\"\nexit 1",
        );
        let unit = unit_for(tmp.path(), exe);
        let mut rx = bus.subscribe();
        let reason = run_once(&unit, &tmp.path().join("logs"), &token, &bus).await;
        assert_eq!(
            reason,
            ExitReason::ManualShutdown {
                actor: "123".into()
            }
        );
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ShutdownMarkerSeen);
        assert_eq!(ev.actor.as_deref(), Some("123"));
    }

    #[tokio::test]
    async fn test_cancellation_yields_global_shutdown() {
        let (tmp, bus, token) = fixture();
        let exe = script(tmp.path(), "srv", "sleep 30");
        let unit = unit_for(tmp.path(), exe);

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let reason = run_once(&unit, &tmp.path().join("logs"), &token, &bus).await;
        // Killed by signal, but the cancellation caused it.
        assert_eq!(reason, ExitReason::GlobalShutdown);
    }

    #[tokio::test]
    async fn test_exec_format_error_on_invalid_binary() {
        let (tmp, bus, token) = fixture();
        // Executable bit set, but not a valid binary and no shebang.
        let exe = tmp.path().join("srv");
        std::fs::write(&exe, [0u8, 1, 2, 3]).unwrap();
        let mut perms = std::fs::metadata(&exe).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&exe, perms).unwrap();

        let unit = unit_for(tmp.path(), exe);
        let reason = run_once(&unit, &tmp.path().join("logs"), &token, &bus).await;
        assert_eq!(reason, ExitReason::ExecFormatError);
    }

    #[tokio::test]
    async fn test_crash_carries_stderr_excerpt() {
        let (tmp, bus, token) = fixture();
        let exe = script(tmp.path(), "srv", "echo boom >&2\nexit 3");
        let unit = unit_for(tmp.path(), exe);
        let reason = run_once(&unit, &tmp.path().join("logs"), &token, &bus).await;
        match reason {
            ExitReason::OtherError { message } => {
                assert!(message.contains("boom"), "stderr missing: {message}");
            }
            other => panic!("expected OtherError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_output_is_persisted_to_run_log() {
        let (tmp, bus, token) = fixture();
        let exe = script(tmp.path(), "srv", "echo hello fleet\nexit 0");
        let unit = unit_for(tmp.path(), exe);
        let logs = tmp.path().join("logs");
        let reason = run_once(&unit, &logs, &token, &bus).await;
        assert_eq!(reason, ExitReason::CleanExit);

        let entries: Vec<_> = std::fs::read_dir(&logs).unwrap().collect();
        assert_eq!(entries.len(), 1, "one log file per run");
        let content = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(content, "hello fleet\n");
    }

    #[tokio::test]
    async fn test_unspawnable_command_is_retryable_error() {
        let (tmp, bus, token) = fixture();
        let unit = unit_for(tmp.path(), tmp.path().join("does-not-exist"));
        let reason = run_once(&unit, &tmp.path().join("logs"), &token, &bus).await;
        match reason {
            ExitReason::OtherError { message } => {
                assert!(message.contains("failed to start"));
            }
            other => panic!("expected OtherError, got {other:?}"),
        }
    }
}

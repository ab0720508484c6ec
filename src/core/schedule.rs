//! # Schedule windows: recurring start/stop supervision.
//!
//! A [`Window`] is one (start, stop) pair; a unit's schedule is an ordered
//! list of them, visited strictly in the given order, never sorted. With no
//! windows configured, supervision degrades to a single unbounded session.
//!
//! ```text
//! per window:
//!   wait until (start + stagger)     (or just the stagger if already past)
//!   derive deadline-bound child token (cancelled at stop)
//!   run one Session bound to it
//!   deadline expiry is expected      → continue with the next window
//!   fatal session error              → abort the remaining windows
//! ```
//!
//! ## Rules
//! - Start/stop lists must come in equal lengths; a mismatch is a
//!   configuration error, not a crash.
//! - A stop instant not strictly after its start is stretched to a minimum
//!   window length and the operator warned; a zero-length window must not
//!   silently hang or fire-and-immediately-kill.
//! - A start instant already in the past still waits the stagger offset,
//!   so a fleet restarting at once does not thunder onto the host.

use std::time::Duration;

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;
use crate::core::session::Session;
use crate::error::UnitError;
use crate::events::{Bus, Event, EventKind};
use crate::units::Unit;

/// One schedule entry: supervise from `start` until `stop`.
///
/// Invariant (enforced by [`build_windows`]): `stop > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// When the supervision session for this entry begins.
    pub start: DateTime<Local>,
    /// Deadline at which the session is ended, mid-run or not.
    pub stop: DateTime<Local>,
}

/// Pairs up start and stop instants into validated windows.
///
/// Lists must be equal length. Pairs keep the given order. A stop that is
/// not strictly after its start is coerced to `start + min_window` with a
/// warning.
pub fn build_windows(
    starts: &[DateTime<Local>],
    stops: &[DateTime<Local>],
    min_window: Duration,
) -> Result<Vec<Window>, UnitError> {
    if starts.len() != stops.len() {
        return Err(UnitError::ScheduleMismatch {
            starts: starts.len(),
            stops: stops.len(),
        });
    }

    let min = chrono::Duration::from_std(min_window).unwrap_or_else(|_| chrono::Duration::zero());
    let mut windows = Vec::with_capacity(starts.len());
    for (&start, &stop) in starts.iter().zip(stops) {
        let stop = if stop > start {
            stop
        } else {
            let coerced = start + min;
            warn!(%start, %stop, %coerced, "stop time not after start; window stretched");
            coerced
        };
        windows.push(Window { start, stop });
    }
    Ok(windows)
}

/// Wait before opening a window: the interval until `start + stagger`, or
/// the stagger alone when that instant has already passed.
pub fn start_wait(now: DateTime<Local>, start: DateTime<Local>, stagger: Duration) -> Duration {
    let offset = chrono::Duration::from_std(stagger).unwrap_or_else(|_| chrono::Duration::zero());
    match (start + offset - now).to_std() {
        Ok(wait) if wait > Duration::ZERO => wait,
        _ => stagger,
    }
}

/// Supervises one unit for its whole lifetime: stagger, then either a
/// single unbounded session or one deadline-bound session per window.
///
/// This is the per-unit pipeline the supervisor spawns; it returns the
/// unit's terminal outcome and never affects sibling units.
pub async fn supervise(
    unit: &Unit,
    cfg: &Config,
    bus: &Bus,
    token: &CancellationToken,
) -> Result<(), UnitError> {
    if unit.schedule.is_empty() {
        if !sleep_cancellable(unit.stagger, token).await {
            return Ok(());
        }
        let session = Session::new(unit, cfg.restart_policy(), &cfg.logs_dir, bus);
        return session.run(token).await;
    }

    for window in &unit.schedule {
        let wait = start_wait(Local::now(), window.start, unit.stagger);
        if !sleep_cancellable(wait, token).await {
            return Ok(());
        }

        bus.publish(
            Event::new(EventKind::WindowOpened)
                .with_unit(unit.name())
                .with_reason(format!("{} until {}", window.start, window.stop)),
        );

        let session_token = deadline_token(token, window.stop);
        let session = Session::new(unit, cfg.restart_policy(), &cfg.logs_dir, bus);
        let result = session.run(&session_token).await;
        // Also stops the deadline timer task when the session ended early.
        session_token.cancel();

        bus.publish(Event::new(EventKind::WindowClosed).with_unit(unit.name()));

        // Fatal outcomes abort the remaining entries; deadline expiry and
        // requested shutdowns land here as Ok.
        result?;
        if token.is_cancelled() {
            return Ok(());
        }
    }
    Ok(())
}

/// Child token of `parent` that additionally fires at `stop`.
fn deadline_token(parent: &CancellationToken, stop: DateTime<Local>) -> CancellationToken {
    let child = parent.child_token();
    let timer = child.clone();
    let until = (stop - Local::now()).to_std().unwrap_or(Duration::ZERO);
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(until) => timer.cancel(),
            _ = timer.cancelled() => {}
        }
    });
    child
}

/// Sleeps for `dur`; returns false if the token fired first.
async fn sleep_cancellable(dur: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(dur) => true,
        _ = token.cancelled() => false,
    }
}

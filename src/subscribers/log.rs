//! # Logging subscriber: narrates state transitions.
//!
//! [`LogWriter`] renders runtime events through `tracing`, producing the
//! continuous narration an operator watches: starting, restarting,
//! scheduled startup and shutdown, stopped with reason.
//!
//! ```text
//! INFO starting: ./executables/zcatch_srv -f ./configs/autoexec_zcatch_srv_1.cfg
//! INFO stopped: autoexec_zcatch_srv_1: reason: port_conflict (attempt 2)
//! INFO cooldown: autoexec_zcatch_srv_1: 13s until next attempt
//! WARN finished: autoexec_zcatch_srv_1: runaway_restart
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};

use super::Subscriber;

/// Renders every runtime event as one log line.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Creates the logging subscriber.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscriber for LogWriter {
    async fn on_event(&self, ev: &Event) {
        let unit = ev.unit.as_deref().unwrap_or("-");
        let reason = ev.reason.as_deref().unwrap_or("-");
        match ev.kind {
            EventKind::UnitStarting => {
                // `reason` carries the command line here.
                if ev.attempt == Some(1) {
                    info!("starting: {reason}");
                } else {
                    info!("restarting: {reason}");
                }
            }
            EventKind::RunStopped => {
                let attempt = ev.attempt.unwrap_or(0);
                info!("stopped: {unit}: reason: {reason} (attempt {attempt})");
            }
            EventKind::CooldownScheduled => {
                let delay_ms = ev.delay_ms.unwrap_or(0);
                info!("cooldown: {unit}: {delay_ms}ms until next attempt");
            }
            EventKind::ShutdownMarkerSeen => {
                let actor = ev.actor.as_deref().unwrap_or("?");
                info!("admin shutdown observed: {unit}: actor {actor}");
            }
            EventKind::WindowOpened => {
                info!("scheduled startup: {unit}: {reason}");
            }
            EventKind::WindowClosed => {
                info!("scheduled shutdown: {unit}");
            }
            EventKind::ShutdownRequested => {
                info!("shutdown requested, stopping all units");
            }
            EventKind::AllStoppedWithin => {
                info!("all units stopped within grace period");
            }
            EventKind::GraceExceeded => {
                warn!("grace period exceeded, abandoning stuck units");
            }
            EventKind::UnitTerminal => {
                if reason == "clean" {
                    info!("finished: {unit}: {reason}");
                } else {
                    error!("finished: {unit}: {reason}");
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

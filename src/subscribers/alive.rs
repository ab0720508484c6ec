//! # Unit liveness tracker with sequence-based ordering.
//!
//! Maintains authoritative state of which unit pipelines are currently
//! live, using event sequence numbers to handle out-of-order delivery. The
//! supervisor asks it for a snapshot when the shutdown grace period runs
//! out, so stuck units can be named.
//!
//! ## Rules
//! - `UnitStarting` marks a unit live; `UnitTerminal` marks it done.
//! - Events with `seq <= last_seq` for a unit are rejected (stale).
//! - Snapshots are eventually consistent and sorted for stable output.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscriber;

/// Per-unit state for ordering validation.
#[derive(Debug, Clone)]
struct UnitState {
    last_seq: u64,
    live: bool,
}

/// Thread-safe tracker of live unit pipelines.
pub struct AliveTracker {
    state: RwLock<HashMap<String, UnitState>>,
}

impl AliveTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies one event if it is newer than the last seen for its unit.
    fn update(&self, ev: &Event) {
        let name = match ev.unit.as_deref() {
            Some(name) => name,
            None => return,
        };
        let live = match ev.kind {
            EventKind::UnitStarting => true,
            EventKind::UnitTerminal => false,
            _ => return,
        };

        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = state.entry(name.to_string()).or_insert(UnitState {
            last_seq: 0,
            live: false,
        });
        // Sequence numbers are globally unique, so >= only admits the
        // very first event for a fresh entry.
        if ev.seq >= entry.last_seq {
            entry.last_seq = ev.seq;
            entry.live = live;
        }
    }

    /// Sorted names of units whose pipelines have not reached a terminal
    /// state.
    pub fn snapshot(&self) -> Vec<String> {
        let state = match self.state.read() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut names: Vec<String> = state
            .iter()
            .filter(|(_, s)| s.live)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }
}

impl Default for AliveTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Subscriber for AliveTracker {
    async fn on_event(&self, ev: &Event) {
        self.update(ev);
    }

    fn name(&self) -> &'static str {
        "alive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_then_terminal_clears_unit() {
        let tracker = AliveTracker::new();
        tracker.update(&Event::new(EventKind::UnitStarting).with_unit("srv-1"));
        assert_eq!(tracker.snapshot(), vec!["srv-1".to_string()]);

        tracker.update(&Event::new(EventKind::UnitTerminal).with_unit("srv-1"));
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn test_stale_events_are_rejected() {
        let tracker = AliveTracker::new();
        let stale_terminal = Event::new(EventKind::UnitTerminal).with_unit("srv-1");
        let fresh_start = Event::new(EventKind::UnitStarting).with_unit("srv-1");
        assert!(fresh_start.seq > stale_terminal.seq);

        // Deliver out of order: the newer event first.
        tracker.update(&fresh_start);
        tracker.update(&stale_terminal);
        assert_eq!(
            tracker.snapshot(),
            vec!["srv-1".to_string()],
            "the stale terminal event must not override the newer start"
        );
    }

    #[test]
    fn test_unrelated_events_do_not_change_state() {
        let tracker = AliveTracker::new();
        tracker.update(&Event::new(EventKind::RunStopped).with_unit("srv-1"));
        assert!(tracker.snapshot().is_empty());
    }
}

//! # Event subscriber trait.
//!
//! Provides [`Subscriber`], an extension point for plugging custom event
//! handlers into the runtime.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscriber::queue_capacity`])
//! - **Panic isolation** (panics are caught and logged)
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event **for this subscriber only**; other
//!   subscribers are unaffected.
//! - Events are processed sequentially (FIFO) per subscriber.
//! - Subscribers never block publishers or each other.

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this subscriber's queue.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Handles one event. Called sequentially per subscriber.
    async fn on_event(&self, ev: &Event);

    /// Short name used when reporting drops and panics.
    fn name(&self) -> &'static str {
        "subscriber"
    }

    /// Capacity of this subscriber's event queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

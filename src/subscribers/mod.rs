//! Event subscribers for the fleetvisor runtime.
//!
//! This module provides the [`Subscriber`] trait and the built-in
//! implementations that handle runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ```text
//! Event flow:
//!   Session/Runner ── publish(Event) ──► Bus ──► supervisor listener
//!                                                     │
//!                                                SubscriberSet
//!                                              ┌──────┴──────┐
//!                                              ▼             ▼
//!                                          LogWriter    AliveTracker
//!                                         (narration)  (stuck units)
//! ```

mod alive;
mod log;
mod set;
mod subscriber;

pub use alive::AliveTracker;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscriber;

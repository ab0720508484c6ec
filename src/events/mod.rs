//! Runtime events and the broadcast bus that carries them.
//!
//! Every state transition a unit goes through (spawning, stopping,
//! cooling down, opening a schedule window, reaching a terminal outcome)
//! is published as an [`Event`] on the [`Bus`]. Subscribers (see
//! [`crate::subscribers`]) turn that stream into log narration and
//! liveness tracking; nothing in the supervision path ever waits on them.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

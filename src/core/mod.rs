//! Runtime core: supervision and lifecycle.
//!
//! This module contains the supervision engine. The public API from here is
//! [`Supervisor`] plus the per-unit report types; the schedule's [`Window`]
//! is public because discovery attaches it to units.
//!
//! Internal modules:
//! - [`session`]: the restart loop for one unit under one context;
//! - [`schedule`]: start/stop windows and the per-unit pipeline;
//! - [`supervisor`]: spawns pipelines, handles shutdown, collects reports;
//! - [`shutdown`]: cross-platform shutdown signal handling.

pub mod schedule;
pub mod session;
pub mod shutdown;
mod supervisor;

pub use schedule::Window;
pub use supervisor::{Supervisor, UnitOutcome, UnitReport};

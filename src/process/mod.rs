//! Running one child process and classifying how it ended.
//!
//! Internal modules:
//! - [`classifier`]: tees child output to the run log while scanning for
//!   the admin shutdown marker;
//! - [`logfile`]: creates the timestamped per-run log file;
//! - [`runner`]: spawns the child, joins exit and classification, and
//!   reconciles them into one [`ExitReason`].

pub mod classifier;
mod exit;
mod logfile;
pub mod runner;

pub use classifier::Verdict;
pub use exit::ExitReason;
pub use logfile::run_log_name;
pub use runner::run_once;

//! # Per-run log files.
//!
//! Every process run gets a fresh log file under the logs directory, named
//! after the config file's base name plus a millisecond timestamp:
//!
//! ```text
//! logs/autoexec_zcatch_srv_1-2024-01-01-15:04:05.000.log
//! ```
//!
//! A prior run's log is never overwritten: files are opened create-new, and
//! uniqueness relies on the millisecond timestamp since runs of one unit
//! are strictly sequential.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::{File, OpenOptions};

/// Log filename for one run of the unit configured by `config_file`.
pub fn run_log_name(config_file: &Path, at: DateTime<Local>) -> String {
    let stem = config_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "run".to_string());
    format!("{stem}-{}.log", at.format("%Y-%m-%d-%H:%M:%S%.3f"))
}

/// Creates the logs directory if needed and opens a fresh log file for one
/// run. Fails if a file with the same timestamped name already exists.
pub async fn create(logs_dir: &Path, config_file: &Path) -> io::Result<(PathBuf, File)> {
    tokio::fs::create_dir_all(logs_dir).await?;
    let path = logs_dir.join(run_log_name(config_file, Local::now()));
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    Ok((path, file))
}

//! # Filesystem discovery of supervised units.
//!
//! Scans two directories: one holding server executables, one holding
//! config files named `autoexec_<executable>_<id>.cfg`. A unit exists for
//! every config whose embedded executable name refers to a discovered
//! executable and which passes the operator's filter pattern.
//!
//! ## Rules
//! - An executable is any regular file with no extension (or `.exe`) whose
//!   name matches the executable filter; everything else is narrated and
//!   skipped.
//! - A config with no matching executable is narrated and skipped, never an
//!   error.
//! - Entries are visited in sorted filename order so unit indices, and
//!   therefore stagger offsets, are deterministic across runs.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use crate::core::schedule::Window;
use crate::units::Unit;

/// Filename shape of a unit config: `autoexec_<executable>_<id>.cfg`.
fn config_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"autoexec_(.+)_([^_]+)\.cfg$").expect("static pattern"))
}

/// Scans both directories and returns the units to supervise, in sorted
/// config-name order, with stagger offsets assigned by index.
///
/// Every unit receives a copy of `schedule`; an empty slice means
/// unscheduled, continuous supervision.
pub fn discover(
    executables_dir: &Path,
    configs_dir: &Path,
    exec_filter: &Regex,
    config_filter: &Regex,
    stagger_step: Duration,
    schedule: &[Window],
) -> io::Result<Vec<Unit>> {
    let executables = scan_executables(executables_dir, exec_filter)?;
    let mut names = sorted_file_names(configs_dir)?;
    names.retain(|n| config_pattern().is_match(n));

    let mut units = Vec::with_capacity(names.len());
    for name in names {
        let caps = match config_pattern().captures(&name) {
            Some(caps) => caps,
            None => continue,
        };
        let executable = &caps[1];
        let id = &caps[2];

        if !executables.contains(executable) {
            info!(config = %name, expected = %executable, "no executable found for config");
            continue;
        }
        if !config_filter.is_match(&name) {
            info!(config = %name, "skipped config due to filter mismatch");
            continue;
        }

        let stagger = stagger_step.saturating_mul(units.len() as u32);
        units.push(Unit::new(
            executables_dir.join(executable),
            configs_dir.join(&name),
            id,
            stagger,
            schedule.to_vec(),
        ));
    }
    Ok(units)
}

/// Collects executable names: extensionless (or `.exe`) regular files
/// matching the operator's filter.
fn scan_executables(dir: &Path, filter: &Regex) -> io::Result<HashSet<String>> {
    let mut found = HashSet::new();
    for name in sorted_file_names(dir)? {
        if !is_executable_name(&name) {
            debug!(file = %name, "not an executable name, ignoring");
            continue;
        }
        if filter.is_match(&name) {
            info!(executable = %name, "found executable");
            found.insert(name);
        } else {
            info!(executable = %name, "skipped executable");
        }
    }
    Ok(found)
}

/// Regular-file names in `dir`, sorted for deterministic ordering.
fn sorted_file_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort_unstable();
    Ok(names)
}

fn is_executable_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        None => true,
        Some((stem, ext)) => !stem.is_empty() && ext.eq_ignore_ascii_case("exe"),
    }
}

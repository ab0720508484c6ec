//! # Unit: one executable/config pair under supervision.
//!
//! A [`Unit`] is created once during discovery and is immutable for its
//! lifetime; exactly one tokio task owns it exclusively. It knows how to
//! build the child [`Command`] but never spawns anything itself; that is
//! the runner's job.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::core::schedule::Window;

/// One supervised workload: an executable launched with `-f <config>`.
#[derive(Debug, Clone)]
pub struct Unit {
    /// Resolved path of the server executable.
    pub executable: PathBuf,
    /// Resolved path of its configuration file.
    pub config_file: PathBuf,
    /// Identifier extracted from the config filename (logging only).
    pub id: String,
    /// Startup delay applied before this unit's first spawn.
    pub stagger: Duration,
    /// Optional recurring start/stop timetable, in the given order.
    pub schedule: Vec<Window>,

    name: String,
}

impl Unit {
    /// Creates a unit. The stable name is the config file's base name
    /// without extension, which discovery guarantees to be unique.
    pub fn new(
        executable: PathBuf,
        config_file: PathBuf,
        id: impl Into<String>,
        stagger: Duration,
        schedule: Vec<Window>,
    ) -> Self {
        let name = config_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unit".to_string());
        Self {
            executable,
            config_file,
            id: id.into(),
            stagger,
            schedule,
            name,
        }
    }

    /// Stable, human-readable unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command line as narrated in logs: `<executable> -f <config>`.
    pub fn command_line(&self) -> String {
        format!(
            "{} -f {}",
            self.executable.display(),
            self.config_file.display()
        )
    }

    /// Builds the child process command with piped stdio and the child PATH
    /// extended by the executable's directory, so servers can find sibling
    /// tools next to themselves.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-f")
            .arg(&self.config_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.executable.parent() {
            cmd.env("PATH", extend_path(dir));
        }
        cmd
    }
}

/// Parent PATH with `dir` appended; falls back to `dir` alone when PATH is
/// unset or unjoinable.
fn extend_path(dir: &Path) -> OsString {
    let mut parts: Vec<PathBuf> = env::var_os("PATH")
        .map(|p| env::split_paths(&p).collect())
        .unwrap_or_default();
    parts.push(dir.to_path_buf());
    env::join_paths(parts).unwrap_or_else(|_| dir.as_os_str().to_os_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_config_stem() {
        let unit = Unit::new(
            PathBuf::from("./executables/zcatch_srv"),
            PathBuf::from("./configs/autoexec_zcatch_srv_-t01.cfg"),
            "-t01",
            Duration::ZERO,
            Vec::new(),
        );
        assert_eq!(unit.name(), "autoexec_zcatch_srv_-t01");
        assert_eq!(unit.id, "-t01");
    }

    #[test]
    fn test_command_line_matches_invocation() {
        let unit = Unit::new(
            PathBuf::from("srv"),
            PathBuf::from("srv.cfg"),
            "1",
            Duration::ZERO,
            Vec::new(),
        );
        assert_eq!(unit.command_line(), "srv -f srv.cfg");
    }

    #[test]
    fn test_extend_path_keeps_existing_entries() {
        let joined = extend_path(Path::new("/opt/fleet/bin"));
        let entries: Vec<PathBuf> = env::split_paths(&joined).collect();
        assert_eq!(
            entries.last(),
            Some(&PathBuf::from("/opt/fleet/bin")),
            "executable dir must be appended last"
        );
    }
}

//! Fleetvisor binary: flag parsing, discovery, and the supervision run.
//!
//! The interesting machinery lives in the library; this file only turns
//! operator input into a [`Config`], a schedule, and a unit list, then
//! hands everything to the [`Supervisor`] and summarizes the outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use clap::Parser;
use regex::Regex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fleetvisor::{
    build_windows, discover, Config, LogWriter, Subscriber, Supervisor, UnitOutcome, Window,
};

/// Supervises a fleet of server processes discovered from executable and
/// config directories.
#[derive(Debug, Parser)]
#[command(
    name = "fleetvisor",
    version,
    about,
    after_help = "Configs are paired with executables by filename: a config named
autoexec_<executable>_<id>.cfg supervises <executable> from the
executables directory, launched as `<executable> -f <config>`.

Examples:
    fleetvisor
    fleetvisor zcatch_srv
    fleetvisor zcatch_srv '-t0\\d'
    fleetvisor --start-at 2024-06-01T08:00 --stop-at 2024-06-01T22:00"
)]
struct Cli {
    /// Regular expression selecting which executables to supervise.
    #[arg(value_name = "EXEC_PATTERN", default_value = ".*")]
    exec_pattern: String,

    /// Regular expression further narrowing the config files.
    #[arg(value_name = "CONFIG_PATTERN", default_value = ".*")]
    config_pattern: String,

    /// Directory scanned for server executables.
    #[arg(long, default_value = "./executables")]
    executables_dir: PathBuf,

    /// Directory scanned for autoexec_*.cfg files.
    #[arg(long, default_value = "./configs")]
    configs_dir: PathBuf,

    /// Directory receiving one timestamped log file per process run.
    #[arg(long, default_value = "./logs")]
    logs_dir: PathBuf,

    /// Scheduled start instant (local time, e.g. 2024-06-01T08:00).
    /// Repeatable; must come in equal numbers with --stop-at.
    #[arg(long, value_name = "DATETIME")]
    start_at: Vec<String>,

    /// Scheduled stop instant paired with the --start-at at the same
    /// position.
    #[arg(long, value_name = "DATETIME")]
    stop_at: Vec<String>,

    /// Flat cooldown in seconds applied after every process exit.
    #[arg(long, default_value_t = 3)]
    cooldown_secs: u64,

    /// Additional cooldown in seconds after a port-conflict exit.
    #[arg(long, default_value_t = 10)]
    conflict_cooldown_secs: u64,

    /// Per-unit startup stagger step in seconds.
    #[arg(long, default_value_t = 1)]
    stagger_secs: u64,

    /// Grace period in seconds for units to stop after a shutdown signal.
    #[arg(long, default_value_t = 60)]
    grace_secs: u64,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let exec_filter = Regex::new(&cli.exec_pattern)
        .with_context(|| format!("invalid executable pattern: {}", cli.exec_pattern))?;
    let config_filter = Regex::new(&cli.config_pattern)
        .with_context(|| format!("invalid config pattern: {}", cli.config_pattern))?;

    let cfg = Config {
        cooldown: Duration::from_secs(cli.cooldown_secs),
        conflict_cooldown: Duration::from_secs(cli.conflict_cooldown_secs),
        stagger_step: Duration::from_secs(cli.stagger_secs),
        grace: Duration::from_secs(cli.grace_secs),
        logs_dir: cli.logs_dir.clone(),
        ..Config::default()
    };

    // Validated before any unit starts: a mismatch is a configuration
    // error, not a crash mid-flight.
    let schedule = parse_schedule(&cli.start_at, &cli.stop_at, &cfg)?;

    let units = discover(
        &cli.executables_dir,
        &cli.configs_dir,
        &exec_filter,
        &config_filter,
        cfg.stagger_step,
        &schedule,
    )
    .with_context(|| {
        format!(
            "failed to scan {} / {}",
            cli.executables_dir.display(),
            cli.configs_dir.display()
        )
    })?;

    if units.is_empty() {
        info!("no matching executable/config pairs found, nothing to supervise");
        return Ok(());
    }
    info!(count = units.len(), "supervising units");

    let subscribers: Vec<Arc<dyn Subscriber>> = vec![Arc::new(LogWriter::new())];
    let supervisor = Supervisor::new(cfg, subscribers);

    let reports = supervisor.run(units).await?;
    for report in &reports {
        match report.outcome() {
            UnitOutcome::Clean => info!("{}: clean", report.unit),
            outcome => {
                let detail = report
                    .result
                    .as_ref()
                    .err()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                error!("{}: {}: {}", report.unit, outcome.as_label(), detail);
            }
        }
    }
    info!("finished execution");
    Ok(())
}

/// Parses the start/stop flags into validated schedule windows.
fn parse_schedule(
    starts: &[String],
    stops: &[String],
    cfg: &Config,
) -> anyhow::Result<Vec<Window>> {
    let starts = parse_instants(starts)?;
    let stops = parse_instants(stops)?;
    Ok(build_windows(&starts, &stops, cfg.min_window)?)
}

fn parse_instants(raw: &[String]) -> anyhow::Result<Vec<DateTime<Local>>> {
    raw.iter().map(|s| parse_local(s)).collect()
}

/// Accepts `2024-06-01T08:00` and `2024-06-01T08:00:30`, interpreted in
/// local time.
fn parse_local(s: &str) -> anyhow::Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .with_context(|| format!("invalid datetime (expected YYYY-MM-DDTHH:MM): {s}"))?;
    match Local.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => Ok(dt),
        chrono::LocalResult::None => bail!("datetime does not exist in local time: {s}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_minute_precision() {
        let dt = parse_local("2024-06-01T08:00").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "08:00:00");
    }

    #[test]
    fn test_parse_local_with_seconds() {
        let dt = parse_local("2024-06-01T08:00:30").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "08:00:30");
    }

    #[test]
    fn test_parse_local_rejects_garbage() {
        assert!(parse_local("08:00").is_err());
        assert!(parse_local("not-a-time").is_err());
    }

    #[test]
    fn test_schedule_mismatch_is_reported_up_front() {
        let cfg = Config::default();
        let err = parse_schedule(
            &["2024-06-01T08:00".into(), "2024-06-02T08:00".into()],
            &["2024-06-01T22:00".into()],
            &cfg,
        )
        .unwrap_err();
        assert!(err.to_string().contains("schedule mismatch"));
    }
}

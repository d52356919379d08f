//! pkgsweep - bulk npm registry metadata sweep
//!
//! Fetches every package document named in a JSON name list, keeps the
//! per-version dependency and hash fields, and writes them as numbered
//! JSON shard files. Names that produced no record go to an error log
//! that is retried at the end.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::FileConfig;
use pkgsweep_core::LogTarget;

#[derive(Parser)]
#[command(name = "pkgsweep")]
#[command(about = "Bulk npm registry metadata sweep")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./pkgsweep.toml or ~/.config/pkgsweep/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of the terminal
    #[arg(long, global = true, conflicts_with = "log_dir")]
    log_file: Option<PathBuf>,

    /// Write logs to a timestamped file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep the registry: main pass, then retry the error log
    Run(cmd::sweep::SweepArgs),
    /// Show current configuration
    Config,
}

/// `log_YYYYMMDD_HHMMSS.log` under `dir`
fn timestamped_log_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("log_{stamp}.log"))
}

fn open_log_file(cli: &Cli) -> Result<Option<File>> {
    let path = match (&cli.log_file, &cli.log_dir) {
        (Some(path), _) => path.clone(),
        (None, Some(dir)) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            timestamped_log_path(dir)
        }
        (None, None) => return Ok(None),
    };
    let file = File::create(&path)
        .with_context(|| format!("Cannot create log file {}", path.display()))?;
    Ok(Some(file))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(pkgsweep_core::ProgressContext::new());

    // Logging:
    //   log file: info unless --debug, bars stay on the terminal
    //   TTY:      quiet (warn) unless --debug, progress bars show activity
    //   non-TTY:  info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let target = match open_log_file(&cli)? {
        Some(file) => LogTarget::File(file),
        None if is_tty => LogTarget::Tty(progress.multi()),
        None => LogTarget::Stderr,
    };
    let quiet = matches!(target, LogTarget::Tty(_)) && !cli.debug;
    pkgsweep_core::init_logging(quiet, cli.debug, target);

    let file_config = if let Some(path) = &cli.config {
        FileConfig::from_file(path)?
    } else {
        FileConfig::load()?
    };
    let config = file_config.resolve();

    match cli.command {
        Command::Run(args) => cmd::sweep::run(args, config, &progress),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            let in_flight = |pacing: &pkgsweep_core::Pacing| {
                pacing
                    .max_in_flight
                    .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
            };

            table.add_row(vec!["Name file", &config.names_file.display().to_string()]);
            table.add_row(vec!["Error log", &config.error_file.display().to_string()]);
            table.add_row(vec![
                "Output directory",
                &config.output_dir.display().to_string(),
            ]);
            table.add_row(vec!["Start shard", &config.start.to_string()]);
            table.add_row(vec![
                "Main pass",
                &format!(
                    "{} per shard, {}ms apart",
                    config.main.shard_size,
                    config.main.pacing.interval.as_millis()
                ),
            ]);
            table.add_row(vec![
                "Retry pass",
                &if config.retry_errors {
                    format!(
                        "{} per shard, {}ms apart",
                        config.retry.shard_size,
                        config.retry.pacing.interval.as_millis()
                    )
                } else {
                    "disabled".to_string()
                },
            ]);
            table.add_row(vec!["Max in flight", &in_flight(&config.main.pacing)]);
            table.add_row(vec!["Registry", &config.registry_url]);
            table.add_row(vec![
                "Max attempts",
                &config.retry_policy.max_attempts.to_string(),
            ]);
            table.add_row(vec![
                "Backoff unit",
                &format!("{}ms", config.retry_policy.base_delay.as_millis()),
            ]);
            table.add_row(vec![
                "Timeout unit",
                &format!("{}ms", config.retry_policy.timeout_unit.as_millis()),
            ]);
            table.add_row(vec![
                "Connect timeout",
                &format!("{}ms", config.connect_timeout.as_millis()),
            ]);

            eprintln!("\n{table}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_name_is_timestamped() {
        let path = timestamped_log_path(Path::new("/var/log/pkgsweep"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("log_"));
        assert!(name.ends_with(".log"));
        // log_ + YYYYMMDD_HHMMSS + .log
        assert_eq!(name.len(), 4 + 15 + 4);
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "pkgsweep",
            "--debug",
            "run",
            "--start",
            "2",
            "--no-retry",
            "--max-in-flight",
            "16",
        ])
        .unwrap();
        assert!(cli.debug);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.start, Some(2));
                assert!(args.no_retry);
                assert_eq!(args.max_in_flight.map(|n| n.get()), Some(16));
            }
            Command::Config => panic!("expected run"),
        }
    }

    #[test]
    fn cli_rejects_conflicting_pass_flags() {
        assert!(Cli::try_parse_from(["pkgsweep", "run", "--skip-main", "--no-retry"]).is_err());
    }

    #[test]
    fn cli_rejects_zero_shard_size() {
        assert!(Cli::try_parse_from(["pkgsweep", "run", "--shard-size", "0"]).is_err());
    }
}

//! Run subcommand - sweep the registry over the name list

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use pkgsweep_core::{SharedProgress, fmt_num, http_client, install_signal_handlers, shutdown_flag};
use pkgsweep_npm::{Config, HttpRegistry, PassSummary, RunSummary};

/// Exit status after SIGINT/SIGTERM, as shells report it
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Args, Debug, Default)]
pub struct SweepArgs {
    /// JSON array of package names
    #[arg(short, long)]
    pub names_file: Option<PathBuf>,

    /// Error log of names that produced no record
    #[arg(short, long)]
    pub error_file: Option<PathBuf>,

    /// Output directory for shard files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Names per main-pass shard
    #[arg(short = 's', long)]
    pub shard_size: Option<NonZeroUsize>,

    /// First shard index to process (resume point)
    #[arg(long)]
    pub start: Option<usize>,

    /// Skip the main pass and only retry the error log
    #[arg(long)]
    pub skip_main: bool,

    /// Do not retry the error log after the main pass
    #[arg(long, conflicts_with = "skip_main")]
    pub no_retry: bool,

    /// Skip shards whose file already holds a valid JSON array
    #[arg(long)]
    pub skip_completed: bool,

    /// Milliseconds between request starts in the main pass
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Milliseconds between request starts in the retry pass
    #[arg(long)]
    pub retry_interval_ms: Option<u64>,

    /// Names per retry-pass shard
    #[arg(long)]
    pub retry_shard_size: Option<NonZeroUsize>,

    /// Registry base URL
    #[arg(long)]
    pub registry: Option<String>,

    /// Attempts per package before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Backoff unit in milliseconds (delay grows linearly per attempt)
    #[arg(long)]
    pub base_delay_ms: Option<u64>,

    /// Timeout unit in milliseconds (timeout grows linearly per attempt)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// TCP connect timeout in milliseconds
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Ceiling on concurrent requests within a shard
    #[arg(long)]
    pub max_in_flight: Option<NonZeroUsize>,
}

impl SweepArgs {
    /// Lay command-line values over `config`
    pub fn apply(self, config: &mut Config) {
        if let Some(p) = self.names_file {
            config.names_file = p;
        }
        if let Some(p) = self.error_file {
            config.error_file = p;
        }
        if let Some(p) = self.output {
            config.output_dir = p;
        }
        if let Some(n) = self.shard_size {
            config.main.shard_size = n;
        }
        if let Some(n) = self.retry_shard_size {
            config.retry.shard_size = n;
        }
        if let Some(n) = self.start {
            config.start = n;
        }
        if self.skip_main {
            config.skip_main = true;
        }
        if self.no_retry {
            config.retry_errors = false;
        }
        if self.skip_completed {
            config.skip_completed = true;
        }
        if let Some(ms) = self.interval_ms {
            config.main.pacing.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry_interval_ms {
            config.retry.pacing.interval = Duration::from_millis(ms);
        }
        if let Some(url) = self.registry {
            config.registry_url = url;
        }
        if let Some(n) = self.max_attempts {
            config.retry_policy.max_attempts = n;
        }
        if let Some(ms) = self.base_delay_ms {
            config.retry_policy.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.timeout_ms {
            config.retry_policy.timeout_unit = Duration::from_millis(ms);
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if self.max_in_flight.is_some() {
            config.main.pacing.max_in_flight = self.max_in_flight;
            config.retry.pacing.max_in_flight = self.max_in_flight;
        }
    }
}

pub fn run(args: SweepArgs, mut config: Config, progress: &SharedProgress) -> Result<ExitCode> {
    args.apply(&mut config);

    log::info!("Sweeping {}", config.registry_url);
    log::info!("  Names: {}", config.names_file.display());
    log::info!("  Output: {}", config.output_dir.display());
    log::info!("  Error log: {}", config.error_file.display());
    if config.start > 0 {
        log::info!("  Starting at shard {}", config.start);
    }

    install_signal_handlers().context("Failed to install signal handlers")?;

    let client = http_client(config.connect_timeout).context("Failed to build HTTP client")?;
    let registry = HttpRegistry::new(client, &config.registry_url);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let summary = rt.block_on(pkgsweep_npm::run(
        &config,
        &registry,
        progress,
        shutdown_flag(),
    ))?;

    print_summary(&summary);

    if summary.interrupted {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}

fn pass_rows(rows: &mut Vec<(String, String)>, name: &str, pass: &PassSummary) {
    rows.push((
        format!("{name} shards"),
        format!(
            "{}/{} ({} skipped)",
            pass.completed_shards, pass.total_shards, pass.skipped_shards
        ),
    ));
    rows.push((format!("{name} packages"), fmt_num(pass.identifiers)));
    rows.push((
        format!("{name} records"),
        format!("{} ({} versions)", fmt_num(pass.records), fmt_num(pass.versions)),
    ));
    rows.push((format!("{name} failed"), fmt_num(pass.failed)));
}

fn summary_rows(summary: &RunSummary) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    if let Some(pass) = &summary.main {
        pass_rows(&mut rows, "Main", pass);
    }
    if let Some(pass) = &summary.retry {
        pass_rows(&mut rows, "Retry", pass);
    }
    rows.push((
        "Elapsed".to_string(),
        format!("{:.1}s", summary.elapsed.as_secs_f64()),
    ));
    if let Some(next) = summary.resume_from {
        rows.push(("Resume with".to_string(), format!("--start {next}")));
    }
    rows
}

/// Print the sweep summary table on stderr
fn print_summary(summary: &RunSummary) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Sweep").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in summary_rows(summary) {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

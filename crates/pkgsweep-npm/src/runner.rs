//! Sweep orchestration: main pass over the name list, then the retry pass
//! over the error log

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use pkgsweep_core::{
    ErrorLog, ProgressContext, ShardSink, cleanup_tmp_files, fmt_num, partition, shard_count,
};

use crate::config::{Config, PassConfig};
use crate::registry::Registry;
use crate::worker::{ShardContext, ShardStats, process_shard};

/// Totals for one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassSummary {
    pub total_shards: usize,
    pub completed_shards: usize,
    pub skipped_shards: usize,
    pub identifiers: usize,
    pub records: usize,
    pub versions: usize,
    pub failed: usize,
}

impl PassSummary {
    fn add(&mut self, stats: &ShardStats) {
        self.completed_shards += 1;
        self.identifiers += stats.identifiers;
        self.records += stats.records;
        self.versions += stats.versions;
        self.failed += stats.failed();
    }
}

/// Sweep execution summary
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub main: Option<PassSummary>,
    pub retry: Option<PassSummary>,
    /// Set when a shutdown signal stopped the sweep between shards
    pub interrupted: bool,
    /// Shard index to pass as `start` to continue an interrupted sweep
    pub resume_from: Option<usize>,
    pub elapsed: Duration,
}

/// Where a pass stopped
enum PassEnd {
    Finished,
    Interrupted { next_index: usize },
}

/// Run the whole sweep: main pass, then (optionally) the retry pass.
///
/// `shutdown` is polled between shards; once set, the sweep stops before
/// the next shard and reports where to resume.
pub async fn run<R: Registry>(
    config: &Config,
    registry: &R,
    progress: &ProgressContext,
    shutdown: &AtomicBool,
) -> Result<RunSummary> {
    let start = Instant::now();

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Cannot create output directory {}",
            config.output_dir.display()
        )
    })?;
    cleanup_tmp_files(&config.output_dir).context("Failed to clean stale tmp files")?;

    let names = load_names(&config.names_file)?;
    let main_shards = shard_count(names.len(), config.main.shard_size);
    log::info!(
        "package count: {}, shard count: {main_shards}",
        fmt_num(names.len())
    );

    let sink = ShardSink::new(&config.output_dir);
    let error_log = ErrorLog::new(&config.error_file);
    let ctx = ShardContext {
        policy: &config.retry_policy,
        sink: &sink,
        error_log: &error_log,
        progress,
        shutdown,
    };

    let mut summary = RunSummary::default();

    if !config.skip_main {
        let mut pass = PassSummary::default();
        let end = run_pass(
            "main",
            &names,
            0,
            &config.main,
            config,
            registry,
            &ctx,
            &mut pass,
        )
        .await?;
        summary.main = Some(pass);
        if let PassEnd::Interrupted { next_index } = end {
            return Ok(interrupted(summary, next_index, start));
        }
    }

    if config.retry_errors {
        let mut pass = PassSummary::default();
        let end = retry_pass(
            &error_log,
            &config.retry,
            main_shards,
            config,
            registry,
            &ctx,
            &mut pass,
        )
        .await?;
        summary.retry = Some(pass);
        if let PassEnd::Interrupted { next_index } = end {
            return Ok(interrupted(summary, next_index, start));
        }
    }

    summary.elapsed = start.elapsed();
    log::info!("sweep finished in {:.1}s", summary.elapsed.as_secs_f64());
    Ok(summary)
}

fn interrupted(mut summary: RunSummary, next_index: usize, start: Instant) -> RunSummary {
    log::warn!("Shutdown requested, stopping before shard {next_index}");
    log::warn!("Resume with --start {next_index}");
    summary.interrupted = true;
    summary.resume_from = Some(next_index);
    summary.elapsed = start.elapsed();
    summary
}

/// Re-run the pipeline over the deduplicated error log.
///
/// Shard indices start at `first_index` (the main pass's shard count) so
/// retry shards never overwrite main-pass files. The log is read once up
/// front; lines appended by this pass are left for the next run.
async fn retry_pass<R: Registry>(
    error_log: &ErrorLog,
    pass_config: &PassConfig,
    first_index: usize,
    config: &Config,
    registry: &R,
    ctx: &ShardContext<'_>,
    summary: &mut PassSummary,
) -> Result<PassEnd> {
    if !error_log.path().exists() {
        log::info!(
            "no error log at {}, nothing to retry",
            error_log.path().display()
        );
        return Ok(PassEnd::Finished);
    }
    let names = error_log.read_dedup().with_context(|| {
        format!("Cannot read error log {}", error_log.path().display())
    })?;
    log::info!("error package count: {}", fmt_num(names.len()));

    run_pass(
        "retry",
        &names,
        first_index,
        pass_config,
        config,
        registry,
        ctx,
        summary,
    )
    .await
}

/// Shared loop of both passes: partition, skip finished shards, process
/// the rest strictly one after another.
#[allow(clippy::too_many_arguments)]
async fn run_pass<R: Registry>(
    pass_name: &str,
    names: &[String],
    first_index: usize,
    pass_config: &PassConfig,
    config: &Config,
    registry: &R,
    ctx: &ShardContext<'_>,
    summary: &mut PassSummary,
) -> Result<PassEnd> {
    let shards: Vec<_> = partition(names, pass_config.shard_size)
        .into_iter()
        .map(|s| s.offset(first_index))
        .collect();
    summary.total_shards = shards.len();
    let last_index = (first_index + shards.len()).saturating_sub(1);

    for shard in shards {
        if shard.index < config.start {
            summary.skipped_shards += 1;
            continue;
        }
        if config.skip_completed && ctx.sink.is_complete(shard.index) {
            log::info!("shard_{:04}: already written, skipping", shard.index);
            summary.skipped_shards += 1;
            continue;
        }
        if ctx.shutdown.load(Ordering::Relaxed) {
            return Ok(PassEnd::Interrupted {
                next_index: shard.index,
            });
        }

        log::info!(
            "start {pass_name} {}/{last_index}: {} packages",
            shard.index,
            fmt_num(shard.len())
        );
        let stats = process_shard(registry, shard, &pass_config.pacing, ctx).await?;
        summary.add(&stats);
    }

    log::info!(
        "{pass_name} pass: {}/{} shards, {} records, {} failed",
        summary.completed_shards,
        summary.total_shards,
        fmt_num(summary.records),
        fmt_num(summary.failed)
    );
    Ok(PassEnd::Finished)
}

/// Load the identifier source: a JSON array of package names.
pub fn load_names(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read name file {}", path.display()))?;
    let names: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("Name file {} is not a JSON string array", path.display()))?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_names_reads_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("names.json");
        std::fs::write(&path, r#"["left-pad", "@scope/pkg"]"#).unwrap();
        assert_eq!(load_names(&path).unwrap(), vec!["left-pad", "@scope/pkg"]);
    }

    #[test]
    fn load_names_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_names(&dir.path().join("absent.json")).unwrap_err();
        assert!(format!("{err:#}").contains("Cannot read name file"));
    }

    #[test]
    fn load_names_rejects_non_strings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("names.json");
        std::fs::write(&path, r#"["ok", 3]"#).unwrap();
        assert!(load_names(&path).is_err());
    }

    #[test]
    fn pass_summary_accumulates() {
        let mut pass = PassSummary::default();
        pass.add(&ShardStats {
            identifiers: 3,
            records: 2,
            versions: 10,
            not_found: 1,
            ..Default::default()
        });
        pass.add(&ShardStats {
            identifiers: 1,
            records: 1,
            versions: 1,
            ..Default::default()
        });
        assert_eq!(pass.completed_shards, 2);
        assert_eq!(pass.identifiers, 4);
        assert_eq!(pass.records, 3);
        assert_eq!(pass.failed, 1);
    }
}

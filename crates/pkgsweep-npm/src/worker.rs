//! Shard processing: staggered fetch → normalize → aggregate

use std::cell::Cell;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use pkgsweep_core::{
    ErrorLog, FetchOutcome, Pacing, ProgressContext, RetryPolicy, Shard, ShardSink, fmt_num,
    stagger,
};

use crate::registry::{Registry, fetch_package};
use crate::schema::{Normalized, NormalizedRecord};
use crate::transform::normalize;

/// Everything a shard needs besides the registry and its identifiers
pub struct ShardContext<'a> {
    pub policy: &'a RetryPolicy,
    pub sink: &'a ShardSink,
    pub error_log: &'a ErrorLog,
    pub progress: &'a ProgressContext,
    /// Polled by the runner between shards
    pub shutdown: &'a AtomicBool,
}

/// Statistics from processing a single shard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardStats {
    pub shard_idx: usize,
    pub identifiers: usize,
    pub records: usize,
    pub versions: usize,
    /// Registry answered 404
    pub not_found: usize,
    /// Every attempt failed transiently
    pub exhausted: usize,
    /// Fetched, but the document could not be normalized
    pub malformed: usize,
    pub elapsed: Duration,
}

impl ShardStats {
    pub fn failed(&self) -> usize {
        self.not_found + self.exhausted + self.malformed
    }

    /// Log stats for non-TTY output
    pub fn log(&self) {
        log::info!(
            "shard_{:04}: {} records ({} versions), {} failed ({} not found, {} exhausted, {} malformed) in {:.1}s",
            self.shard_idx,
            fmt_num(self.records),
            fmt_num(self.versions),
            fmt_num(self.failed()),
            self.not_found,
            self.exhausted,
            self.malformed,
            self.elapsed.as_secs_f64()
        );
    }
}

/// Per-outcome counters, bumped from the shard's tasks
#[derive(Default)]
struct Tally {
    not_found: Cell<usize>,
    exhausted: Cell<usize>,
    malformed: Cell<usize>,
}

impl Tally {
    fn bump(counter: &Cell<usize>) {
        counter.set(counter.get() + 1);
    }

    fn record(&self, outcome: &FetchOutcome<serde_json::Value>, result: &Normalized) {
        match (outcome, result) {
            (FetchOutcome::NotFound, _) => Self::bump(&self.not_found),
            (FetchOutcome::ExhaustedRetries, _) => Self::bump(&self.exhausted),
            (FetchOutcome::Success(_), Normalized::Failed(_)) => Self::bump(&self.malformed),
            (FetchOutcome::Success(_), Normalized::Record(_)) => {}
        }
    }
}

/// Fetch, normalize and persist one shard.
///
/// Returns once every identifier has settled and the shard file plus any
/// error-log lines are written.
pub async fn process_shard<R: Registry>(
    registry: &R,
    shard: Shard<'_, String>,
    pacing: &Pacing,
    ctx: &ShardContext<'_>,
) -> Result<ShardStats> {
    let start = Instant::now();
    let label = format!("shard_{:04}", shard.index);
    log::info!(
        "{label}: {} packages, {:?} stagger",
        fmt_num(shard.len()),
        pacing.interval
    );

    let tracker = ctx.progress.tracker(&label, shard.len());
    let tally = Tally::default();
    let results = stagger(shard.items, pacing, &tracker, |name| {
        let tally = &tally;
        async move {
            let outcome = fetch_package(registry, name, ctx.policy).await;
            let result = normalize(name, &outcome);
            tally.record(&outcome, &result);
            result
        }
    })
    .await;
    tracker.finish();

    let identifiers = results.len();
    let (records, failed) = aggregate(results, shard.index, ctx.sink, ctx.error_log)?;

    let stats = ShardStats {
        shard_idx: shard.index,
        identifiers,
        records: records.len(),
        versions: records.iter().map(|r| r.versions.len()).sum(),
        not_found: tally.not_found.get(),
        exhausted: tally.exhausted.get(),
        malformed: tally.malformed.get(),
        elapsed: start.elapsed(),
    };
    debug_assert_eq!(stats.failed(), failed.len());
    stats.log();
    Ok(stats)
}

/// Split results into records and failures, append failures to the error
/// log, and write the records as shard `index`.
///
/// Both lists keep input order. Returns the records written and the failed
/// names.
pub fn aggregate(
    results: Vec<Normalized>,
    index: usize,
    sink: &ShardSink,
    error_log: &ErrorLog,
) -> Result<(Vec<NormalizedRecord>, Vec<String>)> {
    let mut records = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for result in results {
        match result {
            Normalized::Record(r) => records.push(r),
            Normalized::Failed(name) => failed.push(name),
        }
    }

    if !failed.is_empty() {
        log::warn!("shard_{index:04}: {} packages failed", failed.len());
        error_log.append(&failed).with_context(|| {
            format!("Cannot append to error log {}", error_log.path().display())
        })?;
    }
    log::info!(
        "shard_{index:04}: ok: {}, error: {}{}",
        records.len(),
        failed.len(),
        preview(&failed)
    );

    sink.write(index, &records).with_context(|| {
        format!(
            "Cannot write shard file {}",
            sink.shard_path(index).display()
        )
    })?;
    log::debug!("shard_{index:04}: wrote {} packages", records.len());

    Ok((records, failed))
}

/// ` (a, b, ...)` for the first two names, empty when there are none
fn preview(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [a] => format!(" ({a})"),
        [a, b] => format!(" ({a}, {b})"),
        [a, b, ..] => format!(" ({a}, {b}, ...)"),
    }
}

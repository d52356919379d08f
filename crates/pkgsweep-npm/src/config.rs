//! npm sweep configuration

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use pkgsweep_core::{Pacing, RetryPolicy};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Shard size and pacing for one pass over a list of identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassConfig {
    pub shard_size: NonZeroUsize,
    pub pacing: Pacing,
}

/// Runtime configuration for a sweep
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON array of package names
    pub names_file: PathBuf,
    /// Append-only list of names that produced no record
    pub error_file: PathBuf,
    /// Directory receiving `<index>.json` shard files
    pub output_dir: PathBuf,
    /// First shard index to process; lower indices are assumed done
    pub start: usize,
    /// Skip shards whose output file already holds a valid JSON array
    pub skip_completed: bool,
    /// Skip the main pass (retry pass only)
    pub skip_main: bool,
    /// Run the retry pass over the error log after the main pass
    pub retry_errors: bool,
    pub main: PassConfig,
    pub retry: PassConfig,
    pub registry_url: String,
    pub connect_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            names_file: PathBuf::from("all-the-package-names/names.json"),
            error_file: PathBuf::from("errorlist"),
            output_dir: PathBuf::from("result"),
            start: 0,
            skip_completed: false,
            skip_main: false,
            retry_errors: true,
            main: PassConfig {
                shard_size: NonZeroUsize::new(20_000).expect("non-zero"),
                pacing: Pacing::every(Duration::from_millis(5)),
            },
            retry: PassConfig {
                shard_size: NonZeroUsize::new(2_000).expect("non-zero"),
                pacing: Pacing::every(Duration::from_millis(200)),
            },
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            connect_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
        }
    }
}

//! pkgsweep core - source-agnostic infrastructure for bulk registry sweeps
//!
//! Partitioning, staggered scheduling, retrying fetches, shard output and
//! the failure log. Registry-specific parsing lives in the source crates.

pub mod error;
pub mod error_log;
pub mod http;
pub mod logging;
pub mod partition;
pub mod progress;
pub mod retry;
pub mod shutdown;
pub mod sink;
pub mod stagger;

// Re-exports for convenience
pub use error::FetchError;
pub use error_log::ErrorLog;
pub use http::{get_json, http_client};
pub use logging::{IndicatifLogger, LogTarget, init_logging};
pub use partition::{Shard, partition, shard_count};
pub use progress::{ProgressContext, SharedProgress, Tracker, fmt_num};
pub use retry::{FetchOutcome, RetryPolicy, fetch_with_retry};
pub use shutdown::{install_signal_handlers, shutdown_flag};
pub use sink::{ShardSink, cleanup_tmp_files, is_valid_shard};
pub use stagger::{Pacing, stagger};

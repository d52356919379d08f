//! pkgsweep npm - bulk metadata sweep over the npm registry
//!
//! Fetches every package document named in a JSON name list, reduces each
//! to its versions, runtime dependencies and content hashes, and writes the
//! results as numbered JSON shard files. Names that yield no record are
//! appended to an error log, which a second, slower pass retries.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::atomic::AtomicBool;
//! use pkgsweep_npm::{Config, HttpRegistry, run};
//!
//! let config = Config::default();
//! let client = pkgsweep_core::http_client(config.connect_timeout)?;
//! let registry = HttpRegistry::new(client, &config.registry_url);
//! let progress = pkgsweep_core::ProgressContext::new();
//!
//! let summary = run(&config, &registry, &progress, &AtomicBool::new(false)).await?;
//! ```

pub mod config;
pub mod registry;
pub mod runner;
pub mod schema;
pub mod transform;
pub mod worker;

// Re-exports
pub use config::{Config, PassConfig};
pub use registry::{HttpRegistry, Registry, fetch_package};
pub use runner::{PassSummary, RunSummary, load_names, run};
pub use schema::{Normalized, NormalizedRecord, VersionEntry};
pub use transform::normalize;

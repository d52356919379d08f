//! Append-only failure log, deduplicated on read

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

/// Newline-delimited list of identifiers that produced no record.
///
/// Appends never dedup; [`ErrorLog::read_dedup`] collapses repeats while
/// keeping first-seen order, which makes the retry pass's shard layout
/// stable across re-reads of a growing log.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per identifier. No-op for an empty slice.
    pub fn append<S: AsRef<str>>(&self, names: &[S]) -> io::Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut buf = String::new();
        for name in names {
            buf.push_str(name.as_ref());
            buf.push('\n');
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        file.flush()
    }

    /// Read all identifiers, dropping blank lines and repeats.
    ///
    /// A missing file reads as empty; any other I/O error is returned.
    pub fn read_dedup(&self) -> io::Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(dedup_lines(&content))
    }
}

/// Unique non-empty lines of `content`, in first-seen order
pub fn dedup_lines(content: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    content
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .filter(|l| seen.insert(*l))
        .map(String::from)
        .collect()
}

//! Shard file output: `<dir>/<index>.json` written via tmp file + rename

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Writes one JSON array per shard index into an output directory.
#[derive(Debug, Clone)]
pub struct ShardSink {
    dir: PathBuf,
}

impl ShardSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Final path of shard `index`
    pub fn shard_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{index}.json"))
    }

    /// Serialize `records` as a JSON array and atomically publish it.
    ///
    /// A crash mid-write leaves only a `.tmp` file, never a truncated shard.
    /// Returns the number of records written.
    pub fn write<T: Serialize>(&self, index: usize, records: &[T]) -> io::Result<usize> {
        let final_path = self.shard_path(index);
        let tmp_path = self.dir.join(format!("{index}.json.tmp"));

        let mut out = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer(&mut out, records).map_err(io::Error::other)?;
        out.flush()?;
        out.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        fs::rename(&tmp_path, &final_path)?;
        Ok(records.len())
    }

    /// Whether shard `index` was already fully written by an earlier run.
    pub fn is_complete(&self, index: usize) -> bool {
        is_valid_shard(&self.shard_path(index))
    }
}

/// Check if a shard file exists and holds a JSON array
pub fn is_valid_shard(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    serde_json::from_reader::<_, Vec<serde::de::IgnoredAny>>(io::BufReader::new(file)).is_ok()
}

/// Remove stale .tmp files in the output directory
pub fn cleanup_tmp_files(output_dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

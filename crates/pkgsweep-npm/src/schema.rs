//! Registry document shape (input) and shard record shape (output)

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Dependency name → version range, in document order
pub type Dependencies = Map<String, Value>;

// =============================================================================
// Input: registry package document
// =============================================================================

/// Fields of a package document the normalizer reads; the rest is ignored.
#[derive(Debug, Deserialize)]
pub struct PackageDocument {
    /// Version string → version manifest. `null` and absent both map to `None`.
    #[serde(default)]
    pub versions: Option<Map<String, Value>>,
}

/// One entry of `versions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    #[serde(default)]
    pub dependencies: Option<Dependencies>,
    /// Outer `Some` = key present (even as `null`); inner = its object, if any
    #[serde(default, deserialize_with = "present")]
    pub optional_dependencies: Option<Option<Dependencies>>,
    /// Required: a version without `dist` makes the whole document malformed
    pub dist: Dist,
}

#[derive(Debug, Deserialize)]
pub struct Dist {
    #[serde(default)]
    pub shasum: Option<String>,
    #[serde(default)]
    pub integrity: Option<String>,
}

/// Wrap whatever is there in `Some`, so `#[serde(default)]` alone yields
/// `None` only when the key is missing.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// =============================================================================
// Output: shard file records
// =============================================================================

/// One version with a content hash.
///
/// `shasum` is not optional: an entry cannot exist without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dep: Option<Dependencies>,
    pub shasum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

/// One package as written to a shard file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub name: String,
    pub versions: Vec<VersionEntry>,
}

/// Normalizer result: a record, or a marker that this name produced none.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Record(NormalizedRecord),
    Failed(String),
}

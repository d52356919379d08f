//! Package document → shard record

use pkgsweep_core::FetchOutcome;
use serde::Deserialize;
use serde_json::Value;

use crate::schema::{
    Dependencies, Normalized, NormalizedRecord, PackageDocument, VersionEntry, VersionManifest,
};

/// Turn one fetch outcome into a record or a failure marker.
///
/// Pure: the same document always yields the same result.
pub fn normalize(name: &str, outcome: &FetchOutcome<Value>) -> Normalized {
    let doc = match outcome {
        FetchOutcome::Success(doc) => doc,
        FetchOutcome::NotFound | FetchOutcome::ExhaustedRetries => {
            return Normalized::Failed(name.to_string());
        }
    };
    match normalize_document(name, doc) {
        Ok(Some(record)) => Normalized::Record(record),
        Ok(None) => Normalized::Failed(name.to_string()),
        Err(e) => {
            log::debug!("{name}: malformed document: {e}");
            Normalized::Failed(name.to_string())
        }
    }
}

/// `Ok(None)` when the document has no `versions`; `Err` when any part of
/// it has an unexpected shape (the whole record is then discarded).
fn normalize_document(
    name: &str,
    doc: &Value,
) -> Result<Option<NormalizedRecord>, serde_json::Error> {
    let doc = PackageDocument::deserialize(doc)?;
    let Some(versions) = doc.versions else {
        return Ok(None);
    };

    let mut entries = Vec::with_capacity(versions.len());
    for (version, manifest) in &versions {
        let manifest = VersionManifest::deserialize(manifest)?;
        let Some(shasum) = manifest.dist.shasum else {
            continue;
        };
        entries.push(VersionEntry {
            version: version.clone(),
            dep: runtime_dependencies(manifest.dependencies, manifest.optional_dependencies),
            shasum,
            integrity: manifest.dist.integrity,
        });
    }

    Ok(Some(NormalizedRecord {
        name: name.to_string(),
        versions: entries,
    }))
}

/// Declared dependencies with optional ones removed.
///
/// Stripping only happens when `optionalDependencies` is declared at all
/// (an empty or `null` declaration still turns absent `dependencies` into
/// an empty map). Without the declaration, `dependencies` passes through
/// untouched.
fn runtime_dependencies(
    dependencies: Option<Dependencies>,
    optional: Option<Option<Dependencies>>,
) -> Option<Dependencies> {
    let Some(optional) = optional else {
        return dependencies;
    };
    let optional = optional.unwrap_or_default();
    let mut deps = dependencies.unwrap_or_default();
    deps.retain(|k, _| !optional.contains_key(k));
    Some(deps)
}

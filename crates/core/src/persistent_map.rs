//! The persistent path map: a small JSON document that remembers where each
//! item landed last run, so a stable path survives reruns even as the item
//! population drifts. A corrupt or schema-mismatched file is never a hard
//! failure — it's logged and the engine proceeds as if the map were empty.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// Current on-disk schema version for the persistent path map; also
/// surfaced in [`crate::report::ClusterReport`]'s run metadata.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub path: String,
    pub last_seen: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct MapMeta {
    schema_version: u32,
    config_hash: String,
    run_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct MapDocument {
    meta: MapMeta,
    mapping: BTreeMap<String, MapValue>,
}

/// Accepts either the current `{path, last_seen}` shape or a legacy bare
/// path string, so an older map can be migrated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum MapValue {
    Legacy(String),
    Entry { path: String, last_seen: i64 },
}

pub struct PersistentPathMap {
    run_id: i64,
    config_hash: String,
    entries: BTreeMap<String, MapEntry>,
    accessed: HashSet<String>,
}

impl PersistentPathMap {
    /// Starts an empty map for this run's config hash — used when no file
    /// exists yet, or when loading fails in any of the ways documented
    /// below.
    pub fn empty(config_hash: &str) -> Self {
        PersistentPathMap {
            run_id: 0,
            config_hash: config_hash.to_string(),
            entries: BTreeMap::new(),
            accessed: HashSet::new(),
        }
    }

    /// Loads a map from disk. A missing file, an unreadable file, or a
    /// malformed document are all non-fatal: each is logged and yields an
    /// empty map rather than an error. A schema-version mismatch is also
    /// non-fatal, but behaves differently depending on `accept_legacy`: with
    /// it unset, the mismatched document is discarded and the map starts
    /// empty; with it set, the mapping is read anyway and any bare-string
    /// legacy entry is migrated into the current `{path, last_seen}` shape.
    pub fn load(path: &Path, config_hash: &str, accept_legacy: bool) -> Self {
        let mut map = PersistentPathMap::empty(config_hash);
        if !path.exists() {
            return map;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read persistent path map, proceeding as empty");
                return map;
            }
        };

        let doc: MapDocument = match serde_json::from_str(&text) {
            Ok(d) => d,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed persistent path map, proceeding as empty");
                return map;
            }
        };

        if doc.meta.schema_version != SCHEMA_VERSION {
            if !accept_legacy {
                warn!(
                    found = doc.meta.schema_version,
                    expected = SCHEMA_VERSION,
                    "persistent path map schema mismatch, proceeding as empty"
                );
                return map;
            }
            warn!(
                found = doc.meta.schema_version,
                expected = SCHEMA_VERSION,
                "persistent path map schema mismatch, migrating legacy entries"
            );
        }

        map.run_id = doc.meta.run_id;
        for (uid, value) in doc.mapping {
            match value {
                MapValue::Entry { path, last_seen } => {
                    map.entries.insert(uid, MapEntry { path, last_seen });
                }
                MapValue::Legacy(path) => {
                    if accept_legacy {
                        let last_seen = map.run_id;
                        map.entries.insert(uid, MapEntry { path, last_seen });
                    }
                }
            }
        }
        map
    }

    /// The path cached for `uid`, if any. Marks the entry as accessed this
    /// run so its `last_seen` gets bumped on save.
    pub fn lookup(&mut self, uid: &str) -> Option<&str> {
        if self.entries.contains_key(uid) {
            self.accessed.insert(uid.to_string());
        }
        self.entries.get(uid).map(|e| e.path.as_str())
    }

    /// Records the path the engine actually assigned to `uid` this run.
    pub fn record(&mut self, uid: &str, path: &str) {
        self.accessed.insert(uid.to_string());
        self.entries.insert(
            uid.to_string(),
            MapEntry {
                path: path.to_string(),
                last_seen: self.run_id + 1,
            },
        );
    }

    /// Bumps the run id, refreshes `last_seen` for everything accessed this
    /// run, drops entries stale for more than `stale_prune_after_runs`
    /// runs, and atomically writes the result (temp file + rename).
    pub fn save(&mut self, path: &Path, stale_prune_after_runs: u32) -> EngineResult<()> {
        self.run_id += 1;
        for uid in &self.accessed {
            if let Some(entry) = self.entries.get_mut(uid) {
                entry.last_seen = self.run_id;
            }
        }

        let run_id = self.run_id;
        let threshold = stale_prune_after_runs as i64;
        self.entries.retain(|_, e| run_id - e.last_seen <= threshold);

        let mapping: BTreeMap<String, MapValue> = self
            .entries
            .iter()
            .map(|(uid, e)| {
                (
                    uid.clone(),
                    MapValue::Entry {
                        path: e.path.clone(),
                        last_seen: e.last_seen,
                    },
                )
            })
            .collect();
        let doc = MapDocument {
            meta: MapMeta {
                schema_version: SCHEMA_VERSION,
                config_hash: self.config_hash.clone(),
                run_id: self.run_id,
            },
            mapping,
        };

        let json = serde_json::to_string_pretty(&doc).map_err(|e| EngineError::FilesystemWrite {
            path: path.to_path_buf(),
            source: e.to_string(),
        })?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| EngineError::FilesystemWrite {
            path: path.to_path_buf(),
            source: e.to_string(),
        })?;
        use std::io::Write;
        tmp.write_all(json.as_bytes()).map_err(|e| EngineError::FilesystemWrite {
            path: path.to_path_buf(),
            source: e.to_string(),
        })?;
        tmp.persist(path).map_err(|e| EngineError::FilesystemWrite {
            path: path.to_path_buf(),
            source: e.to_string(),
        })?;
        Ok(())
    }
}

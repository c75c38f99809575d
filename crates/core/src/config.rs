//! Typed engine configuration.
//!
//! Loaded from TOML and deep-merged onto compiled-in defaults. Modeled as
//! explicitly-enumerated structs rather than a dynamic map, so a malformed
//! or renamed key is caught at parse time instead of silently ignored
//! somewhere downstream.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub min_cluster_size: usize,
    pub top_k: usize,
    pub max_top_level_folders: usize,
    pub max_folder_size: usize,
    pub min_family_size: usize,
    pub stale_prune_after_runs: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            min_cluster_size: 3,
            top_k: 20,
            max_top_level_folders: 40,
            max_folder_size: 250,
            min_family_size: 3,
            stale_prune_after_runs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    pub priority_suffixes: Vec<String>,
    pub stop_tokens: Vec<String>,
    pub metadata_denylist: Vec<String>,
    pub keyword_clusters: BTreeMap<String, Vec<String>>,
    pub pinned_roots: Vec<String>,
    pub pinned_allow_singleton: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            priority_suffixes: vec!["UI".into(), "Editor".into()],
            stop_tokens: [
                "Manager", "Controller", "System", "Data", "Helper", "Util", "Base", "Common",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            metadata_denylist: [
                "MonoBehaviour",
                "ScriptableObject",
                "Component",
                "Object",
                "Exception",
                "IEnumerator",
                "ValueType",
                "Enum",
                "Attribute",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            keyword_clusters: BTreeMap::new(),
            pinned_roots: Vec::new(),
            pinned_allow_singleton: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub thresholds: Thresholds,
    pub rules: Rules,
    pub acronyms: Vec<String>,
    pub path_overrides: BTreeMap<String, String>,
    pub hub_types: BTreeMap<String, String>,
    pub force_rebuild: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            thresholds: Thresholds::default(),
            rules: Rules::default(),
            acronyms: [
                "UI", "XML", "JSON", "API", "URL", "HTTP", "HTTPS", "FTP", "SSH", "GUI", "HUD",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            path_overrides: BTreeMap::new(),
            hub_types: BTreeMap::new(),
            force_rebuild: false,
        }
    }
}

/// Mirror of `Config`, but every field optional — what a user's TOML
/// document is allowed to specify. Missing keys fall back to defaults; a
/// malformed document aborts before any work.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigOverride {
    thresholds: ThresholdsOverride,
    rules: RulesOverride,
    acronyms: Option<Vec<String>>,
    path_overrides: Option<BTreeMap<String, String>>,
    hub_types: Option<BTreeMap<String, String>>,
    force_rebuild: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThresholdsOverride {
    min_cluster_size: Option<usize>,
    top_k: Option<usize>,
    max_top_level_folders: Option<usize>,
    max_folder_size: Option<usize>,
    min_family_size: Option<usize>,
    stale_prune_after_runs: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RulesOverride {
    priority_suffixes: Option<Vec<String>>,
    stop_tokens: Option<Vec<String>>,
    metadata_denylist: Option<Vec<String>>,
    keyword_clusters: Option<BTreeMap<String, Vec<String>>>,
    pinned_roots: Option<Vec<String>>,
    pinned_allow_singleton: Option<bool>,
}

impl Config {
    /// Load configuration from a TOML file and deep-merge it onto the
    /// compiled-in defaults. A missing path is not an error — it yields the
    /// defaults. A present-but-malformed document aborts with
    /// `EngineError::InvalidConfig`.
    pub fn load(path: Option<&Path>) -> EngineResult<Config> {
        let mut config = Config::default();
        let Some(path) = path else {
            return Ok(config);
        };
        if !path.exists() {
            return Ok(config);
        }
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::InvalidConfig {
            path: Some(path.to_path_buf()),
            source: e.to_string(),
        })?;
        let overrides: ConfigOverride =
            toml::from_str(&text).map_err(|e| EngineError::InvalidConfig {
                path: Some(path.to_path_buf()),
                source: e.to_string(),
            })?;
        config.merge(overrides);
        Ok(config)
    }

    fn merge(&mut self, o: ConfigOverride) {
        if let Some(v) = o.thresholds.min_cluster_size {
            self.thresholds.min_cluster_size = v;
        }
        if let Some(v) = o.thresholds.top_k {
            self.thresholds.top_k = v;
        }
        if let Some(v) = o.thresholds.max_top_level_folders {
            self.thresholds.max_top_level_folders = v;
        }
        if let Some(v) = o.thresholds.max_folder_size {
            self.thresholds.max_folder_size = v;
        }
        if let Some(v) = o.thresholds.min_family_size {
            self.thresholds.min_family_size = v;
        }
        if let Some(v) = o.thresholds.stale_prune_after_runs {
            self.thresholds.stale_prune_after_runs = v;
        }

        if let Some(v) = o.rules.priority_suffixes {
            self.rules.priority_suffixes = v;
        }
        if let Some(v) = o.rules.stop_tokens {
            self.rules.stop_tokens = v;
        }
        if let Some(v) = o.rules.metadata_denylist {
            self.rules.metadata_denylist = v;
        }
        if let Some(v) = o.rules.keyword_clusters {
            self.rules.keyword_clusters = v;
        }
        if let Some(v) = o.rules.pinned_roots {
            self.rules.pinned_roots = v;
        }
        if let Some(v) = o.rules.pinned_allow_singleton {
            self.rules.pinned_allow_singleton = v;
        }

        if let Some(v) = o.acronyms {
            // Additive merge for acronyms, deduplicated and sorted: a user's
            // list extends the built-in set rather than replacing it.
            let mut merged: std::collections::BTreeSet<String> =
                self.acronyms.iter().cloned().collect();
            merged.extend(v);
            self.acronyms = merged.into_iter().collect();
        }
        if let Some(v) = o.path_overrides {
            self.path_overrides = v;
        }
        if let Some(v) = o.hub_types {
            self.hub_types = v;
        }
        if let Some(v) = o.force_rebuild {
            self.force_rebuild = v;
        }
    }
}

/// Stable hash of the configuration, used to invalidate the persistent path
/// map when the rules that produced it change. Canonical form: a
/// deterministically-ordered text rendering of every field (BTreeMap and
/// sorted Vec fields keep this stable regardless of TOML key order).
pub fn compute_config_hash(config: &Config) -> String {
    let mut canon = String::new();
    canon.push_str(&format!(
        "min_cluster_size={}\n",
        config.thresholds.min_cluster_size
    ));
    canon.push_str(&format!("top_k={}\n", config.thresholds.top_k));
    canon.push_str(&format!(
        "max_top_level_folders={}\n",
        config.thresholds.max_top_level_folders
    ));
    canon.push_str(&format!(
        "max_folder_size={}\n",
        config.thresholds.max_folder_size
    ));
    canon.push_str(&format!(
        "min_family_size={}\n",
        config.thresholds.min_family_size
    ));
    canon.push_str(&format!(
        "stale_prune_after_runs={}\n",
        config.thresholds.stale_prune_after_runs
    ));

    let mut priority_suffixes = config.rules.priority_suffixes.clone();
    priority_suffixes.sort();
    canon.push_str(&format!("priority_suffixes={priority_suffixes:?}\n"));

    let mut stop_tokens = config.rules.stop_tokens.clone();
    stop_tokens.sort();
    canon.push_str(&format!("stop_tokens={stop_tokens:?}\n"));

    let mut denylist = config.rules.metadata_denylist.clone();
    denylist.sort();
    canon.push_str(&format!("metadata_denylist={denylist:?}\n"));

    canon.push_str(&format!("keyword_clusters={:?}\n", config.rules.keyword_clusters));

    let mut pinned = config.rules.pinned_roots.clone();
    pinned.sort();
    canon.push_str(&format!("pinned_roots={pinned:?}\n"));
    canon.push_str(&format!(
        "pinned_allow_singleton={}\n",
        config.rules.pinned_allow_singleton
    ));

    canon.push_str(&format!("acronyms={:?}\n", config.acronyms));
    canon.push_str(&format!("path_overrides={:?}\n", config.path_overrides));
    canon.push_str(&format!("hub_types={:?}\n", config.hub_types));
    canon.push_str(&format!("force_rebuild={}\n", config.force_rebuild));

    let mut hasher = Sha256::new();
    hasher.update(canon.as_bytes());
    format!("{:x}", hasher.finalize())
}

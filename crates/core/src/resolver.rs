//! The Path Resolver: turns a desired `Global/...` path into a path that is
//! actually safe to write, applying the three collision disciplines in
//! order — folder-eats-file, file-eats-folder, file-vs-file — and recording
//! every assignment in the `Registry`.

use std::collections::{HashMap, HashSet};

use crate::error::{EngineError, EngineResult};
use crate::hashing::sha256_suffix;

const MAX_COLLISION_RETRIES: u32 = 8;

/// Owns the three collections the resolver needs to stay consistent:
/// assigned paths by item, a canonical-path-to-item lookup, and the set of
/// folders implied by every path assigned so far. Never hand these out
/// individually — every mutation has to keep all three in sync.
#[derive(Default)]
pub struct Registry {
    assigned_paths: HashMap<String, String>,
    path_registry: HashMap<String, String>,
    folders: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn path_for(&self, item_id: &str) -> Option<&str> {
        self.assigned_paths.get(item_id).map(String::as_str)
    }

    pub fn has_folder(&self, path_without_ext: &str) -> bool {
        self.folders.contains(&to_canonical_path(path_without_ext))
    }

    pub fn is_path_taken(&self, path: &str) -> bool {
        self.path_registry.contains_key(&to_canonical_path(path))
    }

    /// Assigns `path` to `item_id`, recording it and every parent directory
    /// implied by it.
    pub fn insert(&mut self, item_id: &str, path: &str) {
        let canon = to_canonical_path(path);
        self.assigned_paths.insert(item_id.to_string(), path.to_string());
        self.path_registry.insert(canon, item_id.to_string());
        for parent in parent_dirs(path) {
            self.folders.insert(to_canonical_path(&parent));
        }
    }

    /// Moves an already-assigned item to a new path, freeing its old
    /// canonical-path slot first.
    pub fn rename(&mut self, item_id: &str, new_path: &str) {
        if let Some(old_path) = self.assigned_paths.get(item_id).cloned() {
            self.path_registry.remove(&to_canonical_path(&old_path));
        }
        self.insert(item_id, new_path);
    }
}

fn to_canonical_path(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// Every directory strictly above the final path segment, shallowest last
/// excluded — e.g. `Global/Story/Foo.md` yields `["Global", "Global/Story"]`.
fn parent_dirs(path: &str) -> Vec<String> {
    let without_ext = path.strip_suffix(".md").unwrap_or(path);
    let parts: Vec<&str> = without_ext.split('/').collect();
    (1..parts.len()).map(|i| parts[..i].join("/")).collect()
}

fn stem_without_ext(path: &str) -> &str {
    path.strip_suffix(".md").unwrap_or(path)
}

/// Resolves `desired_path` for `item_id` against the current registry
/// state, mutating the registry with the final assignment (and with any
/// renames the file-eats-folder discipline triggers along the way).
pub fn resolve_path(registry: &mut Registry, item_id: &str, desired_path: &str) -> EngineResult<String> {
    let path = resolve_folder_eats_file(registry, desired_path);
    resolve_file_eats_folder(registry, &path);
    let path = resolve_file_vs_file(registry, item_id, &path)?;
    registry.insert(item_id, &path);
    Ok(path)
}

/// If the desired path, minus its extension, already names a registered
/// folder, the file can't coexist with it — append `_Page` to the stem.
fn resolve_folder_eats_file(registry: &Registry, path: &str) -> String {
    let without_ext = stem_without_ext(path);
    if registry.has_folder(without_ext) {
        format!("{without_ext}_Page.md")
    } else {
        path.to_string()
    }
}

/// If some parent directory of the desired path was previously assigned as
/// a *file* (because nothing had yet required it to be a folder), that file
/// now conflicts with the folder our path needs — rename it out of the way.
fn resolve_file_eats_folder(registry: &mut Registry, path: &str) {
    for parent in parent_dirs(path) {
        let candidate_path = format!("{parent}.md");
        if registry.is_path_taken(&candidate_path) {
            let canon = to_canonical_path(&candidate_path);
            if let Some(existing_id) = registry.path_registry.get(&canon).cloned() {
                let new_path = format!("{parent}_Page.md");
                registry.rename(&existing_id, &new_path);
            }
        }
    }
}

/// If the exact path is already taken by some other item, append a
/// hash-derived suffix and retry. The suffix is derived once from the item's
/// own identifier and is the same on every retry — what changes each time is
/// the stem it gets appended to, since each retry appends onto the
/// already-suffixed stem from the previous attempt rather than the original.
fn resolve_file_vs_file(registry: &Registry, item_id: &str, path: &str) -> EngineResult<String> {
    if !registry.is_path_taken(path) {
        return Ok(path.to_string());
    }

    let suffix = sha256_suffix(item_id);
    let mut current = path.to_string();
    for _ in 0..MAX_COLLISION_RETRIES {
        let stem = stem_without_ext(&current);
        current = format!("{stem}_{suffix}.md");
        if !registry.is_path_taken(&current) {
            return Ok(current);
        }
    }

    Err(EngineError::CollisionUnresolved {
        item_id: item_id.to_string(),
        path: current,
    })
}

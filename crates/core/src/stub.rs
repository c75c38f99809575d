//! Stub generation: when an item moves, a forwarding document is left
//! behind at its old path so existing links and bookmarks don't dead-end.

use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};

/// Writes a forwarding stub for `uid` at `old_path` (relative to
/// `output_root`), pointing at `new_path`. Returns the path written, or
/// `None` if the write was refused — either because a file already exists
/// there (never overwritten) or because `old_path` would escape
/// `output_root`. Neither case is an error: skipping a stub is always safe.
pub fn generate_stub(
    output_root: &Path,
    uid: &str,
    old_path: &str,
    new_path: &str,
) -> EngineResult<Option<PathBuf>> {
    if !is_safe_relative_path(old_path) {
        return Ok(None);
    }

    let target = output_root.join(old_path);
    if target.exists() {
        return Ok(None);
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::FilesystemWrite {
            path: target.clone(),
            source: e.to_string(),
        })?;
    }

    let content = stub_content(uid, old_path, new_path);
    std::fs::write(&target, content).map_err(|e| EngineError::FilesystemWrite {
        path: target.clone(),
        source: e.to_string(),
    })?;

    Ok(Some(target))
}

fn stub_content(uid: &str, old_path: &str, new_path: &str) -> String {
    let title = new_path
        .rsplit('/')
        .next()
        .unwrap_or(new_path)
        .trim_end_matches(".md");
    format!(
        "---\nuid: {uid}\nobsolete: true\nold_path: {old_path}\nnew_path: {new_path}\n---\n\n\
         # Moved\n\n`{old_path}` has moved. See [{title}]({new_path}).\n"
    )
}

/// A purely lexical check: no `..` component and not absolute. The target
/// directory may not exist yet, so this can't lean on `Path::canonicalize`.
fn is_safe_relative_path(path: &str) -> bool {
    !Path::new(path).is_absolute() && !path.split('/').any(|segment| segment == "..")
}

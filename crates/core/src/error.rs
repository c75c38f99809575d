//! Error types for the clustering engine's I/O boundaries.
//!
//! Every fallible operation in this crate sits at an I/O boundary: loading
//! or saving the persistent path map, loading configuration, writing a
//! stub, or a hash-suffixed collision that still collides after the bounded
//! retry. In-memory pipeline computation never fails.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum EngineError {
    /// Configuration document could not be parsed at all (malformed TOML).
    /// Missing keys are not an error — they fall back to defaults.
    InvalidConfig { path: Option<PathBuf>, source: String },

    /// A filesystem write (stub, persistent map) failed.
    FilesystemWrite { path: PathBuf, source: String },

    /// A file-vs-file collision still collided after the bounded hash-suffix
    /// retry in the Path Resolver. Indicates adversarial or degenerate input.
    CollisionUnresolved { item_id: String, path: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidConfig { path, source } => match path {
                Some(p) => write!(f, "invalid configuration at {}: {source}", p.display()),
                None => write!(f, "invalid configuration: {source}"),
            },
            EngineError::FilesystemWrite { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
            EngineError::CollisionUnresolved { item_id, path } => {
                write!(
                    f,
                    "path collision for item `{item_id}` could not be resolved at `{path}`"
                )
            }
        }
    }
}

impl std::error::Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;

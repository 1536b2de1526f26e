//! Centralized path functions for run outputs.
//!
//! Stores live under `data/` relative to the working directory, one file per
//! run variant.

use std::path::{Path, PathBuf};

/// Directory holding every completion store.
pub const DATA_DIR: &str = "data";

/// JSON-lines store for a run variant: `<root>/<name>.jsonl`.
pub fn store_path_in(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.jsonl"))
}

/// Tab-separated store written by older runs: `<root>/<name>.tsv`.
pub fn legacy_store_path_in(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.tsv"))
}

/// Store to resume from.
///
/// The JSON-lines file wins. If only a legacy TSV exists, keep appending to
/// it so earlier progress is not redone.
pub fn resolve_store_path_in(root: &Path, name: &str) -> PathBuf {
    let jsonl = store_path_in(root, name);
    let legacy = legacy_store_path_in(root, name);
    if !jsonl.exists() && legacy.exists() {
        tracing::info!(path = %legacy.display(), "resuming legacy TSV store");
        return legacy;
    }
    jsonl
}

/// [`resolve_store_path_in`] under [`DATA_DIR`].
pub fn resolve_store_path(name: &str) -> PathBuf {
    resolve_store_path_in(Path::new(DATA_DIR), name)
}

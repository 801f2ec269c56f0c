//! Atomic JSON persistence for per-board durable state.
//!
//! Temp file + rename in the destination directory, so readers never observe
//! a half-written file. Rename-over-existing fails on Windows; persisted
//! state here is advisory (notification history), so that platform edge is
//! handled by deleting first rather than a backup dance.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let bytes = serde_json::to_vec_pretty(value)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(&bytes)?;

    if let Err(err) = tmp.persist(path) {
        if path.exists() {
            fs::remove_file(path)?;
            err.file.persist(path).map_err(|e| e.error)?;
        } else {
            return Err(err.error);
        }
    }
    Ok(())
}

/// Load a JSON file; `Ok(None)` when the file does not exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    Ok(Some(serde_json::from_slice(&raw)?))
}

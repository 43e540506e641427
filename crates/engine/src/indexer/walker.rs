//! Source tree walker
//!
//! Visits entries in name order so runs over an unchanged tree submit files
//! in the same order. Names starting with `.` are skipped, files and
//! directories alike, and symlinks are never followed.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use zearch_core::{IoResultExt, Result};

use crate::config::IndexConfig;

/// Call `on_file` for every indexable file under `root`.
///
/// A missing or unreadable `root` is an error; unreadable sub-directories
/// are logged and skipped. `root` itself may be a single file.
pub(crate) fn walk<F>(root: &Path, config: &IndexConfig, on_file: &mut F) -> Result<()>
where
    F: FnMut(PathBuf) -> Result<()>,
{
    let meta = fs::metadata(root).at_path(root)?;
    if meta.is_file() {
        if accepts(root, config) {
            on_file(root.to_path_buf())?;
        }
        return Ok(());
    }
    fs::read_dir(root).at_path(root)?;
    visit(root, config, on_file)
}

fn accepts(path: &Path, config: &IndexConfig) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| config.accepts_extension(e))
}

fn visit<F>(dir: &Path, config: &IndexConfig, on_file: &mut F) -> Result<()>
where
    F: FnMut(PathBuf) -> Result<()>,
{
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(target: "zearch::indexer", dir = %dir.display(), error = %e, "Skipping unreadable directory");
            return Ok(());
        }
    };

    let mut entries: Vec<fs::DirEntry> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(target: "zearch::indexer", dir = %dir.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        // file_type does not follow symlinks
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                warn!(target: "zearch::indexer", path = %entry.path().display(), error = %e, "Skipping entry");
                continue;
            }
        };
        let path = entry.path();
        if file_type.is_dir() {
            visit(&path, config, on_file)?;
        } else if file_type.is_file() && accepts(&path, config) {
            on_file(path)?;
        }
    }
    Ok(())
}

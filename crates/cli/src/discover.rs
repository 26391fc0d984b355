//! Spec file discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Spec files to run: the single file if given, otherwise every
/// `.yaml`/`.yml` file under `dir`, recursively, sorted by path.
pub fn discover(file: Option<&Path>, dir: &Path) -> Result<Vec<PathBuf>, String> {
    if let Some(file) = file {
        if !file.is_file() {
            return Err(format!("error: '{}' is not a file", file.display()));
        }
        return Ok(vec![file.to_path_buf()]);
    }

    if !dir.is_dir() {
        return Err(format!("error: '{}' is not a directory", dir.display()));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_spec_file(p))
        .collect();
    paths.sort();
    tracing::debug!(dir = %dir.display(), found = paths.len(), "discovered spec files");
    Ok(paths)
}

fn is_spec_file(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext == "yaml" || ext == "yml")
}

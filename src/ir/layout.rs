//! Flat directory listings keyed by file stem.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::PrepError;

/// Regular files directly inside `dir` whose extension is in `extensions`,
/// sorted by file name. Subdirectories (e.g. `train/`) are not descended.
pub fn collect_flat_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, PrepError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| PrepError::LayoutInvalid {
            path: dir.to_path_buf(),
            message: format!("failed while listing directory: {source}"),
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// File name without its final extension, lossily decoded.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name component, lossily decoded.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

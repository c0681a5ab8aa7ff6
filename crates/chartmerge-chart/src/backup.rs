//! Side-by-side copies of charts and documents.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{ChartError, Result};

/// Copy a chart folder or a single document next to itself under a name
/// that is not taken yet (`name_copy1`, `name_copy2`, ...). Returns the path
/// of the copy.
pub fn copy_beside(source: &Path) -> Result<PathBuf> {
    let destination = unique_copy_path(source);
    if source.is_dir() {
        copy_dir(source, &destination)?;
    } else {
        fs::copy(source, &destination).map_err(|e| ChartError::io(source, e))?;
    }
    info!(
        source = %source.display(),
        copy = %destination.display(),
        "copied"
    );
    Ok(destination)
}

/// The first free `<stem>_copyN<.ext>` sibling of `path`. Extensions are
/// only split off for files.
pub fn unique_copy_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let (stem, extension) = if path.is_dir() {
        (file_name(path), None)
    } else {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
        (stem, extension)
    };

    let mut counter = 1;
    loop {
        let name = match &extension {
            Some(ext) => format!("{stem}_copy{counter}.{ext}"),
            None => format!("{stem}_copy{counter}"),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        debug!(candidate = %candidate.display(), "copy name taken");
        counter += 1;
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn copy_dir(source: &Path, destination: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            ChartError::io(path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| ChartError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| ChartError::io(entry.path(), e))?;
        }
    }
    Ok(())
}

use crate::error::{DecoupleError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lists the Python source files under `root`, recursively, in a stable order.
///
/// Entries are sorted by file name at every level so repeated runs over the same tree
/// produce the same sequence. Bytecode caches and other non-`.py` files are skipped.
pub fn collect_python_files(root: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(root).map_err(|e| DecoupleError::from_io(e, root))?;
    if !metadata.is_dir() {
        return Err(DecoupleError::NotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_python_source(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub fn is_python_source(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "py")
}

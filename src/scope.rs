use crate::error::{DecoupleError, Result};
use crate::identity::{DependencyClosure, ModuleIdentity};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The two directory subtrees under comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    pub a: PathBuf,
    pub b: PathBuf,
}

impl Roots {
    /// Normalizes both roots to absolute, symlink-free directory paths.
    pub fn new(a: &Path, b: &Path) -> Result<Self> {
        Ok(Self {
            a: canonical_dir(a)?,
            b: canonical_dir(b)?,
        })
    }

    /// Whether `path` lies under either root, compared by path component.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.a) || path.starts_with(&self.b)
    }
}

fn canonical_dir(path: &Path) -> Result<PathBuf> {
    let dir = path
        .canonicalize()
        .map_err(|e| DecoupleError::from_io(e, path))?;
    if !dir.is_dir() {
        return Err(DecoupleError::NotFound { path: dir });
    }
    Ok(dir)
}

/// Keeps the modules of `closure` located under either root, minus the entry itself.
pub fn filter_scope(closure: &DependencyClosure, roots: &Roots) -> BTreeSet<ModuleIdentity> {
    closure
        .modules
        .iter()
        .filter(|module| roots.contains(&module.path))
        .filter(|module| **module != closure.entry && module.path != closure.entry.path)
        .cloned()
        .collect()
}

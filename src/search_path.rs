use crate::error::{DecoupleError, Result};
use std::path::{Component, Path, PathBuf};

/// Returns the deepest directory that is an ancestor of both paths.
///
/// Paths are compared component by component, so `/a/foo1` and `/a/foo2` share `/a`,
/// never `/a/foo`. Fails when the paths have no component in common (e.g. one is
/// relative and the other absolute, or they sit on different prefixes).
pub fn common_base(a: &Path, b: &Path) -> Result<PathBuf> {
    let shared: PathBuf = a
        .components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect();

    if shared.as_os_str().is_empty() || shared.components().all(|c| c == Component::CurDir) {
        return Err(DecoupleError::InvalidPath {
            a: a.to_path_buf(),
            b: b.to_path_buf(),
        });
    }
    Ok(shared)
}

/// Ordered directories used to resolve dotted names to files.
///
/// The first entry is always the parent of the two roots' common base, so that the
/// package holding both roots resolves by its own name independently of the caller's
/// environment. Ambient directories follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Builds the search path for two (absolute) roots.
    pub fn for_roots(root_a: &Path, root_b: &Path, ambient: &[PathBuf]) -> Result<Self> {
        let base = common_base(root_a, root_b)?;
        // The filesystem root has no parent; it then serves as its own base.
        let anchor = base.parent().map(Path::to_path_buf).unwrap_or(base);

        let mut dirs = vec![anchor];
        for dir in ambient {
            let Ok(dir) = dir.canonicalize() else {
                tracing::debug!("Skipping missing search path entry {}", dir.display());
                continue;
            };
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        Ok(Self { dirs })
    }

    pub fn from_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

use crate::error::ParseFault;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Qualified name given to every entry file, whether it is a plain module or an `__init__.py`.
pub const MAIN_MODULE: &str = "__main__";

/// A module addressed by its dotted name and the file backing it.
///
/// Two identities are equal only when both the name and the path match, so the same file
/// reached as `__main__` and as `pkg.mod` yields two distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleIdentity {
    pub qualified_name: String,
    pub path: PathBuf,
}

impl ModuleIdentity {
    pub fn new(qualified_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            path: path.into(),
        }
    }

    /// Identity of a file scanned as a top-level analysis unit.
    pub fn entry(path: impl Into<PathBuf>) -> Self {
        Self::new(MAIN_MODULE, path)
    }

    pub fn is_entry(&self) -> bool {
        self.qualified_name == MAIN_MODULE
    }

    /// Whether this module is a package's namespace-initialization file.
    pub fn is_package_init(&self) -> bool {
        is_package_init(&self.path)
    }
}

pub fn is_package_init(path: &Path) -> bool {
    path.file_name().map_or(false, |name| name == "__init__.py")
}

/// Every module discovered transitively from one entry file, before scope filtering.
#[derive(Debug, Clone)]
pub struct DependencyClosure {
    pub entry: ModuleIdentity,
    /// Located modules, the entry excluded.
    pub modules: BTreeSet<ModuleIdentity>,
    /// Dotted names that could not be mapped to any file.
    pub unresolved: BTreeSet<String>,
    /// Files of this closure that did not parse.
    pub faults: Vec<ParseFault>,
}

impl DependencyClosure {
    pub fn new(entry: ModuleIdentity) -> Self {
        Self {
            entry,
            modules: BTreeSet::new(),
            unresolved: BTreeSet::new(),
            faults: Vec::new(),
        }
    }
}

/// Entry identity (always `__main__`) to the in-scope modules it depends on.
pub type CouplingMap = BTreeMap<ModuleIdentity, BTreeSet<ModuleIdentity>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_equality_uses_name_and_path() {
        let as_main = ModuleIdentity::entry("/src/pkg/mod.py");
        let as_module = ModuleIdentity::new("pkg.mod", "/src/pkg/mod.py");
        assert_ne!(as_main, as_module);
        assert_eq!(as_module, ModuleIdentity::new("pkg.mod", "/src/pkg/mod.py"));

        let set: HashSet<_> = [as_main.clone(), as_module, as_main].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_package_init_detection() {
        assert!(ModuleIdentity::new("pkg", "/src/pkg/__init__.py").is_package_init());
        assert!(!ModuleIdentity::new("pkg.mod", "/src/pkg/mod.py").is_package_init());
        assert!(ModuleIdentity::entry("/src/pkg/mod.py").is_entry());
    }
}

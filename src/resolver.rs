//! Transitive import discovery for one entry file.
//!
//! Imports are resolved the way the Python path finder does it, with package
//! initialization made explicit: reaching `pkg.sub` records `pkg/__init__.py` as well.

use crate::analyzer::FaultPolicy;
use crate::cache::{ScannedFile, SourceCache};
use crate::error::{DecoupleError, ParseFault, Result};
use crate::identity::{DependencyClosure, ModuleIdentity};
use crate::search_path::SearchPath;
use crate::visitor::{ImportRequest, ImportedName};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// A module found on the search path, or a namespace package with no file.
#[derive(Debug, Clone)]
struct Located {
    name: String,
    file: Option<PathBuf>,
    /// Directories searched for submodules; empty for plain modules.
    package_dirs: Vec<PathBuf>,
}

impl Located {
    fn is_package(&self) -> bool {
        !self.package_dirs.is_empty()
    }
}

/// The package relative imports of a module are resolved against.
#[derive(Debug)]
struct PackageContext {
    package: Option<String>,
    dir: PathBuf,
}

impl PackageContext {
    fn of_module(module: &ModuleIdentity) -> Self {
        let dir = parent_dir(&module.path);
        let package = if module.is_package_init() {
            Some(module.qualified_name.clone())
        } else {
            module
                .qualified_name
                .rsplit_once('.')
                .map(|(package, _)| package.to_string())
        };
        Self { package, dir }
    }
}

/// Per-resolution traversal state. A fresh one is built for every entry file.
struct Traversal {
    closure: DependencyClosure,
    visited: HashSet<PathBuf>,
    queue: VecDeque<ModuleIdentity>,
}

impl Traversal {
    fn new(entry: ModuleIdentity) -> Self {
        let mut visited = HashSet::new();
        visited.insert(entry.path.clone());
        Self {
            closure: DependencyClosure::new(entry),
            visited,
            queue: VecDeque::new(),
        }
    }

    fn record(&mut self, located: &Located) {
        let Some(file) = &located.file else {
            return;
        };
        if self.visited.insert(file.clone()) {
            let identity = ModuleIdentity::new(&located.name, file);
            self.closure.modules.insert(identity.clone());
            self.queue.push_back(identity);
        }
    }

    /// Records `name`'s `__init__.py` and those of its enclosing regular packages.
    fn record_package_chain(&mut self, name: &str, dir: &Path) {
        let mut parts: Vec<&str> = name.split('.').collect();
        let mut dir = dir.to_path_buf();
        while !parts.is_empty() {
            let init = dir.join("__init__.py");
            if init.is_file() {
                self.record(&Located {
                    name: parts.join("."),
                    file: Some(init),
                    package_dirs: vec![dir.clone()],
                });
            }
            parts.pop();
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break,
            }
        }
    }

    fn unresolved(&mut self, name: String) {
        self.closure.unresolved.insert(name);
    }
}

/// Discovers the modules an entry file reaches through its imports.
pub struct ImportResolver<'a> {
    search_path: &'a SearchPath,
    cache: &'a SourceCache,
}

impl<'a> ImportResolver<'a> {
    pub fn new(search_path: &'a SearchPath, cache: &'a SourceCache) -> Self {
        Self { search_path, cache }
    }

    /// Resolves the transitive closure of `entry`.
    ///
    /// The entry is identified as `__main__` and never appears in its own closure.
    /// A missing entry file is fatal; faults and unreadable files further down are not,
    /// unless the cache runs with [`FaultPolicy::Abort`].
    pub fn resolve(&self, entry: &Path) -> Result<DependencyClosure> {
        let entry_path = if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            entry
                .canonicalize()
                .map_err(|e| DecoupleError::from_io(e, entry))?
        };
        if !entry_path.is_file() {
            return Err(DecoupleError::NotFound { path: entry_path });
        }

        let mut traversal = Traversal::new(ModuleIdentity::entry(&entry_path));
        let scanned = self.cache.scan(&entry_path)?;
        if let Some(fault) = &scanned.fault {
            self.note_fault(fault, &mut traversal)?;
        }
        let context = PackageContext {
            package: self.entry_package(&parent_dir(&entry_path)),
            dir: parent_dir(&entry_path),
        };
        self.resolve_imports(&scanned, &context, &mut traversal);

        while let Some(module) = traversal.queue.pop_front() {
            // A dependency that cannot be read stays in the closure and is reported
            // like one that does not parse.
            let scanned = match self.cache.scan(&module.path) {
                Ok(scanned) => scanned,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", module.qualified_name, e);
                    let fault = ParseFault {
                        path: module.path.clone(),
                        line: None,
                        message: e.to_string(),
                    };
                    self.note_fault(&fault, &mut traversal)?;
                    continue;
                }
            };
            if let Some(fault) = &scanned.fault {
                self.note_fault(fault, &mut traversal)?;
            }
            self.resolve_imports(&scanned, &PackageContext::of_module(&module), &mut traversal);
        }

        tracing::debug!(
            "Resolved {}: {} modules, {} unresolved",
            entry_path.display(),
            traversal.closure.modules.len(),
            traversal.closure.unresolved.len()
        );
        Ok(traversal.closure)
    }

    /// Collects `fault`, or returns it when the policy is [`FaultPolicy::Abort`].
    fn note_fault(&self, fault: &ParseFault, traversal: &mut Traversal) -> Result<()> {
        if self.cache.policy() == FaultPolicy::Abort {
            return Err(DecoupleError::ParseFault(fault.clone()));
        }
        traversal.closure.faults.push(fault.clone());
        Ok(())
    }

    fn resolve_imports(
        &self,
        scanned: &ScannedFile,
        context: &PackageContext,
        traversal: &mut Traversal,
    ) {
        for request in &scanned.imports {
            match request {
                ImportRequest::Import { names, .. } => {
                    for imported in names {
                        self.descend(None, &imported.name, traversal);
                    }
                }
                ImportRequest::From {
                    module,
                    level,
                    names,
                    ..
                } => {
                    let target = if *level == 0 {
                        module
                            .as_deref()
                            .and_then(|module| self.descend(None, module, traversal))
                    } else {
                        self.resolve_relative(context, *level, module.as_deref(), traversal)
                    };
                    if let Some(target) = target {
                        self.import_from_list(&target, names, traversal);
                    }
                }
            }
        }
    }

    /// Walks `dotted` one component at a time from `start` (or the search path),
    /// recording every module and package on the way.
    fn descend(
        &self,
        start: Option<Located>,
        dotted: &str,
        traversal: &mut Traversal,
    ) -> Option<Located> {
        let mut current = start;
        for part in dotted.split('.') {
            let (name, dirs) = match &current {
                None => (part.to_string(), self.search_path.dirs().to_vec()),
                Some(parent) if parent.is_package() => {
                    (format!("{}.{}", parent.name, part), parent.package_dirs.clone())
                }
                Some(parent) => {
                    traversal.unresolved(format!("{}.{}", parent.name, part));
                    return None;
                }
            };
            match find_module(part, &name, &dirs) {
                Some(located) => {
                    traversal.record(&located);
                    current = Some(located);
                }
                None => {
                    traversal.unresolved(name);
                    return None;
                }
            }
        }
        current
    }

    fn resolve_relative(
        &self,
        context: &PackageContext,
        level: u32,
        module: Option<&str>,
        traversal: &mut Traversal,
    ) -> Option<Located> {
        let Some(base) = relative_base(context, level) else {
            traversal.unresolved(format!("{}{}", ".".repeat(level as usize), module.unwrap_or("")));
            return None;
        };
        traversal.record_package_chain(&base.name, &base.package_dirs[0]);
        match module {
            Some(module) => self.descend(Some(base), module, traversal),
            None => Some(base),
        }
    }

    /// Handles the names of `from target import ...`: the ones naming submodules are recorded,
    /// the rest are attributes.
    fn import_from_list(&self, target: &Located, names: &[ImportedName], traversal: &mut Traversal) {
        if !target.is_package() {
            return;
        }
        for imported in names {
            if imported.name == "*" {
                for export in self.exports_of(target) {
                    self.import_submodule(target, &export, traversal);
                }
            } else {
                self.import_submodule(target, &imported.name, traversal);
            }
        }
    }

    fn import_submodule(&self, package: &Located, name: &str, traversal: &mut Traversal) {
        let qualified = format!("{}.{}", package.name, name);
        if let Some(located) = find_module(name, &qualified, &package.package_dirs) {
            traversal.record(&located);
        }
    }

    fn exports_of(&self, package: &Located) -> Vec<String> {
        package
            .file
            .as_ref()
            .and_then(|file| self.cache.scan(file).ok())
            .map(|scanned| scanned.exports.clone())
            .unwrap_or_default()
    }

    /// Dotted package name of an entry file's directory.
    ///
    /// Derived from the first search path directory containing it; outside the search path,
    /// from the chain of enclosing directories holding an `__init__.py`.
    fn entry_package(&self, dir: &Path) -> Option<String> {
        for search_dir in self.search_path.dirs() {
            if let Ok(relative) = dir.strip_prefix(search_dir) {
                let parts: Option<Vec<String>> = relative
                    .components()
                    .map(|c| {
                        let part = c.as_os_str().to_str()?;
                        is_identifier(part).then(|| part.to_string())
                    })
                    .collect();
                if let Some(parts) = parts {
                    return Some(parts.join(".")).filter(|name| !name.is_empty());
                }
            }
        }

        let mut parts = Vec::new();
        let mut current = dir;
        while current.join("__init__.py").is_file() {
            let Some(part) = current.file_name().and_then(|n| n.to_str()) else {
                break;
            };
            parts.push(part.to_string());
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        parts.reverse();
        Some(parts.join(".")).filter(|name| !name.is_empty())
    }
}

/// Looks `part` up in `dirs` the way the Python path finder does.
///
/// A regular package wins over a module in the same directory; directories without an
/// `__init__.py` only count as namespace portions when nothing else matches.
fn find_module(part: &str, qualified: &str, dirs: &[PathBuf]) -> Option<Located> {
    if !is_identifier(part) {
        return None;
    }
    let mut portions = Vec::new();
    for dir in dirs {
        let package_dir = dir.join(part);
        let init = package_dir.join("__init__.py");
        if init.is_file() {
            return Some(Located {
                name: qualified.to_string(),
                file: Some(init),
                package_dirs: vec![package_dir],
            });
        }
        let module = dir.join(format!("{}.py", part));
        if module.is_file() {
            return Some(Located {
                name: qualified.to_string(),
                file: Some(module),
                package_dirs: Vec::new(),
            });
        }
        if package_dir.is_dir() {
            portions.push(package_dir);
        }
    }
    (!portions.is_empty()).then(|| Located {
        name: qualified.to_string(),
        file: None,
        package_dirs: portions,
    })
}

/// The package `level` dots above a module, or `None` past the top-level package.
fn relative_base(context: &PackageContext, level: u32) -> Option<Located> {
    let package = context.package.as_ref()?;
    let mut parts: Vec<&str> = package.split('.').collect();
    let mut dir = context.dir.clone();
    for _ in 1..level {
        if parts.len() <= 1 {
            return None;
        }
        parts.pop();
        dir = dir.parent()?.to_path_buf();
    }
    let init = dir.join("__init__.py");
    Some(Located {
        name: parts.join("."),
        file: init.is_file().then_some(init),
        package_dirs: vec![dir],
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {
            chars.all(|c| c == '_' || c.is_alphanumeric())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("package_a"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("my-pkg"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_relative_base_levels() {
        let context = PackageContext {
            package: Some("root.pkg.sub".to_string()),
            dir: PathBuf::from("/src/root/pkg/sub"),
        };
        let base = relative_base(&context, 1).unwrap();
        assert_eq!(base.name, "root.pkg.sub");
        assert_eq!(base.package_dirs, vec![PathBuf::from("/src/root/pkg/sub")]);

        let base = relative_base(&context, 3).unwrap();
        assert_eq!(base.name, "root");
        assert_eq!(base.package_dirs, vec![PathBuf::from("/src/root")]);

        assert!(relative_base(&context, 4).is_none());
    }

    #[test]
    fn test_relative_base_without_package() {
        let context = PackageContext {
            package: None,
            dir: PathBuf::from("/src"),
        };
        assert!(relative_base(&context, 1).is_none());
    }

    #[test]
    fn test_context_of_module() {
        let init = ModuleIdentity::new("root.pkg", "/src/root/pkg/__init__.py");
        let context = PackageContext::of_module(&init);
        assert_eq!(context.package.as_deref(), Some("root.pkg"));

        let module = ModuleIdentity::new("root.pkg.mod", "/src/root/pkg/mod.py");
        let context = PackageContext::of_module(&module);
        assert_eq!(context.package.as_deref(), Some("root.pkg"));
        assert_eq!(context.dir, PathBuf::from("/src/root/pkg"));

        let top = ModuleIdentity::new("top", "/src/top.py");
        assert!(PackageContext::of_module(&top).package.is_none());
    }
}

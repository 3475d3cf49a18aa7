use crate::analyzer::FaultPolicy;
use crate::error::{DecoupleError, ParseFault, Result};
use crate::lenient;
use crate::utils::{get_ignored_lines, LineIndex};
use crate::visitor::{ImportRequest, ImportVisitor};
use dashmap::DashMap;
use rustpython_parser::{parse, Mode};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The imports of one source file, as seen by the scanner.
#[derive(Debug, Clone, Default)]
pub struct ScannedFile {
    pub imports: Vec<ImportRequest>,
    /// Literal `__all__` entries.
    pub exports: Vec<String>,
    /// Set when the file did not parse. `imports` is then empty, or recovered
    /// by the lenient scanner under [`FaultPolicy::Recover`].
    pub fault: Option<ParseFault>,
}

impl ScannedFile {
    /// Scans `source` read from `path`.
    pub fn from_source(path: &Path, source: &str, policy: FaultPolicy) -> Self {
        let line_index = LineIndex::new(source);
        let ignored_lines = get_ignored_lines(source);

        match parse(source, Mode::Module, &path.to_string_lossy()) {
            Ok(rustpython_ast::Mod::Module(module)) => {
                let mut visitor = ImportVisitor::new(&line_index, &ignored_lines);
                for stmt in &module.body {
                    visitor.visit_stmt(stmt);
                }
                Self {
                    imports: visitor.imports,
                    exports: visitor.exports,
                    fault: None,
                }
            }
            Ok(_) => Self::default(),
            Err(err) => {
                let fault = ParseFault {
                    path: path.to_path_buf(),
                    line: Some(line_index.line_index(err.offset)),
                    message: err.error.to_string(),
                };
                let imports = match policy {
                    FaultPolicy::Recover => lenient::scan_imports(source, &ignored_lines),
                    FaultPolicy::Skip | FaultPolicy::Abort => Vec::new(),
                };
                Self {
                    imports,
                    exports: Vec::new(),
                    fault: Some(fault),
                }
            }
        }
    }

    /// Scans a file that is not valid UTF-8 (e.g. a Latin-1 Python 2 module).
    ///
    /// The file is reported as a fault at the first undecodable byte. Under
    /// [`FaultPolicy::Recover`] the lossily decoded text is scanned for its imports.
    pub fn from_undecodable(path: &Path, bytes: &[u8], policy: FaultPolicy) -> Self {
        let valid_up_to = match std::str::from_utf8(bytes) {
            Ok(_) => bytes.len(),
            Err(err) => err.valid_up_to(),
        };
        let line = bytes[..valid_up_to].iter().filter(|&&b| b == b'\n').count() + 1;
        let fault = ParseFault {
            path: path.to_path_buf(),
            line: Some(line),
            message: format!("source is not valid UTF-8 (byte {})", valid_up_to),
        };

        let recovered = match policy {
            FaultPolicy::Recover => {
                let text = String::from_utf8_lossy(bytes);
                Self::from_source(path, &text, policy)
            }
            FaultPolicy::Skip | FaultPolicy::Abort => Self::default(),
        };
        Self {
            imports: recovered.imports,
            exports: recovered.exports,
            fault: Some(fault),
        }
    }
}

/// Scanned files keyed by absolute path, shared by every resolution of one run.
///
/// Each path is stored at most once; the first stored scan wins and is never replaced,
/// so concurrent first access from several workers is safe.
pub struct SourceCache {
    entries: DashMap<PathBuf, Arc<ScannedFile>>,
    policy: FaultPolicy,
}

impl SourceCache {
    pub fn new(policy: FaultPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> FaultPolicy {
        self.policy
    }

    /// Returns the scan of `path`, reading and parsing the file on first access.
    pub fn scan(&self, path: &Path) -> Result<Arc<ScannedFile>> {
        if let Some(hit) = self.entries.get(path) {
            return Ok(Arc::clone(hit.value()));
        }

        // Python 2 sources may declare a non-UTF-8 coding.
        let bytes = fs::read(path).map_err(|e| DecoupleError::from_io(e, path))?;
        let scanned = Arc::new(match String::from_utf8(bytes) {
            Ok(source) => ScannedFile::from_source(path, &source, self.policy),
            Err(err) => ScannedFile::from_undecodable(path, err.as_bytes(), self.policy),
        });
        if let Some(fault) = &scanned.fault {
            tracing::warn!("Failed to parse {}", fault);
        }

        let stored = self
            .entries
            .entry(path.to_path_buf())
            .or_insert(scanned);
        Ok(Arc::clone(stored.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_is_cached_once() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("mod.py");
        fs::write(&file, "import os\n").unwrap();

        let cache = SourceCache::new(FaultPolicy::Skip);
        let first = cache.scan(&file).unwrap();
        fs::write(&file, "import sys\nimport json\n").unwrap();
        let second = cache.scan(&file).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.imports.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let cache = SourceCache::new(FaultPolicy::Skip);
        let err = cache.scan(&dir.path().join("absent.py")).unwrap_err();
        assert!(matches!(err, DecoupleError::NotFound { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_latin1_file_is_a_fault_not_an_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("legacy.py");
        fs::write(&file, b"# -*- coding: latin-1 -*-\nimport os\nname = '\xe9'\n").unwrap();

        let skipping = SourceCache::new(FaultPolicy::Skip);
        let scanned = skipping.scan(&file).unwrap();
        assert!(scanned.imports.is_empty());
        assert_eq!(scanned.fault.as_ref().and_then(|f| f.line), Some(3));

        let recovering = SourceCache::new(FaultPolicy::Recover);
        let scanned = recovering.scan(&file).unwrap();
        assert!(scanned.fault.is_some());
        assert_eq!(scanned.imports.len(), 1);
    }

    #[test]
    fn test_fault_policies() {
        let source = "import os\nprint 'legacy'\n";
        let path = Path::new("legacy.py");

        let skipped = ScannedFile::from_source(path, source, FaultPolicy::Skip);
        assert!(skipped.fault.is_some());
        assert!(skipped.imports.is_empty());

        let recovered = ScannedFile::from_source(path, source, FaultPolicy::Recover);
        assert_eq!(recovered.fault.as_ref().map(|f| f.path.clone()), Some(path.to_path_buf()));
        assert_eq!(recovered.imports.len(), 1);
    }
}

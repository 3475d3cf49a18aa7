use crate::cache::SourceCache;
use crate::error::{DecoupleError, ParseFault, Result};
use crate::identity::{CouplingMap, ModuleIdentity};
use crate::resolver::ImportResolver;
use crate::scope::{filter_scope, Roots};
use crate::search_path::SearchPath;
use crate::walker::collect_python_files;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// What to do with a file whose syntax cannot be scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FaultPolicy {
    /// The file contributes no imports; the fault is collected.
    #[default]
    Skip,
    /// Imports are recovered line by line; the fault is still collected.
    Recover,
    /// The first fault aborts the run.
    Abort,
}

/// Result of one analysis run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub coupling: CouplingMap,
    /// Parse faults met along the way, sorted and deduplicated.
    pub faults: Vec<ParseFault>,
    pub summary: AnalysisSummary,
}

/// Summary statistics of an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    /// Entry files scanned across both roots.
    pub total_files: usize,
    /// Entries with at least one in-scope dependency.
    pub coupled_entries: usize,
    pub fault_count: usize,
}

/// The coupling analyzer. Configuration options are stored here.
#[derive(Debug, Clone)]
pub struct Decoupler {
    /// Ambient resolution directories, searched after the roots' common base.
    pub search_paths: Vec<PathBuf>,
    pub fault_policy: FaultPolicy,
    /// Resolve entry files on the rayon thread pool.
    pub parallel: bool,
}

impl Default for Decoupler {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            fault_policy: FaultPolicy::default(),
            parallel: true,
        }
    }
}

impl Decoupler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_paths(mut self, search_paths: Vec<PathBuf>) -> Self {
        self.search_paths = search_paths;
        self
    }

    pub fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs the analysis over both roots.
    ///
    /// This method:
    /// 1. Normalizes the roots and lists the Python files of each.
    /// 2. Builds the search path from the roots' common base.
    /// 3. Resolves every file's transitive imports, in parallel unless disabled.
    /// 4. Keeps the dependencies located under either root.
    /// 5. Stores each entry with a non-empty dependency set into the coupling map.
    ///
    /// Parse faults are collected into [`Analysis::faults`] unless the policy is
    /// [`FaultPolicy::Abort`]. In that case every entry is still resolved and the fault
    /// with the lowest path is returned, so parallel and sequential runs fail the same way.
    /// A missing root, or roots without a common ancestor, fail before any file is read.
    pub fn analyze(&self, root_a: &Path, root_b: &Path) -> Result<Analysis> {
        let roots = Roots::new(root_a, root_b)?;

        // Nested roots list some files twice.
        let mut seen = HashSet::new();
        let entries: Vec<PathBuf> = collect_python_files(&roots.a)?
            .into_iter()
            .chain(collect_python_files(&roots.b)?)
            .filter(|file| seen.insert(file.clone()))
            .collect();

        // One search path and one scan cache serve every entry of the run.
        let search_path = SearchPath::for_roots(&roots.a, &roots.b, &self.search_paths)?;
        let cache = SourceCache::new(self.fault_policy);
        let resolver = ImportResolver::new(&search_path, &cache);

        let couple = |entry: &PathBuf| -> Result<(ModuleIdentity, BTreeSet<ModuleIdentity>, Vec<ParseFault>)> {
            let closure = resolver.resolve(entry)?;
            // Standard library and third-party modules are dropped here.
            let dependencies = filter_scope(&closure, &roots);
            Ok((closure.entry, dependencies, closure.faults))
        };
        // Outcomes keep entry order in both modes.
        let outcomes: Vec<_> = if self.parallel {
            entries.par_iter().map(couple).collect()
        } else {
            entries.iter().map(couple).collect()
        };
        let results = settle(outcomes)?;

        // Several entries reach the same faulty dependency; the set keeps one copy.
        let mut coupling = CouplingMap::new();
        let mut faults = BTreeSet::new();
        for (entry, dependencies, entry_faults) in results {
            faults.extend(entry_faults);
            if !dependencies.is_empty() {
                coupling.insert(entry, dependencies);
            }
        }

        let summary = AnalysisSummary {
            total_files: entries.len(),
            coupled_entries: coupling.len(),
            fault_count: faults.len(),
        };
        tracing::info!(
            "Analyzed {} files ({} cached): {} coupled entries, {} parse faults",
            summary.total_files,
            cache.len(),
            summary.coupled_entries,
            summary.fault_count
        );

        Ok(Analysis {
            coupling,
            faults: faults.into_iter().collect(),
            summary,
        })
    }
}

/// Coupling map of two roots with the default configuration.
pub fn analyze(root_a: &Path, root_b: &Path) -> Result<CouplingMap> {
    Decoupler::new().analyze(root_a, root_b).map(|analysis| analysis.coupling)
}

/// Unwraps per-entry outcomes in entry order.
///
/// Any error other than a parse fault is returned as met. Parse faults are compared and
/// the one with the lowest path (then line) wins.
fn settle<T>(outcomes: Vec<Result<T>>) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut lowest: Option<ParseFault> = None;

    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(DecoupleError::ParseFault(fault)) => {
                if lowest.as_ref().map_or(true, |kept| fault < *kept) {
                    lowest = Some(fault);
                }
            }
            Err(err) => return Err(err),
        }
    }

    match lowest {
        Some(fault) => Err(DecoupleError::ParseFault(fault)),
        None => Ok(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fault(path: &str) -> ParseFault {
        ParseFault {
            path: PathBuf::from(path),
            line: Some(1),
            message: "invalid syntax".to_string(),
        }
    }

    #[test]
    fn test_settle_reports_lowest_fault() {
        let outcomes = vec![
            Ok(1),
            Err(DecoupleError::ParseFault(fault("/tree/z.py"))),
            Err(DecoupleError::ParseFault(fault("/tree/b.py"))),
            Ok(2),
        ];
        match settle(outcomes) {
            Err(DecoupleError::ParseFault(kept)) => assert_eq!(kept.path, PathBuf::from("/tree/b.py")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_settle_prefers_hard_errors() {
        let outcomes: Vec<Result<u8>> = vec![
            Err(DecoupleError::ParseFault(fault("/tree/a.py"))),
            Err(DecoupleError::NotFound {
                path: PathBuf::from("/tree/gone.py"),
            }),
        ];
        assert!(matches!(settle(outcomes), Err(DecoupleError::NotFound { .. })));
        assert_eq!(settle(vec![Ok(1), Ok(2)]).unwrap(), vec![1, 2]);
    }
}

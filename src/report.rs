use crate::analyzer::{Analysis, AnalysisSummary};
use crate::error::ParseFault;
use crate::identity::CouplingMap;
use serde::Serialize;
use std::path::PathBuf;

/// One in-scope dependency of an entry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    /// Dotted module name, e.g. `root_package.package_b.module_a`.
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouplingEntry {
    pub file: PathBuf,
    pub dependencies: Vec<DependencyRecord>,
}

/// Serializable view of an [`Analysis`], entries sorted by file path.
#[derive(Debug, Clone, Serialize)]
pub struct CouplingReport {
    pub entries: Vec<CouplingEntry>,
    pub faults: Vec<ParseFault>,
    pub analysis_summary: AnalysisSummary,
}

impl CouplingReport {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        Self {
            entries: entries(&analysis.coupling),
            faults: analysis.faults.clone(),
            analysis_summary: analysis.summary.clone(),
        }
    }
}

fn entries(coupling: &CouplingMap) -> Vec<CouplingEntry> {
    coupling
        .iter()
        .map(|(entry, dependencies)| CouplingEntry {
            file: entry.path.clone(),
            dependencies: dependencies
                .iter()
                .map(|dep| DependencyRecord {
                    name: dep.qualified_name.clone(),
                    path: dep.path.clone(),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ModuleIdentity;
    use std::collections::BTreeSet;

    #[test]
    fn test_report_serializes_sorted_entries() {
        let mut coupling = CouplingMap::new();
        coupling.insert(
            ModuleIdentity::entry("/r/b/m.py"),
            BTreeSet::from([ModuleIdentity::new("r.a", "/r/a/__init__.py")]),
        );
        coupling.insert(
            ModuleIdentity::entry("/r/a/m.py"),
            BTreeSet::from([
                ModuleIdentity::new("r.b.x", "/r/b/x.py"),
                ModuleIdentity::new("r.b", "/r/b/__init__.py"),
            ]),
        );
        let analysis = Analysis {
            coupling,
            faults: Vec::new(),
            summary: AnalysisSummary {
                total_files: 4,
                coupled_entries: 2,
                fault_count: 0,
            },
        };

        let report = CouplingReport::from_analysis(&analysis);
        assert_eq!(report.entries[0].file, PathBuf::from("/r/a/m.py"));
        assert_eq!(report.entries[0].dependencies[0].name, "r.b");
        assert_eq!(report.entries[1].file, PathBuf::from("/r/b/m.py"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["analysis_summary"]["coupled_entries"], 2);
        assert_eq!(json["entries"][0]["dependencies"][1]["name"], "r.b.x");
    }
}

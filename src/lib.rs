// Lib file to expose modules for testing and external usage.
// This file serves as the root for the library crate.

/// Coupling aggregation over two roots: the `Decoupler` struct and `analyze`.
pub mod analyzer;

/// Append-once cache of scanned source files shared across one run.
pub mod cache;

pub mod error;

/// Module identities, dependency closures and the coupling map.
pub mod identity;

/// Line-based import extraction for sources the parser rejects.
pub mod lenient;

/// Report view of an analysis for serialization.
pub mod report;

/// Transitive import resolution for one entry file.
pub mod resolver;

/// Restricting resolved modules to the two roots.
pub mod scope;

/// Common base of the roots and the resulting search path.
pub mod search_path;

/// Helper functions used across the crate: line numbers and pragmas.
pub mod utils;

/// AST visitor collecting import statements.
pub mod visitor;

/// Source file enumeration.
pub mod walker;

pub use analyzer::{analyze, Analysis, Decoupler, FaultPolicy};
pub use error::{DecoupleError, ParseFault};
pub use identity::{CouplingMap, ModuleIdentity};

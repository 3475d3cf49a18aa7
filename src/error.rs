use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A file whose syntax could not be statically scanned.
///
/// Faults are collected as diagnostics unless the analysis runs with
/// [`FaultPolicy::Abort`](crate::analyzer::FaultPolicy::Abort), in which case the
/// first one is returned as [`DecoupleError::ParseFault`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ParseFault {
    /// File that failed to parse.
    pub path: PathBuf,
    /// 1-indexed line of the syntax error, when the parser reports one.
    pub line: Option<usize>,
    /// Parser message.
    pub message: String,
}

impl fmt::Display for ParseFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.path.display(), line, self.message),
            None => write!(f, "{}: {}", self.path.display(), self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecoupleError {
    /// A root directory or an entry file is missing or unreadable.
    #[error("not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The two roots have no common ancestor directory.
    #[error("no common ancestor between {} and {}", .a.display(), .b.display())]
    InvalidPath { a: PathBuf, b: PathBuf },

    #[error("parse fault in {0}")]
    ParseFault(ParseFault),

    #[error("I/O error: {source} (path: {})", .path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, DecoupleError>;

impl DecoupleError {
    /// Maps an I/O failure on `path` to `NotFound` when the file is missing,
    /// keeping every other kind as `Io`.
    pub fn from_io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            DecoupleError::NotFound { path }
        } else {
            DecoupleError::Io { source, path }
        }
    }
}

impl From<walkdir::Error> for DecoupleError {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map(PathBuf::from).unwrap_or_default();
        match e.into_io_error() {
            Some(source) => DecoupleError::from_io(source, path),
            None => DecoupleError::NotFound { path },
        }
    }
}

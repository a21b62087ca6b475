//! Error type for generation runs.
//!
//! Fatal conditions carry the offending path so the CLI can print a message
//! that identifies exactly what was missing.

use std::fmt;
use std::path::PathBuf;

/// Error type for sheetgen operations
#[derive(Debug)]
pub enum GenError {
    /// Input workbook path or a requested table does not exist
    SourceNotFound(PathBuf),
    /// A table name was requested that the workbook does not contain
    TableNotFound(String),
    /// Template file missing for a mode that requires one
    TemplateNotFound(PathBuf),
    /// Malformed tabular input (CSV decoding)
    SourceDecode { path: PathBuf, reason: String },
    /// XML serialization failure while writing a record file
    RecordWrite(String),
    /// Filesystem failure (with the path it happened on)
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::SourceNotFound(path) => {
                write!(f, "Source not found: {}", path.display())
            }
            GenError::TableNotFound(name) => {
                write!(f, "Table '{}' not found in workbook", name)
            }
            GenError::TemplateNotFound(path) => {
                write!(f, "Template file not found: {}", path.display())
            }
            GenError::SourceDecode { path, reason } => {
                write!(f, "Failed to decode {}: {}", path.display(), reason)
            }
            GenError::RecordWrite(msg) => {
                write!(f, "Failed to serialize record: {}", msg)
            }
            GenError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl GenError {
    /// Wrap an I/O error together with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;

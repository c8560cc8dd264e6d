use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while resolving, compiling or instantiating filters.
///
/// Only [`FilterError::Config`] is fatal (raised out of scanner init). The rest are
/// scoped to a single source and are caught per file by the scanner.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Bad or unreachable filter root.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed filter source.
    #[error("Compile error in '{name}': {reason}")]
    Compile { name: String, reason: String },

    /// The factory refused to build an instance.
    #[error("Instantiation error for '{name}': {reason}")]
    Instantiation { name: String, reason: String },

    /// Unreadable file or metadata.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FilterError {
    pub fn compile(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Compile {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn instantiation(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Instantiation {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that must abort startup rather than be skipped per source.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;

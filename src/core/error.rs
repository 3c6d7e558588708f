//! Error taxonomy for corpus building
//!
//! Only `Validation` and `Io` abort a run. Traversal failures are
//! recovered per file, and markup failures never leave the compressor.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    /// Single-file mode was given a file type that is not eligible
    #[error("{path}: {reason}")]
    Validation { path: PathBuf, reason: String },

    /// A file or directory could not be accessed during traversal
    #[error("cannot read {path}: {source}")]
    TraversalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The assembled document is not well-formed markup
    #[error("markup parse error: {0}")]
    Markup(String),

    /// Two records resolved to the same relative path
    #[error("duplicate path in document: {0}")]
    DuplicatePath(String),

    /// Top-level I/O failure (missing root, unwritable output)
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CorpusError {
    /// Whether the error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, CorpusError::Validation { .. } | CorpusError::Io { .. })
    }
}

pub type CorpusResult<T> = std::result::Result<T, CorpusError>;

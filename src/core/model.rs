//! Corpus document model
//!
//! A `SourceDocument` is assembled once per run from `FileRecord`s in
//! traversal order and is never mutated after assembly.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::core::error::CorpusError;

/// The kind of corpus being built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    SingleFile,
    LocalDirectory,
}

impl DocumentKind {
    /// Value of the `type` attribute on the `source` element
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::SingleFile => "single_file",
            DocumentKind::LocalDirectory => "local_directory",
        }
    }

    /// Short prefix used in artifact file names
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::SingleFile => "file",
            DocumentKind::LocalDirectory => "dir",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file of the corpus: relative path and escaped body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the traversal root, using '/' as separator
    pub path: String,
    /// Escaped body
    pub body: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
        }
    }
}

/// The assembled corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub kind: DocumentKind,
    /// Root path as given by the caller
    pub root: String,
    files: Vec<FileRecord>,
}

impl SourceDocument {
    /// Assemble a document, rejecting records whose path is already present.
    ///
    /// Rejected records are returned alongside the document so callers can
    /// report them.
    pub fn assemble(
        kind: DocumentKind,
        root: impl Into<String>,
        records: impl IntoIterator<Item = FileRecord>,
    ) -> (Self, Vec<CorpusError>) {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        let mut rejected = Vec::new();

        for record in records {
            if seen.insert(record.path.clone()) {
                files.push(record);
            } else {
                rejected.push(CorpusError::DuplicatePath(record.path));
            }
        }

        (
            Self {
                kind,
                root: root.into(),
                files,
            },
            rejected,
        )
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

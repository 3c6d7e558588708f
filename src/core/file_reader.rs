//! File reading with encoding fallback
//!
//! Files are decoded as UTF-8 first. Bodies that are not valid UTF-8 are
//! decoded as Latin-1 (ISO-8859-1), which maps every byte to a code point and
//! therefore always succeeds on byte input.

use std::fs;
use std::path::Path;

use crate::core::error::{CorpusError, CorpusResult};

/// Encoding used to decode a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

/// Decoded file content
#[derive(Debug, Clone)]
pub struct SourceText {
    pub content: String,
    pub encoding: Encoding,
}

/// Read a file, falling back to Latin-1 when it is not valid UTF-8
pub fn read_source(path: &Path) -> CorpusResult<SourceText> {
    let bytes = fs::read(path).map_err(|source| CorpusError::TraversalIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode(bytes, path))
}

/// Decode raw bytes as UTF-8, or Latin-1 on failure
pub fn decode(bytes: Vec<u8>, path: &Path) -> SourceText {
    match String::from_utf8(bytes) {
        Ok(content) => SourceText {
            content,
            encoding: Encoding::Utf8,
        },
        Err(err) => {
            tracing::debug!(path = %path.display(), "not valid UTF-8, decoding as Latin-1");
            SourceText {
                content: decode_latin1(err.as_bytes()),
                encoding: Encoding::Latin1,
            }
        }
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

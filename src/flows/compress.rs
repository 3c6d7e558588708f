//! Lexical compression flow
//!
//! Normalizes prose to shrink the token count of a corpus document. Markup is
//! kept when the document is well-formed; otherwise the whole string is
//! normalized as flat text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::markup::ParsedDocument;
use crate::core::stopwords::StopWords;

static LINE_BREAKS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\n\r]+").expect("Invalid LINE_BREAKS_RE regex"));

/// Everything outside letters, digits, whitespace and common punctuation
static DISALLOWED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^a-zA-Z0-9\s_.,!?:;@#$%^&*()+\-=\[\]{}|\\<>`~'"/]+"#)
        .expect("Invalid DISALLOWED_RE regex")
});

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid WHITESPACE_RE regex"));

/// Which path the compressor took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionPath {
    /// Markup preserved, text and tails normalized
    Structured,
    /// Whole document normalized as plain text
    Flat,
}

/// Compressed text and the path that produced it
#[derive(Debug, Clone)]
pub struct Compressed {
    pub text: String,
    pub path: CompressionPath,
}

/// Normalizes documents against a fixed stopword set
#[derive(Debug, Clone, Copy)]
pub struct Compressor<'a> {
    stopwords: &'a StopWords,
}

impl<'a> Compressor<'a> {
    pub fn new(stopwords: &'a StopWords) -> Self {
        Self { stopwords }
    }

    /// Compress a document, keeping its markup when it parses
    pub fn compress(&self, input: &str) -> Compressed {
        match ParsedDocument::parse(input) {
            ParsedDocument::Structured(mut root) => {
                root.for_each_text_mut(&mut |span: &mut String| {
                    if !span.is_empty() {
                        *span = self.normalize(span);
                    }
                });
                Compressed {
                    text: root.to_xml_string(),
                    path: CompressionPath::Structured,
                }
            }
            ParsedDocument::Flat(raw) => {
                tracing::info!("document is not well-formed, normalizing as flat text");
                Compressed {
                    text: self.normalize(&raw),
                    path: CompressionPath::Flat,
                }
            }
        }
    }

    /// Normalize one span: strip odd characters, lowercase, drop stopwords
    pub fn normalize(&self, text: &str) -> String {
        let text = LINE_BREAKS_RE.replace_all(text, "\n");
        let text = DISALLOWED_RE.replace_all(&text, "");
        let text = WHITESPACE_RE.replace_all(&text, " ").to_lowercase();

        text.split_whitespace()
            .filter(|word| !self.stopwords.contains(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

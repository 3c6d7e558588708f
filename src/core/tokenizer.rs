//! Token counting module - Chunked token estimation for LLM context budgeting
//!
//! Markup tags are stripped before counting, then the remaining text is cut
//! into fixed-size character chunks that are encoded independently and
//! summed. Chunking bounds the cost of a single encode call on very large
//! corpora. A token that straddles a chunk boundary is counted twice, so the
//! chunked total is an approximation, exact only for text shorter than one
//! chunk.
//!
//! Supported encodings:
//! - cl100k_base (default; GPT-4, GPT-3.5-turbo, approximates Claude)
//! - o200k_base (GPT-4o native)
//! - a fast heuristic that needs no BPE tables
//!
//! Usage:
//! ```rust,ignore
//! let counter = TokenCounter::new(TokenModel::default(), DEFAULT_CHUNK_SIZE);
//! let tokens = counter.count("<file name=\"a.py\">print('hi')</file>");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};

/// Default chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Generic tag pattern removed before counting
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("Invalid TAG_RE regex"));

// Lazy-initialized BPE encodings (loaded once on first use)
static CL100K_BPE: Lazy<Result<CoreBPE, String>> =
    Lazy::new(|| cl100k_base().map_err(|e| format!("Failed to load cl100k_base: {}", e)));

static O200K_BPE: Lazy<Result<CoreBPE, String>> =
    Lazy::new(|| o200k_base().map_err(|e| format!("Failed to load o200k_base: {}", e)));

/// BPE vocabulary used for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenModel {
    /// cl100k_base (GPT-4 family, close to Claude)
    #[default]
    Cl100k,
    /// o200k_base (GPT-4o)
    O200k,
    /// Character-class estimate, no tables loaded
    Heuristic,
}

/// Accepted spellings for each model, canonical name first
const MODEL_NAMES: &[(TokenModel, &[&str])] = &[
    (
        TokenModel::Cl100k,
        &["cl100k", "cl100k_base", "gpt4", "gpt-4", "claude", "default"],
    ),
    (TokenModel::O200k, &["o200k", "o200k_base", "gpt4o", "gpt-4o"]),
    (TokenModel::Heuristic, &["heuristic", "fast", "estimate"]),
];

impl TokenModel {
    fn encoder(&self) -> Option<&'static Lazy<Result<CoreBPE, String>>> {
        match self {
            TokenModel::Cl100k => Some(&CL100K_BPE),
            TokenModel::O200k => Some(&O200K_BPE),
            TokenModel::Heuristic => None,
        }
    }

    fn bpe(&self) -> Option<&'static CoreBPE> {
        self.encoder().and_then(|lazy| lazy.as_ref().ok())
    }

    /// Load the BPE tables up front, reporting why they are unavailable
    pub fn ensure_loaded(&self) -> Result<(), String> {
        match self.encoder() {
            Some(lazy) => lazy.as_ref().map(|_| ()).map_err(Clone::clone),
            None => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        MODEL_NAMES
            .iter()
            .find(|(model, _)| model == self)
            .map(|(_, names)| names[0])
            .unwrap_or("unknown")
    }

    pub fn available_models() -> Vec<&'static str> {
        MODEL_NAMES.iter().map(|(_, names)| names[0]).collect()
    }
}

impl fmt::Display for TokenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TokenModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        MODEL_NAMES
            .iter()
            .find(|(_, names)| names.contains(&wanted.as_str()))
            .map(|(model, _)| *model)
            .ok_or_else(|| {
                format!(
                    "Unknown model '{}' (expected one of: {})",
                    s,
                    TokenModel::available_models().join(", ")
                )
            })
    }
}

/// Chunked token counter over a fixed vocabulary
#[derive(Debug, Clone, Copy)]
pub struct TokenCounter {
    model: TokenModel,
    chunk_size: usize,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new(TokenModel::default(), DEFAULT_CHUNK_SIZE)
    }
}

impl TokenCounter {
    /// A zero chunk size is treated as one character per chunk
    pub fn new(model: TokenModel, chunk_size: usize) -> Self {
        Self {
            model,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn model(&self) -> TokenModel {
        self.model
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Count tokens of a document: strip tags, chunk, encode, sum
    pub fn count(&self, text: &str) -> usize {
        let stripped = strip_tags(text);
        chunks(&stripped, self.chunk_size)
            .map(|chunk| count_tokens(chunk, self.model))
            .sum()
    }

    /// Same stripping as `count`, encoded in a single call
    pub fn count_whole(&self, text: &str) -> usize {
        count_tokens(&strip_tags(text), self.model)
    }
}

/// Remove every `<...>` span
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Split into consecutive pieces of at most `size` characters
pub fn chunks(text: &str, size: usize) -> impl Iterator<Item = &str> {
    let size = size.max(1);
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(size)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

/// Count tokens in text using the specified model.
///
/// Special-token markers such as `<|endoftext|>` are encoded as ordinary
/// text. Falls back to the heuristic when the BPE tables failed to load.
pub fn count_tokens(text: &str, model: TokenModel) -> usize {
    match model.bpe() {
        _ if text.is_empty() => 0,
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => estimate_tokens_heuristic(text),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    /// ASCII letters, digits and whitespace
    Word,
    /// ASCII punctuation and operators
    Symbol,
    /// Han, kana, Hangul and fullwidth forms
    Cjk,
    Other,
}

impl CharClass {
    const ALL: [CharClass; 4] = [
        CharClass::Word,
        CharClass::Symbol,
        CharClass::Cjk,
        CharClass::Other,
    ];

    fn of(c: char) -> Self {
        match c {
            c if c.is_ascii_alphanumeric() || c.is_ascii_whitespace() => CharClass::Word,
            c if c.is_ascii() => CharClass::Symbol,
            '\u{3000}'..='\u{30FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{AC00}'..='\u{D7AF}'
            | '\u{FF00}'..='\u{FFEF}' => CharClass::Cjk,
            _ => CharClass::Other,
        }
    }

    /// `(chars, tokens)`: how many characters make up how many tokens
    fn ratio(self) -> (usize, usize) {
        match self {
            CharClass::Word => (4, 1),
            CharClass::Symbol | CharClass::Other => (2, 1),
            CharClass::Cjk => (3, 2),
        }
    }
}

/// Estimate tokens from per-class character counts, rounding each class up
pub fn estimate_tokens_heuristic(text: &str) -> usize {
    let mut counts = [0usize; CharClass::ALL.len()];
    for c in text.chars() {
        counts[CharClass::of(c) as usize] += 1;
    }

    CharClass::ALL
        .iter()
        .map(|&class| {
            let (chars, tokens) = class.ratio();
            (counts[class as usize] * tokens).div_ceil(chars)
        })
        .sum()
}

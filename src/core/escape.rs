//! Structure-safe escaping of file bodies
//!
//! Two modes:
//! - Generic: every `&`, `<`, `>` is replaced by its entity
//! - DocComments: for sources whose doc comments already carry markup
//!   (`/// <summary>` style). The body is lexed into a token stream and only
//!   plain code outside balanced `<...>` spans is escaped.
//!
//! The balanced-bracket rule is a heuristic. Generic type syntax like
//! `List<int>` is kept verbatim, but so is `a < b && c > d`, which
//! happens to balance. Unmatched brackets are escaped.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// `///` line comments up to the line break, and `/** ... */` blocks
static DOC_COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)///[^\n]*|/\*\*.*?\*/").expect("Invalid DOC_COMMENT_RE regex")
});

/// Which escaping strategy applies to a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeMode {
    #[default]
    Generic,
    DocComments,
}

impl EscapeMode {
    /// Pick the mode from a source path; C# sources embed XML doc comments
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("cs") => EscapeMode::DocComments,
            _ => EscapeMode::Generic,
        }
    }
}

/// A classified span of a doc-comment-bearing source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Plain code, escaped on output
    Code(&'a str),
    /// Doc comment span, passed through verbatim
    DocComment(&'a str),
    /// Maximal balanced `<...>` span inside code, passed through verbatim
    Balanced(&'a str),
}

impl<'a> Token<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Token::Code(s) | Token::DocComment(s) | Token::Balanced(s) => s,
        }
    }
}

/// Escape `&`, `<`, `>` (ampersand first so new entities are not re-escaped)
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape for use inside a double-quoted attribute value
pub fn escape_attr(text: &str) -> String {
    escape_xml(text).replace('"', "&quot;")
}

/// Escape a body with the given mode
pub fn escape(text: &str, mode: EscapeMode) -> String {
    match mode {
        EscapeMode::Generic => escape_xml(text),
        EscapeMode::DocComments => escape_doc_comments(text),
    }
}

/// Escape a source while leaving doc comments and balanced brackets intact
pub fn escape_doc_comments(source: &str) -> String {
    let mut output = String::with_capacity(source.len() + source.len() / 8);
    for token in lex_doc_comments(source) {
        match token {
            Token::Code(code) => output.push_str(&escape_xml(code)),
            verbatim => output.push_str(verbatim.as_str()),
        }
    }
    output
}

/// Split a source into doc-comment, balanced-bracket and code tokens.
///
/// Concatenating the token texts reproduces the input exactly.
pub fn lex_doc_comments(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for m in DOC_COMMENT_RE.find_iter(source) {
        lex_code(&source[last..m.start()], &mut tokens);
        tokens.push(Token::DocComment(m.as_str()));
        last = m.end();
    }
    lex_code(&source[last..], &mut tokens);

    tokens
}

fn lex_code<'a>(code: &'a str, tokens: &mut Vec<Token<'a>>) {
    let mut last = 0;
    for (start, end) in balanced_spans(code) {
        if start > last {
            tokens.push(Token::Code(&code[last..start]));
        }
        tokens.push(Token::Balanced(&code[start..end]));
        last = end;
    }
    if last < code.len() {
        tokens.push(Token::Code(&code[last..]));
    }
}

/// Byte ranges of the outermost matched `<`/`>` pairs, in order
fn balanced_spans(code: &str) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut pairs = Vec::new();

    // '<' and '>' are ASCII, so byte offsets are always char boundaries
    for (i, byte) in code.bytes().enumerate() {
        match byte {
            b'<' => open.push(i),
            b'>' => {
                if let Some(start) = open.pop() {
                    pairs.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    // Stack matching yields properly nested pairs; keep the outermost ones
    pairs.sort_unstable();
    let mut spans = Vec::with_capacity(pairs.len());
    let mut covered = 0;
    for (start, end) in pairs {
        if start >= covered {
            spans.push((start, end));
            covered = end;
        }
    }
    spans
}

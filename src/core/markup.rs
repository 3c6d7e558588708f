//! Markup parsing for the compressor
//!
//! A document is parsed once into an element tree. When it is not
//! well-formed the raw text is kept instead, so callers dispatch on the
//! variant rather than on a parse error.
//!
//! The tree follows the element/text/tail shape: `text` is the character
//! data before the first child, `tail` the character data after an element's
//! closing tag and before its next sibling.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::error::{CorpusError, CorpusResult};
use crate::core::escape::{escape_attr, escape_xml};

/// An element with its attributes, text, children and tail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
    pub tail: String,
}

impl Element {
    /// Apply `f` to every text and tail span, in document order
    pub fn for_each_text_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut String),
    {
        f(&mut self.text);
        for child in &mut self.children {
            child.for_each_text_mut(f);
        }
        f(&mut self.tail);
    }

    /// Serialize this element, its subtree and its tail
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_attribute_value(value));
            out.push('"');
        }

        if self.text.is_empty() && self.children.is_empty() {
            out.push_str(" />");
        } else {
            out.push('>');
            out.push_str(&escape_xml(&self.text));
            for child in &self.children {
                child.write_to(out);
            }
            out.push_str("</");
            out.push_str(&self.name);
            out.push('>');
        }

        out.push_str(&escape_xml(&self.tail));
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

/// Result of a single parse attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDocument {
    /// Well-formed markup
    Structured(Element),
    /// Anything else, kept verbatim
    Flat(String),
}

impl ParsedDocument {
    pub fn parse(input: &str) -> Self {
        match parse_element_tree(input) {
            Ok(root) => ParsedDocument::Structured(root),
            Err(err) => {
                tracing::debug!(error = %err, "document is not well-formed markup");
                ParsedDocument::Flat(input.to_string())
            }
        }
    }
}

/// Parse a document with exactly one root element into a tree.
///
/// Comments, declarations and processing instructions are dropped.
pub fn parse_element_tree(input: &str) -> CorpusResult<Element> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            markup_error(format!("{} at byte {}", e, reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => {
                ensure_single_root(&stack, &root)?;
                stack.push(open_element(&start)?);
            }
            Event::Empty(start) => {
                ensure_single_root(&stack, &root)?;
                let element = open_element(&start)?;
                attach(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| markup_error("closing tag without opening tag"))?;
                attach(element, &mut stack, &mut root);
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| markup_error(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let text = String::from_utf8(data.into_inner().into_owned())
                    .map_err(|e| markup_error(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(markup_error(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| markup_error("no root element"))
}

fn open_element(start: &BytesStart<'_>) -> CorpusResult<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| markup_error(e.to_string()))?
        .to_string();
    if !is_valid_name(&name) {
        return Err(markup_error(format!("invalid element name {:?}", name)));
    }

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| markup_error(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| markup_error(e.to_string()))?
            .to_string();
        if !is_valid_name(&key) {
            return Err(markup_error(format!("invalid attribute name {:?}", key)));
        }
        let value = attr
            .unescape_value()
            .map_err(|e| markup_error(e.to_string()))?
            .into_owned();
        ensure_xml_chars(&value)?;
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        ..Default::default()
    })
}

fn ensure_single_root(stack: &[Element], root: &Option<Element>) -> CorpusResult<()> {
    if stack.is_empty() && root.is_some() {
        return Err(markup_error("junk after document element"));
    }
    Ok(())
}

fn attach(element: Element, stack: &mut [Element], root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn append_text(stack: &mut [Element], text: &str) -> CorpusResult<()> {
    ensure_xml_chars(text)?;
    match stack.last_mut() {
        Some(parent) => match parent.children.last_mut() {
            Some(sibling) => sibling.tail.push_str(text),
            None => parent.text.push_str(text),
        },
        None if text.trim().is_empty() => {}
        None => return Err(markup_error("text outside the root element")),
    }
    Ok(())
}

/// XML 1.0 `Char`: tab, newline, carriage return and everything from U+0020
/// except surrogates, U+FFFE and U+FFFF
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

fn ensure_xml_chars(text: &str) -> CorpusResult<()> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(markup_error(format!(
            "character U+{:04X} is not allowed in XML",
            c as u32
        ))),
        None => Ok(()),
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

fn escape_attribute_value(value: &str) -> String {
    escape_attr(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#09;")
}

fn markup_error(message: impl Into<String>) -> CorpusError {
    CorpusError::Markup(message.into())
}

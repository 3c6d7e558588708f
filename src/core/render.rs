//! Document serializer
//!
//! Renders a `SourceDocument` to the corpus wire format:
//!
//! ```text
//! <source type="local_directory" path="...">
//! <file name="src/main.py">...escaped body...</file>
//! </source>
//! ```

use crate::core::escape::escape_attr;
use crate::core::model::SourceDocument;

/// Render the whole document to a single string
pub fn render_document(document: &SourceDocument) -> String {
    let body_len: usize = document
        .files()
        .iter()
        .map(|f| f.body.len() + f.path.len() + 24)
        .sum();
    let mut output = String::with_capacity(body_len + document.root.len() + 64);

    output.push_str(&format!(
        "<source type=\"{}\" path=\"{}\">\n",
        document.kind.as_str(),
        escape_attr(&document.root)
    ));

    for file in document.files() {
        output.push_str("<file name=\"");
        output.push_str(&escape_attr(&file.path));
        output.push_str("\">");
        output.push_str(&file.body);
        output.push_str("</file>\n");
    }

    output.push_str("</source>");
    output
}

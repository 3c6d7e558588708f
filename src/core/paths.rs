//! Path normalization and artifact naming
//!
//! Document paths always use '/' as separator and are relative to the root.

use chrono::NaiveDateTime;
use std::path::{Component, Path, PathBuf};

use crate::core::model::DocumentKind;

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Slug from the last two normal components of a path, joined by '-'.
///
/// Characters outside `[A-Za-z0-9._-]` become '_'.
pub fn path_slug(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let tail = &parts[parts.len().saturating_sub(2)..];
    let slug: String = tail
        .join("-")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if slug.is_empty() {
        "root".to_string()
    } else {
        slug
    }
}

/// File names of the uncompressed and compressed artifacts
pub fn artifact_names(
    kind: DocumentKind,
    input: &Path,
    timestamp: NaiveDateTime,
) -> (String, String) {
    let stamp = timestamp.format("%Y%m%d-%H%M%S");
    let slug = path_slug(input);
    (
        format!("uncom_{}_{}_{}.txt", kind.prefix(), slug, stamp),
        format!("com_{}_{}_{}.txt", kind.prefix(), slug, stamp),
    )
}

/// Full artifact paths inside an output directory
pub fn artifact_paths(
    output_dir: &Path,
    kind: DocumentKind,
    input: &Path,
    timestamp: NaiveDateTime,
) -> (PathBuf, PathBuf) {
    let (uncompressed, compressed) = artifact_names(kind, input, timestamp);
    (output_dir.join(uncompressed), output_dir.join(compressed))
}

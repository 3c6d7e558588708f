//! File scanning backend
//!
//! Uses walkdir for traversal. Excluded directories are pruned with
//! `filter_entry`, so their contents are never read.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::error::{CorpusError, CorpusResult};
use crate::core::filter::{is_eligible_dir, is_eligible_file};
use crate::core::model::DocumentKind;
use crate::core::paths::{make_relative, normalize_path};

/// Traversal options
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Sort entries by file name at every level. Off by default, in which
    /// case order follows directory enumeration and is filesystem dependent.
    pub sorted: bool,
}

/// Eligible files found under a root, in emission order
#[derive(Debug)]
pub struct Scan {
    pub kind: DocumentKind,
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    /// Entries that could not be visited
    pub errors: Vec<CorpusError>,
}

impl Scan {
    /// Path of a file relative to the scan root, '/'-separated.
    ///
    /// In single-file mode this is the file name.
    pub fn relative_path(&self, path: &Path) -> String {
        match self.kind {
            DocumentKind::SingleFile => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| normalize_path(path)),
            DocumentKind::LocalDirectory => {
                make_relative(path, &self.root).unwrap_or_else(|| normalize_path(path))
            }
        }
    }
}

/// Scan a single file or a directory tree
pub fn scan_files(root: &Path, options: ScanOptions) -> CorpusResult<Scan> {
    let metadata = fs::metadata(root).map_err(|source| CorpusError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    if metadata.is_dir() {
        Ok(scan_directory(root, options))
    } else {
        scan_single_file(root)
    }
}

fn scan_single_file(path: &Path) -> CorpusResult<Scan> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    if !is_eligible_file(&name) {
        return Err(CorpusError::Validation {
            path: path.to_path_buf(),
            reason: "file type is not eligible".to_string(),
        });
    }

    Ok(Scan {
        kind: DocumentKind::SingleFile,
        root: path.to_path_buf(),
        files: vec![path.to_path_buf()],
        errors: Vec::new(),
    })
}

fn scan_directory(root: &Path, options: ScanOptions) -> Scan {
    let mut walker = WalkDir::new(root).follow_links(false);
    if options.sorted {
        walker = walker.sort_by_file_name();
    }

    let mut files = Vec::new();
    let mut errors = Vec::new();

    let entries = walker.into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || is_eligible_dir(&entry.file_name().to_string_lossy())
    });

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                errors.push(CorpusError::TraversalIo {
                    path,
                    source: err.into(),
                });
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        if !is_eligible_file(&entry.file_name().to_string_lossy()) {
            continue;
        }

        // Symlinks count only when they resolve to a regular file
        if entry.file_type().is_symlink() && !entry.path().is_file() {
            tracing::debug!(path = %entry.path().display(), "skipping symlink");
            continue;
        }

        files.push(entry.into_path());
    }

    tracing::debug!(root = %root.display(), files = files.len(), "scan complete");

    Scan {
        kind: DocumentKind::LocalDirectory,
        root: root.to_path_buf(),
        files,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn relative_paths(scan: &Scan) -> Vec<String> {
        scan.files.iter().map(|p| scan.relative_path(p)).collect()
    }

    #[test]
    fn test_scan_empty_dir() {
        let temp = tempdir().unwrap();
        let scan = scan_files(temp.path(), ScanOptions::default()).unwrap();
        assert_eq!(scan.kind, DocumentKind::LocalDirectory);
        assert!(scan.files.is_empty());
    }

    #[test]
    fn test_scan_filters_files() {
        let temp = tempdir().unwrap();
        File::create(temp.path().join("main.py")).unwrap();
        File::create(temp.path().join("notes.md")).unwrap();
        File::create(temp.path().join("app.exe")).unwrap();
        File::create(temp.path().join(".env")).unwrap();
        File::create(temp.path().join("package.json")).unwrap();

        let scan = scan_files(temp.path(), ScanOptions { sorted: true }).unwrap();
        assert_eq!(relative_paths(&scan), vec!["main.py", "notes.md"]);
    }

    #[test]
    fn test_scan_prunes_excluded_dirs() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("node_modules/pkg")).unwrap();
        fs::create_dir_all(temp.path().join(".git/objects")).unwrap();
        fs::create_dir_all(temp.path().join("src/__pycache__")).unwrap();
        File::create(temp.path().join("node_modules/pkg/index.js")).unwrap();
        File::create(temp.path().join(".git/objects/notes.txt")).unwrap();
        File::create(temp.path().join("src/__pycache__/mod.py")).unwrap();
        File::create(temp.path().join("src/app.ts")).unwrap();

        let scan = scan_files(temp.path(), ScanOptions { sorted: true }).unwrap();
        assert_eq!(relative_paths(&scan), vec!["src/app.ts"]);
    }

    #[test]
    fn test_scan_root_named_like_excluded_dir() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("build");
        fs::create_dir(&root).unwrap();
        File::create(root.join("readme.txt")).unwrap();

        let scan = scan_files(&root, ScanOptions::default()).unwrap();
        assert_eq!(relative_paths(&scan), vec!["readme.txt"]);
    }

    #[test]
    fn test_scan_sorted_order() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        File::create(temp.path().join("b.txt")).unwrap();
        File::create(temp.path().join("a.txt")).unwrap();
        File::create(temp.path().join("sub/z.md")).unwrap();

        let scan = scan_files(temp.path(), ScanOptions { sorted: true }).unwrap();
        assert_eq!(relative_paths(&scan), vec!["a.txt", "b.txt", "sub/z.md"]);
    }

    #[test]
    fn test_scan_single_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("script.sh");
        File::create(&file).unwrap();

        let scan = scan_files(&file, ScanOptions::default()).unwrap();
        assert_eq!(scan.kind, DocumentKind::SingleFile);
        assert_eq!(relative_paths(&scan), vec!["script.sh"]);
    }

    #[test]
    fn test_scan_single_file_ineligible() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("a.exe");
        File::create(&file).unwrap();

        let err = scan_files(&file, ScanOptions::default()).unwrap_err();
        assert!(matches!(err, CorpusError::Validation { .. }));
    }

    #[test]
    fn test_scan_missing_root() {
        let err = scan_files(Path::new("/nonexistent/root"), ScanOptions::default()).unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}

//! Corpus packing flow - Build the annotated corpus and its compressed variant
//!
//! scan → read + escape each file → assemble document → count tokens →
//! compress → count tokens → write both artifacts → report.
//!
//! Per-file failures are logged and skipped. With the `parallel` feature the
//! per-file stage runs on rayon; records are collected back in scan order so
//! the document is identical to a sequential run.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::backends::scan::{scan_files, Scan, ScanOptions};
use crate::core::error::{CorpusError, CorpusResult};
use crate::core::escape::{escape, EscapeMode};
use crate::core::file_reader::{read_source, Encoding};
use crate::core::model::{DocumentKind, FileRecord, SourceDocument};
use crate::core::paths::{artifact_paths, normalize_path};
use crate::core::render::render_document;
use crate::core::stopwords::StopWords;
use crate::core::tokenizer::{TokenCounter, TokenModel, DEFAULT_CHUNK_SIZE};
use crate::flows::compress::{CompressionPath, Compressor};

/// Default number of files between progress lines
pub const DEFAULT_PROGRESS_EVERY: usize = 50;

/// Options for the pack flow
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Directory receiving both artifacts
    pub output_dir: PathBuf,
    /// Characters per token-counting chunk
    pub chunk_size: usize,
    /// Token model for counting (default: cl100k)
    pub token_model: TokenModel,
    /// Deterministic traversal order
    pub sorted: bool,
    /// Files between progress lines (0 disables them)
    pub progress_every: usize,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            chunk_size: DEFAULT_CHUNK_SIZE,
            token_model: TokenModel::default(),
            sorted: false,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// Summary format printed on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(SummaryFormat::Text),
            "json" => Ok(SummaryFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// An assembled corpus with both variants and their token counts
#[derive(Debug)]
pub struct Corpus {
    pub document: SourceDocument,
    pub rendered: String,
    pub compressed: String,
    pub compression_path: CompressionPath,
    pub uncompressed_tokens: usize,
    pub compressed_tokens: usize,
    /// Files that were found but could not be read or were rejected
    pub files_skipped: usize,
}

/// Run summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackReport {
    pub kind: DocumentKind,
    pub root: String,
    pub files_included: usize,
    pub files_skipped: usize,
    pub uncompressed_tokens: usize,
    pub compressed_tokens: usize,
    pub compression_path: CompressionPath,
    pub token_model: String,
    pub chunk_size: usize,
    pub uncompressed_file: String,
    pub compressed_file: String,
    pub elapsed_ms: u64,
}

/// Progress reporting shared across workers
struct Progress {
    total: usize,
    every: usize,
    done: AtomicUsize,
    started: Instant,
}

impl Progress {
    fn new(total: usize, every: usize) -> Self {
        Self {
            total,
            every,
            done: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    fn tick(&self, path: &Path) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(path = %path.display(), "processed");

        if self.every == 0 || done % self.every != 0 || done >= self.total {
            return;
        }
        let per_file = self.started.elapsed().as_secs_f64() / done as f64;
        let remaining = per_file * (self.total - done) as f64;
        tracing::info!(
            "Processed {}/{} files, ~{:.1}s remaining",
            done,
            self.total,
            remaining
        );
    }
}

/// Read and escape one file into a record.
///
/// In single-file mode the file is the whole input, so a read failure is a
/// top-level `Io` error rather than a skippable traversal error.
fn process_file(scan: &Scan, path: &Path) -> CorpusResult<FileRecord> {
    let source = read_source(path).map_err(|err| match (scan.kind, err) {
        (DocumentKind::SingleFile, CorpusError::TraversalIo { path, source }) => {
            CorpusError::Io { path, source }
        }
        (_, err) => err,
    })?;
    if source.encoding == Encoding::Latin1 {
        tracing::warn!(path = %path.display(), "not valid UTF-8, decoded as Latin-1");
    }
    let body = escape(&source.content, EscapeMode::for_path(path));
    Ok(FileRecord::new(scan.relative_path(path), body))
}

#[cfg(not(feature = "parallel"))]
fn process_files(scan: &Scan, progress: &Progress) -> Vec<CorpusResult<FileRecord>> {
    scan.files
        .iter()
        .map(|path| {
            let record = process_file(scan, path);
            progress.tick(path);
            record
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn process_files(scan: &Scan, progress: &Progress) -> Vec<CorpusResult<FileRecord>> {
    use rayon::prelude::*;

    // Indexed collect keeps scan order
    scan.files
        .par_iter()
        .map(|path| {
            let record = process_file(scan, path);
            progress.tick(path);
            record
        })
        .collect()
}

/// Build the document for an input path and derive its compressed variant.
///
/// Fails only on fatal errors (ineligible or unreadable single file, missing
/// root).
pub fn build_corpus(
    input: &Path,
    options: &PackOptions,
    stopwords: &StopWords,
) -> CorpusResult<Corpus> {
    let scan = scan_files(
        input,
        ScanOptions {
            sorted: options.sorted,
        },
    )?;
    tracing::info!("Found {} eligible files under {}", scan.files.len(), input.display());
    corpus_from_scan(&scan, input, options, stopwords)
}

fn corpus_from_scan(
    scan: &Scan,
    input: &Path,
    options: &PackOptions,
    stopwords: &StopWords,
) -> CorpusResult<Corpus> {
    let progress = Progress::new(scan.files.len(), options.progress_every);
    let mut files_skipped = scan.errors.len();
    let mut records = Vec::with_capacity(scan.files.len());

    for result in process_files(scan, &progress) {
        match result {
            Ok(record) => records.push(record),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::warn!("Skipping file: {}", err);
                files_skipped += 1;
            }
        }
    }

    let (document, rejected) =
        SourceDocument::assemble(scan.kind, normalize_path(input), records);
    for err in &rejected {
        tracing::warn!("Skipping file: {}", err);
    }
    files_skipped += rejected.len();
    if document.is_empty() {
        tracing::warn!("No eligible files found under {}", input.display());
    }

    let rendered = render_document(&document);

    let counter = TokenCounter::new(options.token_model, options.chunk_size);
    tracing::debug!(
        model = %counter.model(),
        chunk_size = counter.chunk_size(),
        "counting tokens"
    );
    let uncompressed_tokens = counter.count(&rendered);
    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!(
            chunked = uncompressed_tokens,
            whole = counter.count_whole(&rendered),
            "chunk boundary drift"
        );
    }

    let compressed = Compressor::new(stopwords).compress(&rendered);
    let compressed_tokens = counter.count(&compressed.text);

    Ok(Corpus {
        document,
        rendered,
        compressed: compressed.text,
        compression_path: compressed.path,
        uncompressed_tokens,
        compressed_tokens,
        files_skipped,
    })
}

/// Write both variants into the output directory
pub fn write_artifacts(
    corpus: &Corpus,
    input: &Path,
    output_dir: &Path,
) -> CorpusResult<(PathBuf, PathBuf)> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| CorpusError::Io { path, source }
    };

    fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;

    let timestamp = chrono::Local::now().naive_local();
    let (uncompressed_path, compressed_path) =
        artifact_paths(output_dir, corpus.document.kind, input, timestamp);

    fs::write(&uncompressed_path, &corpus.rendered).map_err(io_error(&uncompressed_path))?;
    fs::write(&compressed_path, &corpus.compressed).map_err(io_error(&compressed_path))?;

    Ok((uncompressed_path, compressed_path))
}

/// Run the pack command
pub fn run_pack(
    input: &Path,
    options: &PackOptions,
    stopwords: &StopWords,
    format: SummaryFormat,
) -> Result<PackReport> {
    let started = Instant::now();

    if let Err(e) = options.token_model.ensure_loaded() {
        tracing::warn!("{}; falling back to heuristic estimates", e);
    }

    tracing::info!("Processing {}", input.display());
    let corpus = build_corpus(input, options, stopwords)
        .with_context(|| format!("Failed to build corpus for {}", input.display()))?;

    let (uncompressed_path, compressed_path) =
        write_artifacts(&corpus, input, &options.output_dir)
            .context("Failed to write output files")?;

    let report = PackReport {
        kind: corpus.document.kind,
        root: corpus.document.root.clone(),
        files_included: corpus.document.len(),
        files_skipped: corpus.files_skipped,
        uncompressed_tokens: corpus.uncompressed_tokens,
        compressed_tokens: corpus.compressed_tokens,
        compression_path: corpus.compression_path,
        token_model: options.token_model.to_string(),
        chunk_size: options.chunk_size,
        uncompressed_file: normalize_path(&uncompressed_path),
        compressed_file: normalize_path(&compressed_path),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    print_summary(&report, format)?;
    Ok(report)
}

fn print_summary(report: &PackReport, format: SummaryFormat) -> Result<()> {
    match format {
        SummaryFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        SummaryFormat::Text => {
            println!();
            println!(
                "{} {}",
                "Files included:".bold(),
                report.files_included.to_string().cyan()
            );
            if report.files_skipped > 0 {
                println!(
                    "{} {}",
                    "Files skipped:".bold(),
                    report.files_skipped.to_string().yellow()
                );
            }
            println!(
                "{} {}",
                "Uncompressed Token Count:".bold(),
                report.uncompressed_tokens.to_string().cyan()
            );
            println!(
                "{} {}",
                "Compressed Token Count:".bold(),
                report.compressed_tokens.to_string().green()
            );
            println!();
            println!(
                "{} and {} have been created.",
                report.uncompressed_file, report.compressed_file
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn sorted_options() -> PackOptions {
        PackOptions {
            sorted: true,
            token_model: TokenModel::Heuristic,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_corpus_directory() {
        let temp = tempdir().unwrap();
        write_file(&temp.path().join("a.py"), "print('<3')");
        write_file(&temp.path().join("b.md"), "# hi & bye");
        write_file(&temp.path().join("node_modules/x/index.js"), "secret()");

        let corpus =
            build_corpus(temp.path(), &sorted_options(), &StopWords::english()).unwrap();

        let expected = format!(
            "<source type=\"local_directory\" path=\"{}\">\n\
             <file name=\"a.py\">print('&lt;3')</file>\n\
             <file name=\"b.md\"># hi &amp; bye</file>\n\
             </source>",
            normalize_path(temp.path())
        );
        assert_eq!(corpus.rendered, expected);
        assert!(!corpus.rendered.contains("node_modules"));
        assert_eq!(corpus.files_skipped, 0);
        assert_eq!(corpus.compression_path, CompressionPath::Structured);
        assert!(corpus.uncompressed_tokens > 0);
        assert!(corpus.compressed_tokens <= corpus.uncompressed_tokens);
    }

    #[test]
    fn test_build_corpus_single_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("notes.txt");
        write_file(&file, "This is the plan");

        let corpus = build_corpus(&file, &sorted_options(), &StopWords::english()).unwrap();
        assert_eq!(corpus.document.kind, DocumentKind::SingleFile);
        assert!(corpus
            .rendered
            .contains("<file name=\"notes.txt\">This is the plan</file>"));
        assert!(corpus.compressed.contains("<file name=\"notes.txt\">plan</file>"));
    }

    #[test]
    fn test_build_corpus_rejects_ineligible_single_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("tool.exe");
        write_file(&file, "MZ");

        let err = build_corpus(&file, &sorted_options(), &StopWords::english()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_doc_comment_source_falls_back_when_unbalanced() {
        let temp = tempdir().unwrap();
        write_file(
            &temp.path().join("Calc.cs"),
            "/// <summary>Adds numbers</summary>\nint Add(int a, int b) { return a + b; }\n",
        );
        write_file(&temp.path().join("Bad.cs"), "/// <param name=\"x\">\nvoid F(int x) {}\n");

        let corpus =
            build_corpus(temp.path(), &sorted_options(), &StopWords::english()).unwrap();
        assert!(corpus
            .rendered
            .contains("/// <summary>Adds numbers</summary>"));
        // Unclosed <param> cannot parse, so compression degrades to flat text
        assert_eq!(corpus.compression_path, CompressionPath::Flat);
        assert!(!corpus.compressed.is_empty());
    }

    #[test]
    fn test_latin1_file_is_included() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("old.txt"), [0x63, 0x61, 0x66, 0xE9]).unwrap();

        let corpus =
            build_corpus(temp.path(), &sorted_options(), &StopWords::english()).unwrap();
        assert!(corpus.rendered.contains("<file name=\"old.txt\">café</file>"));
    }

    #[test]
    fn test_vanished_file_is_skipped_during_traversal() {
        let temp = tempdir().unwrap();
        write_file(&temp.path().join("ok.py"), "x = 1");
        let scan = Scan {
            kind: DocumentKind::LocalDirectory,
            root: temp.path().to_path_buf(),
            files: vec![temp.path().join("gone.py"), temp.path().join("ok.py")],
            errors: Vec::new(),
        };

        let corpus =
            corpus_from_scan(&scan, temp.path(), &sorted_options(), &StopWords::english())
                .unwrap();
        assert_eq!(corpus.document.len(), 1);
        assert_eq!(corpus.document.files()[0].path, "ok.py");
        assert_eq!(corpus.files_skipped, 1);
        assert!(!corpus.rendered.contains("gone.py"));
    }

    #[test]
    fn test_unreadable_single_file_is_fatal() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("gone.py");
        let scan = Scan {
            kind: DocumentKind::SingleFile,
            root: file.clone(),
            files: vec![file.clone()],
            errors: Vec::new(),
        };

        let err = corpus_from_scan(&scan, &file, &sorted_options(), &StopWords::english())
            .unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_control_characters_take_flat_path() {
        let temp = tempdir().unwrap();
        write_file(&temp.path().join("log.txt"), "page\u{0c}break \u{1b}[31mred");

        let corpus =
            build_corpus(temp.path(), &sorted_options(), &StopWords::english()).unwrap();
        assert_eq!(corpus.compression_path, CompressionPath::Flat);
        assert!(!corpus.compressed.contains('\u{1b}'));
    }

    #[test]
    fn test_write_artifacts() {
        let temp = tempdir().unwrap();
        write_file(&temp.path().join("src/a.py"), "x = 1");
        let out = temp.path().join("out/nested");

        let corpus =
            build_corpus(&temp.path().join("src"), &sorted_options(), &StopWords::english())
                .unwrap();
        let (uncompressed, compressed) =
            write_artifacts(&corpus, &temp.path().join("src"), &out).unwrap();

        assert!(uncompressed
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("uncom_dir_"));
        assert_eq!(fs::read_to_string(&uncompressed).unwrap(), corpus.rendered);
        assert_eq!(fs::read_to_string(&compressed).unwrap(), corpus.compressed);
    }

    #[test]
    fn test_summary_format_from_str() {
        assert_eq!("json".parse::<SummaryFormat>().unwrap(), SummaryFormat::Json);
        assert_eq!("TEXT".parse::<SummaryFormat>().unwrap(), SummaryFormat::Text);
        assert!("xml".parse::<SummaryFormat>().is_err());
    }
}

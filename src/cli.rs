//! CLI module - Command-line interface definitions and handlers

use anyhow::{Context, Result};
use clap::builder::TypedValueParser;
use clap::Parser;
use std::path::PathBuf;

use crate::core::stopwords::StopWords;
use crate::core::tokenizer::{TokenModel, DEFAULT_CHUNK_SIZE};
use crate::flows::pack::{PackOptions, SummaryFormat, DEFAULT_PROGRESS_EVERY};
use crate::logging::{init_logging, Verbosity};

/// corpusc - pack a file or directory tree into an annotated corpus for LLMs.
#[derive(Parser, Debug)]
#[command(name = "corpusc")]
#[command(
    author,
    version,
    about,
    long_about = r#"corpusc walks a file or directory tree and writes two artifacts:

- uncom_*.txt: every eligible file wrapped in <file name="..."> elements inside a
  single <source type="..." path="..."> element, with bodies escaped
- com_*.txt: the same document with prose lowercased, stripped of unusual
  characters and English stopwords, to cut the token count

Token counts for both artifacts are printed on completion.

Examples:
    corpusc ./my-project
    corpusc src/main.py --output-dir out
    corpusc . --sorted --format json
"#
)]
pub struct Cli {
    /// File or directory to pack (prompted for when omitted).
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Directory receiving the output artifacts.
    #[arg(
        short,
        long,
        env = "CORPUSC_OUTPUT_DIR",
        default_value = ".",
        value_name = "DIR",
        long_help = "Directory receiving the uncompressed and compressed artifacts.\n\n\
Created if it does not exist."
    )]
    pub output_dir: PathBuf,

    /// Characters per token-counting chunk.
    #[arg(
        long,
        env = "CORPUSC_CHUNK_SIZE",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = clap::value_parser!(u64).range(1..).map(|n| n as usize),
        value_name = "N",
        long_help = "Characters per chunk when counting tokens.\n\n\
Markup is stripped, the text is cut into chunks of N characters and each chunk is\n\
encoded separately. Smaller chunks bound the cost per call but overcount tokens\n\
that straddle a boundary."
    )]
    pub chunk_size: usize,

    /// Token model (cl100k/o200k/heuristic).
    #[arg(
        long,
        env = "CORPUSC_MODEL",
        default_value = "cl100k",
        value_name = "MODEL",
        long_help = "Encoding used for token counts.\n\n\
Supported values:\n\
- cl100k (default): GPT-4 / GPT-3.5, approximates Claude\n\
- o200k: GPT-4o\n\
- heuristic: fast estimate without BPE tables"
    )]
    pub model: String,

    /// Stopword list replacing the built-in English set.
    #[arg(
        long,
        value_name = "FILE",
        long_help = "Stopword list, one word per line. Blank lines and lines starting with '#'\n\
are ignored. Replaces the built-in English set."
    )]
    pub stopwords: Option<PathBuf>,

    /// Sort entries by name for deterministic output.
    #[arg(
        long,
        long_help = "Sort directory entries by file name at every level.\n\n\
By default files appear in directory enumeration order, which depends on the\n\
filesystem."
    )]
    pub sorted: bool,

    /// Files between progress lines (0 disables).
    #[arg(long, default_value_t = DEFAULT_PROGRESS_EVERY, value_name = "N")]
    pub progress_every: usize,

    /// Summary format on stdout (text/json).
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: String,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode (warnings and errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode (per-file diagnostics).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve flags into pack options
    pub fn pack_options(&self) -> Result<PackOptions> {
        let token_model: TokenModel = self
            .model
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;

        Ok(PackOptions {
            output_dir: self.output_dir.clone(),
            chunk_size: self.chunk_size,
            token_model,
            sorted: self.sorted,
            progress_every: self.progress_every,
        })
    }
}

/// Ask for the input path interactively
fn prompt_path() -> Result<PathBuf> {
    let input: String = dialoguer::Input::new()
        .with_prompt("Enter the local directory path")
        .interact_text()
        .context("Failed to read input path")?;
    Ok(PathBuf::from(input.trim()))
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(Verbosity::from_flags(cli.quiet, cli.verbose), !cli.no_color)?;

    let format: SummaryFormat = cli.format.parse().unwrap_or_default();
    let options = cli.pack_options()?;

    let stopwords = match &cli.stopwords {
        Some(path) => StopWords::load(path).context("Failed to load stopwords")?,
        None => StopWords::english(),
    };
    if stopwords.is_empty() {
        tracing::warn!("Stopword list is empty, compression will only normalize text");
    }
    tracing::debug!(words = stopwords.len(), "stopwords loaded");

    let input = match cli.path {
        Some(path) => path,
        None => prompt_path()?,
    };

    if let Err(err) = crate::flows::pack::run_pack(&input, &options, &stopwords, format) {
        tracing::error!("An error occurred: {:#}", err);
        return Err(err);
    }
    Ok(())
}

//! corpusc - Pack source trees into token-budgeted corpora for LLMs
//!
//! corpusc provides:
//! - Directory traversal with a fixed inclusion/exclusion policy
//! - Structure-preserving escaping, aware of XML doc comments
//! - Chunked token counting (tiktoken)
//! - Markup-aware lexical compression

use anyhow::Result;
use clap::Parser;

mod backends;
mod cli;
mod core;
mod flows;
mod logging;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::run(cli)
}

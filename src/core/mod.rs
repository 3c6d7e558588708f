//! Core module - Corpus data model and the pieces that build it
//!
//! This module provides:
//! - Inclusion policy for files and directories
//! - Structure-safe escaping (generic and doc-comment aware)
//! - The corpus document model and its serializer
//! - Markup parsing for the compressor
//! - Chunked token counting for LLM context budgeting
//! - File reading with encoding fallback
//! - Path normalization and artifact naming

pub mod error;
pub mod escape;
pub mod file_reader;
pub mod filter;
pub mod markup;
pub mod model;
pub mod paths;
pub mod render;
pub mod stopwords;
pub mod tokenizer;

//! Flows module - Operations combining multiple core pieces
//!
//! Provides:
//! - compress: Markup-aware lexical normalization
//! - pack: Build, count, compress and write a corpus

pub mod compress;
pub mod pack;

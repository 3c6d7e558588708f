//! Backends module - File system traversal
//!
//! Provides:
//! - scan: Eligible-file discovery with walkdir

pub mod scan;

//! File parsing modules
//!
//! Low-level readers and writers for delimited contact files.

pub mod csv_parser;

// Re-export commonly used parsers
pub use csv_parser::*;

//! Command handlers
//!
//! Entry points used by the command-line front end. Commands are organized
//! by concern and report failures as display strings.

pub mod dispatch;
pub mod import;

// Re-export all command functions for easy access
pub use dispatch::*;
pub use import::*;

//! Core business logic module
//!
//! Contact ingestion, campaign payloads, tracking and the webhook client,
//! together with the shared models, errors and configuration.

pub mod config;
pub mod contact_parser;
pub mod dispatch;
pub mod document;
pub mod error_handling;
pub mod export;
pub mod models;
pub mod phone;
pub mod tracking;
pub mod webhook;

#[cfg(test)]
mod contact_parser_tests;

// Re-export commonly used types
pub use config::AppConfig;
pub use contact_parser::{ContactImporter, ContactParser};

//! WhatsApp Dispatcher - Core Library
//!
//! Contact list ingestion (structure check, parsing, phone canonicalization),
//! campaign payload construction and the webhook client used to schedule
//! campaigns and follow their delivery.

pub mod commands;
pub mod core;
pub mod parsers;
pub mod utils;

// Re-export commonly used types
pub use self::core::{
    config::AppConfig,
    contact_parser::{ContactImporter, ContactParser},
    dispatch::{build_dispatch_payload, CampaignDraft, ChannelSelection, DispatchPayload},
    document::{DocumentSource, FileSource, RawDocument},
    error_handling::{AppError, AppResult},
    models::{Channel, ContactRecord, IngestionStats, ParsedContacts, Template},
    phone::normalize_phone,
    tracking::{SendStatus, TrackingRecord},
    webhook::{DispatchBackend, WebhookClient},
};

use std::sync::Arc;

/// Shared state handed to the command handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub importer: Arc<ContactImporter>,
    pub backend: Arc<dyn DispatchBackend>,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(Self::load_or_initialize_config())
    }

    /// State talking to the webhook configured in `config`
    pub fn with_config(config: AppConfig) -> anyhow::Result<Self> {
        let client = WebhookClient::new(config.dispatch.webhook_config())
            .map_err(|e| anyhow::anyhow!("Failed to create webhook client: {}", e))?;
        Ok(Self::with_backend(config, Arc::new(client)))
    }

    pub fn with_backend(config: AppConfig, backend: Arc<dyn DispatchBackend>) -> Self {
        let parser = ContactParser::with_config(config.import.parser_config());
        Self {
            config: Arc::new(config),
            importer: Arc::new(ContactImporter::new(parser)),
            backend,
        }
    }

    fn load_or_initialize_config() -> AppConfig {
        match AppConfig::load() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(
                    "Failed to load configuration from disk: {:#}. Using defaults",
                    err
                );
                AppConfig::default()
            }
        }
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Validate the configuration and initialize logging with its level (or `RUST_LOG`)
pub fn init(config: &AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    utils::logging::init_tracing(Some(&config.logging.level));
    tracing::info!("{} v{} initialized", NAME, VERSION);
    Ok(())
}

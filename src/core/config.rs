//! Application configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::contact_parser::{ContactParserConfig, DEFAULT_STRUCTURE_PROBE_BYTES};
use crate::core::dispatch::DEFAULT_BATCH_SIZE;
use crate::core::webhook::{WebhookConfig, DEFAULT_WEBHOOK_BASE_URL};
use crate::utils::network::get_user_agent;
use crate::utils::validation::validate_url;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Main application configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Contact list reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub delimiter: String,
    /// Bytes read for the header check before the full parse
    pub structure_probe_bytes: usize,
}

/// Webhook access and campaign defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub webhook_base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: Option<String>,
    pub default_batch_size: u32,
    pub default_interval_min: u32,
    pub default_interval_max: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String, // "error", "warn", "info", "debug", "trace"
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            delimiter: ";".to_string(),
            structure_probe_bytes: DEFAULT_STRUCTURE_PROBE_BYTES,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            webhook_base_url: DEFAULT_WEBHOOK_BASE_URL.to_string(),
            timeout_seconds: 30,
            user_agent: None,
            default_batch_size: DEFAULT_BATCH_SIZE,
            default_interval_min: 15,
            default_interval_max: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ImportConfig {
    pub fn parser_config(&self) -> ContactParserConfig {
        ContactParserConfig {
            delimiter: self.delimiter.bytes().next().unwrap_or(b';'),
            structure_probe_bytes: self.structure_probe_bytes,
        }
    }
}

impl DispatchConfig {
    pub fn webhook_config(&self) -> WebhookConfig {
        WebhookConfig {
            base_url: self.webhook_base_url.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone().unwrap_or_else(get_user_agent),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, creating default if not exists
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    /// Load and validate configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AppConfig =
            serde_json::from_str(&content).with_context(|| "Failed to parse config file")?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {:?}", path))?;

        tracing::info!("Loaded configuration from: {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = self.export()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Saved configuration to: {:?}", path);
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("br", "sistemavieira", "whatsapp-dispatcher")
            .with_context(|| "Failed to get project directories")?;

        Ok(project_dirs.config_dir().join("config.json"))
    }

    /// Export configuration as JSON string
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "Failed to export configuration")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let mut delimiter = self.import.delimiter.chars();
        match (delimiter.next(), delimiter.next()) {
            (Some(c), None) if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => {}
            _ => anyhow::bail!(
                "Delimiter must be a single ASCII character, got {:?}",
                self.import.delimiter
            ),
        }

        if self.import.structure_probe_bytes == 0 {
            anyhow::bail!("Structure probe size must be greater than 0");
        }

        validate_url(&self.dispatch.webhook_base_url)
            .with_context(|| "Invalid webhook base URL")?;

        if self.dispatch.timeout_seconds == 0 || self.dispatch.timeout_seconds > 300 {
            anyhow::bail!("Timeout should be between 1 and 300 seconds");
        }

        if self.dispatch.default_batch_size == 0 {
            anyhow::bail!("Default batch size must be at least 1");
        }

        if self.dispatch.default_interval_min > self.dispatch.default_interval_max {
            anyhow::bail!(
                "Default interval minimum ({}s) exceeds maximum ({}s)",
                self.dispatch.default_interval_min,
                self.dispatch.default_interval_max
            );
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: must be 'error', 'warn', 'info', 'debug', or 'trace'"
            );
        }

        Ok(())
    }
}

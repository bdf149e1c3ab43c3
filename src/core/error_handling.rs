//! Error taxonomy for contact ingestion and dispatch
//!
//! File-level failures (`StructureError`, `ParseError`, `IngestError`) abort the
//! whole ingestion and are meant to be shown to the operator. Row-level failures
//! (`PhoneFormatError`) never leave the parser: they are folded into the
//! statistics and diagnostics of the parse result.

use thiserror::Error;

/// Category used when reporting an error to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// The uploaded document is unusable as a contact list
    Document,
    /// File system errors
    FileSystem,
    /// The campaign form is incomplete or inconsistent
    Validation,
    /// The webhook could not be reached or refused the request
    ExternalService,
    /// Invalid settings
    Configuration,
}

/// Required header columns are missing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "invalid structure: missing required columns: {} (required: name;phone, optional: email)",
    .missing.join(", ")
)]
pub struct StructureError {
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("too few lines: the CSV must contain a header and at least one data row")]
    TooFewLines,

    #[error("missing columns: {} (required: name, phone; optional: email)", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("no valid data found in the CSV")]
    NoValidData,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneFormatError {
    #[error("phone too short: {0}")]
    TooShort(String),

    #[error("phone too long: {0}")]
    TooLong(String),

    #[error("unrecognized phone format: {0}")]
    UnrecognizedFormat(String),
}

/// Failure of a whole ingestion call
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file {0}: please select a .csv file")]
    UnsupportedFile(String),

    #[error("failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl IngestError {
    pub fn io(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            name: name.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io { .. } => ErrorCategory::FileSystem,
            _ => ErrorCategory::Document,
        }
    }
}

/// Campaign payload and webhook errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("campaign name is required")]
    MissingName,

    #[error("no contacts to dispatch")]
    NoContacts,

    #[error("select at least one channel")]
    NoChannels,

    #[error("select templates for all channels: {} channel(s) without template ({})", .0.len(), .0.join(", "))]
    MissingTemplates(Vec<String>),

    #[error("channel {0} has neither phone_id nor record_id")]
    MissingPhoneId(String),

    #[error("invalid interval: minimum {min}s is greater than maximum {max}s")]
    InvalidInterval { min: u32, max: u32 },

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("webhook rejected the request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected webhook response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid webhook endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("failed to encode contacts: {0}")]
    Encode(String),
}

impl DispatchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Rejected { .. } | Self::Http(_) | Self::Decode(_) => {
                ErrorCategory::ExternalService
            }
            Self::Endpoint(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Validation,
        }
    }
}

/// Top-level error used by the command layer
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Phone(#[from] PhoneFormatError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Ingest(e) => e.category(),
            Self::Dispatch(e) => e.category(),
            Self::Phone(_) => ErrorCategory::Validation,
            Self::Io(_) => ErrorCategory::FileSystem,
            Self::Config(_) => ErrorCategory::Configuration,
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

//! Domain models shared by the contact pipeline, the dispatch payload builder
//! and the webhook client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated contact ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub name: String,

    /// Canonical phone, always `+<country code><number>`
    pub phone: String,

    pub email: Option<String>,
}

/// Row counters for one ingestion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionStats {
    /// Data rows in the source, header and blank lines excluded
    pub total_lines: usize,
    pub valid_contacts: usize,
    pub invalid_contacts: usize,
}

impl IngestionStats {
    pub fn from_counts(total_lines: usize, valid_contacts: usize) -> Self {
        Self {
            total_lines,
            valid_contacts,
            invalid_contacts: total_lines.saturating_sub(valid_contacts),
        }
    }
}

/// Why a data row was dropped or flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowIssue {
    InsufficientColumns { expected: usize, found: usize },
    MissingNameOrPhone,
    InvalidPhone { reason: String },
    /// Kept row: the email does not look like `local@domain.tld`
    InvalidEmail { email: String },
}

impl RowIssue {
    /// Whether the row was dropped (as opposed to accepted with a warning)
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::InvalidEmail { .. })
    }
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientColumns { expected, found } => write!(
                f,
                "insufficient columns (expected {}, found {})",
                expected, found
            ),
            Self::MissingNameOrPhone => write!(f, "name or phone is empty"),
            Self::InvalidPhone { reason } => write!(f, "{}", reason),
            Self::InvalidEmail { email } => {
                write!(f, "invalid email ({}), row kept", email)
            }
        }
    }
}

/// A per-row diagnostic with its 1-based line number in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDiagnostic {
    pub line: usize,
    pub issue: RowIssue,
}

impl fmt::Display for RowDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.issue)
    }
}

/// Result of a full contact parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedContacts {
    pub contacts: Vec<ContactRecord>,
    pub stats: IngestionStats,
    pub diagnostics: Vec<RowDiagnostic>,
    /// Name of the detected source encoding
    pub encoding: String,
}

impl ParsedContacts {
    /// Diagnostics for rows that were dropped
    pub fn skipped_rows(&self) -> impl Iterator<Item = &RowDiagnostic> {
        self.diagnostics.iter().filter(|d| d.issue.is_skip())
    }

    /// Diagnostics for rows that were kept with a warning
    pub fn warnings(&self) -> impl Iterator<Item = &RowDiagnostic> {
        self.diagnostics.iter().filter(|d| !d.issue.is_skip())
    }
}

/// Identifier that the webhook sends either as a number or as a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlexibleId {
    Number(i64),
    Text(String),
}

impl fmt::Display for FlexibleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// WhatsApp sending account as listed by the channels endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub record_id: Option<FlexibleId>,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub quality_rating: Option<String>,
    #[serde(default)]
    pub id_account: Option<String>,
    #[serde(default)]
    pub phone_id: Option<FlexibleId>,
}

impl Channel {
    /// `"<account> - <display number>"`, the label the dispatch webhook expects
    pub fn label(&self) -> String {
        format!("{} - {}", self.account_name, self.display_phone_number)
    }

    /// `phone_id`, falling back to `record_id`
    pub fn dispatch_phone_id(&self) -> Option<String> {
        self.phone_id
            .as_ref()
            .or(self.record_id.as_ref())
            .map(|id| id.to_string())
            .filter(|id| !id.is_empty())
    }
}

/// Pre-approved message template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub record_id: Option<FlexibleId>,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

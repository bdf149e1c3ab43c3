//! Contact list ingestion
//!
//! Turns an uploaded `;`-delimited document into validated contacts:
//!
//! - **Structure check**: a fast look at the header line only, run on the first
//!   few hundred bytes before committing to a full read
//! - **Row parsing**: every data row is split, trimmed and checked; rows with a
//!   missing name or an unusable phone are dropped and counted as invalid
//! - **Phone canonicalization**: see [`crate::core::phone`]
//! - **Diagnostics**: every dropped or flagged row is reported with its line
//!   number, both as a `tracing` event and in the returned result
//!
//! Parsing is a pure function of the document bytes; the same document always
//! yields the same contacts, statistics and diagnostics.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::core::document::{DocumentSource, RawDocument};
use crate::core::error_handling::{IngestError, ParseError, StructureError};
use crate::core::models::{ContactRecord, IngestionStats, ParsedContacts, RowDiagnostic, RowIssue};
use crate::core::phone::normalize_phone;
use crate::parsers::csv_parser::{read_lines, split_fields, CsvLine, CONTACT_DELIMITER};
use crate::utils::encoding::EncodingDetector;
use crate::utils::file_utils::is_csv_file;
use crate::utils::validation::is_plausible_email;

/// Columns every contact list must have
pub const REQUIRED_COLUMNS: [&str; 2] = ["name", "phone"];

/// Optional column
pub const EMAIL_COLUMN: &str = "email";

/// Bytes read for the structure check
pub const DEFAULT_STRUCTURE_PROBE_BYTES: usize = 500;

#[derive(Debug, Clone)]
pub struct ContactParserConfig {
    /// Field delimiter
    pub delimiter: u8,
    /// How many leading bytes the structure check reads
    pub structure_probe_bytes: usize,
}

impl Default for ContactParserConfig {
    fn default() -> Self {
        Self {
            delimiter: CONTACT_DELIMITER,
            structure_probe_bytes: DEFAULT_STRUCTURE_PROBE_BYTES,
        }
    }
}

/// Resolved positions of the known columns in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    width: usize,
    name: usize,
    phone: usize,
    email: Option<usize>,
}

fn normalize_header(fields: &[String]) -> Vec<String> {
    fields.iter().map(|h| h.trim().to_lowercase()).collect()
}

fn missing_required(headers: &[String]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect()
}

fn position_of(headers: &[String], column: &str) -> Option<usize> {
    headers.iter().position(|h| h == column)
}

pub struct ContactParser {
    config: ContactParserConfig,
    encoding_detector: EncodingDetector,
}

impl Default for ContactParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactParser {
    pub fn new() -> Self {
        Self::with_config(ContactParserConfig::default())
    }

    pub fn with_config(config: ContactParserConfig) -> Self {
        Self {
            config,
            encoding_detector: EncodingDetector::new(),
        }
    }

    pub fn config(&self) -> &ContactParserConfig {
        &self.config
    }

    /// Check that the first line names the required columns.
    ///
    /// Only the header is inspected; data rows are not looked at.
    pub fn validate_structure(&self, text: &str) -> Result<(), StructureError> {
        let text = text.trim_start_matches('\u{feff}');
        let first_line = text.split('\n').next().unwrap_or("");
        let headers = normalize_header(&split_fields(first_line, self.config.delimiter));

        let missing = missing_required(&headers);
        if missing.is_empty() {
            debug!("Header check passed: {:?}", headers);
            Ok(())
        } else {
            warn!("Header check failed, missing columns: {:?}", missing);
            Err(StructureError { missing })
        }
    }

    /// Structure check on raw bytes, typically the first few hundred of a file.
    ///
    /// A multi-byte character cut at the end of the probe only affects the tail,
    /// never the header line.
    pub fn validate_structure_bytes(&self, prefix: &[u8]) -> Result<(), StructureError> {
        let (text, _) = self.encoding_detector.decode(prefix);
        self.validate_structure(&text)
    }

    /// Parse decoded text into contacts, statistics and diagnostics
    pub fn parse_contacts(&self, text: &str) -> Result<ParsedContacts, ParseError> {
        self.parse_text(text, "UTF-8")
    }

    /// Decode and parse a raw document
    pub fn parse_document(&self, document: &RawDocument) -> Result<ParsedContacts, ParseError> {
        let (text, encoding) = self.encoding_detector.decode(document.bytes());
        debug!("Detected document encoding: {}", encoding.name());
        self.parse_text(&text, encoding.name())
    }

    fn parse_text(&self, text: &str, encoding: &str) -> Result<ParsedContacts, ParseError> {
        let text = text.trim_start_matches('\u{feff}');
        let lines = read_lines(text, self.config.delimiter);

        if lines.len() < 2 {
            return Err(ParseError::TooFewLines);
        }

        let layout = self.resolve_layout(&lines[0])?;
        debug!("Column layout: {:?}", layout);

        let data_lines = &lines[1..];
        let mut contacts = Vec::new();
        let mut diagnostics = Vec::new();

        for line in data_lines {
            if let Some(contact) = self.parse_row(line, &layout, &mut diagnostics) {
                contacts.push(contact);
            }
        }

        if contacts.is_empty() {
            warn!("No valid contacts among {} data rows", data_lines.len());
            return Err(ParseError::NoValidData);
        }

        let stats = IngestionStats::from_counts(data_lines.len(), contacts.len());
        info!(
            "Contact parse finished: total={}, valid={}, invalid={}",
            stats.total_lines, stats.valid_contacts, stats.invalid_contacts
        );

        Ok(ParsedContacts {
            contacts,
            stats,
            diagnostics,
            encoding: encoding.to_string(),
        })
    }

    fn resolve_layout(&self, header_line: &CsvLine) -> Result<ColumnLayout, ParseError> {
        let headers = normalize_header(&header_line.fields);

        let missing = missing_required(&headers);
        if !missing.is_empty() {
            return Err(ParseError::MissingColumns(missing));
        }

        match (position_of(&headers, "name"), position_of(&headers, "phone")) {
            (Some(name), Some(phone)) => Ok(ColumnLayout {
                width: headers.len(),
                name,
                phone,
                email: position_of(&headers, EMAIL_COLUMN),
            }),
            _ => Err(ParseError::MissingColumns(REQUIRED_COLUMNS.map(String::from).to_vec())),
        }
    }

    /// Parse one data row. Dropped rows return `None` after recording why.
    fn parse_row(
        &self,
        line: &CsvLine,
        layout: &ColumnLayout,
        diagnostics: &mut Vec<RowDiagnostic>,
    ) -> Option<ContactRecord> {
        let mut report = |issue: RowIssue| {
            if issue.is_skip() {
                warn!("Skipping line {}: {}", line.line, issue);
            } else {
                warn!("Line {}: {}", line.line, issue);
            }
            diagnostics.push(RowDiagnostic {
                line: line.line,
                issue,
            });
        };

        let fields = &line.fields;

        if fields.len() < layout.width {
            report(RowIssue::InsufficientColumns {
                expected: layout.width,
                found: fields.len(),
            });
            return None;
        }

        let field = |index: usize| fields.get(index).map(|f| f.trim()).unwrap_or("");
        let name = field(layout.name);
        let phone = field(layout.phone);
        let email = layout.email.map(field).unwrap_or("");

        if name.is_empty() || phone.is_empty() {
            report(RowIssue::MissingNameOrPhone);
            return None;
        }

        let phone = match normalize_phone(phone) {
            Ok(phone) => phone,
            Err(e) => {
                report(RowIssue::InvalidPhone {
                    reason: e.to_string(),
                });
                return None;
            }
        };

        if !email.is_empty() && !is_plausible_email(email) {
            report(RowIssue::InvalidEmail {
                email: email.to_string(),
            });
        }

        Some(ContactRecord {
            name: name.to_string(),
            phone,
            email: if email.is_empty() {
                None
            } else {
                Some(email.to_string())
            },
        })
    }
}

/// Structure check with the default configuration
pub fn validate_structure(text: &str) -> Result<(), StructureError> {
    ContactParser::new().validate_structure(text)
}

/// Full parse with the default configuration
pub fn parse_contacts(text: &str) -> Result<ParsedContacts, ParseError> {
    ContactParser::new().parse_contacts(text)
}

/// Runs the two ingestion stages against a [`DocumentSource`]
pub struct ContactImporter {
    parser: ContactParser,
}

impl Default for ContactImporter {
    fn default() -> Self {
        Self::new(ContactParser::new())
    }
}

impl ContactImporter {
    pub fn new(parser: ContactParser) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &ContactParser {
        &self.parser
    }

    /// Only the structure check, reading just the document prefix
    pub async fn validate(&self, source: &dyn DocumentSource) -> Result<(), IngestError> {
        Self::check_file_type(source)?;
        let prefix = source
            .read_prefix(self.parser.config.structure_probe_bytes)
            .await?;
        self.parser.validate_structure_bytes(&prefix)?;
        Ok(())
    }

    /// Structure check on the prefix, then a full parse of the whole document.
    ///
    /// Headers are checked again by the full parse; the two stages do not
    /// necessarily see the same bytes.
    pub async fn import(&self, source: &dyn DocumentSource) -> Result<ParsedContacts, IngestError> {
        info!("Importing contacts from {}", source.name());
        let start_time = Instant::now();

        self.validate(source).await?;
        let document = source.read_all().await?;

        match self.parser.parse_document(&document) {
            Ok(parsed) => {
                info!(
                    "Imported {} contacts from {} ({} invalid rows) in {}ms",
                    parsed.stats.valid_contacts,
                    source.name(),
                    parsed.stats.invalid_contacts,
                    start_time.elapsed().as_millis()
                );
                Ok(parsed)
            }
            Err(e) => {
                error!("Contact import failed for {}: {}", source.name(), e);
                Err(e.into())
            }
        }
    }

    fn check_file_type(source: &dyn DocumentSource) -> Result<(), IngestError> {
        if source.is_file() && !is_csv_file(source.name()) {
            return Err(IngestError::UnsupportedFile(source.name().to_string()));
        }
        Ok(())
    }
}

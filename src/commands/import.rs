//! Import command handlers for contact lists
//!
//! Validation, full import, the downloadable sample and the UTF-8 re-encoding
//! of an uploaded list. Each handler logs its outcome and reports failures as
//! display strings.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::core::document::{DocumentSource, FileSource};
use crate::core::error_handling::{AppError, AppResult};
use crate::core::export::{encode_contacts, reencoded_file_name, write_sample_file};
use crate::core::models::{ContactRecord, IngestionStats, RowDiagnostic};
use crate::AppState;

/// Complete import result with statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResult {
    pub file_name: String,
    pub contacts: Vec<ContactRecord>,
    pub stats: IngestionStats,
    /// Dropped and flagged rows
    pub diagnostics: Vec<RowDiagnostic>,
    /// Detected encoding
    pub encoding: String,
    pub file_size: u64,
    pub parse_time_ms: u64,
}

impl ImportResult {
    /// First `rows` contacts, for display
    pub fn preview(&self, rows: usize) -> &[ContactRecord] {
        &self.contacts[..rows.min(self.contacts.len())]
    }
}

/// Check only the header of a contact file
pub async fn validate_contact_file(state: &AppState, file_path: String) -> Result<(), String> {
    info!("Validating contact file: {}", file_path);

    match state.importer.validate(&FileSource::new(&file_path)).await {
        Ok(()) => {
            info!("Contact file {} has a valid header", file_path);
            Ok(())
        }
        Err(e) => {
            error!("Contact file validation failed: {}", e);
            Err(e.to_string())
        }
    }
}

/// Validate and parse a contact file
pub async fn import_contacts_file(state: &AppState, file_path: String) -> Result<ImportResult, String> {
    info!("Importing contact file: {}", file_path);

    match import_contacts_file_impl(state, &file_path).await {
        Ok(result) => {
            info!(
                "Imported {} contacts from {} ({} invalid rows)",
                result.stats.valid_contacts, file_path, result.stats.invalid_contacts
            );
            Ok(result)
        }
        Err(e) => {
            error!("Failed to import contact file: {}", e);
            Err(e.to_string())
        }
    }
}

/// Write the sample contact list into `output_dir` (current directory by default)
pub async fn export_sample_file(output_dir: Option<String>) -> Result<String, String> {
    let dir = PathBuf::from(output_dir.unwrap_or_else(|| ".".to_string()));

    match write_sample_file(&dir).await {
        Ok(path) => Ok(path.display().to_string()),
        Err(e) => {
            error!("Failed to write sample file: {:#}", e);
            Err(e.to_string())
        }
    }
}

/// Import a contact file and write its contacts back as UTF-8 with BOM.
///
/// Without an explicit output path the file lands next to the source as
/// `<stem>-utf8.csv`.
pub async fn reencode_contacts_file(
    state: &AppState,
    file_path: String,
    output_path: Option<String>,
) -> Result<String, String> {
    info!("Re-encoding contact file: {}", file_path);

    match reencode_contacts_file_impl(state, &file_path, output_path).await {
        Ok(path) => {
            info!("Re-encoded contacts written to {}", path.display());
            Ok(path.display().to_string())
        }
        Err(e) => {
            error!("Failed to re-encode contact file: {}", e);
            Err(e.to_string())
        }
    }
}

// Implementation functions

pub(crate) async fn import_contacts_file_impl(
    state: &AppState,
    file_path: &str,
) -> AppResult<ImportResult> {
    let start_time = Instant::now();
    let source = FileSource::new(file_path);

    let file_size = tokio::fs::metadata(source.path()).await?.len();
    let parsed = state.importer.import(&source).await?;

    Ok(ImportResult {
        file_name: source.name().to_string(),
        contacts: parsed.contacts,
        stats: parsed.stats,
        diagnostics: parsed.diagnostics,
        encoding: parsed.encoding,
        file_size,
        parse_time_ms: start_time.elapsed().as_millis() as u64,
    })
}

async fn reencode_contacts_file_impl(
    state: &AppState,
    file_path: &str,
    output_path: Option<String>,
) -> AppResult<PathBuf> {
    let result = import_contacts_file_impl(state, file_path).await?;
    let content = encode_contacts(&result.contacts)?;

    let target = match output_path {
        Some(path) => PathBuf::from(path),
        None => Path::new(file_path)
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(reencoded_file_name(Some(&result.file_name))),
    };

    if target == Path::new(file_path) {
        return Err(AppError::Config(format!(
            "Refusing to overwrite the source file {}",
            file_path
        )));
    }

    tokio::fs::write(&target, content).await?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AppConfig;
    use crate::core::export::SAMPLE_FILE_NAME;
    use crate::utils::encoding::UTF8_BOM;
    use tempfile::tempdir;

    fn state() -> AppState {
        AppState::with_config(AppConfig::default()).unwrap()
    }

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> String {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn test_import_contacts_file() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "lista.csv",
            "name;phone;email\nJoão;11999999999;joao@email.com\nPedro;;\nBob;11988887777;bob\n"
                .as_bytes(),
        );

        let result = import_contacts_file(&state(), path).await.unwrap();
        assert_eq!(result.file_name, "lista.csv");
        assert_eq!(result.stats.total_lines, 3);
        assert_eq!(result.stats.valid_contacts, 2);
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.preview(1).len(), 1);
        assert_eq!(result.preview(10).len(), 2);
        assert_eq!(result.encoding, "UTF-8");
    }

    #[tokio::test]
    async fn test_validate_reports_missing_columns() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "lista.csv", b"name;email\nX;x@x.com");

        let err = validate_contact_file(&state(), path).await.unwrap_err();
        assert!(err.contains("phone"));
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nada.csv").display().to_string();
        assert!(import_contacts_file(&state(), path).await.is_err());
    }

    #[tokio::test]
    async fn test_export_sample_file() {
        let dir = tempdir().unwrap();
        let path = export_sample_file(Some(dir.path().display().to_string()))
            .await
            .unwrap();

        assert!(path.ends_with(SAMPLE_FILE_NAME));
        let result = import_contacts_file(&state(), path).await.unwrap();
        assert_eq!(result.stats.valid_contacts, 10);
    }

    #[tokio::test]
    async fn test_reencode_writes_next_to_source() {
        let dir = tempdir().unwrap();
        let (latin1, _, _) =
            encoding_rs::WINDOWS_1252.encode("name;phone\nJoão Conceição;(11) 98888-7777\n");
        let path = write_file(dir.path(), "clientes.csv", &latin1);

        let written = reencode_contacts_file(&state(), path, None).await.unwrap();
        assert!(written.ends_with("clientes-utf8.csv"));

        let bytes = std::fs::read(&written).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        assert!(text.starts_with("name;phone;email\nJo"));
        assert!(text.ends_with(";+5511988887777;"));
        assert!(!text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_reencode_refuses_to_overwrite_source() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "lista.csv", b"name;phone\nAna;11999999999");

        let err = reencode_contacts_file(&state(), path.clone(), Some(path))
            .await
            .unwrap_err();
        assert!(err.contains("overwrite"));
    }
}

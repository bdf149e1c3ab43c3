//! Canonical contact CSV output: the downloadable sample and the re-encoding of
//! parsed contacts sent along with a dispatch.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::error_handling::DispatchError;
use crate::core::models::ContactRecord;
use crate::parsers::csv_parser::{write_rows, CONTACT_DELIMITER};
use crate::utils::encoding::UTF8_BOM;
use crate::utils::file_utils::{ensure_dir_exists, sanitize_filename};

/// File name offered for the sample download
pub const SAMPLE_FILE_NAME: &str = "exemplo-contatos.csv";

/// Canonical header
pub const CONTACT_HEADER: [&str; 3] = ["name", "phone", "email"];

const DEFAULT_REENCODED_STEM: &str = "contatos";

const SAMPLE_CONTACTS: &[(&str, &str, &str)] = &[
    ("João Silva", "11999999999", "joao@email.com"),
    ("Maria Santos", "(11) 88888-8888", "maria@email.com"),
    ("Pedro Oliveira", "+5511777777777", ""),
    ("Ana Costa", "11 66666-6666", "ana@email.com"),
    ("Carlos Ferreira", "11955555555", ""),
    ("Fernanda Lima", "21987654321", "fernanda@email.com"),
    ("Roberto Souza", "11944444444", ""),
    ("Juliana Pereira", "11933333333", "juliana@email.com"),
    ("Marcos Almeida", "11922222222", ""),
    ("Camila Rocha", "11911111111", "camila@email.com"),
];

/// The demonstration contact list, `;`-delimited and `\n`-joined.
pub fn generate_sample_document() -> String {
    let mut lines = Vec::with_capacity(SAMPLE_CONTACTS.len() + 1);
    lines.push(CONTACT_HEADER.join(";"));
    lines.extend(
        SAMPLE_CONTACTS
            .iter()
            .map(|(name, phone, email)| format!("{};{};{}", name, phone, email)),
    );
    lines.join("\n")
}

/// Write the sample document (with BOM) into `dir` and return its path
pub async fn write_sample_file(dir: &Path) -> anyhow::Result<PathBuf> {
    ensure_dir_exists(dir)?;
    let path = dir.join(SAMPLE_FILE_NAME);

    let mut content = UTF8_BOM.to_vec();
    content.extend_from_slice(generate_sample_document().as_bytes());
    tokio::fs::write(&path, content).await?;

    info!("Sample contact file written to {}", path.display());
    Ok(path)
}

/// Re-serialize contacts as UTF-8 CSV with a leading BOM.
pub fn encode_contacts(contacts: &[ContactRecord]) -> Result<Vec<u8>, DispatchError> {
    let rows = std::iter::once(CONTACT_HEADER.map(str::to_string)).chain(contacts.iter().map(
        |contact| {
            [
                contact.name.clone(),
                contact.phone.clone(),
                contact.email.clone().unwrap_or_default(),
            ]
        },
    ));

    let body =
        write_rows(rows, CONTACT_DELIMITER).map_err(|e| DispatchError::Encode(e.to_string()))?;

    let mut content = Vec::with_capacity(UTF8_BOM.len() + body.len());
    content.extend_from_slice(UTF8_BOM);
    content.extend_from_slice(&body);
    Ok(content)
}

/// `<stem>-utf8.csv` for the uploaded file name, `contatos-utf8.csv` without one
pub fn reencoded_file_name(original: Option<&str>) -> String {
    let stem = original
        .map(|name| {
            let base = Path::new(name)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(name);
            match base.len().checked_sub(4) {
                Some(cut) if base.is_char_boundary(cut) && base[cut..].eq_ignore_ascii_case(".csv") => {
                    base[..cut].to_string()
                }
                _ => base.to_string(),
            }
        })
        .map(|stem| sanitize_filename(stem.trim()))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| DEFAULT_REENCODED_STEM.to_string());

    format!("{}-utf8.csv", stem)
}

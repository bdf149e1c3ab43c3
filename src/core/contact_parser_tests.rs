//! Contact parser tests
//!
//! Header checks, row filtering, statistics and file import

#[cfg(test)]
mod tests {
    use crate::core::contact_parser::*;
    use crate::core::document::{FileSource, RawDocument};
    use crate::core::error_handling::{IngestError, ParseError};
    use crate::core::export::{encode_contacts, generate_sample_document};
    use crate::core::models::{ContactRecord, RowIssue};
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Create a temporary contact file with the given suffix
    fn create_contact_file(content: &[u8], suffix: &str) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
        file.write_all(content)?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_single_valid_row() {
        let parsed =
            parse_contacts("name;phone;email\nJoão Silva;11999999999;joao@email.com").unwrap();

        assert_eq!(
            parsed.contacts,
            vec![ContactRecord {
                name: "João Silva".to_string(),
                phone: "+5511999999999".to_string(),
                email: Some("joao@email.com".to_string()),
            }]
        );
        assert_eq!(parsed.stats.total_lines, 1);
        assert_eq!(parsed.stats.valid_contacts, 1);
        assert_eq!(parsed.stats.invalid_contacts, 0);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_phone_column_fails_structure_check() {
        let err = validate_structure("name;email\nX;x@x.com").unwrap_err();
        assert_eq!(err.missing, vec!["phone".to_string()]);
    }

    #[test]
    fn test_structure_check_reports_all_missing_columns() {
        let err = validate_structure("nome;telefone\nX;11999999999").unwrap_err();
        assert_eq!(err.missing, vec!["name".to_string(), "phone".to_string()]);
    }

    #[test]
    fn test_structure_check_ignores_case_whitespace_and_bom() {
        assert!(validate_structure("\u{feff} Name ; PHONE ;Email\r\n").is_ok());
        assert!(validate_structure("phone;name").is_ok());
    }

    #[test]
    fn test_structure_check_only_reads_first_line() {
        // a blank first line hides the header further down
        assert!(validate_structure("\nname;phone").is_err());
    }

    #[test]
    fn test_empty_phone_row_is_dropped() {
        let parsed = parse_contacts("name;phone;email\nPedro;;\nAna;11988887777;").unwrap();

        assert_eq!(parsed.contacts.len(), 1);
        assert_eq!(parsed.contacts[0].name, "Ana");
        assert_eq!(parsed.stats.invalid_contacts, 1);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].line, 2);
        assert_eq!(parsed.diagnostics[0].issue, RowIssue::MissingNameOrPhone);
    }

    #[test]
    fn test_short_phone_row_is_dropped() {
        let parsed =
            parse_contacts("name;phone;email\nAna;11-invalid-phone;\nBia;21987654321;").unwrap();

        assert_eq!(parsed.contacts.len(), 1);
        assert_eq!(parsed.contacts[0].phone, "+5521987654321");
        assert_eq!(parsed.stats.invalid_contacts, 1);
        assert!(matches!(
            parsed.diagnostics[0].issue,
            RowIssue::InvalidPhone { .. }
        ));
    }

    #[test]
    fn test_malformed_email_is_kept_with_warning() {
        let parsed = parse_contacts("name;phone;email\nBob;11999999999;not-an-email").unwrap();

        assert_eq!(parsed.contacts.len(), 1);
        assert_eq!(parsed.contacts[0].email.as_deref(), Some("not-an-email"));
        assert_eq!(parsed.stats.invalid_contacts, 0);
        assert_eq!(parsed.skipped_rows().count(), 0);
        assert_eq!(parsed.warnings().count(), 1);
    }

    #[test]
    fn test_stats_add_up() {
        let text = "name;phone;email\n\
                    João;11999999999;joao@email.com\n\
                    ;11999999999;\n\
                    Pedro;;\n\
                    Ana;123;\n\
                    Maria;(11) 88888-8888;maria@email.com\n\
                    Curto\n\
                    Bob;+44 20 7946 0958;";
        let parsed = parse_contacts(text).unwrap();

        assert_eq!(parsed.stats.total_lines, 7);
        assert_eq!(parsed.stats.valid_contacts, parsed.contacts.len());
        assert_eq!(
            parsed.stats.total_lines,
            parsed.stats.valid_contacts + parsed.stats.invalid_contacts
        );
        assert_eq!(parsed.contacts.len(), 3);
        assert_eq!(parsed.contacts[2].phone, "+442079460958");
        assert_eq!(parsed.skipped_rows().count(), 4);
    }

    #[test]
    fn test_insufficient_columns_are_skipped() {
        let parsed = parse_contacts("name;phone;email\nAna;11999999999\nBia;11988887777;").unwrap();

        assert_eq!(parsed.contacts.len(), 1);
        assert_eq!(
            parsed.diagnostics[0].issue,
            RowIssue::InsufficientColumns {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let parsed = parse_contacts("phone;name\n11999999999;Ana;extra;more").unwrap();

        assert_eq!(parsed.contacts[0].name, "Ana");
        assert_eq!(parsed.contacts[0].phone, "+5511999999999");
        assert_eq!(parsed.contacts[0].email, None);
    }

    #[test]
    fn test_blank_lines_are_not_counted() {
        let parsed = parse_contacts("name;phone\n\n11999999999;Ana\n   \nAna;11999999999\n\n").unwrap();

        assert_eq!(parsed.stats.total_lines, 2);
        assert_eq!(parsed.stats.valid_contacts, 1);
        assert_eq!(parsed.diagnostics[0].line, 3);
    }

    #[test]
    fn test_unclosed_quote_does_not_swallow_following_rows() {
        let parsed = parse_contacts(
            "name;phone;email\n\"Ana;11999999999;\nBia;11988887777;\nCaio;11977776666;\nDuda;11966665555;",
        )
        .unwrap();

        assert_eq!(parsed.stats.total_lines, 4);
        let names: Vec<&str> = parsed.contacts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["\"Ana", "Bia", "Caio", "Duda"]);
        assert_eq!(parsed.contacts[3].phone, "+5511966665555");
    }

    #[test]
    fn test_quotes_inside_names_are_kept() {
        let parsed = parse_contacts("name;phone;email\n\"Zé\" da Silva;11999999999;").unwrap();
        assert_eq!(parsed.contacts[0].name, "\"Zé\" da Silva");

        let parsed = parse_contacts("name;phone;email\n\"Souza; Ana\";11999999999;").unwrap();
        assert_eq!(parsed.contacts[0].name, "Souza; Ana");
    }

    #[test]
    fn test_crlf_and_bom_input() {
        let parsed =
            parse_contacts("\u{feff}name;phone;email\r\nAna;11999999999;ana@email.com\r\n").unwrap();

        assert_eq!(parsed.contacts.len(), 1);
        assert_eq!(parsed.contacts[0].email.as_deref(), Some("ana@email.com"));
    }

    #[test]
    fn test_file_level_errors() {
        assert_eq!(parse_contacts("").unwrap_err(), ParseError::TooFewLines);
        assert_eq!(
            parse_contacts("name;phone;email").unwrap_err(),
            ParseError::TooFewLines
        );
        assert_eq!(
            parse_contacts("name;email\nAna;ana@email.com").unwrap_err(),
            ParseError::MissingColumns(vec!["phone".to_string()])
        );
        assert_eq!(
            parse_contacts("name;phone\nAna;\n;11999999999").unwrap_err(),
            ParseError::NoValidData
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let document = RawDocument::from_text(generate_sample_document());
        let parser = ContactParser::new();

        let first = parser.parse_document(&document).unwrap();
        let second = parser.parse_document(&document).unwrap();

        assert_eq!(first.contacts, second.contacts);
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.diagnostics, second.diagnostics);
    }

    #[test]
    fn test_sample_document_parses_cleanly() {
        let parsed = parse_contacts(&generate_sample_document()).unwrap();

        assert_eq!(parsed.stats.total_lines, 10);
        assert_eq!(parsed.stats.invalid_contacts, 0);
        assert_eq!(parsed.contacts[1].phone, "+5511888888888");
        assert_eq!(parsed.contacts[2].phone, "+5511777777777");
        assert_eq!(parsed.contacts[2].email, None);
    }

    #[test]
    fn test_reencoded_contacts_read_back_unchanged() {
        let contacts = vec![
            ContactRecord {
                name: "Silva; \"Zé\"".to_string(),
                phone: "+5511999999999".to_string(),
                email: Some("ze@email.com".to_string()),
            },
            ContactRecord {
                name: "Ana Costa".to_string(),
                phone: "+5521987654321".to_string(),
                email: None,
            },
        ];

        let bytes = encode_contacts(&contacts).unwrap();
        let parsed = ContactParser::new()
            .parse_document(&RawDocument::new(None, bytes))
            .unwrap();

        assert_eq!(parsed.contacts, contacts);
        assert_eq!(parsed.encoding, "UTF-8");
    }

    #[test]
    fn test_windows_1252_document_is_decoded() {
        let (bytes, _, _) =
            encoding_rs::WINDOWS_1252.encode(
            "name;phone;email\n\
             João Conceição;11999999999;joao@email.com\n\
             Antônia Gonçalves;21987654321;\n\
             Sebastião Araújo;11955555555;sebastiao@email.com\n",
        );
        let parsed = ContactParser::new()
            .parse_document(&RawDocument::new(None, bytes.into_owned()))
            .unwrap();

        assert_eq!(parsed.contacts[0].name, "João Conceição");
        assert_ne!(parsed.encoding, "UTF-8");
    }

    #[test]
    fn test_structure_check_on_probe_bytes() {
        let mut text = String::from("name;phone;email\n");
        for _ in 0..100 {
            text.push_str("João Silva;11999999999;joao@email.com\n");
        }
        let document = RawDocument::from_text(text);
        let probe = document.prefix(DEFAULT_STRUCTURE_PROBE_BYTES);

        assert_eq!(probe.len(), DEFAULT_STRUCTURE_PROBE_BYTES);
        assert!(ContactParser::new().validate_structure_bytes(&probe).is_ok());
    }

    #[tokio::test]
    async fn test_import_from_file() {
        let file = create_contact_file(
            "\u{feff}name;phone;email\nAna;11999999999;ana@email.com\nPedro;;\n".as_bytes(),
            ".csv",
        )
        .unwrap();

        let importer = ContactImporter::default();
        let source = FileSource::new(file.path());

        importer.validate(&source).await.unwrap();
        let parsed = importer.import(&source).await.unwrap();

        assert_eq!(parsed.contacts.len(), 1);
        assert_eq!(parsed.stats.total_lines, 2);
        assert_eq!(parsed.stats.invalid_contacts, 1);
    }

    #[tokio::test]
    async fn test_import_rejects_non_csv_file() {
        let file = create_contact_file(b"name;phone\nAna;11999999999", ".xlsx").unwrap();

        let err = ContactImporter::default()
            .import(&FileSource::new(file.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::UnsupportedFile(_)));
    }

    #[tokio::test]
    async fn test_import_stops_at_structure_error() {
        let file = create_contact_file(b"nome;telefone\nAna;11999999999", ".csv").unwrap();

        let err = ContactImporter::default()
            .import(&FileSource::new(file.path()))
            .await
            .unwrap_err();

        match err {
            IngestError::Structure(e) => assert_eq!(e.missing, vec!["name", "phone"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_in_memory_documents_skip_extension_check() {
        let document = RawDocument::from_text("name;phone\nAna;11999999999").with_name("lista.txt");

        let parsed = tokio_test::block_on(ContactImporter::default().import(&document)).unwrap();
        assert_eq!(parsed.contacts.len(), 1);
    }

    #[test]
    fn test_custom_delimiter() {
        let parser = ContactParser::with_config(ContactParserConfig {
            delimiter: b',',
            ..ContactParserConfig::default()
        });

        let parsed = parser.parse_contacts("name,phone\nAna,11999999999").unwrap();
        assert_eq!(parsed.contacts[0].phone, "+5511999999999");
    }
}

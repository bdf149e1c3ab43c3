//! Delivery tracking records returned by the webhook, plus the filters and
//! the `;`-delimited report offered to operators.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::core::dispatch::SAO_PAULO_UTC_OFFSET_HOURS;
use crate::core::error_handling::DispatchError;
use crate::core::phone::format_whatsapp_display;
use crate::parsers::csv_parser::{write_rows, CONTACT_DELIMITER};
use crate::utils::encoding::UTF8_BOM;

/// Reason shown for messages that went out without error
pub const SENT_REASON: &str = "Enviado com Sucesso";

pub const TRACKING_REPORT_HEADER: [&str; 10] = [
    "ID",
    "Cliente",
    "WhatsApp",
    "Campanha Enviada",
    "Telefone Disparado",
    "Data e Hora Agendado",
    "Criação",
    "Status",
    "Motivo",
    "Template Enviado",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SendStatus {
    Pending,
    Sent,
    Failed,
    #[default]
    Unknown,
}

impl SendStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Sent,
            2 => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Numeric code or numeric string; anything else is `Unknown`
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_i64().map(Self::from_code).unwrap_or_default(),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Self::from_code)
                .unwrap_or_default(),
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::Sent => "Enviado",
            Self::Failed => "Erro",
            Self::Unknown => "Indefinido",
        }
    }
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn status_code<'de, D>(deserializer: D) -> Result<SendStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(SendStatus::from_value).unwrap_or_default())
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Delivery state of one message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    #[serde(default, deserialize_with = "text_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub phone: Option<String>,
    #[serde(rename = "nameBatch", default)]
    pub name_batch: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub display_phone_number: Option<String>,
    #[serde(rename = "scheduledDateTime", default)]
    pub scheduled_date_time: Option<String>,
    #[serde(default)]
    pub criado_em: Option<String>,
    #[serde(rename = "sendStatus", default, deserialize_with = "status_code")]
    pub send_status: SendStatus,
    #[serde(rename = "typeError", default)]
    pub type_error: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
}

impl TrackingRecord {
    /// The webhook error, or the success message for sent messages
    pub fn reason(&self) -> Option<&str> {
        match self.type_error.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(error) => Some(error),
            None if self.send_status == SendStatus::Sent => Some(SENT_REASON),
            None => None,
        }
    }

    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.scheduled_date_time.as_deref().and_then(parse_timestamp)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.criado_em.as_deref().and_then(parse_timestamp)
    }

    fn report_row(&self) -> [String; 10] {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let phone = |v: &Option<String>| v.as_deref().map(format_whatsapp_display).unwrap_or_default();

        [
            text(&self.id),
            text(&self.name),
            phone(&self.phone),
            text(&self.name_batch),
            phone(&self.display_phone_number),
            format_timestamp_display(self.scheduled_date_time.as_deref()),
            format_timestamp_display(self.criado_em.as_deref()),
            self.send_status.label().to_string(),
            self.reason().unwrap_or_default().to_string(),
            text(&self.template),
        ]
    }
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM[:SS]` taken as São Paulo time
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc() + Duration::hours(SAO_PAULO_UTC_OFFSET_HOURS))
}

/// `dd/mm/yyyy hh:mm` in São Paulo time, `-` when absent. Unparseable values
/// are shown as received.
pub fn format_timestamp_display(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => "-".to_string(),
        Some(raw) => match parse_timestamp(raw) {
            Some(instant) => (instant - Duration::hours(SAO_PAULO_UTC_OFFSET_HOURS))
                .naive_utc()
                .format("%d/%m/%Y %H:%M")
                .to_string(),
            None => raw.to_string(),
        },
    }
}

/// Operator filters over the tracking list. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingFilter {
    pub campaign: Option<String>,
    pub status: Option<SendStatus>,
    pub template: Option<String>,
    pub scheduled_from: Option<DateTime<Utc>>,
    pub created_from: Option<DateTime<Utc>>,
    /// Case-insensitive match on client name or either formatted phone
    pub search: Option<String>,
}

impl TrackingFilter {
    pub fn matches(&self, record: &TrackingRecord) -> bool {
        if let Some(campaign) = &self.campaign {
            if record.name_batch.as_ref() != Some(campaign) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.send_status != status {
                return false;
            }
        }
        if let Some(template) = &self.template {
            if record.template.as_ref() != Some(template) {
                return false;
            }
        }
        if let Some(from) = self.scheduled_from {
            if !record.scheduled_at().is_some_and(|at| at >= from) {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if !record.created_at().is_some_and(|at| at >= from) {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::to_lowercase) {
            let contains = |v: Option<String>| v.is_some_and(|v| v.to_lowercase().contains(&search));
            let formatted = |v: &Option<String>| v.as_deref().map(format_whatsapp_display);

            if !(contains(record.name.clone())
                || contains(formatted(&record.phone))
                || contains(formatted(&record.display_phone_number)))
            {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, records: &'a [TrackingRecord]) -> Vec<&'a TrackingRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Message counts per delivery state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackingSummary {
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
    pub unknown: usize,
}

impl TrackingSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TrackingRecord>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut summary, record| {
                match record.send_status {
                    SendStatus::Pending => summary.pending += 1,
                    SendStatus::Sent => summary.sent += 1,
                    SendStatus::Failed => summary.failed += 1,
                    SendStatus::Unknown => summary.unknown += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.pending + self.sent + self.failed + self.unknown
    }
}

/// Tracking report as UTF-8 CSV with BOM
pub fn tracking_report<'a>(
    records: impl IntoIterator<Item = &'a TrackingRecord>,
) -> Result<Vec<u8>, DispatchError> {
    let rows = std::iter::once(TRACKING_REPORT_HEADER.map(str::to_string))
        .chain(records.into_iter().map(TrackingRecord::report_row));
    let body =
        write_rows(rows, CONTACT_DELIMITER).map_err(|e| DispatchError::Encode(e.to_string()))?;

    let mut content = UTF8_BOM.to_vec();
    content.extend_from_slice(&body);
    Ok(content)
}

/// `tracking-disparos-YYYY-MM-DD-HH-MM-SS.csv`
pub fn tracking_report_file_name(now: DateTime<Utc>) -> String {
    format!("tracking-disparos-{}.csv", now.format("%Y-%m-%d-%H-%M-%S"))
}

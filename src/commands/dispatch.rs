//! Dispatch command handlers: channel and template lookup, campaign
//! submission, single-contact tests and delivery tracking.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::commands::import::import_contacts_file_impl;
use crate::core::dispatch::{build_dispatch_payload, CampaignDraft, ChannelSelection, SingleContactDispatch};
use crate::core::error_handling::AppResult;
use crate::core::models::{Channel, ContactRecord, IngestionStats, Template};
use crate::core::phone::normalize_phone;
use crate::core::tracking::{
    tracking_report, tracking_report_file_name, TrackingFilter, TrackingRecord, TrackingSummary,
};
use crate::core::webhook::DispatchReceipt;
use crate::utils::file_utils::ensure_dir_exists;
use crate::AppState;

/// Outcome of a submitted campaign
#[derive(Debug, Clone, Serialize)]
pub struct CampaignResult {
    pub receipt: DispatchReceipt,
    pub stats: IngestionStats,
    pub channel_count: usize,
    pub batch_count: usize,
}

/// Filtered tracking records and their per-status counts
#[derive(Debug, Clone, Serialize)]
pub struct TrackingOverview {
    pub records: Vec<TrackingRecord>,
    pub summary: TrackingSummary,
}

pub async fn list_channels(state: &AppState) -> Result<Vec<Channel>, String> {
    state.backend.list_channels().await.map_err(|e| {
        error!("Failed to fetch channels: {}", e);
        e.to_string()
    })
}

pub async fn list_templates(
    state: &AppState,
    id_account: Option<String>,
) -> Result<Vec<Template>, String> {
    state
        .backend
        .list_templates(id_account.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to fetch templates: {}", e);
            e.to_string()
        })
}

/// Fetch tracking records, keeping those accepted by `filter`
pub async fn fetch_tracking(
    state: &AppState,
    filter: Option<TrackingFilter>,
) -> Result<TrackingOverview, String> {
    match state.backend.fetch_tracking().await {
        Ok(records) => {
            let filter = filter.unwrap_or_default();
            let records: Vec<TrackingRecord> =
                filter.apply(&records).into_iter().cloned().collect();
            let summary = TrackingSummary::from_records(&records);
            Ok(TrackingOverview { records, summary })
        }
        Err(e) => {
            error!("Failed to fetch tracking: {}", e);
            Err(e.to_string())
        }
    }
}

/// Write the tracking report for `records` into `output_dir`
pub async fn export_tracking_report(
    records: &[TrackingRecord],
    output_dir: Option<String>,
) -> Result<String, String> {
    match export_tracking_report_impl(records, output_dir, Utc::now()).await {
        Ok(path) => {
            info!("Tracking report written to {}", path.display());
            Ok(path.display().to_string())
        }
        Err(e) => {
            error!("Failed to write tracking report: {}", e);
            Err(e.to_string())
        }
    }
}

/// Import a contact file and schedule it as a campaign
pub async fn submit_campaign(
    state: &AppState,
    file_path: String,
    draft: CampaignDraft,
) -> Result<CampaignResult, String> {
    info!("Submitting campaign '{}' from {}", draft.name, file_path);

    match submit_campaign_impl(state, &file_path, &draft).await {
        Ok(result) => {
            info!(
                "Campaign '{}' scheduled: {} contacts over {} channel(s) in {} batch(es)",
                draft.name, result.stats.valid_contacts, result.channel_count, result.batch_count
            );
            Ok(result)
        }
        Err(e) => {
            error!("Failed to submit campaign '{}': {}", draft.name, e);
            Err(e.to_string())
        }
    }
}

/// Send one message to a single phone to try a channel and template
pub async fn send_test_message(
    state: &AppState,
    name: String,
    selection: ChannelSelection,
    contact_name: String,
    contact_phone: String,
    scheduled_at: DateTime<Utc>,
) -> Result<DispatchReceipt, String> {
    match send_test_message_impl(state, &name, &selection, contact_name, &contact_phone, scheduled_at)
        .await
    {
        Ok(receipt) => Ok(receipt),
        Err(e) => {
            error!("Test message failed: {}", e);
            Err(e.to_string())
        }
    }
}

// Implementation functions

async fn submit_campaign_impl(
    state: &AppState,
    file_path: &str,
    draft: &CampaignDraft,
) -> AppResult<CampaignResult> {
    let imported = import_contacts_file_impl(state, file_path).await?;
    if imported.stats.invalid_contacts > 0 {
        warn!(
            "{} rows of {} were dropped and will not be sent",
            imported.stats.invalid_contacts, imported.file_name
        );
    }

    let payload = build_dispatch_payload(draft, &imported.contacts, Some(&imported.file_name))?;
    let receipt = state.backend.submit_dispatch(&payload).await?;

    Ok(CampaignResult {
        receipt,
        stats: imported.stats,
        channel_count: payload.channels.len(),
        batch_count: payload.batch_count(),
    })
}

async fn send_test_message_impl(
    state: &AppState,
    name: &str,
    selection: &ChannelSelection,
    contact_name: String,
    contact_phone: &str,
    scheduled_at: DateTime<Utc>,
) -> AppResult<DispatchReceipt> {
    let phone = normalize_phone(contact_phone)?;
    let contact = ContactRecord {
        name: contact_name,
        phone,
        email: None,
    };

    let payload = SingleContactDispatch::build(name, selection, contact, scheduled_at)?;
    Ok(state.backend.submit_single(&payload).await?)
}

async fn export_tracking_report_impl(
    records: &[TrackingRecord],
    output_dir: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<PathBuf> {
    let dir = PathBuf::from(output_dir.unwrap_or_else(|| ".".to_string()));
    ensure_dir_exists(&dir).map_err(|e| std::io::Error::other(e.to_string()))?;

    let path = dir.join(tracking_report_file_name(now));
    tokio::fs::write(&path, tracking_report(records)?).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AppConfig;
    use crate::core::error_handling::DispatchError;
    use crate::core::models::FlexibleId;
    use crate::core::tracking::SendStatus;
    use crate::core::dispatch::DispatchPayload;
    use crate::core::webhook::{parse_receipt, DispatchBackend};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// Records submissions instead of calling the webhook
    #[derive(Default)]
    struct RecordingBackend {
        dispatches: Mutex<Vec<DispatchPayload>>,
        singles: Mutex<Vec<SingleContactDispatch>>,
        reject: bool,
    }

    #[async_trait]
    impl DispatchBackend for RecordingBackend {
        async fn list_channels(&self) -> Result<Vec<Channel>, DispatchError> {
            Ok(vec![vendas()])
        }

        async fn list_templates(
            &self,
            id_account: Option<&str>,
        ) -> Result<Vec<Template>, DispatchError> {
            Ok(match id_account {
                Some("acc-1") => vec![promo()],
                _ => Vec::new(),
            })
        }

        async fn submit_dispatch(
            &self,
            payload: &DispatchPayload,
        ) -> Result<DispatchReceipt, DispatchError> {
            if self.reject {
                return Err(DispatchError::Rejected {
                    status: 500,
                    body: "Workflow error".to_string(),
                });
            }
            self.dispatches.lock().unwrap().push(payload.clone());
            Ok(parse_receipt(""))
        }

        async fn submit_single(
            &self,
            payload: &SingleContactDispatch,
        ) -> Result<DispatchReceipt, DispatchError> {
            self.singles.lock().unwrap().push(payload.clone());
            Ok(parse_receipt(r#"{"message": "ok"}"#))
        }

        async fn fetch_tracking(&self) -> Result<Vec<TrackingRecord>, DispatchError> {
            Ok(vec![
                TrackingRecord {
                    name: Some("Ana".to_string()),
                    name_batch: Some("Black Friday".to_string()),
                    send_status: SendStatus::Sent,
                    ..Default::default()
                },
                TrackingRecord {
                    name: Some("Bia".to_string()),
                    name_batch: Some("Natal".to_string()),
                    send_status: SendStatus::Failed,
                    type_error: Some("Número inválido".to_string()),
                    ..Default::default()
                },
            ])
        }
    }

    fn vendas() -> Channel {
        Channel {
            record_id: Some(FlexibleId::Number(1)),
            account_name: "Vendas".to_string(),
            display_phone_number: "+55 11 90000-0000".to_string(),
            status: None,
            quality_rating: None,
            id_account: Some("acc-1".to_string()),
            phone_id: Some(FlexibleId::Text("pid-1".to_string())),
        }
    }

    fn promo() -> Template {
        Template {
            record_id: None,
            name: "promo_bf".to_string(),
            category: None,
            status: None,
        }
    }

    fn state_with(backend: Arc<RecordingBackend>) -> AppState {
        AppState::with_backend(AppConfig::default(), backend)
    }

    fn scheduled() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 28, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_lookups_go_through_backend() {
        let state = state_with(Arc::new(RecordingBackend::default()));

        let channels = list_channels(&state).await.unwrap();
        assert_eq!(channels[0].label(), "Vendas - +55 11 90000-0000");

        let templates = list_templates(&state, channels[0].id_account.clone()).await.unwrap();
        assert_eq!(templates, vec![promo()]);
        assert!(list_templates(&state, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_campaign() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clientes.csv");
        std::fs::write(&path, "name;phone;email\nAna;11999999999;\nPedro;;\nBia;21987654321;\n").unwrap();

        let backend = Arc::new(RecordingBackend::default());
        let state = state_with(backend.clone());
        let draft = CampaignDraft::new("Black Friday", scheduled())
            .with_selection(vendas(), Some(promo()))
            .with_batch_size(1);

        let result = submit_campaign(&state, path.display().to_string(), draft)
            .await
            .unwrap();
        assert!(result.receipt.success);
        assert_eq!(result.stats.valid_contacts, 2);
        assert_eq!(result.batch_count, 2);

        let dispatches = backend.dispatches.lock().unwrap();
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].csv_file_name, "clientes-utf8.csv");
        assert_eq!(dispatches[0].contact_count, 2);
        assert_eq!(dispatches[0].scheduled_date_time, "2025-11-28 09:00");
    }

    #[tokio::test]
    async fn test_rejected_campaign_reports_status() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clientes.csv");
        std::fs::write(&path, "name;phone\nAna;11999999999").unwrap();

        let backend = Arc::new(RecordingBackend {
            reject: true,
            ..Default::default()
        });
        let draft = CampaignDraft::new("X", scheduled()).with_selection(vendas(), Some(promo()));

        let err = submit_campaign(&state_with(backend), path.display().to_string(), draft)
            .await
            .unwrap_err();
        assert!(err.contains("500"));
    }

    #[tokio::test]
    async fn test_campaign_without_template_is_not_sent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clientes.csv");
        std::fs::write(&path, "name;phone\nAna;11999999999").unwrap();

        let backend = Arc::new(RecordingBackend::default());
        let draft = CampaignDraft::new("X", scheduled()).with_selection(vendas(), None);

        assert!(submit_campaign(&state_with(backend.clone()), path.display().to_string(), draft)
            .await
            .is_err());
        assert!(backend.dispatches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_test_message_normalizes_phone() {
        let backend = Arc::new(RecordingBackend::default());
        let state = state_with(backend.clone());
        let selection = ChannelSelection::new(vendas(), Some(promo()));

        let receipt = send_test_message(
            &state,
            "Teste".to_string(),
            selection.clone(),
            "Ana".to_string(),
            "(11) 99999-9999".to_string(),
            scheduled(),
        )
        .await
        .unwrap();
        assert_eq!(receipt.message, "ok");
        assert_eq!(backend.singles.lock().unwrap()[0].contact.phone, "+5511999999999");

        let err = send_test_message(
            &state,
            "Teste".to_string(),
            selection,
            "Ana".to_string(),
            "123".to_string(),
            scheduled(),
        )
        .await
        .unwrap_err();
        assert!(err.contains("too short"));
    }

    #[tokio::test]
    async fn test_tracking_overview_and_report() {
        let state = state_with(Arc::new(RecordingBackend::default()));

        let all = fetch_tracking(&state, None).await.unwrap();
        assert_eq!(all.summary.total(), 2);

        let failed = fetch_tracking(
            &state,
            Some(TrackingFilter {
                status: Some(SendStatus::Failed),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(failed.records.len(), 1);
        assert_eq!(failed.records[0].reason(), Some("Número inválido"));

        let dir = tempdir().unwrap();
        let path = export_tracking_report_impl(
            &all.records,
            Some(dir.path().display().to_string()),
            scheduled(),
        )
        .await
        .unwrap();
        assert!(path.ends_with("tracking-disparos-2025-11-28-12-00-00.csv"));
        assert!(path.exists());
    }
}

//! Campaign payload construction
//!
//! A campaign sends one contact list through one or more channels, each with
//! its own template. Everything goes to the webhook in a single multipart
//! request; the webhook splits contacts into batches of `batch_size`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error_handling::DispatchError;
use crate::core::export::{encode_contacts, reencoded_file_name};
use crate::core::models::{Channel, ContactRecord, Template};

/// Contacts per batch when the operator does not choose one
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Value of the `mode` form field for contact-list campaigns
pub const CSV_MODE: &str = "csv";

/// Value of the `mode` field for a single test contact
pub const SINGLE_MODE: &str = "single";

/// America/Sao_Paulo has stayed on UTC-03:00 since daylight saving was dropped
pub(crate) const SAO_PAULO_UTC_OFFSET_HOURS: i64 = 3;

/// Schedule format expected by the webhook
pub const SCHEDULE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A channel picked for the campaign and the template chosen for it
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSelection {
    pub channel: Channel,
    pub template: Option<Template>,
}

impl ChannelSelection {
    pub fn new(channel: Channel, template: Option<Template>) -> Self {
        Self { channel, template }
    }
}

/// Campaign form as filled in by the operator
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignDraft {
    pub name: String,
    pub selections: Vec<ChannelSelection>,
    pub scheduled_at: DateTime<Utc>,
    /// Seconds, lower bound of the random pause between contacts
    pub interval_min: u32,
    /// Seconds, upper bound of the random pause between contacts
    pub interval_max: u32,
    pub batch_size: Option<u32>,
}

impl CampaignDraft {
    pub fn new(name: impl Into<String>, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            selections: Vec::new(),
            scheduled_at,
            interval_min: 15,
            interval_max: 30,
            batch_size: None,
        }
    }

    pub fn with_selection(mut self, channel: Channel, template: Option<Template>) -> Self {
        self.selections.push(ChannelSelection::new(channel, template));
        self
    }

    pub fn with_interval(mut self, min: u32, max: u32) -> Self {
        self.interval_min = min;
        self.interval_max = max;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn effective_batch_size(&self) -> u32 {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    fn validate(&self) -> Result<(), DispatchError> {
        if self.name.trim().is_empty() {
            return Err(DispatchError::MissingName);
        }
        if self.selections.is_empty() {
            return Err(DispatchError::NoChannels);
        }

        let without_template: Vec<String> = self
            .selections
            .iter()
            .filter(|s| s.template.is_none())
            .map(|s| s.channel.label())
            .collect();
        if !without_template.is_empty() {
            return Err(DispatchError::MissingTemplates(without_template));
        }

        if self.interval_min > self.interval_max {
            return Err(DispatchError::InvalidInterval {
                min: self.interval_min,
                max: self.interval_max,
            });
        }
        if self.effective_batch_size() == 0 {
            return Err(DispatchError::InvalidBatchSize);
        }
        Ok(())
    }
}

/// One entry of the `channels` form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchChannel {
    /// `"<account> - <display number>"`
    pub channel: String,
    pub phone_id: String,
    pub display_phone_number: String,
    /// Template name
    pub template: String,
}

impl DispatchChannel {
    fn from_selection(channel: &Channel, template: &Template) -> Result<Self, DispatchError> {
        let phone_id = channel
            .dispatch_phone_id()
            .ok_or_else(|| DispatchError::MissingPhoneId(channel.label()))?;

        Ok(Self {
            channel: channel.label(),
            phone_id,
            display_phone_number: channel.display_phone_number.clone(),
            template: template.name.clone(),
        })
    }
}

/// Everything the webhook needs to schedule a campaign
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPayload {
    pub name: String,
    pub channels: Vec<DispatchChannel>,
    /// São Paulo wall-clock time, `YYYY-MM-DD HH:MM`
    pub scheduled_date_time: String,
    pub interval_min: u32,
    pub interval_max: u32,
    pub contact_count: usize,
    pub batch_size: u32,
    pub csv_file_name: String,
    /// Re-encoded contact list, UTF-8 with BOM
    pub csv_content: Vec<u8>,
}

impl DispatchPayload {
    /// Text fields of the multipart form, in submission order. The contact
    /// list goes in a separate `csvFile` part.
    pub fn form_fields(&self) -> Result<Vec<(&'static str, String)>, DispatchError> {
        let channels =
            serde_json::to_string(&self.channels).map_err(|e| DispatchError::Encode(e.to_string()))?;

        Ok(vec![
            ("name", self.name.clone()),
            ("channels", channels),
            ("scheduledDateTime", self.scheduled_date_time.clone()),
            ("intMin", self.interval_min.to_string()),
            ("intMax", self.interval_max.to_string()),
            ("mode", CSV_MODE.to_string()),
            ("contactCount", self.contact_count.to_string()),
            ("batchSize", self.batch_size.to_string()),
        ])
    }

    pub fn batch_count(&self) -> usize {
        batch_count(self.contact_count, self.batch_size)
    }
}

/// Number of batches needed for `contacts` contacts
pub fn batch_count(contacts: usize, batch_size: u32) -> usize {
    match batch_size {
        0 => 0,
        size => contacts.div_ceil(size as usize),
    }
}

/// Render an instant as São Paulo wall-clock time
pub fn format_sao_paulo(instant: DateTime<Utc>) -> String {
    (instant - Duration::hours(SAO_PAULO_UTC_OFFSET_HOURS))
        .naive_utc()
        .format(SCHEDULE_FORMAT)
        .to_string()
}

/// Validate the draft and assemble the multipart payload.
///
/// `source_name` is the uploaded file name, used to name the re-encoded list.
pub fn build_dispatch_payload(
    draft: &CampaignDraft,
    contacts: &[ContactRecord],
    source_name: Option<&str>,
) -> Result<DispatchPayload, DispatchError> {
    draft.validate()?;
    if contacts.is_empty() {
        return Err(DispatchError::NoContacts);
    }

    let channels = draft
        .selections
        .iter()
        .filter_map(|s| s.template.as_ref().map(|t| (&s.channel, t)))
        .map(|(channel, template)| DispatchChannel::from_selection(channel, template))
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Dispatch channels: {:?}", channels);

    let payload = DispatchPayload {
        name: draft.name.trim().to_string(),
        channels,
        scheduled_date_time: format_sao_paulo(draft.scheduled_at),
        interval_min: draft.interval_min,
        interval_max: draft.interval_max,
        contact_count: contacts.len(),
        batch_size: draft.effective_batch_size(),
        csv_file_name: reencoded_file_name(source_name),
        csv_content: encode_contacts(contacts)?,
    };

    info!(
        "Campaign '{}' prepared: {} contacts, {} channel(s), {} batch(es) of up to {}",
        payload.name,
        payload.contact_count,
        payload.channels.len(),
        payload.batch_count(),
        payload.batch_size
    );
    Ok(payload)
}

/// JSON payload sending one contact through one channel, used to try a
/// template before launching a campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleContactDispatch {
    pub name: String,
    #[serde(flatten)]
    pub channel: DispatchChannel,
    #[serde(rename = "scheduledDateTime")]
    pub scheduled_date_time: String,
    pub mode: String,
    pub contact: ContactRecord,
}

impl SingleContactDispatch {
    pub fn build(
        name: &str,
        selection: &ChannelSelection,
        contact: ContactRecord,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Self, DispatchError> {
        if name.trim().is_empty() {
            return Err(DispatchError::MissingName);
        }
        let template = selection
            .template
            .as_ref()
            .ok_or_else(|| DispatchError::MissingTemplates(vec![selection.channel.label()]))?;

        Ok(Self {
            name: name.trim().to_string(),
            channel: DispatchChannel::from_selection(&selection.channel, template)?,
            scheduled_date_time: format_sao_paulo(scheduled_at),
            mode: SINGLE_MODE.to_string(),
            contact,
        })
    }
}

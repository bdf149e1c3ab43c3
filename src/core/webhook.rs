//! HTTP client for the dispatch webhook
//!
//! Each call is one request with no retry. Non-2xx answers become
//! [`DispatchError::Rejected`] carrying the response body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::core::dispatch::{DispatchPayload, SingleContactDispatch};
use crate::core::error_handling::DispatchError;
use crate::core::models::{Channel, Template};
use crate::core::tracking::TrackingRecord;
use crate::utils::network::{get_user_agent, DEFAULT_TIMEOUT};

pub const DEFAULT_WEBHOOK_BASE_URL: &str = "https://webhook.sistemavieira.com.br/webhook/";

const CHANNELS_PATH: &str = "canais";
const TEMPLATES_PATH: &str = "templates";
const DISPATCH_PATH: &str = "multi-disparos";
const TRACKING_PATH: &str = "tracking";

/// Message recorded when a successful response has no usable body
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Sucesso";

/// Outcome of an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub success: bool,
    pub message: String,
    /// Parsed JSON body, when the webhook sent one
    pub body: Option<Value>,
}

/// Interpret the body of a 2xx response. Empty and non-JSON bodies still
/// count as success.
pub fn parse_receipt(text: &str) -> DispatchReceipt {
    let text = text.trim();
    if text.is_empty() {
        return DispatchReceipt {
            success: true,
            message: DEFAULT_SUCCESS_MESSAGE.to_string(),
            body: None,
        };
    }

    match serde_json::from_str::<Value>(text) {
        Ok(body) => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_SUCCESS_MESSAGE)
                .to_string();
            let success = body.get("success").and_then(Value::as_bool).unwrap_or(true);
            DispatchReceipt {
                success,
                message,
                body: Some(body),
            }
        }
        Err(e) => {
            debug!("Response body is not JSON ({}), treating as success", e);
            DispatchReceipt {
                success: true,
                message: DEFAULT_SUCCESS_MESSAGE.to_string(),
                body: None,
            }
        }
    }
}

/// Items of a list response: a bare array, or one under `data` or `body`.
/// Other shapes yield an empty list; items that do not deserialize are
/// skipped.
pub fn extract_list<T: DeserializeOwned>(value: Value) -> Vec<T> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match (map.remove("data"), map.remove("body")) {
            (Some(Value::Array(items)), _) => items,
            (_, Some(Value::Array(items))) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping malformed list item: {}", e);
                None
            }
        })
        .collect()
}

/// Operations offered by the dispatch service
#[async_trait]
pub trait DispatchBackend: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<Channel>, DispatchError>;

    /// All templates, or those of one account
    async fn list_templates(&self, id_account: Option<&str>) -> Result<Vec<Template>, DispatchError>;

    async fn submit_dispatch(&self, payload: &DispatchPayload) -> Result<DispatchReceipt, DispatchError>;

    async fn submit_single(
        &self,
        payload: &SingleContactDispatch,
    ) -> Result<DispatchReceipt, DispatchError>;

    async fn fetch_tracking(&self) -> Result<Vec<TrackingRecord>, DispatchError>;
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEBHOOK_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: get_user_agent(),
        }
    }
}

pub struct WebhookClient {
    client: Client,
    base_url: Url,
}

impl WebhookClient {
    pub fn new(config: WebhookConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, DispatchError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, DispatchError> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::list_body(response).await
    }

    async fn list_body<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, DispatchError> {
        let response = Self::check_status(response).await?;
        let value: Value = serde_json::from_str(&response.text().await?)?;
        Ok(extract_list(value))
    }

    async fn check_status(response: Response) -> Result<Response, DispatchError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Webhook answered HTTP {}: {}", status, body);
        Err(DispatchError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn receipt(response: Response) -> Result<DispatchReceipt, DispatchError> {
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        debug!("Webhook response body: {}", text);
        Ok(parse_receipt(&text))
    }
}

fn normalize_base_url(base: &str) -> Result<Url, DispatchError> {
    let mut url = Url::parse(base.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl DispatchBackend for WebhookClient {
    async fn list_channels(&self) -> Result<Vec<Channel>, DispatchError> {
        let channels: Vec<Channel> = self.get_list(CHANNELS_PATH).await?;
        info!("Fetched {} channels", channels.len());
        Ok(channels)
    }

    async fn list_templates(&self, id_account: Option<&str>) -> Result<Vec<Template>, DispatchError> {
        let templates: Vec<Template> = match id_account {
            None => self.get_list(TEMPLATES_PATH).await?,
            Some(account) => {
                let url = self.endpoint(TEMPLATES_PATH)?;
                debug!("POST {} for account {}", url, account);
                let response = self
                    .client
                    .post(url)
                    .json(&json!({ "id_account": account }))
                    .send()
                    .await?;
                Self::list_body(response).await?
            }
        };
        info!("Fetched {} templates", templates.len());
        Ok(templates)
    }

    async fn submit_dispatch(&self, payload: &DispatchPayload) -> Result<DispatchReceipt, DispatchError> {
        let url = self.endpoint(DISPATCH_PATH)?;

        let mut form = Form::new();
        for (name, value) in payload.form_fields()? {
            form = form.text(name, value);
        }
        let csv_part = Part::bytes(payload.csv_content.clone())
            .file_name(payload.csv_file_name.clone())
            .mime_str("text/csv")?;
        form = form.part("csvFile", csv_part);

        info!(
            "Submitting campaign '{}' to {} ({} contacts, {} channel(s))",
            payload.name,
            url,
            payload.contact_count,
            payload.channels.len()
        );
        let response = self.client.post(url).multipart(form).send().await?;
        let receipt = Self::receipt(response).await?;
        info!("Campaign '{}' accepted: {}", payload.name, receipt.message);
        Ok(receipt)
    }

    async fn submit_single(
        &self,
        payload: &SingleContactDispatch,
    ) -> Result<DispatchReceipt, DispatchError> {
        let url = self.endpoint(DISPATCH_PATH)?;
        info!(
            "Sending '{}' to a single contact through {}",
            payload.channel.template, payload.channel.channel
        );
        let response = self.client.post(url).json(payload).send().await?;
        Self::receipt(response).await
    }

    async fn fetch_tracking(&self) -> Result<Vec<TrackingRecord>, DispatchError> {
        let records: Vec<TrackingRecord> = self.get_list(TRACKING_PATH).await?;
        info!("Fetched {} tracking records", records.len());
        Ok(records)
    }
}

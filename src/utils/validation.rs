//! Input validation utilities

use anyhow::{anyhow, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

/// Loose `local@domain.tld` check. Used for warnings only, never to reject rows.
pub fn is_plausible_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Validate a webhook base URL
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| anyhow!("Invalid URL format: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(anyhow!("Unsupported URL scheme: {}", other)),
    }
}

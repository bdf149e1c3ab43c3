//! Network helpers for the webhook client

use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent to the webhook collaborators
pub fn get_user_agent() -> String {
    format!("{}/{}", crate::NAME, crate::VERSION)
}

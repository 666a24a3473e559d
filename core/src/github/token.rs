//! Installation token exchange
//!
//! Presents the app JWT to GitHub and extracts the installation access token.

use serde_json::Value;
use std::fmt;

use super::auth::SignedAssertion;
use crate::error::{Result, SyncError};
use crate::platform::HttpClient;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const USER_AGENT: &str = "gh-token-sync";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Short-lived installation access token
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    /// ISO 8601 expiry as reported by GitHub, informational only
    pub expires_at: Option<String>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Seconds until GitHub's reported expiry, if known and still in the future
    pub fn expires_in(&self, now_secs: i64) -> Option<u64> {
        calculate_expires_in_from_now(self.expires_at.as_deref()?, now_secs)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Exchange a signed app JWT for an installation access token.
///
/// Sends exactly one request. Fields other than `token` and `expires_at` in
/// the response are ignored.
pub async fn create_installation_token(
    api_base: &str,
    installation_id: u64,
    assertion: &SignedAssertion,
    http: &dyn HttpClient,
) -> Result<AccessToken> {
    let url = format!(
        "{}/app/installations/{}/access_tokens",
        api_base.trim_end_matches('/'),
        installation_id
    );

    let auth_header = format!("Bearer {}", assertion.jwt);
    let headers = [
        ("Authorization", auth_header.as_str()),
        ("Accept", "application/vnd.github+json"),
        ("User-Agent", USER_AGENT),
        ("X-GitHub-Api-Version", GITHUB_API_VERSION),
    ];

    let response = http.post(&url, &headers, &[]).await?;

    if !response.is_success() {
        let message = response
            .json::<Value>()
            .ok()
            .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| response.text());
        return Err(SyncError::authority(response.status, message));
    }

    let body: Value = response
        .json()
        .map_err(|e| SyncError::response_shape(format!("response is not JSON: {}", e)))?;

    let token = match body.get("token") {
        Some(Value::String(token)) if !token.is_empty() => token.clone(),
        Some(Value::String(_)) => return Err(SyncError::response_shape("token is empty")),
        Some(_) => return Err(SyncError::response_shape("token is not a string")),
        None => return Err(SyncError::response_shape("token field missing")),
    };

    Ok(AccessToken {
        token,
        expires_at: body
            .get("expires_at")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Calculate expires_in from ISO 8601 expires_at timestamp given a specific "now" time
fn calculate_expires_in_from_now(expires_at: &str, now_secs: i64) -> Option<u64> {
    use chrono::{DateTime, Utc};

    let expires_dt: DateTime<Utc> = expires_at.parse().ok()?;
    let diff = expires_dt.timestamp() - now_secs;

    if diff > 0 {
        Some(diff as u64)
    } else {
        None
    }
}

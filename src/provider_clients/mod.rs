use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::{BackendError, Result};
use crate::models::AccountProfile;
use crate::utils::DayWindow;

pub mod newapi;
#[cfg(test)]
pub mod scripted;

pub use newapi::NewApiClient;

pub type ClientFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiEnvelope>> + Send + 'a>>;

/// Transport for the two console lookups. Transport failures come back as
/// `Err`; domain failures come back as an envelope with `success == false`.
pub trait UsageClient: Send + Sync {
    fn fetch_balance<'a>(&'a self, target: &'a RemoteTarget) -> ClientFuture<'a>;
    fn fetch_usage<'a>(&'a self, target: &'a RemoteTarget, window: DayWindow)
        -> ClientFuture<'a>;
}

/// Request parameters for one account, with the cookie already trimmed.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub endpoint_url: String,
    pub auth_cookie: String,
    pub user_id: String,
}

impl RemoteTarget {
    pub fn from_profile(profile: &AccountProfile) -> Self {
        Self {
            endpoint_url: profile.endpoint_url.clone(),
            auth_cookie: profile.auth_cookie.trim().to_string(),
            user_id: profile.user_id.clone(),
        }
    }
}

impl std::fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("endpoint_url", &self.endpoint_url)
            .field("auth_cookie", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<QuotaData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaData {
    #[serde(default)]
    pub quota: f64,
}

impl ApiEnvelope {
    /// Unwraps `data.quota`, or fails with the payload message (else `fallback`).
    pub fn into_quota(self, fallback: &str) -> Result<f64> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data.quota),
            _ => {
                let message = self
                    .message
                    .as_deref()
                    .map(str::trim)
                    .filter(|message| !message.is_empty())
                    .unwrap_or(fallback);
                Err(BackendError::Provider(message.to_string()))
            }
        }
    }
}

pub fn shorten_body(body: &str) -> String {
    let trimmed = body.replace('\n', " ").trim().to_string();
    if trimmed.len() > 400 {
        format!("{}...", trimmed.chars().take(400).collect::<String>())
    } else {
        trimmed
    }
}

pub fn format_http_error(status: reqwest::StatusCode, body: &str) -> String {
    let body = shorten_body(body);
    if body.is_empty() {
        format!("HTTP Error {status}")
    } else {
        format!("HTTP Error {status}: {body}")
    }
}

//! Fast2SMS "quick SMS" adapter.
//!
//! Owns transport details only: request body, auth header, timeout, and the
//! mapping of Fast2SMS status codes onto [`FailureReason`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{FailureReason, SmsError, SmsReceipt, SmsTransport};

pub const DEFAULT_ENDPOINT: &str = "https://www.fast2sms.com/dev/bulkV2";

pub struct Fast2SmsConfig {
    pub api_key: String,
    pub endpoint: Url,
    /// Per-request timeout, covering connect and body.
    pub timeout: Duration,
}

pub struct Fast2SmsTransport {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl Fast2SmsTransport {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: Fast2SmsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint,
            api_key: config.api_key,
        })
    }
}

#[derive(Debug, Serialize)]
struct QuickSmsRequest<'a> {
    route: &'static str,
    message: &'a str,
    language: &'static str,
    flash: u8,
    numbers: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct QuickSmsResponse {
    #[serde(rename = "return")]
    accepted: Option<bool>,
    request_id: Option<String>,
    status_code: Option<u32>,
    /// Either a string or a list of strings depending on the outcome.
    message: Option<serde_json::Value>,
}

impl QuickSmsResponse {
    fn message_text(&self) -> Option<String> {
        match self.message.as_ref()? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Array(items) => {
                let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl SmsTransport for Fast2SmsTransport {
    async fn send(&self, recipient: &str, text: &str) -> Result<SmsReceipt, SmsError> {
        let body = QuickSmsRequest {
            route: "q",
            message: text,
            language: "english",
            flash: 0,
            numbers: recipient,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::AUTHORIZATION, self.api_key.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        let result = interpret_response(status, &bytes);
        match &result {
            Ok(receipt) => debug!(recipient, provider_ref = ?receipt.provider_ref, "Fast2SMS accepted message"),
            Err(e) => warn!(recipient, status = status.as_u16(), "Fast2SMS send failed: {}", e),
        }
        result
    }
}

fn interpret_response(status: StatusCode, body: &[u8]) -> Result<SmsReceipt, SmsError> {
    let parsed: Option<QuickSmsResponse> = serde_json::from_slice(body).ok();

    if let Some(parsed) = parsed {
        if status.is_success() && parsed.accepted == Some(true) {
            return Ok(SmsReceipt {
                detail: parsed.message_text().unwrap_or_else(|| "accepted".to_string()),
                provider_ref: parsed.request_id,
            });
        }
        if let Some(code) = parsed.status_code {
            let detail = parsed
                .message_text()
                .unwrap_or_else(|| format!("provider status {}", code));
            return Err(SmsError::new(map_provider_code(code), detail));
        }
        if status.is_success() {
            return Err(SmsError::new(
                FailureReason::Rejected,
                parsed.message_text().unwrap_or_else(|| "message not accepted".to_string()),
            ));
        }
    }

    Err(map_status_error(status, body))
}

/// Fast2SMS returns its own numeric codes in the body.
fn map_provider_code(code: u32) -> FailureReason {
    match code {
        411 | 405 => FailureReason::InvalidNumber,
        409 | 412 | 413 | 414 | 415 | 996 | 998 => FailureReason::NotPermitted,
        416 | 999 => FailureReason::InsufficientBalance,
        995 => FailureReason::RateLimited,
        _ => FailureReason::Rejected,
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> SmsError {
    let preview = body_preview(body);
    let detail = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };

    let reason = match status {
        StatusCode::TOO_MANY_REQUESTS => FailureReason::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureReason::NotPermitted,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => FailureReason::Timeout,
        _ if status.is_server_error() => FailureReason::Unavailable,
        _ => FailureReason::Rejected,
    };
    SmsError::new(reason, detail)
}

fn map_transport_error(error: reqwest::Error) -> SmsError {
    if error.is_timeout() {
        SmsError::new(FailureReason::Timeout, error.to_string())
    } else {
        SmsError::new(FailureReason::Unavailable, error.to_string())
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

//! Outbound notification transport.
//!
//! The dispatch workflow only sees [`SmsTransport`]: one recipient, one text,
//! one normalized result. Provider quirks (response shapes, numeric error
//! codes, rate limits) stay inside the adapters in this crate.

pub mod fast2sms;
pub mod log_only;
pub mod pacing;

use std::fmt;

use async_trait::async_trait;
use tokio::time::Instant;

pub use fast2sms::{Fast2SmsConfig, Fast2SmsTransport};
pub use log_only::LogOnlyTransport;
pub use pacing::{PacedTransport, Pacing};

/// Provider acknowledgment for one accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsReceipt {
    /// Provider-side request id, when the provider returns one.
    pub provider_ref: Option<String>,
    /// Short human-readable acknowledgment text.
    pub detail: String,
}

impl SmsReceipt {
    /// The text recorded in delivery history for this receipt.
    pub fn summary(&self) -> String {
        match &self.provider_ref {
            Some(reference) => format!("{} (ref {})", self.detail, reference),
            None => self.detail.clone(),
        }
    }
}

/// Normalized reason a send failed, independent of the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    InvalidNumber,
    NotPermitted,
    RateLimited,
    InsufficientBalance,
    Timeout,
    Unavailable,
    Rejected,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::InvalidNumber => "invalid number",
            FailureReason::NotPermitted => "not permitted",
            FailureReason::RateLimited => "rate limited",
            FailureReason::InsufficientBalance => "insufficient balance",
            FailureReason::Timeout => "timed out",
            FailureReason::Unavailable => "provider unavailable",
            FailureReason::Rejected => "rejected by provider",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}: {detail}")]
pub struct SmsError {
    pub reason: FailureReason,
    pub detail: String,
}

impl SmsError {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Send one text to one recipient.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<SmsReceipt, SmsError>;

    /// Wait until this transport may start another send, giving up at
    /// `deadline`. Returns `false` when no slot opened in time; nothing is
    /// claimed then. A granted turn lets the next [`send`](Self::send) start
    /// without waiting again.
    async fn wait_turn(&self, _deadline: Instant) -> bool {
        true
    }
}

#[async_trait]
impl<T: SmsTransport + ?Sized> SmsTransport for std::sync::Arc<T> {
    async fn send(&self, recipient: &str, text: &str) -> Result<SmsReceipt, SmsError> {
        (**self).send(recipient, text).await
    }

    async fn wait_turn(&self, deadline: Instant) -> bool {
        (**self).wait_turn(deadline).await
    }
}

use async_trait::async_trait;
use tracing::info;

use crate::{SmsError, SmsReceipt, SmsTransport};

/// Stand-in used when no provider key is configured. Every send "succeeds"
/// and is only written to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyTransport;

#[async_trait]
impl SmsTransport for LogOnlyTransport {
    async fn send(&self, recipient: &str, text: &str) -> Result<SmsReceipt, SmsError> {
        info!(recipient, chars = text.chars().count(), "SMS not sent (log-only transport)");
        Ok(SmsReceipt {
            provider_ref: None,
            detail: "logged only, no provider configured".to_string(),
        })
    }
}

use beacon_types::api::{SosDetails, SosResponse};
use beacon_types::models::SosEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTier {
    All,
    Partial,
    None,
}

/// Outcome of a dispatch whose event was recorded.
///
/// Every figure is derived from the recorded event, so recounting the
/// persisted outcomes always gives the same numbers.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub event: SosEvent,
}

impl DispatchReport {
    pub fn contacts_total(&self) -> usize {
        self.event.contacts_notified.len()
    }

    pub fn successful_sends(&self) -> usize {
        self.event.successful_sends()
    }

    /// Partial delivery still counts: some alert beats none.
    pub fn success(&self) -> bool {
        self.successful_sends() > 0
    }

    pub fn tier(&self) -> DeliveryTier {
        match self.successful_sends() {
            0 => DeliveryTier::None,
            n if n == self.contacts_total() => DeliveryTier::All,
            _ => DeliveryTier::Partial,
        }
    }

    pub fn summary(&self) -> String {
        let total = self.contacts_total();
        match self.tier() {
            DeliveryTier::All => {
                format!("SOS sent successfully to all {} emergency contacts", total)
            }
            DeliveryTier::Partial => format!(
                "SOS partially sent: {} of {} emergency contacts notified",
                self.successful_sends(),
                total
            ),
            DeliveryTier::None => "Failed to send SOS to any emergency contact".to_string(),
        }
    }

    pub fn to_response(&self) -> SosResponse {
        SosResponse {
            success: self.success(),
            message: self.summary(),
            details: SosDetails {
                contacts_total: self.contacts_total(),
                contacts_notified: self.successful_sends(),
                location: self.event.location,
                timestamp: self.event.timestamp,
                triggered_by: self.event.triggered_by.clone(),
            },
            sms_results: self.event.outcomes.clone(),
        }
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user as seen by everything outside the storage layer.
/// The password hash never leaves `beacon-db` through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Ordered emergency-contact phone numbers. Duplicates are allowed.
    pub emergency_contacts: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn map_link(&self) -> String {
        format!("https://www.google.com/maps?q={},{}", self.lat, self.lng)
    }
}

/// How an SOS was raised. Known tags get their own variant; anything else a
/// client sends is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriggerSource {
    #[default]
    Button,
    Volume,
    Voice,
    Auto,
    Other(String),
}

impl TriggerSource {
    pub fn as_str(&self) -> &str {
        match self {
            TriggerSource::Button => "button",
            TriggerSource::Volume => "volume",
            TriggerSource::Voice => "voice",
            TriggerSource::Auto => "auto",
            TriggerSource::Other(tag) => tag,
        }
    }
}

impl From<String> for TriggerSource {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "button" => TriggerSource::Button,
            "volume" => TriggerSource::Volume,
            "voice" => TriggerSource::Voice,
            "auto" => TriggerSource::Auto,
            _ => TriggerSource::Other(tag),
        }
    }
}

impl From<TriggerSource> for String {
    fn from(source: TriggerSource) -> Self {
        match source {
            TriggerSource::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of notifying one contact. Exactly one of `response` / `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub contact: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(contact: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            contact: contact.into(),
            success: true,
            response: Some(response.into()),
            error: None,
        }
    }

    pub fn failed(contact: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            contact: contact.into(),
            success: false,
            response: None,
            error: Some(error.into()),
        }
    }
}

/// One SOS dispatch as recorded in a user's history. Append-only.
///
/// `contacts_notified` is a copy of the contact list taken when the dispatch
/// started; `outcomes` has the same length and order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosEvent {
    pub id: Uuid,
    pub location: Location,
    pub triggered_by: TriggerSource,
    pub timestamp: DateTime<Utc>,
    pub contacts_notified: Vec<String>,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl SosEvent {
    pub fn successful_sends(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPing {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DeliveryOutcome, Location, LocationPing, SosEvent, TriggerSource};

// -- JWT Claims --

/// JWT claims issued at signup/login and checked by the API middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

/// Body of every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    pub message: String,
}

// -- Auth --

/// Fields are optional so a missing one can be reported as
/// "All fields required" instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub token: String,
}

// -- Contacts --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactsRequest {
    pub user_id: Option<String>,
    pub contacts: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactsResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub contacts: Vec<String>,
}

// -- SOS --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    pub user_id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub triggered_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosDetails {
    pub contacts_total: usize,
    pub contacts_notified: usize,
    pub location: Location,
    pub timestamp: DateTime<Utc>,
    pub triggered_by: TriggerSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosResponse {
    pub success: bool,
    pub message: String,
    pub details: SosDetails,
    pub sms_results: Vec<DeliveryOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

fn default_history_limit() -> u32 {
    50
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    /// Latest first.
    pub history: Vec<SosEvent>,
}

// -- Location --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    pub user_id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationResponse {
    pub success: bool,
    pub location: LocationPing,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationHistoryResponse {
    pub success: bool,
    /// Newest first.
    pub locations: Vec<LocationPing>,
}

// -- Nearby places --

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default = "default_radius")]
    pub radius: u32,
}

fn default_radius() -> u32 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceSummary {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub distance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NearbyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub places: Vec<PlaceSummary>,
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::distance::distance_km;

/// Closest places returned to clients.
pub const MAX_PLACES: usize = 15;

/// Amenities treated as safe places.
pub const SAFE_AMENITIES: [&str; 3] = ["police", "hospital", "clinic"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Amenity tag, e.g. `police`.
    pub kind: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    /// Distance from the query point.
    pub distance_km: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("invalid places request: {message}")]
    InvalidRequest { message: String },
    #[error("places lookup timed out: {message}")]
    Timeout { message: String },
    #[error("places lookup rate limited: {message}")]
    RateLimited { message: String },
    #[error("places lookup failed: {message}")]
    Transport { message: String },
    #[error("places response could not be decoded: {message}")]
    Decode { message: String },
}

impl PlacesError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into() }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited { message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }
}

#[async_trait]
pub trait PlaceFinder: Send + Sync {
    /// Safe places within `radius_m` metres, nearest first, at most [`MAX_PLACES`].
    async fn find_nearby(&self, lat: f64, lng: f64, radius_m: u32) -> Result<Vec<Place>, PlacesError>;
}

/// Fill in distances from the query point, sort nearest first and truncate.
pub fn rank_places(lat: f64, lng: f64, mut places: Vec<Place>) -> Vec<Place> {
    for place in &mut places {
        place.distance_km = distance_km(lat, lng, place.lat, place.lng);
    }
    places.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    places.truncate(MAX_PLACES);
    places
}

pub fn validate_point(lat: f64, lng: f64) -> Result<(), PlacesError> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(PlacesError::invalid_request("coordinates must be finite"));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(PlacesError::invalid_request("latitude must be within [-90, 90]"));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(PlacesError::invalid_request("longitude must be within [-180, 180]"));
    }
    Ok(())
}

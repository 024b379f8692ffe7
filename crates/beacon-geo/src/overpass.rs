//! Reqwest-backed Overpass adapter for nearby safe places.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::places::{Place, PlaceFinder, PlacesError, SAFE_AMENITIES, rank_places, validate_point};

pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";
const QUERY_TIMEOUT_SECONDS: u32 = 25;
const ADDRESS_FALLBACK: &str = "Address not available";

pub struct OverpassPlaceFinder {
    client: Client,
    endpoint: Url,
}

impl OverpassPlaceFinder {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PlaceFinder for OverpassPlaceFinder {
    async fn find_nearby(&self, lat: f64, lng: f64, radius_m: u32) -> Result<Vec<Place>, PlacesError> {
        validate_point(lat, lng)?;
        if radius_m == 0 {
            return Err(PlacesError::invalid_request("radius must be positive"));
        }

        let query = build_query(lat, lng, radius_m);
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("data", query)])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status));
        }

        let places = parse_places(&body)?;
        debug!(candidates = places.len(), radius_m, "Overpass lookup complete");
        Ok(rank_places(lat, lng, places))
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

impl OverpassElement {
    /// Untagged or coordinate-less elements (skeleton output) are skipped.
    fn into_place(self) -> Option<Place> {
        let (lat, lng) = (self.lat?, self.lon?);
        let mut tags = self.tags;
        let kind = tags.remove("amenity")?;
        Some(Place {
            name: tags.remove("name").unwrap_or_else(|| kind.clone()),
            address: tags
                .remove("addr:street")
                .unwrap_or_else(|| ADDRESS_FALLBACK.to_string()),
            kind,
            lat,
            lng,
            distance_km: 0.0,
        })
    }
}

fn build_query(lat: f64, lng: f64, radius_m: u32) -> String {
    let selectors: Vec<String> = SAFE_AMENITIES
        .iter()
        .map(|amenity| format!("  node[\"amenity\"=\"{amenity}\"](around:{radius_m},{lat},{lng});"))
        .collect();
    format!(
        "[out:json][timeout:{QUERY_TIMEOUT_SECONDS}];\n(\n{}\n);\nout body;",
        selectors.join("\n")
    )
}

fn parse_places(body: &[u8]) -> Result<Vec<Place>, PlacesError> {
    let decoded: OverpassResponse = serde_json::from_slice(body)
        .map_err(|e| PlacesError::decode(format!("invalid Overpass JSON payload: {e}")))?;
    Ok(decoded
        .elements
        .into_iter()
        .filter_map(OverpassElement::into_place)
        .collect())
}

fn map_transport_error(error: reqwest::Error) -> PlacesError {
    if error.is_timeout() {
        PlacesError::timeout(error.to_string())
    } else {
        PlacesError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode) -> PlacesError {
    let message = format!("status {}", status.as_u16());
    match status {
        StatusCode::TOO_MANY_REQUESTS => PlacesError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => PlacesError::timeout(message),
        _ if status.is_client_error() => PlacesError::invalid_request(message),
        _ => PlacesError::transport(message),
    }
}

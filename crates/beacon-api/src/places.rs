use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use tracing::warn;

use beacon_geo::PlacesError;
use beacon_types::api::{NearbyQuery, NearbyResponse, PlaceSummary};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/nearby-places?lat=&lng=&radius=: police stations, hospitals and
/// clinics, nearest first.
pub async fn nearby_places(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<NearbyQuery>, ApiError>,
) -> Result<Response, ApiError> {
    let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
        return Err(ApiError::BadRequest("Missing location data".to_string()));
    };

    match state.places.find_nearby(lat, lng, query.radius).await {
        Ok(places) => {
            let places = places
                .into_iter()
                .map(|p| PlaceSummary {
                    kind: p.kind,
                    name: p.name,
                    address: p.address,
                    lat: p.lat,
                    lng: p.lng,
                    distance: p.distance_km,
                })
                .collect();
            Ok(Json(NearbyResponse {
                success: true,
                message: None,
                places,
            })
            .into_response())
        }
        Err(PlacesError::InvalidRequest { message }) => Err(ApiError::BadRequest(message)),
        Err(e) => {
            warn!(lat, lng, radius = query.radius, "nearby places lookup failed: {}", e);
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(NearbyResponse {
                    success: false,
                    message: Some("Failed to fetch nearby places".to_string()),
                    places: vec![],
                }),
            )
                .into_response())
        }
    }
}

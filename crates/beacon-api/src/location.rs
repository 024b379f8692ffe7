use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;

use beacon_types::api::{HistoryQuery, LocationHistoryResponse, LocationRequest, LocationResponse};
use beacon_types::models::LocationPing;

use crate::error::ApiError;
use crate::middleware::{Claims, ensure_owner, parse_user_id};
use crate::state::AppState;
use crate::store::run_blocking;

const MAX_PINGS: u32 = 500;

/// POST /api/location: append a location ping to the caller's trail.
pub async fn record_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<LocationRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(raw_id), Some(lat), Some(lng)) = (req.user_id, req.lat, req.lng) else {
        return Err(ApiError::BadRequest("Missing data".to_string()));
    };
    let user_id = parse_user_id(&raw_id)?;
    ensure_owner(&claims, user_id)?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(ApiError::BadRequest("Invalid coordinates".to_string()));
    }

    let ping = LocationPing {
        lat,
        lng,
        timestamp: Utc::now(),
    };
    let db = state.db.clone();
    let stored = ping.clone();
    let found = run_blocking(move || {
        let id = user_id.to_string();
        if db.get_user_by_id(&id)?.is_none() {
            return Ok(false);
        }
        db.record_location(&id, &stored)?;
        Ok(true)
    })
    .await?;

    if !found {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok((
        StatusCode::CREATED,
        Json(LocationResponse {
            success: true,
            location: ping,
        }),
    ))
}

/// GET /api/location/{user_id}: newest first.
pub async fn get_locations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<HistoryQuery>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    ensure_owner(&claims, user_id)?;

    let db = state.db.clone();
    let limit = query.limit.clamp(1, MAX_PINGS);
    let locations = run_blocking(move || db.list_locations(&user_id.to_string(), limit)).await?;

    Ok(Json(LocationHistoryResponse {
        success: true,
        locations,
    }))
}

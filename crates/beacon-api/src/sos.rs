use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use beacon_dispatch::DispatchRequest;
use beacon_types::api::{HistoryQuery, HistoryResponse, SosRequest};

use crate::error::ApiError;
use crate::middleware::{Claims, ensure_owner, parse_user_id};
use crate::state::AppState;
use crate::store::run_blocking;

const MAX_HISTORY: u32 = 200;

/// POST /api/sos: run the dispatch workflow for the caller.
///
/// A dispatch where no contact could be reached still returns 200 with
/// `success: false`: the event is recorded and the client shows the per-contact
/// results.
pub async fn trigger_sos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<SosRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    // Malformed or missing ids are reported by the workflow's own guards.
    if let Some(user_id) = req.user_id.as_deref().and_then(|raw| raw.trim().parse::<Uuid>().ok()) {
        ensure_owner(&claims, user_id)?;
    }

    let report = state
        .dispatcher
        .dispatch(DispatchRequest {
            user_id: req.user_id,
            lat: req.lat,
            lng: req.lng,
            triggered_by: req.triggered_by,
        })
        .await?;

    Ok(Json(report.to_response()))
}

/// GET /api/sos/history/{user_id}: latest first.
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<HistoryQuery>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    ensure_owner(&claims, user_id)?;

    let db = state.db.clone();
    let limit = query.limit.clamp(1, MAX_HISTORY);
    let mut history = run_blocking(move || {
        let id = user_id.to_string();
        if db.get_user_by_id(&id)?.is_none() {
            return Ok(None);
        }
        db.list_sos_events(&id, Some(limit)).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    history.reverse();
    Ok(Json(HistoryResponse {
        success: true,
        history,
    }))
}

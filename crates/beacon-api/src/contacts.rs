use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use beacon_types::api::{ContactsResponse, UpdateContactsRequest};

use crate::error::ApiError;
use crate::middleware::{Claims, ensure_owner, parse_user_id};
use crate::state::AppState;
use crate::store::run_blocking;

pub async fn get_contacts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    ensure_owner(&claims, user_id)?;

    let db = state.db.clone();
    let user = run_blocking(move || db.get_user(&user_id.to_string()))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ContactsResponse {
        success: true,
        message: None,
        contacts: user.emergency_contacts,
    }))
}

/// Replaces the whole list; order and duplicates are kept as sent.
pub async fn update_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateContactsRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(raw_id), Some(contacts)) = (req.user_id, req.contacts) else {
        return Err(ApiError::BadRequest("Missing data".to_string()));
    };
    let user_id = parse_user_id(&raw_id)?;
    ensure_owner(&claims, user_id)?;

    let db = state.db.clone();
    let stored = contacts.clone();
    let found = run_blocking(move || db.set_contacts(&user_id.to_string(), &stored)).await?;
    if !found {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(%user_id, count = contacts.len(), "emergency contacts replaced");

    Ok(Json(ContactsResponse {
        success: true,
        message: Some("Contacts updated".to_string()),
        contacts,
    }))
}

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, contacts, location, places, sos};

/// All API routes. Static pages, CORS and tracing are layered on by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/signup", post(auth::signup))
        .route("/api/login", post(auth::login))
        .route("/api/nearby-places", get(places::nearby_places))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/api/contacts", post(contacts::update_contacts))
        .route("/api/contacts/{user_id}", get(contacts::get_contacts))
        .route("/api/sos", post(sos::trigger_sos))
        .route("/api/sos/history/{user_id}", get(sos::get_history))
        .route("/api/location", post(location::record_location))
        .route("/api/location/{user_id}", get(location::get_locations))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "success": true, "status": "ok" }))
}

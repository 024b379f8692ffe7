use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use beacon_dispatch::DispatchError;
use beacon_types::api::FailureResponse;
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Valid request the user has to fix their data for, e.g. no contacts yet.
    #[error("{0}")]
    Unprocessable(String),

    /// Detail is logged, never returned.
    #[error("internal error: {detail}")]
    Internal { detail: String, message: String },
}

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
            message: "Server error".to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("rejected request body: {}", rejection.body_text());
        ApiError::BadRequest("Invalid request body".to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!("rejected query string: {}", rejection.body_text());
        ApiError::BadRequest("Invalid query parameters".to_string())
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        let message = err.client_message();
        match err {
            DispatchError::Validation(_) => ApiError::BadRequest(message),
            DispatchError::NotFound => ApiError::NotFound(message),
            DispatchError::NoContacts => ApiError::Unprocessable(message),
            DispatchError::Lookup(_) | DispatchError::NotRecorded { .. } => ApiError::Internal {
                detail: err.to_string(),
                message,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal { detail, message } => {
                error!("{}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(FailureResponse { success: false, message })).into_response()
    }
}

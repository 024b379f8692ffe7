use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use beacon_types::api::{AuthResponse, LoginRequest, SignupRequest};

use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::AppState;
use crate::store::run_blocking;

const MIN_PASSWORD_LEN: usize = 8;

/// Trimmed, non-empty value or `None`.
fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(name), Some(email), Some(phone), Some(password)) = (
        required(req.name),
        required(req.email).map(|e| e.to_lowercase()),
        required(req.phone),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("All fields required".to_string()));
    };

    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user_id = Uuid::new_v4();
    let db = state.db.clone();
    let (n, e, p) = (name.clone(), email.clone(), phone.clone());
    let created = run_blocking(move || {
        // Skip hashing when the email is already taken
        if db.get_user_by_email(&e)?.is_some() {
            return Ok(false);
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| anyhow::anyhow!("password hashing failed: {}", err))?
            .to_string();

        db.create_user(&user_id.to_string(), &n, &e, &p, &password_hash)
    })
    .await?;

    if !created {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let token = create_token(&state.jwt_secret, user_id, &email)
        .map_err(|e| ApiError::internal(format!("token creation failed: {}", e)))?;

    info!(%user_id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user_id,
            name,
            email,
            phone,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (
        required(req.email).map(|e| e.to_lowercase()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("All fields required".to_string()));
    };

    let db = state.db.clone();
    let user = run_blocking(move || db.get_user_by_email(&email))
        .await?
        .ok_or_else(invalid_credentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::internal(format!("stored password hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid_credentials())?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| ApiError::internal(format!("corrupt user id '{}'", user.id)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.email)
        .map_err(|e| ApiError::internal(format!("token creation failed: {}", e)))?;

    Ok(Json(AuthResponse {
        success: true,
        user_id,
        name: user.name,
        email: user.email,
        phone: user.phone,
        token,
    }))
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".to_string())
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

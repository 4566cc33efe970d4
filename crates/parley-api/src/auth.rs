use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use parley_db::Database;
use parley_types::api::{LoginRequest, LoginResponse, SignupRequest, SignupResponse};

use crate::error::{ApiError, join_error};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
}

/// Create an account. No input validation: whatever the client sends is
/// hashed and stored as-is, and any store failure (a taken username
/// included) surfaces as a generic 500.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let password_hash = hash_password(&req.password)?;
    let id = Uuid::new_v4().to_string();

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        db.create_user(&id, &req.username, &req.firstname, &req.lastname, &password_hash)
    })
    .await
    .map_err(join_error)??;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".into(),
        }),
    ))
}

/// Check the password and return the public profile fields. No session or
/// token is issued; later actions are trusted client-side.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let db = state.db.clone();
    let username = req.username.clone();
    let user = tokio::task::spawn_blocking(move || db.get_user_by_username(&username))
        .await
        .map_err(join_error)??
        .ok_or(ApiError::UserNotFound)?;

    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidPassword)?;

    Ok(Json(LoginResponse {
        username: user.username,
        firstname: user.firstname,
        lastname: user.lastname,
    }))
}

/// Argon2id with default parameters and a fresh salt per hash.
fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

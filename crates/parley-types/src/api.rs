use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public profile fields only; the password hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
}

// -- Message history --

#[derive(Debug, Serialize)]
pub struct GroupMessageResponse {
    pub from_user: String,
    pub room: String,
    pub message: String,
    pub date_sent: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PrivateMessageResponse {
    pub from_user: String,
    pub to_user: String,
    pub message: String,
    pub date_sent: DateTime<Utc>,
}

// -- Errors --

/// Every failed HTTP response carries this body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

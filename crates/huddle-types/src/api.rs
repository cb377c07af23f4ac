use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::User;

// -- Session tokens --

/// Session token claims. Shared by the API (issue + verify) and the client
/// (which only ever treats the token as opaque).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

/// Identity extracted from a verified token. Handlers take the author of a
/// message from here, never from the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            email: claims.email,
        }
    }
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 3, max = 32, message = "Username must be between 3 and 32 characters"))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Returned by both register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// -- Messages --

/// Body of `POST /api/groups/{id}/messages`. Any extra fields a client sends
/// (such as a claimed username) are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
}

// -- Errors --

/// JSON body carried by every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

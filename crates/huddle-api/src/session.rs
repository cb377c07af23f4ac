use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use huddle_types::api::{Claims, Principal};
use huddle_types::models::User;

use crate::error::ApiError;
use crate::state::AppState;

/// Issue a signed session token for `user`, valid for `ttl` from now.
pub fn issue_token(secret: &str, ttl: chrono::Duration, user: &User) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };
    sign(secret, &claims)
}

pub fn sign(secret: &str, claims: &Claims) -> anyhow::Result<String> {
    let token = encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Check signature and expiry and return the embedded identity. Pure; no
/// store access, so it runs freely in parallel across requests.
pub fn verify_token(secret: &str, token: &str) -> Result<Principal, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            tracing::debug!("Rejected session token: {}", e);
            ApiError::Unauthorized("Token is not valid".into())
        })?;

    Ok(data.claims.into())
}

/// The verified caller of a protected endpoint. Extracting it fails closed
/// with 401 when the `Authorization: Bearer` token is absent or invalid.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Token is not valid".into()))?;

        verify_token(&state.jwt_secret, token).map(AuthUser)
    }
}

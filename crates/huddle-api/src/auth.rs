use std::sync::LazyLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use rand_core::OsRng;
use tracing::{error, info};

use huddle_types::api::{AuthResponse, LoginRequest, RegisterRequest};
use huddle_types::models::User;

use crate::error::ApiError;
use crate::rows;
use crate::session::{AuthUser, issue_token};
use crate::state::{AppState, run_store};
use crate::validate;

/// POST /api/auth/register
///
/// validate → check uniqueness → hash → insert → issue token. Each step
/// short-circuits; nothing is written unless every earlier step passed.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = payload?;
    validate::registration(&req)?;

    let RegisterRequest { username, email, password } = req;

    let (taken_email, taken_name) = (email.clone(), username.clone());
    let existing = run_store(&state, move |db| db.find_user_conflict(&taken_email, &taken_name)).await?;
    if existing.is_some() {
        return Err(ApiError::Conflict);
    }

    let password_hash = hash_password(password).await?;

    let row = run_store(&state, move |db| match db.create_user(&username, &email, &password_hash) {
        Ok(row) => Ok(Ok(row)),
        // Lost a race with a concurrent registration for the same name/email.
        Err(e) if huddle_db::is_unique_violation(&e) => Ok(Err(ApiError::Conflict)),
        Err(e) => Err(e),
    })
    .await??;

    let user = rows::user(row);
    let token = token_for(&state, &user)?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok(Json(AuthResponse { token, user }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = payload?;
    validate::login(&req)?;

    let email = req.email.clone();
    let Some(row) = run_store(&state, move |db| db.get_user_by_email(&email)).await? else {
        // Pay for a verify anyway so response time does not reveal whether
        // the account exists.
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = verify_password(req.password, dummy.to_string()).await;
        }
        return Err(ApiError::InvalidCredentials);
    };

    verify_password(req.password, row.password.clone()).await?;

    let user = rows::user(row);
    let token = token_for(&state, &user)?;

    Ok(Json(AuthResponse { token, user }))
}

/// GET /api/auth/me: the token's user, re-read from the store.
pub async fn me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<User>, ApiError> {
    let id = principal.id;
    let row = run_store(&state, move |db| db.get_user_by_id(id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".into()))?;

    Ok(Json(rows::user(row)))
}

fn token_for(state: &AppState, user: &User) -> Result<String, ApiError> {
    issue_token(&state.jwt_secret, state.token_ttl, user).map_err(|e| {
        error!("Token signing failed: {}", e);
        ApiError::Store
    })
}

/// Hash with the same parameters as real accounts, verified against on logins
/// for unknown emails. No password can match it in practice.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    match hash_blocking("huddle-login-timing-placeholder") {
        Ok(hash) => Some(hash),
        Err(e) => {
            error!("Could not prepare login timing hash: {}", e);
            None
        }
    }
});

/// Build the dummy login hash now instead of on the first unknown-email
/// login, which would otherwise pay for it twice.
pub fn prime_login_timing() {
    LazyLock::force(&DUMMY_HASH);
}

fn hash_blocking(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// Argon2id with a fresh random salt, off the async runtime.
async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(ApiError::store)?
        .map_err(ApiError::store)
}

async fn verify_password(password: String, stored_hash: String) -> Result<(), ApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash).map_err(ApiError::store)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| ApiError::InvalidCredentials)
    })
    .await
    .map_err(ApiError::store)?
}

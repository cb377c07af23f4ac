//! Field checks applied at the boundary, before any store access.

use validator::{Validate, ValidationErrors};

use huddle_types::api::{LoginRequest, RegisterRequest};

use crate::error::ApiError;

pub fn registration(req: &RegisterRequest) -> Result<(), ApiError> {
    req.validate()
        .map_err(|errors| first_error(&errors, &["username", "email", "password"]))?;

    if req.username.trim() != req.username {
        return Err(ApiError::validation("Username must not start or end with whitespace"));
    }
    Ok(())
}

pub fn login(req: &LoginRequest) -> Result<(), ApiError> {
    req.validate()
        .map_err(|errors| first_error(&errors, &["email", "password"]))
}

/// Returns the body unchanged when it has visible content.
pub fn message_body(body: &str) -> Result<&str, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::validation("Message is required"));
    }
    Ok(body)
}

/// Report one failure, picking fields in form order so the message a client
/// sees does not depend on hash map iteration.
fn first_error(errors: &ValidationErrors, order: &[&str]) -> ApiError {
    let fields = errors.field_errors();
    let message = order
        .iter()
        .filter_map(|field| fields.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref())
        .map(|msg| msg.to_string())
        .unwrap_or_else(|| "Invalid input".to_string());
    ApiError::Validation(message)
}

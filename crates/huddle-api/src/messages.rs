use axum::{
    Json,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    http::StatusCode,
};
use tracing::debug;

use huddle_types::api::SendMessageRequest;
use huddle_types::models::Message;

use crate::error::ApiError;
use crate::rows;
use crate::session::AuthUser;
use crate::state::{AppState, run_store};
use crate::validate;

/// GET /api/groups/{group_id}/messages
///
/// Public. An unknown group simply has no messages.
pub async fn get_messages(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let Path(group_id) = path?;
    let history = run_store(&state, move |db| db.get_messages(group_id)).await?;
    Ok(Json(history.into_iter().map(rows::message).collect()))
}

/// POST /api/groups/{group_id}/messages
///
/// All authenticated users can post to every group. The author is always the
/// token's principal; nothing in the body can override it. The author name
/// is copied onto the row so later renames leave history untouched.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let Path(group_id) = path?;
    let Json(req) = payload?;
    let body = validate::message_body(&req.message)?.to_owned();

    let row = run_store(&state, move |db| {
        if db.get_group(group_id)?.is_none() {
            return Ok(None);
        }
        db.insert_message(group_id, Some(principal.id), &principal.username, &body, None)
            .map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::validation("Group not found"))?;

    debug!("Message {} posted to group {} by {}", row.id, group_id, row.username.as_deref().unwrap_or("?"));
    Ok((StatusCode::CREATED, Json(rows::message(row))))
}

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};

use huddle_types::models::Group;

use crate::error::ApiError;
use crate::rows;
use crate::state::{AppState, run_store};

/// GET /api/groups, newest first.
pub async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<Group>>, ApiError> {
    let listed = run_store(&state, |db| db.list_groups()).await?;
    Ok(Json(listed.into_iter().map(rows::group).collect()))
}

/// GET /api/groups/{group_id}. Unknown ids yield `null` rather than 404.
pub async fn get_group(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Option<Group>>, ApiError> {
    let Path(group_id) = path?;
    let row = run_store(&state, move |db| db.get_group(group_id)).await?;
    Ok(Json(row.map(rows::group)))
}

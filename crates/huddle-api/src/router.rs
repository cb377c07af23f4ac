use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, groups, messages};

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/groups", get(groups::list_groups))
        .route("/api/groups/{group_id}", get(groups::get_group))
        .route(
            "/api/groups/{group_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use huddle_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// Upper bound on a single store call.
    pub store_timeout: Duration,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>) -> Self {
        Self {
            db,
            jwt_secret: jwt_secret.into(),
            token_ttl: chrono::Duration::hours(24),
            store_timeout: Duration::from_secs(5),
        }
    }
}

/// Run a store call on the blocking pool, bounded by the store timeout.
/// Any failure comes back as [`ApiError::Store`].
pub async fn run_store<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.clone();
    let task = tokio::task::spawn_blocking(move || f(&db.db));

    match tokio::time::timeout(state.store_timeout, task).await {
        Ok(Ok(result)) => result.map_err(ApiError::store),
        Ok(Err(e)) => {
            error!("spawn_blocking join error: {}", e);
            Err(ApiError::Store)
        }
        Err(_) => {
            error!("Store call exceeded {:?}", state.store_timeout);
            Err(ApiError::Store)
        }
    }
}

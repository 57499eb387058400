use std::sync::Arc;

use tracing::error;

use hopeful_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Shared secret of the identity provider that signs session tokens.
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret: jwt_secret.into(),
        })
    }
}

/// Run a store call on the blocking pool, off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> hopeful_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    try_with_db(state, f).await?.map_err(ApiError::from)
}

/// Like `with_db`, but hands back the store error untouched so the caller
/// can decide how to degrade.
pub async fn try_with_db<F, T>(state: &AppState, f: F) -> Result<hopeful_db::Result<T>, ApiError>
where
    F: FnOnce(&Database) -> hopeful_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("store task failed".into())
        })
}

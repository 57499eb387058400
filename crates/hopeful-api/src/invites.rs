use axum::{
    Extension, Json,
    extract::{Path, State},
};

use hopeful_types::models::{Group, GroupMember};

use crate::error::ApiError;
use crate::middleware::Session;
use crate::state::{AppState, with_db};

/// GET /invites/{code}: codes are matched case-insensitively.
pub async fn resolve_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(_session): Extension<Session>,
) -> Result<Json<Group>, ApiError> {
    find_by_code(&state, code).await.map(Json)
}

/// POST /invites/{code}/join
pub async fn join_by_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(session): Extension<Session>,
) -> Result<Json<GroupMember>, ApiError> {
    let group = find_by_code(&state, code).await?;
    let user_id = session.user_id;
    with_db(&state, move |db| db.join_group(group.id, user_id)).await.map(Json)
}

async fn find_by_code(state: &AppState, code: String) -> Result<Group, ApiError> {
    with_db(state, move |db| db.get_group_by_invite_code(&code))
        .await?
        .ok_or_else(|| ApiError::NotFound("invite code not found".into()))
}

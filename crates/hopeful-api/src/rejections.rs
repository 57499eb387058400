use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use hopeful_db::NewRejection;
use hopeful_types::api::CreateRejectionRequest;

use crate::error::ApiError;
use crate::middleware::Session;
use crate::state::{AppState, with_db};

/// POST /rejections: log a rejection worth one point.
pub async fn create_rejection(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateRejectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.user_id;
    let group_id = target_group(&state, user_id, req.group_id).await?;

    let is_member = with_db(&state, move |db| db.get_membership(group_id, user_id))
        .await?
        .is_some_and(|m| m.is_active);
    if !is_member {
        return Err(ApiError::Forbidden("not an active member of this group".into()));
    }

    let new = NewRejection::new(user_id, group_id, req.description);
    let rejection = with_db(&state, move |db| db.create_rejection(&new)).await?;

    info!(
        "User {} logged rejection {} in group {}",
        user_id, rejection.id, rejection.group_id
    );
    Ok((StatusCode::CREATED, Json(rejection)))
}

/// DELETE /rejections/{rejection_id}: only the owner may delete.
pub async fn delete_rejection(
    State(state): State<AppState>,
    Path(rejection_id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> Result<StatusCode, ApiError> {
    let user_id = session.user_id;
    let deleted = with_db(&state, move |db| db.delete_rejection(rejection_id, user_id)).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("rejection not found".into()))
    }
}

/// The group a rejection is logged in: the one named in the request, else the
/// caller's active group.
async fn target_group(state: &AppState, user_id: Uuid, requested: Option<Uuid>) -> Result<Uuid, ApiError> {
    if let Some(group_id) = requested {
        return Ok(group_id);
    }
    with_db(state, move |db| db.get_active_group(user_id))
        .await?
        .map(|group| group.id)
        .ok_or_else(|| ApiError::Validation("no active group; pass group_id".into()))
}

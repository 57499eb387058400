use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use hopeful_types::api::{CreateGroupRequest, RejectionListQuery};
use hopeful_types::models::{Group, GroupMember, MemberWithUser, MembershipWithGroup, RejectionWithUser};

use crate::error::ApiError;
use crate::middleware::Session;
use crate::state::{AppState, with_db};

const MAX_FEED_LIMIT: u32 = 100;

/// POST /groups: the creator becomes an active member.
pub async fn create_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.user_id;
    let group = with_db(&state, move |db| db.create_group(&req.name, user_id)).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /groups: every membership the caller holds.
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<MembershipWithGroup>>, ApiError> {
    let user_id = session.user_id;
    with_db(&state, move |db| db.get_user_groups(user_id)).await.map(Json)
}

/// GET /groups/active
pub async fn active_group(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Group>, ApiError> {
    let user_id = session.user_id;
    with_db(&state, move |db| db.get_active_group(user_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no active group".into()))
}

/// GET /groups/{group_id}
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(_session): Extension<Session>,
) -> Result<Json<Group>, ApiError> {
    require_group(&state, group_id).await.map(Json)
}

/// POST /groups/{group_id}/join: idempotent; reactivates a past membership.
pub async fn join_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> Result<Json<GroupMember>, ApiError> {
    require_group(&state, group_id).await?;
    let user_id = session.user_id;
    with_db(&state, move |db| db.join_group(group_id, user_id)).await.map(Json)
}

/// POST /groups/{group_id}/leave
pub async fn leave_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> Result<Json<GroupMember>, ApiError> {
    let user_id = session.user_id;
    with_db(&state, move |db| db.leave_group(group_id, user_id)).await.map(Json)
}

/// GET /groups/{group_id}/members: active members only.
pub async fn list_members(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(_session): Extension<Session>,
) -> Result<Json<Vec<MemberWithUser>>, ApiError> {
    require_group(&state, group_id).await?;
    with_db(&state, move |db| db.get_group_members(group_id)).await.map(Json)
}

/// GET /groups/{group_id}/rejections: newest first.
pub async fn list_rejections(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<RejectionListQuery>,
    Extension(_session): Extension<Session>,
) -> Result<Json<Vec<RejectionWithUser>>, ApiError> {
    require_group(&state, group_id).await?;
    let limit = query.limit.min(MAX_FEED_LIMIT);
    with_db(&state, move |db| db.get_rejections(group_id, limit)).await.map(Json)
}

pub(crate) async fn require_group(state: &AppState, group_id: Uuid) -> Result<Group, ApiError> {
    with_db(state, move |db| db.get_group(group_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("group not found".into()))
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use hopeful_types::api::{OnboardRequest, UpdateAvatarRequest};
use hopeful_types::models::User;

use crate::error::ApiError;
use crate::middleware::Session;
use crate::state::{AppState, with_db};

/// POST /users/me: create the caller's profile. The username defaults to
/// the token's email claim.
pub async fn onboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<OnboardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = session.user_id;

    let user = with_db(&state, move |db| match req.username {
        Some(username) => db.create_user(user_id, Some(&username)),
        None => db.create_user_from_email(user_id, session.email.as_deref()),
    })
    .await?;
    info!("Onboarded user {} as {}", user.id, user.display_name());

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/me
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<User>, ApiError> {
    get_profile(&state, session.user_id).await.map(Json)
}

/// GET /users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_session): Extension<Session>,
) -> Result<Json<User>, ApiError> {
    get_profile(&state, user_id).await.map(Json)
}

/// PUT /users/me/avatar: the image itself lives in object storage; we only
/// keep its public URL.
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<UpdateAvatarRequest>,
) -> Result<Json<User>, ApiError> {
    let user_id = session.user_id;
    let user = with_db(&state, move |db| db.update_avatar(user_id, &req.avatar_url)).await?;
    Ok(Json(user))
}

async fn get_profile(state: &AppState, user_id: Uuid) -> Result<User, ApiError> {
    with_db(state, move |db| db.get_user(user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))
}

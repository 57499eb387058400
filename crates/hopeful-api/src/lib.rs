pub mod error;
pub mod groups;
pub mod invites;
pub mod leaderboard;
pub mod middleware;
pub mod rejections;
pub mod state;
pub mod users;

use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

use crate::middleware::require_session;
use crate::state::AppState;

/// All HTTP routes. Everything except `/health` requires a session token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/users/me", post(users::onboard).get(users::me))
        .route("/users/me/avatar", put(users::update_avatar))
        .route("/users/{user_id}", get(users::get_user))
        .route("/groups", post(groups::create_group).get(groups::list_groups))
        .route("/groups/active", get(groups::active_group))
        .route("/groups/{group_id}", get(groups::get_group))
        .route("/groups/{group_id}/join", post(groups::join_group))
        .route("/groups/{group_id}/leave", post(groups::leave_group))
        .route("/groups/{group_id}/members", get(groups::list_members))
        .route("/groups/{group_id}/rejections", get(groups::list_rejections))
        .route("/invites/{code}", get(invites::resolve_invite))
        .route("/invites/{code}/join", post(invites::join_by_invite))
        .route("/rejections", post(rejections::create_rejection))
        .route("/rejections/{rejection_id}", delete(rejections::delete_rejection))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .route("/leaderboard/active", get(leaderboard::get_active_leaderboard))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_session))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

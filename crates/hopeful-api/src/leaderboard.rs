use axum::{
    Extension, Json,
    extract::{Query, State},
};
use tracing::warn;
use uuid::Uuid;

use hopeful_types::api::{ActiveLeaderboardQuery, LeaderboardQuery, LeaderboardResponse};
use hopeful_types::leaderboard::{LeaderboardScope, Timeframe};

use crate::error::ApiError;
use crate::middleware::Session;
use crate::state::{AppState, try_with_db};

const DEGRADED_MESSAGE: &str = "could not load leaderboard";

/// GET /leaderboard?group_id=&timeframe=: no `group_id` ranks every group.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
    Extension(_session): Extension<Session>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    load(&state, query.group_id.into(), query.timeframe).await.map(Json)
}

/// GET /leaderboard/active?timeframe=: the caller's active group, or every
/// group when they have none.
pub async fn get_active_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<ActiveLeaderboardQuery>,
    Extension(session): Extension<Session>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let user_id = session.user_id;
    let scope: LeaderboardScope = match try_with_db(&state, move |db| db.get_active_group(user_id)).await? {
        Ok(group) => group.map(|g| g.id).into(),
        Err(e) => {
            warn!("Active group lookup failed for {}: {}", user_id, e);
            return Ok(Json(degraded(None, query.timeframe)));
        }
    };
    load(&state, scope, query.timeframe).await.map(Json)
}

/// Store failures are not surfaced as errors here; the client still gets a
/// renderable board.
async fn load(
    state: &AppState,
    scope: LeaderboardScope,
    timeframe: Timeframe,
) -> Result<LeaderboardResponse, ApiError> {
    let group_id = scope.group_id();
    match try_with_db(state, move |db| db.get_leaderboard(scope, timeframe)).await? {
        Ok(entries) => Ok(LeaderboardResponse {
            group_id,
            timeframe,
            entries,
            degraded: false,
            message: None,
        }),
        Err(e) => {
            warn!("Leaderboard {:?}/{} failed: {}", scope, timeframe, e);
            Ok(degraded(group_id, timeframe))
        }
    }
}

fn degraded(group_id: Option<Uuid>, timeframe: Timeframe) -> LeaderboardResponse {
    LeaderboardResponse {
        group_id,
        timeframe,
        entries: Vec::new(),
        degraded: true,
        message: Some(DEGRADED_MESSAGE.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_response_is_empty_and_flagged() {
        let body = degraded(None, Timeframe::Weekly);
        assert!(body.entries.is_empty());
        assert!(body.degraded);
        assert_eq!(body.message.as_deref(), Some("could not load leaderboard"));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["timeframe"], "weekly");
        assert_eq!(json["degraded"], true);
    }
}

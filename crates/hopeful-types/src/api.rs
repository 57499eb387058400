use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::leaderboard::{LeaderboardEntry, Timeframe};

// -- Session tokens --

/// Claims carried by the identity provider's bearer tokens.
/// `sub` is the user id the rest of the system keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OnboardRequest {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAvatarRequest {
    pub avatar_url: String,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
}

// -- Rejections --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRejectionRequest {
    /// Falls back to the caller's active group when omitted.
    #[serde(default)]
    pub group_id: Option<Uuid>,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectionListQuery {
    #[serde(default = "default_rejection_limit")]
    pub limit: u32,
}

fn default_rejection_limit() -> u32 {
    20
}

// -- Leaderboard --

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub timeframe: Timeframe,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActiveLeaderboardQuery {
    #[serde(default)]
    pub timeframe: Timeframe,
}

/// Leaderboard payload. A failed computation still renders: `entries` is
/// empty, `degraded` is set and `message` says why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub group_id: Option<Uuid>,
    pub timeframe: Timeframe,
    pub entries: Vec<LeaderboardEntry>,
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shown wherever a user has not picked a username yet.
pub const ANONYMOUS: &str = "Anonymous";

/// Upper bound on a rejection description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> &str {
        display_name(self.username.as_deref())
    }
}

/// Username fallback shared by every view that renders a user.
pub fn display_name(username: Option<&str>) -> &str {
    match username {
        Some(name) if !name.trim().is_empty() => name,
        _ => ANONYMOUS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub description: String,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

// -- Projections --

/// A rejection joined with its author's profile, for group feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionWithUser {
    #[serde(flatten)]
    pub rejection: Rejection,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// A membership joined with the group it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipWithGroup {
    #[serde(flatten)]
    pub membership: GroupMember,
    pub group: Group,
}

/// A membership joined with the member's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberWithUser {
    #[serde(flatten)]
    pub membership: GroupMember,
    pub user: User,
}

//! Database row types. These map directly to SQLite rows and are converted
//! into `hopeful-types` models at the store boundary, where ids and
//! timestamps are checked.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use hopeful_types::models::{Group, GroupMember, Rejection, User};

use crate::error::DbError;

/// Timestamps are stored as fixed-width RFC 3339 in UTC so that string
/// comparison in SQL matches chronological order.
pub fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_ts(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DbError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

pub fn decode_id(raw: &str) -> Result<Uuid, DbError> {
    raw.parse()
        .map_err(|e| DbError::Corrupt(format!("id '{}': {}", raw, e)))
}

pub struct UserRow {
    pub id: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub const COLUMNS: &'static str = "id, username, avatar_url, created_at";

    /// Reads the four `COLUMNS` starting at `offset`.
    pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            username: row.get(offset + 1)?,
            avatar_url: row.get(offset + 2)?,
            created_at: row.get(offset + 3)?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: decode_id(&row.id)?,
            username: row.username,
            avatar_url: row.avatar_url,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}

pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub invite_code: String,
    pub created_by: String,
    pub created_at: String,
}

impl GroupRow {
    pub const COLUMNS: &'static str = "id, name, invite_code, created_by, created_at";

    pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            invite_code: row.get(offset + 2)?,
            created_by: row.get(offset + 3)?,
            created_at: row.get(offset + 4)?,
        })
    }
}

impl TryFrom<GroupRow> for Group {
    type Error = DbError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        Ok(Group {
            id: decode_id(&row.id)?,
            name: row.name,
            invite_code: row.invite_code,
            created_by: decode_id(&row.created_by)?,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}

pub struct MemberRow {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub is_active: bool,
    pub joined_at: String,
}

impl MemberRow {
    pub const COLUMNS: &'static str = "id, group_id, user_id, is_active, joined_at";

    pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            group_id: row.get(offset + 1)?,
            user_id: row.get(offset + 2)?,
            is_active: row.get(offset + 3)?,
            joined_at: row.get(offset + 4)?,
        })
    }
}

impl TryFrom<MemberRow> for GroupMember {
    type Error = DbError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(GroupMember {
            id: decode_id(&row.id)?,
            group_id: decode_id(&row.group_id)?,
            user_id: decode_id(&row.user_id)?,
            is_active: row.is_active,
            joined_at: decode_ts(&row.joined_at)?,
        })
    }
}

pub struct RejectionRow {
    pub id: String,
    pub user_id: String,
    pub group_id: String,
    pub description: String,
    pub points: i64,
    pub created_at: String,
}

impl RejectionRow {
    pub const COLUMNS: &'static str = "id, user_id, group_id, description, points, created_at";

    pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            user_id: row.get(offset + 1)?,
            group_id: row.get(offset + 2)?,
            description: row.get(offset + 3)?,
            points: row.get(offset + 4)?,
            created_at: row.get(offset + 5)?,
        })
    }
}

impl TryFrom<RejectionRow> for Rejection {
    type Error = DbError;

    fn try_from(row: RejectionRow) -> Result<Self, Self::Error> {
        Ok(Rejection {
            id: decode_id(&row.id)?,
            user_id: decode_id(&row.user_id)?,
            group_id: decode_id(&row.group_id)?,
            description: row.description,
            points: row.points,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}

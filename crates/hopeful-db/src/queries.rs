use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use hopeful_types::models::{
    Group, GroupMember, MAX_DESCRIPTION_CHARS, MemberWithUser, MembershipWithGroup, Rejection,
    RejectionWithUser, User,
};

use crate::Database;
use crate::error::{DbError, Result, is_foreign_key_violation, is_primary_key_violation, is_unique_violation};
use crate::invite::{MAX_INVITE_CODE_ATTEMPTS, generate_invite_code, normalize_invite_code};
use crate::models::{GroupRow, MemberRow, RejectionRow, UserRow, encode_ts};

pub const MAX_USERNAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 254;
pub const MAX_GROUP_NAME_CHARS: usize = 100;
pub const MAX_AVATAR_URL_CHARS: usize = 2048;

/// Input for a new rejection. `new` fills in the creation defaults; the
/// fields stay public so imports and fixtures can backdate or weight rows.
#[derive(Debug, Clone)]
pub struct NewRejection {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub description: String,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

impl NewRejection {
    pub fn new(user_id: Uuid, group_id: Uuid, description: impl Into<String>) -> Self {
        Self {
            user_id,
            group_id,
            description: description.into(),
            points: 1,
            created_at: Utc::now(),
        }
    }
}

impl Database {
    // -- Users --

    /// Create the profile for an identity-provider user id.
    /// A blank username is stored as NULL.
    pub fn create_user(&self, id: Uuid, username: Option<&str>) -> Result<User> {
        let username = match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(name) => Some(validate_bounded("username", name, MAX_USERNAME_CHARS)?),
            None => None,
        };
        self.insert_user(id, username)
    }

    /// Create the profile with the sign-in email as its username. Emails are
    /// held to the address limit rather than `MAX_USERNAME_CHARS`.
    pub fn create_user_from_email(&self, id: Uuid, email: Option<&str>) -> Result<User> {
        let username = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => Some(validate_bounded("email", email, MAX_EMAIL_CHARS)?),
            None => None,
        };
        self.insert_user(id, username)
    }

    fn insert_user(&self, id: Uuid, username: Option<String>) -> Result<User> {
        let created_at = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, avatar_url, created_at) VALUES (?1, ?2, NULL, ?3)",
                params![id.to_string(), username, encode_ts(created_at)],
            )
            .map_err(|e| {
                if is_primary_key_violation(&e) || is_unique_violation(&e) {
                    DbError::Conflict(format!("user {} already exists", id))
                } else {
                    e.into()
                }
            })?;
            require(query_user(conn, id)?, "user")
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Point the user's avatar at an object-storage URL.
    pub fn update_avatar(&self, id: Uuid, avatar_url: &str) -> Result<User> {
        let avatar_url = validate_avatar_url(avatar_url)?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET avatar_url = ?1 WHERE id = ?2",
                params![avatar_url, id.to_string()],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("user"));
            }
            require(query_user(conn, id)?, "user")
        })
    }

    // -- Groups --

    /// Create a group with a fresh invite code and enroll its creator as an
    /// active member.
    pub fn create_group(&self, name: &str, created_by: Uuid) -> Result<Group> {
        self.create_group_with(name, created_by, generate_invite_code)
    }

    /// `create_group` with a caller-supplied code generator. Codes that
    /// collide with an existing group are regenerated, up to
    /// `MAX_INVITE_CODE_ATTEMPTS` tries in total.
    pub fn create_group_with<F>(&self, name: &str, created_by: Uuid, mut next_code: F) -> Result<Group>
    where
        F: FnMut() -> String,
    {
        let name = validate_bounded("name", name.trim(), MAX_GROUP_NAME_CHARS)?;
        let group_id = Uuid::new_v4();
        let now = encode_ts(Utc::now());

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut inserted = false;
            for attempt in 1..=MAX_INVITE_CODE_ATTEMPTS {
                let code = normalize_invite_code(&next_code());
                let result = tx.execute(
                    "INSERT INTO groups (id, name, invite_code, created_by, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![group_id.to_string(), name, code, created_by.to_string(), now],
                );
                match result {
                    Ok(_) => {
                        inserted = true;
                        break;
                    }
                    Err(e) if is_unique_violation(&e) => {
                        warn!("Invite code collision on attempt {}/{}", attempt, MAX_INVITE_CODE_ATTEMPTS);
                    }
                    Err(e) if is_foreign_key_violation(&e) => return Err(DbError::NotFound("user")),
                    Err(e) => return Err(e.into()),
                }
            }
            if !inserted {
                return Err(DbError::InviteCodeExhausted(MAX_INVITE_CODE_ATTEMPTS));
            }

            upsert_membership(&tx, group_id, created_by, &now)?;
            let group = require(query_group(&tx, "id", &group_id.to_string())?, "group")?;
            tx.commit()?;

            info!("Group {} ({}) created by {}", group.id, group.invite_code, created_by);
            Ok(group)
        })
    }

    pub fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
        self.with_conn(|conn| query_group(conn, "id", &id.to_string()))
    }

    /// Resolve an invite code. Unknown codes are `Ok(None)`.
    pub fn get_group_by_invite_code(&self, code: &str) -> Result<Option<Group>> {
        let code = normalize_invite_code(code);
        self.with_conn(|conn| query_group(conn, "invite_code", &code))
    }

    /// Every membership the user holds, active or not, newest first.
    pub fn get_user_groups(&self, user_id: Uuid) -> Result<Vec<MembershipWithGroup>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.group_id, m.user_id, m.is_active, m.joined_at,
                        g.id, g.name, g.invite_code, g.created_by, g.created_at
                 FROM group_members m
                 JOIN groups g ON g.id = m.group_id
                 WHERE m.user_id = ?1
                 ORDER BY m.joined_at DESC, m.id",
            )?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok((MemberRow::from_row(row, 0)?, GroupRow::from_row(row, 5)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(m, g)| {
                    Ok(MembershipWithGroup {
                        membership: m.try_into()?,
                        group: g.try_into()?,
                    })
                })
                .collect()
        })
    }

    /// The group used for quick entry: the most recently joined active
    /// membership. Exclusivity of "active" is not enforced here, so the
    /// ordering keeps the answer deterministic when several are active.
    pub fn get_active_group(&self, user_id: Uuid) -> Result<Option<Group>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT g.id, g.name, g.invite_code, g.created_by, g.created_at
                     FROM group_members m
                     JOIN groups g ON g.id = m.group_id
                     WHERE m.user_id = ?1 AND m.is_active = 1
                     ORDER BY m.joined_at DESC, m.id
                     LIMIT 1",
                    [user_id.to_string()],
                    |row| GroupRow::from_row(row, 0),
                )
                .optional()?;
            row.map(Group::try_from).transpose()
        })
    }

    // -- Memberships --

    /// Join a group, or reactivate an existing membership. Never creates a
    /// second row for the same (group, user). Reactivation stamps a fresh
    /// `joined_at`, so a rejoined group becomes the active one.
    pub fn join_group(&self, group_id: Uuid, user_id: Uuid) -> Result<GroupMember> {
        let now = encode_ts(Utc::now());
        self.with_conn(|conn| {
            let member = upsert_membership(conn, group_id, user_id, &now)?;
            debug!("User {} joined group {}", user_id, group_id);
            Ok(member)
        })
    }

    /// Deactivate a membership. The row is kept so that rejoining restores it.
    pub fn leave_group(&self, group_id: Uuid, user_id: Uuid) -> Result<GroupMember> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE group_members SET is_active = 0 WHERE group_id = ?1 AND user_id = ?2",
                params![group_id.to_string(), user_id.to_string()],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("membership"));
            }
            require(query_membership(conn, group_id, user_id)?, "membership")
        })
    }

    pub fn get_membership(&self, group_id: Uuid, user_id: Uuid) -> Result<Option<GroupMember>> {
        self.with_conn(|conn| query_membership(conn, group_id, user_id))
    }

    /// Active members of a group with their profiles, in join order.
    pub fn get_group_members(&self, group_id: Uuid) -> Result<Vec<MemberWithUser>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.group_id, m.user_id, m.is_active, m.joined_at,
                        u.id, u.username, u.avatar_url, u.created_at
                 FROM group_members m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.group_id = ?1 AND m.is_active = 1
                 ORDER BY m.joined_at, m.id",
            )?;
            let rows = stmt
                .query_map([group_id.to_string()], |row| {
                    Ok((MemberRow::from_row(row, 0)?, UserRow::from_row(row, 5)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(m, u)| {
                    Ok(MemberWithUser {
                        membership: m.try_into()?,
                        user: u.try_into()?,
                    })
                })
                .collect()
        })
    }

    // -- Rejections --

    pub fn create_rejection(&self, new: &NewRejection) -> Result<Rejection> {
        let description = validate_description(&new.description)?;
        let id = Uuid::new_v4();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO rejections (id, user_id, group_id, description, points, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    new.user_id.to_string(),
                    new.group_id.to_string(),
                    description,
                    new.points,
                    encode_ts(new.created_at),
                ],
            )
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DbError::NotFound("user or group")
                } else {
                    e.into()
                }
            })?;
            require(query_rejection(conn, id)?, "rejection")
        })
    }

    pub fn get_rejection(&self, id: Uuid) -> Result<Option<Rejection>> {
        self.with_conn(|conn| query_rejection(conn, id))
    }

    /// Most recent rejections in a group with their authors.
    pub fn get_rejections(&self, group_id: Uuid, limit: u32) -> Result<Vec<RejectionWithUser>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.user_id, r.group_id, r.description, r.points, r.created_at,
                        u.username, u.avatar_url
                 FROM rejections r
                 LEFT JOIN users u ON u.id = r.user_id
                 WHERE r.group_id = ?1
                 ORDER BY r.created_at DESC, r.id
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![group_id.to_string(), limit], |row| {
                    Ok((
                        RejectionRow::from_row(row, 0)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(r, username, avatar_url)| {
                    Ok(RejectionWithUser {
                        rejection: r.try_into()?,
                        username,
                        avatar_url,
                    })
                })
                .collect()
        })
    }

    /// Delete a rejection owned by `user_id`. Returns false when there was
    /// nothing of theirs to delete.
    pub fn delete_rejection(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM rejections WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Re-weight a rejection. Points default to 1 at creation and are only
    /// ever changed through here.
    pub fn set_rejection_points(&self, id: Uuid, points: i64) -> Result<Rejection> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE rejections SET points = ?1 WHERE id = ?2",
                params![points, id.to_string()],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound("rejection"));
            }
            require(query_rejection(conn, id)?, "rejection")
        })
    }
}

// -- Validation --

pub fn validate_description(raw: &str) -> Result<String> {
    validate_bounded("description", raw.trim(), MAX_DESCRIPTION_CHARS)
}

pub fn validate_avatar_url(raw: &str) -> Result<String> {
    let url = validate_bounded("avatar_url", raw.trim(), MAX_AVATAR_URL_CHARS)?;
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(DbError::invalid("avatar_url", "must be an http(s) URL"));
    }
    Ok(url)
}

fn validate_bounded(field: &'static str, value: &str, max_chars: usize) -> Result<String> {
    if value.is_empty() {
        return Err(DbError::invalid(field, "must not be empty"));
    }
    let len = value.chars().count();
    if len > max_chars {
        return Err(DbError::invalid(field, format!("{} characters, at most {} allowed", len, max_chars)));
    }
    Ok(value.to_string())
}

// -- Row helpers --

fn require<T>(value: Option<T>, what: &'static str) -> Result<T> {
    value.ok_or(DbError::NotFound(what))
}

fn upsert_membership(conn: &Connection, group_id: Uuid, user_id: Uuid, now: &str) -> Result<GroupMember> {
    conn.execute(
        "INSERT INTO group_members (id, group_id, user_id, is_active, joined_at)
         VALUES (?1, ?2, ?3, 1, ?4)
         ON CONFLICT(group_id, user_id) DO UPDATE SET
             joined_at = CASE WHEN is_active = 0 THEN excluded.joined_at ELSE joined_at END,
             is_active = 1",
        params![Uuid::new_v4().to_string(), group_id.to_string(), user_id.to_string(), now],
    )
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            DbError::NotFound("user or group")
        } else {
            DbError::from(e)
        }
    })?;
    require(query_membership(conn, group_id, user_id)?, "membership")
}

fn query_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", UserRow::COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], |row| UserRow::from_row(row, 0))
        .optional()?;
    row.map(User::try_from).transpose()
}

/// `column` is always a literal from this module, never user input.
fn query_group(conn: &Connection, column: &str, value: &str) -> Result<Option<Group>> {
    let sql = format!("SELECT {} FROM groups WHERE {} = ?1", GroupRow::COLUMNS, column);
    let row = conn
        .query_row(&sql, [value], |row| GroupRow::from_row(row, 0))
        .optional()?;
    row.map(Group::try_from).transpose()
}

fn query_membership(conn: &Connection, group_id: Uuid, user_id: Uuid) -> Result<Option<GroupMember>> {
    let sql = format!(
        "SELECT {} FROM group_members WHERE group_id = ?1 AND user_id = ?2",
        MemberRow::COLUMNS
    );
    let row = conn
        .query_row(&sql, [group_id.to_string(), user_id.to_string()], |row| {
            MemberRow::from_row(row, 0)
        })
        .optional()?;
    row.map(GroupMember::try_from).transpose()
}

fn query_rejection(conn: &Connection, id: Uuid) -> Result<Option<Rejection>> {
    let sql = format!("SELECT {} FROM rejections WHERE id = ?1", RejectionRow::COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], |row| RejectionRow::from_row(row, 0))
        .optional()?;
    row.map(Rejection::try_from).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_bounds() {
        assert_eq!(validate_description("  Ghosted  ").unwrap(), "Ghosted");
        assert!(matches!(
            validate_description("   "),
            Err(DbError::Validation { field: "description", .. })
        ));
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_CHARS)).is_ok());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_CHARS + 1)).is_err());
        // Bounded in characters, not bytes.
        assert!(validate_description(&"é".repeat(MAX_DESCRIPTION_CHARS)).is_ok());
    }

    #[test]
    fn avatar_url_must_be_http() {
        assert!(validate_avatar_url("https://cdn.example.com/a.png").is_ok());
        assert!(validate_avatar_url("javascript:alert(1)").is_err());
        assert!(validate_avatar_url("").is_err());
    }
}

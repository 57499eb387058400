use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::debug;

use hopeful_leaderboard::{Candidate, compute};
use hopeful_types::leaderboard::{LeaderboardEntry, LeaderboardScope, Timeframe};

use crate::Database;
use crate::error::Result;
use crate::models::{decode_id, decode_ts, encode_ts};

impl Database {
    /// Rank users by rejection points for `scope` over the rolling `timeframe`.
    ///
    /// A group id that does not exist, or a group with no active members,
    /// yields an empty leaderboard rather than an error.
    pub fn get_leaderboard(&self, scope: LeaderboardScope, timeframe: Timeframe) -> Result<Vec<LeaderboardEntry>> {
        self.get_leaderboard_at(scope, timeframe, Utc::now())
    }

    /// `get_leaderboard` evaluated as of `now`.
    pub fn get_leaderboard_at(
        &self,
        scope: LeaderboardScope,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let cutoff = timeframe.cutoff(now);
        let candidates = self.with_conn(|conn| query_candidates(conn, scope, cutoff))?;
        debug!(
            "Leaderboard {:?}/{}: {} candidate rejections",
            scope,
            timeframe,
            candidates.len()
        );
        Ok(compute(candidates, scope, timeframe, now))
    }
}

/// Rejections in scope and at or after `cutoff`, with author profile and
/// membership state attached. For a group scope, inactive members are
/// already dropped here; `compute` re-checks both filters.
fn query_candidates(
    conn: &Connection,
    scope: LeaderboardScope,
    cutoff: Option<DateTime<Utc>>,
) -> Result<Vec<Candidate>> {
    let group_id = scope.group_id().map(|id| id.to_string());
    let cutoff = cutoff.map(encode_ts);

    let mut stmt = conn.prepare(
        "SELECT r.user_id, r.group_id, u.username, u.avatar_url, r.points, r.created_at,
                COALESCE(m.is_active, 0)
         FROM rejections r
         JOIN users u ON u.id = r.user_id
         LEFT JOIN group_members m ON m.group_id = r.group_id AND m.user_id = r.user_id
         WHERE (?1 IS NULL OR (r.group_id = ?1 AND m.is_active = 1))
           AND (?2 IS NULL OR r.created_at >= ?2)",
    )?;

    let rows = stmt
        .query_map(params![group_id, cutoff], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, bool>(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(user_id, group_id, username, avatar_url, points, created_at, member_active)| {
            Ok(Candidate {
                user_id: decode_id(&user_id)?,
                group_id: decode_id(&group_id)?,
                username,
                avatar_url,
                points,
                created_at: decode_ts(&created_at)?,
                member_active,
            })
        })
        .collect()
}

//! Hopeful Rejections leaderboard
//!
//! Turns a set of candidate rejections into an ordered ranking. The store
//! narrows candidates with SQL; everything that decides who is ranked and
//! where lives here so it can be checked without a database.
//!
//! Ordering: `total_points` descending, then `user_id` ascending. Ranks are
//! 1-based positions in that order, so tied totals get distinct consecutive
//! ranks and the lower user id wins the tie.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use hopeful_types::leaderboard::{LeaderboardEntry, LeaderboardScope, Timeframe};

/// One rejection as seen by the ranking, with the author's profile and
/// membership state denormalized onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub points: i64,
    pub created_at: DateTime<Utc>,
    /// Whether the author's membership in `group_id` is active at query time.
    pub member_active: bool,
}

impl Candidate {
    /// Whether this rejection counts toward a leaderboard for `scope` and
    /// `timeframe` evaluated at `now`.
    pub fn qualifies(&self, scope: LeaderboardScope, timeframe: Timeframe, now: DateTime<Utc>) -> bool {
        let in_scope = match scope {
            LeaderboardScope::Group(group_id) => self.group_id == group_id && self.member_active,
            LeaderboardScope::All => true,
        };
        in_scope && timeframe.contains(self.created_at, now)
    }
}

struct Tally {
    username: Option<String>,
    avatar_url: Option<String>,
    total_points: i64,
}

/// Filter, sum and rank candidates.
///
/// Users without a qualifying rejection do not appear. The result depends
/// only on the inputs, so repeated calls over the same rows agree.
pub fn compute<I>(
    candidates: I,
    scope: LeaderboardScope,
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut tallies: HashMap<Uuid, Tally> = HashMap::new();

    for c in candidates {
        if !c.qualifies(scope, timeframe, now) {
            continue;
        }
        let tally = tallies.entry(c.user_id).or_insert_with(|| Tally {
            username: None,
            avatar_url: None,
            total_points: 0,
        });
        tally.total_points = tally.total_points.saturating_add(c.points);
        // Profile fields are identical across a user's rows; keep any we see.
        if tally.username.is_none() {
            tally.username = c.username;
        }
        if tally.avatar_url.is_none() {
            tally.avatar_url = c.avatar_url;
        }
    }

    let mut ranked: Vec<(Uuid, Tally)> = tallies.into_iter().collect();
    ranked.sort_by(|(a_id, a), (b_id, b)| by_points_then_id((a.total_points, *a_id), (b.total_points, *b_id)));

    ranked
        .into_iter()
        .enumerate()
        .map(|(idx, (user_id, tally))| LeaderboardEntry {
            user_id,
            username: tally.username,
            avatar_url: tally.avatar_url,
            total_points: tally.total_points,
            rank: idx as u32 + 1,
        })
        .collect()
}

fn by_points_then_id(a: (i64, Uuid), b: (i64, Uuid)) -> Ordering {
    b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1))
}

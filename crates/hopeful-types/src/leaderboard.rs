//! Leaderboard query and result types. Timeframes are rolling windows
//! measured back from the query time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rolling window a leaderboard is computed over.
///
/// Windows are measured back from the moment of the query and are not
/// aligned to calendar days or weeks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
    #[default]
    All,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Daily,
        Timeframe::Weekly,
        Timeframe::Monthly,
        Timeframe::All,
    ];

    /// Length of the window, or `None` when unbounded.
    pub fn window(self) -> Option<Duration> {
        match self {
            Self::Daily => Some(Duration::hours(24)),
            Self::Weekly => Some(Duration::days(7)),
            Self::Monthly => Some(Duration::days(30)),
            Self::All => None,
        }
    }

    /// Earliest `created_at` that still counts, relative to `now`.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window().map(|w| now - w)
    }

    /// Whether a rejection created at `created_at` falls inside the window.
    pub fn contains(self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.cutoff(now).is_none_or(|cutoff| created_at >= cutoff)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown timeframe '{0}', expected daily, weekly, monthly or all")]
pub struct UnknownTimeframe(pub String);

impl FromStr for Timeframe {
    type Err = UnknownTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "all" => Ok(Self::All),
            other => Err(UnknownTimeframe(other.to_string())),
        }
    }
}

/// Which rejections a leaderboard is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardScope {
    /// One group; only its active members are ranked.
    Group(Uuid),
    /// Every rejection in every group.
    All,
}

impl LeaderboardScope {
    pub fn group_id(self) -> Option<Uuid> {
        match self {
            Self::Group(id) => Some(id),
            Self::All => None,
        }
    }
}

impl From<Option<Uuid>> for LeaderboardScope {
    fn from(group_id: Option<Uuid>) -> Self {
        group_id.map_or(Self::All, Self::Group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub total_points: i64,
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_are_rolling() {
        let now = Utc::now();
        let two_days_ago = now - Duration::days(2);

        assert!(!Timeframe::Daily.contains(two_days_ago, now));
        assert!(Timeframe::Weekly.contains(two_days_ago, now));
        assert!(Timeframe::Monthly.contains(two_days_ago, now));
        assert!(Timeframe::All.contains(two_days_ago, now));

        // 23 hours ago is still "today" even if it was yesterday on the calendar.
        assert!(Timeframe::Daily.contains(now - Duration::hours(23), now));
        assert!(!Timeframe::Monthly.contains(now - Duration::days(31), now));
    }

    #[test]
    fn parses_and_prints() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.to_string().parse::<Timeframe>(), Ok(tf));
        }
        let err = "yearly".parse::<Timeframe>().unwrap_err();
        assert_eq!(err.to_string(), "unknown timeframe 'yearly', expected daily, weekly, monthly or all");
        assert_eq!(Timeframe::default(), Timeframe::All);
    }

    #[test]
    fn scope_from_optional_group() {
        let id = Uuid::new_v4();
        assert_eq!(LeaderboardScope::from(Some(id)), LeaderboardScope::Group(id));
        assert_eq!(LeaderboardScope::from(None), LeaderboardScope::All);
        assert_eq!(LeaderboardScope::Group(id).group_id(), Some(id));
    }
}

//! Achievements, earned points and leaderboard rows.
//!
//! # Invariants
//! - Achievement `points > 0` and `code` is unique per workspace.
//! - A user earns each achievement at most once.
//! - Leaderboard ranks are contiguous `1..=n` per (workspace, period, start, category).

use crate::model::{require_text, UserId, ValidationError, WorkspaceId};
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type AchievementId = Uuid;

/// Category name that aggregates every achievement category.
pub const OVERALL_CATEGORY: &str = "overall";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub workspace_id: WorkspaceId,
    /// Stable machine name, e.g. `first_training`.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub points: u32,
    /// Trigger description, e.g. `{"events": ["training_completed"]}`.
    pub criteria: Value,
    pub is_active: bool,
}

impl Achievement {
    pub fn new(
        workspace_id: WorkspaceId,
        code: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        points: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            code: code.into(),
            name: name.into(),
            description: None,
            category: category.into(),
            points,
            criteria: Value::Object(serde_json::Map::new()),
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("code", &self.code)?;
        require_text("name", &self.name)?;
        require_text("category", &self.category)?;
        if self.category.eq_ignore_ascii_case(OVERALL_CATEGORY) {
            return Err(ValidationError::new(
                "category",
                "`overall` is reserved for aggregate leaderboards",
            ));
        }
        if self.points == 0 {
            return Err(ValidationError::new("points", "must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAchievement {
    pub id: Uuid,
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub achievement_id: AchievementId,
    pub points: u32,
    /// Epoch milliseconds.
    pub earned_at: i64,
}

/// Ranking window granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    AllTime,
}

impl LeaderboardPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::AllTime => "all_time",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "all_time" | "all-time" | "alltime" => Some(Self::AllTime),
            _ => None,
        }
    }

    /// Half-open date window `[start, end)` containing `anchor`.
    ///
    /// Weeks start on Monday. `AllTime` has no end and starts at 1970-01-01.
    pub fn window(self, anchor: NaiveDate) -> (NaiveDate, Option<NaiveDate>) {
        match self {
            Self::Daily => (anchor, anchor.succ_opt()),
            Self::Weekly => {
                let start =
                    anchor - Duration::days(i64::from(anchor.weekday().num_days_from_monday()));
                (start, start.checked_add_signed(Duration::days(7)))
            }
            Self::Monthly => {
                let start = anchor.with_day(1).unwrap_or(anchor);
                (start, start.checked_add_months(Months::new(1)))
            }
            Self::Yearly => {
                let start = NaiveDate::from_ymd_opt(anchor.year(), 1, 1).unwrap_or(anchor);
                (start, start.checked_add_months(Months::new(12)))
            }
            Self::AllTime => (NaiveDate::default(), None),
        }
    }
}

/// One precomputed ranking row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub workspace_id: WorkspaceId,
    pub period: LeaderboardPeriod,
    pub period_start: NaiveDate,
    pub category: String,
    pub user_id: UserId,
    pub user_name: String,
    pub points: u64,
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::{Achievement, LeaderboardPeriod};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_window_starts_on_monday() {
        // 2025-03-13 is a Thursday
        let (start, end) = LeaderboardPeriod::Weekly.window(date(2025, 3, 13));
        assert_eq!(start, date(2025, 3, 10));
        assert_eq!(end, Some(date(2025, 3, 17)));
    }

    #[test]
    fn monthly_and_yearly_windows() {
        let (start, end) = LeaderboardPeriod::Monthly.window(date(2024, 2, 29));
        assert_eq!(start, date(2024, 2, 1));
        assert_eq!(end, Some(date(2024, 3, 1)));

        let (start, end) = LeaderboardPeriod::Yearly.window(date(2024, 7, 4));
        assert_eq!(start, date(2024, 1, 1));
        assert_eq!(end, Some(date(2025, 1, 1)));
    }

    #[test]
    fn all_time_is_open_ended() {
        let (start, end) = LeaderboardPeriod::AllTime.window(date(2024, 7, 4));
        assert_eq!(start, date(1970, 1, 1));
        assert!(end.is_none());
    }

    #[test]
    fn overall_category_is_reserved() {
        let achievement = Achievement::new(Uuid::new_v4(), "x", "X", "Overall", 5);
        assert_eq!(achievement.validate().unwrap_err().field, "category");
    }
}

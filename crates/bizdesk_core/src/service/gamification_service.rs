//! Achievements, points and leaderboard use-cases.
//!
//! Leaderboards are snapshots: `recompute_leaderboard` ranks earned points
//! for one (period, anchor, category) partition and replaces the stored
//! rows; reads never rank on the fly.

use crate::model::gamification::{
    Achievement, AchievementId, LeaderboardEntry, LeaderboardPeriod, UserAchievement,
    OVERALL_CATEGORY,
};
use crate::model::{UserId, ValidationError, WorkspaceId};
use crate::repo::gamification_repo::{EarnedWindow, GamificationRepository, LeaderboardKey};
use crate::repo::RepoError;
use crate::util::{date_start_epoch_ms, now_epoch_ms, search_recursive};
use chrono::NaiveDate;
use log::info;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum GamificationServiceError {
    Validation(ValidationError),
    AchievementNotFound(String),
    UserNotFound(String),
    DuplicateCode(String),
    /// Awarding a deactivated achievement.
    AchievementInactive(AchievementId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for GamificationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::AchievementNotFound(id) => write!(f, "achievement not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::DuplicateCode(code) => write!(f, "achievement code already exists: {code}"),
            Self::AchievementInactive(id) => write!(f, "achievement {id} is inactive"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent gamification state: {details}")
            }
        }
    }
}

impl Error for GamificationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for GamificationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "achievement",
                id,
            } => Self::AchievementNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Result of awarding one achievement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwardOutcome {
    Awarded(UserAchievement),
    /// The user already held it; nothing changed.
    AlreadyEarned,
}

impl AwardOutcome {
    pub fn is_awarded(&self) -> bool {
        matches!(self, Self::Awarded(_))
    }
}

pub struct GamificationService<R: GamificationRepository> {
    repo: R,
}

impl<R: GamificationRepository> GamificationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn define_achievement(
        &self,
        achievement: &Achievement,
    ) -> Result<Achievement, GamificationServiceError> {
        achievement.validate()?;
        let id = self
            .repo
            .create_achievement(achievement)
            .map_err(|err| match err {
                RepoError::Conflict(_) => {
                    GamificationServiceError::DuplicateCode(achievement.code.clone())
                }
                other => other.into(),
            })?;
        info!(
            "event=achievement_define module=service status=ok workspace_id={} achievement_id={id} code={}",
            achievement.workspace_id, achievement.code
        );
        self.repo
            .get_achievement(achievement.workspace_id, id)?
            .ok_or(GamificationServiceError::InconsistentState(
                "achievement not found in read-back",
            ))
    }

    pub fn list_achievements(
        &self,
        workspace_id: WorkspaceId,
        active_only: bool,
    ) -> Result<Vec<Achievement>, GamificationServiceError> {
        Ok(self.repo.list_achievements(workspace_id, active_only)?)
    }

    /// Awards an achievement once per user; repeats are no-ops.
    pub fn award_achievement(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        achievement_id: AchievementId,
    ) -> Result<AwardOutcome, GamificationServiceError> {
        let achievement = self
            .repo
            .get_achievement(workspace_id, achievement_id)?
            .ok_or_else(|| GamificationServiceError::AchievementNotFound(achievement_id.to_string()))?;
        if !achievement.is_active {
            return Err(GamificationServiceError::AchievementInactive(achievement_id));
        }
        if !self.repo.user_exists(user_id)? {
            return Err(GamificationServiceError::UserNotFound(user_id.to_string()));
        }
        self.grant(workspace_id, user_id, &achievement)
    }

    /// Awards every active achievement whose criteria mention `event`.
    ///
    /// Returns the newly earned awards; achievements the user already holds
    /// are skipped.
    pub fn record_event(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        event: &str,
    ) -> Result<Vec<UserAchievement>, GamificationServiceError> {
        if !self.repo.user_exists(user_id)? {
            return Err(GamificationServiceError::UserNotFound(user_id.to_string()));
        }
        let needle = Value::String(event.to_string());
        let mut earned = Vec::new();
        for achievement in self.repo.list_achievements(workspace_id, true)? {
            if search_recursive(&achievement.criteria, &needle).is_none() {
                continue;
            }
            if let AwardOutcome::Awarded(award) = self.grant(workspace_id, user_id, &achievement)? {
                earned.push(award);
            }
        }
        info!(
            "event=gamification_event module=service status=ok workspace_id={workspace_id} user_id={user_id} name={event} awarded={}",
            earned.len()
        );
        Ok(earned)
    }

    pub fn awards_for_user(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> Result<Vec<UserAchievement>, GamificationServiceError> {
        Ok(self.repo.awards_for_user(workspace_id, user_id)?)
    }

    /// Points the user earned in the period containing `anchor`.
    pub fn user_points(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        period: LeaderboardPeriod,
        anchor: NaiveDate,
        category: &str,
    ) -> Result<u64, GamificationServiceError> {
        let (window, _) = earned_window(period, anchor);
        Ok(self
            .repo
            .user_points(workspace_id, user_id, window, category_filter(category))?)
    }

    /// Rebuilds one leaderboard partition and returns its rows in rank order.
    pub fn recompute_leaderboard(
        &self,
        workspace_id: WorkspaceId,
        period: LeaderboardPeriod,
        anchor: NaiveDate,
        category: &str,
    ) -> Result<Vec<LeaderboardEntry>, GamificationServiceError> {
        let category = normalize_category(category)?;
        let (window, period_start) = earned_window(period, anchor);
        let tallies =
            self.repo
                .aggregate_points(workspace_id, window, category_filter(&category))?;

        let mut entries = Vec::with_capacity(tallies.len());
        for (index, tally) in tallies.into_iter().enumerate() {
            let rank = u32::try_from(index + 1).map_err(|_| {
                GamificationServiceError::InconsistentState("leaderboard rank overflow")
            })?;
            entries.push(LeaderboardEntry {
                workspace_id,
                period,
                period_start,
                category: category.clone(),
                user_id: tally.user_id,
                user_name: tally.user_name,
                points: tally.points,
                rank,
            });
        }

        let key = LeaderboardKey {
            workspace_id,
            period,
            period_start,
            category: &category,
        };
        self.repo.replace_leaderboard(key, &entries)?;
        info!(
            "event=leaderboard_recompute module=service status=ok workspace_id={workspace_id} period={} period_start={period_start} category={category} rows={}",
            period.as_str(),
            entries.len()
        );
        Ok(entries)
    }

    /// Stored leaderboard rows in rank order.
    pub fn leaderboard(
        &self,
        workspace_id: WorkspaceId,
        period: LeaderboardPeriod,
        anchor: NaiveDate,
        category: &str,
        limit: Option<u32>,
    ) -> Result<Vec<LeaderboardEntry>, GamificationServiceError> {
        let category = normalize_category(category)?;
        let (_, period_start) = earned_window(period, anchor);
        let key = LeaderboardKey {
            workspace_id,
            period,
            period_start,
            category: &category,
        };
        Ok(self.repo.leaderboard(key, limit)?)
    }

    pub fn user_rank(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        period: LeaderboardPeriod,
        anchor: NaiveDate,
        category: &str,
    ) -> Result<Option<LeaderboardEntry>, GamificationServiceError> {
        let category = normalize_category(category)?;
        let (_, period_start) = earned_window(period, anchor);
        let key = LeaderboardKey {
            workspace_id,
            period,
            period_start,
            category: &category,
        };
        Ok(self.repo.user_rank(key, user_id)?)
    }

    fn grant(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        achievement: &Achievement,
    ) -> Result<AwardOutcome, GamificationServiceError> {
        let award = UserAchievement {
            id: Uuid::new_v4(),
            workspace_id,
            user_id,
            achievement_id: achievement.id,
            points: achievement.points,
            earned_at: now_epoch_ms(),
        };
        if !self.repo.award(&award)? {
            return Ok(AwardOutcome::AlreadyEarned);
        }
        info!(
            "event=achievement_award module=service status=ok workspace_id={workspace_id} user_id={user_id} code={} points={}",
            achievement.code, achievement.points
        );
        Ok(AwardOutcome::Awarded(award))
    }
}

fn earned_window(period: LeaderboardPeriod, anchor: NaiveDate) -> (EarnedWindow, NaiveDate) {
    let (start, end) = period.window(anchor);
    let window = EarnedWindow {
        start_ms: date_start_epoch_ms(start),
        end_ms: end.map(date_start_epoch_ms),
    };
    (window, start)
}

fn normalize_category(category: &str) -> Result<String, GamificationServiceError> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("category", "must not be empty").into());
    }
    if trimmed.eq_ignore_ascii_case(OVERALL_CATEGORY) {
        return Ok(OVERALL_CATEGORY.to_string());
    }
    Ok(trimmed.to_string())
}

fn category_filter(category: &str) -> Option<&str> {
    if category.trim().eq_ignore_ascii_case(OVERALL_CATEGORY) {
        None
    } else {
        Some(category.trim())
    }
}

impl From<ValidationError> for GamificationServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{category_filter, earned_window, normalize_category};
    use crate::model::gamification::LeaderboardPeriod;
    use chrono::NaiveDate;

    #[test]
    fn overall_category_counts_everything() {
        assert_eq!(category_filter("Overall"), None);
        assert_eq!(category_filter(" training "), Some("training"));
        assert_eq!(normalize_category("OVERALL").unwrap(), "overall");
        assert!(normalize_category("  ").is_err());
    }

    #[test]
    fn daily_window_spans_one_day_of_millis() {
        let anchor = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        let (window, start) = earned_window(LeaderboardPeriod::Daily, anchor);
        assert_eq!(start, anchor);
        assert_eq!(window.start_ms, 86_400_000);
        assert_eq!(window.end_ms, Some(172_800_000));
    }
}

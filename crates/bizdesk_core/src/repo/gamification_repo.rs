//! Achievement, award and leaderboard persistence.
//!
//! # Invariants
//! - Awards are insert-or-ignore on (user, achievement).
//! - A leaderboard partition is replaced as a whole inside one transaction,
//!   so readers never observe a partially ranked period.

use crate::model::gamification::{
    Achievement, AchievementId, LeaderboardEntry, LeaderboardPeriod, UserAchievement,
};
use crate::model::{UserId, WorkspaceId};
use crate::repo::common::{
    bool_to_int, date_to_db, ensure_connection_ready, parse_bool, parse_date, parse_unsigned,
    parse_uuid, RepoError, RepoResult,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

const ACHIEVEMENT_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    code,
    name,
    description,
    category,
    points,
    criteria,
    is_active
FROM achievements";

const LEADERBOARD_SELECT_SQL: &str = "SELECT
    l.workspace_id,
    l.period,
    l.period_start,
    l.category,
    l.user_id,
    u.name,
    l.points,
    l.rank
FROM leaderboards l
JOIN users u ON u.id = l.user_id";

/// Points earned by one user inside a window, ready for ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsTally {
    pub user_id: UserId,
    pub user_name: String,
    pub points: u64,
    /// Epoch milliseconds of the latest counted award.
    pub last_earned_at: i64,
}

/// Epoch-millisecond window `[start_ms, end_ms)`; `end_ms = None` is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarnedWindow {
    pub start_ms: i64,
    pub end_ms: Option<i64>,
}

/// Identifies one ranked leaderboard partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardKey<'a> {
    pub workspace_id: WorkspaceId,
    pub period: LeaderboardPeriod,
    pub period_start: NaiveDate,
    pub category: &'a str,
}

pub trait GamificationRepository {
    fn create_achievement(&self, achievement: &Achievement) -> RepoResult<AchievementId>;
    fn get_achievement(
        &self,
        workspace_id: WorkspaceId,
        id: AchievementId,
    ) -> RepoResult<Option<Achievement>>;
    fn get_achievement_by_code(
        &self,
        workspace_id: WorkspaceId,
        code: &str,
    ) -> RepoResult<Option<Achievement>>;
    fn list_achievements(
        &self,
        workspace_id: WorkspaceId,
        active_only: bool,
    ) -> RepoResult<Vec<Achievement>>;
    fn user_exists(&self, user_id: UserId) -> RepoResult<bool>;
    /// Records an award; returns `false` when the user already holds it.
    fn award(&self, award: &UserAchievement) -> RepoResult<bool>;
    fn awards_for_user(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> RepoResult<Vec<UserAchievement>>;
    /// Sum of points in `window`; `category = None` counts every category.
    fn user_points(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        window: EarnedWindow,
        category: Option<&str>,
    ) -> RepoResult<u64>;
    /// Per-user totals ordered by points DESC, last award ASC, user id ASC.
    fn aggregate_points(
        &self,
        workspace_id: WorkspaceId,
        window: EarnedWindow,
        category: Option<&str>,
    ) -> RepoResult<Vec<PointsTally>>;
    fn replace_leaderboard(
        &self,
        key: LeaderboardKey<'_>,
        entries: &[LeaderboardEntry],
    ) -> RepoResult<()>;
    fn leaderboard(
        &self,
        key: LeaderboardKey<'_>,
        limit: Option<u32>,
    ) -> RepoResult<Vec<LeaderboardEntry>>;
    fn user_rank(
        &self,
        key: LeaderboardKey<'_>,
        user_id: UserId,
    ) -> RepoResult<Option<LeaderboardEntry>>;
}

pub struct SqliteGamificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGamificationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["achievements", "user_achievements", "leaderboards", "users"],
        )?;
        Ok(Self { conn })
    }
}

impl GamificationRepository for SqliteGamificationRepository<'_> {
    fn create_achievement(&self, achievement: &Achievement) -> RepoResult<AchievementId> {
        achievement.validate()?;
        let criteria = serde_json::to_string(&achievement.criteria)
            .map_err(|err| RepoError::InvalidData(format!("achievement criteria: {err}")))?;
        self.conn.execute(
            "INSERT INTO achievements (
                id,
                workspace_id,
                code,
                name,
                description,
                category,
                points,
                criteria,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                achievement.id.to_string(),
                achievement.workspace_id.to_string(),
                achievement.code.as_str(),
                achievement.name.as_str(),
                achievement.description.as_deref(),
                achievement.category.as_str(),
                achievement.points,
                criteria,
                bool_to_int(achievement.is_active),
            ],
        )?;
        Ok(achievement.id)
    }

    fn get_achievement(
        &self,
        workspace_id: WorkspaceId,
        id: AchievementId,
    ) -> RepoResult<Option<Achievement>> {
        self.conn
            .query_row(
                &format!("{ACHIEVEMENT_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2;"),
                [id.to_string(), workspace_id.to_string()],
                |row| Ok(parse_achievement_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn get_achievement_by_code(
        &self,
        workspace_id: WorkspaceId,
        code: &str,
    ) -> RepoResult<Option<Achievement>> {
        self.conn
            .query_row(
                &format!("{ACHIEVEMENT_SELECT_SQL} WHERE workspace_id = ?1 AND code = ?2;"),
                [workspace_id.to_string(), code.to_string()],
                |row| Ok(parse_achievement_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_achievements(
        &self,
        workspace_id: WorkspaceId,
        active_only: bool,
    ) -> RepoResult<Vec<Achievement>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACHIEVEMENT_SELECT_SQL}
             WHERE workspace_id = ?1 AND (?2 = 0 OR is_active = 1)
             ORDER BY category ASC, code ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![workspace_id.to_string(), bool_to_int(active_only)])?;
        let mut achievements = Vec::new();
        while let Some(row) = rows.next()? {
            achievements.push(parse_achievement_row(row)?);
        }
        Ok(achievements)
    }

    fn user_exists(&self, user_id: UserId) -> RepoResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1 AND is_deleted = 0;",
                [user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn award(&self, award: &UserAchievement) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO user_achievements (
                id,
                workspace_id,
                user_id,
                achievement_id,
                points,
                earned_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                award.id.to_string(),
                award.workspace_id.to_string(),
                award.user_id.to_string(),
                award.achievement_id.to_string(),
                award.points,
                award.earned_at,
            ],
        )?;
        Ok(changed == 1)
    }

    fn awards_for_user(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> RepoResult<Vec<UserAchievement>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workspace_id, user_id, achievement_id, points, earned_at
             FROM user_achievements
             WHERE workspace_id = ?1 AND user_id = ?2
             ORDER BY earned_at DESC, id ASC;",
        )?;
        let mut rows = stmt.query([workspace_id.to_string(), user_id.to_string()])?;
        let mut awards = Vec::new();
        while let Some(row) = rows.next()? {
            awards.push(parse_award_row(row)?);
        }
        Ok(awards)
    }

    fn user_points(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        window: EarnedWindow,
        category: Option<&str>,
    ) -> RepoResult<u64> {
        let (filter, mut bind_values) = window_filter(workspace_id, window, category);
        bind_values.push(Value::Text(user_id.to_string()));
        let total: i64 = self.conn.query_row(
            &format!(
                "SELECT COALESCE(SUM(ua.points), 0)
                 FROM user_achievements ua
                 JOIN achievements a ON a.id = ua.achievement_id
                 {filter} AND ua.user_id = ?;"
            ),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        parse_unsigned(total, "user_achievements.points")
    }

    fn aggregate_points(
        &self,
        workspace_id: WorkspaceId,
        window: EarnedWindow,
        category: Option<&str>,
    ) -> RepoResult<Vec<PointsTally>> {
        let (filter, bind_values) = window_filter(workspace_id, window, category);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                ua.user_id,
                u.name,
                SUM(ua.points) AS total,
                MAX(ua.earned_at) AS last_earned_at
             FROM user_achievements ua
             JOIN achievements a ON a.id = ua.achievement_id
             JOIN users u ON u.id = ua.user_id
             {filter}
             GROUP BY ua.user_id, u.name
             ORDER BY total DESC, last_earned_at ASC, ua.user_id ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tallies = Vec::new();
        while let Some(row) = rows.next()? {
            let user_id: String = row.get(0)?;
            tallies.push(PointsTally {
                user_id: parse_uuid(&user_id, "user_achievements.user_id")?,
                user_name: row.get(1)?,
                points: parse_unsigned(row.get(2)?, "user_achievements.points")?,
                last_earned_at: row.get(3)?,
            });
        }
        Ok(tallies)
    }

    fn replace_leaderboard(
        &self,
        key: LeaderboardKey<'_>,
        entries: &[LeaderboardEntry],
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM leaderboards
             WHERE workspace_id = ?1 AND period = ?2 AND period_start = ?3 AND category = ?4;",
            params![
                key.workspace_id.to_string(),
                key.period.as_str(),
                date_to_db(key.period_start),
                key.category,
            ],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO leaderboards (
                    id,
                    workspace_id,
                    period,
                    period_start,
                    category,
                    user_id,
                    points,
                    rank
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            )?;
            for entry in entries {
                let points = i64::try_from(entry.points).map_err(|_| {
                    RepoError::InvalidData(format!("leaderboard points overflow: {}", entry.points))
                })?;
                insert.execute(params![
                    uuid::Uuid::new_v4().to_string(),
                    key.workspace_id.to_string(),
                    key.period.as_str(),
                    date_to_db(key.period_start),
                    key.category,
                    entry.user_id.to_string(),
                    points,
                    entry.rank,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn leaderboard(
        &self,
        key: LeaderboardKey<'_>,
        limit: Option<u32>,
    ) -> RepoResult<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LEADERBOARD_SELECT_SQL}
             WHERE l.workspace_id = ?1 AND l.period = ?2 AND l.period_start = ?3 AND l.category = ?4
             ORDER BY l.rank ASC
             LIMIT ?5;"
        ))?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, i64::from);
        let mut rows = stmt.query(params![
            key.workspace_id.to_string(),
            key.period.as_str(),
            date_to_db(key.period_start),
            key.category,
            limit,
        ])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_leaderboard_row(row)?);
        }
        Ok(entries)
    }

    fn user_rank(
        &self,
        key: LeaderboardKey<'_>,
        user_id: UserId,
    ) -> RepoResult<Option<LeaderboardEntry>> {
        self.conn
            .query_row(
                &format!(
                    "{LEADERBOARD_SELECT_SQL}
                     WHERE l.workspace_id = ?1
                       AND l.period = ?2
                       AND l.period_start = ?3
                       AND l.category = ?4
                       AND l.user_id = ?5;"
                ),
                params![
                    key.workspace_id.to_string(),
                    key.period.as_str(),
                    date_to_db(key.period_start),
                    key.category,
                    user_id.to_string(),
                ],
                |row| Ok(parse_leaderboard_row(row)),
            )
            .optional()?
            .transpose()
    }
}

fn window_filter(
    workspace_id: WorkspaceId,
    window: EarnedWindow,
    category: Option<&str>,
) -> (String, Vec<Value>) {
    let mut sql = String::from("WHERE ua.workspace_id = ? AND ua.earned_at >= ?");
    let mut bind_values = vec![
        Value::Text(workspace_id.to_string()),
        Value::Integer(window.start_ms),
    ];
    if let Some(end_ms) = window.end_ms {
        sql.push_str(" AND ua.earned_at < ?");
        bind_values.push(Value::Integer(end_ms));
    }
    if let Some(category) = category {
        sql.push_str(" AND a.category = ?");
        bind_values.push(Value::Text(category.to_string()));
    }
    (sql, bind_values)
}

fn parse_achievement_row(row: &Row<'_>) -> RepoResult<Achievement> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let criteria: String = row.get(7)?;
    let is_active: i64 = row.get(8)?;
    Ok(Achievement {
        id: parse_uuid(&id, "achievements.id")?,
        workspace_id: parse_uuid(&workspace_id, "achievements.workspace_id")?,
        code: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        points: parse_unsigned(row.get(6)?, "achievements.points")?,
        criteria: serde_json::from_str(&criteria).map_err(|err| {
            RepoError::InvalidData(format!("invalid achievements.criteria for {id}: {err}"))
        })?,
        is_active: parse_bool(is_active, "achievements.is_active")?,
    })
}

fn parse_award_row(row: &Row<'_>) -> RepoResult<UserAchievement> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let achievement_id: String = row.get(3)?;
    Ok(UserAchievement {
        id: parse_uuid(&id, "user_achievements.id")?,
        workspace_id: parse_uuid(&workspace_id, "user_achievements.workspace_id")?,
        user_id: parse_uuid(&user_id, "user_achievements.user_id")?,
        achievement_id: parse_uuid(&achievement_id, "user_achievements.achievement_id")?,
        points: parse_unsigned(row.get(4)?, "user_achievements.points")?,
        earned_at: row.get(5)?,
    })
}

fn parse_leaderboard_row(row: &Row<'_>) -> RepoResult<LeaderboardEntry> {
    let workspace_id: String = row.get(0)?;
    let period: String = row.get(1)?;
    let period_start: String = row.get(2)?;
    let user_id: String = row.get(4)?;
    Ok(LeaderboardEntry {
        workspace_id: parse_uuid(&workspace_id, "leaderboards.workspace_id")?,
        period: LeaderboardPeriod::parse(&period).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid leaderboards.period `{period}`"))
        })?,
        period_start: parse_date(&period_start, "leaderboards.period_start")?,
        category: row.get(3)?,
        user_id: parse_uuid(&user_id, "leaderboards.user_id")?,
        user_name: row.get(5)?,
        points: parse_unsigned(row.get(6)?, "leaderboards.points")?,
        rank: parse_unsigned(row.get(7)?, "leaderboards.rank")?,
    })
}

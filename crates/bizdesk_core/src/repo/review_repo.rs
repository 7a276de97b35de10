//! Performance review persistence.

use crate::model::review::{PerformanceReview, ReviewId, ReviewScores, ReviewStatus};
use crate::model::{EmployeeId, WorkspaceId};
use crate::repo::common::{
    employee_is_active, ensure_connection_ready, parse_unsigned, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const REVIEW_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    employee_id,
    reviewer_employee_id,
    period,
    quality_score,
    productivity_score,
    communication_score,
    teamwork_score,
    initiative_score,
    overall_rating,
    strengths,
    improvements,
    comments,
    status
FROM performance_reviews";

#[derive(Debug, Clone, Default)]
pub struct ReviewListQuery {
    pub employee_id: Option<EmployeeId>,
    pub reviewer_employee_id: Option<EmployeeId>,
    pub period: Option<String>,
    pub status: Option<ReviewStatus>,
}

pub trait ReviewRepository {
    fn create_review(&self, review: &PerformanceReview) -> RepoResult<ReviewId>;
    /// Rewrites scores and comments of a draft review.
    fn update_draft(&self, review: &PerformanceReview) -> RepoResult<()>;
    fn transition(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
        from: ReviewStatus,
        to: ReviewStatus,
    ) -> RepoResult<()>;
    fn get_review(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
    ) -> RepoResult<Option<PerformanceReview>>;
    fn list_reviews(
        &self,
        workspace_id: WorkspaceId,
        query: &ReviewListQuery,
    ) -> RepoResult<Vec<PerformanceReview>>;
    /// Mean `overall_rating` of non-draft reviews, `None` without any.
    fn average_rating(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<Option<f64>>;
    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool>;
}

pub struct SqliteReviewRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReviewRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["performance_reviews"])?;
        Ok(Self { conn })
    }
}

impl ReviewRepository for SqliteReviewRepository<'_> {
    fn create_review(&self, review: &PerformanceReview) -> RepoResult<ReviewId> {
        review.validate()?;
        let s = &review.scores;
        self.conn.execute(
            "INSERT INTO performance_reviews (
                id,
                workspace_id,
                employee_id,
                reviewer_employee_id,
                period,
                quality_score,
                productivity_score,
                communication_score,
                teamwork_score,
                initiative_score,
                overall_rating,
                strengths,
                improvements,
                comments,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
            params![
                review.id.to_string(),
                review.workspace_id.to_string(),
                review.employee_id.to_string(),
                review.reviewer_employee_id.to_string(),
                review.period.as_str(),
                s.quality,
                s.productivity,
                s.communication,
                s.teamwork,
                s.initiative,
                review.overall_rating,
                review.strengths.as_deref(),
                review.improvements.as_deref(),
                review.comments.as_deref(),
                review.status.as_str(),
            ],
        )?;
        Ok(review.id)
    }

    fn update_draft(&self, review: &PerformanceReview) -> RepoResult<()> {
        review.validate()?;
        let s = &review.scores;
        let changed = self.conn.execute(
            "UPDATE performance_reviews
             SET
                quality_score = ?1,
                productivity_score = ?2,
                communication_score = ?3,
                teamwork_score = ?4,
                initiative_score = ?5,
                overall_rating = ?6,
                strengths = ?7,
                improvements = ?8,
                comments = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?10 AND workspace_id = ?11 AND is_deleted = 0 AND status = 'draft';",
            params![
                s.quality,
                s.productivity,
                s.communication,
                s.teamwork,
                s.initiative,
                review.overall_rating,
                review.strengths.as_deref(),
                review.improvements.as_deref(),
                review.comments.as_deref(),
                review.id.to_string(),
                review.workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(self.missing_or_conflict(review.workspace_id, review.id, "draft")?);
        }
        Ok(())
    }

    fn transition(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
        from: ReviewStatus,
        to: ReviewStatus,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE performance_reviews
             SET status = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2 AND workspace_id = ?3 AND is_deleted = 0 AND status = ?4;",
            params![
                to.as_str(),
                id.to_string(),
                workspace_id.to_string(),
                from.as_str()
            ],
        )?;
        if changed == 0 {
            return Err(self.missing_or_conflict(workspace_id, id, from.as_str())?);
        }
        Ok(())
    }

    fn get_review(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
    ) -> RepoResult<Option<PerformanceReview>> {
        self.conn
            .query_row(
                &format!(
                    "{REVIEW_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;"
                ),
                [id.to_string(), workspace_id.to_string()],
                |row| Ok(parse_review_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_reviews(
        &self,
        workspace_id: WorkspaceId,
        query: &ReviewListQuery,
    ) -> RepoResult<Vec<PerformanceReview>> {
        let mut sql = format!("{REVIEW_SELECT_SQL} WHERE workspace_id = ? AND is_deleted = 0");
        let mut bind_values: Vec<Value> = vec![Value::Text(workspace_id.to_string())];
        if let Some(employee_id) = query.employee_id {
            sql.push_str(" AND employee_id = ?");
            bind_values.push(Value::Text(employee_id.to_string()));
        }
        if let Some(reviewer) = query.reviewer_employee_id {
            sql.push_str(" AND reviewer_employee_id = ?");
            bind_values.push(Value::Text(reviewer.to_string()));
        }
        if let Some(period) = query.period.as_deref() {
            sql.push_str(" AND period = ?");
            bind_values.push(Value::Text(period.to_string()));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY period DESC, created_at DESC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut reviews = Vec::new();
        while let Some(row) = rows.next()? {
            reviews.push(parse_review_row(row)?);
        }
        Ok(reviews)
    }

    fn average_rating(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<Option<f64>> {
        let average: Option<f64> = self.conn.query_row(
            "SELECT AVG(overall_rating)
             FROM performance_reviews
             WHERE workspace_id = ?1
               AND employee_id = ?2
               AND is_deleted = 0
               AND status <> 'draft';",
            [workspace_id.to_string(), employee_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(average.map(|value| (value * 100.0).round() / 100.0))
    }

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool> {
        employee_is_active(self.conn, workspace_id, employee_id)
    }
}

impl SqliteReviewRepository<'_> {
    fn missing_or_conflict(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
        expected: &str,
    ) -> RepoResult<RepoError> {
        Ok(match self.get_review(workspace_id, id)? {
            Some(stored) => RepoError::Conflict(format!(
                "review {id} is {}, expected {expected}",
                stored.status.as_str()
            )),
            None => RepoError::not_found("review", id),
        })
    }
}

fn parse_review_row(row: &Row<'_>) -> RepoResult<PerformanceReview> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let employee_id: String = row.get(2)?;
    let reviewer: String = row.get(3)?;
    let status: String = row.get(14)?;
    Ok(PerformanceReview {
        id: parse_uuid(&id, "performance_reviews.id")?,
        workspace_id: parse_uuid(&workspace_id, "performance_reviews.workspace_id")?,
        employee_id: parse_uuid(&employee_id, "performance_reviews.employee_id")?,
        reviewer_employee_id: parse_uuid(&reviewer, "performance_reviews.reviewer_employee_id")?,
        period: row.get(4)?,
        scores: ReviewScores {
            quality: parse_unsigned(row.get(5)?, "performance_reviews.quality_score")?,
            productivity: parse_unsigned(row.get(6)?, "performance_reviews.productivity_score")?,
            communication: parse_unsigned(row.get(7)?, "performance_reviews.communication_score")?,
            teamwork: parse_unsigned(row.get(8)?, "performance_reviews.teamwork_score")?,
            initiative: parse_unsigned(row.get(9)?, "performance_reviews.initiative_score")?,
        },
        overall_rating: row.get(10)?,
        strengths: row.get(11)?,
        improvements: row.get(12)?,
        comments: row.get(13)?,
        status: ReviewStatus::parse(&status).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid performance_reviews.status `{status}`"))
        })?,
    })
}

//! OKR goal persistence.
//!
//! # Invariants
//! - Multi-goal writes (progress roll-up, cascade delete) run in one transaction.
//! - Key results are listed in creation order.

use crate::model::okr::{GoalId, GoalKind, GoalStatus, OkrGoal};
use crate::model::{EmployeeId, WorkspaceId};
use crate::repo::common::{
    bool_to_int, employee_is_active, ensure_connection_ready, optional_date_to_db, parse_bool,
    parse_optional_date, parse_optional_uuid, parse_unsigned, parse_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const GOAL_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    owner_employee_id,
    parent_id,
    kind,
    title,
    description,
    period,
    start_date,
    due_date,
    progress,
    status,
    is_deleted
FROM okr_goals";

#[derive(Debug, Clone, Default)]
pub struct GoalListQuery {
    pub kind: Option<GoalKind>,
    pub owner_employee_id: Option<EmployeeId>,
    pub period: Option<String>,
    pub status: Option<GoalStatus>,
}

pub trait OkrRepository {
    fn create_goal(&self, goal: &OkrGoal) -> RepoResult<GoalId>;
    fn update_goal(&self, goal: &OkrGoal) -> RepoResult<()>;
    /// Updates several goals atomically.
    fn update_goals(&self, goals: &[OkrGoal]) -> RepoResult<()>;
    fn get_goal(&self, workspace_id: WorkspaceId, id: GoalId) -> RepoResult<Option<OkrGoal>>;
    fn list_goals(
        &self,
        workspace_id: WorkspaceId,
        query: &GoalListQuery,
    ) -> RepoResult<Vec<OkrGoal>>;
    fn list_key_results(
        &self,
        workspace_id: WorkspaceId,
        objective_id: GoalId,
    ) -> RepoResult<Vec<OkrGoal>>;
    /// Soft-deletes a goal and its key results; returns affected rows.
    fn soft_delete_goal(&self, workspace_id: WorkspaceId, id: GoalId) -> RepoResult<usize>;
    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool>;
}

pub struct SqliteOkrRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOkrRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["okr_goals"])?;
        Ok(Self { conn })
    }
}

impl OkrRepository for SqliteOkrRepository<'_> {
    fn create_goal(&self, goal: &OkrGoal) -> RepoResult<GoalId> {
        goal.validate()?;
        self.conn.execute(
            "INSERT INTO okr_goals (
                id,
                workspace_id,
                owner_employee_id,
                parent_id,
                kind,
                title,
                description,
                period,
                start_date,
                due_date,
                progress,
                status,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                goal.id.to_string(),
                goal.workspace_id.to_string(),
                goal.owner_employee_id.map(|id| id.to_string()),
                goal.parent_id.map(|id| id.to_string()),
                goal.kind.as_str(),
                goal.title.as_str(),
                goal.description.as_deref(),
                goal.period.as_str(),
                optional_date_to_db(goal.start_date),
                optional_date_to_db(goal.due_date),
                goal.progress,
                goal.status.as_str(),
                bool_to_int(goal.is_deleted),
            ],
        )?;
        Ok(goal.id)
    }

    fn update_goal(&self, goal: &OkrGoal) -> RepoResult<()> {
        write_goal(self.conn, goal)
    }

    fn update_goals(&self, goals: &[OkrGoal]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for goal in goals {
            write_goal(&tx, goal)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_goal(&self, workspace_id: WorkspaceId, id: GoalId) -> RepoResult<Option<OkrGoal>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GOAL_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;"
        ))?;
        let mut rows = stmt.query([id.to_string(), workspace_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_goal_row(row)?));
        }
        Ok(None)
    }

    fn list_goals(
        &self,
        workspace_id: WorkspaceId,
        query: &GoalListQuery,
    ) -> RepoResult<Vec<OkrGoal>> {
        let mut sql = format!("{GOAL_SELECT_SQL} WHERE workspace_id = ? AND is_deleted = 0");
        let mut bind_values: Vec<Value> = vec![Value::Text(workspace_id.to_string())];
        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(owner) = query.owner_employee_id {
            sql.push_str(" AND owner_employee_id = ?");
            bind_values.push(Value::Text(owner.to_string()));
        }
        if let Some(period) = query.period.as_deref() {
            sql.push_str(" AND period = ?");
            bind_values.push(Value::Text(period.to_string()));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY period DESC, created_at ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut goals = Vec::new();
        while let Some(row) = rows.next()? {
            goals.push(parse_goal_row(row)?);
        }
        Ok(goals)
    }

    fn list_key_results(
        &self,
        workspace_id: WorkspaceId,
        objective_id: GoalId,
    ) -> RepoResult<Vec<OkrGoal>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GOAL_SELECT_SQL}
             WHERE parent_id = ?1 AND workspace_id = ?2 AND is_deleted = 0
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([objective_id.to_string(), workspace_id.to_string()])?;
        let mut goals = Vec::new();
        while let Some(row) = rows.next()? {
            goals.push(parse_goal_row(row)?);
        }
        Ok(goals)
    }

    fn soft_delete_goal(&self, workspace_id: WorkspaceId, id: GoalId) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE okr_goals
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;",
            [id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("goal", id));
        }
        let children = tx.execute(
            "UPDATE okr_goals
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE parent_id = ?1 AND workspace_id = ?2 AND is_deleted = 0;",
            [id.to_string(), workspace_id.to_string()],
        )?;
        tx.commit()?;
        Ok(changed + children)
    }

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool> {
        employee_is_active(self.conn, workspace_id, employee_id)
    }
}

fn write_goal(conn: &Connection, goal: &OkrGoal) -> RepoResult<()> {
    goal.validate()?;
    let changed = conn.execute(
        "UPDATE okr_goals
         SET
            owner_employee_id = ?1,
            title = ?2,
            description = ?3,
            period = ?4,
            start_date = ?5,
            due_date = ?6,
            progress = ?7,
            status = ?8,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?9 AND workspace_id = ?10 AND is_deleted = 0;",
        params![
            goal.owner_employee_id.map(|id| id.to_string()),
            goal.title.as_str(),
            goal.description.as_deref(),
            goal.period.as_str(),
            optional_date_to_db(goal.start_date),
            optional_date_to_db(goal.due_date),
            goal.progress,
            goal.status.as_str(),
            goal.id.to_string(),
            goal.workspace_id.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found("goal", goal.id));
    }
    Ok(())
}

fn parse_goal_row(row: &Row<'_>) -> RepoResult<OkrGoal> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let kind: String = row.get(4)?;
    let status: String = row.get(11)?;
    let is_deleted: i64 = row.get(12)?;
    Ok(OkrGoal {
        id: parse_uuid(&id, "okr_goals.id")?,
        workspace_id: parse_uuid(&workspace_id, "okr_goals.workspace_id")?,
        owner_employee_id: parse_optional_uuid(row.get(2)?, "okr_goals.owner_employee_id")?,
        parent_id: parse_optional_uuid(row.get(3)?, "okr_goals.parent_id")?,
        kind: GoalKind::parse(&kind)
            .ok_or_else(|| RepoError::InvalidData(format!("invalid okr_goals.kind `{kind}`")))?,
        title: row.get(5)?,
        description: row.get(6)?,
        period: row.get(7)?,
        start_date: parse_optional_date(row.get(8)?, "okr_goals.start_date")?,
        due_date: parse_optional_date(row.get(9)?, "okr_goals.due_date")?,
        progress: parse_unsigned(row.get(10)?, "okr_goals.progress")?,
        status: GoalStatus::parse(&status).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid okr_goals.status `{status}`"))
        })?,
        is_deleted: parse_bool(is_deleted, "okr_goals.is_deleted")?,
    })
}

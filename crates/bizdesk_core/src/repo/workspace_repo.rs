//! Users, workspaces and employees.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Employee reads are always workspace-scoped.
//! - Lists are ordered deterministically with `id ASC` as final tie-break.

use crate::model::workspace::{Employee, EmployeeStatus, User, Workspace};
use crate::model::{EmployeeId, UserId, WorkspaceId};
use crate::repo::common::{
    bool_to_int, date_to_db, ensure_connection_ready, like_pattern, optional_date_to_db,
    parse_bool, parse_optional_date, parse_optional_uuid, parse_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const EMPLOYEE_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    user_id,
    employee_code,
    first_name,
    last_name,
    email,
    position,
    department,
    hire_date,
    status
FROM employees";

/// Filters for listing employees.
#[derive(Debug, Clone, Default)]
pub struct EmployeeListQuery {
    pub status: Option<EmployeeStatus>,
    pub department: Option<String>,
    /// Case-insensitive match on code, names and email.
    pub search: Option<String>,
}

pub trait WorkspaceRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    fn workspace_key_exists(&self, key: &str) -> RepoResult<bool>;
    fn create_workspace(&self, workspace: &Workspace) -> RepoResult<WorkspaceId>;
    fn get_workspace(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>>;
    fn list_workspaces(&self, owner: Option<UserId>) -> RepoResult<Vec<Workspace>>;

    fn employee_code_exists(&self, workspace_id: WorkspaceId, code: &str) -> RepoResult<bool>;
    fn create_employee(&self, employee: &Employee) -> RepoResult<EmployeeId>;
    fn update_employee(&self, employee: &Employee) -> RepoResult<()>;
    fn get_employee(
        &self,
        workspace_id: WorkspaceId,
        id: EmployeeId,
    ) -> RepoResult<Option<Employee>>;
    fn list_employees(
        &self,
        workspace_id: WorkspaceId,
        query: &EmployeeListQuery,
    ) -> RepoResult<Vec<Employee>>;
}

pub struct SqliteWorkspaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkspaceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users", "workspaces", "employees"])?;
        Ok(Self { conn })
    }
}

impl WorkspaceRepository for SqliteWorkspaceRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;
        self.conn.execute(
            "INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3);",
            params![user.id.to_string(), user.name.as_str(), user.email.as_str()],
        )?;
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, name, email FROM users WHERE id = ?1 AND is_deleted = 0;",
                [id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .map(|(id, name, email)| {
                Ok(User {
                    id: parse_uuid(&id, "users.id")?,
                    name,
                    email,
                })
            })
            .transpose()
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1 AND is_deleted = 0;",
                [email.trim().to_ascii_lowercase()],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => self.get_user(parse_uuid(&id, "users.id")?),
            None => Ok(None),
        }
    }

    fn workspace_key_exists(&self, key: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM workspaces WHERE key = ?1);",
            [key],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create_workspace(&self, workspace: &Workspace) -> RepoResult<WorkspaceId> {
        workspace.validate()?;
        self.conn.execute(
            "INSERT INTO workspaces (id, name, key, owner_user_id, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                workspace.id.to_string(),
                workspace.name.as_str(),
                workspace.key.as_str(),
                workspace.owner_user_id.to_string(),
                bool_to_int(workspace.is_deleted),
            ],
        )?;
        Ok(workspace.id)
    }

    fn get_workspace(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, key, owner_user_id, is_deleted
             FROM workspaces
             WHERE id = ?1 AND is_deleted = 0;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_workspace_row(row)?));
        }
        Ok(None)
    }

    fn list_workspaces(&self, owner: Option<UserId>) -> RepoResult<Vec<Workspace>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, key, owner_user_id, is_deleted
             FROM workspaces
             WHERE is_deleted = 0
               AND (?1 IS NULL OR owner_user_id = ?1)
             ORDER BY name COLLATE NOCASE ASC, id ASC;",
        )?;
        let mut rows = stmt.query([owner.map(|id| id.to_string())])?;
        let mut workspaces = Vec::new();
        while let Some(row) = rows.next()? {
            workspaces.push(parse_workspace_row(row)?);
        }
        Ok(workspaces)
    }

    fn employee_code_exists(&self, workspace_id: WorkspaceId, code: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM employees WHERE workspace_id = ?1 AND employee_code = ?2
            );",
            params![workspace_id.to_string(), code],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create_employee(&self, employee: &Employee) -> RepoResult<EmployeeId> {
        employee.validate()?;
        self.conn.execute(
            "INSERT INTO employees (
                id,
                workspace_id,
                user_id,
                employee_code,
                first_name,
                last_name,
                email,
                position,
                department,
                hire_date,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                employee.id.to_string(),
                employee.workspace_id.to_string(),
                employee.user_id.map(|id| id.to_string()),
                employee.employee_code.as_str(),
                employee.first_name.as_str(),
                employee.last_name.as_str(),
                employee.email.as_deref(),
                employee.position.as_deref(),
                employee.department.as_deref(),
                optional_date_to_db(employee.hire_date),
                employee.status.as_str(),
            ],
        )?;
        Ok(employee.id)
    }

    fn update_employee(&self, employee: &Employee) -> RepoResult<()> {
        employee.validate()?;
        let changed = self.conn.execute(
            "UPDATE employees
             SET
                user_id = ?1,
                employee_code = ?2,
                first_name = ?3,
                last_name = ?4,
                email = ?5,
                position = ?6,
                department = ?7,
                hire_date = ?8,
                status = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?10 AND workspace_id = ?11;",
            params![
                employee.user_id.map(|id| id.to_string()),
                employee.employee_code.as_str(),
                employee.first_name.as_str(),
                employee.last_name.as_str(),
                employee.email.as_deref(),
                employee.position.as_deref(),
                employee.department.as_deref(),
                employee.hire_date.map(date_to_db),
                employee.status.as_str(),
                employee.id.to_string(),
                employee.workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("employee", employee.id));
        }
        Ok(())
    }

    fn get_employee(
        &self,
        workspace_id: WorkspaceId,
        id: EmployeeId,
    ) -> RepoResult<Option<Employee>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EMPLOYEE_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2;"
        ))?;
        let mut rows = stmt.query([id.to_string(), workspace_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_employee_row(row)?));
        }
        Ok(None)
    }

    fn list_employees(
        &self,
        workspace_id: WorkspaceId,
        query: &EmployeeListQuery,
    ) -> RepoResult<Vec<Employee>> {
        let mut sql = format!("{EMPLOYEE_SELECT_SQL} WHERE workspace_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(workspace_id.to_string())];

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(department) = query.department.as_deref() {
            sql.push_str(" AND department = ? COLLATE NOCASE");
            bind_values.push(Value::Text(department.to_string()));
        }
        if let Some(term) = query.search.as_deref().filter(|term| !term.trim().is_empty()) {
            sql.push_str(
                " AND (employee_code LIKE ? ESCAPE '\\'
                   OR first_name LIKE ? ESCAPE '\\'
                   OR last_name LIKE ? ESCAPE '\\'
                   OR email LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(term);
            for _ in 0..4 {
                bind_values.push(Value::Text(pattern.clone()));
            }
        }
        sql.push_str(" ORDER BY last_name COLLATE NOCASE ASC, first_name COLLATE NOCASE ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut employees = Vec::new();
        while let Some(row) = rows.next()? {
            employees.push(parse_employee_row(row)?);
        }
        Ok(employees)
    }
}

fn parse_workspace_row(row: &Row<'_>) -> RepoResult<Workspace> {
    let id: String = row.get(0)?;
    let owner: String = row.get(3)?;
    let is_deleted: i64 = row.get(4)?;
    Ok(Workspace {
        id: parse_uuid(&id, "workspaces.id")?,
        name: row.get(1)?,
        key: row.get(2)?,
        owner_user_id: parse_uuid(&owner, "workspaces.owner_user_id")?,
        is_deleted: parse_bool(is_deleted, "workspaces.is_deleted")?,
    })
}

fn parse_employee_row(row: &Row<'_>) -> RepoResult<Employee> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let status: String = row.get(10)?;
    Ok(Employee {
        id: parse_uuid(&id, "employees.id")?,
        workspace_id: parse_uuid(&workspace_id, "employees.workspace_id")?,
        user_id: parse_optional_uuid(row.get(2)?, "employees.user_id")?,
        employee_code: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        email: row.get(6)?,
        position: row.get(7)?,
        department: row.get(8)?,
        hire_date: parse_optional_date(row.get(9)?, "employees.hire_date")?,
        status: EmployeeStatus::parse(&status).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid employees.status `{status}`"))
        })?,
    })
}

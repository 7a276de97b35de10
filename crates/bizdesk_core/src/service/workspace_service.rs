//! User, workspace and employee use-cases.
//!
//! # Responsibility
//! - Register users and open workspaces with generated keys.
//! - Manage the employee directory of a workspace.
//!
//! # Invariants
//! - Workspace keys are unique; collisions get the smallest numeric suffix.
//! - Generated employee codes follow `EMP-nnnnnn`.
//! - Deactivation is a status change (`terminated`), never a row delete.

use crate::model::workspace::{Employee, EmployeeStatus, User, Workspace};
use crate::model::{normalize_optional, EmployeeId, UserId, ValidationError, WorkspaceId};
use crate::repo::workspace_repo::{EmployeeListQuery, WorkspaceRepository};
use crate::repo::RepoError;
use crate::util::{generate_project_key, random_number, unique_project_key};
use chrono::NaiveDate;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static EMPLOYEE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,31}$").expect("valid code regex"));

const EMPLOYEE_CODE_PREFIX: &str = "EMP-";
const EMPLOYEE_CODE_DIGITS: u32 = 6;
const EMPLOYEE_CODE_ATTEMPTS: usize = 16;

#[derive(Debug)]
pub enum WorkspaceServiceError {
    Validation(ValidationError),
    EmailTaken(String),
    UserNotFound(String),
    WorkspaceNotFound(String),
    EmployeeNotFound(String),
    DuplicateEmployeeCode(String),
    /// Random code space kept colliding.
    CodeGenerationExhausted,
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for WorkspaceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::EmailTaken(email) => write!(f, "email already registered: {email}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::WorkspaceNotFound(id) => write!(f, "workspace not found: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "employee not found: {id}"),
            Self::DuplicateEmployeeCode(code) => write!(f, "employee code already used: {code}"),
            Self::CodeGenerationExhausted => write!(f, "could not generate a free employee code"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent workspace state: {details}")
            }
        }
    }
}

impl Error for WorkspaceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for WorkspaceServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "employee",
                id,
            } => Self::EmployeeNotFound(id),
            RepoError::NotFound {
                entity: "workspace",
                id,
            } => Self::WorkspaceNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for WorkspaceServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Input for [`WorkspaceService::add_employee`].
#[derive(Debug, Clone, Default)]
pub struct NewEmployee {
    /// Generated as `EMP-nnnnnn` when absent.
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub user_id: Option<UserId>,
}

pub struct WorkspaceService<R: WorkspaceRepository> {
    repo: R,
}

impl<R: WorkspaceRepository> WorkspaceService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn register_user(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<User, WorkspaceServiceError> {
        let user = User::new(name, email);
        user.validate()?;
        if !EMAIL_RE.is_match(&user.email) {
            return Err(ValidationError::new("email", "must be a valid address").into());
        }
        if self.repo.find_user_by_email(&user.email)?.is_some() {
            return Err(WorkspaceServiceError::EmailTaken(user.email));
        }
        let user_id = self.repo.create_user(&user)?;
        info!("event=user_register module=service status=ok user_id={user_id}");
        self.repo
            .get_user(user_id)?
            .ok_or(WorkspaceServiceError::InconsistentState(
                "registered user not found in read-back",
            ))
    }

    /// Opens a workspace owned by `owner_user_id`.
    ///
    /// The key is derived from the name and suffixed on collision
    /// (`ACME` -> `ACME2`).
    pub fn create_workspace(
        &self,
        owner_user_id: UserId,
        name: impl Into<String>,
    ) -> Result<Workspace, WorkspaceServiceError> {
        let name = name.into().trim().to_string();
        if self.repo.get_user(owner_user_id)?.is_none() {
            return Err(WorkspaceServiceError::UserNotFound(
                owner_user_id.to_string(),
            ));
        }
        let base = generate_project_key(&name, crate::util::project_key::MAX_KEY_LEN);
        let key = unique_project_key(&base, |candidate| self.repo.workspace_key_exists(candidate))?;
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name,
            key,
            owner_user_id,
            is_deleted: false,
        };
        let workspace_id = self.repo.create_workspace(&workspace)?;
        info!(
            "event=workspace_create module=service status=ok workspace_id={workspace_id} key={}",
            workspace.key
        );
        self.repo
            .get_workspace(workspace_id)?
            .ok_or(WorkspaceServiceError::InconsistentState(
                "created workspace not found in read-back",
            ))
    }

    pub fn get_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Workspace, WorkspaceServiceError> {
        self.repo
            .get_workspace(workspace_id)?
            .ok_or_else(|| WorkspaceServiceError::WorkspaceNotFound(workspace_id.to_string()))
    }

    pub fn list_workspaces(
        &self,
        owner: Option<UserId>,
    ) -> Result<Vec<Workspace>, WorkspaceServiceError> {
        Ok(self.repo.list_workspaces(owner)?)
    }

    pub fn add_employee(
        &self,
        workspace_id: WorkspaceId,
        input: NewEmployee,
    ) -> Result<Employee, WorkspaceServiceError> {
        self.get_workspace(workspace_id)?;
        let code = match normalize_optional(input.employee_code) {
            Some(code) => {
                if !EMPLOYEE_CODE_RE.is_match(&code) {
                    return Err(ValidationError::new(
                        "employee_code",
                        "must be 1-32 letters, digits, `-` or `_`",
                    )
                    .into());
                }
                if self.repo.employee_code_exists(workspace_id, &code)? {
                    return Err(WorkspaceServiceError::DuplicateEmployeeCode(code));
                }
                code
            }
            None => self.generate_employee_code(workspace_id)?,
        };

        let mut employee = Employee::new(
            workspace_id,
            code,
            input.first_name.trim(),
            input.last_name.trim(),
        );
        employee.email = normalize_optional(input.email).map(|email| email.to_ascii_lowercase());
        employee.position = normalize_optional(input.position);
        employee.department = normalize_optional(input.department);
        employee.hire_date = input.hire_date;
        employee.user_id = input.user_id;

        let employee_id = self.repo.create_employee(&employee)?;
        info!(
            "event=employee_add module=service status=ok workspace_id={workspace_id} employee_id={employee_id}"
        );
        self.read_back(workspace_id, employee_id, "created employee not found in read-back")
    }

    /// Full replacement of employee fields; the code stays unique.
    pub fn update_employee(&self, employee: &Employee) -> Result<Employee, WorkspaceServiceError> {
        let stored = self.get_employee(employee.workspace_id, employee.id)?;
        if stored.employee_code != employee.employee_code
            && self
                .repo
                .employee_code_exists(employee.workspace_id, &employee.employee_code)?
        {
            return Err(WorkspaceServiceError::DuplicateEmployeeCode(
                employee.employee_code.clone(),
            ));
        }
        self.repo.update_employee(employee)?;
        self.read_back(
            employee.workspace_id,
            employee.id,
            "updated employee not found in read-back",
        )
    }

    pub fn get_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> Result<Employee, WorkspaceServiceError> {
        self.repo
            .get_employee(workspace_id, employee_id)?
            .ok_or_else(|| WorkspaceServiceError::EmployeeNotFound(employee_id.to_string()))
    }

    pub fn list_employees(
        &self,
        workspace_id: WorkspaceId,
        query: &EmployeeListQuery,
    ) -> Result<Vec<Employee>, WorkspaceServiceError> {
        Ok(self.repo.list_employees(workspace_id, query)?)
    }

    /// Marks an employee terminated; idempotent.
    pub fn deactivate_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> Result<Employee, WorkspaceServiceError> {
        let mut employee = self.get_employee(workspace_id, employee_id)?;
        if employee.status == EmployeeStatus::Terminated {
            return Ok(employee);
        }
        employee.status = EmployeeStatus::Terminated;
        self.repo.update_employee(&employee)?;
        info!(
            "event=employee_deactivate module=service status=ok workspace_id={workspace_id} employee_id={employee_id}"
        );
        self.read_back(
            workspace_id,
            employee_id,
            "deactivated employee not found in read-back",
        )
    }

    fn generate_employee_code(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<String, WorkspaceServiceError> {
        for _ in 0..EMPLOYEE_CODE_ATTEMPTS {
            let code = format!(
                "{EMPLOYEE_CODE_PREFIX}{}",
                random_number(EMPLOYEE_CODE_DIGITS)
            );
            if !self.repo.employee_code_exists(workspace_id, &code)? {
                return Ok(code);
            }
        }
        Err(WorkspaceServiceError::CodeGenerationExhausted)
    }

    fn read_back(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
        details: &'static str,
    ) -> Result<Employee, WorkspaceServiceError> {
        self.repo
            .get_employee(workspace_id, employee_id)?
            .ok_or(WorkspaceServiceError::InconsistentState(details))
    }
}

#[cfg(test)]
mod tests {
    use super::{EMAIL_RE, EMPLOYEE_CODE_RE};

    #[test]
    fn email_pattern() {
        assert!(EMAIL_RE.is_match("ada@example.com"));
        assert!(!EMAIL_RE.is_match("ada@example"));
        assert!(!EMAIL_RE.is_match("ada example@x.io"));
    }

    #[test]
    fn employee_code_pattern() {
        assert!(EMPLOYEE_CODE_RE.is_match("EMP-000123"));
        assert!(EMPLOYEE_CODE_RE.is_match("ops_7"));
        assert!(!EMPLOYEE_CODE_RE.is_match("-lead"));
        assert!(!EMPLOYEE_CODE_RE.is_match("has space"));
    }
}

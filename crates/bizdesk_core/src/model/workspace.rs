//! Tenant, user and employee records.
//!
//! # Invariants
//! - User email is stored lowercase and must contain `@`.
//! - Workspace key is uppercase ASCII alphanumeric, 2..=10 chars.
//! - Employee code is unique inside one workspace.

use crate::model::{require_text, EmployeeId, UserId, ValidationError, WorkspaceId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application user that can own workspaces, vaults and achievements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            email: email.into().trim().to_ascii_lowercase(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        if !self.email.contains('@') || self.email.starts_with('@') || self.email.ends_with('@') {
            return Err(ValidationError::new("email", "must be a valid address"));
        }
        Ok(())
    }
}

/// Tenant boundary for every business record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub key: String,
    pub owner_user_id: UserId,
    pub is_deleted: bool,
}

impl Workspace {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        let key_len = self.key.chars().count();
        if !(2..=10).contains(&key_len)
            || !self
                .key
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(ValidationError::new(
                "key",
                "must be 2-10 uppercase letters or digits",
            ));
        }
        Ok(())
    }
}

/// Employment state of an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    OnLeave,
    Terminated,
}

impl EmployeeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnLeave => "on_leave",
            Self::Terminated => "terminated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "on_leave" => Some(Self::OnLeave),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }
}

/// Person employed inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub workspace_id: WorkspaceId,
    pub user_id: Option<UserId>,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: EmployeeStatus,
}

impl Employee {
    pub fn new(
        workspace_id: WorkspaceId,
        employee_code: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            user_id: None,
            employee_code: employee_code.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            position: None,
            department: None,
            hire_date: None,
            status: EmployeeStatus::Active,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status != EmployeeStatus::Terminated
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("employee_code", &self.employee_code)?;
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        if let Some(email) = self.email.as_deref() {
            if !email.contains('@') {
                return Err(ValidationError::new("email", "must be a valid address"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Employee, User, Workspace};
    use uuid::Uuid;

    #[test]
    fn user_email_is_lowercased() {
        let user = User::new(" Ada ", "Ada@Example.COM ");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn workspace_key_must_be_uppercase_alnum() {
        let mut workspace = Workspace {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            key: "AC".to_string(),
            owner_user_id: Uuid::new_v4(),
            is_deleted: false,
        };
        assert!(workspace.validate().is_ok());
        workspace.key = "ac".to_string();
        assert!(workspace.validate().is_err());
        workspace.key = "A".to_string();
        assert!(workspace.validate().is_err());
    }

    #[test]
    fn employee_requires_names() {
        let employee = Employee::new(Uuid::new_v4(), "EMP-1", "", "Lovelace");
        assert_eq!(employee.validate().unwrap_err().field, "first_name");
    }
}

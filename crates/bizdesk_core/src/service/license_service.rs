//! Software license pool and seat use-cases.
//!
//! # Invariants
//! - `0 <= used_licenses <= total_licenses` for every pool.
//! - An employee holds at most one open seat per pool.

use crate::model::license::{LicenseAssignment, LicenseId, SoftwareLicense};
use crate::model::{money_sum, EmployeeId, Money, ValidationError, WorkspaceId};
use crate::repo::license_repo::{LicenseListQuery, LicenseRepository, SeatAssignOutcome};
use crate::repo::RepoError;
use chrono::{Duration, NaiveDate};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub const DEFAULT_LICENSE_WARNING_DAYS: u32 = 30;

#[derive(Debug)]
pub enum LicenseServiceError {
    Validation(ValidationError),
    LicenseNotFound(String),
    EmployeeNotFound(String),
    NoSeatsAvailable(LicenseId),
    AlreadyAssigned {
        license_id: LicenseId,
        employee_id: EmployeeId,
    },
    NotAssigned {
        license_id: LicenseId,
        employee_id: EmployeeId,
    },
    /// Shrinking the pool below the seats in use.
    TotalBelowUsed {
        total: u32,
        used: u32,
    },
    SeatsInUse(LicenseId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for LicenseServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::LicenseNotFound(id) => write!(f, "license not found: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "active employee not found: {id}"),
            Self::NoSeatsAvailable(id) => write!(f, "no seats available on license {id}"),
            Self::AlreadyAssigned {
                license_id,
                employee_id,
            } => write!(
                f,
                "employee {employee_id} already holds a seat on license {license_id}"
            ),
            Self::NotAssigned {
                license_id,
                employee_id,
            } => write!(
                f,
                "employee {employee_id} holds no seat on license {license_id}"
            ),
            Self::TotalBelowUsed { total, used } => write!(
                f,
                "total_licenses {total} is below {used} seats in use"
            ),
            Self::SeatsInUse(id) => write!(f, "license {id} still has seats in use"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent license state: {details}")
            }
        }
    }
}

impl Error for LicenseServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for LicenseServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for LicenseServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "license",
                id,
            } => Self::LicenseNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Seat usage across all live pools of a workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LicenseUtilization {
    pub pools: u32,
    pub total_seats: u64,
    pub used_seats: u64,
    pub available_seats: u64,
    /// Cost of every seat in every pool, minor units.
    pub total_cost: Money,
    /// `used / total * 100`, two decimals; `0` without seats.
    pub utilization_percent: f64,
}

pub struct LicenseService<R: LicenseRepository> {
    repo: R,
    warning_days: u32,
}

impl<R: LicenseRepository> LicenseService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            warning_days: DEFAULT_LICENSE_WARNING_DAYS,
        }
    }

    pub fn with_warning_days(mut self, days: u32) -> Self {
        self.warning_days = days;
        self
    }

    /// Registers a pool with every seat free.
    pub fn create_license(
        &self,
        mut license: SoftwareLicense,
    ) -> Result<SoftwareLicense, LicenseServiceError> {
        license.used_licenses = 0;
        license.is_deleted = false;
        let id = self.repo.create_license(&license)?;
        info!(
            "event=license_create module=service status=ok workspace_id={} license_id={id} seats={}",
            license.workspace_id, license.total_licenses
        );
        self.read_back(license.workspace_id, id, "created license not found in read-back")
    }

    /// Updates pool metadata; seat usage is owned by assign/revoke.
    pub fn update_license(
        &self,
        license: &SoftwareLicense,
    ) -> Result<SoftwareLicense, LicenseServiceError> {
        let stored = self.get_license(license.workspace_id, license.id)?;
        if license.total_licenses < stored.used_licenses {
            return Err(LicenseServiceError::TotalBelowUsed {
                total: license.total_licenses,
                used: stored.used_licenses,
            });
        }
        let mut next = license.clone();
        next.used_licenses = stored.used_licenses;
        self.repo.update_license(&next).map_err(|err| match err {
            RepoError::Conflict(_) => LicenseServiceError::TotalBelowUsed {
                total: next.total_licenses,
                used: stored.used_licenses,
            },
            other => other.into(),
        })?;
        self.read_back(license.workspace_id, license.id, "updated license not found in read-back")
    }

    pub fn get_license(
        &self,
        workspace_id: WorkspaceId,
        id: LicenseId,
    ) -> Result<SoftwareLicense, LicenseServiceError> {
        self.repo
            .get_license(workspace_id, id)?
            .ok_or_else(|| LicenseServiceError::LicenseNotFound(id.to_string()))
    }

    pub fn list_licenses(
        &self,
        workspace_id: WorkspaceId,
        query: &LicenseListQuery,
    ) -> Result<Vec<SoftwareLicense>, LicenseServiceError> {
        Ok(self.repo.list_licenses(workspace_id, query)?)
    }

    pub fn soft_delete_license(
        &self,
        workspace_id: WorkspaceId,
        id: LicenseId,
    ) -> Result<(), LicenseServiceError> {
        self.repo
            .soft_delete_license(workspace_id, id)
            .map_err(|err| match err {
                RepoError::Conflict(_) => LicenseServiceError::SeatsInUse(id),
                other => other.into(),
            })?;
        info!("event=license_delete module=service status=ok workspace_id={workspace_id} license_id={id}");
        Ok(())
    }

    /// Gives `employee_id` one seat of the pool.
    pub fn assign_license(
        &self,
        workspace_id: WorkspaceId,
        license_id: LicenseId,
        employee_id: EmployeeId,
        assigned_on: NaiveDate,
    ) -> Result<LicenseAssignment, LicenseServiceError> {
        if !self.repo.employee_is_active(workspace_id, employee_id)? {
            return Err(LicenseServiceError::EmployeeNotFound(employee_id.to_string()));
        }
        let assignment = LicenseAssignment {
            id: Uuid::new_v4(),
            license_id,
            employee_id,
            assigned_on,
            revoked_on: None,
        };
        match self.repo.assign_seat(workspace_id, &assignment)? {
            SeatAssignOutcome::Assigned => {
                info!(
                    "event=license_assign module=service status=ok workspace_id={workspace_id} license_id={license_id} employee_id={employee_id}"
                );
                Ok(assignment)
            }
            SeatAssignOutcome::NoSeatsAvailable => {
                warn!(
                    "event=license_assign module=service status=rejected reason=no_seats license_id={license_id}"
                );
                Err(LicenseServiceError::NoSeatsAvailable(license_id))
            }
            SeatAssignOutcome::AlreadyAssigned => Err(LicenseServiceError::AlreadyAssigned {
                license_id,
                employee_id,
            }),
        }
    }

    /// Closes the employee's seat and frees it for reuse.
    pub fn revoke_license(
        &self,
        workspace_id: WorkspaceId,
        license_id: LicenseId,
        employee_id: EmployeeId,
        revoked_on: NaiveDate,
    ) -> Result<LicenseAssignment, LicenseServiceError> {
        self.get_license(workspace_id, license_id)?;
        let assignment = self
            .repo
            .revoke_seat(workspace_id, license_id, employee_id, revoked_on)
            .map_err(|err| match err {
                RepoError::NotFound {
                    entity: "license assignment",
                    ..
                } => LicenseServiceError::NotAssigned {
                    license_id,
                    employee_id,
                },
                RepoError::Conflict(message) => LicenseServiceError::Validation(
                    ValidationError::new("revoked_on", message),
                ),
                other => other.into(),
            })?;
        info!(
            "event=license_revoke module=service status=ok workspace_id={workspace_id} license_id={license_id} employee_id={employee_id}"
        );
        Ok(assignment)
    }

    pub fn seat_holders(
        &self,
        workspace_id: WorkspaceId,
        license_id: LicenseId,
    ) -> Result<Vec<LicenseAssignment>, LicenseServiceError> {
        self.get_license(workspace_id, license_id)?;
        Ok(self.repo.active_assignments(workspace_id, license_id)?)
    }

    pub fn licenses_for_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> Result<Vec<SoftwareLicense>, LicenseServiceError> {
        Ok(self.repo.licenses_for_employee(workspace_id, employee_id)?)
    }

    /// Pools expired or expiring within the warning window of `today`.
    pub fn expiring_licenses(
        &self,
        workspace_id: WorkspaceId,
        today: NaiveDate,
    ) -> Result<Vec<SoftwareLicense>, LicenseServiceError> {
        let until = today + Duration::days(i64::from(self.warning_days));
        Ok(self.repo.list_expiring(workspace_id, until)?)
    }

    pub fn utilization_summary(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<LicenseUtilization, LicenseServiceError> {
        let licenses = self
            .repo
            .list_licenses(workspace_id, &LicenseListQuery::default())?;
        let mut summary = LicenseUtilization::default();
        for license in &licenses {
            summary.pools += 1;
            summary.total_seats += u64::from(license.total_licenses);
            summary.used_seats += u64::from(license.used_licenses);
            summary.available_seats += u64::from(license.available_licenses());
            summary.total_cost =
                money_sum("total_cost", [summary.total_cost, license.total_cost()?])?;
        }
        if summary.total_seats > 0 {
            let ratio = summary.used_seats as f64 / summary.total_seats as f64;
            summary.utilization_percent = (ratio * 10_000.0).round() / 100.0;
        }
        Ok(summary)
    }

    fn read_back(
        &self,
        workspace_id: WorkspaceId,
        id: LicenseId,
        details: &'static str,
    ) -> Result<SoftwareLicense, LicenseServiceError> {
        self.repo
            .get_license(workspace_id, id)?
            .ok_or(LicenseServiceError::InconsistentState(details))
    }
}

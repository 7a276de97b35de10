//! Certification catalog and employee certificate use-cases.

use crate::model::certification::{
    Certification, CertificationId, CertificationStatus, EmployeeCertification,
};
use crate::model::{normalize_optional, EmployeeId, ValidationError, WorkspaceId};
use crate::repo::certification_repo::{AwardListQuery, CertificationRepository};
use crate::repo::RepoError;
use chrono::{Duration, NaiveDate};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub const DEFAULT_CERTIFICATION_WARNING_DAYS: u32 = 30;

#[derive(Debug)]
pub enum CertificationServiceError {
    Validation(ValidationError),
    CertificationNotFound(String),
    AwardNotFound(String),
    EmployeeNotFound(String),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for CertificationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CertificationNotFound(id) => write!(f, "certification not found: {id}"),
            Self::AwardNotFound(id) => write!(f, "employee certification not found: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "active employee not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent certification state: {details}")
            }
        }
    }
}

impl Error for CertificationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CertificationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "certification",
                id,
            } => Self::CertificationNotFound(id),
            RepoError::NotFound {
                entity: "employee certification",
                id,
            } => Self::AwardNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Certificate plus its validity on the reference date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateView {
    pub award: EmployeeCertification,
    pub status: CertificationStatus,
}

pub struct CertificationService<R: CertificationRepository> {
    repo: R,
    warning_days: u32,
}

impl<R: CertificationRepository> CertificationService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            warning_days: DEFAULT_CERTIFICATION_WARNING_DAYS,
        }
    }

    pub fn with_warning_days(mut self, days: u32) -> Self {
        self.warning_days = days;
        self
    }

    pub fn create_certification(
        &self,
        certification: &Certification,
    ) -> Result<Certification, CertificationServiceError> {
        let id = self.repo.create_certification(certification)?;
        self.get_certification(certification.workspace_id, id)
    }

    pub fn update_certification(
        &self,
        certification: &Certification,
    ) -> Result<Certification, CertificationServiceError> {
        self.repo.update_certification(certification)?;
        self.get_certification(certification.workspace_id, certification.id)
    }

    pub fn get_certification(
        &self,
        workspace_id: WorkspaceId,
        id: CertificationId,
    ) -> Result<Certification, CertificationServiceError> {
        self.repo
            .get_certification(workspace_id, id)?
            .ok_or_else(|| CertificationServiceError::CertificationNotFound(id.to_string()))
    }

    pub fn list_certifications(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Certification>, CertificationServiceError> {
        Ok(self.repo.list_certifications(workspace_id)?)
    }

    pub fn delete_certification(
        &self,
        workspace_id: WorkspaceId,
        id: CertificationId,
    ) -> Result<(), CertificationServiceError> {
        Ok(self.repo.soft_delete_certification(workspace_id, id)?)
    }

    /// Records a certificate for an employee.
    ///
    /// Without an explicit `expires_on`, expiry follows the catalog's
    /// `validity_months` (or never, when unset).
    pub fn award_certification(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
        certification_id: CertificationId,
        issued_on: NaiveDate,
        expires_on: Option<NaiveDate>,
        credential_id: Option<String>,
    ) -> Result<EmployeeCertification, CertificationServiceError> {
        let certification = self.get_certification(workspace_id, certification_id)?;
        if !self.repo.employee_is_active(workspace_id, employee_id)? {
            return Err(CertificationServiceError::EmployeeNotFound(
                employee_id.to_string(),
            ));
        }
        let award = EmployeeCertification {
            id: Uuid::new_v4(),
            workspace_id,
            employee_id,
            certification_id,
            issued_on,
            expires_on: expires_on.or_else(|| certification.expiry_for(issued_on)),
            credential_id: normalize_optional(credential_id),
        };
        let id = self.repo.create_award(&award)?;
        info!(
            "event=certification_award module=service status=ok workspace_id={workspace_id} employee_id={employee_id} certification_id={certification_id}"
        );
        self.get_award(workspace_id, id)
    }

    /// Re-issues a certificate on `issued_on`, recomputing its expiry.
    pub fn renew(
        &self,
        workspace_id: WorkspaceId,
        award_id: Uuid,
        issued_on: NaiveDate,
        expires_on: Option<NaiveDate>,
    ) -> Result<EmployeeCertification, CertificationServiceError> {
        let mut award = self.get_award(workspace_id, award_id)?;
        let certification = self.get_certification(workspace_id, award.certification_id)?;
        award.issued_on = issued_on;
        award.expires_on = expires_on.or_else(|| certification.expiry_for(issued_on));
        self.repo.update_award(&award)?;
        info!(
            "event=certification_renew module=service status=ok workspace_id={workspace_id} award_id={award_id}"
        );
        self.get_award(workspace_id, award_id)
    }

    pub fn get_award(
        &self,
        workspace_id: WorkspaceId,
        award_id: Uuid,
    ) -> Result<EmployeeCertification, CertificationServiceError> {
        self.repo
            .get_award(workspace_id, award_id)?
            .ok_or_else(|| CertificationServiceError::AwardNotFound(award_id.to_string()))
    }

    pub fn revoke_award(
        &self,
        workspace_id: WorkspaceId,
        award_id: Uuid,
    ) -> Result<(), CertificationServiceError> {
        Ok(self.repo.soft_delete_award(workspace_id, award_id)?)
    }

    pub fn certification_status(
        &self,
        workspace_id: WorkspaceId,
        award_id: Uuid,
        today: NaiveDate,
    ) -> Result<CertificationStatus, CertificationServiceError> {
        let award = self.get_award(workspace_id, award_id)?;
        Ok(award.status(today, self.warning_days))
    }

    /// Certificates expired or expiring inside the warning window.
    pub fn expiring_certifications(
        &self,
        workspace_id: WorkspaceId,
        today: NaiveDate,
    ) -> Result<Vec<CertificateView>, CertificationServiceError> {
        let until = today + Duration::days(i64::from(self.warning_days));
        Ok(self
            .repo
            .list_awards_expiring(workspace_id, until)?
            .into_iter()
            .map(|award| self.view(award, today))
            .collect())
    }

    pub fn list_for_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
        today: NaiveDate,
    ) -> Result<Vec<CertificateView>, CertificationServiceError> {
        let query = AwardListQuery {
            employee_id: Some(employee_id),
            certification_id: None,
        };
        Ok(self
            .repo
            .list_awards(workspace_id, &query)?
            .into_iter()
            .map(|award| self.view(award, today))
            .collect())
    }

    fn view(&self, award: EmployeeCertification, today: NaiveDate) -> CertificateView {
        CertificateView {
            status: award.status(today, self.warning_days),
            award,
        }
    }
}

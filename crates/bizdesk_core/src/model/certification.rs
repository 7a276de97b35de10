//! Certification catalog and employee certificates.

use crate::model::{require_text, EmployeeId, ValidationError, WorkspaceId};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CertificationId = Uuid;

/// Catalog entry for a certificate type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    pub id: CertificationId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub issuing_organization: String,
    /// `None` means the certificate never expires.
    pub validity_months: Option<u32>,
    pub description: Option<String>,
}

impl Certification {
    pub fn new(
        workspace_id: WorkspaceId,
        name: impl Into<String>,
        issuing_organization: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.into(),
            issuing_organization: issuing_organization.into(),
            validity_months: None,
            description: None,
        }
    }

    /// Default expiry for a certificate issued on `issued_on`.
    pub fn expiry_for(&self, issued_on: NaiveDate) -> Option<NaiveDate> {
        self.validity_months
            .and_then(|months| issued_on.checked_add_months(Months::new(months)))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("issuing_organization", &self.issuing_organization)?;
        if self.validity_months == Some(0) {
            return Err(ValidationError::new(
                "validity_months",
                "must be positive when set",
            ));
        }
        Ok(())
    }
}

/// Validity classification of an employee certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
    Active,
    ExpiringSoon,
    Expired,
    NoExpiry,
}

/// Certificate held by one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeCertification {
    pub id: Uuid,
    pub workspace_id: WorkspaceId,
    pub employee_id: EmployeeId,
    pub certification_id: CertificationId,
    pub issued_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub credential_id: Option<String>,
}

impl EmployeeCertification {
    pub fn status(&self, today: NaiveDate, warning_days: u32) -> CertificationStatus {
        match self.expires_on {
            None => CertificationStatus::NoExpiry,
            Some(expiry) if expiry < today => CertificationStatus::Expired,
            Some(expiry) if (expiry - today).num_days() <= i64::from(warning_days) => {
                CertificationStatus::ExpiringSoon
            }
            Some(_) => CertificationStatus::Active,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(expiry) = self.expires_on {
            if expiry < self.issued_on {
                return Err(ValidationError::new(
                    "expires_on",
                    "must not be earlier than issued_on",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Certification, CertificationStatus, EmployeeCertification};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn expiry_adds_validity_months() {
        let mut cert = Certification::new(Uuid::new_v4(), "AWS SA", "Amazon");
        assert_eq!(cert.expiry_for(date(2024, 1, 31)), None);
        cert.validity_months = Some(1);
        assert_eq!(cert.expiry_for(date(2024, 1, 31)), Some(date(2024, 2, 29)));
    }

    #[test]
    fn status_reflects_reference_date() {
        let held = EmployeeCertification {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            certification_id: Uuid::new_v4(),
            issued_on: date(2023, 1, 1),
            expires_on: Some(date(2025, 1, 1)),
            credential_id: None,
        };
        assert_eq!(held.status(date(2024, 6, 1), 30), CertificationStatus::Active);
        assert_eq!(
            held.status(date(2024, 12, 15), 30),
            CertificationStatus::ExpiringSoon
        );
        assert_eq!(held.status(date(2025, 1, 2), 30), CertificationStatus::Expired);
    }
}

//! Software license pools and seat assignments.
//!
//! # Invariants
//! - `0 <= used_licenses <= total_licenses` and `total_licenses >= 1`.
//! - One open assignment per (license, employee).

use crate::model::{
    require_non_negative, require_text, EmployeeId, Money, ValidationError, WorkspaceId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type LicenseId = Uuid;

/// Seat-counted software license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareLicense {
    pub id: LicenseId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub vendor: Option<String>,
    pub license_key: Option<String>,
    pub total_licenses: u32,
    pub used_licenses: u32,
    pub cost_per_license: Money,
    pub purchase_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub is_deleted: bool,
}

impl SoftwareLicense {
    pub fn new(workspace_id: WorkspaceId, name: impl Into<String>, total_licenses: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.into(),
            vendor: None,
            license_key: None,
            total_licenses,
            used_licenses: 0,
            cost_per_license: 0,
            purchase_date: None,
            expiry_date: None,
            notes: None,
            is_deleted: false,
        }
    }

    /// Seats still free for assignment.
    pub fn available_licenses(&self) -> u32 {
        self.total_licenses.saturating_sub(self.used_licenses)
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    /// Total cost of all seats in the pool.
    pub fn total_cost(&self) -> Result<Money, ValidationError> {
        self.cost_per_license
            .checked_mul(Money::from(self.total_licenses))
            .ok_or_else(|| ValidationError::new("cost_per_license", "amount too large"))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_non_negative("cost_per_license", self.cost_per_license)?;
        self.total_cost()?;
        if self.total_licenses == 0 {
            return Err(ValidationError::new(
                "total_licenses",
                "must be at least 1",
            ));
        }
        if self.used_licenses > self.total_licenses {
            return Err(ValidationError::new(
                "used_licenses",
                format!(
                    "{} exceeds total_licenses {}",
                    self.used_licenses, self.total_licenses
                ),
            ));
        }
        if let (Some(purchased), Some(expiry)) = (self.purchase_date, self.expiry_date) {
            if expiry < purchased {
                return Err(ValidationError::new(
                    "expiry_date",
                    "must not be earlier than purchase_date",
                ));
            }
        }
        Ok(())
    }
}

/// Seat held by one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseAssignment {
    pub id: Uuid,
    pub license_id: LicenseId,
    pub employee_id: EmployeeId,
    pub assigned_on: NaiveDate,
    pub revoked_on: Option<NaiveDate>,
}

impl LicenseAssignment {
    pub fn is_active(&self) -> bool {
        self.revoked_on.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::SoftwareLicense;
    use uuid::Uuid;

    #[test]
    fn available_is_total_minus_used() {
        let mut license = SoftwareLicense::new(Uuid::new_v4(), "IDE", 5);
        license.used_licenses = 3;
        assert_eq!(license.available_licenses(), 2);
        assert!(license.validate().is_ok());
    }

    #[test]
    fn used_above_total_is_invalid() {
        let mut license = SoftwareLicense::new(Uuid::new_v4(), "IDE", 2);
        license.used_licenses = 3;
        assert_eq!(license.validate().unwrap_err().field, "used_licenses");
    }

    #[test]
    fn pool_cost_overflow_is_a_validation_error() {
        let mut license = SoftwareLicense::new(Uuid::new_v4(), "IDE", 4);
        license.cost_per_license = 12_000;
        assert_eq!(license.total_cost().unwrap(), 48_000);

        license.cost_per_license = i64::MAX / 2;
        let err = license.validate().unwrap_err();
        assert_eq!(err.field, "cost_per_license");
        assert_eq!(err.message, "amount too large");
    }

    #[test]
    fn zero_seat_pool_is_invalid() {
        let license = SoftwareLicense::new(Uuid::new_v4(), "IDE", 0);
        assert_eq!(license.validate().unwrap_err().field, "total_licenses");
    }
}

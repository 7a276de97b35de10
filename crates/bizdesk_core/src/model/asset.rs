//! Asset inventory records.
//!
//! # Invariants
//! - New assets start as `AssetStatus::Available`.
//! - `warranty_expiry` is nullable and never earlier than `purchase_date`.
//! - An asset has at most one open assignment (`returned_on = None`).

use crate::model::{
    require_non_negative, require_text, EmployeeId, Money, ValidationError, WorkspaceId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AssetId = Uuid;
pub type AssetCategoryId = Uuid;

/// Grouping for assets (laptops, monitors, vehicles...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCategory {
    pub id: AssetCategoryId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
}

impl AssetCategory {
    pub fn new(workspace_id: WorkspaceId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.into().trim().to_string(),
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)
    }
}

/// Lifecycle state of a physical asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Available,
    Assigned,
    Maintenance,
    Retired,
    Lost,
}

impl AssetStatus {
    pub const ALL: [AssetStatus; 5] = [
        Self::Available,
        Self::Assigned,
        Self::Maintenance,
        Self::Retired,
        Self::Lost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Assigned => "assigned",
            Self::Maintenance => "maintenance",
            Self::Retired => "retired",
            Self::Lost => "lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Self::Available),
            "assigned" => Some(Self::Assigned),
            "maintenance" => Some(Self::Maintenance),
            "retired" => Some(Self::Retired),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }
}

/// Warranty classification relative to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarrantyStatus {
    /// No warranty expiry recorded.
    None,
    Valid,
    /// Expires within the configured warning window.
    ExpiringSoon,
    Expired,
}

/// Tracked physical asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub workspace_id: WorkspaceId,
    pub category_id: Option<AssetCategoryId>,
    pub name: String,
    pub asset_tag: String,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Money,
    pub warranty_expiry: Option<NaiveDate>,
    pub status: AssetStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub is_deleted: bool,
}

impl Asset {
    pub fn new(
        workspace_id: WorkspaceId,
        name: impl Into<String>,
        asset_tag: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            category_id: None,
            name: name.into(),
            asset_tag: asset_tag.into(),
            serial_number: None,
            purchase_date: None,
            purchase_cost: 0,
            warranty_expiry: None,
            status: AssetStatus::Available,
            location: None,
            notes: None,
            is_deleted: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("asset_tag", &self.asset_tag)?;
        require_non_negative("purchase_cost", self.purchase_cost)?;
        if let (Some(purchased), Some(expiry)) = (self.purchase_date, self.warranty_expiry) {
            if expiry < purchased {
                return Err(ValidationError::new(
                    "warranty_expiry",
                    "must not be earlier than purchase_date",
                ));
            }
        }
        Ok(())
    }

    /// Classifies warranty state on `today` with a warning window in days.
    pub fn warranty_status(&self, today: NaiveDate, warning_days: u32) -> WarrantyStatus {
        match self.warranty_expiry {
            None => WarrantyStatus::None,
            Some(expiry) if expiry < today => WarrantyStatus::Expired,
            Some(expiry) if (expiry - today).num_days() <= i64::from(warning_days) => {
                WarrantyStatus::ExpiringSoon
            }
            Some(_) => WarrantyStatus::Valid,
        }
    }
}

/// Condition recorded when an asset comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Good,
    Fair,
    Damaged,
}

impl ReturnCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Damaged => "damaged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "good" => Some(Self::Good),
            "fair" => Some(Self::Fair),
            "damaged" => Some(Self::Damaged),
            _ => None,
        }
    }
}

/// Custody record linking one asset to one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAssignment {
    pub id: Uuid,
    pub asset_id: AssetId,
    pub employee_id: EmployeeId,
    pub assigned_on: NaiveDate,
    pub expected_return_on: Option<NaiveDate>,
    pub returned_on: Option<NaiveDate>,
    pub condition_on_return: Option<ReturnCondition>,
    pub notes: Option<String>,
}

impl AssetAssignment {
    pub fn is_open(&self) -> bool {
        self.returned_on.is_none()
    }

    /// Open assignment whose expected return date has passed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.expected_return_on.is_some_and(|due| due < today)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(expected) = self.expected_return_on {
            if expected < self.assigned_on {
                return Err(ValidationError::new(
                    "expected_return_on",
                    "must not be earlier than assigned_on",
                ));
            }
        }
        if let Some(returned) = self.returned_on {
            if returned < self.assigned_on {
                return Err(ValidationError::new(
                    "returned_on",
                    "must not be earlier than assigned_on",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Asset, AssetStatus, WarrantyStatus};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_asset_is_available() {
        let asset = Asset::new(Uuid::new_v4(), "ThinkPad", "LT-001");
        assert_eq!(asset.status, AssetStatus::Available);
    }

    #[test]
    fn warranty_status_uses_warning_window() {
        let mut asset = Asset::new(Uuid::new_v4(), "Monitor", "MN-1");
        let today = date(2025, 6, 1);
        assert_eq!(asset.warranty_status(today, 30), WarrantyStatus::None);

        asset.warranty_expiry = Some(date(2025, 6, 20));
        assert_eq!(asset.warranty_status(today, 30), WarrantyStatus::ExpiringSoon);

        asset.warranty_expiry = Some(date(2025, 9, 1));
        assert_eq!(asset.warranty_status(today, 30), WarrantyStatus::Valid);

        asset.warranty_expiry = Some(date(2025, 5, 31));
        assert_eq!(asset.warranty_status(today, 30), WarrantyStatus::Expired);
    }

    #[test]
    fn warranty_before_purchase_is_invalid() {
        let mut asset = Asset::new(Uuid::new_v4(), "Phone", "PH-1");
        asset.purchase_date = Some(date(2025, 1, 10));
        asset.warranty_expiry = Some(date(2024, 1, 10));
        assert_eq!(asset.validate().unwrap_err().field, "warranty_expiry");
    }
}

//! Asset inventory and custody use-cases.
//!
//! # Responsibility
//! - Maintain asset categories and the asset register.
//! - Hand assets out to employees and take them back.
//! - Report warranty state and inventory totals.
//!
//! # Invariants
//! - New assets always start `available`.
//! - An asset has at most one open assignment; it is `assigned` exactly
//!   while that assignment is open.
//! - Assets returned `damaged` go to `maintenance`, others to `available`.

use crate::model::asset::{
    Asset, AssetAssignment, AssetCategory, AssetCategoryId, AssetId, AssetStatus,
    ReturnCondition, WarrantyStatus,
};
use crate::model::{normalize_optional, EmployeeId, ValidationError, WorkspaceId};
use crate::repo::asset_repo::{AssetListQuery, AssetRepository, AssetReturn, InventorySummary};
use crate::repo::RepoError;
use chrono::{Duration, NaiveDate};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Warning window used when none is configured.
pub const DEFAULT_WARRANTY_WARNING_DAYS: u32 = 30;

#[derive(Debug)]
pub enum AssetServiceError {
    Validation(ValidationError),
    AssetNotFound(String),
    CategoryNotFound(String),
    EmployeeNotFound(String),
    DuplicateAssetTag(String),
    /// Asset is not `available` for assignment.
    NotAvailable {
        asset_id: AssetId,
        status: AssetStatus,
    },
    /// Operation refused while the asset is checked out.
    AssetAssigned(AssetId),
    /// Return requested for an asset without an open assignment.
    NotAssigned(AssetId),
    /// Status cannot be set directly.
    InvalidStatus(AssetStatus),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for AssetServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::AssetNotFound(id) => write!(f, "asset not found: {id}"),
            Self::CategoryNotFound(id) => write!(f, "asset category not found: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "active employee not found: {id}"),
            Self::DuplicateAssetTag(tag) => write!(f, "asset tag already used: {tag}"),
            Self::NotAvailable { asset_id, status } => write!(
                f,
                "asset {asset_id} is {} and cannot be assigned",
                status.as_str()
            ),
            Self::AssetAssigned(id) => write!(f, "asset {id} is currently assigned"),
            Self::NotAssigned(id) => write!(f, "asset {id} is not assigned"),
            Self::InvalidStatus(status) => {
                write!(f, "status `{}` cannot be set directly", status.as_str())
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent asset state: {details}"),
        }
    }
}

impl Error for AssetServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AssetServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity: "asset", id } => Self::AssetNotFound(id),
            RepoError::NotFound {
                entity: "asset category",
                id,
            } => Self::CategoryNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for AssetServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Asset paired with its warranty classification.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WarrantyReport {
    pub asset: Asset,
    pub warranty: WarrantyStatus,
}

pub struct AssetService<R: AssetRepository> {
    repo: R,
    warranty_warning_days: u32,
}

impl<R: AssetRepository> AssetService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            warranty_warning_days: DEFAULT_WARRANTY_WARNING_DAYS,
        }
    }

    pub fn with_warning_days(mut self, days: u32) -> Self {
        self.warranty_warning_days = days;
        self
    }

    pub fn create_category(
        &self,
        workspace_id: WorkspaceId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<AssetCategory, AssetServiceError> {
        let mut category = AssetCategory::new(workspace_id, name.into().trim());
        category.description = normalize_optional(description);
        let id = self.repo.create_category(&category)?;
        self.repo
            .get_category(workspace_id, id)?
            .ok_or(AssetServiceError::InconsistentState(
                "created category not found in read-back",
            ))
    }

    pub fn update_category(
        &self,
        category: &AssetCategory,
    ) -> Result<AssetCategory, AssetServiceError> {
        self.repo.update_category(category)?;
        self.repo
            .get_category(category.workspace_id, category.id)?
            .ok_or(AssetServiceError::InconsistentState(
                "updated category not found in read-back",
            ))
    }

    pub fn list_categories(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<AssetCategory>, AssetServiceError> {
        Ok(self.repo.list_categories(workspace_id)?)
    }

    /// Deletes a category; its assets become uncategorized.
    pub fn delete_category(
        &self,
        workspace_id: WorkspaceId,
        id: AssetCategoryId,
    ) -> Result<(), AssetServiceError> {
        Ok(self.repo.delete_category(workspace_id, id)?)
    }

    /// Registers an asset; the stored status is always `available`.
    pub fn create_asset(&self, mut asset: Asset) -> Result<Asset, AssetServiceError> {
        asset.status = AssetStatus::Available;
        asset.is_deleted = false;
        asset.asset_tag = asset.asset_tag.trim().to_string();
        self.ensure_category(asset.workspace_id, asset.category_id)?;

        let tag = asset.asset_tag.clone();
        let id = self.repo.create_asset(&asset).map_err(|err| match err {
            RepoError::Conflict(_) => AssetServiceError::DuplicateAssetTag(tag),
            other => other.into(),
        })?;
        info!(
            "event=asset_create module=service status=ok workspace_id={} asset_id={id}",
            asset.workspace_id
        );
        self.read_back(asset.workspace_id, id, "created asset not found in read-back")
    }

    /// Rewrites asset details. Status changes go through custody calls or
    /// [`AssetService::set_status`].
    pub fn update_asset(&self, asset: &Asset) -> Result<Asset, AssetServiceError> {
        self.ensure_category(asset.workspace_id, asset.category_id)?;
        let tag = asset.asset_tag.clone();
        self.repo.update_asset(asset).map_err(|err| match err {
            RepoError::Conflict(_) => AssetServiceError::DuplicateAssetTag(tag),
            other => other.into(),
        })?;
        self.read_back(asset.workspace_id, asset.id, "updated asset not found in read-back")
    }

    pub fn get_asset(
        &self,
        workspace_id: WorkspaceId,
        id: AssetId,
    ) -> Result<Asset, AssetServiceError> {
        self.repo
            .get_asset(workspace_id, id, false)?
            .ok_or_else(|| AssetServiceError::AssetNotFound(id.to_string()))
    }

    pub fn list_assets(
        &self,
        workspace_id: WorkspaceId,
        query: &AssetListQuery,
    ) -> Result<Vec<Asset>, AssetServiceError> {
        Ok(self.repo.list_assets(workspace_id, query)?)
    }

    pub fn soft_delete_asset(
        &self,
        workspace_id: WorkspaceId,
        id: AssetId,
    ) -> Result<(), AssetServiceError> {
        self.repo
            .soft_delete_asset(workspace_id, id)
            .map_err(|err| match err {
                RepoError::Conflict(_) => AssetServiceError::AssetAssigned(id),
                other => other.into(),
            })?;
        info!("event=asset_delete module=service status=ok workspace_id={workspace_id} asset_id={id}");
        Ok(())
    }

    /// Checks an `available` asset out to an active employee.
    pub fn assign_asset(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
        employee_id: EmployeeId,
        assigned_on: NaiveDate,
        expected_return_on: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Result<AssetAssignment, AssetServiceError> {
        let asset = self.get_asset(workspace_id, asset_id)?;
        if asset.status != AssetStatus::Available {
            return Err(AssetServiceError::NotAvailable {
                asset_id,
                status: asset.status,
            });
        }
        if !self.repo.employee_is_active(workspace_id, employee_id)? {
            return Err(AssetServiceError::EmployeeNotFound(employee_id.to_string()));
        }

        let assignment = AssetAssignment {
            id: Uuid::new_v4(),
            asset_id,
            employee_id,
            assigned_on,
            expected_return_on,
            returned_on: None,
            condition_on_return: None,
            notes: normalize_optional(notes),
        };
        self.repo
            .assign_asset(workspace_id, &assignment)
            .map_err(|err| match err {
                // lost a race with another assignment
                RepoError::Conflict(_) => AssetServiceError::NotAvailable {
                    asset_id,
                    status: AssetStatus::Assigned,
                },
                other => other.into(),
            })?;
        info!(
            "event=asset_assign module=service status=ok workspace_id={workspace_id} asset_id={asset_id} employee_id={employee_id}"
        );
        self.repo
            .open_assignment(workspace_id, asset_id)?
            .ok_or(AssetServiceError::InconsistentState(
                "assignment not found in read-back",
            ))
    }

    /// Closes the open assignment and records the returned condition.
    pub fn return_asset(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
        returned_on: NaiveDate,
        condition: ReturnCondition,
        notes: Option<String>,
    ) -> Result<AssetAssignment, AssetServiceError> {
        self.get_asset(workspace_id, asset_id)?;
        let next_status = match condition {
            ReturnCondition::Damaged => AssetStatus::Maintenance,
            ReturnCondition::Good | ReturnCondition::Fair => AssetStatus::Available,
        };
        let closing = AssetReturn {
            returned_on,
            condition,
            notes: normalize_optional(notes),
            next_status,
        };
        let assignment = self
            .repo
            .return_asset(workspace_id, asset_id, &closing)
            .map_err(|err| match err {
                RepoError::Conflict(_) => AssetServiceError::NotAssigned(asset_id),
                other => other.into(),
            })?;
        info!(
            "event=asset_return module=service status=ok workspace_id={workspace_id} asset_id={asset_id} condition={}",
            condition.as_str()
        );
        Ok(assignment)
    }

    /// Moves an unassigned asset to `available`, `maintenance`, `retired`
    /// or `lost`.
    pub fn set_status(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
        status: AssetStatus,
    ) -> Result<Asset, AssetServiceError> {
        if status == AssetStatus::Assigned {
            return Err(AssetServiceError::InvalidStatus(status));
        }
        self.repo
            .set_asset_status(workspace_id, asset_id, status)
            .map_err(|err| match err {
                RepoError::Conflict(_) => AssetServiceError::AssetAssigned(asset_id),
                other => other.into(),
            })?;
        info!(
            "event=asset_status module=service status=ok workspace_id={workspace_id} asset_id={asset_id} to={}",
            status.as_str()
        );
        self.read_back(workspace_id, asset_id, "asset missing after status change")
    }

    /// Custody history, newest first.
    pub fn assignment_history(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
    ) -> Result<Vec<AssetAssignment>, AssetServiceError> {
        self.get_asset(workspace_id, asset_id)?;
        Ok(self.repo.list_assignments(workspace_id, asset_id)?)
    }

    pub fn assets_held_by(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> Result<Vec<AssetAssignment>, AssetServiceError> {
        Ok(self
            .repo
            .list_open_assignments_for_employee(workspace_id, employee_id)?)
    }

    pub fn warranty_status(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
        today: NaiveDate,
    ) -> Result<WarrantyStatus, AssetServiceError> {
        let asset = self.get_asset(workspace_id, asset_id)?;
        Ok(asset.warranty_status(today, self.warranty_warning_days))
    }

    /// Live assets whose warranty expired or expires inside the warning window.
    pub fn expiring_warranties(
        &self,
        workspace_id: WorkspaceId,
        today: NaiveDate,
    ) -> Result<Vec<WarrantyReport>, AssetServiceError> {
        let until = today + Duration::days(i64::from(self.warranty_warning_days));
        Ok(self
            .repo
            .list_warranty_expiring(workspace_id, until)?
            .into_iter()
            .map(|asset| WarrantyReport {
                warranty: asset.warranty_status(today, self.warranty_warning_days),
                asset,
            })
            .collect())
    }

    pub fn inventory_summary(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<InventorySummary, AssetServiceError> {
        Ok(self.repo.inventory_summary(workspace_id)?)
    }

    fn ensure_category(
        &self,
        workspace_id: WorkspaceId,
        category_id: Option<AssetCategoryId>,
    ) -> Result<(), AssetServiceError> {
        if let Some(category_id) = category_id {
            if self.repo.get_category(workspace_id, category_id)?.is_none() {
                return Err(AssetServiceError::CategoryNotFound(category_id.to_string()));
            }
        }
        Ok(())
    }

    fn read_back(
        &self,
        workspace_id: WorkspaceId,
        id: AssetId,
        details: &'static str,
    ) -> Result<Asset, AssetServiceError> {
        self.repo
            .get_asset(workspace_id, id, false)?
            .ok_or(AssetServiceError::InconsistentState(details))
    }
}

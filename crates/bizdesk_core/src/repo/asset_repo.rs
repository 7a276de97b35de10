//! Asset inventory persistence.
//!
//! # Responsibility
//! - CRUD for asset categories and assets.
//! - Custody transitions (assign / return) as single transactions.
//!
//! # Invariants
//! - `assets.status = 'assigned'` iff exactly one open assignment exists.
//! - Assign and return update asset status and the assignment row together.
//! - Soft-deleted categories are detached from their assets.

use crate::model::asset::{
    Asset, AssetAssignment, AssetCategory, AssetCategoryId, AssetId, AssetStatus,
    ReturnCondition,
};
use crate::model::{EmployeeId, Money, WorkspaceId};
use crate::repo::common::{
    bool_to_int, date_to_db, employee_is_active, ensure_connection_ready, like_pattern,
    optional_date_to_db, parse_bool, parse_date, parse_optional_date, parse_optional_uuid,
    parse_unsigned, parse_uuid, RepoError, RepoResult,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, Row, Transaction, TransactionBehavior,
};
use serde::Serialize;

const ASSET_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    category_id,
    name,
    asset_tag,
    serial_number,
    purchase_date,
    purchase_cost,
    warranty_expiry,
    status,
    location,
    notes,
    is_deleted
FROM assets";

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    a.id,
    a.asset_id,
    a.employee_id,
    a.assigned_on,
    a.expected_return_on,
    a.returned_on,
    a.condition_on_return,
    a.notes
FROM asset_assignments a
JOIN assets s ON s.id = a.asset_id";

/// Filters for listing assets.
#[derive(Debug, Clone, Default)]
pub struct AssetListQuery {
    pub status: Option<AssetStatus>,
    pub category_id: Option<AssetCategoryId>,
    /// Case-insensitive match on name, tag and serial number.
    pub search: Option<String>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: AssetStatus,
    pub count: u32,
}

/// Per-status asset counts and total purchase cost of live assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub total_assets: u32,
    /// One row per `AssetStatus`, in declaration order.
    pub by_status: Vec<StatusCount>,
    pub total_purchase_cost: Money,
}

/// Closing data recorded when an asset comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReturn {
    pub returned_on: NaiveDate,
    pub condition: ReturnCondition,
    pub notes: Option<String>,
    /// Status the asset moves to once returned.
    pub next_status: AssetStatus,
}

pub trait AssetRepository {
    fn create_category(&self, category: &AssetCategory) -> RepoResult<AssetCategoryId>;
    fn update_category(&self, category: &AssetCategory) -> RepoResult<()>;
    fn get_category(
        &self,
        workspace_id: WorkspaceId,
        id: AssetCategoryId,
    ) -> RepoResult<Option<AssetCategory>>;
    fn list_categories(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<AssetCategory>>;
    fn delete_category(&self, workspace_id: WorkspaceId, id: AssetCategoryId) -> RepoResult<()>;

    fn create_asset(&self, asset: &Asset) -> RepoResult<AssetId>;
    fn update_asset(&self, asset: &Asset) -> RepoResult<()>;
    fn get_asset(
        &self,
        workspace_id: WorkspaceId,
        id: AssetId,
        include_deleted: bool,
    ) -> RepoResult<Option<Asset>>;
    fn list_assets(
        &self,
        workspace_id: WorkspaceId,
        query: &AssetListQuery,
    ) -> RepoResult<Vec<Asset>>;
    /// Fails with `Conflict` while the asset is assigned.
    fn soft_delete_asset(&self, workspace_id: WorkspaceId, id: AssetId) -> RepoResult<()>;
    /// Fails with `Conflict` while the asset is assigned.
    fn set_asset_status(
        &self,
        workspace_id: WorkspaceId,
        id: AssetId,
        status: AssetStatus,
    ) -> RepoResult<()>;

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool>;
    fn open_assignment(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
    ) -> RepoResult<Option<AssetAssignment>>;
    /// Inserts an open assignment and marks an `available` asset `assigned`.
    fn assign_asset(
        &self,
        workspace_id: WorkspaceId,
        assignment: &AssetAssignment,
    ) -> RepoResult<()>;
    /// Closes the open assignment and moves the asset to `next_status`.
    fn return_asset(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
        closing: &AssetReturn,
    ) -> RepoResult<AssetAssignment>;
    fn list_assignments(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
    ) -> RepoResult<Vec<AssetAssignment>>;
    fn list_open_assignments_for_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<AssetAssignment>>;

    /// Live assets with a warranty expiring on or before `until`.
    fn list_warranty_expiring(
        &self,
        workspace_id: WorkspaceId,
        until: NaiveDate,
    ) -> RepoResult<Vec<Asset>>;
    fn inventory_summary(&self, workspace_id: WorkspaceId) -> RepoResult<InventorySummary>;
}

pub struct SqliteAssetRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssetRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["asset_categories", "assets", "asset_assignments"])?;
        Ok(Self { conn })
    }
}

impl AssetRepository for SqliteAssetRepository<'_> {
    fn create_category(&self, category: &AssetCategory) -> RepoResult<AssetCategoryId> {
        category.validate()?;
        self.conn.execute(
            "INSERT INTO asset_categories (id, workspace_id, name, description)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                category.id.to_string(),
                category.workspace_id.to_string(),
                category.name.as_str(),
                category.description.as_deref(),
            ],
        )?;
        Ok(category.id)
    }

    fn update_category(&self, category: &AssetCategory) -> RepoResult<()> {
        category.validate()?;
        let changed = self.conn.execute(
            "UPDATE asset_categories
             SET name = ?1, description = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3 AND workspace_id = ?4 AND is_deleted = 0;",
            params![
                category.name.as_str(),
                category.description.as_deref(),
                category.id.to_string(),
                category.workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("asset category", category.id));
        }
        Ok(())
    }

    fn get_category(
        &self,
        workspace_id: WorkspaceId,
        id: AssetCategoryId,
    ) -> RepoResult<Option<AssetCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workspace_id, name, description
             FROM asset_categories
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;",
        )?;
        let mut rows = stmt.query([id.to_string(), workspace_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_category_row(row)?));
        }
        Ok(None)
    }

    fn list_categories(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<AssetCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workspace_id, name, description
             FROM asset_categories
             WHERE workspace_id = ?1 AND is_deleted = 0
             ORDER BY name COLLATE NOCASE ASC, id ASC;",
        )?;
        let mut rows = stmt.query([workspace_id.to_string()])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn delete_category(&self, workspace_id: WorkspaceId, id: AssetCategoryId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE asset_categories
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;",
            [id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("asset category", id));
        }
        tx.execute(
            "UPDATE assets
             SET category_id = NULL, updated_at = (strftime('%s', 'now') * 1000)
             WHERE category_id = ?1;",
            [id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn create_asset(&self, asset: &Asset) -> RepoResult<AssetId> {
        asset.validate()?;
        self.conn.execute(
            "INSERT INTO assets (
                id,
                workspace_id,
                category_id,
                name,
                asset_tag,
                serial_number,
                purchase_date,
                purchase_cost,
                warranty_expiry,
                status,
                location,
                notes,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                asset.id.to_string(),
                asset.workspace_id.to_string(),
                asset.category_id.map(|id| id.to_string()),
                asset.name.as_str(),
                asset.asset_tag.as_str(),
                asset.serial_number.as_deref(),
                optional_date_to_db(asset.purchase_date),
                asset.purchase_cost,
                optional_date_to_db(asset.warranty_expiry),
                asset.status.as_str(),
                asset.location.as_deref(),
                asset.notes.as_deref(),
                bool_to_int(asset.is_deleted),
            ],
        )?;
        Ok(asset.id)
    }

    fn update_asset(&self, asset: &Asset) -> RepoResult<()> {
        asset.validate()?;
        let changed = self.conn.execute(
            "UPDATE assets
             SET
                category_id = ?1,
                name = ?2,
                asset_tag = ?3,
                serial_number = ?4,
                purchase_date = ?5,
                purchase_cost = ?6,
                warranty_expiry = ?7,
                location = ?8,
                notes = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?10 AND workspace_id = ?11 AND is_deleted = 0;",
            params![
                asset.category_id.map(|id| id.to_string()),
                asset.name.as_str(),
                asset.asset_tag.as_str(),
                asset.serial_number.as_deref(),
                optional_date_to_db(asset.purchase_date),
                asset.purchase_cost,
                optional_date_to_db(asset.warranty_expiry),
                asset.location.as_deref(),
                asset.notes.as_deref(),
                asset.id.to_string(),
                asset.workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("asset", asset.id));
        }
        Ok(())
    }

    fn get_asset(
        &self,
        workspace_id: WorkspaceId,
        id: AssetId,
        include_deleted: bool,
    ) -> RepoResult<Option<Asset>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSET_SELECT_SQL}
             WHERE id = ?1
               AND workspace_id = ?2
               AND (?3 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![
            id.to_string(),
            workspace_id.to_string(),
            bool_to_int(include_deleted)
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_asset_row(row)?));
        }
        Ok(None)
    }

    fn list_assets(
        &self,
        workspace_id: WorkspaceId,
        query: &AssetListQuery,
    ) -> RepoResult<Vec<Asset>> {
        let mut sql = format!("{ASSET_SELECT_SQL} WHERE workspace_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(workspace_id.to_string())];

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(category_id) = query.category_id {
            sql.push_str(" AND category_id = ?");
            bind_values.push(Value::Text(category_id.to_string()));
        }
        if let Some(term) = query.search.as_deref().filter(|term| !term.trim().is_empty()) {
            sql.push_str(
                " AND (name LIKE ? ESCAPE '\\'
                   OR asset_tag LIKE ? ESCAPE '\\'
                   OR serial_number LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(term);
            for _ in 0..3 {
                bind_values.push(Value::Text(pattern.clone()));
            }
        }
        sql.push_str(" ORDER BY asset_tag COLLATE NOCASE ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut assets = Vec::new();
        while let Some(row) = rows.next()? {
            assets.push(parse_asset_row(row)?);
        }
        Ok(assets)
    }

    fn soft_delete_asset(&self, workspace_id: WorkspaceId, id: AssetId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE assets
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0 AND status <> 'assigned';",
            [id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(self.missing_or_assigned(workspace_id, id)?);
        }
        Ok(())
    }

    fn set_asset_status(
        &self,
        workspace_id: WorkspaceId,
        id: AssetId,
        status: AssetStatus,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE assets
             SET status = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2 AND workspace_id = ?3 AND is_deleted = 0 AND status <> 'assigned';",
            params![status.as_str(), id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(self.missing_or_assigned(workspace_id, id)?);
        }
        Ok(())
    }

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool> {
        employee_is_active(self.conn, workspace_id, employee_id)
    }

    fn open_assignment(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
    ) -> RepoResult<Option<AssetAssignment>> {
        load_open_assignment(self.conn, workspace_id, asset_id)
    }

    fn assign_asset(
        &self,
        workspace_id: WorkspaceId,
        assignment: &AssetAssignment,
    ) -> RepoResult<()> {
        assignment.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE assets
             SET status = 'assigned', updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0 AND status = 'available';",
            [assignment.asset_id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::Conflict(format!(
                "asset {} is not available",
                assignment.asset_id
            )));
        }

        tx.execute(
            "INSERT INTO asset_assignments (
                id,
                asset_id,
                employee_id,
                assigned_on,
                expected_return_on,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                assignment.id.to_string(),
                assignment.asset_id.to_string(),
                assignment.employee_id.to_string(),
                date_to_db(assignment.assigned_on),
                optional_date_to_db(assignment.expected_return_on),
                assignment.notes.as_deref(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn return_asset(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
        closing: &AssetReturn,
    ) -> RepoResult<AssetAssignment> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let mut assignment = load_open_assignment(&tx, workspace_id, asset_id)?
            .ok_or_else(|| RepoError::Conflict(format!("asset {asset_id} is not assigned")))?;
        assignment.returned_on = Some(closing.returned_on);
        assignment.condition_on_return = Some(closing.condition);
        if closing.notes.is_some() {
            assignment.notes = closing.notes.clone();
        }
        assignment.validate()?;

        tx.execute(
            "UPDATE asset_assignments
             SET
                returned_on = ?1,
                condition_on_return = ?2,
                notes = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4;",
            params![
                date_to_db(closing.returned_on),
                closing.condition.as_str(),
                assignment.notes.as_deref(),
                assignment.id.to_string(),
            ],
        )?;
        tx.execute(
            "UPDATE assets
             SET status = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2 AND workspace_id = ?3;",
            params![
                closing.next_status.as_str(),
                asset_id.to_string(),
                workspace_id.to_string()
            ],
        )?;
        tx.commit()?;
        Ok(assignment)
    }

    fn list_assignments(
        &self,
        workspace_id: WorkspaceId,
        asset_id: AssetId,
    ) -> RepoResult<Vec<AssetAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             WHERE a.asset_id = ?1 AND s.workspace_id = ?2
             ORDER BY a.assigned_on DESC, a.created_at DESC, a.id ASC;"
        ))?;
        let mut rows = stmt.query([asset_id.to_string(), workspace_id.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }

    fn list_open_assignments_for_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<AssetAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             WHERE a.employee_id = ?1 AND s.workspace_id = ?2 AND a.returned_on IS NULL
             ORDER BY a.assigned_on ASC, a.id ASC;"
        ))?;
        let mut rows = stmt.query([employee_id.to_string(), workspace_id.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }

    fn list_warranty_expiring(
        &self,
        workspace_id: WorkspaceId,
        until: NaiveDate,
    ) -> RepoResult<Vec<Asset>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSET_SELECT_SQL}
             WHERE workspace_id = ?1
               AND is_deleted = 0
               AND status NOT IN ('retired', 'lost')
               AND warranty_expiry IS NOT NULL
               AND warranty_expiry <= ?2
             ORDER BY warranty_expiry ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([workspace_id.to_string(), date_to_db(until)])?;
        let mut assets = Vec::new();
        while let Some(row) = rows.next()? {
            assets.push(parse_asset_row(row)?);
        }
        Ok(assets)
    }

    fn inventory_summary(&self, workspace_id: WorkspaceId) -> RepoResult<InventorySummary> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*), COALESCE(SUM(purchase_cost), 0)
             FROM assets
             WHERE workspace_id = ?1 AND is_deleted = 0
             GROUP BY status;",
        )?;
        let mut rows = stmt.query([workspace_id.to_string()])?;

        let mut by_status: Vec<StatusCount> = AssetStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: 0,
            })
            .collect();
        let mut total_assets = 0u32;
        let mut total_purchase_cost: Money = 0;

        while let Some(row) = rows.next()? {
            let status: String = row.get(0)?;
            let count: u32 = parse_unsigned(row.get::<_, i64>(1)?, "assets.count")?;
            let cost: Money = row.get(2)?;
            let status = AssetStatus::parse(&status)
                .ok_or_else(|| RepoError::InvalidData(format!("invalid assets.status `{status}`")))?;
            if let Some(slot) = by_status.iter_mut().find(|slot| slot.status == status) {
                slot.count = count;
            }
            total_assets += count;
            total_purchase_cost = total_purchase_cost.checked_add(cost).ok_or_else(|| {
                RepoError::InvalidData("total purchase cost exceeds the money range".to_string())
            })?;
        }

        Ok(InventorySummary {
            total_assets,
            by_status,
            total_purchase_cost,
        })
    }
}

impl SqliteAssetRepository<'_> {
    fn missing_or_assigned(&self, workspace_id: WorkspaceId, id: AssetId) -> RepoResult<RepoError> {
        Ok(match self.get_asset(workspace_id, id, false)? {
            Some(_) => RepoError::Conflict(format!("asset {id} is assigned")),
            None => RepoError::not_found("asset", id),
        })
    }
}

fn load_open_assignment(
    conn: &Connection,
    workspace_id: WorkspaceId,
    asset_id: AssetId,
) -> RepoResult<Option<AssetAssignment>> {
    let mut stmt = conn.prepare(&format!(
        "{ASSIGNMENT_SELECT_SQL}
         WHERE a.asset_id = ?1 AND s.workspace_id = ?2 AND a.returned_on IS NULL;"
    ))?;
    let mut rows = stmt.query([asset_id.to_string(), workspace_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_assignment_row(row)?));
    }
    Ok(None)
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<AssetCategory> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    Ok(AssetCategory {
        id: parse_uuid(&id, "asset_categories.id")?,
        workspace_id: parse_uuid(&workspace_id, "asset_categories.workspace_id")?,
        name: row.get(2)?,
        description: row.get(3)?,
    })
}

fn parse_asset_row(row: &Row<'_>) -> RepoResult<Asset> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let status: String = row.get(9)?;
    let is_deleted: i64 = row.get(12)?;
    Ok(Asset {
        id: parse_uuid(&id, "assets.id")?,
        workspace_id: parse_uuid(&workspace_id, "assets.workspace_id")?,
        category_id: parse_optional_uuid(row.get(2)?, "assets.category_id")?,
        name: row.get(3)?,
        asset_tag: row.get(4)?,
        serial_number: row.get(5)?,
        purchase_date: parse_optional_date(row.get(6)?, "assets.purchase_date")?,
        purchase_cost: row.get(7)?,
        warranty_expiry: parse_optional_date(row.get(8)?, "assets.warranty_expiry")?,
        status: AssetStatus::parse(&status)
            .ok_or_else(|| RepoError::InvalidData(format!("invalid assets.status `{status}`")))?,
        location: row.get(10)?,
        notes: row.get(11)?,
        is_deleted: parse_bool(is_deleted, "assets.is_deleted")?,
    })
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<AssetAssignment> {
    let id: String = row.get(0)?;
    let asset_id: String = row.get(1)?;
    let employee_id: String = row.get(2)?;
    let assigned_on: String = row.get(3)?;
    let condition: Option<String> = row.get(6)?;
    Ok(AssetAssignment {
        id: parse_uuid(&id, "asset_assignments.id")?,
        asset_id: parse_uuid(&asset_id, "asset_assignments.asset_id")?,
        employee_id: parse_uuid(&employee_id, "asset_assignments.employee_id")?,
        assigned_on: parse_date(&assigned_on, "asset_assignments.assigned_on")?,
        expected_return_on: parse_optional_date(
            row.get(4)?,
            "asset_assignments.expected_return_on",
        )?,
        returned_on: parse_optional_date(row.get(5)?, "asset_assignments.returned_on")?,
        condition_on_return: condition
            .map(|value| {
                ReturnCondition::parse(&value).ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "invalid asset_assignments.condition_on_return `{value}`"
                    ))
                })
            })
            .transpose()?,
        notes: row.get(7)?,
    })
}

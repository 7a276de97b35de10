//! Software license pools and seat assignments.
//!
//! # Invariants
//! - `used_licenses` equals the number of open assignments of the pool.
//! - Seat assign/revoke update the counter and the assignment row in one
//!   `IMMEDIATE` transaction, so concurrent writers cannot oversubscribe.

use crate::model::license::{LicenseAssignment, LicenseId, SoftwareLicense};
use crate::model::{EmployeeId, WorkspaceId};
use crate::repo::common::{
    bool_to_int, date_to_db, employee_is_active, ensure_connection_ready, like_pattern,
    optional_date_to_db, parse_bool, parse_date, parse_optional_date, parse_unsigned,
    parse_uuid, RepoError, RepoResult,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

const LICENSE_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    name,
    vendor,
    license_key,
    total_licenses,
    used_licenses,
    cost_per_license,
    purchase_date,
    expiry_date,
    notes,
    is_deleted
FROM software_licenses";

const LICENSE_ASSIGNMENT_SELECT_SQL: &str = "SELECT
    la.id,
    la.license_id,
    la.employee_id,
    la.assigned_on,
    la.revoked_on
FROM license_assignments la
JOIN software_licenses l ON l.id = la.license_id";

#[derive(Debug, Clone, Default)]
pub struct LicenseListQuery {
    /// Case-insensitive match on name and vendor.
    pub search: Option<String>,
    /// Only pools with at least one free seat.
    pub with_free_seats: bool,
}

/// Result of a seat assignment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatAssignOutcome {
    Assigned,
    NoSeatsAvailable,
    AlreadyAssigned,
}

pub trait LicenseRepository {
    fn create_license(&self, license: &SoftwareLicense) -> RepoResult<LicenseId>;
    /// Updates pool metadata; `used_licenses` is never overwritten.
    fn update_license(&self, license: &SoftwareLicense) -> RepoResult<()>;
    fn get_license(
        &self,
        workspace_id: WorkspaceId,
        id: LicenseId,
    ) -> RepoResult<Option<SoftwareLicense>>;
    fn list_licenses(
        &self,
        workspace_id: WorkspaceId,
        query: &LicenseListQuery,
    ) -> RepoResult<Vec<SoftwareLicense>>;
    /// Fails with `Conflict` while seats are in use.
    fn soft_delete_license(&self, workspace_id: WorkspaceId, id: LicenseId) -> RepoResult<()>;

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool>;
    fn assign_seat(
        &self,
        workspace_id: WorkspaceId,
        assignment: &LicenseAssignment,
    ) -> RepoResult<SeatAssignOutcome>;
    /// Closes the open assignment and frees its seat.
    fn revoke_seat(
        &self,
        workspace_id: WorkspaceId,
        license_id: LicenseId,
        employee_id: EmployeeId,
        revoked_on: NaiveDate,
    ) -> RepoResult<LicenseAssignment>;
    fn active_assignments(
        &self,
        workspace_id: WorkspaceId,
        license_id: LicenseId,
    ) -> RepoResult<Vec<LicenseAssignment>>;
    fn licenses_for_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<SoftwareLicense>>;
    /// Live pools whose expiry date falls on or before `until`.
    fn list_expiring(
        &self,
        workspace_id: WorkspaceId,
        until: NaiveDate,
    ) -> RepoResult<Vec<SoftwareLicense>>;
}

pub struct SqliteLicenseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLicenseRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["software_licenses", "license_assignments"])?;
        Ok(Self { conn })
    }
}

impl LicenseRepository for SqliteLicenseRepository<'_> {
    fn create_license(&self, license: &SoftwareLicense) -> RepoResult<LicenseId> {
        license.validate()?;
        self.conn.execute(
            "INSERT INTO software_licenses (
                id,
                workspace_id,
                name,
                vendor,
                license_key,
                total_licenses,
                used_licenses,
                cost_per_license,
                purchase_date,
                expiry_date,
                notes,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10, ?11);",
            params![
                license.id.to_string(),
                license.workspace_id.to_string(),
                license.name.as_str(),
                license.vendor.as_deref(),
                license.license_key.as_deref(),
                license.total_licenses,
                license.cost_per_license,
                optional_date_to_db(license.purchase_date),
                optional_date_to_db(license.expiry_date),
                license.notes.as_deref(),
                bool_to_int(license.is_deleted),
            ],
        )?;
        Ok(license.id)
    }

    fn update_license(&self, license: &SoftwareLicense) -> RepoResult<()> {
        license.validate()?;
        let changed = self.conn.execute(
            "UPDATE software_licenses
             SET
                name = ?1,
                vendor = ?2,
                license_key = ?3,
                total_licenses = ?4,
                cost_per_license = ?5,
                purchase_date = ?6,
                expiry_date = ?7,
                notes = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?9
               AND workspace_id = ?10
               AND is_deleted = 0
               AND used_licenses <= ?4;",
            params![
                license.name.as_str(),
                license.vendor.as_deref(),
                license.license_key.as_deref(),
                license.total_licenses,
                license.cost_per_license,
                optional_date_to_db(license.purchase_date),
                optional_date_to_db(license.expiry_date),
                license.notes.as_deref(),
                license.id.to_string(),
                license.workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(match self.get_license(license.workspace_id, license.id)? {
                Some(stored) => RepoError::Conflict(format!(
                    "total_licenses {} is below {} seats in use",
                    license.total_licenses, stored.used_licenses
                )),
                None => RepoError::not_found("license", license.id),
            });
        }
        Ok(())
    }

    fn get_license(
        &self,
        workspace_id: WorkspaceId,
        id: LicenseId,
    ) -> RepoResult<Option<SoftwareLicense>> {
        load_license(self.conn, workspace_id, id)
    }

    fn list_licenses(
        &self,
        workspace_id: WorkspaceId,
        query: &LicenseListQuery,
    ) -> RepoResult<Vec<SoftwareLicense>> {
        let mut sql = format!("{LICENSE_SELECT_SQL} WHERE workspace_id = ? AND is_deleted = 0");
        let mut bind_values: Vec<Value> = vec![Value::Text(workspace_id.to_string())];

        if query.with_free_seats {
            sql.push_str(" AND used_licenses < total_licenses");
        }
        if let Some(term) = query.search.as_deref().filter(|term| !term.trim().is_empty()) {
            sql.push_str(" AND (name LIKE ? ESCAPE '\\' OR vendor LIKE ? ESCAPE '\\')");
            let pattern = like_pattern(term);
            bind_values.push(Value::Text(pattern.clone()));
            bind_values.push(Value::Text(pattern));
        }
        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut licenses = Vec::new();
        while let Some(row) = rows.next()? {
            licenses.push(parse_license_row(row)?);
        }
        Ok(licenses)
    }

    fn soft_delete_license(&self, workspace_id: WorkspaceId, id: LicenseId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE software_licenses
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0 AND used_licenses = 0;",
            [id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(match self.get_license(workspace_id, id)? {
                Some(stored) => RepoError::Conflict(format!(
                    "license {id} still has {} active seats",
                    stored.used_licenses
                )),
                None => RepoError::not_found("license", id),
            });
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

    fn assign_seat(
        &self,
        workspace_id: WorkspaceId,
        assignment: &LicenseAssignment,
    ) -> RepoResult<SeatAssignOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let license = load_license(&tx, workspace_id, assignment.license_id)?
            .ok_or_else(|| RepoError::not_found("license", assignment.license_id))?;

        let already_assigned: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM license_assignments
                WHERE license_id = ?1 AND employee_id = ?2 AND revoked_on IS NULL
            );",
            [
                assignment.license_id.to_string(),
                assignment.employee_id.to_string(),
            ],
            |row| row.get(0),
        )?;
        if already_assigned == 1 {
            return Ok(SeatAssignOutcome::AlreadyAssigned);
        }
        if license.available_licenses() == 0 {
            return Ok(SeatAssignOutcome::NoSeatsAvailable);
        }

        tx.execute(
            "INSERT INTO license_assignments (id, license_id, employee_id, assigned_on)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                assignment.id.to_string(),
                assignment.license_id.to_string(),
                assignment.employee_id.to_string(),
                date_to_db(assignment.assigned_on),
            ],
        )?;
        tx.execute(
            "UPDATE software_licenses
             SET used_licenses = used_licenses + 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [assignment.license_id.to_string()],
        )?;
        tx.commit()?;
        Ok(SeatAssignOutcome::Assigned)
    }

    fn revoke_seat(
        &self,
        workspace_id: WorkspaceId,
        license_id: LicenseId,
        employee_id: EmployeeId,
        revoked_on: NaiveDate,
    ) -> RepoResult<LicenseAssignment> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let mut stmt = tx.prepare(&format!(
            "{LICENSE_ASSIGNMENT_SELECT_SQL}
             WHERE la.license_id = ?1
               AND la.employee_id = ?2
               AND l.workspace_id = ?3
               AND la.revoked_on IS NULL;"
        ))?;
        let mut assignment = {
            let mut rows = stmt.query([
                license_id.to_string(),
                employee_id.to_string(),
                workspace_id.to_string(),
            ])?;
            match rows.next()? {
                Some(row) => parse_assignment_row(row)?,
                None => {
                    return Err(RepoError::not_found(
                        "license assignment",
                        format!("{license_id}/{employee_id}"),
                    ))
                }
            }
        };
        drop(stmt);

        if revoked_on < assignment.assigned_on {
            return Err(RepoError::Conflict(format!(
                "revocation date {revoked_on} precedes assignment date {}",
                assignment.assigned_on
            )));
        }

        tx.execute(
            "UPDATE license_assignments
             SET revoked_on = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            [date_to_db(revoked_on), assignment.id.to_string()],
        )?;
        tx.execute(
            "UPDATE software_licenses
             SET used_licenses = used_licenses - 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND used_licenses > 0;",
            [license_id.to_string()],
        )?;
        tx.commit()?;

        assignment.revoked_on = Some(revoked_on);
        Ok(assignment)
    }

    fn active_assignments(
        &self,
        workspace_id: WorkspaceId,
        license_id: LicenseId,
    ) -> RepoResult<Vec<LicenseAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LICENSE_ASSIGNMENT_SELECT_SQL}
             WHERE la.license_id = ?1 AND l.workspace_id = ?2 AND la.revoked_on IS NULL
             ORDER BY la.assigned_on ASC, la.id ASC;"
        ))?;
        let mut rows = stmt.query([license_id.to_string(), workspace_id.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }

    fn licenses_for_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<SoftwareLicense>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LICENSE_SELECT_SQL}
             WHERE workspace_id = ?1
               AND is_deleted = 0
               AND id IN (
                   SELECT license_id
                   FROM license_assignments
                   WHERE employee_id = ?2 AND revoked_on IS NULL
               )
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([workspace_id.to_string(), employee_id.to_string()])?;
        let mut licenses = Vec::new();
        while let Some(row) = rows.next()? {
            licenses.push(parse_license_row(row)?);
        }
        Ok(licenses)
    }

    fn list_expiring(
        &self,
        workspace_id: WorkspaceId,
        until: NaiveDate,
    ) -> RepoResult<Vec<SoftwareLicense>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LICENSE_SELECT_SQL}
             WHERE workspace_id = ?1
               AND is_deleted = 0
               AND expiry_date IS NOT NULL
               AND expiry_date <= ?2
             ORDER BY expiry_date ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([workspace_id.to_string(), date_to_db(until)])?;
        let mut licenses = Vec::new();
        while let Some(row) = rows.next()? {
            licenses.push(parse_license_row(row)?);
        }
        Ok(licenses)
    }
}

fn load_license(
    conn: &Connection,
    workspace_id: WorkspaceId,
    id: LicenseId,
) -> RepoResult<Option<SoftwareLicense>> {
    conn.query_row(
        &format!("{LICENSE_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;"),
        [id.to_string(), workspace_id.to_string()],
        |row| Ok(parse_license_row(row)),
    )
    .optional()?
    .transpose()
}

fn parse_license_row(row: &Row<'_>) -> RepoResult<SoftwareLicense> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let is_deleted: i64 = row.get(11)?;
    Ok(SoftwareLicense {
        id: parse_uuid(&id, "software_licenses.id")?,
        workspace_id: parse_uuid(&workspace_id, "software_licenses.workspace_id")?,
        name: row.get(2)?,
        vendor: row.get(3)?,
        license_key: row.get(4)?,
        total_licenses: parse_unsigned(row.get(5)?, "software_licenses.total_licenses")?,
        used_licenses: parse_unsigned(row.get(6)?, "software_licenses.used_licenses")?,
        cost_per_license: row.get(7)?,
        purchase_date: parse_optional_date(row.get(8)?, "software_licenses.purchase_date")?,
        expiry_date: parse_optional_date(row.get(9)?, "software_licenses.expiry_date")?,
        notes: row.get(10)?,
        is_deleted: parse_bool(is_deleted, "software_licenses.is_deleted")?,
    })
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<LicenseAssignment> {
    let id: String = row.get(0)?;
    let license_id: String = row.get(1)?;
    let employee_id: String = row.get(2)?;
    let assigned_on: String = row.get(3)?;
    Ok(LicenseAssignment {
        id: parse_uuid(&id, "license_assignments.id")?,
        license_id: parse_uuid(&license_id, "license_assignments.license_id")?,
        employee_id: parse_uuid(&employee_id, "license_assignments.employee_id")?,
        assigned_on: parse_date(&assigned_on, "license_assignments.assigned_on")?,
        revoked_on: parse_optional_date(row.get(4)?, "license_assignments.revoked_on")?,
    })
}

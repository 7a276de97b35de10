//! Payroll persistence and aggregation.
//!
//! # Invariants
//! - Component edits are only persisted while a payroll is `draft`.
//! - Status transitions are compare-and-set on the current status.
//! - Cancelled payrolls never contribute to totals.

use crate::model::payroll::{PayComponents, Payroll, PayrollId, PayrollStatus, PayrollTotals};
use crate::model::{EmployeeId, WorkspaceId};
use crate::repo::common::{
    date_to_db, employee_is_active, ensure_connection_ready, optional_date_to_db, parse_date,
    parse_optional_date, parse_unsigned, parse_uuid, RepoError, RepoResult,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const PAYROLL_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    employee_id,
    period_start,
    period_end,
    base_salary,
    allowances,
    overtime,
    bonus,
    deductions,
    tax,
    gross_pay,
    net_pay,
    status,
    paid_on,
    notes
FROM payrolls";

#[derive(Debug, Clone, Default)]
pub struct PayrollListQuery {
    pub employee_id: Option<EmployeeId>,
    pub status: Option<PayrollStatus>,
    /// Payroll periods starting on or after this date.
    pub from: Option<NaiveDate>,
    /// Payroll periods ending on or before this date.
    pub to: Option<NaiveDate>,
}

pub trait PayrollRepository {
    fn create_payroll(&self, payroll: &Payroll) -> RepoResult<PayrollId>;
    /// Rewrites components and notes of a draft payroll.
    fn update_draft(&self, payroll: &Payroll) -> RepoResult<()>;
    /// Moves `from -> to`; fails with `Conflict` when the stored status differs.
    fn transition(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
        from: PayrollStatus,
        to: PayrollStatus,
        paid_on: Option<NaiveDate>,
    ) -> RepoResult<()>;
    fn get_payroll(&self, workspace_id: WorkspaceId, id: PayrollId)
        -> RepoResult<Option<Payroll>>;
    fn list_payrolls(
        &self,
        workspace_id: WorkspaceId,
        query: &PayrollListQuery,
    ) -> RepoResult<Vec<Payroll>>;
    /// Sums non-cancelled payrolls matching `query`; `query.status` is honored.
    fn totals(&self, workspace_id: WorkspaceId, query: &PayrollListQuery)
        -> RepoResult<PayrollTotals>;
    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool>;
}

pub struct SqlitePayrollRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePayrollRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["payrolls"])?;
        Ok(Self { conn })
    }
}

impl PayrollRepository for SqlitePayrollRepository<'_> {
    fn create_payroll(&self, payroll: &Payroll) -> RepoResult<PayrollId> {
        payroll.validate()?;
        let c = &payroll.components;
        self.conn.execute(
            "INSERT INTO payrolls (
                id,
                workspace_id,
                employee_id,
                period_start,
                period_end,
                base_salary,
                allowances,
                overtime,
                bonus,
                deductions,
                tax,
                gross_pay,
                net_pay,
                status,
                paid_on,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
            params![
                payroll.id.to_string(),
                payroll.workspace_id.to_string(),
                payroll.employee_id.to_string(),
                date_to_db(payroll.period_start),
                date_to_db(payroll.period_end),
                c.base_salary,
                c.allowances,
                c.overtime,
                c.bonus,
                c.deductions,
                c.tax,
                payroll.gross_pay,
                payroll.net_pay,
                payroll.status.as_str(),
                optional_date_to_db(payroll.paid_on),
                payroll.notes.as_deref(),
            ],
        )?;
        Ok(payroll.id)
    }

    fn update_draft(&self, payroll: &Payroll) -> RepoResult<()> {
        payroll.validate()?;
        let c = &payroll.components;
        let changed = self.conn.execute(
            "UPDATE payrolls
             SET
                period_start = ?1,
                period_end = ?2,
                base_salary = ?3,
                allowances = ?4,
                overtime = ?5,
                bonus = ?6,
                deductions = ?7,
                tax = ?8,
                gross_pay = ?9,
                net_pay = ?10,
                notes = ?11,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?12 AND workspace_id = ?13 AND status = 'draft';",
            params![
                date_to_db(payroll.period_start),
                date_to_db(payroll.period_end),
                c.base_salary,
                c.allowances,
                c.overtime,
                c.bonus,
                c.deductions,
                c.tax,
                payroll.gross_pay,
                payroll.net_pay,
                payroll.notes.as_deref(),
                payroll.id.to_string(),
                payroll.workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(self.missing_or_conflict(payroll.workspace_id, payroll.id, "draft")?);
        }
        Ok(())
    }

    fn transition(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
        from: PayrollStatus,
        to: PayrollStatus,
        paid_on: Option<NaiveDate>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE payrolls
             SET
                status = ?1,
                paid_on = COALESCE(?2, paid_on),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3 AND workspace_id = ?4 AND status = ?5;",
            params![
                to.as_str(),
                optional_date_to_db(paid_on),
                id.to_string(),
                workspace_id.to_string(),
                from.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(self.missing_or_conflict(workspace_id, id, from.as_str())?);
        }
        Ok(())
    }

    fn get_payroll(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
    ) -> RepoResult<Option<Payroll>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PAYROLL_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2;"
        ))?;
        let mut rows = stmt.query([id.to_string(), workspace_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_payroll_row(row)?));
        }
        Ok(None)
    }

    fn list_payrolls(
        &self,
        workspace_id: WorkspaceId,
        query: &PayrollListQuery,
    ) -> RepoResult<Vec<Payroll>> {
        let (filter, bind_values) = build_filter(workspace_id, query);
        let mut stmt = self.conn.prepare(&format!(
            "{PAYROLL_SELECT_SQL} {filter} ORDER BY period_start DESC, employee_id ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut payrolls = Vec::new();
        while let Some(row) = rows.next()? {
            payrolls.push(parse_payroll_row(row)?);
        }
        Ok(payrolls)
    }

    fn totals(
        &self,
        workspace_id: WorkspaceId,
        query: &PayrollListQuery,
    ) -> RepoResult<PayrollTotals> {
        let (filter, bind_values) = build_filter(workspace_id, query);
        let totals = self.conn.query_row(
            &format!(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(gross_pay), 0),
                    COALESCE(SUM(deductions), 0),
                    COALESCE(SUM(tax), 0),
                    COALESCE(SUM(net_pay), 0)
                 FROM payrolls
                 {filter} AND status <> 'cancelled';"
            ),
            params_from_iter(bind_values),
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;
        Ok(PayrollTotals {
            count: parse_unsigned(totals.0, "payrolls.count")?,
            gross: totals.1,
            deductions: totals.2,
            tax: totals.3,
            net: totals.4,
        })
    }

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool> {
        employee_is_active(self.conn, workspace_id, employee_id)
    }
}

impl SqlitePayrollRepository<'_> {
    fn missing_or_conflict(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
        expected: &str,
    ) -> RepoResult<RepoError> {
        Ok(match self.get_payroll(workspace_id, id)? {
            Some(stored) => RepoError::Conflict(format!(
                "payroll {id} is {}, expected {expected}",
                stored.status.as_str()
            )),
            None => RepoError::not_found("payroll", id),
        })
    }
}

fn build_filter(workspace_id: WorkspaceId, query: &PayrollListQuery) -> (String, Vec<Value>) {
    let mut sql = String::from("WHERE workspace_id = ?");
    let mut bind_values: Vec<Value> = vec![Value::Text(workspace_id.to_string())];
    if let Some(employee_id) = query.employee_id {
        sql.push_str(" AND employee_id = ?");
        bind_values.push(Value::Text(employee_id.to_string()));
    }
    if let Some(status) = query.status {
        sql.push_str(" AND status = ?");
        bind_values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(from) = query.from {
        sql.push_str(" AND period_start >= ?");
        bind_values.push(Value::Text(date_to_db(from)));
    }
    if let Some(to) = query.to {
        sql.push_str(" AND period_end <= ?");
        bind_values.push(Value::Text(date_to_db(to)));
    }
    (sql, bind_values)
}

fn parse_payroll_row(row: &Row<'_>) -> RepoResult<Payroll> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let employee_id: String = row.get(2)?;
    let period_start: String = row.get(3)?;
    let period_end: String = row.get(4)?;
    let status: String = row.get(13)?;
    let payroll = Payroll {
        id: parse_uuid(&id, "payrolls.id")?,
        workspace_id: parse_uuid(&workspace_id, "payrolls.workspace_id")?,
        employee_id: parse_uuid(&employee_id, "payrolls.employee_id")?,
        period_start: parse_date(&period_start, "payrolls.period_start")?,
        period_end: parse_date(&period_end, "payrolls.period_end")?,
        components: PayComponents {
            base_salary: row.get(5)?,
            allowances: row.get(6)?,
            overtime: row.get(7)?,
            bonus: row.get(8)?,
            deductions: row.get(9)?,
            tax: row.get(10)?,
        },
        gross_pay: row.get(11)?,
        net_pay: row.get(12)?,
        status: PayrollStatus::parse(&status).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid payrolls.status `{status}`"))
        })?,
        paid_on: parse_optional_date(row.get(14)?, "payrolls.paid_on")?,
        notes: row.get(15)?,
    };
    payroll
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("payroll {id}: {err}")))?;
    Ok(payroll)
}

//! Payroll use-cases.
//!
//! # Invariants
//! - `gross = base + allowances + overtime + bonus`,
//!   `net = gross - deductions - tax`, and `net >= 0`.
//! - Lifecycle: `draft -> processed -> paid`; `draft`/`processed` may be
//!   cancelled. Nothing leaves `paid` or `cancelled`.
//! - One live payroll per employee and period.

use crate::model::payroll::{PayComponents, Payroll, PayrollId, PayrollStatus, PayrollTotals};
use crate::model::{normalize_optional, EmployeeId, ValidationError, WorkspaceId};
use crate::repo::payroll_repo::{PayrollListQuery, PayrollRepository};
use crate::repo::RepoError;
use chrono::{Datelike, NaiveDate};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum PayrollServiceError {
    Validation(ValidationError),
    PayrollNotFound(String),
    EmployeeNotFound(String),
    DuplicatePeriod {
        employee_id: EmployeeId,
        period_start: NaiveDate,
        period_end: NaiveDate,
    },
    InvalidTransition {
        from: PayrollStatus,
        to: PayrollStatus,
    },
    /// Components can only change while `draft`.
    NotDraft(PayrollStatus),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for PayrollServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::PayrollNotFound(id) => write!(f, "payroll not found: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "active employee not found: {id}"),
            Self::DuplicatePeriod {
                employee_id,
                period_start,
                period_end,
            } => write!(
                f,
                "employee {employee_id} already has a payroll for {period_start}..{period_end}"
            ),
            Self::InvalidTransition { from, to } => write!(
                f,
                "payroll cannot move from {} to {}",
                from.as_str(),
                to.as_str()
            ),
            Self::NotDraft(status) => {
                write!(f, "payroll is {} and can no longer be edited", status.as_str())
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent payroll state: {details}")
            }
        }
    }
}

impl Error for PayrollServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PayrollServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "payroll",
                id,
            } => Self::PayrollNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for PayrollServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub struct PayrollService<R: PayrollRepository> {
    repo: R,
}

impl<R: PayrollRepository> PayrollService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a draft payroll with totals computed from `components`.
    pub fn create_payroll(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
        period_start: NaiveDate,
        period_end: NaiveDate,
        components: PayComponents,
        notes: Option<String>,
    ) -> Result<Payroll, PayrollServiceError> {
        let mut payroll = Payroll::new(
            workspace_id,
            employee_id,
            period_start,
            period_end,
            components,
        )?;
        payroll.notes = normalize_optional(notes);
        payroll.validate()?;
        if !self.repo.employee_is_active(workspace_id, employee_id)? {
            return Err(PayrollServiceError::EmployeeNotFound(employee_id.to_string()));
        }

        let id = self.repo.create_payroll(&payroll).map_err(|err| match err {
            RepoError::Conflict(_) => PayrollServiceError::DuplicatePeriod {
                employee_id,
                period_start,
                period_end,
            },
            other => other.into(),
        })?;
        info!(
            "event=payroll_create module=service status=ok workspace_id={workspace_id} payroll_id={id} employee_id={employee_id}"
        );
        self.read_back(workspace_id, id, "created payroll not found in read-back")
    }

    /// Replaces components and notes of a draft payroll.
    pub fn update_payroll(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
        components: PayComponents,
        notes: Option<String>,
    ) -> Result<Payroll, PayrollServiceError> {
        let mut payroll = self.get_payroll(workspace_id, id)?;
        if payroll.status != PayrollStatus::Draft {
            return Err(PayrollServiceError::NotDraft(payroll.status));
        }
        payroll.set_components(components)?;
        payroll.notes = normalize_optional(notes);
        payroll.validate()?;
        self.repo.update_draft(&payroll).map_err(|err| match err {
            RepoError::Conflict(_) => PayrollServiceError::NotDraft(PayrollStatus::Processed),
            other => other.into(),
        })?;
        self.read_back(workspace_id, id, "updated payroll not found in read-back")
    }

    pub fn process(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
    ) -> Result<Payroll, PayrollServiceError> {
        self.transition(workspace_id, id, PayrollStatus::Processed, None)
    }

    pub fn mark_paid(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
        paid_on: NaiveDate,
    ) -> Result<Payroll, PayrollServiceError> {
        self.transition(workspace_id, id, PayrollStatus::Paid, Some(paid_on))
    }

    pub fn cancel(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
    ) -> Result<Payroll, PayrollServiceError> {
        self.transition(workspace_id, id, PayrollStatus::Cancelled, None)
    }

    pub fn get_payroll(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
    ) -> Result<Payroll, PayrollServiceError> {
        self.repo
            .get_payroll(workspace_id, id)?
            .ok_or_else(|| PayrollServiceError::PayrollNotFound(id.to_string()))
    }

    pub fn list_payrolls(
        &self,
        workspace_id: WorkspaceId,
        query: &PayrollListQuery,
    ) -> Result<Vec<Payroll>, PayrollServiceError> {
        Ok(self.repo.list_payrolls(workspace_id, query)?)
    }

    /// Totals of non-cancelled payrolls inside `[from, to]`.
    pub fn period_totals(
        &self,
        workspace_id: WorkspaceId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PayrollTotals, PayrollServiceError> {
        if to < from {
            return Err(ValidationError::new("to", "must not be earlier than from").into());
        }
        let query = PayrollListQuery {
            from: Some(from),
            to: Some(to),
            ..PayrollListQuery::default()
        };
        Ok(self.repo.totals(workspace_id, &query)?)
    }

    /// Totals for one employee from January 1st of `today`'s year to `today`.
    pub fn employee_year_to_date(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
        today: NaiveDate,
    ) -> Result<PayrollTotals, PayrollServiceError> {
        let query = PayrollListQuery {
            employee_id: Some(employee_id),
            status: None,
            from: today.with_ordinal(1),
            to: Some(today),
        };
        Ok(self.repo.totals(workspace_id, &query)?)
    }

    fn transition(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
        to: PayrollStatus,
        paid_on: Option<NaiveDate>,
    ) -> Result<Payroll, PayrollServiceError> {
        let payroll = self.get_payroll(workspace_id, id)?;
        let from = payroll.status;
        if !from.can_transition_to(to) {
            return Err(PayrollServiceError::InvalidTransition { from, to });
        }
        if let Some(paid_on) = paid_on {
            if paid_on < payroll.period_start {
                return Err(ValidationError::new(
                    "paid_on",
                    "must not be earlier than period_start",
                )
                .into());
            }
        }
        self.repo
            .transition(workspace_id, id, from, to, paid_on)
            .map_err(|err| match err {
                RepoError::Conflict(_) => PayrollServiceError::InvalidTransition { from, to },
                other => other.into(),
            })?;
        info!(
            "event=payroll_transition module=service status=ok workspace_id={workspace_id} payroll_id={id} from={} to={}",
            from.as_str(),
            to.as_str()
        );
        self.read_back(workspace_id, id, "payroll missing after transition")
    }

    fn read_back(
        &self,
        workspace_id: WorkspaceId,
        id: PayrollId,
        details: &'static str,
    ) -> Result<Payroll, PayrollServiceError> {
        self.repo
            .get_payroll(workspace_id, id)?
            .ok_or(PayrollServiceError::InconsistentState(details))
    }
}

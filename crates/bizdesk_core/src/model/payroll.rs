//! Payroll records and pay arithmetic.
//!
//! # Invariants
//! - All component amounts are non-negative minor units.
//! - `gross = base + allowances + overtime + bonus`.
//! - `net = gross - deductions - tax` and `net >= 0`.
//! - Status only moves `draft -> processed -> paid`; `cancelled` is terminal.

use crate::model::{
    money_sum, require_non_negative, EmployeeId, Money, ValidationError, WorkspaceId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PayrollId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    Draft,
    Processed,
    Paid,
    Cancelled,
}

impl PayrollStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Processed => "processed",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "processed" => Some(Self::Processed),
            "paid" => Some(Self::Paid),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: PayrollStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Processed)
                | (Self::Processed, Self::Paid)
                | (Self::Draft, Self::Cancelled)
                | (Self::Processed, Self::Cancelled)
        )
    }
}

/// Input amounts for one pay period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayComponents {
    pub base_salary: Money,
    pub allowances: Money,
    pub overtime: Money,
    pub bonus: Money,
    pub deductions: Money,
    pub tax: Money,
}

impl PayComponents {
    /// Fails when the components do not fit in `Money`.
    pub fn gross(&self) -> Result<Money, ValidationError> {
        money_sum(
            "base_salary",
            [self.base_salary, self.allowances, self.overtime, self.bonus],
        )
    }

    pub fn withheld(&self) -> Result<Money, ValidationError> {
        money_sum("deductions", [self.deductions, self.tax])
    }

    pub fn net(&self) -> Result<Money, ValidationError> {
        self.gross()?
            .checked_sub(self.withheld()?)
            .ok_or_else(|| ValidationError::new("deductions", "amount too large"))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("base_salary", self.base_salary)?;
        require_non_negative("allowances", self.allowances)?;
        require_non_negative("overtime", self.overtime)?;
        require_non_negative("bonus", self.bonus)?;
        require_non_negative("deductions", self.deductions)?;
        require_non_negative("tax", self.tax)?;
        let gross = self.gross()?;
        let withheld = self.withheld()?;
        if withheld > gross {
            return Err(ValidationError::new(
                "deductions",
                format!("deductions and tax ({withheld}) exceed gross pay ({gross})"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payroll {
    pub id: PayrollId,
    pub workspace_id: WorkspaceId,
    pub employee_id: EmployeeId,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub components: PayComponents,
    pub gross_pay: Money,
    pub net_pay: Money,
    pub status: PayrollStatus,
    pub paid_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Payroll {
    pub fn new(
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
        period_start: NaiveDate,
        period_end: NaiveDate,
        components: PayComponents,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            workspace_id,
            employee_id,
            period_start,
            period_end,
            components,
            gross_pay: components.gross()?,
            net_pay: components.net()?,
            status: PayrollStatus::Draft,
            paid_on: None,
            notes: None,
        })
    }

    /// Replaces components and recomputes derived totals.
    pub fn set_components(&mut self, components: PayComponents) -> Result<(), ValidationError> {
        self.gross_pay = components.gross()?;
        self.net_pay = components.net()?;
        self.components = components;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.components.validate()?;
        if self.period_end < self.period_start {
            return Err(ValidationError::new(
                "period_end",
                "must not be earlier than period_start",
            ));
        }
        if self.gross_pay != self.components.gross()? || self.net_pay != self.components.net()? {
            return Err(ValidationError::new(
                "net_pay",
                "totals do not match pay components",
            ));
        }
        if self.status == PayrollStatus::Paid && self.paid_on.is_none() {
            return Err(ValidationError::new("paid_on", "required once paid"));
        }
        Ok(())
    }
}

/// Aggregate over a set of payrolls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTotals {
    pub count: u32,
    pub gross: Money,
    pub deductions: Money,
    pub tax: Money,
    pub net: Money,
}

#[cfg(test)]
mod tests {
    use super::{PayComponents, PayrollStatus};

    #[test]
    fn gross_and_net_follow_components() {
        let components = PayComponents {
            base_salary: 500_000,
            allowances: 20_000,
            overtime: 15_000,
            bonus: 10_000,
            deductions: 30_000,
            tax: 90_000,
        };
        assert_eq!(components.gross().unwrap(), 545_000);
        assert_eq!(components.net().unwrap(), 425_000);
        assert!(components.validate().is_ok());
    }

    #[test]
    fn oversized_amounts_are_rejected_not_wrapped() {
        let components = PayComponents {
            base_salary: i64::MAX,
            allowances: 1,
            ..PayComponents::default()
        };
        let err = components.validate().unwrap_err();
        assert_eq!(err.field, "base_salary");
        assert_eq!(err.message, "amount too large");
        assert!(components.net().is_err());

        let withheld = PayComponents {
            base_salary: 1_000,
            deductions: i64::MAX,
            tax: 1,
            ..PayComponents::default()
        };
        assert_eq!(withheld.validate().unwrap_err().field, "deductions");

        let at_limit = PayComponents {
            base_salary: i64::MAX,
            tax: i64::MAX,
            ..PayComponents::default()
        };
        assert_eq!(at_limit.net().unwrap(), 0);
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn negative_net_is_rejected() {
        let components = PayComponents {
            base_salary: 1_000,
            deductions: 800,
            tax: 300,
            ..PayComponents::default()
        };
        assert_eq!(components.validate().unwrap_err().field, "deductions");
    }

    #[test]
    fn status_transitions_are_forward_only() {
        assert!(PayrollStatus::Draft.can_transition_to(PayrollStatus::Processed));
        assert!(PayrollStatus::Processed.can_transition_to(PayrollStatus::Paid));
        assert!(!PayrollStatus::Draft.can_transition_to(PayrollStatus::Paid));
        assert!(!PayrollStatus::Paid.can_transition_to(PayrollStatus::Cancelled));
        assert!(!PayrollStatus::Cancelled.can_transition_to(PayrollStatus::Draft));
    }
}

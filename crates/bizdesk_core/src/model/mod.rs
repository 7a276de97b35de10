//! Domain model for workspace-scoped business records.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own field-level invariants through `validate()` helpers.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Every business record belongs to exactly one workspace.
//! - Money amounts are integer minor units (cents) and never negative.
//! - Deletion is a soft-delete flag unless a record is a pure link row.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod asset;
pub mod certification;
pub mod gamification;
pub mod license;
pub mod okr;
pub mod payroll;
pub mod review;
pub mod training;
pub mod vault;
pub mod workspace;

/// Tenant scope identifier.
pub type WorkspaceId = Uuid;
/// Application user identifier.
pub type UserId = Uuid;
/// Employee record identifier.
pub type EmployeeId = Uuid;
/// Amount in minor currency units.
pub type Money = i64;

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.message)
    }
}

impl Error for ValidationError {}

/// Rejects blank text after trim.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be blank"));
    }
    Ok(())
}

/// Rejects negative amounts.
/// Sum of money amounts, rejecting totals outside the `Money` range.
pub(crate) fn money_sum(
    field: &'static str,
    amounts: impl IntoIterator<Item = Money>,
) -> Result<Money, ValidationError> {
    amounts
        .into_iter()
        .try_fold(0, Money::checked_add)
        .ok_or_else(|| ValidationError::new(field, "amount too large"))
}

pub(crate) fn require_non_negative(
    field: &'static str,
    value: Money,
) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::new(field, "must not be negative"));
    }
    Ok(())
}

/// Trims optional text and collapses blanks to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

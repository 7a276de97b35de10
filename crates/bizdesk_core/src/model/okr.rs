//! Objective / key-result goals.
//!
//! # Invariants
//! - `progress` is a percentage in `0..=100`.
//! - Key results always have an objective parent; objectives never have one.
//! - `due_date >= start_date` when both are set.

use crate::model::{require_text, EmployeeId, ValidationError, WorkspaceId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GoalId = Uuid;

pub const MAX_PROGRESS: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Objective,
    KeyResult,
}

impl GoalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Objective => "objective",
            Self::KeyResult => "key_result",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "objective" => Some(Self::Objective),
            "key_result" => Some(Self::KeyResult),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    NotStarted,
    OnTrack,
    AtRisk,
    Behind,
    Completed,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::OnTrack => "on_track",
            Self::AtRisk => "at_risk",
            Self::Behind => "behind",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_started" => Some(Self::NotStarted),
            "on_track" => Some(Self::OnTrack),
            "at_risk" => Some(Self::AtRisk),
            "behind" => Some(Self::Behind),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkrGoal {
    pub id: GoalId,
    pub workspace_id: WorkspaceId,
    pub owner_employee_id: Option<EmployeeId>,
    pub parent_id: Option<GoalId>,
    pub kind: GoalKind,
    pub title: String,
    pub description: Option<String>,
    /// Free-form period label such as `2025-Q3`.
    pub period: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub progress: u8,
    pub status: GoalStatus,
    pub is_deleted: bool,
}

impl OkrGoal {
    pub fn objective(
        workspace_id: WorkspaceId,
        title: impl Into<String>,
        period: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            owner_employee_id: None,
            parent_id: None,
            kind: GoalKind::Objective,
            title: title.into(),
            description: None,
            period: period.into(),
            start_date: None,
            due_date: None,
            progress: 0,
            status: GoalStatus::NotStarted,
            is_deleted: false,
        }
    }

    pub fn key_result(parent: &OkrGoal, title: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent.id),
            kind: GoalKind::KeyResult,
            owner_employee_id: parent.owner_employee_id,
            start_date: parent.start_date,
            due_date: parent.due_date,
            ..Self::objective(parent.workspace_id, title, parent.period.clone())
        }
    }

    /// Sets progress and derives the status implied by it.
    ///
    /// Reaching 100 completes the goal; leaving 100 reopens it as on-track,
    /// and any progress moves a not-started goal to on-track.
    pub fn apply_progress(&mut self, progress: u8) -> Result<(), ValidationError> {
        if progress > MAX_PROGRESS {
            return Err(ValidationError::new(
                "progress",
                format!("{progress} is outside 0..=100"),
            ));
        }
        self.progress = progress;
        self.status = match (progress, self.status) {
            (MAX_PROGRESS, _) => GoalStatus::Completed,
            (0, GoalStatus::NotStarted) => GoalStatus::NotStarted,
            (_, GoalStatus::Completed) | (_, GoalStatus::NotStarted) => GoalStatus::OnTrack,
            (_, current) => current,
        };
        Ok(())
    }

    /// Open goal whose due date has passed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != GoalStatus::Completed && self.due_date.is_some_and(|due| due < today)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("period", &self.period)?;
        if self.progress > MAX_PROGRESS {
            return Err(ValidationError::new("progress", "must be within 0..=100"));
        }
        match (self.kind, self.parent_id) {
            (GoalKind::KeyResult, None) => {
                return Err(ValidationError::new(
                    "parent_id",
                    "key results require an objective",
                ));
            }
            (GoalKind::Objective, Some(_)) => {
                return Err(ValidationError::new(
                    "parent_id",
                    "objectives cannot have a parent",
                ));
            }
            _ => {}
        }
        if let (Some(start), Some(due)) = (self.start_date, self.due_date) {
            if due < start {
                return Err(ValidationError::new(
                    "due_date",
                    "must not be earlier than start_date",
                ));
            }
        }
        Ok(())
    }
}

/// Rounded mean of key-result progress values.
pub fn rollup_progress(key_results: &[u8]) -> u8 {
    if key_results.is_empty() {
        return 0;
    }
    let sum: u32 = key_results.iter().map(|value| u32::from(*value)).sum();
    let count = key_results.len() as u32;
    // round half up without floats
    ((sum * 2 + count) / (count * 2)).min(u32::from(MAX_PROGRESS)) as u8
}

#[cfg(test)]
mod tests {
    use super::{rollup_progress, GoalStatus, OkrGoal};
    use uuid::Uuid;

    #[test]
    fn progress_above_hundred_is_rejected() {
        let mut goal = OkrGoal::objective(Uuid::new_v4(), "Grow revenue", "2025-Q1");
        assert!(goal.apply_progress(101).is_err());
        assert_eq!(goal.progress, 0);
    }

    #[test]
    fn full_progress_completes_and_partial_reopens() {
        let mut goal = OkrGoal::objective(Uuid::new_v4(), "Ship v2", "2025-Q1");
        goal.apply_progress(40).unwrap();
        assert_eq!(goal.status, GoalStatus::OnTrack);
        goal.apply_progress(100).unwrap();
        assert_eq!(goal.status, GoalStatus::Completed);
        goal.apply_progress(90).unwrap();
        assert_eq!(goal.status, GoalStatus::OnTrack);
    }

    #[test]
    fn at_risk_status_survives_progress_update() {
        let mut goal = OkrGoal::objective(Uuid::new_v4(), "Hire", "2025-Q1");
        goal.status = GoalStatus::AtRisk;
        goal.apply_progress(20).unwrap();
        assert_eq!(goal.status, GoalStatus::AtRisk);
    }

    #[test]
    fn key_result_without_parent_is_invalid() {
        let objective = OkrGoal::objective(Uuid::new_v4(), "Quality", "2025-Q2");
        let mut kr = OkrGoal::key_result(&objective, "Reduce bugs");
        assert!(kr.validate().is_ok());
        kr.parent_id = None;
        assert_eq!(kr.validate().unwrap_err().field, "parent_id");
    }

    #[test]
    fn rollup_rounds_half_up() {
        assert_eq!(rollup_progress(&[]), 0);
        assert_eq!(rollup_progress(&[50, 51]), 51);
        assert_eq!(rollup_progress(&[100, 0, 0]), 33);
        assert_eq!(rollup_progress(&[100, 100]), 100);
    }
}

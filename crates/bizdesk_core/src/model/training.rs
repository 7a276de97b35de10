//! Training sessions and enrollments.
//!
//! # Invariants
//! - `ends_on >= starts_on`.
//! - Enrollment count never exceeds `capacity` when capacity is set.
//! - Completion score is a percentage in `0..=100`.

use crate::model::{require_text, EmployeeId, ValidationError, WorkspaceId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TrainingId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Scheduled,
    Ongoing,
    Completed,
    Cancelled,
}

impl TrainingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "ongoing" => Some(Self::Ongoing),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn accepts_enrollment(self) -> bool {
        matches!(self, Self::Scheduled | Self::Ongoing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Training {
    pub id: TrainingId,
    pub workspace_id: WorkspaceId,
    pub title: String,
    pub description: Option<String>,
    pub provider: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub capacity: Option<u32>,
    pub status: TrainingStatus,
}

impl Training {
    pub fn new(
        workspace_id: WorkspaceId,
        title: impl Into<String>,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            title: title.into(),
            description: None,
            provider: None,
            starts_on,
            ends_on,
            capacity: None,
            status: TrainingStatus::Scheduled,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        if self.ends_on < self.starts_on {
            return Err(ValidationError::new(
                "ends_on",
                "must not be earlier than starts_on",
            ));
        }
        if self.capacity == Some(0) {
            return Err(ValidationError::new("capacity", "must be positive when set"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    InProgress,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enrolled => "enrolled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "enrolled" => Some(Self::Enrolled),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "dropped" => Some(Self::Dropped),
            _ => None,
        }
    }

    /// Whether the enrollment occupies a seat.
    pub fn holds_seat(self) -> bool {
        !matches!(self, Self::Dropped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeTraining {
    pub id: Uuid,
    pub training_id: TrainingId,
    pub employee_id: EmployeeId,
    pub status: EnrollmentStatus,
    pub completed_on: Option<NaiveDate>,
    pub score: Option<u8>,
}

impl EmployeeTraining {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.score.is_some_and(|score| score > 100) {
            return Err(ValidationError::new("score", "must be within 0..=100"));
        }
        if self.status == EnrollmentStatus::Completed && self.completed_on.is_none() {
            return Err(ValidationError::new(
                "completed_on",
                "required for completed enrollments",
            ));
        }
        Ok(())
    }
}

//! Performance review records.

use crate::model::{require_text, EmployeeId, ValidationError, WorkspaceId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ReviewId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Draft,
    Submitted,
    Acknowledged,
    Completed,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Acknowledged => "acknowledged",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "acknowledged" => Some(Self::Acknowledged),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Next status in the review workflow, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::Submitted),
            Self::Submitted => Some(Self::Acknowledged),
            Self::Acknowledged => Some(Self::Completed),
            Self::Completed => None,
        }
    }
}

/// Criterion scores on a 1..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewScores {
    pub quality: u8,
    pub productivity: u8,
    pub communication: u8,
    pub teamwork: u8,
    pub initiative: u8,
}

impl ReviewScores {
    pub fn uniform(score: u8) -> Self {
        Self {
            quality: score,
            productivity: score,
            communication: score,
            teamwork: score,
            initiative: score,
        }
    }

    fn all(&self) -> [(&'static str, u8); 5] {
        [
            ("quality_score", self.quality),
            ("productivity_score", self.productivity),
            ("communication_score", self.communication),
            ("teamwork_score", self.teamwork),
            ("initiative_score", self.initiative),
        ]
    }

    /// Mean of all criteria, rounded to two decimals.
    pub fn overall(&self) -> f64 {
        let sum: u32 = self.all().iter().map(|(_, score)| u32::from(*score)).sum();
        (f64::from(sum) / 5.0 * 100.0).round() / 100.0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, score) in self.all() {
            if !(1..=5).contains(&score) {
                return Err(ValidationError::new(
                    field,
                    format!("{score} is outside 1..=5"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReview {
    pub id: ReviewId,
    pub workspace_id: WorkspaceId,
    pub employee_id: EmployeeId,
    pub reviewer_employee_id: EmployeeId,
    pub period: String,
    pub scores: ReviewScores,
    pub overall_rating: f64,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub comments: Option<String>,
    pub status: ReviewStatus,
}

impl PerformanceReview {
    pub fn new(
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
        reviewer_employee_id: EmployeeId,
        period: impl Into<String>,
        scores: ReviewScores,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            employee_id,
            reviewer_employee_id,
            period: period.into(),
            scores,
            overall_rating: scores.overall(),
            strengths: None,
            improvements: None,
            comments: None,
            status: ReviewStatus::Draft,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("period", &self.period)?;
        self.scores.validate()?;
        if self.employee_id == self.reviewer_employee_id {
            return Err(ValidationError::new(
                "reviewer_employee_id",
                "employees cannot review themselves",
            ));
        }
        Ok(())
    }
}

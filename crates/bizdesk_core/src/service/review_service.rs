//! Performance review use-cases.
//!
//! # Invariants
//! - Workflow is strictly `draft -> submitted -> acknowledged -> completed`.
//! - Scores are editable only while `draft`; `overall_rating` is always the
//!   mean of the five scores.

use crate::model::review::{PerformanceReview, ReviewId, ReviewScores, ReviewStatus};
use crate::model::{normalize_optional, EmployeeId, ValidationError, WorkspaceId};
use crate::repo::review_repo::{ReviewListQuery, ReviewRepository};
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ReviewServiceError {
    Validation(ValidationError),
    ReviewNotFound(String),
    EmployeeNotFound(String),
    InvalidTransition {
        from: ReviewStatus,
        to: ReviewStatus,
    },
    NotDraft(ReviewStatus),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for ReviewServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ReviewNotFound(id) => write!(f, "review not found: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "active employee not found: {id}"),
            Self::InvalidTransition { from, to } => write!(
                f,
                "review cannot move from {} to {}",
                from.as_str(),
                to.as_str()
            ),
            Self::NotDraft(status) => {
                write!(f, "review is {} and can no longer be edited", status.as_str())
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent review state: {details}"),
        }
    }
}

impl Error for ReviewServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ReviewServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "review",
                id,
            } => Self::ReviewNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ReviewServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Free-text sections of a review.
#[derive(Debug, Clone, Default)]
pub struct ReviewNotes {
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub comments: Option<String>,
}

pub struct ReviewService<R: ReviewRepository> {
    repo: R,
}

impl<R: ReviewRepository> ReviewService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_review(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
        reviewer_employee_id: EmployeeId,
        period: impl Into<String>,
        scores: ReviewScores,
        notes: ReviewNotes,
    ) -> Result<PerformanceReview, ReviewServiceError> {
        let mut review = PerformanceReview::new(
            workspace_id,
            employee_id,
            reviewer_employee_id,
            period.into().trim(),
            scores,
        );
        apply_notes(&mut review, notes);
        review.validate()?;
        for id in [employee_id, reviewer_employee_id] {
            if !self.repo.employee_is_active(workspace_id, id)? {
                return Err(ReviewServiceError::EmployeeNotFound(id.to_string()));
            }
        }
        let id = self.repo.create_review(&review)?;
        info!(
            "event=review_create module=service status=ok workspace_id={workspace_id} review_id={id}"
        );
        self.get_review(workspace_id, id)
    }

    /// Rewrites scores and notes of a draft; the overall rating follows.
    pub fn update_scores(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
        scores: ReviewScores,
        notes: ReviewNotes,
    ) -> Result<PerformanceReview, ReviewServiceError> {
        let mut review = self.get_review(workspace_id, id)?;
        if review.status != ReviewStatus::Draft {
            return Err(ReviewServiceError::NotDraft(review.status));
        }
        review.scores = scores;
        review.overall_rating = scores.overall();
        apply_notes(&mut review, notes);
        review.validate()?;
        self.repo.update_draft(&review).map_err(|err| match err {
            RepoError::Conflict(_) => ReviewServiceError::NotDraft(ReviewStatus::Submitted),
            other => other.into(),
        })?;
        self.get_review(workspace_id, id)
    }

    pub fn submit(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
    ) -> Result<PerformanceReview, ReviewServiceError> {
        self.advance(workspace_id, id, ReviewStatus::Submitted)
    }

    pub fn acknowledge(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
    ) -> Result<PerformanceReview, ReviewServiceError> {
        self.advance(workspace_id, id, ReviewStatus::Acknowledged)
    }

    pub fn complete(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
    ) -> Result<PerformanceReview, ReviewServiceError> {
        self.advance(workspace_id, id, ReviewStatus::Completed)
    }

    pub fn get_review(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
    ) -> Result<PerformanceReview, ReviewServiceError> {
        self.repo
            .get_review(workspace_id, id)?
            .ok_or_else(|| ReviewServiceError::ReviewNotFound(id.to_string()))
    }

    pub fn list_reviews(
        &self,
        workspace_id: WorkspaceId,
        query: &ReviewListQuery,
    ) -> Result<Vec<PerformanceReview>, ReviewServiceError> {
        Ok(self.repo.list_reviews(workspace_id, query)?)
    }

    /// Mean overall rating of the employee's submitted reviews.
    pub fn employee_average_rating(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> Result<Option<f64>, ReviewServiceError> {
        Ok(self.repo.average_rating(workspace_id, employee_id)?)
    }

    fn advance(
        &self,
        workspace_id: WorkspaceId,
        id: ReviewId,
        to: ReviewStatus,
    ) -> Result<PerformanceReview, ReviewServiceError> {
        let from = self.get_review(workspace_id, id)?.status;
        if from.next() != Some(to) {
            return Err(ReviewServiceError::InvalidTransition { from, to });
        }
        self.repo
            .transition(workspace_id, id, from, to)
            .map_err(|err| match err {
                RepoError::Conflict(_) => ReviewServiceError::InvalidTransition { from, to },
                other => other.into(),
            })?;
        info!(
            "event=review_transition module=service status=ok workspace_id={workspace_id} review_id={id} to={}",
            to.as_str()
        );
        self.get_review(workspace_id, id)
    }
}

fn apply_notes(review: &mut PerformanceReview, notes: ReviewNotes) {
    review.strengths = normalize_optional(notes.strengths);
    review.improvements = normalize_optional(notes.improvements);
    review.comments = normalize_optional(notes.comments);
}

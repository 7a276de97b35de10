//! Training session and enrollment use-cases.

use crate::model::training::{
    EmployeeTraining, EnrollmentStatus, Training, TrainingId, TrainingStatus,
};
use crate::model::{EmployeeId, ValidationError, WorkspaceId};
use crate::repo::training_repo::{EnrollOutcome, TrainingRepository};
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum TrainingServiceError {
    Validation(ValidationError),
    TrainingNotFound(String),
    EmployeeNotFound(String),
    EnrollmentNotFound {
        training_id: TrainingId,
        employee_id: EmployeeId,
    },
    AlreadyEnrolled {
        training_id: TrainingId,
        employee_id: EmployeeId,
    },
    TrainingFull {
        training_id: TrainingId,
        capacity: u32,
    },
    NotAccepting {
        training_id: TrainingId,
        status: TrainingStatus,
    },
    /// Enrollment cannot move from its current status.
    InvalidEnrollmentState(EnrollmentStatus),
    /// Capacity update would leave fewer seats than enrollments.
    CapacityBelowEnrolled(u32),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for TrainingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TrainingNotFound(id) => write!(f, "training not found: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "active employee not found: {id}"),
            Self::EnrollmentNotFound {
                training_id,
                employee_id,
            } => write!(
                f,
                "employee {employee_id} is not enrolled in training {training_id}"
            ),
            Self::AlreadyEnrolled {
                training_id,
                employee_id,
            } => write!(
                f,
                "employee {employee_id} is already enrolled in training {training_id}"
            ),
            Self::TrainingFull {
                training_id,
                capacity,
            } => write!(f, "training {training_id} is full ({capacity} seats)"),
            Self::NotAccepting {
                training_id,
                status,
            } => write!(
                f,
                "training {training_id} is {} and accepts no enrollments",
                status.as_str()
            ),
            Self::InvalidEnrollmentState(status) => {
                write!(f, "enrollment is {}", status.as_str())
            }
            Self::CapacityBelowEnrolled(capacity) => write!(
                f,
                "capacity {capacity} is below the current enrollment count"
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent training state: {details}")
            }
        }
    }
}

impl Error for TrainingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TrainingServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "training",
                id,
            } => Self::TrainingNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub struct TrainingService<R: TrainingRepository> {
    repo: R,
}

impl<R: TrainingRepository> TrainingService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_training(&self, training: &Training) -> Result<Training, TrainingServiceError> {
        let id = self.repo.create_training(training)?;
        info!(
            "event=training_create module=service status=ok workspace_id={} training_id={id}",
            training.workspace_id
        );
        self.read_back(training.workspace_id, id)
    }

    pub fn update_training(&self, training: &Training) -> Result<Training, TrainingServiceError> {
        self.repo.update_training(training).map_err(|err| match err {
            RepoError::Conflict(_) => {
                TrainingServiceError::CapacityBelowEnrolled(training.capacity.unwrap_or_default())
            }
            other => other.into(),
        })?;
        self.read_back(training.workspace_id, training.id)
    }

    pub fn get_training(
        &self,
        workspace_id: WorkspaceId,
        id: TrainingId,
    ) -> Result<Training, TrainingServiceError> {
        self.repo
            .get_training(workspace_id, id)?
            .ok_or_else(|| TrainingServiceError::TrainingNotFound(id.to_string()))
    }

    pub fn list_trainings(
        &self,
        workspace_id: WorkspaceId,
        status: Option<TrainingStatus>,
    ) -> Result<Vec<Training>, TrainingServiceError> {
        Ok(self.repo.list_trainings(workspace_id, status)?)
    }

    pub fn delete_training(
        &self,
        workspace_id: WorkspaceId,
        id: TrainingId,
    ) -> Result<(), TrainingServiceError> {
        Ok(self.repo.soft_delete_training(workspace_id, id)?)
    }

    /// Takes one seat of the training for the employee.
    pub fn enroll(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
        employee_id: EmployeeId,
    ) -> Result<EmployeeTraining, TrainingServiceError> {
        if !self.repo.employee_is_active(workspace_id, employee_id)? {
            return Err(TrainingServiceError::EmployeeNotFound(
                employee_id.to_string(),
            ));
        }
        let request = EmployeeTraining {
            id: Uuid::new_v4(),
            training_id,
            employee_id,
            status: EnrollmentStatus::Enrolled,
            completed_on: None,
            score: None,
        };
        match self.repo.enroll(workspace_id, &request)? {
            EnrollOutcome::Enrolled(enrollment) => {
                info!(
                    "event=training_enroll module=service status=ok workspace_id={workspace_id} training_id={training_id} employee_id={employee_id}"
                );
                Ok(enrollment)
            }
            EnrollOutcome::AlreadyEnrolled => Err(TrainingServiceError::AlreadyEnrolled {
                training_id,
                employee_id,
            }),
            EnrollOutcome::Full { capacity } => {
                warn!(
                    "event=training_enroll module=service status=rejected reason=full training_id={training_id}"
                );
                Err(TrainingServiceError::TrainingFull {
                    training_id,
                    capacity,
                })
            }
            EnrollOutcome::NotAccepting(status) => Err(TrainingServiceError::NotAccepting {
                training_id,
                status,
            }),
        }
    }

    pub fn start(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
        employee_id: EmployeeId,
    ) -> Result<EmployeeTraining, TrainingServiceError> {
        let mut enrollment = self.enrollment(workspace_id, training_id, employee_id)?;
        if enrollment.status != EnrollmentStatus::Enrolled {
            return Err(TrainingServiceError::InvalidEnrollmentState(
                enrollment.status,
            ));
        }
        enrollment.status = EnrollmentStatus::InProgress;
        self.repo.update_enrollment(workspace_id, &enrollment)?;
        Ok(enrollment)
    }

    /// Marks the enrollment completed with an optional score in `0..=100`.
    pub fn complete_enrollment(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
        employee_id: EmployeeId,
        completed_on: NaiveDate,
        score: Option<u8>,
    ) -> Result<EmployeeTraining, TrainingServiceError> {
        let mut enrollment = self.enrollment(workspace_id, training_id, employee_id)?;
        if !matches!(
            enrollment.status,
            EnrollmentStatus::Enrolled | EnrollmentStatus::InProgress
        ) {
            return Err(TrainingServiceError::InvalidEnrollmentState(
                enrollment.status,
            ));
        }
        enrollment.status = EnrollmentStatus::Completed;
        enrollment.completed_on = Some(completed_on);
        enrollment.score = score;
        enrollment.validate().map_err(TrainingServiceError::Validation)?;
        self.repo.update_enrollment(workspace_id, &enrollment)?;
        info!(
            "event=training_complete module=service status=ok workspace_id={workspace_id} training_id={training_id} employee_id={employee_id}"
        );
        Ok(enrollment)
    }

    /// Drops an open enrollment, freeing its seat.
    pub fn drop(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
        employee_id: EmployeeId,
    ) -> Result<EmployeeTraining, TrainingServiceError> {
        let mut enrollment = self.enrollment(workspace_id, training_id, employee_id)?;
        if matches!(
            enrollment.status,
            EnrollmentStatus::Completed | EnrollmentStatus::Dropped
        ) {
            return Err(TrainingServiceError::InvalidEnrollmentState(
                enrollment.status,
            ));
        }
        enrollment.status = EnrollmentStatus::Dropped;
        self.repo.update_enrollment(workspace_id, &enrollment)?;
        Ok(enrollment)
    }

    pub fn roster(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
    ) -> Result<Vec<EmployeeTraining>, TrainingServiceError> {
        self.get_training(workspace_id, training_id)?;
        Ok(self.repo.roster(workspace_id, training_id)?)
    }

    pub fn trainings_for_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> Result<Vec<EmployeeTraining>, TrainingServiceError> {
        Ok(self.repo.enrollments_for_employee(workspace_id, employee_id)?)
    }

    /// Completed share of seat-holding enrollments, as a percentage with two
    /// decimals. `0` for a training nobody enrolled in.
    pub fn completion_rate(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
    ) -> Result<f64, TrainingServiceError> {
        self.get_training(workspace_id, training_id)?;
        let counts = self.repo.enrollment_counts(workspace_id, training_id)?;
        if counts.active == 0 {
            return Ok(0.0);
        }
        let ratio = f64::from(counts.completed) / f64::from(counts.active);
        Ok((ratio * 10_000.0).round() / 100.0)
    }

    fn enrollment(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
        employee_id: EmployeeId,
    ) -> Result<EmployeeTraining, TrainingServiceError> {
        self.repo
            .get_enrollment(workspace_id, training_id, employee_id)?
            .ok_or(TrainingServiceError::EnrollmentNotFound {
                training_id,
                employee_id,
            })
    }

    fn read_back(
        &self,
        workspace_id: WorkspaceId,
        id: TrainingId,
    ) -> Result<Training, TrainingServiceError> {
        self.repo
            .get_training(workspace_id, id)?
            .ok_or(TrainingServiceError::InconsistentState(
                "training not found in read-back",
            ))
    }
}

//! Objective and key-result use-cases.
//!
//! # Invariants
//! - Progress is always within `0..=100`; reaching 100 completes a goal.
//! - An objective with key results carries the rounded mean of their
//!   progress; the objective and the changed key result are written together.
//! - Deleting an objective deletes its key results.

use crate::model::okr::{rollup_progress, GoalId, GoalKind, GoalStatus, OkrGoal, MAX_PROGRESS};
use crate::model::{normalize_optional, EmployeeId, ValidationError, WorkspaceId};
use crate::repo::okr_repo::{GoalListQuery, OkrRepository};
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum OkrServiceError {
    Validation(ValidationError),
    GoalNotFound(String),
    EmployeeNotFound(String),
    /// Progress input outside `0..=100`.
    InvalidProgress(i64),
    /// Goal is not an objective where one is required.
    NotAnObjective(GoalId),
    /// Objective progress is derived from its key results.
    ProgressDerived(GoalId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for OkrServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::GoalNotFound(id) => write!(f, "goal not found: {id}"),
            Self::EmployeeNotFound(id) => write!(f, "active employee not found: {id}"),
            Self::InvalidProgress(value) => write!(f, "progress {value} is outside 0..=100"),
            Self::NotAnObjective(id) => write!(f, "goal {id} is not an objective"),
            Self::ProgressDerived(id) => write!(
                f,
                "objective {id} has key results; update them instead"
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent goal state: {details}"),
        }
    }
}

impl Error for OkrServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for OkrServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity: "goal", id } => Self::GoalNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for OkrServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Objective with its key results in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalTree {
    pub objective: OkrGoal,
    pub key_results: Vec<OkrGoal>,
}

/// Optional fields for a new key result.
#[derive(Debug, Clone, Default)]
pub struct NewKeyResult {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to the objective's owner.
    pub owner_employee_id: Option<EmployeeId>,
    pub due_date: Option<NaiveDate>,
}

pub struct OkrService<R: OkrRepository> {
    repo: R,
}

impl<R: OkrRepository> OkrService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_objective(&self, mut goal: OkrGoal) -> Result<OkrGoal, OkrServiceError> {
        if goal.kind != GoalKind::Objective {
            return Err(OkrServiceError::NotAnObjective(goal.id));
        }
        goal.progress = 0;
        goal.status = GoalStatus::NotStarted;
        goal.is_deleted = false;
        self.ensure_owner(goal.workspace_id, goal.owner_employee_id)?;
        let id = self.repo.create_goal(&goal)?;
        info!(
            "event=okr_create module=service status=ok workspace_id={} goal_id={id} kind=objective",
            goal.workspace_id
        );
        self.get_goal(goal.workspace_id, id)
    }

    /// Adds a key result and re-rolls the objective's progress.
    pub fn add_key_result(
        &self,
        workspace_id: WorkspaceId,
        objective_id: GoalId,
        input: NewKeyResult,
    ) -> Result<OkrGoal, OkrServiceError> {
        let objective = self.get_goal(workspace_id, objective_id)?;
        if objective.kind != GoalKind::Objective {
            return Err(OkrServiceError::NotAnObjective(objective_id));
        }
        let mut key_result = OkrGoal::key_result(&objective, input.title.trim());
        key_result.description = normalize_optional(input.description);
        if input.owner_employee_id.is_some() {
            key_result.owner_employee_id = input.owner_employee_id;
        }
        if input.due_date.is_some() {
            key_result.due_date = input.due_date;
        }
        self.ensure_owner(workspace_id, key_result.owner_employee_id)?;

        let id = self.repo.create_goal(&key_result)?;
        self.rollup(workspace_id, objective, None)?;
        info!(
            "event=okr_create module=service status=ok workspace_id={workspace_id} goal_id={id} kind=key_result"
        );
        self.get_goal(workspace_id, id)
    }

    /// Sets progress on a key result (or a leaf objective).
    ///
    /// Returns the updated goal; a parent objective is recomputed in the
    /// same transaction.
    pub fn update_progress(
        &self,
        workspace_id: WorkspaceId,
        goal_id: GoalId,
        progress: i64,
    ) -> Result<OkrGoal, OkrServiceError> {
        let progress = u8::try_from(progress)
            .ok()
            .filter(|value| *value <= MAX_PROGRESS)
            .ok_or(OkrServiceError::InvalidProgress(progress))?;
        let mut goal = self.get_goal(workspace_id, goal_id)?;

        match (goal.kind, goal.parent_id) {
            (GoalKind::KeyResult, Some(parent_id)) => {
                goal.apply_progress(progress)?;
                let objective = self.get_goal(workspace_id, parent_id)?;
                self.rollup(workspace_id, objective, Some(goal))?;
            }
            _ => {
                if !self.repo.list_key_results(workspace_id, goal_id)?.is_empty() {
                    return Err(OkrServiceError::ProgressDerived(goal_id));
                }
                goal.apply_progress(progress)?;
                self.repo.update_goal(&goal)?;
            }
        }
        info!(
            "event=okr_progress module=service status=ok workspace_id={workspace_id} goal_id={goal_id} progress={progress}"
        );
        self.get_goal(workspace_id, goal_id)
    }

    pub fn set_status(
        &self,
        workspace_id: WorkspaceId,
        goal_id: GoalId,
        status: GoalStatus,
    ) -> Result<OkrGoal, OkrServiceError> {
        let mut goal = self.get_goal(workspace_id, goal_id)?;
        goal.status = status;
        self.repo.update_goal(&goal)?;
        self.get_goal(workspace_id, goal_id)
    }

    pub fn get_goal(
        &self,
        workspace_id: WorkspaceId,
        goal_id: GoalId,
    ) -> Result<OkrGoal, OkrServiceError> {
        self.repo
            .get_goal(workspace_id, goal_id)?
            .ok_or_else(|| OkrServiceError::GoalNotFound(goal_id.to_string()))
    }

    pub fn list_goals(
        &self,
        workspace_id: WorkspaceId,
        query: &GoalListQuery,
    ) -> Result<Vec<OkrGoal>, OkrServiceError> {
        Ok(self.repo.list_goals(workspace_id, query)?)
    }

    pub fn goal_tree(
        &self,
        workspace_id: WorkspaceId,
        objective_id: GoalId,
    ) -> Result<GoalTree, OkrServiceError> {
        let objective = self.get_goal(workspace_id, objective_id)?;
        if objective.kind != GoalKind::Objective {
            return Err(OkrServiceError::NotAnObjective(objective_id));
        }
        let key_results = self.repo.list_key_results(workspace_id, objective_id)?;
        Ok(GoalTree {
            objective,
            key_results,
        })
    }

    /// Deletes a goal (and key results of an objective); returns the number
    /// of goals removed.
    pub fn soft_delete_goal(
        &self,
        workspace_id: WorkspaceId,
        goal_id: GoalId,
    ) -> Result<usize, OkrServiceError> {
        let goal = self.get_goal(workspace_id, goal_id)?;
        let removed = self.repo.soft_delete_goal(workspace_id, goal_id)?;
        if let Some(parent_id) = goal.parent_id {
            if let Some(objective) = self.repo.get_goal(workspace_id, parent_id)? {
                self.rollup(workspace_id, objective, None)?;
            }
        }
        info!(
            "event=okr_delete module=service status=ok workspace_id={workspace_id} goal_id={goal_id} removed={removed}"
        );
        Ok(removed)
    }

    /// Recomputes `objective` from stored key results, with `changed`
    /// overriding its stored row, and writes both atomically.
    fn rollup(
        &self,
        workspace_id: WorkspaceId,
        mut objective: OkrGoal,
        changed: Option<OkrGoal>,
    ) -> Result<(), OkrServiceError> {
        let key_results = self.repo.list_key_results(workspace_id, objective.id)?;
        let progress: Vec<u8> = key_results
            .iter()
            .map(|stored| match &changed {
                Some(goal) if goal.id == stored.id => goal.progress,
                _ => stored.progress,
            })
            .collect();
        objective.apply_progress(rollup_progress(&progress))?;

        let mut writes = Vec::with_capacity(2);
        if let Some(goal) = changed {
            writes.push(goal);
        }
        writes.push(objective);
        self.repo.update_goals(&writes)?;
        Ok(())
    }

    fn ensure_owner(
        &self,
        workspace_id: WorkspaceId,
        owner: Option<EmployeeId>,
    ) -> Result<(), OkrServiceError> {
        if let Some(owner) = owner {
            if !self.repo.employee_is_active(workspace_id, owner)? {
                return Err(OkrServiceError::EmployeeNotFound(owner.to_string()));
            }
        }
        Ok(())
    }
}

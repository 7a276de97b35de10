//! Training sessions and enrollments.
//!
//! # Invariants
//! - Capacity is checked and the enrollment written inside one `IMMEDIATE`
//!   transaction; dropped enrollments free their seat.
//! - One enrollment row per (training, employee); re-enrolling reuses it.

use crate::model::training::{
    EmployeeTraining, EnrollmentStatus, Training, TrainingId, TrainingStatus,
};
use crate::model::{EmployeeId, WorkspaceId};
use crate::repo::common::{
    date_to_db, employee_is_active, ensure_connection_ready, optional_date_to_db, parse_date,
    parse_optional_date, parse_unsigned, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const TRAINING_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    title,
    description,
    provider,
    starts_on,
    ends_on,
    capacity,
    status
FROM trainings";

const ENROLLMENT_SELECT_SQL: &str = "SELECT
    e.id,
    e.training_id,
    e.employee_id,
    e.status,
    e.completed_on,
    e.score
FROM employee_trainings e
JOIN trainings t ON t.id = e.training_id";

/// Result of an enrollment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled(EmployeeTraining),
    AlreadyEnrolled,
    Full { capacity: u32 },
    NotAccepting(TrainingStatus),
}

/// Enrollment counts of one training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentCounts {
    /// Enrollments holding a seat (everything but dropped).
    pub active: u32,
    pub completed: u32,
}

pub trait TrainingRepository {
    fn create_training(&self, training: &Training) -> RepoResult<TrainingId>;
    fn update_training(&self, training: &Training) -> RepoResult<()>;
    fn get_training(
        &self,
        workspace_id: WorkspaceId,
        id: TrainingId,
    ) -> RepoResult<Option<Training>>;
    fn list_trainings(
        &self,
        workspace_id: WorkspaceId,
        status: Option<TrainingStatus>,
    ) -> RepoResult<Vec<Training>>;
    fn soft_delete_training(&self, workspace_id: WorkspaceId, id: TrainingId) -> RepoResult<()>;

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool>;
    fn enroll(
        &self,
        workspace_id: WorkspaceId,
        enrollment: &EmployeeTraining,
    ) -> RepoResult<EnrollOutcome>;
    fn get_enrollment(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
        employee_id: EmployeeId,
    ) -> RepoResult<Option<EmployeeTraining>>;
    fn update_enrollment(
        &self,
        workspace_id: WorkspaceId,
        enrollment: &EmployeeTraining,
    ) -> RepoResult<()>;
    fn roster(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
    ) -> RepoResult<Vec<EmployeeTraining>>;
    fn enrollments_for_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<EmployeeTraining>>;
    fn enrollment_counts(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
    ) -> RepoResult<EnrollmentCounts>;
}

pub struct SqliteTrainingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTrainingRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["trainings", "employee_trainings"])?;
        Ok(Self { conn })
    }
}

impl TrainingRepository for SqliteTrainingRepository<'_> {
    fn create_training(&self, training: &Training) -> RepoResult<TrainingId> {
        training.validate()?;
        self.conn.execute(
            "INSERT INTO trainings (
                id,
                workspace_id,
                title,
                description,
                provider,
                starts_on,
                ends_on,
                capacity,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                training.id.to_string(),
                training.workspace_id.to_string(),
                training.title.as_str(),
                training.description.as_deref(),
                training.provider.as_deref(),
                date_to_db(training.starts_on),
                date_to_db(training.ends_on),
                training.capacity,
                training.status.as_str(),
            ],
        )?;
        Ok(training.id)
    }

    fn update_training(&self, training: &Training) -> RepoResult<()> {
        training.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if let Some(capacity) = training.capacity {
            let active = count_active(&tx, training.id)?;
            if active > capacity {
                return Err(RepoError::Conflict(format!(
                    "capacity {capacity} is below {active} active enrollments"
                )));
            }
        }
        let changed = tx.execute(
            "UPDATE trainings
             SET
                title = ?1,
                description = ?2,
                provider = ?3,
                starts_on = ?4,
                ends_on = ?5,
                capacity = ?6,
                status = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?8 AND workspace_id = ?9 AND is_deleted = 0;",
            params![
                training.title.as_str(),
                training.description.as_deref(),
                training.provider.as_deref(),
                date_to_db(training.starts_on),
                date_to_db(training.ends_on),
                training.capacity,
                training.status.as_str(),
                training.id.to_string(),
                training.workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("training", training.id));
        }
        tx.commit()?;
        Ok(())
    }

    fn get_training(
        &self,
        workspace_id: WorkspaceId,
        id: TrainingId,
    ) -> RepoResult<Option<Training>> {
        load_training(self.conn, workspace_id, id)
    }

    fn list_trainings(
        &self,
        workspace_id: WorkspaceId,
        status: Option<TrainingStatus>,
    ) -> RepoResult<Vec<Training>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TRAINING_SELECT_SQL}
             WHERE workspace_id = ?1
               AND is_deleted = 0
               AND (?2 IS NULL OR status = ?2)
             ORDER BY starts_on ASC, title COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![
            workspace_id.to_string(),
            status.map(TrainingStatus::as_str)
        ])?;
        let mut trainings = Vec::new();
        while let Some(row) = rows.next()? {
            trainings.push(parse_training_row(row)?);
        }
        Ok(trainings)
    }

    fn soft_delete_training(&self, workspace_id: WorkspaceId, id: TrainingId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE trainings
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;",
            [id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("training", id));
        }
        Ok(())
    }

    fn employee_is_active(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<bool> {
        employee_is_active(self.conn, workspace_id, employee_id)
    }

    fn enroll(
        &self,
        workspace_id: WorkspaceId,
        enrollment: &EmployeeTraining,
    ) -> RepoResult<EnrollOutcome> {
        enrollment.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let training = load_training(&tx, workspace_id, enrollment.training_id)?
            .ok_or_else(|| RepoError::not_found("training", enrollment.training_id))?;
        if !training.status.accepts_enrollment() {
            return Ok(EnrollOutcome::NotAccepting(training.status));
        }

        let existing = load_enrollment(
            &tx,
            workspace_id,
            enrollment.training_id,
            enrollment.employee_id,
        )?;
        if existing
            .as_ref()
            .is_some_and(|stored| stored.status.holds_seat())
        {
            return Ok(EnrollOutcome::AlreadyEnrolled);
        }

        if let Some(capacity) = training.capacity {
            if count_active(&tx, training.id)? >= capacity {
                return Ok(EnrollOutcome::Full { capacity });
            }
        }

        let stored = match existing {
            Some(mut dropped) => {
                tx.execute(
                    "UPDATE employee_trainings
                     SET status = 'enrolled', completed_on = NULL, score = NULL,
                         updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?1;",
                    [dropped.id.to_string()],
                )?;
                dropped.status = EnrollmentStatus::Enrolled;
                dropped.completed_on = None;
                dropped.score = None;
                dropped
            }
            None => {
                tx.execute(
                    "INSERT INTO employee_trainings (id, training_id, employee_id, status)
                     VALUES (?1, ?2, ?3, 'enrolled');",
                    [
                        enrollment.id.to_string(),
                        enrollment.training_id.to_string(),
                        enrollment.employee_id.to_string(),
                    ],
                )?;
                EmployeeTraining {
                    status: EnrollmentStatus::Enrolled,
                    completed_on: None,
                    score: None,
                    ..enrollment.clone()
                }
            }
        };
        tx.commit()?;
        Ok(EnrollOutcome::Enrolled(stored))
    }

    fn get_enrollment(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
        employee_id: EmployeeId,
    ) -> RepoResult<Option<EmployeeTraining>> {
        load_enrollment(self.conn, workspace_id, training_id, employee_id)
    }

    fn update_enrollment(
        &self,
        workspace_id: WorkspaceId,
        enrollment: &EmployeeTraining,
    ) -> RepoResult<()> {
        enrollment.validate()?;
        let changed = self.conn.execute(
            "UPDATE employee_trainings
             SET
                status = ?1,
                completed_on = ?2,
                score = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4
               AND training_id IN (SELECT id FROM trainings WHERE workspace_id = ?5);",
            params![
                enrollment.status.as_str(),
                optional_date_to_db(enrollment.completed_on),
                enrollment.score,
                enrollment.id.to_string(),
                workspace_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("enrollment", enrollment.id));
        }
        Ok(())
    }

    fn roster(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
    ) -> RepoResult<Vec<EmployeeTraining>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENROLLMENT_SELECT_SQL}
             WHERE e.training_id = ?1 AND t.workspace_id = ?2
             ORDER BY e.created_at ASC, e.id ASC;"
        ))?;
        let mut rows = stmt.query([training_id.to_string(), workspace_id.to_string()])?;
        let mut roster = Vec::new();
        while let Some(row) = rows.next()? {
            roster.push(parse_enrollment_row(row)?);
        }
        Ok(roster)
    }

    fn enrollments_for_employee(
        &self,
        workspace_id: WorkspaceId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<EmployeeTraining>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENROLLMENT_SELECT_SQL}
             WHERE e.employee_id = ?1 AND t.workspace_id = ?2 AND t.is_deleted = 0
             ORDER BY t.starts_on ASC, e.id ASC;"
        ))?;
        let mut rows = stmt.query([employee_id.to_string(), workspace_id.to_string()])?;
        let mut enrollments = Vec::new();
        while let Some(row) = rows.next()? {
            enrollments.push(parse_enrollment_row(row)?);
        }
        Ok(enrollments)
    }

    fn enrollment_counts(
        &self,
        workspace_id: WorkspaceId,
        training_id: TrainingId,
    ) -> RepoResult<EnrollmentCounts> {
        let (active, completed): (i64, i64) = self.conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN e.status <> 'dropped' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN e.status = 'completed' THEN 1 ELSE 0 END), 0)
             FROM employee_trainings e
             JOIN trainings t ON t.id = e.training_id
             WHERE e.training_id = ?1 AND t.workspace_id = ?2;",
            [training_id.to_string(), workspace_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(EnrollmentCounts {
            active: parse_unsigned(active, "employee_trainings.active")?,
            completed: parse_unsigned(completed, "employee_trainings.completed")?,
        })
    }
}

fn count_active(conn: &Connection, training_id: TrainingId) -> RepoResult<u32> {
    let active: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM employee_trainings
         WHERE training_id = ?1 AND status <> 'dropped';",
        [training_id.to_string()],
        |row| row.get(0),
    )?;
    parse_unsigned(active, "employee_trainings.count")
}

fn load_training(
    conn: &Connection,
    workspace_id: WorkspaceId,
    id: TrainingId,
) -> RepoResult<Option<Training>> {
    conn.query_row(
        &format!("{TRAINING_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;"),
        [id.to_string(), workspace_id.to_string()],
        |row| Ok(parse_training_row(row)),
    )
    .optional()?
    .transpose()
}

fn load_enrollment(
    conn: &Connection,
    workspace_id: WorkspaceId,
    training_id: TrainingId,
    employee_id: EmployeeId,
) -> RepoResult<Option<EmployeeTraining>> {
    conn.query_row(
        &format!(
            "{ENROLLMENT_SELECT_SQL}
             WHERE e.training_id = ?1 AND e.employee_id = ?2 AND t.workspace_id = ?3;"
        ),
        [
            training_id.to_string(),
            employee_id.to_string(),
            workspace_id.to_string(),
        ],
        |row| Ok(parse_enrollment_row(row)),
    )
    .optional()?
    .transpose()
}

fn parse_training_row(row: &Row<'_>) -> RepoResult<Training> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let starts_on: String = row.get(5)?;
    let ends_on: String = row.get(6)?;
    let capacity: Option<i64> = row.get(7)?;
    let status: String = row.get(8)?;
    Ok(Training {
        id: parse_uuid(&id, "trainings.id")?,
        workspace_id: parse_uuid(&workspace_id, "trainings.workspace_id")?,
        title: row.get(2)?,
        description: row.get(3)?,
        provider: row.get(4)?,
        starts_on: parse_date(&starts_on, "trainings.starts_on")?,
        ends_on: parse_date(&ends_on, "trainings.ends_on")?,
        capacity: capacity
            .map(|value| parse_unsigned(value, "trainings.capacity"))
            .transpose()?,
        status: TrainingStatus::parse(&status).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid trainings.status `{status}`"))
        })?,
    })
}

fn parse_enrollment_row(row: &Row<'_>) -> RepoResult<EmployeeTraining> {
    let id: String = row.get(0)?;
    let training_id: String = row.get(1)?;
    let employee_id: String = row.get(2)?;
    let status: String = row.get(3)?;
    let score: Option<i64> = row.get(5)?;
    Ok(EmployeeTraining {
        id: parse_uuid(&id, "employee_trainings.id")?,
        training_id: parse_uuid(&training_id, "employee_trainings.training_id")?,
        employee_id: parse_uuid(&employee_id, "employee_trainings.employee_id")?,
        status: EnrollmentStatus::parse(&status).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid employee_trainings.status `{status}`"))
        })?,
        completed_on: parse_optional_date(row.get(4)?, "employee_trainings.completed_on")?,
        score: score
            .map(|value| parse_unsigned(value, "employee_trainings.score"))
            .transpose()?,
    })
}

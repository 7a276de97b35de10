mod common;

use bizdesk_core::db::open_db_in_memory;
use bizdesk_core::model::training::{EnrollmentStatus, Training, TrainingStatus};
use bizdesk_core::repo::training_repo::SqliteTrainingRepository;
use bizdesk_core::service::training_service::TrainingServiceError;
use bizdesk_core::TrainingService;
use common::date;

#[test]
fn capacity_is_never_exceeded() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let staff: Vec<_> = ["Ann", "Ben", "Cid"]
        .into_iter()
        .map(|name| common::hire(&conn, &seed.workspace, name, "Staff"))
        .collect();
    let service = TrainingService::new(SqliteTrainingRepository::try_new(&conn).unwrap());

    let mut training = Training::new(ws, "Rust 101", date(2025, 5, 1), date(2025, 5, 3));
    training.capacity = Some(2);
    let training = service.create_training(&training).unwrap();

    service.enroll(ws, training.id, staff[0].id).unwrap();
    service.enroll(ws, training.id, staff[1].id).unwrap();
    let err = service.enroll(ws, training.id, staff[2].id).unwrap_err();
    assert!(matches!(
        err,
        TrainingServiceError::TrainingFull { capacity: 2, .. }
    ));

    let dropped = service.drop(ws, training.id, staff[0].id).unwrap();
    assert_eq!(dropped.status, EnrollmentStatus::Dropped);
    service.enroll(ws, training.id, staff[2].id).unwrap();
    assert_eq!(service.roster(ws, training.id).unwrap().len(), 3);

    let err = service.enroll(ws, training.id, staff[0].id).unwrap_err();
    assert!(matches!(err, TrainingServiceError::TrainingFull { .. }));

    let mut shrunk = training.clone();
    shrunk.capacity = Some(1);
    let err = service.update_training(&shrunk).unwrap_err();
    assert!(matches!(err, TrainingServiceError::CapacityBelowEnrolled(1)));
}

#[test]
fn duplicate_and_closed_enrollments_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let ann = common::hire(&conn, &seed.workspace, "Ann", "Staff");
    let service = TrainingService::new(SqliteTrainingRepository::try_new(&conn).unwrap());
    let training = service
        .create_training(&Training::new(ws, "Security", date(2025, 6, 1), date(2025, 6, 1)))
        .unwrap();

    service.enroll(ws, training.id, ann.id).unwrap();
    let err = service.enroll(ws, training.id, ann.id).unwrap_err();
    assert!(matches!(err, TrainingServiceError::AlreadyEnrolled { .. }));

    let mut cancelled = training.clone();
    cancelled.status = TrainingStatus::Cancelled;
    service.update_training(&cancelled).unwrap();
    let bob = common::hire(&conn, &seed.workspace, "Bob", "Staff");
    let err = service.enroll(ws, training.id, bob.id).unwrap_err();
    assert!(matches!(
        err,
        TrainingServiceError::NotAccepting {
            status: TrainingStatus::Cancelled,
            ..
        }
    ));

    let err = service
        .enroll(ws, uuid::Uuid::new_v4(), ann.id)
        .unwrap_err();
    assert!(matches!(err, TrainingServiceError::TrainingNotFound(_)));
}

#[test]
fn completion_flow_and_rate() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let ann = common::hire(&conn, &seed.workspace, "Ann", "Staff");
    let ben = common::hire(&conn, &seed.workspace, "Ben", "Staff");
    let cid = common::hire(&conn, &seed.workspace, "Cid", "Staff");
    let service = TrainingService::new(SqliteTrainingRepository::try_new(&conn).unwrap());
    let training = service
        .create_training(&Training::new(ws, "Leadership", date(2025, 7, 1), date(2025, 7, 5)))
        .unwrap();
    assert_eq!(service.completion_rate(ws, training.id).unwrap(), 0.0);

    for employee in [&ann, &ben, &cid] {
        service.enroll(ws, training.id, employee.id).unwrap();
    }
    let started = service.start(ws, training.id, ann.id).unwrap();
    assert_eq!(started.status, EnrollmentStatus::InProgress);
    let err = service.start(ws, training.id, ann.id).unwrap_err();
    assert!(matches!(
        err,
        TrainingServiceError::InvalidEnrollmentState(EnrollmentStatus::InProgress)
    ));

    let err = service
        .complete_enrollment(ws, training.id, ann.id, date(2025, 7, 5), Some(101))
        .unwrap_err();
    assert!(matches!(err, TrainingServiceError::Validation(_)));

    let done = service
        .complete_enrollment(ws, training.id, ann.id, date(2025, 7, 5), Some(92))
        .unwrap();
    assert_eq!(done.status, EnrollmentStatus::Completed);
    assert_eq!(done.score, Some(92));

    let err = service.drop(ws, training.id, ann.id).unwrap_err();
    assert!(matches!(
        err,
        TrainingServiceError::InvalidEnrollmentState(EnrollmentStatus::Completed)
    ));

    // 1 of 3 seat holders completed
    assert_eq!(service.completion_rate(ws, training.id).unwrap(), 33.33);
    service.drop(ws, training.id, cid.id).unwrap();
    assert_eq!(service.completion_rate(ws, training.id).unwrap(), 50.0);

    let history = service.trainings_for_employee(ws, ann.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].completed_on, Some(date(2025, 7, 5)));

    let err = service
        .complete_enrollment(ws, training.id, uuid::Uuid::new_v4(), date(2025, 7, 5), None)
        .unwrap_err();
    assert!(matches!(err, TrainingServiceError::EnrollmentNotFound { .. }));
}

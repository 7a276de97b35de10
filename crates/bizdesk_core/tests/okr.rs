mod common;

use bizdesk_core::db::open_db_in_memory;
use bizdesk_core::model::okr::{GoalKind, GoalStatus, OkrGoal};
use bizdesk_core::repo::okr_repo::{GoalListQuery, SqliteOkrRepository};
use bizdesk_core::service::okr_service::{NewKeyResult, OkrServiceError};
use bizdesk_core::OkrService;

fn key_result(title: &str) -> NewKeyResult {
    NewKeyResult {
        title: title.to_string(),
        ..NewKeyResult::default()
    }
}

#[test]
fn progress_outside_range_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = OkrService::new(SqliteOkrRepository::try_new(&conn).unwrap());
    let objective = service
        .create_objective(OkrGoal::objective(seed.workspace.id, "Ship v2", "2025-Q1"))
        .unwrap();

    for value in [-1, 101, 1_000] {
        let err = service
            .update_progress(seed.workspace.id, objective.id, value)
            .unwrap_err();
        assert!(matches!(err, OkrServiceError::InvalidProgress(v) if v == value));
    }
}

#[test]
fn objective_progress_follows_key_results() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = OkrService::new(SqliteOkrRepository::try_new(&conn).unwrap());
    let objective = service
        .create_objective(OkrGoal::objective(seed.workspace.id, "Grow revenue", "2025"))
        .unwrap();

    let first = service
        .add_key_result(seed.workspace.id, objective.id, key_result("Close 10 deals"))
        .unwrap();
    let second = service
        .add_key_result(seed.workspace.id, objective.id, key_result("Launch EU"))
        .unwrap();
    let third = service
        .add_key_result(seed.workspace.id, objective.id, key_result("Hire 2 reps"))
        .unwrap();
    assert_eq!(first.kind, GoalKind::KeyResult);
    assert_eq!(first.parent_id, Some(objective.id));

    service
        .update_progress(seed.workspace.id, first.id, 40)
        .unwrap();
    service
        .update_progress(seed.workspace.id, second.id, 60)
        .unwrap();
    let done = service
        .update_progress(seed.workspace.id, third.id, 100)
        .unwrap();
    assert_eq!(done.status, GoalStatus::Completed);

    let tree = service.goal_tree(seed.workspace.id, objective.id).unwrap();
    // (40 + 60 + 100) / 3 = 66.67
    assert_eq!(tree.objective.progress, 67);
    assert_eq!(tree.objective.status, GoalStatus::OnTrack);
    assert_eq!(tree.key_results.len(), 3);

    let err = service
        .update_progress(seed.workspace.id, objective.id, 10)
        .unwrap_err();
    assert!(matches!(err, OkrServiceError::ProgressDerived(_)));
}

#[test]
fn all_key_results_done_completes_objective() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = OkrService::new(SqliteOkrRepository::try_new(&conn).unwrap());
    let objective = service
        .create_objective(OkrGoal::objective(seed.workspace.id, "Stabilize", "2025-Q2"))
        .unwrap();
    let only = service
        .add_key_result(seed.workspace.id, objective.id, key_result("Zero P1s"))
        .unwrap();

    service
        .update_progress(seed.workspace.id, only.id, 100)
        .unwrap();
    let objective = service.get_goal(seed.workspace.id, objective.id).unwrap();
    assert_eq!(objective.progress, 100);
    assert_eq!(objective.status, GoalStatus::Completed);
}

#[test]
fn leaf_objective_takes_progress_directly() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = OkrService::new(SqliteOkrRepository::try_new(&conn).unwrap());
    let objective = service
        .create_objective(OkrGoal::objective(seed.workspace.id, "Write handbook", "2025"))
        .unwrap();

    let updated = service
        .update_progress(seed.workspace.id, objective.id, 30)
        .unwrap();
    assert_eq!(updated.progress, 30);
    assert_eq!(updated.status, GoalStatus::OnTrack);

    let at_risk = service
        .set_status(seed.workspace.id, objective.id, GoalStatus::AtRisk)
        .unwrap();
    assert_eq!(at_risk.status, GoalStatus::AtRisk);
}

#[test]
fn delete_objective_cascades_and_key_result_delete_rerolls() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let owner = common::hire(&conn, &seed.workspace, "Olive", "Owner");
    let service = OkrService::new(SqliteOkrRepository::try_new(&conn).unwrap());

    let mut goal = OkrGoal::objective(seed.workspace.id, "Quality", "2025-Q3");
    goal.owner_employee_id = Some(owner.id);
    let objective = service.create_objective(goal).unwrap();
    let low = service
        .add_key_result(seed.workspace.id, objective.id, key_result("Coverage"))
        .unwrap();
    let high = service
        .add_key_result(seed.workspace.id, objective.id, key_result("Latency"))
        .unwrap();
    assert_eq!(low.owner_employee_id, Some(owner.id));
    service.update_progress(seed.workspace.id, low.id, 20).unwrap();
    service.update_progress(seed.workspace.id, high.id, 80).unwrap();
    assert_eq!(
        service.get_goal(seed.workspace.id, objective.id).unwrap().progress,
        50
    );

    assert_eq!(service.soft_delete_goal(seed.workspace.id, low.id).unwrap(), 1);
    assert_eq!(
        service.get_goal(seed.workspace.id, objective.id).unwrap().progress,
        80
    );

    let by_owner = service
        .list_goals(
            seed.workspace.id,
            &GoalListQuery {
                owner_employee_id: Some(owner.id),
                ..GoalListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(by_owner.len(), 2);

    assert_eq!(
        service.soft_delete_goal(seed.workspace.id, objective.id).unwrap(),
        2
    );
    let err = service.get_goal(seed.workspace.id, high.id).unwrap_err();
    assert!(matches!(err, OkrServiceError::GoalNotFound(_)));
}

#[test]
fn key_results_need_an_objective_parent() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = OkrService::new(SqliteOkrRepository::try_new(&conn).unwrap());
    let objective = service
        .create_objective(OkrGoal::objective(seed.workspace.id, "Parent", "2025"))
        .unwrap();
    let child = service
        .add_key_result(seed.workspace.id, objective.id, key_result("Child"))
        .unwrap();

    let err = service
        .add_key_result(seed.workspace.id, child.id, key_result("Grandchild"))
        .unwrap_err();
    assert!(matches!(err, OkrServiceError::NotAnObjective(id) if id == child.id));
}

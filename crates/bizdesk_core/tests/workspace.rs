mod common;

use bizdesk_core::db::open_db_in_memory;
use bizdesk_core::model::workspace::EmployeeStatus;
use bizdesk_core::repo::workspace_repo::{EmployeeListQuery, SqliteWorkspaceRepository};
use bizdesk_core::service::workspace_service::{NewEmployee, WorkspaceServiceError};
use bizdesk_core::WorkspaceService;
use common::date;
use uuid::Uuid;

#[test]
fn register_user_normalizes_email_and_rejects_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(&conn).unwrap());

    let user = service
        .register_user("  Ada Lovelace ", "Ada@Example.com ")
        .unwrap();
    assert_eq!(user.name, "Ada Lovelace");
    assert_eq!(user.email, "ada@example.com");

    let err = service
        .register_user("Ada Again", "ADA@example.com")
        .unwrap_err();
    assert!(matches!(err, WorkspaceServiceError::EmailTaken(email) if email == "ada@example.com"));

    let err = service.register_user("Nobody", "not-an-email").unwrap_err();
    assert!(matches!(err, WorkspaceServiceError::Validation(_)));
}

#[test]
fn workspace_keys_are_suffixed_on_collision() {
    let conn = open_db_in_memory().unwrap();
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(&conn).unwrap());
    let owner = service.register_user("Owner", "owner@example.com").unwrap();

    let first = service.create_workspace(owner.id, "Website Redesign").unwrap();
    let second = service.create_workspace(owner.id, "Web Rollout").unwrap();
    let third = service.create_workspace(owner.id, "Wide Reach").unwrap();

    assert_eq!(first.key, "WR");
    assert_eq!(second.key, "WR2");
    assert_eq!(third.key, "WR3");
    assert_eq!(service.list_workspaces(Some(owner.id)).unwrap().len(), 3);
}

#[test]
fn create_workspace_requires_existing_owner() {
    let conn = open_db_in_memory().unwrap();
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(&conn).unwrap());

    let err = service.create_workspace(Uuid::new_v4(), "Ghost").unwrap_err();
    assert!(matches!(err, WorkspaceServiceError::UserNotFound(_)));
}

#[test]
fn add_employee_generates_code_when_missing() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(&conn).unwrap());

    let employee = service
        .add_employee(
            seed.workspace.id,
            NewEmployee {
                first_name: "Linus".to_string(),
                last_name: "Torvalds".to_string(),
                hire_date: Some(date(2024, 1, 15)),
                ..NewEmployee::default()
            },
        )
        .unwrap();

    let code = employee.employee_code.strip_prefix("EMP-").unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert!(!code.starts_with('0'));
    assert_eq!(employee.status, EmployeeStatus::Active);
    assert_eq!(employee.hire_date, Some(date(2024, 1, 15)));
}

#[test]
fn duplicate_employee_code_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(&conn).unwrap());
    let input = NewEmployee {
        employee_code: Some("E-001".to_string()),
        first_name: "Barbara".to_string(),
        last_name: "Liskov".to_string(),
        ..NewEmployee::default()
    };

    service.add_employee(seed.workspace.id, input.clone()).unwrap();
    let err = service.add_employee(seed.workspace.id, input).unwrap_err();
    assert!(matches!(err, WorkspaceServiceError::DuplicateEmployeeCode(code) if code == "E-001"));
}

#[test]
fn deactivate_employee_is_idempotent_and_filterable() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let keep = common::hire(&conn, &seed.workspace, "Ken", "Thompson");
    let leave = common::hire(&conn, &seed.workspace, "Dennis", "Ritchie");
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(&conn).unwrap());

    let first = service
        .deactivate_employee(seed.workspace.id, leave.id)
        .unwrap();
    let second = service
        .deactivate_employee(seed.workspace.id, leave.id)
        .unwrap();
    assert_eq!(first.status, EmployeeStatus::Terminated);
    assert_eq!(second.status, EmployeeStatus::Terminated);

    let active = service
        .list_employees(
            seed.workspace.id,
            &EmployeeListQuery {
                status: Some(EmployeeStatus::Active),
                ..EmployeeListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, keep.id);
}

#[test]
fn update_employee_changes_fields() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let mut employee = common::hire(&conn, &seed.workspace, "Margaret", "Hamilton");
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(&conn).unwrap());

    employee.position = Some("Director".to_string());
    employee.department = Some("Engineering".to_string());
    let updated = service.update_employee(&employee).unwrap();
    assert_eq!(updated.position.as_deref(), Some("Director"));

    let found = service
        .list_employees(
            seed.workspace.id,
            &EmployeeListQuery {
                search: Some("hamil".to_string()),
                ..EmployeeListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(found.len(), 1);
}

#![allow(dead_code)]

use bizdesk_core::model::workspace::{Employee, User, Workspace};
use bizdesk_core::repo::workspace_repo::SqliteWorkspaceRepository;
use bizdesk_core::service::workspace_service::NewEmployee;
use bizdesk_core::WorkspaceService;
use chrono::NaiveDate;
use rusqlite::Connection;

pub struct Seed {
    pub user: User,
    pub workspace: Workspace,
}

pub fn seed(conn: &Connection) -> Seed {
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(conn).unwrap());
    let user = service
        .register_user("Grace Hopper", "grace@example.com")
        .unwrap();
    let workspace = service.create_workspace(user.id, "Acme Corp").unwrap();
    Seed { user, workspace }
}

pub fn hire(conn: &Connection, workspace: &Workspace, first: &str, last: &str) -> Employee {
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(conn).unwrap());
    service
        .add_employee(
            workspace.id,
            NewEmployee {
                first_name: first.to_string(),
                last_name: last.to_string(),
                ..NewEmployee::default()
            },
        )
        .unwrap()
}

pub fn register(conn: &Connection, name: &str, email: &str) -> User {
    let service = WorkspaceService::new(SqliteWorkspaceRepository::try_new(conn).unwrap());
    service.register_user(name, email).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

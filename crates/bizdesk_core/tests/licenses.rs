mod common;

use bizdesk_core::db::open_db_in_memory;
use bizdesk_core::model::license::SoftwareLicense;
use bizdesk_core::repo::license_repo::{LicenseListQuery, SqliteLicenseRepository};
use bizdesk_core::service::license_service::LicenseServiceError;
use bizdesk_core::LicenseService;
use common::date;

fn pool(workspace_id: uuid::Uuid, name: &str, seats: u32) -> SoftwareLicense {
    let mut license = SoftwareLicense::new(workspace_id, name, seats);
    license.cost_per_license = 12_000;
    license
}

#[test]
fn assign_consumes_seats_until_exhausted() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let bob = common::hire(&conn, &seed.workspace, "Bob", "Roe");
    let service = LicenseService::new(SqliteLicenseRepository::try_new(&conn).unwrap());
    let license = service
        .create_license(pool(seed.workspace.id, "Figma", 1))
        .unwrap();
    assert_eq!(license.used_licenses, 0);

    service
        .assign_license(seed.workspace.id, license.id, alice.id, date(2025, 1, 1))
        .unwrap();
    let stored = service.get_license(seed.workspace.id, license.id).unwrap();
    assert_eq!(stored.used_licenses, 1);
    assert_eq!(stored.available_licenses(), 0);

    let err = service
        .assign_license(seed.workspace.id, license.id, bob.id, date(2025, 1, 2))
        .unwrap_err();
    assert!(matches!(err, LicenseServiceError::NoSeatsAvailable(id) if id == license.id));
}

#[test]
fn duplicate_assignment_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let service = LicenseService::new(SqliteLicenseRepository::try_new(&conn).unwrap());
    let license = service
        .create_license(pool(seed.workspace.id, "Slack", 5))
        .unwrap();

    service
        .assign_license(seed.workspace.id, license.id, alice.id, date(2025, 1, 1))
        .unwrap();
    let err = service
        .assign_license(seed.workspace.id, license.id, alice.id, date(2025, 1, 2))
        .unwrap_err();
    assert!(matches!(err, LicenseServiceError::AlreadyAssigned { .. }));
    assert_eq!(
        service
            .get_license(seed.workspace.id, license.id)
            .unwrap()
            .used_licenses,
        1
    );
}

#[test]
fn revoke_frees_the_seat() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let bob = common::hire(&conn, &seed.workspace, "Bob", "Roe");
    let service = LicenseService::new(SqliteLicenseRepository::try_new(&conn).unwrap());
    let license = service
        .create_license(pool(seed.workspace.id, "JetBrains", 1))
        .unwrap();

    service
        .assign_license(seed.workspace.id, license.id, alice.id, date(2025, 1, 1))
        .unwrap();
    let revoked = service
        .revoke_license(seed.workspace.id, license.id, alice.id, date(2025, 2, 1))
        .unwrap();
    assert_eq!(revoked.revoked_on, Some(date(2025, 2, 1)));
    assert_eq!(
        service
            .get_license(seed.workspace.id, license.id)
            .unwrap()
            .used_licenses,
        0
    );

    service
        .assign_license(seed.workspace.id, license.id, bob.id, date(2025, 2, 2))
        .unwrap();
    let holders = service.seat_holders(seed.workspace.id, license.id).unwrap();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].employee_id, bob.id);

    let err = service
        .revoke_license(seed.workspace.id, license.id, alice.id, date(2025, 3, 1))
        .unwrap_err();
    assert!(matches!(err, LicenseServiceError::NotAssigned { .. }));
}

#[test]
fn total_cannot_drop_below_used_and_delete_needs_free_pool() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let bob = common::hire(&conn, &seed.workspace, "Bob", "Roe");
    let service = LicenseService::new(SqliteLicenseRepository::try_new(&conn).unwrap());
    let license = service
        .create_license(pool(seed.workspace.id, "Zoom", 3))
        .unwrap();
    for employee in [&alice, &bob] {
        service
            .assign_license(seed.workspace.id, license.id, employee.id, date(2025, 1, 1))
            .unwrap();
    }

    let mut shrunk = license.clone();
    shrunk.total_licenses = 1;
    let err = service.update_license(&shrunk).unwrap_err();
    assert!(matches!(
        err,
        LicenseServiceError::TotalBelowUsed { total: 1, used: 2 }
    ));

    let err = service
        .soft_delete_license(seed.workspace.id, license.id)
        .unwrap_err();
    assert!(matches!(err, LicenseServiceError::SeatsInUse(_)));

    let mut renamed = license.clone();
    renamed.name = "Zoom Business".to_string();
    renamed.used_licenses = 0;
    let updated = service.update_license(&renamed).unwrap();
    assert_eq!(updated.name, "Zoom Business");
    assert_eq!(updated.used_licenses, 2);
}

#[test]
fn expiring_and_employee_views() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let service = LicenseService::new(SqliteLicenseRepository::try_new(&conn).unwrap())
        .with_warning_days(30);

    let mut soon = pool(seed.workspace.id, "Adobe", 2);
    soon.expiry_date = Some(date(2025, 6, 15));
    let soon = service.create_license(soon).unwrap();
    let mut later = pool(seed.workspace.id, "Notion", 2);
    later.expiry_date = Some(date(2026, 6, 15));
    service.create_license(later).unwrap();

    let expiring = service
        .expiring_licenses(seed.workspace.id, date(2025, 6, 1))
        .unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].id, soon.id);

    service
        .assign_license(seed.workspace.id, soon.id, alice.id, date(2025, 1, 1))
        .unwrap();
    let held = service
        .licenses_for_employee(seed.workspace.id, alice.id)
        .unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].name, "Adobe");

    let free = service
        .list_licenses(
            seed.workspace.id,
            &LicenseListQuery {
                with_free_seats: true,
                ..LicenseListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(free.len(), 2);
}

#[test]
fn utilization_summary_totals_seats_and_cost() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let service = LicenseService::new(SqliteLicenseRepository::try_new(&conn).unwrap());

    let a = service
        .create_license(pool(seed.workspace.id, "A", 3))
        .unwrap();
    service
        .create_license(pool(seed.workspace.id, "B", 1))
        .unwrap();
    service
        .assign_license(seed.workspace.id, a.id, alice.id, date(2025, 1, 1))
        .unwrap();

    let summary = service.utilization_summary(seed.workspace.id).unwrap();
    assert_eq!(summary.pools, 2);
    assert_eq!(summary.total_seats, 4);
    assert_eq!(summary.used_seats, 1);
    assert_eq!(summary.available_seats, 3);
    assert_eq!(summary.total_cost, 48_000);
    assert!((summary.utilization_percent - 25.0).abs() < f64::EPSILON);
}

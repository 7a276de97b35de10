mod common;

use bizdesk_core::db::open_db_in_memory;
use bizdesk_core::model::asset::{Asset, AssetStatus, ReturnCondition, WarrantyStatus};
use bizdesk_core::repo::asset_repo::{AssetListQuery, SqliteAssetRepository};
use bizdesk_core::service::asset_service::AssetServiceError;
use bizdesk_core::AssetService;
use common::date;

#[test]
fn created_asset_is_available() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = AssetService::new(SqliteAssetRepository::try_new(&conn).unwrap());

    let mut asset = Asset::new(seed.workspace.id, "MacBook Pro", "  LT-001 ");
    asset.status = AssetStatus::Retired;
    asset.purchase_cost = 249_900;
    let created = service.create_asset(asset).unwrap();

    assert_eq!(created.status, AssetStatus::Available);
    assert_eq!(created.asset_tag, "LT-001");
    assert_eq!(created.purchase_cost, 249_900);
}

#[test]
fn duplicate_tag_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = AssetService::new(SqliteAssetRepository::try_new(&conn).unwrap());

    service
        .create_asset(Asset::new(seed.workspace.id, "Monitor", "MN-1"))
        .unwrap();
    let err = service
        .create_asset(Asset::new(seed.workspace.id, "Monitor 2", "MN-1"))
        .unwrap_err();
    assert!(matches!(err, AssetServiceError::DuplicateAssetTag(tag) if tag == "MN-1"));
}

#[test]
fn assign_then_double_assign_then_return() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let bob = common::hire(&conn, &seed.workspace, "Bob", "Roe");
    let service = AssetService::new(SqliteAssetRepository::try_new(&conn).unwrap());
    let asset = service
        .create_asset(Asset::new(seed.workspace.id, "ThinkPad", "LT-7"))
        .unwrap();

    let assignment = service
        .assign_asset(
            seed.workspace.id,
            asset.id,
            alice.id,
            date(2025, 1, 6),
            Some(date(2025, 6, 30)),
            None,
        )
        .unwrap();
    assert!(assignment.is_open());
    assert_eq!(
        service.get_asset(seed.workspace.id, asset.id).unwrap().status,
        AssetStatus::Assigned
    );

    let err = service
        .assign_asset(seed.workspace.id, asset.id, bob.id, date(2025, 1, 7), None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        AssetServiceError::NotAvailable {
            status: AssetStatus::Assigned,
            ..
        }
    ));

    let err = service
        .soft_delete_asset(seed.workspace.id, asset.id)
        .unwrap_err();
    assert!(matches!(err, AssetServiceError::AssetAssigned(_)));

    let closed = service
        .return_asset(
            seed.workspace.id,
            asset.id,
            date(2025, 3, 1),
            ReturnCondition::Good,
            Some("all good".to_string()),
        )
        .unwrap();
    assert_eq!(closed.returned_on, Some(date(2025, 3, 1)));
    assert_eq!(closed.condition_on_return, Some(ReturnCondition::Good));
    assert_eq!(
        service.get_asset(seed.workspace.id, asset.id).unwrap().status,
        AssetStatus::Available
    );
    assert_eq!(
        service
            .assignment_history(seed.workspace.id, asset.id)
            .unwrap()
            .len(),
        1
    );
    assert!(service
        .assets_held_by(seed.workspace.id, alice.id)
        .unwrap()
        .is_empty());
}

#[test]
fn damaged_return_moves_to_maintenance() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let alice = common::hire(&conn, &seed.workspace, "Alice", "Doe");
    let service = AssetService::new(SqliteAssetRepository::try_new(&conn).unwrap());
    let asset = service
        .create_asset(Asset::new(seed.workspace.id, "Phone", "PH-1"))
        .unwrap();

    service
        .assign_asset(seed.workspace.id, asset.id, alice.id, date(2025, 2, 1), None, None)
        .unwrap();
    service
        .return_asset(
            seed.workspace.id,
            asset.id,
            date(2025, 2, 10),
            ReturnCondition::Damaged,
            None,
        )
        .unwrap();

    let stored = service.get_asset(seed.workspace.id, asset.id).unwrap();
    assert_eq!(stored.status, AssetStatus::Maintenance);

    let err = service
        .return_asset(
            seed.workspace.id,
            asset.id,
            date(2025, 2, 11),
            ReturnCondition::Good,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, AssetServiceError::NotAssigned(_)));
}

#[test]
fn set_status_refuses_assigned() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = AssetService::new(SqliteAssetRepository::try_new(&conn).unwrap());
    let asset = service
        .create_asset(Asset::new(seed.workspace.id, "Projector", "PJ-1"))
        .unwrap();

    let err = service
        .set_status(seed.workspace.id, asset.id, AssetStatus::Assigned)
        .unwrap_err();
    assert!(matches!(err, AssetServiceError::InvalidStatus(AssetStatus::Assigned)));

    let retired = service
        .set_status(seed.workspace.id, asset.id, AssetStatus::Retired)
        .unwrap();
    assert_eq!(retired.status, AssetStatus::Retired);
}

#[test]
fn warranty_classification_and_expiring_list() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service =
        AssetService::new(SqliteAssetRepository::try_new(&conn).unwrap()).with_warning_days(30);
    let today = date(2025, 5, 1);

    let mut soon = Asset::new(seed.workspace.id, "Router", "NW-1");
    soon.warranty_expiry = Some(date(2025, 5, 20));
    let soon = service.create_asset(soon).unwrap();

    let mut expired = Asset::new(seed.workspace.id, "Switch", "NW-2");
    expired.warranty_expiry = Some(date(2025, 4, 1));
    let expired = service.create_asset(expired).unwrap();

    let mut valid = Asset::new(seed.workspace.id, "Server", "SV-1");
    valid.warranty_expiry = Some(date(2027, 1, 1));
    let valid = service.create_asset(valid).unwrap();

    let none = service
        .create_asset(Asset::new(seed.workspace.id, "Desk", "DK-1"))
        .unwrap();

    let status = |id| service.warranty_status(seed.workspace.id, id, today).unwrap();
    assert_eq!(status(soon.id), WarrantyStatus::ExpiringSoon);
    assert_eq!(status(expired.id), WarrantyStatus::Expired);
    assert_eq!(status(valid.id), WarrantyStatus::Valid);
    assert_eq!(status(none.id), WarrantyStatus::None);

    let expiring = service
        .expiring_warranties(seed.workspace.id, today)
        .unwrap();
    let ids: Vec<_> = expiring.iter().map(|report| report.asset.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&soon.id));
    assert!(ids.contains(&expired.id));
}

#[test]
fn list_filters_and_inventory_summary() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let service = AssetService::new(SqliteAssetRepository::try_new(&conn).unwrap());
    let laptops = service
        .create_category(seed.workspace.id, "Laptops", None)
        .unwrap();

    let mut laptop = Asset::new(seed.workspace.id, "Dell XPS", "LT-100");
    laptop.category_id = Some(laptops.id);
    laptop.serial_number = Some("SN-ABC-123".to_string());
    laptop.purchase_cost = 150_000;
    service.create_asset(laptop).unwrap();

    let mut chair = Asset::new(seed.workspace.id, "Chair", "FN-1");
    chair.purchase_cost = 20_000;
    let chair = service.create_asset(chair).unwrap();
    service
        .set_status(seed.workspace.id, chair.id, AssetStatus::Lost)
        .unwrap();

    let by_category = service
        .list_assets(
            seed.workspace.id,
            &AssetListQuery {
                category_id: Some(laptops.id),
                ..AssetListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(by_category.len(), 1);

    let by_serial = service
        .list_assets(
            seed.workspace.id,
            &AssetListQuery {
                search: Some("abc-1".to_string()),
                ..AssetListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(by_serial.len(), 1);
    assert_eq!(by_serial[0].asset_tag, "LT-100");

    let summary = service.inventory_summary(seed.workspace.id).unwrap();
    assert_eq!(summary.total_assets, 2);
    assert_eq!(summary.total_purchase_cost, 170_000);
    let lost = summary
        .by_status
        .iter()
        .find(|row| row.status == AssetStatus::Lost)
        .unwrap();
    assert_eq!(lost.count, 1);
}

mod common;

use bizdesk_core::config::VaultConfig;
use bizdesk_core::db::open_db_in_memory;
use bizdesk_core::model::vault::VaultAction;
use bizdesk_core::repo::vault_repo::{EntryListQuery, SqliteVaultRepository};
use bizdesk_core::service::vault_service::{EntryInput, VaultServiceError};
use bizdesk_core::vault::KdfParams;
use bizdesk_core::{AccessContext, VaultService};
use rusqlite::Connection;
use std::net::{IpAddr, Ipv4Addr};

const MASTER: &str = "correct horse battery";

fn config(app_secret: &str) -> VaultConfig {
    VaultConfig {
        kdf: KdfParams::new(1024, 1, 1),
        app_secret: app_secret.to_string(),
        auto_lock_minutes: 15,
    }
}

fn service<'c>(conn: &'c Connection, config: &VaultConfig) -> VaultService<SqliteVaultRepository<'c>> {
    VaultService::new(SqliteVaultRepository::try_new(conn).unwrap(), config)
}

fn entry(title: &str, password: &str) -> EntryInput {
    EntryInput {
        title: title.to_string(),
        username: Some("grace".to_string()),
        url: Some(format!("https://{}.example.com", title.to_lowercase())),
        password: password.to_string(),
        ..EntryInput::default()
    }
}

#[test]
fn protected_vault_round_trips_secrets() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn, &config("app-secret"));
    let ctx = AccessContext::new(seed.user.id);

    let vault = service
        .create_vault(ws, seed.user.id, " Ops ", None, Some(MASTER))
        .unwrap();
    assert_eq!(vault.name, "Ops");
    assert!(vault.has_master_password());

    let handle = service.unlock(ws, vault.id, &ctx, Some(MASTER)).unwrap();
    let mut input = entry("Github", "Xq9!vT2#pL7@mR4$wZ");
    input.notes = Some("recovery codes in safe".to_string());
    let stored = service.add_entry(&handle, input).unwrap();
    assert_ne!(stored.secret.ciphertext, "Xq9!vT2#pL7@mR4$wZ");

    let revealed = service.reveal_entry(&handle, &ctx, stored.id).unwrap();
    assert_eq!(revealed.password, "Xq9!vT2#pL7@mR4$wZ");
    assert_eq!(revealed.notes.as_deref(), Some("recovery codes in safe"));
    assert_eq!(revealed.username.as_deref(), Some("grace"));
}

#[test]
fn wrong_or_missing_master_password_fails() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn, &config("app-secret"));
    let ctx = AccessContext::new(seed.user.id);
    let vault = service
        .create_vault(ws, seed.user.id, "Ops", None, Some(MASTER))
        .unwrap();

    let err = service
        .unlock(ws, vault.id, &ctx, Some("not the password"))
        .unwrap_err();
    assert!(matches!(err, VaultServiceError::InvalidMasterPassword));
    let err = service.unlock(ws, vault.id, &ctx, None).unwrap_err();
    assert!(matches!(err, VaultServiceError::MasterPasswordRequired));

    let err = service
        .create_vault(ws, seed.user.id, "Short", None, Some("abc"))
        .unwrap_err();
    assert!(matches!(err, VaultServiceError::Validation(_)));
}

#[test]
fn entries_survive_master_password_change() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn, &config("app-secret"));
    let ctx = AccessContext::new(seed.user.id);
    let vault = service
        .create_vault(ws, seed.user.id, "Ops", None, Some(MASTER))
        .unwrap();

    let handle = service.unlock(ws, vault.id, &ctx, Some(MASTER)).unwrap();
    let mut with_notes = entry("Mail", "hunter2hunter2");
    with_notes.notes = Some("2fa on phone".to_string());
    let mail = service.add_entry(&handle, with_notes).unwrap();
    let bank = service
        .add_entry(&handle, entry("Bank", "Xq9!vT2#pL7@mR4$wZ"))
        .unwrap();
    service.lock(handle, &ctx).unwrap();

    let err = service
        .change_master_password(ws, vault.id, &ctx, Some("wrong password"), "brand new secret")
        .unwrap_err();
    assert!(matches!(err, VaultServiceError::InvalidMasterPassword));

    let updated = service
        .change_master_password(ws, vault.id, &ctx, Some(MASTER), "brand new secret")
        .unwrap();
    assert_ne!(updated.key_salt, vault.key_salt);

    let err = service
        .unlock(ws, vault.id, &ctx, Some(MASTER))
        .unwrap_err();
    assert!(matches!(err, VaultServiceError::InvalidMasterPassword));

    let handle = service
        .unlock(ws, vault.id, &ctx, Some("brand new secret"))
        .unwrap();
    let mail = service.reveal_entry(&handle, &ctx, mail.id).unwrap();
    assert_eq!(mail.password, "hunter2hunter2");
    assert_eq!(mail.notes.as_deref(), Some("2fa on phone"));
    let bank = service.reveal_entry(&handle, &ctx, bank.id).unwrap();
    assert_eq!(bank.password, "Xq9!vT2#pL7@mR4$wZ");
}

#[test]
fn removing_master_password_moves_to_application_key() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn, &config("app-secret"));
    let ctx = AccessContext::new(seed.user.id);
    let vault = service
        .create_vault(ws, seed.user.id, "Ops", None, Some(MASTER))
        .unwrap();
    let handle = service.unlock(ws, vault.id, &ctx, Some(MASTER)).unwrap();
    let stored = service
        .add_entry(&handle, entry("Wiki", "plain-old-secret"))
        .unwrap();
    service.lock(handle, &ctx).unwrap();

    let opened = service
        .remove_master_password(ws, vault.id, &ctx, MASTER)
        .unwrap();
    assert!(!opened.has_master_password());
    let err = service
        .remove_master_password(ws, vault.id, &ctx, MASTER)
        .unwrap_err();
    assert!(matches!(err, VaultServiceError::NoMasterPassword));

    let handle = service.unlock(ws, vault.id, &ctx, None).unwrap();
    let revealed = service.reveal_entry(&handle, &ctx, stored.id).unwrap();
    assert_eq!(revealed.password, "plain-old-secret");
}

#[test]
fn unprotected_vault_needs_application_secret() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;

    let err = service(&conn, &config(""))
        .create_vault(ws, seed.user.id, "Shared", None, None)
        .unwrap_err();
    assert!(matches!(err, VaultServiceError::MissingAppSecret));

    let service = service(&conn, &config("app-secret"));
    let vault = service
        .create_vault(ws, seed.user.id, "Shared", Some("team logins".to_string()), None)
        .unwrap();
    assert!(!vault.has_master_password());
    let ctx = AccessContext::new(seed.user.id);
    assert!(service.unlock(ws, vault.id, &ctx, None).is_ok());
}

#[test]
fn access_log_records_actions_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn, &config("app-secret"));
    let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
    let ctx = AccessContext::from_headers(
        seed.user.id,
        [("X-Forwarded-For", "203.0.113.7, 10.0.0.1")],
        None,
    );
    assert_eq!(ctx.ip_address, Some(ip));

    let vault = service
        .create_vault(ws, seed.user.id, "Ops", None, Some(MASTER))
        .unwrap();
    let handle = service.unlock(ws, vault.id, &ctx, Some(MASTER)).unwrap();
    let stored = service
        .add_entry(&handle, entry("Github", "Xq9!vT2#pL7@mR4$wZ"))
        .unwrap();
    service.reveal_entry(&handle, &ctx, stored.id).unwrap();
    let _ = service.unlock(ws, vault.id, &ctx, Some("guessing-wrong"));
    service.lock(handle, &ctx).unwrap();

    let log = service.access_log(ws, vault.id, 10).unwrap();
    let actions: Vec<_> = log.iter().map(|row| row.action).collect();
    assert_eq!(
        actions,
        vec![
            VaultAction::Lock,
            VaultAction::UnlockFailed,
            VaultAction::Reveal,
            VaultAction::Unlock,
        ]
    );
    assert!(log
        .iter()
        .all(|row| row.ip_address.as_deref() == Some("203.0.113.7")));
    assert_eq!(service.access_log(ws, vault.id, 2).unwrap().len(), 2);
}

#[test]
fn entry_listing_filters_and_favorites() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn, &config("app-secret"));
    let ctx = AccessContext::new(seed.user.id);
    let vault = service
        .create_vault(ws, seed.user.id, "Ops", None, Some(MASTER))
        .unwrap();
    let handle = service.unlock(ws, vault.id, &ctx, Some(MASTER)).unwrap();

    let work = service
        .create_category(&handle, " Work ", Some("#336699".to_string()))
        .unwrap();
    assert_eq!(work.name, "Work");
    let mut input = entry("Jira", "Xq9!vT2#pL7@mR4$wZ");
    input.category_id = Some(work.id);
    let jira = service.add_entry(&handle, input).unwrap();
    let weak = service.add_entry(&handle, entry("Forum", "abc")).unwrap();
    assert!(weak.strength < jira.strength);

    let favorite = service.toggle_favorite(&handle, jira.id).unwrap();
    assert!(favorite.is_favorite);

    let favorites = service
        .list_entries(
            &handle,
            &EntryListQuery {
                favorites_only: true,
                ..EntryListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(favorites.len(), 1);
    let in_work = service
        .list_entries(
            &handle,
            &EntryListQuery {
                category_id: Some(work.id),
                ..EntryListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(in_work.len(), 1);
    let found = service
        .list_entries(
            &handle,
            &EntryListQuery {
                search: Some("forum".to_string()),
                ..EntryListQuery::default()
            },
        )
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, weak.id);

    service.soft_delete_entry(&handle, weak.id).unwrap();
    let err = service.reveal_entry(&handle, &ctx, weak.id).unwrap_err();
    assert!(matches!(err, VaultServiceError::EntryNotFound(_)));
    assert_eq!(
        service
            .list_entries(&handle, &EntryListQuery::default())
            .unwrap()
            .len(),
        1
    );
    assert_eq!(service.list_categories(&handle).unwrap().len(), 1);
}

#[test]
fn generated_passwords_respect_bounds() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn, &config("app-secret"));

    let generated = service.generate_password(24, true).unwrap();
    assert_eq!(generated.password.chars().count(), 24);
    let plain = service.generate_password(16, false).unwrap();
    assert!(plain.password.chars().all(|c| c.is_ascii_alphanumeric()));

    assert!(matches!(
        service.generate_password(4, true),
        Err(VaultServiceError::Validation(_))
    ));
    assert!(matches!(
        service.generate_password(500, true),
        Err(VaultServiceError::Validation(_))
    ));
}

#[test]
fn handle_from_before_master_password_change_is_locked() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn, &config("app-secret"));
    let ctx = AccessContext::new(seed.user.id);
    let vault = service
        .create_vault(ws, seed.user.id, "Ops", None, Some(MASTER))
        .unwrap();

    let stale = service.unlock(ws, vault.id, &ctx, Some(MASTER)).unwrap();
    let before = service
        .add_entry(&stale, entry("Mail", "hunter2hunter2"))
        .unwrap();
    service
        .change_master_password(ws, vault.id, &ctx, Some(MASTER), "brand new secret")
        .unwrap();

    let err = service
        .add_entry(&stale, entry("Late", "written-with-old-key"))
        .unwrap_err();
    assert!(matches!(err, VaultServiceError::Locked(id) if id == vault.id));
    let err = service
        .update_entry(&stale, before.id, entry("Mail", "rotated-secret"))
        .unwrap_err();
    assert!(matches!(err, VaultServiceError::Locked(_)));
    assert!(matches!(
        service.reveal_entry(&stale, &ctx, before.id),
        Err(VaultServiceError::Locked(_))
    ));

    let fresh = service
        .unlock(ws, vault.id, &ctx, Some("brand new secret"))
        .unwrap();
    let entries = service
        .list_entries(&fresh, &EntryListQuery::default())
        .unwrap();
    assert_eq!(entries.len(), 1);
    for stored in &entries {
        assert_eq!(
            service.reveal_entry(&fresh, &ctx, stored.id).unwrap().password,
            "hunter2hunter2"
        );
    }

    service
        .add_entry(&fresh, entry("Bank", "Xq9!vT2#pL7@mR4$wZ"))
        .unwrap();
    service
        .change_master_password(ws, vault.id, &ctx, Some("brand new secret"), "third password")
        .unwrap();
    let latest = service
        .unlock(ws, vault.id, &ctx, Some("third password"))
        .unwrap();
    assert_eq!(
        service
            .reveal_entry(&latest, &ctx, before.id)
            .unwrap()
            .password,
        "hunter2hunter2"
    );
}

#[test]
fn handle_from_before_master_password_removal_is_locked() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn, &config("app-secret"));
    let ctx = AccessContext::new(seed.user.id);
    let vault = service
        .create_vault(ws, seed.user.id, "Ops", None, Some(MASTER))
        .unwrap();
    let stale = service.unlock(ws, vault.id, &ctx, Some(MASTER)).unwrap();

    service
        .remove_master_password(ws, vault.id, &ctx, MASTER)
        .unwrap();
    assert!(matches!(
        service.add_entry(&stale, entry("Late", "written-with-old-key")),
        Err(VaultServiceError::Locked(_))
    ));

    let fresh = service.unlock(ws, vault.id, &ctx, None).unwrap();
    assert!(service
        .list_entries(&fresh, &EntryListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn only_the_owner_can_unlock_or_rekey() {
    let conn = open_db_in_memory().unwrap();
    let seed = common::seed(&conn);
    let ws = seed.workspace.id;
    let service = service(&conn, &config("app-secret"));
    let owner = AccessContext::new(seed.user.id);
    let other = AccessContext::new(common::register(&conn, "Alan Turing", "alan@example.com").id);
    let shared = service
        .create_vault(ws, seed.user.id, "Shared", None, None)
        .unwrap();

    let err = service.unlock(ws, shared.id, &other, None).unwrap_err();
    assert!(matches!(
        err,
        VaultServiceError::NotOwner { vault_id, user_id }
            if vault_id == shared.id && user_id == other.user_id
    ));
    let err = service
        .change_master_password(ws, shared.id, &other, None, "taken over now")
        .unwrap_err();
    assert!(matches!(err, VaultServiceError::NotOwner { .. }));
    assert!(!service.get_vault(ws, shared.id).unwrap().has_master_password());

    assert!(service.unlock(ws, shared.id, &owner, None).is_ok());
    let log = service.access_log(ws, shared.id, 10).unwrap();
    assert_eq!(log[1].action, VaultAction::UnlockFailed);
    assert_eq!(log[1].user_id, other.user_id);
}

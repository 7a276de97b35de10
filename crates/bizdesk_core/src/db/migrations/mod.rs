//! Versioned schema migrations.
//!
//! Each step is a SQL file embedded at compile time. The applied version
//! lives in `PRAGMA user_version`; all pending steps run inside a single
//! transaction so a failed upgrade leaves the previous schema untouched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// `(version, name, sql)`; versions are contiguous from 1.
const STEPS: &[(u32, &str, &str)] = &[
    (1, "init", include_str!("0001_init.sql")),
    (2, "inventory", include_str!("0002_inventory.sql")),
    (3, "hr", include_str!("0003_hr.sql")),
    (4, "gamification", include_str!("0004_gamification.sql")),
    (5, "vault", include_str!("0005_vault.sql")),
];

/// Highest schema version this build can write.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(version, _, _)| *version)
}

pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

/// Brings the schema up to [`latest_version`].
///
/// Refuses databases written by a newer build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = current_user_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<_> = STEPS
        .iter()
        .filter(|(version, _, _)| *version > from)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, name, sql) in pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        info!("event=db_migrate module=db status=ok version={version} name={name}");
    }
    tx.commit()?;
    info!("event=db_upgrade module=db status=ok from={from} to={latest}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::STEPS;

    #[test]
    fn versions_are_contiguous() {
        for (index, (version, _, _)) in STEPS.iter().enumerate() {
            assert_eq!(*version as usize, index + 1);
        }
    }
}

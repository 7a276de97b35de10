//! Password vault persistence.
//!
//! # Invariants
//! - Only sealed secrets reach this layer; plaintext is never stored.
//! - Rekeying rewrites the master hash, salt and every entry in one transaction.
//! - Access log rows are append-only.

use crate::model::vault::{
    PasswordCategory, PasswordCategoryId, PasswordEntry, PasswordEntryId, PasswordStrength,
    PasswordVault, SealedText, VaultAccessLog, VaultAction, VaultId,
};
use crate::model::{UserId, WorkspaceId};
use crate::repo::common::{
    bool_to_int, ensure_connection_ready, like_pattern, parse_bool, parse_optional_uuid,
    parse_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

const VAULT_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    owner_user_id,
    name,
    description,
    master_password_hash,
    key_salt,
    is_deleted
FROM password_vaults";

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    vault_id,
    category_id,
    title,
    username,
    url,
    secret_ciphertext,
    secret_nonce,
    notes_ciphertext,
    notes_nonce,
    strength,
    is_favorite,
    last_used_at,
    is_deleted
FROM password_entries";

#[derive(Debug, Clone, Default)]
pub struct EntryListQuery {
    pub category_id: Option<PasswordCategoryId>,
    pub favorites_only: bool,
    /// Matches title, username and url.
    pub search: Option<String>,
}

/// New key material for a vault plus its re-sealed entries.
#[derive(Debug, Clone)]
pub struct Rekey {
    /// Salt the entries were sealed under; the swap fails if it moved.
    pub previous_salt: String,
    pub master_password_hash: Option<String>,
    pub key_salt: String,
    pub entries: Vec<PasswordEntry>,
}

pub trait VaultRepository {
    fn create_vault(&self, vault: &PasswordVault) -> RepoResult<VaultId>;
    fn get_vault(&self, workspace_id: WorkspaceId, id: VaultId)
        -> RepoResult<Option<PasswordVault>>;
    fn list_vaults(
        &self,
        workspace_id: WorkspaceId,
        owner_user_id: Option<UserId>,
    ) -> RepoResult<Vec<PasswordVault>>;
    fn soft_delete_vault(&self, workspace_id: WorkspaceId, id: VaultId) -> RepoResult<()>;
    /// Atomically swaps key material and every live entry's ciphertext.
    fn rekey(&self, workspace_id: WorkspaceId, id: VaultId, rekey: &Rekey) -> RepoResult<()>;

    fn create_category(&self, category: &PasswordCategory) -> RepoResult<PasswordCategoryId>;
    fn update_category(&self, category: &PasswordCategory) -> RepoResult<()>;
    fn list_categories(&self, vault_id: VaultId) -> RepoResult<Vec<PasswordCategory>>;
    /// Deletes a category; entries keep existing without one.
    fn delete_category(&self, vault_id: VaultId, id: PasswordCategoryId) -> RepoResult<()>;

    fn create_entry(&self, entry: &PasswordEntry) -> RepoResult<PasswordEntryId>;
    fn update_entry(&self, entry: &PasswordEntry) -> RepoResult<()>;
    fn get_entry(
        &self,
        vault_id: VaultId,
        id: PasswordEntryId,
    ) -> RepoResult<Option<PasswordEntry>>;
    fn list_entries(
        &self,
        vault_id: VaultId,
        query: &EntryListQuery,
    ) -> RepoResult<Vec<PasswordEntry>>;
    fn touch_entry(&self, vault_id: VaultId, id: PasswordEntryId, used_at: i64) -> RepoResult<()>;
    fn set_favorite(
        &self,
        vault_id: VaultId,
        id: PasswordEntryId,
        is_favorite: bool,
    ) -> RepoResult<()>;
    fn soft_delete_entry(&self, vault_id: VaultId, id: PasswordEntryId) -> RepoResult<()>;

    fn append_access_log(&self, log: &VaultAccessLog) -> RepoResult<()>;
    /// Newest first.
    fn list_access_log(&self, vault_id: VaultId, limit: u32) -> RepoResult<Vec<VaultAccessLog>>;
}

pub struct SqliteVaultRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVaultRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                "password_vaults",
                "password_categories",
                "password_entries",
                "vault_access_logs",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl VaultRepository for SqliteVaultRepository<'_> {
    fn create_vault(&self, vault: &PasswordVault) -> RepoResult<VaultId> {
        vault.validate()?;
        self.conn.execute(
            "INSERT INTO password_vaults (
                id,
                workspace_id,
                owner_user_id,
                name,
                description,
                master_password_hash,
                key_salt,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                vault.id.to_string(),
                vault.workspace_id.to_string(),
                vault.owner_user_id.to_string(),
                vault.name.as_str(),
                vault.description.as_deref(),
                vault.master_password_hash.as_deref(),
                vault.key_salt.as_str(),
                bool_to_int(vault.is_deleted),
            ],
        )?;
        Ok(vault.id)
    }

    fn get_vault(
        &self,
        workspace_id: WorkspaceId,
        id: VaultId,
    ) -> RepoResult<Option<PasswordVault>> {
        self.conn
            .query_row(
                &format!(
                    "{VAULT_SELECT_SQL} WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;"
                ),
                [id.to_string(), workspace_id.to_string()],
                |row| Ok(parse_vault_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_vaults(
        &self,
        workspace_id: WorkspaceId,
        owner_user_id: Option<UserId>,
    ) -> RepoResult<Vec<PasswordVault>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VAULT_SELECT_SQL}
             WHERE workspace_id = ?1
               AND is_deleted = 0
               AND (?2 IS NULL OR owner_user_id = ?2)
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![
            workspace_id.to_string(),
            owner_user_id.map(|id| id.to_string())
        ])?;
        let mut vaults = Vec::new();
        while let Some(row) = rows.next()? {
            vaults.push(parse_vault_row(row)?);
        }
        Ok(vaults)
    }

    fn soft_delete_vault(&self, workspace_id: WorkspaceId, id: VaultId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE password_vaults
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0;",
            [id.to_string(), workspace_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("vault", id));
        }
        tx.execute(
            "UPDATE password_entries
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE vault_id = ?1 AND is_deleted = 0;",
            [id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn rekey(&self, workspace_id: WorkspaceId, id: VaultId, rekey: &Rekey) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE password_vaults
             SET
                master_password_hash = ?1,
                key_salt = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3 AND workspace_id = ?4 AND is_deleted = 0 AND key_salt = ?5;",
            params![
                rekey.master_password_hash.as_deref(),
                rekey.key_salt.as_str(),
                id.to_string(),
                workspace_id.to_string(),
                rekey.previous_salt.as_str(),
            ],
        )?;
        if changed == 0 {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM password_vaults
                    WHERE id = ?1 AND workspace_id = ?2 AND is_deleted = 0
                );",
                params![id.to_string(), workspace_id.to_string()],
                |row| row.get(0),
            )?;
            if exists {
                return Err(RepoError::Conflict(format!(
                    "vault {id} was re-keyed concurrently"
                )));
            }
            return Err(RepoError::not_found("vault", id));
        }
        let live: i64 = tx.query_row(
            "SELECT COUNT(*) FROM password_entries WHERE vault_id = ?1 AND is_deleted = 0;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if usize::try_from(live).ok() != Some(rekey.entries.len()) {
            return Err(RepoError::Conflict(format!(
                "vault {id} gained or lost entries during re-key"
            )));
        }
        for entry in &rekey.entries {
            if entry.vault_id != id {
                return Err(RepoError::Conflict(format!(
                    "entry {} does not belong to vault {id}",
                    entry.id
                )));
            }
            write_entry(&tx, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn create_category(&self, category: &PasswordCategory) -> RepoResult<PasswordCategoryId> {
        category.validate()?;
        self.conn.execute(
            "INSERT INTO password_categories (id, vault_id, name, color)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                category.id.to_string(),
                category.vault_id.to_string(),
                category.name.as_str(),
                category.color.as_deref(),
            ],
        )?;
        Ok(category.id)
    }

    fn update_category(&self, category: &PasswordCategory) -> RepoResult<()> {
        category.validate()?;
        let changed = self.conn.execute(
            "UPDATE password_categories
             SET name = ?1, color = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?3 AND vault_id = ?4;",
            params![
                category.name.as_str(),
                category.color.as_deref(),
                category.id.to_string(),
                category.vault_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("password category", category.id));
        }
        Ok(())
    }

    fn list_categories(&self, vault_id: VaultId) -> RepoResult<Vec<PasswordCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, vault_id, name, color
             FROM password_categories
             WHERE vault_id = ?1
             ORDER BY name COLLATE NOCASE ASC, id ASC;",
        )?;
        let mut rows = stmt.query([vault_id.to_string()])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let vault_id: String = row.get(1)?;
            categories.push(PasswordCategory {
                id: parse_uuid(&id, "password_categories.id")?,
                vault_id: parse_uuid(&vault_id, "password_categories.vault_id")?,
                name: row.get(2)?,
                color: row.get(3)?,
            });
        }
        Ok(categories)
    }

    fn delete_category(&self, vault_id: VaultId, id: PasswordCategoryId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE password_entries
             SET category_id = NULL, updated_at = (strftime('%s', 'now') * 1000)
             WHERE vault_id = ?1 AND category_id = ?2;",
            [vault_id.to_string(), id.to_string()],
        )?;
        let changed = tx.execute(
            "DELETE FROM password_categories WHERE id = ?1 AND vault_id = ?2;",
            [id.to_string(), vault_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("password category", id));
        }
        tx.commit()?;
        Ok(())
    }

    fn create_entry(&self, entry: &PasswordEntry) -> RepoResult<PasswordEntryId> {
        entry.validate()?;
        self.ensure_category_in_vault(entry)?;
        let notes = entry.notes.as_ref();
        self.conn.execute(
            "INSERT INTO password_entries (
                id,
                vault_id,
                category_id,
                title,
                username,
                url,
                secret_ciphertext,
                secret_nonce,
                notes_ciphertext,
                notes_nonce,
                strength,
                is_favorite,
                last_used_at,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
            params![
                entry.id.to_string(),
                entry.vault_id.to_string(),
                entry.category_id.map(|id| id.to_string()),
                entry.title.as_str(),
                entry.username.as_deref(),
                entry.url.as_deref(),
                entry.secret.ciphertext.as_str(),
                entry.secret.nonce.as_str(),
                notes.map(|sealed| sealed.ciphertext.as_str()),
                notes.map(|sealed| sealed.nonce.as_str()),
                entry.strength.as_str(),
                bool_to_int(entry.is_favorite),
                entry.last_used_at,
                bool_to_int(entry.is_deleted),
            ],
        )?;
        Ok(entry.id)
    }

    fn update_entry(&self, entry: &PasswordEntry) -> RepoResult<()> {
        self.ensure_category_in_vault(entry)?;
        write_entry(self.conn, entry)
    }

    fn get_entry(
        &self,
        vault_id: VaultId,
        id: PasswordEntryId,
    ) -> RepoResult<Option<PasswordEntry>> {
        self.conn
            .query_row(
                &format!("{ENTRY_SELECT_SQL} WHERE id = ?1 AND vault_id = ?2 AND is_deleted = 0;"),
                [id.to_string(), vault_id.to_string()],
                |row| Ok(parse_entry_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_entries(
        &self,
        vault_id: VaultId,
        query: &EntryListQuery,
    ) -> RepoResult<Vec<PasswordEntry>> {
        let mut sql = format!("{ENTRY_SELECT_SQL} WHERE vault_id = ? AND is_deleted = 0");
        let mut bind_values: Vec<Value> = vec![Value::Text(vault_id.to_string())];
        if let Some(category_id) = query.category_id {
            sql.push_str(" AND category_id = ?");
            bind_values.push(Value::Text(category_id.to_string()));
        }
        if query.favorites_only {
            sql.push_str(" AND is_favorite = 1");
        }
        if let Some(search) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = like_pattern(search);
            sql.push_str(
                " AND (title LIKE ? ESCAPE '\\' OR username LIKE ? ESCAPE '\\' OR url LIKE ? ESCAPE '\\')",
            );
            for _ in 0..3 {
                bind_values.push(Value::Text(pattern.clone()));
            }
        }
        sql.push_str(" ORDER BY is_favorite DESC, title COLLATE NOCASE ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn touch_entry(&self, vault_id: VaultId, id: PasswordEntryId, used_at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE password_entries
             SET last_used_at = ?1
             WHERE id = ?2 AND vault_id = ?3 AND is_deleted = 0;",
            params![used_at, id.to_string(), vault_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("password entry", id));
        }
        Ok(())
    }

    fn set_favorite(
        &self,
        vault_id: VaultId,
        id: PasswordEntryId,
        is_favorite: bool,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE password_entries
             SET is_favorite = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2 AND vault_id = ?3 AND is_deleted = 0;",
            params![bool_to_int(is_favorite), id.to_string(), vault_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("password entry", id));
        }
        Ok(())
    }

    fn soft_delete_entry(&self, vault_id: VaultId, id: PasswordEntryId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE password_entries
             SET is_deleted = 1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1 AND vault_id = ?2 AND is_deleted = 0;",
            [id.to_string(), vault_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("password entry", id));
        }
        Ok(())
    }

    fn append_access_log(&self, log: &VaultAccessLog) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO vault_access_logs (vault_id, user_id, action, ip_address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                log.vault_id.to_string(),
                log.user_id.to_string(),
                log.action.as_str(),
                log.ip_address.as_deref(),
                log.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_access_log(&self, vault_id: VaultId, limit: u32) -> RepoResult<Vec<VaultAccessLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT vault_id, user_id, action, ip_address, created_at
             FROM vault_access_logs
             WHERE vault_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![vault_id.to_string(), limit])?;
        let mut logs = Vec::new();
        while let Some(row) = rows.next()? {
            let vault_id: String = row.get(0)?;
            let user_id: String = row.get(1)?;
            let action: String = row.get(2)?;
            logs.push(VaultAccessLog {
                vault_id: parse_uuid(&vault_id, "vault_access_logs.vault_id")?,
                user_id: parse_uuid(&user_id, "vault_access_logs.user_id")?,
                action: VaultAction::parse(&action).ok_or_else(|| {
                    RepoError::InvalidData(format!("invalid vault_access_logs.action `{action}`"))
                })?,
                ip_address: row.get(3)?,
                created_at: row.get(4)?,
            });
        }
        Ok(logs)
    }
}

impl SqliteVaultRepository<'_> {
    fn ensure_category_in_vault(&self, entry: &PasswordEntry) -> RepoResult<()> {
        let Some(category_id) = entry.category_id else {
            return Ok(());
        };
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM password_categories WHERE id = ?1 AND vault_id = ?2;",
                [category_id.to_string(), entry.vault_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if found.is_none() {
            return Err(RepoError::not_found("password category", category_id));
        }
        Ok(())
    }
}

fn write_entry(conn: &Connection, entry: &PasswordEntry) -> RepoResult<()> {
    entry.validate()?;
    let notes = entry.notes.as_ref();
    let changed = conn.execute(
        "UPDATE password_entries
         SET
            category_id = ?1,
            title = ?2,
            username = ?3,
            url = ?4,
            secret_ciphertext = ?5,
            secret_nonce = ?6,
            notes_ciphertext = ?7,
            notes_nonce = ?8,
            strength = ?9,
            is_favorite = ?10,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?11 AND vault_id = ?12 AND is_deleted = 0;",
        params![
            entry.category_id.map(|id| id.to_string()),
            entry.title.as_str(),
            entry.username.as_deref(),
            entry.url.as_deref(),
            entry.secret.ciphertext.as_str(),
            entry.secret.nonce.as_str(),
            notes.map(|sealed| sealed.ciphertext.as_str()),
            notes.map(|sealed| sealed.nonce.as_str()),
            entry.strength.as_str(),
            bool_to_int(entry.is_favorite),
            entry.id.to_string(),
            entry.vault_id.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::not_found("password entry", entry.id));
    }
    Ok(())
}

fn parse_vault_row(row: &Row<'_>) -> RepoResult<PasswordVault> {
    let id: String = row.get(0)?;
    let workspace_id: String = row.get(1)?;
    let owner_user_id: String = row.get(2)?;
    let is_deleted: i64 = row.get(7)?;
    Ok(PasswordVault {
        id: parse_uuid(&id, "password_vaults.id")?,
        workspace_id: parse_uuid(&workspace_id, "password_vaults.workspace_id")?,
        owner_user_id: parse_uuid(&owner_user_id, "password_vaults.owner_user_id")?,
        name: row.get(3)?,
        description: row.get(4)?,
        master_password_hash: row.get(5)?,
        key_salt: row.get(6)?,
        is_deleted: parse_bool(is_deleted, "password_vaults.is_deleted")?,
    })
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<PasswordEntry> {
    let id: String = row.get(0)?;
    let vault_id: String = row.get(1)?;
    let notes_ciphertext: Option<String> = row.get(8)?;
    let notes_nonce: Option<String> = row.get(9)?;
    let strength: String = row.get(10)?;
    let is_favorite: i64 = row.get(11)?;
    let is_deleted: i64 = row.get(13)?;
    let notes = match (notes_ciphertext, notes_nonce) {
        (Some(ciphertext), Some(nonce)) => Some(SealedText { ciphertext, nonce }),
        (None, None) => None,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "password entry {id} has half of a sealed note"
            )))
        }
    };
    Ok(PasswordEntry {
        id: parse_uuid(&id, "password_entries.id")?,
        vault_id: parse_uuid(&vault_id, "password_entries.vault_id")?,
        category_id: parse_optional_uuid(row.get(2)?, "password_entries.category_id")?,
        title: row.get(3)?,
        username: row.get(4)?,
        url: row.get(5)?,
        secret: SealedText {
            ciphertext: row.get(6)?,
            nonce: row.get(7)?,
        },
        notes,
        strength: PasswordStrength::parse(&strength).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid password_entries.strength `{strength}`"))
        })?,
        is_favorite: parse_bool(is_favorite, "password_entries.is_favorite")?,
        last_used_at: row.get(12)?,
        is_deleted: parse_bool(is_deleted, "password_entries.is_deleted")?,
    })
}

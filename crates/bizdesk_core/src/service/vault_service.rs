//! Password vault use-cases.
//!
//! # Responsibility
//! - Protect vault entries with a key derived from the master password, or
//!   from the application secret for vaults without one.
//! - Hand out [`UnlockedVault`] handles that carry the key while unlocked.
//! - Record unlock, reveal and master-password changes in the access log.
//!
//! # Invariants
//! - Plaintext and key material are never persisted or logged.
//! - A master-password change re-seals every entry in the same transaction
//!   that swaps the hash and salt.
//! - A handle idle for longer than the auto-lock window is rejected.
//! - A handle is bound to the key salt it was unlocked under; after a
//!   master-password change or removal it is rejected as locked.
//! - Only the vault owner can unlock it or change its master password.

use crate::config::VaultConfig;
use crate::model::vault::{
    PasswordCategory, PasswordCategoryId, PasswordEntry, PasswordEntryId, PasswordStrength,
    PasswordVault, RevealedEntry, VaultAccessLog, VaultAction, VaultId,
};
use crate::model::{normalize_optional, require_text, UserId, ValidationError, WorkspaceId};
use crate::repo::vault_repo::{EntryListQuery, Rekey, VaultRepository};
use crate::repo::RepoError;
use crate::util::{client_ip, now_epoch_ms, random_password};
use crate::vault::{
    derive_vault_key, generate_salt, hash_master_password, open_text, score_password, seal_text,
    verify_master_password, CryptoError, KdfParams, VaultKey,
};
use log::{info, warn};
use serde::Serialize;
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use uuid::Uuid;
use zeroize::Zeroizing;

pub const MIN_MASTER_PASSWORD_LEN: usize = 8;
pub const MIN_GENERATED_LEN: usize = 8;
pub const MAX_GENERATED_LEN: usize = 128;

#[derive(Debug)]
pub enum VaultServiceError {
    Validation(ValidationError),
    VaultNotFound(String),
    EntryNotFound(String),
    CategoryNotFound(String),
    /// Master password did not verify.
    InvalidMasterPassword,
    /// Protected vault opened without a password.
    MasterPasswordRequired,
    /// Removing a master password from an unprotected vault.
    NoMasterPassword,
    /// Unprotected vaults need a configured application secret.
    MissingAppSecret,
    /// Handle expired, or the vault was re-keyed after it was unlocked.
    Locked(VaultId),
    /// Acting user does not own the vault.
    NotOwner { vault_id: VaultId, user_id: UserId },
    Crypto(CryptoError),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for VaultServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::VaultNotFound(id) => write!(f, "vault not found: {id}"),
            Self::EntryNotFound(id) => write!(f, "password entry not found: {id}"),
            Self::CategoryNotFound(id) => write!(f, "password category not found: {id}"),
            Self::InvalidMasterPassword => write!(f, "invalid master password"),
            Self::MasterPasswordRequired => write!(f, "vault requires a master password"),
            Self::NoMasterPassword => write!(f, "vault has no master password"),
            Self::MissingAppSecret => write!(
                f,
                "vault.app_secret must be configured for vaults without a master password"
            ),
            Self::Locked(id) => write!(f, "vault {id} is locked"),
            Self::NotOwner { vault_id, user_id } => {
                write!(f, "user {user_id} does not own vault {vault_id}")
            }
            Self::Crypto(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent vault state: {details}"),
        }
    }
}

impl Error for VaultServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Crypto(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for VaultServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity: "vault", id } => Self::VaultNotFound(id),
            RepoError::NotFound {
                entity: "password entry",
                id,
            } => Self::EntryNotFound(id),
            RepoError::NotFound {
                entity: "password category",
                id,
            } => Self::CategoryNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<CryptoError> for VaultServiceError {
    fn from(value: CryptoError) -> Self {
        Self::Crypto(value)
    }
}

impl From<ValidationError> for VaultServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Who is acting on a vault, for the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessContext {
    pub user_id: UserId,
    pub ip_address: Option<IpAddr>,
}

impl AccessContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ip_address: None,
        }
    }

    /// Resolves the client address from proxy headers and the socket peer.
    pub fn from_headers<'a, I>(user_id: UserId, headers: I, remote_addr: Option<IpAddr>) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            user_id,
            ip_address: client_ip(headers, remote_addr),
        }
    }
}

/// Key holder for an unlocked vault.
///
/// Dropping the handle (or passing it to [`VaultService::lock`]) wipes the
/// key.
#[derive(Debug)]
pub struct UnlockedVault {
    vault_id: VaultId,
    workspace_id: WorkspaceId,
    user_id: UserId,
    key: VaultKey,
    key_salt: String,
    idle_limit_ms: i64,
    last_activity_ms: Cell<i64>,
}

impl UnlockedVault {
    pub fn vault_id(&self) -> VaultId {
        self.vault_id
    }

    pub fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Whether the handle has been idle past the auto-lock window at `now_ms`.
    /// An auto-lock window of zero never expires.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.idle_limit_ms > 0 && now_ms - self.last_activity_ms.get() >= self.idle_limit_ms
    }
}

/// Plaintext fields of a new or edited entry.
#[derive(Debug, Clone, Default)]
pub struct EntryInput {
    pub category_id: Option<PasswordCategoryId>,
    pub title: String,
    pub username: Option<String>,
    pub url: Option<String>,
    pub password: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedPassword {
    pub password: String,
    pub strength: PasswordStrength,
}

pub struct VaultService<R: VaultRepository> {
    repo: R,
    kdf: KdfParams,
    app_secret: Zeroizing<String>,
    auto_lock_minutes: u32,
}

impl<R: VaultRepository> VaultService<R> {
    pub fn new(repo: R, config: &VaultConfig) -> Self {
        Self {
            repo,
            kdf: config.kdf,
            app_secret: Zeroizing::new(config.app_secret.clone()),
            auto_lock_minutes: config.auto_lock_minutes,
        }
    }

    /// Creates a vault, protected by `master_password` when given.
    pub fn create_vault(
        &self,
        workspace_id: WorkspaceId,
        owner_user_id: UserId,
        name: &str,
        description: Option<String>,
        master_password: Option<&str>,
    ) -> Result<PasswordVault, VaultServiceError> {
        let master_password_hash = match master_password {
            Some(password) => {
                check_master_password(password)?;
                Some(hash_master_password(password, &self.kdf)?)
            }
            None => {
                if self.app_secret.is_empty() {
                    return Err(VaultServiceError::MissingAppSecret);
                }
                None
            }
        };
        let vault = PasswordVault {
            id: Uuid::new_v4(),
            workspace_id,
            owner_user_id,
            name: name.trim().to_string(),
            description: normalize_optional(description),
            master_password_hash,
            key_salt: generate_salt(),
            is_deleted: false,
        };
        let id = self.repo.create_vault(&vault)?;
        info!(
            "event=vault_create module=service status=ok workspace_id={workspace_id} vault_id={id} protected={}",
            vault.has_master_password()
        );
        self.get_vault(workspace_id, id)
    }

    pub fn get_vault(
        &self,
        workspace_id: WorkspaceId,
        id: VaultId,
    ) -> Result<PasswordVault, VaultServiceError> {
        self.repo
            .get_vault(workspace_id, id)?
            .ok_or_else(|| VaultServiceError::VaultNotFound(id.to_string()))
    }

    pub fn list_vaults(
        &self,
        workspace_id: WorkspaceId,
        owner_user_id: Option<UserId>,
    ) -> Result<Vec<PasswordVault>, VaultServiceError> {
        Ok(self.repo.list_vaults(workspace_id, owner_user_id)?)
    }

    /// Deletes a vault together with its entries.
    pub fn delete_vault(
        &self,
        workspace_id: WorkspaceId,
        id: VaultId,
    ) -> Result<(), VaultServiceError> {
        self.repo.soft_delete_vault(workspace_id, id)?;
        info!("event=vault_delete module=service status=ok workspace_id={workspace_id} vault_id={id}");
        Ok(())
    }

    /// Verifies access and returns a key holder for entry operations.
    pub fn unlock(
        &self,
        workspace_id: WorkspaceId,
        vault_id: VaultId,
        ctx: &AccessContext,
        master_password: Option<&str>,
    ) -> Result<UnlockedVault, VaultServiceError> {
        let vault = self.get_vault(workspace_id, vault_id)?;
        if let Err(err) = check_owner(&vault, ctx) {
            self.log_access(vault_id, ctx, VaultAction::UnlockFailed)?;
            warn!(
                "event=vault_unlock module=service status=error reason=not_owner vault_id={vault_id} user_id={}",
                ctx.user_id
            );
            return Err(err);
        }
        let key = match self.open_key(&vault, master_password) {
            Ok(key) => key,
            Err(err @ VaultServiceError::InvalidMasterPassword) => {
                self.log_access(vault_id, ctx, VaultAction::UnlockFailed)?;
                warn!(
                    "event=vault_unlock module=service status=error reason=invalid_password vault_id={vault_id} user_id={}",
                    ctx.user_id
                );
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        self.log_access(vault_id, ctx, VaultAction::Unlock)?;
        info!(
            "event=vault_unlock module=service status=ok vault_id={vault_id} user_id={}",
            ctx.user_id
        );
        Ok(UnlockedVault {
            vault_id,
            workspace_id,
            user_id: ctx.user_id,
            key,
            key_salt: vault.key_salt,
            idle_limit_ms: i64::from(self.auto_lock_minutes) * 60_000,
            last_activity_ms: Cell::new(now_epoch_ms()),
        })
    }

    /// Consumes the handle, wiping its key.
    pub fn lock(
        &self,
        handle: UnlockedVault,
        ctx: &AccessContext,
    ) -> Result<(), VaultServiceError> {
        let vault_id = handle.vault_id;
        drop(handle);
        self.log_access(vault_id, ctx, VaultAction::Lock)?;
        info!("event=vault_lock module=service status=ok vault_id={vault_id}");
        Ok(())
    }

    /// Sets a new master password and re-seals every entry under the new key.
    ///
    /// `current` is required when the vault is already protected.
    pub fn change_master_password(
        &self,
        workspace_id: WorkspaceId,
        vault_id: VaultId,
        ctx: &AccessContext,
        current: Option<&str>,
        new_password: &str,
    ) -> Result<PasswordVault, VaultServiceError> {
        check_master_password(new_password)?;
        let vault = self.get_vault(workspace_id, vault_id)?;
        check_owner(&vault, ctx)?;
        let old_key = self.open_key(&vault, current)?;
        let key_salt = generate_salt();
        let new_key = derive_vault_key(new_password.as_bytes(), &key_salt, &self.kdf)?;
        let hash = hash_master_password(new_password, &self.kdf)?;
        self.reseal(&vault, &old_key, &new_key, Some(hash), key_salt)?;
        self.log_access(vault_id, ctx, VaultAction::MasterPasswordChanged)?;
        info!("event=vault_master_password module=service status=ok action=change vault_id={vault_id}");
        self.get_vault(workspace_id, vault_id)
    }

    /// Drops master-password protection; entries move to the application key.
    pub fn remove_master_password(
        &self,
        workspace_id: WorkspaceId,
        vault_id: VaultId,
        ctx: &AccessContext,
        current: &str,
    ) -> Result<PasswordVault, VaultServiceError> {
        let vault = self.get_vault(workspace_id, vault_id)?;
        check_owner(&vault, ctx)?;
        if !vault.has_master_password() {
            return Err(VaultServiceError::NoMasterPassword);
        }
        let old_key = self.open_key(&vault, Some(current))?;
        let key_salt = generate_salt();
        let new_key = self.app_key(&key_salt)?;
        self.reseal(&vault, &old_key, &new_key, None, key_salt)?;
        self.log_access(vault_id, ctx, VaultAction::MasterPasswordRemoved)?;
        info!("event=vault_master_password module=service status=ok action=remove vault_id={vault_id}");
        self.get_vault(workspace_id, vault_id)
    }

    pub fn create_category(
        &self,
        handle: &UnlockedVault,
        name: &str,
        color: Option<String>,
    ) -> Result<PasswordCategory, VaultServiceError> {
        self.ensure_active(handle)?;
        let category = PasswordCategory {
            id: Uuid::new_v4(),
            vault_id: handle.vault_id,
            name: name.trim().to_string(),
            color: normalize_optional(color),
        };
        self.repo.create_category(&category)?;
        Ok(category)
    }

    pub fn update_category(
        &self,
        handle: &UnlockedVault,
        category: &PasswordCategory,
    ) -> Result<PasswordCategory, VaultServiceError> {
        self.ensure_active(handle)?;
        let mut next = category.clone();
        next.vault_id = handle.vault_id;
        self.repo.update_category(&next)?;
        Ok(next)
    }

    pub fn list_categories(
        &self,
        handle: &UnlockedVault,
    ) -> Result<Vec<PasswordCategory>, VaultServiceError> {
        self.ensure_active(handle)?;
        Ok(self.repo.list_categories(handle.vault_id)?)
    }

    pub fn delete_category(
        &self,
        handle: &UnlockedVault,
        id: PasswordCategoryId,
    ) -> Result<(), VaultServiceError> {
        self.ensure_active(handle)?;
        Ok(self.repo.delete_category(handle.vault_id, id)?)
    }

    pub fn add_entry(
        &self,
        handle: &UnlockedVault,
        input: EntryInput,
    ) -> Result<PasswordEntry, VaultServiceError> {
        self.ensure_active(handle)?;
        let entry = self.seal_entry(handle, Uuid::new_v4(), input, false, None)?;
        let id = self.repo.create_entry(&entry)?;
        info!(
            "event=vault_entry_create module=service status=ok vault_id={} entry_id={id} strength={}",
            handle.vault_id,
            entry.strength.as_str()
        );
        self.entry(handle.vault_id, id)
    }

    /// Replaces metadata and secret of an entry, keeping favorite state.
    pub fn update_entry(
        &self,
        handle: &UnlockedVault,
        id: PasswordEntryId,
        input: EntryInput,
    ) -> Result<PasswordEntry, VaultServiceError> {
        self.ensure_active(handle)?;
        let stored = self.entry(handle.vault_id, id)?;
        let entry = self.seal_entry(handle, id, input, stored.is_favorite, stored.last_used_at)?;
        self.repo.update_entry(&entry)?;
        self.entry(handle.vault_id, id)
    }

    /// Decrypts one entry and records the reveal.
    pub fn reveal_entry(
        &self,
        handle: &UnlockedVault,
        ctx: &AccessContext,
        id: PasswordEntryId,
    ) -> Result<RevealedEntry, VaultServiceError> {
        self.ensure_active(handle)?;
        let entry = self.entry(handle.vault_id, id)?;
        let aad = handle.vault_id.as_bytes();
        let password = open_text(&handle.key, aad, &entry.secret)?;
        let notes = entry
            .notes
            .as_ref()
            .map(|sealed| open_text(&handle.key, aad, sealed))
            .transpose()?;
        self.repo.touch_entry(handle.vault_id, id, now_epoch_ms())?;
        self.log_access(handle.vault_id, ctx, VaultAction::Reveal)?;
        info!(
            "event=vault_entry_reveal module=service status=ok vault_id={} entry_id={id} user_id={}",
            handle.vault_id, ctx.user_id
        );
        Ok(RevealedEntry {
            id,
            title: entry.title,
            username: entry.username,
            url: entry.url,
            password,
            notes,
        })
    }

    /// Entry metadata; secrets stay sealed.
    pub fn list_entries(
        &self,
        handle: &UnlockedVault,
        query: &EntryListQuery,
    ) -> Result<Vec<PasswordEntry>, VaultServiceError> {
        self.ensure_active(handle)?;
        Ok(self.repo.list_entries(handle.vault_id, query)?)
    }

    pub fn toggle_favorite(
        &self,
        handle: &UnlockedVault,
        id: PasswordEntryId,
    ) -> Result<PasswordEntry, VaultServiceError> {
        self.ensure_active(handle)?;
        let entry = self.entry(handle.vault_id, id)?;
        self.repo
            .set_favorite(handle.vault_id, id, !entry.is_favorite)?;
        self.entry(handle.vault_id, id)
    }

    pub fn soft_delete_entry(
        &self,
        handle: &UnlockedVault,
        id: PasswordEntryId,
    ) -> Result<(), VaultServiceError> {
        self.ensure_active(handle)?;
        self.repo.soft_delete_entry(handle.vault_id, id)?;
        info!(
            "event=vault_entry_delete module=service status=ok vault_id={} entry_id={id}",
            handle.vault_id
        );
        Ok(())
    }

    /// Random password of `len` characters together with its strength.
    pub fn generate_password(
        &self,
        len: usize,
        symbols: bool,
    ) -> Result<GeneratedPassword, VaultServiceError> {
        if !(MIN_GENERATED_LEN..=MAX_GENERATED_LEN).contains(&len) {
            return Err(ValidationError::new(
                "length",
                format!("must be within {MIN_GENERATED_LEN}..={MAX_GENERATED_LEN}"),
            )
            .into());
        }
        let password = random_password(len, symbols);
        let strength = score_password(&password);
        Ok(GeneratedPassword { password, strength })
    }

    /// Most recent access log rows, newest first.
    pub fn access_log(
        &self,
        workspace_id: WorkspaceId,
        vault_id: VaultId,
        limit: u32,
    ) -> Result<Vec<VaultAccessLog>, VaultServiceError> {
        self.get_vault(workspace_id, vault_id)?;
        Ok(self.repo.list_access_log(vault_id, limit)?)
    }

    fn open_key(
        &self,
        vault: &PasswordVault,
        master_password: Option<&str>,
    ) -> Result<VaultKey, VaultServiceError> {
        match vault.master_password_hash.as_deref() {
            Some(hash) => {
                let password = master_password.ok_or(VaultServiceError::MasterPasswordRequired)?;
                if !verify_master_password(password, hash)? {
                    return Err(VaultServiceError::InvalidMasterPassword);
                }
                Ok(derive_vault_key(
                    password.as_bytes(),
                    &vault.key_salt,
                    &self.kdf,
                )?)
            }
            None => self.app_key(&vault.key_salt),
        }
    }

    fn app_key(&self, key_salt: &str) -> Result<VaultKey, VaultServiceError> {
        if self.app_secret.is_empty() {
            return Err(VaultServiceError::MissingAppSecret);
        }
        Ok(derive_vault_key(
            self.app_secret.as_bytes(),
            key_salt,
            &self.kdf,
        )?)
    }

    fn reseal(
        &self,
        vault: &PasswordVault,
        old_key: &VaultKey,
        new_key: &VaultKey,
        master_password_hash: Option<String>,
        key_salt: String,
    ) -> Result<(), VaultServiceError> {
        let aad = vault.id.as_bytes();
        let stored = self
            .repo
            .list_entries(vault.id, &EntryListQuery::default())?;
        let mut entries = Vec::with_capacity(stored.len());
        for mut entry in stored {
            let secret = Zeroizing::new(open_text(old_key, aad, &entry.secret)?);
            entry.secret = seal_text(new_key, aad, &secret)?;
            entry.notes = match entry.notes.as_ref() {
                Some(sealed) => {
                    let notes = Zeroizing::new(open_text(old_key, aad, sealed)?);
                    Some(seal_text(new_key, aad, &notes)?)
                }
                None => None,
            };
            entries.push(entry);
        }
        let rekey = Rekey {
            previous_salt: vault.key_salt.clone(),
            master_password_hash,
            key_salt,
            entries,
        };
        self.repo
            .rekey(vault.workspace_id, vault.id, &rekey)
            .map_err(|err| match err {
                // Another writer re-keyed between our read and the swap.
                RepoError::Conflict(_) => VaultServiceError::Locked(vault.id),
                other => other.into(),
            })?;
        Ok(())
    }

    fn seal_entry(
        &self,
        handle: &UnlockedVault,
        id: PasswordEntryId,
        input: EntryInput,
        is_favorite: bool,
        last_used_at: Option<i64>,
    ) -> Result<PasswordEntry, VaultServiceError> {
        require_text("password", &input.password)?;
        let aad = handle.vault_id.as_bytes();
        let secret = seal_text(&handle.key, aad, &input.password)?;
        let notes = normalize_optional(input.notes)
            .map(|notes| seal_text(&handle.key, aad, &notes))
            .transpose()?;
        let entry = PasswordEntry {
            id,
            vault_id: handle.vault_id,
            category_id: input.category_id,
            title: input.title.trim().to_string(),
            username: normalize_optional(input.username),
            url: normalize_optional(input.url),
            secret,
            notes,
            strength: score_password(&input.password),
            is_favorite,
            last_used_at,
            is_deleted: false,
        };
        entry.validate()?;
        Ok(entry)
    }

    fn entry(
        &self,
        vault_id: VaultId,
        id: PasswordEntryId,
    ) -> Result<PasswordEntry, VaultServiceError> {
        self.repo
            .get_entry(vault_id, id)?
            .ok_or_else(|| VaultServiceError::EntryNotFound(id.to_string()))
    }

    fn ensure_active(&self, handle: &UnlockedVault) -> Result<(), VaultServiceError> {
        let now = now_epoch_ms();
        if handle.is_expired_at(now) {
            return Err(VaultServiceError::Locked(handle.vault_id));
        }
        let vault = self
            .repo
            .get_vault(handle.workspace_id, handle.vault_id)?
            .ok_or_else(|| VaultServiceError::VaultNotFound(handle.vault_id.to_string()))?;
        if vault.key_salt != handle.key_salt {
            return Err(VaultServiceError::Locked(handle.vault_id));
        }
        handle.last_activity_ms.set(now);
        Ok(())
    }

    fn log_access(
        &self,
        vault_id: VaultId,
        ctx: &AccessContext,
        action: VaultAction,
    ) -> Result<(), VaultServiceError> {
        self.repo.append_access_log(&VaultAccessLog {
            vault_id,
            user_id: ctx.user_id,
            action,
            ip_address: ctx.ip_address.map(|ip| ip.to_string()),
            created_at: now_epoch_ms(),
        })?;
        Ok(())
    }
}

fn check_owner(vault: &PasswordVault, ctx: &AccessContext) -> Result<(), VaultServiceError> {
    if vault.owner_user_id != ctx.user_id {
        return Err(VaultServiceError::NotOwner {
            vault_id: vault.id,
            user_id: ctx.user_id,
        });
    }
    Ok(())
}

fn check_master_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_MASTER_PASSWORD_LEN {
        return Err(ValidationError::new(
            "master_password",
            format!("must be at least {MIN_MASTER_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db_in_memory;
    use crate::model::workspace::{User, Workspace};
    use crate::repo::vault_repo::SqliteVaultRepository;
    use crate::repo::workspace_repo::{SqliteWorkspaceRepository, WorkspaceRepository};

    fn config() -> VaultConfig {
        VaultConfig {
            kdf: KdfParams::new(1024, 1, 1),
            app_secret: "unit-test-secret".to_string(),
            auto_lock_minutes: 15,
        }
    }

    #[test]
    fn idle_handle_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let workspaces = SqliteWorkspaceRepository::try_new(&conn).unwrap();
        let user = User::new("Ada", "ada@example.com");
        workspaces.create_user(&user).unwrap();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            key: "AC".to_string(),
            owner_user_id: user.id,
            is_deleted: false,
        };
        workspaces.create_workspace(&workspace).unwrap();

        let service = VaultService::new(SqliteVaultRepository::try_new(&conn).unwrap(), &config());
        let ctx = AccessContext::new(user.id);
        let vault = service
            .create_vault(workspace.id, user.id, "Ops", None, None)
            .unwrap();
        let handle = service.unlock(workspace.id, vault.id, &ctx, None).unwrap();
        assert!(service.list_entries(&handle, &EntryListQuery::default()).is_ok());

        handle
            .last_activity_ms
            .set(now_epoch_ms() - 16 * 60_000);
        let err = service
            .list_entries(&handle, &EntryListQuery::default())
            .unwrap_err();
        assert!(matches!(err, VaultServiceError::Locked(id) if id == vault.id));
    }

    #[test]
    fn zero_auto_lock_never_expires() {
        let handle = UnlockedVault {
            vault_id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            key: derive_vault_key(b"secret", &generate_salt(), &KdfParams::new(1024, 1, 1))
                .unwrap(),
            key_salt: generate_salt(),
            idle_limit_ms: 0,
            last_activity_ms: Cell::new(0),
        };
        assert!(!handle.is_expired_at(i64::MAX));
    }

    #[test]
    fn short_master_password_is_rejected() {
        assert_eq!(
            check_master_password("short").unwrap_err().field,
            "master_password"
        );
        assert!(check_master_password("long enough").is_ok());
    }
}

//! Password vault records.
//!
//! # Invariants
//! - Entry secrets are only persisted as ciphertext + nonce (base64).
//! - A vault with `master_password_hash = None` is protected by the
//!   application secret only.
//! - Plaintext never appears in `Serialize` output of stored records.

use crate::model::{require_text, UserId, ValidationError, WorkspaceId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type VaultId = Uuid;
pub type PasswordEntryId = Uuid;
pub type PasswordCategoryId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordVault {
    pub id: VaultId,
    pub workspace_id: WorkspaceId,
    pub owner_user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    /// Argon2 PHC string; `None` when no master password is set.
    #[serde(skip_serializing)]
    pub master_password_hash: Option<String>,
    /// Base64 salt for key derivation.
    #[serde(skip_serializing)]
    pub key_salt: String,
    pub is_deleted: bool,
}

impl PasswordVault {
    pub fn has_master_password(&self) -> bool {
        self.master_password_hash.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("key_salt", &self.key_salt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCategory {
    pub id: PasswordCategoryId,
    pub vault_id: VaultId,
    pub name: String,
    pub color: Option<String>,
}

impl PasswordCategory {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        if let Some(color) = self.color.as_deref() {
            let hex = color.strip_prefix('#').unwrap_or(color);
            if !(hex.len() == 6 || hex.len() == 3) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ValidationError::new("color", "must be a hex color"));
            }
        }
        Ok(())
    }
}

/// Heuristic strength bucket of a stored secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStrength {
    Weak,
    Fair,
    Good,
    Strong,
}

impl PasswordStrength {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Strong => "strong",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "weak" => Some(Self::Weak),
            "fair" => Some(Self::Fair),
            "good" => Some(Self::Good),
            "strong" => Some(Self::Strong),
            _ => None,
        }
    }
}

/// Ciphertext pair as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedText {
    pub ciphertext: String,
    pub nonce: String,
}

/// Stored entry: metadata plus sealed secret fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordEntry {
    pub id: PasswordEntryId,
    pub vault_id: VaultId,
    pub category_id: Option<PasswordCategoryId>,
    pub title: String,
    pub username: Option<String>,
    pub url: Option<String>,
    #[serde(skip)]
    pub secret: SealedText,
    #[serde(skip)]
    pub notes: Option<SealedText>,
    pub strength: PasswordStrength,
    pub is_favorite: bool,
    /// Epoch milliseconds of last reveal.
    pub last_used_at: Option<i64>,
    pub is_deleted: bool,
}

impl PasswordEntry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("secret_ciphertext", &self.secret.ciphertext)?;
        require_text("secret_nonce", &self.secret.nonce)?;
        if let Some(url) = self.url.as_deref() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ValidationError::new("url", "must start with http:// or https://"));
            }
        }
        Ok(())
    }
}

/// Decrypted view returned to an unlocked caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealedEntry {
    pub id: PasswordEntryId,
    pub title: String,
    pub username: Option<String>,
    pub url: Option<String>,
    pub password: String,
    pub notes: Option<String>,
}

/// Audited vault action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultAction {
    Unlock,
    UnlockFailed,
    Lock,
    Reveal,
    MasterPasswordChanged,
    MasterPasswordRemoved,
}

impl VaultAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unlock => "unlock",
            Self::UnlockFailed => "unlock_failed",
            Self::Lock => "lock",
            Self::Reveal => "reveal",
            Self::MasterPasswordChanged => "master_password_changed",
            Self::MasterPasswordRemoved => "master_password_removed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unlock" => Some(Self::Unlock),
            "unlock_failed" => Some(Self::UnlockFailed),
            "lock" => Some(Self::Lock),
            "reveal" => Some(Self::Reveal),
            "master_password_changed" => Some(Self::MasterPasswordChanged),
            "master_password_removed" => Some(Self::MasterPasswordRemoved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultAccessLog {
    pub vault_id: VaultId,
    pub user_id: UserId,
    pub action: VaultAction,
    pub ip_address: Option<String>,
    pub created_at: i64,
}

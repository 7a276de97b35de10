//! Password vault cryptography.
//!
//! # Responsibility
//! - Hash and verify master passwords (Argon2id, PHC strings).
//! - Derive per-vault encryption keys and seal/open entry secrets.
//! - Score password strength for stored entries.
//!
//! # Invariants
//! - Key material lives in `VaultKey`, which zeroizes on drop.
//! - Every sealed value uses a fresh random 12-byte nonce.
//! - Secrets are never logged.

pub mod crypto;
pub mod strength;

pub use crypto::{
    derive_vault_key, generate_salt, hash_master_password, open_text, seal_text,
    verify_master_password, CryptoError, KdfParams, VaultKey,
};
pub use strength::score_password;

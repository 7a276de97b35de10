//! Master password hashing, key derivation and entry sealing.
//!
//! # Algorithms
//!
//! - **Master password hash**: Argon2id PHC string (salt + params embedded).
//! - **Key derivation**: Argon2id raw output, 32 bytes, per-vault salt.
//! - **Encryption**: ChaCha20-Poly1305 with the vault id as associated data,
//!   so ciphertext cannot be moved between vaults.

use crate::model::vault::SealedText;
use crate::util::encoding::{base64_decode, base64_encode};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use zeroize::Zeroize;

/// Salt length for key derivation (16 bytes).
pub const SALT_LEN: usize = 16;
/// Nonce length for ChaCha20-Poly1305 (12 bytes).
pub const NONCE_LEN: usize = 12;
/// Derived key length (32 bytes).
pub const KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Argon2 parameters were rejected.
    InvalidParams(String),
    /// Hashing or derivation failed.
    Kdf(String),
    /// Stored PHC string cannot be parsed.
    InvalidHash(String),
    /// Stored base64 or nonce is malformed.
    Encoding(String),
    Encrypt,
    /// Authentication tag mismatch: wrong key or tampered data.
    Decrypt,
}

impl Display for CryptoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParams(message) => write!(f, "invalid key derivation params: {message}"),
            Self::Kdf(message) => write!(f, "key derivation failed: {message}"),
            Self::InvalidHash(message) => write!(f, "invalid master password hash: {message}"),
            Self::Encoding(message) => write!(f, "invalid sealed data: {message}"),
            Self::Encrypt => write!(f, "encryption failed"),
            Self::Decrypt => write!(f, "decryption failed (wrong key or tampered data)"),
        }
    }
}

impl Error for CryptoError {}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>, CryptoError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|err| CryptoError::InvalidParams(err.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// 256-bit vault key, zeroized when dropped.
pub struct VaultKey([u8; KEY_LEN]);

impl VaultKey {
    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

impl Debug for VaultKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(<redacted>)")
    }
}

impl Drop for VaultKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Random per-vault salt, base64-encoded for storage.
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    base64_encode(salt)
}

/// Hashes a master password into a PHC string.
pub fn hash_master_password(password: &str, params: &KdfParams) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    params
        .argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CryptoError::Kdf(err.to_string()))
}

/// Verifies a master password against its PHC string.
///
/// Cost parameters are read from the stored hash, so older hashes stay
/// verifiable after the configured cost changes.
pub fn verify_master_password(password: &str, phc: &str) -> Result<bool, CryptoError> {
    let parsed = PasswordHash::new(phc).map_err(|err| CryptoError::InvalidHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Derives the vault key from a secret and the stored base64 salt.
pub fn derive_vault_key(
    secret: &[u8],
    salt_b64: &str,
    params: &KdfParams,
) -> Result<VaultKey, CryptoError> {
    let mut salt =
        base64_decode(salt_b64).map_err(|err| CryptoError::Encoding(format!("salt: {err}")))?;
    let mut key = [0u8; KEY_LEN];
    let result = params
        .argon2()?
        .hash_password_into(secret, &salt, &mut key)
        .map_err(|err| CryptoError::Kdf(err.to_string()));
    salt.zeroize();
    result?;
    Ok(VaultKey(key))
}

/// Encrypts `plaintext`, binding it to `associated_data`.
pub fn seal_text(
    key: &VaultKey,
    associated_data: &[u8],
    plaintext: &str,
) -> Result<SealedText, CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    let ciphertext = key
        .cipher()
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext.as_bytes(),
                aad: associated_data,
            },
        )
        .map_err(|_| CryptoError::Encrypt)?;

    Ok(SealedText {
        ciphertext: base64_encode(ciphertext),
        nonce: base64_encode(nonce),
    })
}

/// Decrypts a sealed value produced by [`seal_text`].
pub fn open_text(
    key: &VaultKey,
    associated_data: &[u8],
    sealed: &SealedText,
) -> Result<String, CryptoError> {
    let nonce = base64_decode(&sealed.nonce)
        .map_err(|err| CryptoError::Encoding(format!("nonce: {err}")))?;
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::Encoding(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    let ciphertext = base64_decode(&sealed.ciphertext)
        .map_err(|err| CryptoError::Encoding(format!("ciphertext: {err}")))?;

    let plaintext = key
        .cipher()
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: ciphertext.as_slice(),
                aad: associated_data,
            },
        )
        .map_err(|_| CryptoError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Encoding("plaintext is not UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams::new(1024, 1, 1)
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_master_password("correct-horse", &fast()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_master_password("correct-horse", &hash).unwrap());
        assert!(!verify_master_password("wrong-horse", &hash).unwrap());
    }

    #[test]
    fn invalid_hash_format_is_error() {
        assert!(matches!(
            verify_master_password("pw", "not-a-hash"),
            Err(CryptoError::InvalidHash(_))
        ));
    }

    #[test]
    fn derivation_is_deterministic_per_salt() {
        let salt = generate_salt();
        let a = derive_vault_key(b"secret", &salt, &fast()).unwrap();
        let b = derive_vault_key(b"secret", &salt, &fast()).unwrap();
        let sealed = seal_text(&a, b"vault", "hunter2").unwrap();
        assert_eq!(open_text(&b, b"vault", &sealed).unwrap(), "hunter2");

        let other = derive_vault_key(b"secret", &generate_salt(), &fast()).unwrap();
        assert_eq!(open_text(&other, b"vault", &sealed), Err(CryptoError::Decrypt));
    }

    #[test]
    fn associated_data_binds_ciphertext() {
        let key = derive_vault_key(b"secret", &generate_salt(), &fast()).unwrap();
        let sealed = seal_text(&key, b"vault-a", "token").unwrap();
        assert_eq!(open_text(&key, b"vault-b", &sealed), Err(CryptoError::Decrypt));
    }

    #[test]
    fn nonces_are_fresh() {
        let key = derive_vault_key(b"secret", &generate_salt(), &fast()).unwrap();
        let first = seal_text(&key, b"v", "same").unwrap();
        let second = seal_text(&key, b"v", "same").unwrap();
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn zero_memory_params_are_rejected() {
        let params = KdfParams::new(0, 1, 1);
        assert!(matches!(
            hash_master_password("pw", &params),
            Err(CryptoError::InvalidParams(_))
        ));
    }
}

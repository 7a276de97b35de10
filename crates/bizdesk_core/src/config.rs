//! Application configuration.
//!
//! # Responsibility
//! - Load settings from a TOML file with defaults for every field.
//! - Apply `BIZDESK_*` environment overrides on top of the file.
//!
//! # Invariants
//! - A missing config file yields `AppConfig::default()`.
//! - Unknown environment values are rejected, never silently ignored.

use crate::vault::KdfParams;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "BIZDESK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BIZDESK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BIZDESK_LOG_DIR";
pub const ENV_VAULT_SECRET: &str = "BIZDESK_VAULT_SECRET";
pub const ENV_VAULT_AUTO_LOCK: &str = "BIZDESK_VAULT_AUTO_LOCK_MINUTES";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid config `{}`: {message}", path.display())
            }
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub vault: VaultConfig,
    pub alerts: AlertConfig,
    pub gamification: GamificationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("bizdesk.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; defaults by build mode.
    pub level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub kdf: KdfParams,
    /// Key source for vaults without a master password.
    pub app_secret: String,
    /// Idle minutes before an unlocked vault handle expires.
    pub auto_lock_minutes: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            app_secret: String::new(),
            auto_lock_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub warranty_warning_days: u32,
    pub license_warning_days: u32,
    pub certification_warning_days: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warranty_warning_days: 30,
            license_warning_days: 30,
            certification_warning_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamificationConfig {
    pub default_category: String,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            default_category: crate::model::gamification::OVERALL_CATEGORY.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|err| err.to_string())
    }

    /// Loads `path` when it exists, otherwise returns defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            info!(
                "event=config_load module=config status=ok source=file path={}",
                path.display()
            );
            Self::load(path)
        } else {
            info!("event=config_load module=config status=ok source=defaults");
            Ok(Self::default())
        }
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.logging.dir = Some(PathBuf::from(dir));
        }
        if let Some(secret) = lookup(ENV_VAULT_SECRET) {
            self.vault.app_secret = secret;
        }
        if let Some(minutes) = lookup(ENV_VAULT_AUTO_LOCK) {
            self.vault.auto_lock_minutes =
                minutes
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_VAULT_AUTO_LOCK,
                        value: minutes.clone(),
                    })?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_DB_PATH, ENV_VAULT_AUTO_LOCK};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [alerts]
            warranty_warning_days = 45

            [vault.kdf]
            memory_kib = 2048
            "#,
        )
        .unwrap();
        assert_eq!(config.alerts.warranty_warning_days, 45);
        assert_eq!(config.alerts.license_warning_days, 30);
        assert_eq!(config.vault.kdf.memory_kib, 2048);
        assert_eq!(config.vault.kdf.iterations, 3);
        assert_eq!(config.database.path, PathBuf::from("bizdesk.sqlite3"));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [(ENV_DB_PATH, "/tmp/other.db")].into_iter().collect();
        let config = AppConfig::default()
            .with_overrides(|key| env.get(key).map(|value| value.to_string()))
            .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn invalid_numeric_override_is_rejected() {
        let err = AppConfig::default()
            .with_overrides(|key| (key == ENV_VAULT_AUTO_LOCK).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}

//! bizdesk core: workspace-scoped inventory, HR, gamification and password
//! vault logic on top of SQLite.
//!
//! Callers open a connection with [`db::open_db`], wrap it in the matching
//! `Sqlite*Repository`, and drive the services re-exported below.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod util;
pub mod vault;

pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LogLevel};
pub use model::ValidationError;
pub use repo::{RepoError, RepoResult};
pub use service::asset_service::AssetService;
pub use service::certification_service::CertificationService;
pub use service::gamification_service::GamificationService;
pub use service::license_service::LicenseService;
pub use service::okr_service::OkrService;
pub use service::payroll_service::PayrollService;
pub use service::review_service::ReviewService;
pub use service::training_service::TrainingService;
pub use service::vault_service::{AccessContext, UnlockedVault, VaultService};
pub use service::workspace_service::WorkspaceService;

/// Version of the core library, reported by `bizdesk init`.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

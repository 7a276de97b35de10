//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define one data access contract per aggregate.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes call the model's `validate()` before persistence.
//! - Every query is scoped by workspace (or by a vault that is).
//! - Missing rows on update/delete surface as `RepoError::NotFound`.
//! - Counter-style invariants (seats, capacity, custody) are enforced inside
//!   `IMMEDIATE` transactions.

pub mod asset_repo;
pub mod certification_repo;
pub mod common;
pub mod gamification_repo;
pub mod license_repo;
pub mod okr_repo;
pub mod payroll_repo;
pub mod review_repo;
pub mod training_repo;
pub mod vault_repo;
pub mod workspace_repo;

pub use common::{RepoError, RepoResult};

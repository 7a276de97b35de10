//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Lift repository failures into per-service semantic errors.
//! - Keep the CLI decoupled from storage details.

pub mod asset_service;
pub mod certification_service;
pub mod gamification_service;
pub mod license_service;
pub mod okr_service;
pub mod payroll_service;
pub mod review_service;
pub mod training_service;
pub mod vault_service;
pub mod workspace_service;

//! # Strata Core
//!
//! Shared foundations for the Strata content query engine: the engine-wide
//! error taxonomy, developer-name validation and the engine configuration.

pub mod config;
pub mod exception;
pub mod validators;

pub use config::EngineConfig;
pub use exception::{Error, Result};
pub use validators::{normalize_name, validate_developer_name};

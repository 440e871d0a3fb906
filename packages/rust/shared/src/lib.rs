//! Shared types, error model, identity, and configuration for DealScout.
//!
//! This crate is the foundation depended on by all other DealScout crates.
//! It provides:
//! - [`DealScoutError`]: the unified error type
//! - Domain types ([`CompanyRecord`], [`CompanyUpdate`], [`Field`], [`CompanyId`])
//! - Deterministic company identity ([`resolve_identity`])
//! - Configuration ([`AppConfig`], [`ModuleConfig`], config loading)

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AiConfig, AppConfig, DefaultsConfig, DiscoveryConfig, DiscoveryQuery, EnrichmentConfig,
    ModuleConfig, ModuleToggles, SearchConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, read_api_key, require_api_key,
};
pub use error::{DealScoutError, Result};
pub use identity::{normalize_domain, resolve_identity};
pub use types::{
    CompanyId, CompanyRecord, CompanyUpdate, EnrichmentStatus, Field, FieldKind, FieldValue,
};

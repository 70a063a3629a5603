//! Upstream API providers.
//!
//! This module provides:
//! - `ProviderFormat` - Wire formats a provider can speak
//! - `Provider` / `ProviderDraft` - Validated record and raw input
//! - `ProviderRegistry` - Database-backed provider storage

mod config;
mod registry;
mod types;

pub use config::{Provider, ProviderDraft};
pub use registry::ProviderRegistry;
pub use types::ProviderFormat;

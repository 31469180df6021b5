//! Configuration loading, validation, and env substitution.
//!
//! Config files: `courier.toml`, `courier.yaml`, or `courier.json`
//! Searched in `./` then `~/.config/courier/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all
//! string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config, parse_config},
    schema::{CourierConfig, DispatchConfig, MetricsConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};

//! Configuration loading and the per-run configuration model.
//!
//! - Schema definitions in [`schema`]
//! - File discovery, merging and validation in [`loader`]
//!
//! # Example
//!
//! ```
//! use stagehand::config::{load_engine_config, Mode};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".stagehand");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "run:\n  mode: production\n  delay_ms: 0\n").unwrap();
//!
//! let config = load_engine_config(temp.path()).unwrap();
//! assert!(config.state_dir.starts_with(temp.path()));
//! # let _ = Mode::Production;
//! ```

pub mod loader;
pub mod schema;

pub use loader::{
    apply_mode_override, deep_merge, load_config_value, load_engine_config, validate, ConfigPaths,
    MODE_ENV_VAR,
};
pub use schema::{EngineConfig, Mode, PersistPolicy, RateLimit, RunConfig, RunOverrides};

//! Configuration file discovery and loading.
//!
//! Merge order (later overrides earlier):
//! 1. Project config (`.stagehand/config.yml`)
//! 2. Local overrides (`.stagehand/config.local.yml`)
//! 3. `STAGEHAND_MODE` environment variable (mode only)

use crate::config::schema::{EngineConfig, Mode};
use crate::error::{Result, StagehandError};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `run.mode`.
pub const MODE_ENV_VAR: &str = "STAGEHAND_MODE";

/// Paths to configuration files in priority order.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project config: .stagehand/config.yml
    pub project: Option<PathBuf>,

    /// Local overrides: .stagehand/config.local.yml
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        let dir = project_root.join(".stagehand");
        Self {
            project: existing(dir.join("config.yml")),
            project_local: existing(dir.join("config.local.yml")),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        self.project.iter().chain(self.project_local.iter()).collect()
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Deep merge two YAML values.
///
/// Mappings merge recursively, anything else in `overlay` replaces `base`,
/// and a null in `overlay` deletes the key.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();

            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    result.remove(key);
                } else if let Some(base_value) = base_map.get(key) {
                    result.insert(key.clone(), deep_merge(base_value, overlay_value));
                } else {
                    result.insert(key.clone(), overlay_value.clone());
                }
            }

            Value::Mapping(result)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Load a config file as raw YAML Value (for merging).
pub fn load_config_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;

    // An empty file parses as null, which would wipe the base on merge.
    if content.trim().is_empty() {
        return Ok(Value::Mapping(Default::default()));
    }

    serde_yaml::from_str(&content).map_err(|e| StagehandError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and merge all config files for a project.
///
/// Missing files yield [`EngineConfig::default`]. A relative `state_dir` is
/// resolved against `project_root`.
pub fn load_engine_config(project_root: &Path) -> Result<EngineConfig> {
    let paths = ConfigPaths::discover(project_root);

    let mut merged = Value::Mapping(Default::default());
    for path in paths.all_existing() {
        let value = load_config_value(path)?;
        merged = deep_merge(&merged, &value);
    }

    let mut config: EngineConfig =
        serde_yaml::from_value(merged).map_err(|e| StagehandError::ConfigParseError {
            path: project_root.join(".stagehand").join("config.yml"),
            message: format!("Failed to parse merged config: {}", e),
        })?;

    apply_mode_override(&mut config, std::env::var(MODE_ENV_VAR).ok().as_deref())?;

    if config.state_dir.is_relative() {
        config.state_dir = project_root.join(&config.state_dir);
    }

    validate(&config)?;
    Ok(config)
}

/// Apply a mode override taken from the environment.
pub fn apply_mode_override(config: &mut EngineConfig, value: Option<&str>) -> Result<()> {
    if let Some(raw) = value.filter(|v| !v.trim().is_empty()) {
        config.run.mode = raw
            .parse::<Mode>()
            .map_err(|message| StagehandError::ConfigValidationError { message })?;
    }
    Ok(())
}

/// Validate a loaded configuration.
pub fn validate(config: &EngineConfig) -> Result<()> {
    if config.run.max_items == Some(0) {
        return Err(StagehandError::ConfigValidationError {
            message: "run.max_items must be greater than zero".to_string(),
        });
    }

    if let Some(limit) = &config.run.rate_limit {
        if limit.requests == 0 {
            return Err(StagehandError::ConfigValidationError {
                message: "run.rate_limit.requests must be greater than zero".to_string(),
            });
        }
    }

    Ok(())
}

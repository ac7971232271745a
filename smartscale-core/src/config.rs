//! Configuration for SmartScale.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::loader::{END_MARKER, START_MARKER};
use crate::order::DEFAULT_FEATURE_COUNT;

/// Settings for loading and applying transform blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartScaleConfig {
    /// Bytes read from the end of a model file when looking for the block.
    #[serde(default = "default_tail_window_bytes")]
    pub tail_window_bytes: u64,
    /// Feature count the scoring model expects; used by validation.
    #[serde(default = "default_expected_feature_count")]
    pub expected_feature_count: usize,
    /// Exclusive upper bound for feature indices accepted while parsing.
    #[serde(default = "default_max_feature_size")]
    pub max_feature_size: usize,
    /// Scratch buffers kept around between apply calls by a pool built from
    /// this config (`ScratchPool::from`). The process-wide pool behind
    /// `FeatureTransformSet::apply` keeps the default.
    #[serde(default = "default_scratch_pool_capacity")]
    pub scratch_pool_capacity: usize,
}

impl Default for SmartScaleConfig {
    fn default() -> Self {
        Self {
            tail_window_bytes: default_tail_window_bytes(),
            expected_feature_count: default_expected_feature_count(),
            max_feature_size: default_max_feature_size(),
            scratch_pool_capacity: default_scratch_pool_capacity(),
        }
    }
}

pub(crate) fn default_tail_window_bytes() -> u64 {
    16 * 1024
}

fn default_expected_feature_count() -> usize {
    DEFAULT_FEATURE_COUNT
}

pub(crate) fn default_max_feature_size() -> usize {
    DEFAULT_FEATURE_COUNT
}

pub(crate) fn default_scratch_pool_capacity() -> usize {
    64
}

impl SmartScaleConfig {
    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<(), TransformError> {
        let min_window = (START_MARKER.len() + END_MARKER.len()) as u64;
        if self.tail_window_bytes < min_window {
            return Err(TransformError::config(format!(
                "tail_window_bytes must be at least {min_window}, got {}",
                self.tail_window_bytes
            )));
        }
        if self.max_feature_size == 0 {
            return Err(TransformError::config("max_feature_size must be non-zero"));
        }
        if self.expected_feature_count == 0 {
            return Err(TransformError::config(
                "expected_feature_count must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Path of the user-level config file, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "smartscale", "smartscale")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `SMARTSCALE_`)
/// 3. An explicit config file, or the workspace-local `.smartscale/config.toml`
/// 4. User config (`~/.config/smartscale/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&SmartScaleConfig>,
) -> Result<SmartScaleConfig, TransformError> {
    let mut figment = Figment::from(Serialized::defaults(SmartScaleConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(file) = config_file {
        figment = figment.merge(Toml::file(file));
    } else if let Some(ws) = workspace {
        let ws_config = ws.join(".smartscale").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // SMARTSCALE_TAIL_WINDOW_BYTES, SMARTSCALE_EXPECTED_FEATURE_COUNT, ...
    figment = figment.merge(Env::prefixed("SMARTSCALE_"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: SmartScaleConfig = figment
        .extract()
        .map_err(|e| TransformError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

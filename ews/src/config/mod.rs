use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::info;

use crate::registry::UnresolvedPolicy;
use crate::types::error::{EwsError, Result};

/// Global configuration instance
static CONFIG: OnceCell<RwLock<DecoderConfig>> = OnceCell::new();

/// Decoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// What to do with an unknown type inside a heterogeneous collection
    pub collection_policy: UnresolvedPolicy,

    /// What to do with an unknown type where exactly one object is expected
    pub single_object_policy: UnresolvedPolicy,

    /// Maximum element nesting accepted from either encoding
    pub max_depth: usize,

    /// Replace the service message of some error codes with a friendlier one
    pub remap_error_messages: bool,

    /// Error codes every operation treats as an empty result
    pub tolerated_error_codes: Vec<String>,
}

fn default_max_depth() -> usize {
    256
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            collection_policy: UnresolvedPolicy::Skip,
            single_object_policy: UnresolvedPolicy::Fail,
            max_depth: default_max_depth(),
            remap_error_messages: true,
            tolerated_error_codes: Vec::new(),
        }
    }
}

impl DecoderConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DecoderConfig = toml::from_str(content)?;
        if config.max_depth == 0 {
            return Err(EwsError::Config("max_depth must be at least 1".to_string()));
        }
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EwsError::Config(format!("Failed to read config: {}", e)))?;
        Self::from_toml_str(&content)
    }
}

/// Get default config paths
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // XDG config path
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("ews-lib").join("decoder.toml"));
    }

    // Home directory fallback
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(
            home_dir
                .join(".config")
                .join("ews-lib")
                .join("decoder.toml"),
        );
    }

    paths
}

/// Initialize configuration from default paths
pub fn init_config() -> Result<()> {
    info!("Initializing decoder configuration from default paths");

    for path in default_config_paths() {
        if path.exists() {
            info!("Found decoder config at: {:?}", path);
            return init_config_from_path(&path);
        }
    }

    info!("No decoder config found, using defaults");
    set_config(DecoderConfig::default())
}

/// Initialize configuration from a specific path
pub fn init_config_from_path(path: &Path) -> Result<()> {
    info!("Loading decoder configuration from: {:?}", path);
    set_config(DecoderConfig::from_path(path)?)
}

/// Set the global configuration
pub fn set_config(config: DecoderConfig) -> Result<()> {
    match CONFIG.get() {
        Some(lock) => {
            let mut guard = lock
                .write()
                .map_err(|e| EwsError::Config(format!("Failed to lock config: {}", e)))?;
            *guard = config;
        }
        None => {
            if let Err(lock) = CONFIG.set(RwLock::new(config)) {
                // lost an initialization race, overwrite the winner
                return set_config(lock.into_inner().unwrap_or_default());
            }
        }
    }
    Ok(())
}

/// Snapshot of the global configuration, defaults when never initialized
pub fn get_config() -> DecoderConfig {
    CONFIG
        .get()
        .and_then(|lock| lock.read().ok().map(|guard| guard.clone()))
        .unwrap_or_default()
}

/// Check if configuration is initialized
pub fn is_initialized() -> bool {
    CONFIG.get().is_some()
}

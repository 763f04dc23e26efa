use std::{collections::HashMap, env, fs, path::{Path, PathBuf}};
use crate::errors::ConfigError;

use super::settings::{PartialSettings, Settings};

// Configuration location constants
pub const CONFIG_PATH_ENV: &str = "LIGHT_INJECTION_CONFIG";
pub const LOCAL_CONFIG_FILE: &str = "light-injection.toml";
pub const USER_CONFIG_DIR: &str = "light-injection";
pub const CONFIG_FILE_NAME: &str = "config.toml";

// Environment overrides
pub const FAILURE_POLICY_ENV: &str = "LIGHT_INJECTION_FAILURE_POLICY";
pub const MODULE_CONTAINER_ENV: &str = "LIGHT_INJECTION_MODULE_CONTAINER";

/// Configuration loader responsible for loading settings from files and environment
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default paths
    pub fn new() -> Self {
        Self { base_path: None }
    }

    /// Create a config loader that only looks inside `base_path` (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self { base_path: Some(base_path) }
    }

    /// Load settings; a missing config file means defaults
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        let partial = match self.locate_config_file() {
            Some(path) => Some(self.load_partial_settings(&path)?),
            None => None,
        };

        Settings::from_partial_and_env(partial, self.collect_env_vars())
    }

    /// Find the config file to use.
    ///
    /// Order: `LIGHT_INJECTION_CONFIG`, `./light-injection.toml`,
    /// `<config dir>/light-injection/config.toml`.
    pub fn locate_config_file(&self) -> Option<PathBuf> {
        if let Some(base) = &self.base_path {
            let local = base.join(LOCAL_CONFIG_FILE);
            return local.exists().then_some(local);
        }

        // An explicit path is returned even if missing so the read error surfaces
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join(USER_CONFIG_DIR).join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn load_partial_settings(&self, path: &Path) -> Result<PartialSettings, ConfigError> {
        let shown = path.to_string_lossy().to_string();
        tracing::debug!("Loading light-injection settings from {}", shown);

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(shown.clone(), e))?;

        toml::from_str(&content).map_err(|e| ConfigError::TomlParse(shown, e))
    }

    /// Collect relevant environment variables
    fn collect_env_vars(&self) -> HashMap<String, String> {
        let env_keys = [FAILURE_POLICY_ENV, MODULE_CONTAINER_ENV];

        let mut env_map = HashMap::new();
        for key in &env_keys {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_string(), value);
            }
        }
        env_map
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

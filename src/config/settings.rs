use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

use super::loader::{ConfigLoader, FAILURE_POLICY_ENV, MODULE_CONTAINER_ENV};
use crate::errors::{invalid_value, ConfigError};
use crate::failure::FailurePolicy;

/// Container a module gets when it is initialized without an explicit choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleContainerPolicy {
    /// Share the global container
    #[default]
    Global,
    /// Build a private container per module
    Exclusive,
}

impl FromStr for ModuleContainerPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(ModuleContainerPolicy::Global),
            "exclusive" => Ok(ModuleContainerPolicy::Exclusive),
            _ => Err(invalid_value("modules.default_container", s)),
        }
    }
}

/// Library settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub failure: FailureSettings,
    pub modules: ModuleSettings,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureSettings {
    /// Policy of the default failure handlers
    #[serde(default)]
    pub policy: FailurePolicy,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSettings {
    #[serde(default)]
    pub default_container: ModuleContainerPolicy,
}

/// Partial settings as read from a TOML file
#[derive(Deserialize, Debug, Default)]
pub struct PartialSettings {
    failure: Option<PartialFailureSettings>,
    modules: Option<PartialModuleSettings>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialFailureSettings {
    pub policy: Option<FailurePolicy>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialModuleSettings {
    pub default_container: Option<ModuleContainerPolicy>,
}

impl Settings {
    /// Load settings from the first config file found and the environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_settings()
    }

    /// Merge file values with environment overrides; the environment wins
    pub fn from_partial_and_env(
        partial: Option<PartialSettings>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();
        let failure = partial.failure.unwrap_or_default();
        let modules = partial.modules.unwrap_or_default();

        let policy = match env_map.get(FAILURE_POLICY_ENV) {
            Some(value) => value.parse()?,
            None => failure.policy.unwrap_or_default(),
        };

        let default_container = match env_map.get(MODULE_CONTAINER_ENV) {
            Some(value) => value.parse()?,
            None => modules.default_container.unwrap_or_default(),
        };

        Ok(Settings {
            failure: FailureSettings { policy },
            modules: ModuleSettings { default_container },
        })
    }
}

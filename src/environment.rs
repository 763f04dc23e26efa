//! Process-wide defaults
//!
//! The environment decides which container the configurator and new handles
//! talk to, which failure handlers they use and what a module gets when it is
//! initialized without an explicit container. It is built from [`Settings`]
//! on first use and can be swapped with [`replace`].

use crate::config::{ModuleContainerPolicy, Settings};
use crate::container::{DependencyContainer, Resolver};
use crate::failure::{handler_for, FailureHandler};
use parking_lot::RwLock;
use std::sync::Arc;

/// Builds the private container of a module initialized as exclusive
pub type ContainerBuilder = Arc<dyn Fn() -> Arc<dyn Resolver> + Send + Sync>;

#[derive(Clone)]
pub struct Environment {
    /// Container behind the configurator functions and `Dependency::new`
    pub global_container: Arc<dyn Resolver>,
    /// Handler for the configurator functions
    pub library_failure_handler: FailureHandler,
    /// Default handler of module scopes
    pub module_failure_handler: FailureHandler,
    /// Default handler of dependency handles
    pub dependency_failure_handler: FailureHandler,
    pub module_container: ModuleContainerPolicy,
    pub exclusive_container_builder: ContainerBuilder,
}

impl Environment {
    /// Environment built from the settings found on disk and in env vars.
    /// Broken settings are logged and replaced by defaults.
    pub fn live() -> Self {
        match Settings::load() {
            Ok(settings) => Self::from_settings(&settings),
            Err(e) => {
                tracing::warn!("Ignoring light-injection settings: {}", e);
                Self::from_settings(&Settings::default())
            }
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let handler = handler_for(settings.failure.policy);
        Self {
            global_container: DependencyContainer::global(),
            library_failure_handler: handler.clone(),
            module_failure_handler: handler.clone(),
            dependency_failure_handler: handler,
            module_container: settings.modules.default_container,
            exclusive_container_builder: Arc::new(|| {
                Arc::new(DependencyContainer::new()) as Arc<dyn Resolver>
            }),
        }
    }

    pub fn build_exclusive_container(&self) -> Arc<dyn Resolver> {
        (self.exclusive_container_builder)()
    }
}

lazy_static::lazy_static! {
    static ref ENVIRONMENT: RwLock<Environment> = RwLock::new(Environment::live());
}

/// Snapshot of the current environment
pub fn current() -> Environment {
    ENVIRONMENT.read().clone()
}

/// Installs `environment` and returns the previous one
pub fn replace(environment: Environment) -> Environment {
    std::mem::replace(&mut *ENVIRONMENT.write(), environment)
}

//! Registration entry point for application wiring
//!
//! The free functions work against the environment's global container and
//! report failures to its library failure handler.

use crate::container::{Resolver, ResolverExt};
use crate::environment;
use crate::errors::ResolutionError;
use crate::failure::{report_registration, FailureHandler};
use std::panic::Location;
use std::sync::Arc;

/// Registers into one container and hands failures to one handler
#[derive(Clone)]
pub struct Configurator {
    resolver: Arc<dyn Resolver>,
    failure_handler: FailureHandler,
}

impl Configurator {
    pub fn new(resolver: Arc<dyn Resolver>, failure_handler: FailureHandler) -> Self {
        Self {
            resolver,
            failure_handler,
        }
    }

    /// Configurator over the current global container and library handler
    pub fn from_environment() -> Self {
        let env = environment::current();
        Self::new(env.global_container, env.library_failure_handler)
    }

    pub fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.resolver
    }

    #[track_caller]
    pub fn register<T>(&self, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let location = Location::caller();
        report_registration(&self.failure_handler, self.resolver.register(instance), location);
    }

    #[track_caller]
    pub fn register_lazy<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let location = Location::caller();
        report_registration(
            &self.failure_handler,
            self.resolver.register_lazy(factory),
            location,
        );
    }
}

/// Registers an eager instance in the global container
#[track_caller]
pub fn register<T>(instance: Arc<T>)
where
    T: ?Sized + Send + Sync + 'static,
{
    Configurator::from_environment().register(instance)
}

/// Registers a lazy factory in the global container
#[track_caller]
pub fn register_lazy<T, F>(factory: F)
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn() -> Arc<T> + Send + Sync + 'static,
{
    Configurator::from_environment().register_lazy(factory)
}

/// Resolves from the global container without going through a handle
pub fn resolve<T>() -> Result<Arc<T>, ResolutionError>
where
    T: ?Sized + Send + Sync + 'static,
{
    environment::current().global_container.resolve::<T>()
}

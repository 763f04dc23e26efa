//! Module scopes
//!
//! A module scope ties a named part of an application to one container and
//! one failure handler. Scopes are usually declared as statics through
//! [`declare_module!`](crate::declare_module):
//!
//! ```ignore
//! light_injection::declare_module!(pub Billing);
//!
//! Billing::initialize(Some(ContainerChoice::Exclusive), None);
//! Billing::register(Arc::new(StripeGateway) as Arc<dyn PaymentGateway>);
//! let gateway = Billing::dependency::<dyn PaymentGateway>();
//! ```

use crate::config::ModuleContainerPolicy;
use crate::container::{Resolver, ResolverExt};
use crate::dependency::Dependency;
use crate::environment::{self, Environment};
use crate::errors::ResolutionError;
use crate::failure::{report_registration, FailureHandler, FailureReport};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::panic::Location;
use std::sync::Arc;

/// Which container a module scope works with
#[derive(Clone)]
pub enum ContainerChoice {
    /// The environment's global container
    Global,
    /// A fresh private container
    Exclusive,
    /// A container supplied by the caller
    Custom(Arc<dyn Resolver>),
}

impl ContainerChoice {
    fn from_policy(policy: ModuleContainerPolicy) -> Self {
        match policy {
            ModuleContainerPolicy::Global => ContainerChoice::Global,
            ModuleContainerPolicy::Exclusive => ContainerChoice::Exclusive,
        }
    }

    fn build(self, env: &Environment) -> Arc<dyn Resolver> {
        match self {
            ContainerChoice::Global => Arc::clone(&env.global_container),
            ContainerChoice::Exclusive => env.build_exclusive_container(),
            ContainerChoice::Custom(resolver) => resolver,
        }
    }
}

/// Container and failure handler of one module
pub struct ModuleScope {
    name: &'static str,
    container: OnceCell<Arc<dyn Resolver>>,
    failure_handler: RwLock<Option<FailureHandler>>,
}

impl ModuleScope {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            container: OnceCell::new(),
            failure_handler: parking_lot::const_rwlock(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.container.get().is_some()
    }

    /// Binds the scope to a container.
    ///
    /// `None` picks the environment defaults. The failure handler is installed
    /// first; a second initialization is reported to it and keeps the
    /// container chosen the first time.
    #[track_caller]
    pub fn initialize(&self, container: Option<ContainerChoice>, failure_handler: Option<FailureHandler>) {
        let location = Location::caller();
        let env = environment::current();

        *self.failure_handler.write() =
            Some(failure_handler.unwrap_or_else(|| env.module_failure_handler.clone()));

        let choice = container.unwrap_or_else(|| ContainerChoice::from_policy(env.module_container));
        let mut installed = false;
        self.container.get_or_init(|| {
            installed = true;
            choice.build(&env)
        });

        if installed {
            tracing::debug!("Module `{}` initialized", self.name);
        } else {
            self.report(FailureReport::new("The container should not be initialized twice!").at(location));
        }
    }

    /// Handler failures of this scope go to
    pub fn failure_handler(&self) -> FailureHandler {
        let installed = self.failure_handler.read().clone();
        installed.unwrap_or_else(|| environment::current().module_failure_handler)
    }

    /// The scope's container. Using a scope before `initialize` is reported
    /// and then falls back to the environment's default container.
    #[track_caller]
    pub fn resolver(&self) -> Arc<dyn Resolver> {
        if let Some(resolver) = self.container.get() {
            return Arc::clone(resolver);
        }

        let location = Location::caller();
        self.report(
            FailureReport::new(format!("Module `{}` was used before being initialized!", self.name))
                .at(location),
        );

        let env = environment::current();
        let resolver = self
            .container
            .get_or_init(|| ContainerChoice::from_policy(env.module_container).build(&env));
        Arc::clone(resolver)
    }

    /// Registers an eager instance in the scope's container
    #[track_caller]
    pub fn register<T>(&self, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let location = Location::caller();
        let result = self.resolver().register(instance);
        report_registration(&self.failure_handler(), result, location);
    }

    /// Registers a lazy factory in the scope's container
    #[track_caller]
    pub fn register_lazy<T, F>(&self, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let location = Location::caller();
        let result = self.resolver().register_lazy(factory);
        report_registration(&self.failure_handler(), result, location);
    }

    #[track_caller]
    pub fn resolve<T>(&self) -> Result<Arc<T>, ResolutionError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.resolver().resolve::<T>()
    }

    /// A handle owned by this scope: its container and its failure handler
    #[track_caller]
    pub fn dependency<T>(&self) -> Dependency<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Dependency::with_resolver(self.resolver()).with_failure_handler(self.failure_handler())
    }

    fn report(&self, report: FailureReport) {
        tracing::warn!("Module `{}`: {}", self.name, report);
        (self.failure_handler())(&report);
    }
}

/// Type-level access to a static [`ModuleScope`]
pub trait Module {
    fn scope() -> &'static ModuleScope;

    #[track_caller]
    fn initialize(container: Option<ContainerChoice>, failure_handler: Option<FailureHandler>) {
        Self::scope().initialize(container, failure_handler)
    }

    #[track_caller]
    fn register<T>(instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self::scope().register(instance)
    }

    #[track_caller]
    fn register_lazy<T, F>(factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        Self::scope().register_lazy(factory)
    }

    #[track_caller]
    fn dependency<T>() -> Dependency<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self::scope().dependency()
    }
}

/// Declares a unit struct implementing [`Module`] backed by its own static scope
#[macro_export]
macro_rules! declare_module {
    ($vis:vis $module:ident) => {
        $vis struct $module;

        impl $crate::module::Module for $module {
            fn scope() -> &'static $crate::module::ModuleScope {
                static SCOPE: $crate::module::ModuleScope =
                    $crate::module::ModuleScope::new(stringify!($module));
                &SCOPE
            }
        }
    };
}

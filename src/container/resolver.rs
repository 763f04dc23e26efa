//! Object-safe resolver seam plus the typed API layered on top of it

use crate::contract::ContractId;
use crate::errors::{RegistrationError, ResolutionError};
use std::any::Any;
use std::sync::Arc;

/// Type-erased instance. Always wraps the `Arc<T>` of its contract `T`,
/// which lets unsized contracts (`dyn Trait`) go through `Any`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Type-erased zero-argument factory
pub type LazyFactory = Box<dyn Fn() -> Instance + Send + Sync>;

/// Anything dependencies can be registered in and resolved from.
///
/// Kept object-safe so handles and modules can hold an `Arc<dyn Resolver>`
/// and tests can swap in their own implementation.
pub trait Resolver: Send + Sync {
    /// Stores a ready-made instance under `contract`
    fn register_instance(
        &self,
        contract: ContractId,
        instance: Instance,
    ) -> Result<(), RegistrationError>;

    /// Stores a factory that builds the instance on first resolution
    fn register_factory(
        &self,
        contract: ContractId,
        factory: LazyFactory,
    ) -> Result<(), RegistrationError>;

    fn resolve_instance(&self, contract: ContractId) -> Result<Instance, ResolutionError>;
}

/// Typed registration and resolution for every [`Resolver`]
pub trait ResolverExt: Resolver {
    /// Registers an eager instance for the contract `T`
    fn register<T>(&self, instance: Arc<T>) -> Result<(), RegistrationError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_instance(ContractId::of::<T>(), erase(instance))
    }

    /// Shorthand for `register(Arc::new(value))`
    fn register_value<T>(&self, value: T) -> Result<(), RegistrationError>
    where
        T: Send + Sync + 'static,
    {
        self.register(Arc::new(value))
    }

    /// Registers a lazy factory for the contract `T`.
    /// The factory runs at most once, the first time `T` is resolved.
    fn register_lazy<T, F>(&self, factory: F) -> Result<(), RegistrationError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.register_factory(ContractId::of::<T>(), Box::new(move || erase(factory())))
    }

    fn resolve<T>(&self) -> Result<Arc<T>, ResolutionError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let contract = ContractId::of::<T>();
        let instance = self.resolve_instance(contract)?;
        downcast(contract, &instance)
    }
}

impl<R: Resolver + ?Sized> ResolverExt for R {}

pub(crate) fn erase<T>(instance: Arc<T>) -> Instance
where
    T: ?Sized + Send + Sync + 'static,
{
    Arc::new(instance)
}

pub(crate) fn downcast<T>(contract: ContractId, instance: &Instance) -> Result<Arc<T>, ResolutionError>
where
    T: ?Sized + Send + Sync + 'static,
{
    (**instance)
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(ResolutionError::TypeMismatch(contract))
}

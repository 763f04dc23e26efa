//! Light injection
//!
//! A small dependency registry: contracts are registered as eager instances
//! or lazy factories in a [`DependencyContainer`] and pulled back through
//! [`Dependency`] handles, which resolve on first access.

pub mod config;
pub mod configurator;
pub mod container;
pub mod contract;
pub mod dependency;
pub mod environment;
pub mod errors;
pub mod failure;
pub mod module;

// Re-export commonly used items for convenience
pub use configurator::{register, register_lazy, resolve, Configurator};
pub use container::{DependencyContainer, Resolver, ResolverExt};
pub use contract::ContractId;
pub use dependency::{Dependency, ResolutionState};
pub use environment::Environment;
pub use errors::{ContainerError, RegistrationError, ResolutionError};
pub use failure::{FailureHandler, FailurePolicy, FailureReport};
pub use module::{ContainerChoice, Module, ModuleScope};

//! Container module

mod dependency_container;
mod resolver;
mod store;

pub use dependency_container::{ContainerStats, DependencyContainer};
pub use resolver::{Instance, LazyFactory, Resolver, ResolverExt};

//! Lazily-resolving dependency handles

use crate::container::{DependencyContainer, Resolver, ResolverExt};
use crate::contract::ContractId;
use crate::environment;
use crate::errors::ResolutionError;
use crate::failure::{FailureHandler, FailureReport};
use parking_lot::Mutex;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Where a handle stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    ResolvedByContainer,
    /// Built with a caller-supplied value; never talks to the container
    ResolvedByCaller,
    Failed,
}

enum HandleState<T: ?Sized> {
    Unresolved,
    ResolvedByContainer(Arc<T>),
    ResolvedByCaller(Arc<T>),
    Failed(ResolutionError),
}

impl<T: ?Sized> HandleState<T> {
    /// The answer of a settled handle, `None` while unresolved
    fn settled(
        &self,
        contract: ContractId,
        explicit: bool,
    ) -> Option<Result<Arc<T>, ResolutionError>> {
        match self {
            HandleState::Unresolved => None,
            HandleState::ResolvedByCaller(value) => Some(Ok(Arc::clone(value))),
            HandleState::ResolvedByContainer(_) if explicit => {
                Some(Err(ResolutionError::DoubleResolution(contract)))
            }
            HandleState::ResolvedByContainer(value) => Some(Ok(Arc::clone(value))),
            HandleState::Failed(error) => Some(Err(error.clone())),
        }
    }

    fn state(&self) -> ResolutionState {
        match self {
            HandleState::Unresolved => ResolutionState::Unresolved,
            HandleState::ResolvedByContainer(_) => ResolutionState::ResolvedByContainer,
            HandleState::ResolvedByCaller(_) => ResolutionState::ResolvedByCaller,
            HandleState::Failed(_) => ResolutionState::Failed,
        }
    }
}

/// A reference to the contract `T` that is pulled from its container on first access.
///
/// The container is consulted at most once. After that every access returns
/// the same `Arc`, and a failed resolution keeps returning its error.
/// A factory must not read the handle that is currently resolving it.
///
/// ```ignore
/// let clock: Dependency<dyn Clock> = Dependency::with_resolver(container);
/// let now = clock.value().now();
/// ```
pub struct Dependency<T: ?Sized + Send + Sync + 'static> {
    contract: ContractId,
    resolver: Arc<dyn Resolver>,
    failure_handler: FailureHandler,
    state: Mutex<HandleState<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Dependency<T> {
    fn from_parts(
        resolver: Arc<dyn Resolver>,
        failure_handler: FailureHandler,
        state: HandleState<T>,
    ) -> Self {
        Self {
            contract: ContractId::of::<T>(),
            resolver,
            failure_handler,
            state: Mutex::new(state),
        }
    }

    /// Handle bound to the environment's global container
    pub fn new() -> Self {
        let env = environment::current();
        Self::from_parts(
            env.global_container,
            env.dependency_failure_handler,
            HandleState::Unresolved,
        )
    }

    pub fn with_resolver(resolver: Arc<dyn Resolver>) -> Self {
        let env = environment::current();
        Self::from_parts(resolver, env.dependency_failure_handler, HandleState::Unresolved)
    }

    /// Shorthand for a handle bound to a concrete container
    pub fn in_container(container: &Arc<DependencyContainer>) -> Self {
        Self::with_resolver(Arc::clone(container) as Arc<dyn Resolver>)
    }

    /// Handle that already holds `value`; the container is never consulted
    pub fn resolved(value: Arc<T>) -> Self {
        Self::with_value(environment::current().global_container, value)
    }

    pub fn with_value(resolver: Arc<dyn Resolver>, value: Arc<T>) -> Self {
        let env = environment::current();
        Self::from_parts(
            resolver,
            env.dependency_failure_handler,
            HandleState::ResolvedByCaller(value),
        )
    }

    pub fn with_failure_handler(mut self, failure_handler: FailureHandler) -> Self {
        self.failure_handler = failure_handler;
        self
    }

    pub fn contract(&self) -> ContractId {
        self.contract
    }

    pub fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.resolver
    }

    pub fn state(&self) -> ResolutionState {
        self.state.lock().state()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self.state(),
            ResolutionState::ResolvedByContainer | ResolutionState::ResolvedByCaller
        )
    }

    /// The dependency. Panics if it cannot be resolved and the failure handler returns.
    #[track_caller]
    pub fn value(&self) -> Arc<T> {
        match self.try_value() {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }

    /// The dependency, resolving it on first access.
    /// Failures are reported to the failure handler and returned.
    #[track_caller]
    pub fn try_value(&self) -> Result<Arc<T>, ResolutionError> {
        self.access(false, Location::caller())
    }

    /// Explicitly resolves the handle.
    ///
    /// Unlike [`Dependency::try_value`], asking again after a successful
    /// container resolution is a `DoubleResolution` failure. Caller-supplied
    /// values are returned as is.
    #[track_caller]
    pub fn resolve(&self) -> Result<Arc<T>, ResolutionError> {
        self.access(true, Location::caller())
    }

    fn access(
        &self,
        explicit: bool,
        location: &'static Location<'static>,
    ) -> Result<Arc<T>, ResolutionError> {
        let result = {
            let mut state = self.state.lock();
            match state.settled(self.contract, explicit) {
                Some(result) => result,
                None => {
                    let resolved = self.resolver.resolve::<T>();
                    *state = match &resolved {
                        Ok(value) => HandleState::ResolvedByContainer(Arc::clone(value)),
                        Err(error) => HandleState::Failed(error.clone()),
                    };
                    if resolved.is_ok() {
                        tracing::trace!("Dependency `{}` resolved", self.contract);
                    }
                    resolved
                }
            }
        };

        if let Err(error) = &result {
            (self.failure_handler)(&FailureReport::from_error(error.clone()).at(location));
        }
        result
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for Dependency<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Send + Sync + 'static> fmt::Debug for Dependency<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("contract", &self.contract)
            .field("state", &self.state())
            .finish()
    }
}

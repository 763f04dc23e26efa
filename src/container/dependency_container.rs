//! The dependency container
//!
//! Resolution order for a contract:
//! - eager instance
//! - cached lazy instance
//! - lazy factory (run once, result cached)
//! - `NotFound`

use super::resolver::{Instance, LazyFactory, Resolver};
use super::store::RegistryStore;
use crate::contract::ContractId;
use crate::errors::{RegistrationError, ResolutionError};
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref GLOBAL_CONTAINER: Arc<DependencyContainer> = Arc::new(DependencyContainer::new());
}

/// A contract within one container: (container address, contract)
type MaterializationKey = (usize, ContractId);

thread_local! {
    /// Factories running on this thread
    static MATERIALIZING: RefCell<Vec<MaterializationKey>> = const { RefCell::new(Vec::new()) };
}

/// Marks a contract of one container as being materialized on the current
/// thread until dropped. The same contract in another container is unrelated.
struct MaterializationGuard {
    key: MaterializationKey,
}

impl MaterializationGuard {
    fn enter(container: &DependencyContainer, contract: ContractId) -> Result<Self, ResolutionError> {
        let key = (container as *const DependencyContainer as usize, contract);
        MATERIALIZING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                return Err(ResolutionError::CircularDependency(contract));
            }
            stack.push(key);
            Ok(Self { key })
        })
    }
}

impl Drop for MaterializationGuard {
    fn drop(&mut self) {
        MATERIALIZING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|key| *key == self.key) {
                stack.remove(pos);
            }
        });
    }
}

#[derive(Default)]
struct InnerStats {
    total_resolutions: AtomicUsize,
    eager_hits: AtomicUsize,
    cache_hits: AtomicUsize,
    factory_invocations: AtomicUsize,
    failures: AtomicUsize,
}

/// Snapshot of a container's resolution counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub total_resolutions: usize,
    pub eager_hits: usize,
    pub cache_hits: usize,
    pub factory_invocations: usize,
    pub failures: usize,
}

impl ContainerStats {
    /// Share of resolutions served without running a factory
    pub fn hit_rate(&self) -> f64 {
        if self.total_resolutions == 0 {
            0.0
        } else {
            (self.eager_hits + self.cache_hits) as f64 / self.total_resolutions as f64
        }
    }
}

/// Thread-safe registry of eager instances and lazy factories.
///
/// Each container is an isolated scope. Share one through an `Arc`;
/// [`DependencyContainer::global`] is the process-wide default.
#[derive(Default)]
pub struct DependencyContainer {
    store: RegistryStore,
    stats: InnerStats,
}

impl DependencyContainer {
    pub fn new() -> Self {
        Self {
            store: RegistryStore::new(),
            stats: InnerStats::default(),
        }
    }

    /// The process-wide container, created on first use
    pub fn global() -> Arc<DependencyContainer> {
        GLOBAL_CONTAINER.clone()
    }

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.store.contains(ContractId::of::<T>())
    }

    /// Every registered contract, in no particular order
    pub fn contracts(&self) -> Vec<ContractId> {
        self.store.contracts()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.stats.total_resolutions.load(Ordering::Relaxed),
            eager_hits: self.stats.eager_hits.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            factory_invocations: self.stats.factory_invocations.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
        }
    }

    fn fail(&self, error: ResolutionError) -> Result<Instance, ResolutionError> {
        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Resolution failed: {}", error);
        Err(error)
    }
}

impl Resolver for DependencyContainer {
    fn register_instance(
        &self,
        contract: ContractId,
        instance: Instance,
    ) -> Result<(), RegistrationError> {
        self.store.put_eager(contract, instance)?;
        tracing::debug!("Registered instance for `{}`", contract);
        Ok(())
    }

    fn register_factory(
        &self,
        contract: ContractId,
        factory: LazyFactory,
    ) -> Result<(), RegistrationError> {
        self.store.put_lazy_factory(contract, factory)?;
        tracing::debug!("Registered lazy factory for `{}`", contract);
        Ok(())
    }

    fn resolve_instance(&self, contract: ContractId) -> Result<Instance, ResolutionError> {
        self.stats.total_resolutions.fetch_add(1, Ordering::Relaxed);

        if let Some(instance) = self.store.eager(contract) {
            self.stats.eager_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(instance);
        }

        if let Some(instance) = self.store.cached_lazy(contract) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(instance);
        }

        let Some(entry) = self.store.lazy_factory(contract) else {
            return self.fail(ResolutionError::NotFound(contract));
        };

        let _guard = match MaterializationGuard::enter(self, contract) {
            Ok(guard) => guard,
            Err(error) => return self.fail(error),
        };

        let mut invoked = false;
        let instance = entry.materialize(|| {
            invoked = true;
            tracing::debug!("Building lazy dependency `{}`", contract);
        });

        if invoked {
            self.stats.factory_invocations.fetch_add(1, Ordering::Relaxed);
        } else {
            // another thread built it while we were waiting on the cell
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::resolver::{erase, ResolverExt};
    use std::sync::Barrier;
    use std::thread;

    #[derive(Debug)]
    struct TestService {
        id: usize,
    }

    trait Repository: Send + Sync {
        fn name(&self) -> &str;
    }

    struct InMemoryRepository;

    impl Repository for InMemoryRepository {
        fn name(&self) -> &str {
            "in-memory"
        }
    }

    fn counted_service(container: &DependencyContainer, counter: Arc<AtomicUsize>) {
        container
            .register_lazy(move || {
                let id = counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(TestService { id })
            })
            .unwrap();
    }

    #[test]
    fn test_eager_instance_round_trip_and_duplicate() {
        let container = DependencyContainer::new();
        let instance = Arc::new(TestService { id: 7 });

        container.register(instance.clone()).unwrap();
        let resolved = container.resolve::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&resolved, &instance));

        let err = container.register_value(TestService { id: 8 }).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateRegistration(ContractId::of::<TestService>())
        );
        assert_eq!(container.resolve::<TestService>().unwrap().id, 7);
    }

    #[test]
    fn test_lazy_factory_runs_once() {
        let container = DependencyContainer::new();
        let counter = Arc::new(AtomicUsize::new(0));
        counted_service(&container, counter.clone());

        let first = container.resolve::<TestService>().unwrap();
        let second = container.resolve::<TestService>().unwrap();
        let third = container.resolve::<TestService>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_registration_blocks_eager_duplicate() {
        let container = DependencyContainer::new();
        counted_service(&container, Arc::new(AtomicUsize::new(0)));

        let err = container.register_value(TestService { id: 99 }).unwrap_err();
        assert_eq!(err.contract(), ContractId::of::<TestService>());
        // the factory is still the one that answers
        assert_eq!(container.resolve::<TestService>().unwrap().id, 0);
    }

    #[test]
    fn test_not_found_leaves_container_untouched() {
        let container = DependencyContainer::new();

        let err = container.resolve::<TestService>().unwrap_err();
        assert_eq!(err, ResolutionError::NotFound(ContractId::of::<TestService>()));
        assert!(container.is_empty());
        assert!(!container.is_registered::<TestService>());
        assert_eq!(container.stats().failures, 1);
    }

    #[test]
    fn test_trait_object_contract() {
        let container = DependencyContainer::new();
        container
            .register_lazy::<dyn Repository, _>(|| Arc::new(InMemoryRepository) as Arc<dyn Repository>)
            .unwrap();

        let repo = container.resolve::<dyn Repository>().unwrap();
        assert_eq!(repo.name(), "in-memory");
        assert!(container.is_registered::<dyn Repository>());
        assert!(!container.is_registered::<InMemoryRepository>());
    }

    #[test]
    fn test_type_mismatch_from_erased_registration() {
        let container = DependencyContainer::new();
        let contract = ContractId::of::<TestService>();
        container
            .register_instance(contract, erase(Arc::new("not a service")))
            .unwrap();

        let err = container.resolve::<TestService>().unwrap_err();
        assert_eq!(err, ResolutionError::TypeMismatch(contract));
    }

    #[test]
    fn test_factory_may_resolve_other_contracts() {
        let container = Arc::new(DependencyContainer::new());
        container.register_value(TestService { id: 3 }).unwrap();

        let inner = Arc::clone(&container);
        container
            .register_lazy::<dyn Repository, _>(move || {
                let service = inner.resolve::<TestService>().unwrap();
                assert_eq!(service.id, 3);
                Arc::new(InMemoryRepository) as Arc<dyn Repository>
            })
            .unwrap();

        assert!(container.resolve::<dyn Repository>().is_ok());
    }

    #[test]
    fn test_self_referencing_factory_is_reported() {
        let container = Arc::new(DependencyContainer::new());
        let inner = Arc::clone(&container);
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let seen_in_factory = Arc::clone(&seen);

        container
            .register_lazy(move || {
                *seen_in_factory.lock() = inner.resolve::<TestService>().err();
                Arc::new(TestService { id: 1 })
            })
            .unwrap();

        let service = container.resolve::<TestService>().unwrap();
        assert_eq!(service.id, 1);
        assert_eq!(
            *seen.lock(),
            Some(ResolutionError::CircularDependency(ContractId::of::<TestService>()))
        );
    }

    #[test]
    fn test_factory_may_resolve_same_contract_from_another_container() {
        let base = Arc::new(DependencyContainer::new());
        base.register_lazy(|| Arc::new(TestService { id: 1 })).unwrap();

        let wrapping = DependencyContainer::new();
        let delegate = Arc::clone(&base);
        wrapping
            .register_lazy(move || {
                let inner = delegate.resolve::<TestService>().unwrap();
                Arc::new(TestService { id: inner.id + 10 })
            })
            .unwrap();

        assert_eq!(wrapping.resolve::<TestService>().unwrap().id, 11);
        assert_eq!(base.resolve::<TestService>().unwrap().id, 1);
    }

    #[test]
    fn test_concurrent_first_resolution() {
        let container = Arc::new(DependencyContainer::new());
        let counter = Arc::new(AtomicUsize::new(0));
        counted_service(&container, counter.clone());

        let barrier = Arc::new(Barrier::new(16));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let container = Arc::clone(&container);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    container.resolve::<TestService>().unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for service in &results {
            assert!(Arc::ptr_eq(service, &results[0]));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(container.stats().factory_invocations, 1);
    }

    #[test]
    fn test_concurrent_duplicate_registration() {
        let container = Arc::new(DependencyContainer::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|id| {
                let container = Arc::clone(&container);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    container.register_value(TestService { id }).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_container_stats() {
        let container = DependencyContainer::new();
        container.register_value(String::from("eager")).unwrap();
        counted_service(&container, Arc::new(AtomicUsize::new(0)));

        for _ in 0..4 {
            container.resolve::<TestService>().unwrap();
        }
        container.resolve::<String>().unwrap();
        let _ = container.resolve::<u64>();

        let stats = container.stats();
        assert_eq!(stats.total_resolutions, 6);
        assert_eq!(stats.factory_invocations, 1);
        assert_eq!(stats.cache_hits, 3);
        assert_eq!(stats.eager_hits, 1);
        assert_eq!(stats.failures, 1);
        assert!((stats.hit_rate() - 4.0 / 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(
            &DependencyContainer::global(),
            &DependencyContainer::global()
        ));
    }
}

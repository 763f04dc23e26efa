//! Raw keyed storage for a container
//!
//! One map entry per contract holds either the eager instance or the lazy
//! entry (factory + materialized cache), so the duplicate check and the
//! insertion happen under the same shard lock.

use super::resolver::{Instance, LazyFactory};
use crate::contract::ContractId;
use crate::errors::RegistrationError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

enum Registration {
    Eager(Instance),
    Lazy(Arc<LazyEntry>),
}

/// A lazy factory together with its materialized instance
pub(crate) struct LazyEntry {
    factory: LazyFactory,
    cached: OnceCell<Instance>,
}

impl LazyEntry {
    fn new(factory: LazyFactory) -> Self {
        Self {
            factory,
            cached: OnceCell::new(),
        }
    }

    pub(crate) fn cached(&self) -> Option<Instance> {
        self.cached.get().cloned()
    }

    /// Returns the cached instance, running the factory first if the cache is empty.
    ///
    /// Concurrent callers block on the cell until the first one has stored its
    /// result, so the factory runs at most once. `on_invoke` is called right
    /// before the factory.
    pub(crate) fn materialize(&self, on_invoke: impl FnOnce()) -> Instance {
        self.cached
            .get_or_init(|| {
                on_invoke();
                (self.factory)()
            })
            .clone()
    }
}

#[derive(Default)]
pub(crate) struct RegistryStore {
    entries: DashMap<ContractId, Registration>,
}

impl RegistryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put_eager(
        &self,
        contract: ContractId,
        instance: Instance,
    ) -> Result<(), RegistrationError> {
        self.insert(contract, Registration::Eager(instance))
    }

    pub(crate) fn put_lazy_factory(
        &self,
        contract: ContractId,
        factory: LazyFactory,
    ) -> Result<(), RegistrationError> {
        self.insert(contract, Registration::Lazy(Arc::new(LazyEntry::new(factory))))
    }

    fn insert(&self, contract: ContractId, registration: Registration) -> Result<(), RegistrationError> {
        match self.entries.entry(contract) {
            Entry::Occupied(_) => Err(RegistrationError::DuplicateRegistration(contract)),
            Entry::Vacant(slot) => {
                slot.insert(registration);
                Ok(())
            }
        }
    }

    pub(crate) fn eager(&self, contract: ContractId) -> Option<Instance> {
        let entry = self.entries.get(&contract)?;
        match entry.value() {
            Registration::Eager(instance) => Some(instance.clone()),
            Registration::Lazy(_) => None,
        }
    }

    /// The lazy entry is cloned out so no shard lock is held while its factory runs
    pub(crate) fn lazy_factory(&self, contract: ContractId) -> Option<Arc<LazyEntry>> {
        let entry = self.entries.get(&contract)?;
        match entry.value() {
            Registration::Lazy(lazy) => Some(Arc::clone(lazy)),
            Registration::Eager(_) => None,
        }
    }

    pub(crate) fn cached_lazy(&self, contract: ContractId) -> Option<Instance> {
        self.lazy_factory(contract)?.cached()
    }

    pub(crate) fn contains(&self, contract: ContractId) -> bool {
        self.entries.contains_key(&contract)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contracts(&self) -> Vec<ContractId> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }
}

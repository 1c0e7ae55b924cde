//! Backend registry.
//!
//! Holds the set of registered yield backends with constant-time membership
//! checks and constant-time removal. Removal swaps the last entry into the
//! freed slot, so iteration order is insertion order only until the first
//! removal.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sluice_core::traits::YieldBackend;
use sluice_core::types::{Amount, BackendId, BasisPoints};

use crate::error::ManagerError;

/// A registered backend.
#[derive(Clone)]
pub struct BackendEntry {
    /// Registry handle.
    pub id: BackendId,
    /// Capability used for every call.
    pub backend: Arc<dyn YieldBackend>,
}

impl fmt::Debug for BackendEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendEntry")
            .field("id", &self.id)
            .field("name", &self.backend.name())
            .finish()
    }
}

/// Balance and yield of one backend, read once at the start of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSnapshot {
    /// Registry handle.
    pub id: BackendId,
    /// Balance reported by `total_assets`.
    pub balance: Amount,
    /// Yield reported by `apy`.
    pub apy: BasisPoints,
}

/// Set of registered backends.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    entries: Vec<BackendEntry>,
    index: HashMap<BackendId, usize>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no backend is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &BackendId) -> bool {
        self.index.contains_key(id)
    }

    /// Looks up a backend by handle.
    #[must_use]
    pub fn get(&self, id: &BackendId) -> Option<&Arc<dyn YieldBackend>> {
        self.index.get(id).map(|&i| &self.entries[i].backend)
    }

    /// Registers a backend under `id`.
    pub fn insert(
        &mut self,
        id: BackendId,
        backend: Arc<dyn YieldBackend>,
    ) -> Result<(), ManagerError> {
        if self.contains(&id) {
            return Err(ManagerError::BackendAlreadyExists(id));
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push(BackendEntry { id, backend });
        Ok(())
    }

    /// Unregisters `id`, returning its capability.
    pub fn remove(&mut self, id: &BackendId) -> Result<Arc<dyn YieldBackend>, ManagerError> {
        let slot = self
            .index
            .remove(id)
            .ok_or_else(|| ManagerError::BackendNotFound(id.clone()))?;

        let removed = self.entries.swap_remove(slot);
        if let Some(moved) = self.entries.get(slot) {
            self.index.insert(moved.id.clone(), slot);
        }
        Ok(removed.backend)
    }

    /// Iterates over the registered backends.
    pub fn iter(&self) -> impl Iterator<Item = &BackendEntry> {
        self.entries.iter()
    }

    /// Registered handles in iteration order.
    #[must_use]
    pub fn ids(&self) -> Vec<BackendId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Reads balance and yield from every backend, in iteration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BackendSnapshot> {
        self.entries
            .iter()
            .map(|e| BackendSnapshot {
                id: e.id.clone(),
                balance: e.backend.total_assets(),
                apy: e.backend.apy(),
            })
            .collect()
    }
}

/// Sums the balances of a snapshot.
pub fn total_balance(snapshots: &[BackendSnapshot]) -> Result<Amount, ManagerError> {
    snapshots
        .iter()
        .map(|s| s.balance)
        .sum::<Option<Amount>>()
        .ok_or(ManagerError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SimulatedBackend;
    use sluice_core::types::AssetId;

    fn backend(name: &str, balance: u128) -> Arc<dyn YieldBackend> {
        Arc::new(
            SimulatedBackend::new(name, AssetId::new("USDC").unwrap(), BasisPoints::new(500))
                .with_balance(Amount::new(balance)),
        )
    }

    fn id(s: &str) -> BackendId {
        BackendId::new(s).unwrap()
    }

    #[test]
    fn test_insert_and_contains() {
        let mut registry = BackendRegistry::new();
        registry.insert(id("a"), backend("a", 0)).unwrap();
        registry.insert(id("b"), backend("b", 0)).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&id("a")));
        assert!(!registry.contains(&id("c")));
        assert_eq!(registry.ids(), vec![id("a"), id("b")]);
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let mut registry = BackendRegistry::new();
        registry.insert(id("a"), backend("a", 0)).unwrap();
        let err = registry.insert(id("a"), backend("a2", 0)).unwrap_err();
        assert_eq!(err, ManagerError::BackendAlreadyExists(id("a")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_swaps_last_into_slot() {
        let mut registry = BackendRegistry::new();
        for name in ["a", "b", "c"] {
            registry.insert(id(name), backend(name, 0)).unwrap();
        }

        registry.remove(&id("a")).unwrap();
        assert_eq!(registry.ids(), vec![id("c"), id("b")]);
        assert_eq!(registry.get(&id("c")).unwrap().name(), "c");
        assert_eq!(registry.get(&id("b")).unwrap().name(), "b");

        registry.remove(&id("b")).unwrap();
        assert_eq!(registry.ids(), vec![id("c")]);
    }

    #[test]
    fn test_remove_last_entry() {
        let mut registry = BackendRegistry::new();
        registry.insert(id("a"), backend("a", 0)).unwrap();
        registry.remove(&id("a")).unwrap();
        assert!(registry.is_empty());
        assert!(registry.get(&id("a")).is_none());
    }

    #[test]
    fn test_remove_unknown() {
        let mut registry = BackendRegistry::new();
        let Err(err) = registry.remove(&id("ghost")) else {
            panic!("removing an unknown backend succeeded");
        };
        assert_eq!(err, ManagerError::BackendNotFound(id("ghost")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_reads_live_values() {
        let mut registry = BackendRegistry::new();
        registry.insert(id("a"), backend("a", 100)).unwrap();
        registry.insert(id("b"), backend("b", 250)).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].balance, Amount::new(100));
        assert_eq!(snapshot[1].apy, BasisPoints::new(500));
        assert_eq!(total_balance(&snapshot).unwrap(), Amount::new(350));
    }
}

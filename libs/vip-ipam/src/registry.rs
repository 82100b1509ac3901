//! Per-namespace pool storage

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::{error::Result, pool::Pool, spec::PoolSpec};

/// The pool owned by one namespace, if it has been built yet
#[derive(Debug, Default)]
pub(crate) struct PoolSlot {
    pool: Option<Pool>,
}

impl PoolSlot {
    /// Get this namespace's pool, building or rebuilding it so that it matches `spec`
    pub fn resolve(&mut self, namespace: &str, spec: &PoolSpec) -> Result<&mut Pool> {
        match self.pool {
            Some(ref mut pool) => {
                if pool.spec() != spec {
                    log::debug!(
                        "Rebuilding pool for namespace {:?}: {} -> {}",
                        namespace,
                        pool.spec(),
                        spec
                    );
                    let dropped = pool.rebuild(spec.clone())?;
                    if !dropped.is_empty() {
                        log::warn!(
                            "Pool rebuild for namespace {:?} dropped {} leased address(es): {:?}",
                            namespace,
                            dropped.len(),
                            dropped
                        );
                    }
                    #[cfg(feature = "metrics")]
                    vipam_metrics::metrics::POOL_REBUILDS.inc();
                }
                Ok(pool)
            }
            None => {
                log::debug!("Building pool for namespace {:?} from {}", namespace, spec);
                Ok(self.pool.insert(Pool::build(spec.clone())?))
            }
        }
    }

    /// Get this namespace's pool without building one
    pub fn pool(&self) -> Option<&Pool> {
        self.pool.as_ref()
    }

    pub fn pool_mut(&mut self) -> Option<&mut Pool> {
        self.pool.as_mut()
    }
}

/// Holds one address pool per namespace
///
/// Each namespace sits behind its own lock. The outer map lock is only held long enough
/// to find or insert a namespace, so unrelated namespaces never wait on each other's scans.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    slots: RwLock<FxHashMap<String, Arc<Mutex<PoolSlot>>>>,
}

impl PoolRegistry {
    /// Construct a new empty `PoolRegistry`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the slot for a namespace, creating an empty one if needed
    pub(crate) fn slot(&self, namespace: &str) -> Arc<Mutex<PoolSlot>> {
        if let Some(slot) = self.slots.read().get(namespace) {
            return Arc::clone(slot);
        }
        Arc::clone(self.slots.write().entry(namespace.to_owned()).or_default())
    }

    /// Get the slot for a namespace only if one was already created
    pub(crate) fn existing(&self, namespace: &str) -> Option<Arc<Mutex<PoolSlot>>> {
        self.slots.read().get(namespace).cloned()
    }

    /// Drop a namespace's slot if it never got a pool and nobody else holds it
    ///
    /// Called after a failed first build so that rejected namespaces do not pile up. A slot
    /// still referenced by another caller is left alone; that caller prunes it in turn.
    pub(crate) fn prune(&self, namespace: &str) {
        let mut slots = self.slots.write();
        let unused = slots
            .get(namespace)
            .is_some_and(|slot| Arc::strong_count(slot) == 1 && slot.lock().pool().is_none());
        if unused {
            log::trace!("Dropping empty slot for namespace {:?}", namespace);
            slots.remove(namespace);
        }
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.read().len()
    }

    /// Names of all namespaces that currently own a pool, sorted
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        let slots: Vec<(String, Arc<Mutex<PoolSlot>>)> = self
            .slots
            .read()
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(slot)))
            .collect();

        let mut names: Vec<String> = slots
            .into_iter()
            .filter(|(_, slot)| slot.lock().pool().is_some())
            .map(|(name, _)| name)
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_shared() {
        let registry = PoolRegistry::new();
        let a = registry.slot("default");
        let b = registry.slot("default");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.existing("other").is_none());
    }

    #[test]
    fn test_resolve_builds_once() {
        let registry = PoolRegistry::new();
        let spec: PoolSpec = "10.0.0.0/30".parse().unwrap();
        let slot = registry.slot("default");
        let mut slot = slot.lock();

        slot.resolve("default", &spec).unwrap().allocate().unwrap();
        // Same spec, same pool
        let pool = slot.resolve("default", &spec).unwrap();
        assert_eq!(pool.leased_count(), 1);
    }

    #[test]
    fn test_resolve_failure_creates_no_pool() {
        let registry = PoolRegistry::new();
        let spec: PoolSpec = "2001:db8::/64".parse().unwrap();
        {
            let slot = registry.slot("default");
            let mut slot = slot.lock();
            assert!(slot.resolve("default", &spec).is_err());
            assert!(slot.pool().is_none());
        }
        assert!(registry.namespaces().is_empty());
    }

    #[test]
    fn test_prune_only_drops_unused_empty_slots() {
        let registry = PoolRegistry::new();
        let spec: PoolSpec = "10.0.0.1-10.0.0.2".parse().unwrap();
        registry.slot("built").lock().resolve("built", &spec).unwrap();
        registry.slot("empty");
        let held = registry.slot("held");

        for name in ["built", "empty", "held", "missing"] {
            registry.prune(name);
        }
        assert!(registry.existing("built").is_some());
        assert!(registry.existing("empty").is_none());
        assert!(registry.existing("held").is_some());

        drop(held);
        registry.prune("held");
        assert_eq!(registry.slot_count(), 1);
    }

    #[test]
    fn test_namespaces() {
        let registry = PoolRegistry::new();
        let spec: PoolSpec = "10.0.0.1-10.0.0.2".parse().unwrap();
        for name in ["zeta", "alpha"] {
            registry.slot(name).lock().resolve(name, &spec).unwrap();
        }
        registry.slot("empty");
        assert_eq!(registry.namespaces(), vec!["alpha", "zeta"]);
    }
}

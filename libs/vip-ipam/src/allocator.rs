//! The public entry points for leasing and releasing addresses

use std::net::IpAddr;

use crate::{
    error::{Error, Result},
    pool::{Pool, PoolStats},
    registry::PoolRegistry,
    spec::PoolSpec,
};

/// Hands out addresses from per-namespace pools
///
/// All operations on one namespace are serialized: a pool lookup or rebuild and the
/// lease scan that follows it happen under the same lock, so two concurrent callers can
/// never be handed the same address. Share it between workers with an `Arc`.
#[derive(Debug, Default)]
pub struct AddressAllocator {
    registry: PoolRegistry,
}

impl AddressAllocator {
    /// Construct an allocator with an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct an allocator around an existing registry
    #[must_use]
    pub fn from_registry(registry: PoolRegistry) -> Self {
        Self { registry }
    }

    /// Lease the next free address from `namespace`'s pool
    ///
    /// `spec` is either a CIDR block or a comma-separated list of `start-end` ranges. The
    /// namespace's pool is built on first use and rebuilt whenever `spec` changes.
    pub fn allocate_address(&self, namespace: &str, spec: &str) -> Result<IpAddr> {
        match spec.parse::<PoolSpec>() {
            Ok(spec) => self.allocate_from(namespace, &spec),
            Err(err) => {
                let result = Err(err);
                record("allocate", namespace, &result, None);
                result
            }
        }
    }

    /// Lease the next free address from `namespace`'s pool, built from an already parsed spec
    pub fn allocate_from(&self, namespace: &str, spec: &PoolSpec) -> Result<IpAddr> {
        let (result, leased) = self.with_resolved(namespace, spec, Pool::allocate);
        match &result {
            Ok(addr) => log::debug!("Leased {} in namespace {:?}", addr, namespace),
            Err(err) => log::debug!("Allocation in namespace {:?} failed: {}", namespace, err),
        }

        record("allocate", namespace, &result, leased);
        result
    }

    /// Lease a specific address, for example when restoring state recorded before a restart
    pub fn claim_address(&self, namespace: &str, spec: &str, address: IpAddr) -> Result<()> {
        match spec.parse::<PoolSpec>() {
            Ok(spec) => self.claim_from(namespace, &spec, address),
            Err(err) => {
                let result = Err(err);
                record("claim", namespace, &result, None);
                result
            }
        }
    }

    /// Lease a specific address from a pool built from an already parsed spec
    pub fn claim_from(&self, namespace: &str, spec: &PoolSpec, address: IpAddr) -> Result<()> {
        let (result, leased) = self.with_resolved(namespace, spec, |pool| pool.claim(address));
        if result.is_ok() {
            log::debug!("Claimed {} in namespace {:?}", address, namespace);
        }

        record("claim", namespace, &result, leased);
        result
    }

    /// Return an address to `namespace`'s pool
    ///
    /// Releasing an address that is part of the pool but not leased succeeds without
    /// effect. This never creates a pool.
    pub fn release_address(&self, namespace: &str, address: IpAddr) -> Result<()> {
        let Some(slot) = self.registry.existing(namespace) else {
            let result = Err(Error::UnknownNamespace(namespace.to_owned()));
            record("release", namespace, &result, None);
            return result;
        };
        let mut slot = slot.lock();

        let result = match slot.pool_mut() {
            Some(pool) => pool.release(address),
            None => Err(Error::UnknownNamespace(namespace.to_owned())),
        };
        match &result {
            Ok(()) => log::debug!("Released {} in namespace {:?}", address, namespace),
            Err(err) => log::debug!("Release in namespace {:?} failed: {}", namespace, err),
        }

        record(
            "release",
            namespace,
            &result,
            slot.pool().map(|pool| pool.leased_count()),
        );
        result
    }

    /// Check whether an address is currently leased in `namespace`
    pub fn is_leased(&self, namespace: &str, address: IpAddr) -> Result<bool> {
        self.with_pool(namespace, |pool| pool.is_leased(address))
    }

    /// All leased addresses of `namespace`, in allocation order
    pub fn leases(&self, namespace: &str) -> Result<Vec<IpAddr>> {
        self.with_pool(namespace, |pool| pool.leases())
    }

    /// A snapshot of the size and usage of `namespace`'s pool
    pub fn pool_stats(&self, namespace: &str) -> Result<PoolStats> {
        self.with_pool(namespace, |pool| pool.stats())
    }

    /// Names of all namespaces that currently own a pool, sorted
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.registry.namespaces()
    }

    /// Run `f` on `namespace`'s pool after bringing it in line with `spec`
    ///
    /// Also returns the pool's lease count, or `None` if the namespace still has no pool, in
    /// which case its empty slot is pruned.
    fn with_resolved<T>(
        &self,
        namespace: &str,
        spec: &PoolSpec,
        f: impl FnOnce(&mut Pool) -> Result<T>,
    ) -> (Result<T>, Option<usize>) {
        let (result, leased) = {
            let slot = self.registry.slot(namespace);
            let mut slot = slot.lock();
            let result = slot.resolve(namespace, spec).and_then(f);
            let leased = slot.pool().map(Pool::leased_count);
            (result, leased)
        };
        if leased.is_none() {
            self.registry.prune(namespace);
        }
        (result, leased)
    }

    fn with_pool<T>(&self, namespace: &str, f: impl FnOnce(&Pool) -> T) -> Result<T> {
        let unknown = || Error::UnknownNamespace(namespace.to_owned());
        let slot = self.registry.existing(namespace).ok_or_else(unknown)?;
        let slot = slot.lock();
        slot.pool().map(f).ok_or_else(unknown)
    }
}

/// Record the outcome of an operation in the metrics registry
///
/// The lease gauge is only touched when the namespace has a pool, so namespaces whose
/// first build failed never get a series.
#[allow(unused_variables)]
fn record<T>(operation: &str, namespace: &str, result: &Result<T>, leased: Option<usize>) {
    #[cfg(feature = "metrics")]
    {
        use vipam_metrics::metrics::{label_values, ADDRESS_OPERATIONS, LEASED_ADDRESSES};

        let status = match result {
            Ok(_) => label_values::STATUS_OK,
            Err(Error::InvalidPoolSpec { .. }) => label_values::STATUS_INVALID_SPEC,
            Err(Error::AddressPoolExhausted(_)) => label_values::STATUS_EXHAUSTED,
            Err(Error::UnknownNamespace(_)) => label_values::STATUS_UNKNOWN_NAMESPACE,
            Err(Error::UnknownAddress(_)) => label_values::STATUS_UNKNOWN_ADDRESS,
            Err(Error::AddressAlreadyLeased(_)) => label_values::STATUS_ALREADY_LEASED,
        };
        ADDRESS_OPERATIONS
            .with_label_values(&[operation, status])
            .inc();

        if let Some(leased) = leased {
            #[allow(clippy::cast_possible_wrap)]
            LEASED_ADDRESSES
                .with_label_values(&[namespace])
                .set(leased as i64);
        }
    }
}

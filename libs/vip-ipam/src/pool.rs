use std::net::IpAddr;

use rustc_hash::FxHashSet;

use crate::{
    error::{Error, Result},
    spec::PoolSpec,
};

/// A point-in-time view of a namespace's pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// The spec the pool was last built from
    pub spec: PoolSpec,
    /// Total number of addresses in the pool
    pub size: usize,
    /// Number of leased addresses
    pub leased: usize,
    /// Number of addresses available for allocation
    pub free: usize,
}

/// An address universe and the subset of it currently leased out
#[derive(Debug, Clone)]
pub(crate) struct Pool {
    /// Last spec used to build this pool
    spec: PoolSpec,
    /// Every address in the pool, in allocation order
    universe: Vec<IpAddr>,
    /// Membership index over `universe`
    members: FxHashSet<IpAddr>,
    /// Leased addresses. Always a subset of `members`
    leased: FxHashSet<IpAddr>,
}

impl Pool {
    /// Build a fresh pool with nothing leased
    pub fn build(spec: PoolSpec) -> Result<Self> {
        let universe = spec.expand()?;
        let members = universe.iter().copied().collect();
        Ok(Self {
            spec,
            universe,
            members,
            leased: FxHashSet::default(),
        })
    }

    /// Rebuild this pool from a new spec
    ///
    /// Leases on addresses that survive into the new universe are kept. Leased addresses
    /// that fall out of it are forgotten and returned to the caller. On error the pool is
    /// left untouched.
    pub fn rebuild(&mut self, spec: PoolSpec) -> Result<Vec<IpAddr>> {
        let mut next = Self::build(spec)?;

        let mut dropped = Vec::new();
        for addr in self.leased.drain() {
            if next.members.contains(&addr) {
                next.leased.insert(addr);
            } else {
                dropped.push(addr);
            }
        }
        dropped.sort_unstable();

        *self = next;
        Ok(dropped)
    }

    pub fn spec(&self) -> &PoolSpec {
        &self.spec
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.members.contains(&addr)
    }

    pub fn is_leased(&self, addr: IpAddr) -> bool {
        self.leased.contains(&addr)
    }

    pub fn leased_count(&self) -> usize {
        self.leased.len()
    }

    /// Leased addresses in allocation order
    pub fn leases(&self) -> Vec<IpAddr> {
        self.universe
            .iter()
            .filter(|addr| self.leased.contains(*addr))
            .copied()
            .collect()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            spec: self.spec.clone(),
            size: self.universe.len(),
            leased: self.leased.len(),
            free: self.universe.len() - self.leased.len(),
        }
    }

    /// Lease the first free address
    #[profiling::function]
    pub fn allocate(&mut self) -> Result<IpAddr> {
        let addr = self
            .universe
            .iter()
            .find(|addr| !self.leased.contains(*addr))
            .copied()
            .ok_or(Error::AddressPoolExhausted(self.universe.len()))?;
        self.leased.insert(addr);
        Ok(addr)
    }

    /// Lease one specific address
    pub fn claim(&mut self, addr: IpAddr) -> Result<()> {
        if !self.contains(addr) {
            return Err(Error::UnknownAddress(addr));
        }
        if !self.leased.insert(addr) {
            return Err(Error::AddressAlreadyLeased(addr));
        }
        Ok(())
    }

    /// Return an address to the pool. Releasing a free address is a no-op
    pub fn release(&mut self, addr: IpAddr) -> Result<()> {
        if !self.contains(addr) {
            return Err(Error::UnknownAddress(addr));
        }
        self.leased.remove(&addr);
        Ok(())
    }
}

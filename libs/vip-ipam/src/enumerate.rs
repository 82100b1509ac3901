//! Expansion of pool specifications into concrete address lists

use std::net::IpAddr;

use ipnet::{IpAdd, IpAddrRange, IpNet, IpSub, Ipv6AddrRange};
use rustc_hash::FxHashSet;

use crate::{
    error::{Error, Result},
    spec::{AddressRange, PoolSpec},
};

/// The largest number of addresses a single pool may hold
///
/// Specs that expand past this (an IPv6 `/64`, for example) are rejected rather than
/// enumerated.
pub const MAX_POOL_ADDRESSES: usize = 1 << 20;

/// Expands a CIDR block into every usable address it contains, in ascending order
///
/// The network and broadcast addresses are left out whenever the block holds more than
/// two addresses. A `/31` or `/32` (or the IPv6 `/127` and `/128`) is returned whole.
#[profiling::function]
pub fn expand_cidr(cidr: &str) -> Result<Vec<IpAddr>> {
    let cidr = cidr.trim();
    let net = cidr
        .parse::<IpNet>()
        .map_err(|err| Error::invalid_spec(cidr, err.to_string()))?;
    expand_net(net.trunc())
}

/// Expands a comma-separated list of inclusive `start-end` ranges
///
/// Ranges are walked in the order given. An address already produced by an earlier
/// range keeps its original position and is not repeated.
#[profiling::function]
pub fn expand_ranges(ranges: &str) -> Result<Vec<IpAddr>> {
    match ranges.parse::<PoolSpec>()? {
        PoolSpec::Ranges(ranges) => expand_address_ranges(&ranges),
        PoolSpec::Cidr(_) => Err(Error::invalid_spec(
            ranges.trim(),
            "expected a list of <start>-<end> ranges",
        )),
    }
}

pub(crate) fn expand_net(net: IpNet) -> Result<Vec<IpAddr>> {
    let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
    if 1u128
        .checked_shl(host_bits)
        .map_or(true, |count| count > MAX_POOL_ADDRESSES as u128)
    {
        return Err(too_large(net.to_string()));
    }

    let hosts: IpAddrRange = match net {
        IpNet::V4(net) => net.hosts().into(),
        // IPv6 has no broadcast, but the top address of the block is skipped all the same
        IpNet::V6(net) if net.prefix_len() < 127 => Ipv6AddrRange::new(
            net.network().saturating_add(1u128),
            net.broadcast().saturating_sub(1u128),
        )
        .into(),
        IpNet::V6(net) => net.hosts().into(),
    };
    let addrs: Vec<IpAddr> = hosts.collect();

    log::trace!("Expanded {} into {} addresses", net, addrs.len());
    Ok(addrs)
}

pub(crate) fn expand_address_ranges(ranges: &[AddressRange]) -> Result<Vec<IpAddr>> {
    let mut seen = FxHashSet::default();
    let mut addrs = Vec::new();

    for range in ranges {
        if range.len() > MAX_POOL_ADDRESSES as u128 {
            return Err(too_large(range.to_string()));
        }
        for addr in range.addrs() {
            if !seen.insert(addr) {
                continue;
            }
            if addrs.len() == MAX_POOL_ADDRESSES {
                return Err(too_large(PoolSpec::Ranges(ranges.to_vec()).to_string()));
            }
            addrs.push(addr);
        }
    }

    log::trace!(
        "Expanded {} range(s) into {} addresses",
        ranges.len(),
        addrs.len()
    );
    Ok(addrs)
}

fn too_large(token: String) -> Error {
    Error::invalid_spec(
        token,
        format!("pool would contain more than {MAX_POOL_ADDRESSES} addresses"),
    )
}

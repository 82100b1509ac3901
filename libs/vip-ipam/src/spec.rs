//! Parsing of pool specifications

use std::{fmt, net::IpAddr, str::FromStr};

use ipnet::{IpAddrRange, IpNet, Ipv4AddrRange, Ipv6AddrRange};

use crate::error::{Error, Result};

/// An inclusive range of addresses of a single family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    start: IpAddr,
    end: IpAddr,
    addrs: IpAddrRange,
}

impl AddressRange {
    /// Construct a new range, checking that both ends share a family and are in order
    pub fn new(start: IpAddr, end: IpAddr) -> Result<Self> {
        let token = format!("{start}-{end}");
        let addrs: IpAddrRange = match (start, end) {
            (IpAddr::V4(first), IpAddr::V4(last)) => Ipv4AddrRange::new(first, last).into(),
            (IpAddr::V6(first), IpAddr::V6(last)) => Ipv6AddrRange::new(first, last).into(),
            _ => {
                return Err(Error::invalid_spec(
                    token,
                    "start and end belong to different address families",
                ))
            }
        };
        if start > end {
            return Err(Error::invalid_spec(token, "start is greater than end"));
        }
        Ok(Self { start, end, addrs })
    }

    /// First address of the range
    #[must_use]
    pub fn start(&self) -> IpAddr {
        self.start
    }

    /// Last address of the range
    #[must_use]
    pub fn end(&self) -> IpAddr {
        self.end
    }

    /// Iterates every address in the range, lowest first
    #[must_use]
    pub fn addrs(&self) -> IpAddrRange {
        self.addrs
    }

    /// Number of addresses in the range, saturating at `u128::MAX`
    #[must_use]
    pub fn len(&self) -> u128 {
        (addr_to_bits(self.end) - addr_to_bits(self.start)).saturating_add(1)
    }

    /// Ranges always hold at least one address
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl FromStr for AddressRange {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim();
        let (start, end) = token
            .split_once('-')
            .ok_or_else(|| Error::invalid_spec(token, "expected <start>-<end>"))?;

        let parse = |part: &str| {
            part.trim().parse::<IpAddr>().map_err(|_| {
                Error::invalid_spec(token, format!("unparsable address {:?}", part.trim()))
            })
        };

        // Re-tag any range error with the token as the caller wrote it
        Self::new(parse(start)?, parse(end)?).map_err(|err| match err {
            Error::InvalidPoolSpec { reason, .. } => Error::invalid_spec(token, reason),
            other => other,
        })
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Describes the set of addresses a pool is built from
///
/// Two specs are equal when they describe the same block or the same ordered list of
/// ranges. CIDR blocks are stored truncated to their network address, so `10.0.0.7/24`
/// and `10.0.0.0/24` are the same spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolSpec {
    /// A single CIDR block
    Cidr(IpNet),
    /// An ordered list of inclusive ranges
    Ranges(Vec<AddressRange>),
}

impl PoolSpec {
    /// Expand this spec into its ordered, de-duplicated list of addresses
    pub fn expand(&self) -> Result<Vec<IpAddr>> {
        match self {
            Self::Cidr(net) => crate::enumerate::expand_net(*net),
            Self::Ranges(ranges) => crate::enumerate::expand_address_ranges(ranges),
        }
    }
}

impl FromStr for PoolSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::invalid_spec(s, "empty pool specification"));
        }

        // IP addresses never contain a dash, so its presence marks a range list
        if s.contains('-') {
            return s
                .split(',')
                .map(|token| {
                    if token.trim().is_empty() {
                        Err(Error::invalid_spec(s, "empty range in range list"))
                    } else {
                        token.parse::<AddressRange>()
                    }
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Ranges);
        }

        s.parse::<IpNet>()
            .map(|net| Self::Cidr(net.trunc()))
            .map_err(|err| Error::invalid_spec(s, err.to_string()))
    }
}

impl fmt::Display for PoolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cidr(net) => write!(f, "{net}"),
            Self::Ranges(ranges) => {
                for (idx, range) in ranges.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{range}")?;
                }
                Ok(())
            }
        }
    }
}

/// Converts an address into an integer that orders the same way
fn addr_to_bits(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(addr) => u128::from(u32::from(addr)),
        IpAddr::V6(addr) => u128::from(addr),
    }
}

#![doc = include_str!("../README.md")]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod allocator;
mod enumerate;
mod error;
mod pool;
mod registry;
mod spec;

pub use allocator::AddressAllocator;
pub use enumerate::{expand_cidr, expand_ranges, MAX_POOL_ADDRESSES};
pub use error::{Error, Result};
pub use pool::PoolStats;
pub use registry::PoolRegistry;
pub use spec::{AddressRange, PoolSpec};

//! Error types for this library

use std::net::IpAddr;

/// All possible errors returned by `vip-ipam` operations
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("Invalid pool specification {token:?}: {reason}")]
    InvalidPoolSpec { token: String, reason: String },
    #[error("Address pool exhausted. All {0} addresses are leased")]
    AddressPoolExhausted(usize),
    #[error("No address pool exists for namespace {0:?}")]
    UnknownNamespace(String),
    #[error("Address {0} does not belong to the pool")]
    UnknownAddress(IpAddr),
    #[error("Address {0} is already leased")]
    AddressAlreadyLeased(IpAddr),
}

impl Error {
    /// Shorthand for building an [`Error::InvalidPoolSpec`]
    pub(crate) fn invalid_spec(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPoolSpec {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors a releasing caller can treat as "already released"
    #[must_use]
    pub fn is_benign_release(&self) -> bool {
        matches!(self, Self::UnknownNamespace(_) | Self::UnknownAddress(_))
    }
}

/// Result type for `vip-ipam`
pub type Result<T> = std::result::Result<T, Error>;

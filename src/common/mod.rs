//! Common code used by the vipam binary

pub mod ledger;
pub mod logging;
pub mod reconcile;

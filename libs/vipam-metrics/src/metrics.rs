use lazy_static::lazy_static;

pub mod label_values {
    /// The operation succeeded
    pub const STATUS_OK: &str = "ok";
    /// The pool specification could not be parsed or expanded
    pub const STATUS_INVALID_SPEC: &str = "invalid_spec";
    /// Every address in the pool was leased
    pub const STATUS_EXHAUSTED: &str = "exhausted";
    /// The namespace had no pool
    pub const STATUS_UNKNOWN_NAMESPACE: &str = "unknown_namespace";
    /// The address was not part of the pool
    pub const STATUS_UNKNOWN_ADDRESS: &str = "unknown_address";
    /// The address was already leased
    pub const STATUS_ALREADY_LEASED: &str = "already_leased";
}

lazy_static! {
    /// Counter for address pool operations and their outcome
    pub static ref ADDRESS_OPERATIONS: prometheus::IntCounterVec = prometheus::register_int_counter_vec!(
        "vipam_address_operations",
        "Number of address pool operations performed",
        &["operation", "status"]
    ).unwrap();

    /// Counter for pools rebuilt after their spec changed
    pub static ref POOL_REBUILDS: prometheus::IntCounter = prometheus::register_int_counter!(
        "vipam_pool_rebuilds",
        "Number of times a pool was rebuilt from a changed spec"
    ).unwrap();

    /// Number of leased addresses per namespace
    ///
    /// Holds one series per namespace that ever owned a pool. Series are never removed,
    /// which is fine for a fixed set of namespaces but grows with namespace churn.
    pub static ref LEASED_ADDRESSES: prometheus::IntGaugeVec = prometheus::register_int_gauge_vec!(
        "vipam_leased_addresses",
        "Number of addresses currently leased",
        &["namespace"]
    ).unwrap();
}

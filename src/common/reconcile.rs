//! Bringing a service ledger in line with an address pool

use std::sync::Arc;

use vip_ipam::{AddressAllocator, Error, PoolSpec};

use super::ledger::ServiceLedger;

/// What a reconcile pass should do
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Namespace the pool belongs to
    pub namespace: String,
    /// CIDR block or range list to allocate from
    pub pool: String,
    /// UIDs of services that have been deleted
    pub deletions: Vec<String>,
}

/// Counts of what a reconcile pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// VIPs carried over from the ledger
    pub restored: usize,
    /// VIPs taken back from deleted services
    pub released: usize,
    /// VIPs newly handed out
    pub allocated: usize,
    /// Services still without a VIP
    pub failed: usize,
}

/// Reconcile `ledger` against the pool described by `options`
///
/// Existing VIPs are claimed first, then deleted services give theirs back, then every
/// service without a VIP gets one. Allocations run as one task per service. Only a bad
/// pool spec aborts the pass; every other failure is logged and counted.
pub async fn reconcile(
    allocator: Arc<AddressAllocator>,
    ledger: &mut ServiceLedger,
    options: &ReconcileOptions,
) -> Result<ReconcileReport, Error> {
    let spec: Arc<PoolSpec> = Arc::new(options.pool.parse()?);
    let namespace: Arc<str> = Arc::from(options.namespace.as_str());
    let mut report = ReconcileReport::default();

    // Restore the leases recorded in the ledger
    for service in &mut ledger.services {
        let Some(vip) = service.vip else {
            continue;
        };
        match allocator.claim_from(&namespace, &spec, vip) {
            Ok(()) => report.restored += 1,
            Err(err @ (Error::UnknownAddress(_) | Error::AddressAlreadyLeased(_))) => {
                log::warn!(
                    "Service '{}' ({}) loses VIP {}: {}",
                    service.service_name,
                    service.uid,
                    vip,
                    err
                );
                service.vip = None;
            }
            Err(err) => return Err(err),
        }
    }

    // Tear down deleted services
    for uid in &options.deletions {
        let Some(service) = ledger.remove_by_uid(uid) else {
            log::warn!("Unable to find service {} in the ledger", uid);
            continue;
        };
        log::info!("Deleting service '{}' ({})", service.service_name, service.uid);

        let Some(vip) = service.vip else {
            continue;
        };
        match allocator.release_address(&namespace, vip) {
            Ok(()) => report.released += 1,
            Err(err) if err.is_benign_release() => {
                log::debug!("VIP {} was already released: {}", vip, err);
            }
            Err(err) => log::error!("Failed to release VIP {}: {}", vip, err),
        }
    }

    // Hand out VIPs to everything still missing one
    let handles: Vec<_> = ledger
        .services
        .iter()
        .enumerate()
        .filter(|(_, service)| service.vip.is_none())
        .map(|(idx, _)| {
            let allocator = Arc::clone(&allocator);
            let namespace = Arc::clone(&namespace);
            let spec = Arc::clone(&spec);
            tokio::spawn(async move { (idx, allocator.allocate_from(&namespace, &spec)) })
        })
        .collect();

    for handle in handles {
        match handle.await {
            Ok((idx, Ok(vip))) => {
                let service = &mut ledger.services[idx];
                log::info!(
                    "Syncing service '{}' ({}) with vip: {}",
                    service.service_name,
                    service.uid,
                    vip
                );
                service.vip = Some(vip);
                report.allocated += 1;
            }
            Ok((idx, Err(err))) => {
                let service = &ledger.services[idx];
                log::error!(
                    "Unable to allocate a VIP for service '{}' ({}): {}",
                    service.service_name,
                    service.uid,
                    err
                );
                report.failed += 1;
            }
            Err(err) => {
                log::error!("Allocation task failed: {}", err);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

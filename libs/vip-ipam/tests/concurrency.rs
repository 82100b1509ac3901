use std::{collections::HashSet, net::IpAddr, sync::Barrier, thread};

use vip_ipam::{AddressAllocator, Error, PoolSpec};

const WORKERS: usize = 16;
const PER_WORKER: usize = 32;

#[test]
fn test_concurrent_allocations_are_distinct() {
    let allocator = AddressAllocator::new();
    let barrier = Barrier::new(WORKERS);

    let leased: Vec<IpAddr> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    (0..PER_WORKER)
                        .map(|_| allocator.allocate_address("default", "10.1.0.0/22").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(leased.len(), WORKERS * PER_WORKER);
    let unique: HashSet<_> = leased.iter().collect();
    assert_eq!(unique.len(), leased.len());
    assert_eq!(
        allocator.pool_stats("default").unwrap().leased,
        WORKERS * PER_WORKER
    );
}

#[test]
fn test_concurrent_exhaustion_hands_out_every_address_once() {
    let allocator = AddressAllocator::new();
    let spec = "192.168.50.1-192.168.50.40";

    let (leased, exhausted) = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                scope.spawn(|| {
                    let mut leased = Vec::new();
                    let mut exhausted = 0usize;
                    for _ in 0..5 {
                        match allocator.allocate_address("default", spec) {
                            Ok(addr) => leased.push(addr),
                            Err(Error::AddressPoolExhausted(40)) => exhausted += 1,
                            Err(err) => panic!("unexpected error: {err}"),
                        }
                    }
                    (leased, exhausted)
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).fold(
            (Vec::new(), 0),
            |(mut all, total), (leased, exhausted)| {
                all.extend(leased);
                (all, total + exhausted)
            },
        )
    });

    assert_eq!(leased.len(), 40);
    assert_eq!(exhausted, WORKERS * 5 - 40);
    assert_eq!(leased.iter().collect::<HashSet<_>>().len(), 40);
}

#[test]
fn test_concurrent_allocate_and_release() {
    let allocator = AddressAllocator::new();
    let spec = "10.2.0.0/28";

    thread::scope(|scope| {
        for _ in 0..WORKERS {
            scope.spawn(|| {
                for _ in 0..200 {
                    // 14 usable addresses for 16 workers, so some attempts will find the pool full
                    if let Ok(addr) = allocator.allocate_address("default", spec) {
                        allocator.release_address("default", addr).unwrap();
                    }
                }
            });
        }
    });

    let stats = allocator.pool_stats("default").unwrap();
    assert_eq!(stats.size, 14);
    assert_eq!(stats.leased, 0);
}

#[test]
fn test_concurrent_rebuilds_never_expose_partial_pools() {
    let allocator = AddressAllocator::new();
    let barrier = Barrier::new(WORKERS);
    // Both specs share 10.3.0.101-10.3.0.200 but start with a block the other lacks, so
    // the first free address always shows which spec the serving pool was built from
    let specs = [
        "10.3.0.1-10.3.0.200",
        "10.3.1.0-10.3.1.99,10.3.0.101-10.3.0.200",
    ];
    let heads: [PoolSpec; 2] = [
        "10.3.0.1-10.3.0.100".parse().unwrap(),
        "10.3.1.0-10.3.1.99".parse().unwrap(),
    ];
    let heads: Vec<HashSet<IpAddr>> = heads
        .iter()
        .map(|head| head.expand().unwrap().into_iter().collect())
        .collect();

    let per_spec: Vec<(usize, Vec<IpAddr>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let allocator = &allocator;
                let barrier = &barrier;
                let which = worker % specs.len();
                let spec = specs[which];
                scope.spawn(move || {
                    barrier.wait();
                    let leased = (0..4)
                        .map(|_| allocator.allocate_address("default", spec).unwrap())
                        .collect::<Vec<_>>();
                    (which, leased)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    // Every lease came from a pool built from the caller's own spec
    for (which, leased) in &per_spec {
        assert!(
            leased.iter().all(|addr| heads[*which].contains(addr)),
            "{:?} not drawn from {}",
            leased,
            specs[*which]
        );
    }
    let issued: HashSet<IpAddr> = per_spec
        .iter()
        .flat_map(|(_, leased)| leased.iter().copied())
        .collect();
    assert!(heads.iter().all(|head| !head.is_disjoint(&issued)));

    // Rebuilds forget leases that fall outside the new spec, so an address may have been
    // handed out twice. The surviving leases must still be distinct and consistent.
    let stats = allocator.pool_stats("default").unwrap();
    let universe = stats.spec.expand().unwrap();
    let current = allocator.leases("default").unwrap();
    assert_eq!(stats.leased, current.len());
    assert_eq!(current.iter().collect::<HashSet<_>>().len(), current.len());
    assert!(current.iter().all(|addr| universe.contains(addr)));
    assert!(current.iter().all(|addr| issued.contains(addr)));
    assert!(specs.contains(&stats.spec.to_string().as_str()));
}

#[test]
fn test_namespaces_do_not_share_leases() {
    let allocator = AddressAllocator::new();
    let spec = "172.16.0.1-172.16.0.8";

    let per_namespace: Vec<Vec<IpAddr>> = thread::scope(|scope| {
        let handles: Vec<_> = ["red", "green", "blue"]
            .into_iter()
            .map(|namespace| {
                let allocator = &allocator;
                scope.spawn(move || {
                    (0..8)
                        .map(|_| allocator.allocate_address(namespace, spec).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    for leased in &per_namespace {
        assert_eq!(leased, &per_namespace[0]);
    }
    assert_eq!(allocator.namespaces(), vec!["blue", "green", "red"]);
}

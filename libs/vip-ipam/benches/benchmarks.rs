use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use vip_ipam::{expand_cidr, expand_ranges, AddressAllocator};

/// Expand a /16 into its usable hosts
fn bench_expand_cidr(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");
    group.throughput(criterion::Throughput::Elements(65_534));
    group.bench_function("cidr_16", |b| b.iter(|| expand_cidr("10.0.0.0/16")));
    group.finish();
}

/// Expand a list of overlapping ranges
fn bench_expand_ranges(c: &mut Criterion) {
    let spec = "10.0.0.0-10.0.3.255,10.0.2.0-10.0.5.255,10.0.4.0-10.0.7.255";
    c.bench_function("expand/ranges_overlapping", |b| {
        b.iter(|| expand_ranges(spec))
    });
}

/// Allocate the last free address of a mostly-leased pool, which is the worst case for
/// the linear scan
fn bench_allocate_near_full(c: &mut Criterion) {
    let spec = "10.0.0.0/20";
    c.bench_function("allocate/near_full_20", |b| {
        b.iter_batched(
            || {
                let allocator = AddressAllocator::new();
                for _ in 0..4092 {
                    allocator.allocate_address("default", spec).unwrap();
                }
                allocator
            },
            |allocator| allocator.allocate_address("default", spec),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_expand_cidr,
    bench_expand_ranges,
    bench_allocate_near_full
);
criterion_main!(benches);

//! Benchmarks for the attach and detach protocols
//!
//! Measures performance of:
//! - Joining a large network through one edge
//! - Absorbing an unattached cluster
//! - Removing leaves and interior nodes
//! - Rebuilding a network on reload

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use lattice_net::{load_region, place, remove, unload_region, BlockPos, MemoryWorld, NodeKind};

/// A coordinator at the origin with a `side` x `side` plane of nodes beside it
fn plane(side: i32) -> MemoryWorld {
    let mut world = MemoryWorld::new();
    place(&mut world, BlockPos::new(-1, 0, 0), NodeKind::Coordinator).unwrap();
    for x in 0..side {
        for z in 0..side {
            place(&mut world, BlockPos::new(x, 0, z), NodeKind::Node).unwrap();
        }
    }
    world
}

/// Benchmark a single-edge join onto networks of growing size
fn bench_single_edge_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_edge_join");

    for &side in &[8, 32, 128] {
        let world = plane(side);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &world, |b, world| {
            b.iter_batched(
                || world.clone(),
                |mut world| place(&mut world, black_box(BlockPos::new(side / 2, 1, side / 2)), NodeKind::Node),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

/// Benchmark a coordinator absorbing an unattached plane
fn bench_absorb(c: &mut Criterion) {
    let mut group = c.benchmark_group("absorb");

    for &side in &[8, 32, 64] {
        let mut world = MemoryWorld::new();
        for x in 0..side {
            for z in 0..side {
                place(&mut world, BlockPos::new(x, 0, z), NodeKind::Node).unwrap();
            }
        }
        group.throughput(Throughput::Elements((side * side) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &world, |b, world| {
            b.iter_batched(
                || world.clone(),
                |mut world| place(&mut world, BlockPos::new(-1, 0, 0), NodeKind::Coordinator),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

/// Benchmark removals: the far corner is a leaf, the centre splits the tree
fn bench_detach(c: &mut Criterion) {
    let mut group = c.benchmark_group("detach");

    for &side in &[8, 32, 64] {
        let world = plane(side);
        let corner = BlockPos::new(side - 1, 0, side - 1);
        let centre = BlockPos::new(side / 2, 0, side / 2);

        group.bench_with_input(BenchmarkId::new("corner", side * side), &world, |b, world| {
            b.iter_batched(
                || world.clone(),
                |mut world| remove(&mut world, black_box(corner)),
                BatchSize::LargeInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("centre", side * side), &world, |b, world| {
            b.iter_batched(
                || world.clone(),
                |mut world| remove(&mut world, black_box(centre)),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

/// Benchmark unloading and reloading a whole network
fn bench_reload(c: &mut Criterion) {
    let mut group = c.benchmark_group("reload");

    for &side in &[8, 32] {
        let mut world = plane(side);
        let positions = world.positions();
        let records = unload_region(&mut world, &positions).unwrap();

        group.throughput(Throughput::Elements(records.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(records.len()), &records, |b, records| {
            b.iter(|| {
                let mut world = MemoryWorld::new();
                load_region(&mut world, black_box(records)).unwrap();
                world
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_single_edge_join,
    bench_absorb,
    bench_detach,
    bench_reload,
);

criterion_main!(benches);

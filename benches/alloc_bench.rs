//! Benchmarks of the allocator's own hot paths: tail splits, the backward
//! coalescing sweep, first-fit scans over a fragmented free list, the
//! idle-span retention cycle, and in-place growth. Every iteration drives a
//! private heap, so results are independent of the process allocator and of
//! other benchmark state.

use btmalloc::heap::Heap;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

/// Allocate `count` blocks (each splitting the span's tail block), then
/// free them lowest address first so every free after the first merges
/// backward into the growing free run.
fn split_then_sweep(count: usize, size: usize) {
    let mut heap = Heap::new();
    let mut ptrs: Vec<*mut u8> = (0..count).map(|_| unsafe { heap.allocate(size) }).collect();
    ptrs.sort_unstable_by_key(|&p| p as usize);
    for p in ptrs {
        unsafe { heap.deallocate(p) };
    }
    unsafe { heap.unmap_all() };
}

/// Punch `holes` small free blocks into a span (free every other block),
/// then serve a request none of them fits: the search has to walk the
/// whole fragmented free list before reaching the big tail block.
fn first_fit_over_fragments(holes: usize) {
    let mut heap = Heap::new();
    let ptrs: Vec<*mut u8> = (0..holes * 2).map(|_| unsafe { heap.allocate(96) }).collect();
    for pair in ptrs.chunks(2) {
        unsafe { heap.deallocate(pair[0]) };
    }
    unsafe {
        let p = heap.allocate(4096);
        heap.deallocate(black_box(p));
    }
    for pair in ptrs.chunks(2) {
        unsafe { heap.deallocate(pair[1]) };
    }
    unsafe { heap.unmap_all() };
}

/// One allocate/free round of a span-sized object. After warmup the
/// emptied span is the retained idle one, so the round is pure
/// bookkeeping with no OS traffic.
fn retention_round(heap: &mut Heap, size: usize) {
    unsafe {
        let p = heap.allocate(size);
        heap.deallocate(black_box(p));
    }
}

/// Grow one allocation step by step. The first growth moves the block;
/// after that its old storage sits freed right above, so the grows
/// alternate between absorbing a neighbor and relocating.
fn grow_ladder() {
    let mut heap = Heap::new();
    unsafe {
        let mut p = heap.allocate(64);
        for size in (256..8192).step_by(256) {
            p = heap.reallocate(p, size);
        }
        heap.deallocate(p);
        heap.unmap_all();
    }
}

fn bench_split_then_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_then_sweep");
    for &count in &[32usize, 128, 512] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| split_then_sweep(black_box(count), 96));
        });
    }
    group.finish();
}

fn bench_first_fit_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_fit_scan");
    for &holes in &[16usize, 64, 192] {
        group.bench_with_input(BenchmarkId::from_parameter(holes), &holes, |b, &holes| {
            b.iter(|| first_fit_over_fragments(black_box(holes)));
        });
    }
    group.finish();
}

fn bench_retention_cycle(c: &mut Criterion) {
    let mut heap = Heap::new();
    // first round maps the span that retention then keeps alive
    retention_round(&mut heap, 65000);
    c.bench_function("retention_cycle", |b| {
        b.iter(|| retention_round(&mut heap, black_box(65000)));
    });
    unsafe { heap.unmap_all() };
}

fn bench_grow_ladder(c: &mut Criterion) {
    c.bench_function("grow_ladder", |b| b.iter(grow_ladder));
}

criterion_group!(
    benches,
    bench_split_then_sweep,
    bench_first_fit_scan,
    bench_retention_cycle,
    bench_grow_ladder
);
criterion_main!(benches);

//! Allocation statistics counters.
//!
//! All counters use `Relaxed` ordering — they are observational only, never
//! synchronization. Recording is compiled out entirely unless the crate is
//! built with `feature = "stats"`; the counters themselves always exist so
//! [`snapshot`] stays callable (it reports zeros when recording is off).
//!
//! # Usage
//!
//! ```ignore
//! let snap = btmalloc::stats::snapshot();
//! println!("allocs: {}", snap.alloc_count);
//! ```

use core::sync::atomic::{AtomicU64, Ordering};

pub(crate) struct Stats {
    // ---- Entry points ----
    /// Calls to allocate (including those that return null).
    pub alloc_count: AtomicU64,
    /// Calls to free, null included.
    pub free_count: AtomicU64,
    /// Calls to the zeroing allocate.
    pub zero_alloc_count: AtomicU64,
    /// Calls to resize.
    pub realloc_count: AtomicU64,
    /// Sum of all requested byte sizes passed to allocate.
    pub alloc_bytes: AtomicU64,

    // ---- Span lifecycle / OS ----
    /// Spans mapped from the OS.
    pub os_map_count: AtomicU64,
    /// Bytes mapped from the OS.
    pub os_map_bytes: AtomicU64,
    /// Spans returned to the OS.
    pub os_unmap_count: AtomicU64,
    /// Bytes returned to the OS.
    pub os_unmap_bytes: AtomicU64,
    /// Frees that emptied a span but kept it mapped (retention policy).
    pub spans_retained: AtomicU64,

    // ---- Block bookkeeping ----
    /// Allocations served by splitting the tail off a larger free block.
    pub block_splits: AtomicU64,
    /// Merges of two physically-adjacent free blocks.
    pub block_coalesces: AtomicU64,
}

impl Stats {
    const fn new() -> Self {
        Self {
            alloc_count: AtomicU64::new(0),
            free_count: AtomicU64::new(0),
            zero_alloc_count: AtomicU64::new(0),
            realloc_count: AtomicU64::new(0),
            alloc_bytes: AtomicU64::new(0),
            os_map_count: AtomicU64::new(0),
            os_map_bytes: AtomicU64::new(0),
            os_unmap_count: AtomicU64::new(0),
            os_unmap_bytes: AtomicU64::new(0),
            spans_retained: AtomicU64::new(0),
            block_splits: AtomicU64::new(0),
            block_coalesces: AtomicU64::new(0),
        }
    }
}

pub(crate) static STATS: Stats = Stats::new();

/// A point-in-time copy of all counters.
///
/// Fields are loaded individually with `Relaxed` ordering; the snapshot as
/// a whole is not globally consistent, which is always sufficient for
/// monitoring.
#[derive(Clone, Copy, Debug, Default)]
pub struct Snapshot {
    /// Calls to allocate (including those that return null).
    pub alloc_count: u64,
    /// Calls to free, null included.
    pub free_count: u64,
    /// Calls to the zeroing allocate.
    pub zero_alloc_count: u64,
    /// Calls to resize.
    pub realloc_count: u64,
    /// Sum of all requested byte sizes passed to allocate.
    pub alloc_bytes: u64,
    /// Spans mapped from the OS.
    pub os_map_count: u64,
    /// Bytes mapped from the OS.
    pub os_map_bytes: u64,
    /// Spans returned to the OS.
    pub os_unmap_count: u64,
    /// Bytes returned to the OS.
    pub os_unmap_bytes: u64,
    /// Frees that emptied a span but kept it mapped.
    pub spans_retained: u64,
    /// Allocations served by splitting a larger free block.
    pub block_splits: u64,
    /// Merges of two physically-adjacent free blocks.
    pub block_coalesces: u64,
}

/// Load every counter and return a [`Snapshot`].
pub fn snapshot() -> Snapshot {
    let s = &STATS;
    Snapshot {
        alloc_count: s.alloc_count.load(Ordering::Relaxed),
        free_count: s.free_count.load(Ordering::Relaxed),
        zero_alloc_count: s.zero_alloc_count.load(Ordering::Relaxed),
        realloc_count: s.realloc_count.load(Ordering::Relaxed),
        alloc_bytes: s.alloc_bytes.load(Ordering::Relaxed),
        os_map_count: s.os_map_count.load(Ordering::Relaxed),
        os_map_bytes: s.os_map_bytes.load(Ordering::Relaxed),
        os_unmap_count: s.os_unmap_count.load(Ordering::Relaxed),
        os_unmap_bytes: s.os_unmap_bytes.load(Ordering::Relaxed),
        spans_retained: s.spans_retained.load(Ordering::Relaxed),
        block_splits: s.block_splits.load(Ordering::Relaxed),
        block_coalesces: s.block_coalesces.load(Ordering::Relaxed),
    }
}

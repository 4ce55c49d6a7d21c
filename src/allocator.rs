//! Process-wide allocator façade.
//!
//! The heap core is single-threaded by design. This module owns the one
//! process-wide [`Heap`] behind a [`SpinMutex`] so it can back
//! [`GlobalAlloc`] and the C entry points; the lock serializes whole
//! operations, there are no finer-grained fast paths.

use crate::heap::Heap;
use crate::layout::ALIGNMENT;
use crate::sync::SpinMutex;
use crate::stat;
use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

static HEAP: SpinMutex<Heap> = SpinMutex::new(Heap::new());

/// Allocate `n` bytes, 16-byte aligned. Null when `n == 0` or the OS is out
/// of memory.
pub unsafe fn allocate(n: usize) -> *mut u8 {
    stat!(alloc_count);
    stat!(alloc_bytes, n);
    unsafe { HEAP.lock().allocate(n) }
}

/// Release a payload previously returned by this allocator. Null is a
/// no-op; anything else must be live and unfreed.
pub unsafe fn deallocate(p: *mut u8) {
    stat!(free_count);
    unsafe { HEAP.lock().deallocate(p) }
}

/// Allocate `count * size` bytes, zeroed. Null on overflow or exhaustion.
pub unsafe fn allocate_zeroed(count: usize, size: usize) -> *mut u8 {
    stat!(zero_alloc_count);
    unsafe { HEAP.lock().allocate_zeroed(count, size) }
}

/// Resize the allocation at `p` to `n` bytes; `p` may be null, in which
/// case this allocates. On failure null is returned and the original
/// allocation stays valid.
pub unsafe fn reallocate(p: *mut u8, n: usize) -> *mut u8 {
    stat!(realloc_count);
    unsafe { HEAP.lock().reallocate(p, n) }
}

/// Whether `p` points into memory this allocator issued. Pointers failing
/// this are foreign; an interposition shim should hand their frees to the
/// allocator that actually issued them.
pub fn owns(p: *const u8) -> bool {
    HEAP.lock().owns(p)
}

/// First-fit boundary-tag allocator.
///
/// Register as the global allocator with:
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: btmalloc::BtMalloc = btmalloc::BtMalloc;
/// ```
///
/// Payloads are aligned to 16 bytes and no further: requests with a
/// stricter alignment fail to null.
pub struct BtMalloc;

unsafe impl GlobalAlloc for BtMalloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() == 0 {
            return layout.align() as *mut u8;
        }
        if layout.align() > ALIGNMENT {
            return ptr::null_mut();
        }
        unsafe { allocate(layout.size()) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        unsafe { deallocate(ptr) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.size() == 0 {
            return layout.align() as *mut u8;
        }
        if layout.align() > ALIGNMENT {
            return ptr::null_mut();
        }
        unsafe { allocate_zeroed(layout.size(), 1) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > ALIGNMENT {
            return ptr::null_mut();
        }
        if layout.size() == 0 {
            // the old "allocation" was a dangling zero-size pointer
            let new_layout = unsafe { Layout::from_size_align_unchecked(new_size, layout.align()) };
            return unsafe { GlobalAlloc::alloc(self, new_layout) };
        }
        if new_size == 0 {
            unsafe { deallocate(ptr) };
            return layout.align() as *mut u8;
        }
        unsafe { reallocate(ptr, new_size) }
    }
}

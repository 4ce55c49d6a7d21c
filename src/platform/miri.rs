//! Miri-compatible page provider backed by the system allocator.
//!
//! Miri can't execute real OS syscalls (mmap/VirtualAlloc), so the system
//! allocator provides page-aligned, zeroed memory instead. This lets Miri
//! check the unsafe pointer logic in the heap core.

extern crate alloc;

use core::alloc::Layout;

const PAGE_ALIGN: usize = 4096;

pub unsafe fn page_alloc(size: usize) -> *mut u8 {
    let layout = Layout::from_size_align(size, PAGE_ALIGN).unwrap();
    unsafe { alloc::alloc::alloc_zeroed(layout) }
}

pub unsafe fn page_dealloc(ptr: *mut u8, size: usize) {
    let layout = Layout::from_size_align(size, PAGE_ALIGN).unwrap();
    unsafe { alloc::alloc::dealloc(ptr, layout) };
}

pub fn page_size() -> usize {
    PAGE_ALIGN
}

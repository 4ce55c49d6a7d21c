//! OS page provider.
//!
//! Wraps the platform's anonymous-mapping primitive: `page_alloc` /
//! `page_dealloc` (mmap/munmap on Unix, VirtualAlloc/VirtualFree on
//! Windows) plus the system page size query. Under Miri the system
//! allocator stands in, since Miri cannot execute real syscalls.

cfg_if::cfg_if! {
    if #[cfg(miri)] {
        mod miri;
        use miri as imp;
    } else if #[cfg(windows)] {
        mod windows;
        use windows as imp;
    } else if #[cfg(unix)] {
        mod unix;
        use unix as imp;
    }
}

/// Map `size` bytes of zero-initialized, readable and writable memory.
/// `size` must be a multiple of [`page_size()`]. The result is
/// page-aligned, or null on failure.
///
/// # Safety
///
/// Caller must eventually call [`page_dealloc`] with the returned pointer
/// and the same `size`.
#[inline]
pub unsafe fn page_alloc(size: usize) -> *mut u8 {
    unsafe { imp::page_alloc(size) }
}

/// Unmap a region previously mapped by [`page_alloc`].
///
/// # Safety
///
/// `ptr` must come from `page_alloc` and `size` must match the original
/// request; the region must not be touched afterwards.
#[inline]
pub unsafe fn page_dealloc(ptr: *mut u8, size: usize) {
    unsafe { imp::page_dealloc(ptr, size) }
}

/// The system page size.
#[inline]
pub fn page_size() -> usize {
    imp::page_size()
}

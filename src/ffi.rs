//! C-ABI entry points.
//!
//! Gated behind `feature = "ffi"`. With `feature = "c-abi"` the standard
//! allocation names are exported as well, so a build can link this library
//! in place of the system allocator (compile-time interposition).
//!
//! A free or resize of a pointer this allocator never issued is detected by
//! address range and left alone; routing such pointers to the allocator
//! that did issue them is the business of an interposing shim, which can
//! ask via [`btmalloc_owns`].

use crate::allocator;

#[unsafe(no_mangle)]
pub unsafe extern "C" fn btmalloc_malloc(size: usize) -> *mut u8 {
    unsafe { allocator::allocate(size) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn btmalloc_free(ptr: *mut u8) {
    if !ptr.is_null() && !allocator::owns(ptr) {
        return;
    }
    unsafe { allocator::deallocate(ptr) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn btmalloc_calloc(count: usize, size: usize) -> *mut u8 {
    unsafe { allocator::allocate_zeroed(count, size) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn btmalloc_realloc(ptr: *mut u8, new_size: usize) -> *mut u8 {
    if !ptr.is_null() && !allocator::owns(ptr) {
        return core::ptr::null_mut();
    }
    unsafe { allocator::reallocate(ptr, new_size) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn btmalloc_owns(ptr: *const u8) -> bool {
    allocator::owns(ptr)
}

#[cfg(feature = "c-abi")]
mod interpose {
    #[unsafe(export_name = "malloc")]
    pub unsafe extern "C" fn interposed_malloc(size: usize) -> *mut u8 {
        unsafe { super::btmalloc_malloc(size) }
    }

    #[unsafe(export_name = "free")]
    pub unsafe extern "C" fn interposed_free(ptr: *mut u8) {
        unsafe { super::btmalloc_free(ptr) }
    }

    #[unsafe(export_name = "calloc")]
    pub unsafe extern "C" fn interposed_calloc(count: usize, size: usize) -> *mut u8 {
        unsafe { super::btmalloc_calloc(count, size) }
    }

    #[unsafe(export_name = "realloc")]
    pub unsafe extern "C" fn interposed_realloc(ptr: *mut u8, new_size: usize) -> *mut u8 {
        unsafe { super::btmalloc_realloc(ptr, new_size) }
    }
}

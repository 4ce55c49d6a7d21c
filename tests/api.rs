//! Behavior of the public allocation surface: alignment guarantees, null
//! and zero-size conventions, ownership queries, and resize semantics that
//! hold regardless of heap layout.

use btmalloc::BtMalloc;
use std::alloc::{GlobalAlloc, Layout};

#[global_allocator]
static GLOBAL: BtMalloc = BtMalloc;

#[test]
fn test_payloads_are_16_byte_aligned() {
    for &size in &[1, 7, 8, 15, 16, 31, 64, 255, 256, 1024, 4096, 100_000] {
        let p = unsafe { btmalloc::allocate(size) };
        assert!(!p.is_null(), "alloc failed: size={size}");
        assert_eq!(p as usize % 16, 0, "misaligned: ptr={p:?}, size={size}");
        unsafe { p.write_bytes(0xAB, size) };
        unsafe { btmalloc::deallocate(p) };
    }
}

#[test]
fn test_alloc_zero_bytes_is_null() {
    assert!(unsafe { btmalloc::allocate(0) }.is_null());
}

#[test]
fn test_free_null_is_noop() {
    unsafe { btmalloc::deallocate(std::ptr::null_mut()) };
}

#[test]
fn test_over_aligned_layouts_are_refused() {
    for align in [32, 64, 256, 4096] {
        let layout = Layout::from_size_align(align, align).unwrap();
        let p = unsafe { GLOBAL.alloc(layout) };
        assert!(p.is_null(), "align {align} should not be served");
    }
}

#[test]
fn test_zero_size_layout_round_trip() {
    let layout = Layout::from_size_align(0, 8).unwrap();
    let p = unsafe { GLOBAL.alloc(layout) };
    assert!(!p.is_null(), "zero-size allocations get a dangling pointer");
    unsafe { GLOBAL.dealloc(p, layout) };
}

#[test]
fn test_zeroed_allocation_is_zeroed() {
    let p = unsafe { btmalloc::allocate_zeroed(64, 32) };
    assert!(!p.is_null());
    for i in 0..64 * 32 {
        assert_eq!(unsafe { *p.add(i) }, 0);
    }
    unsafe { btmalloc::deallocate(p) };
}

#[test]
fn test_zeroed_allocation_overflow_is_null() {
    assert!(unsafe { btmalloc::allocate_zeroed(usize::MAX, 2) }.is_null());
}

#[test]
fn test_resize_preserves_contents_across_growth() {
    let mut p = unsafe { btmalloc::allocate(100) };
    assert!(!p.is_null());
    for i in 0..100 {
        unsafe { *p.add(i) = i as u8 };
    }
    for &size in &[500, 5000, 200_000] {
        p = unsafe { btmalloc::reallocate(p, size) };
        assert!(!p.is_null(), "grow to {size} failed");
        assert_eq!(p as usize % 16, 0);
        for i in 0..100 {
            assert_eq!(unsafe { *p.add(i) }, i as u8, "lost byte {i} at size {size}");
        }
    }
    unsafe { btmalloc::deallocate(p) };
}

#[test]
fn test_resize_null_allocates() {
    let p = unsafe { btmalloc::reallocate(std::ptr::null_mut(), 256) };
    assert!(!p.is_null());
    unsafe { btmalloc::deallocate(p) };
}

#[test]
fn test_resize_to_zero_keeps_pointer() {
    let p = unsafe { btmalloc::allocate(1000) };
    let q = unsafe { btmalloc::reallocate(p, 0) };
    assert_eq!(q, p);
    unsafe { btmalloc::deallocate(p) };
}

#[test]
fn test_owns_distinguishes_foreign_pointers() {
    let p = unsafe { btmalloc::allocate(64) };
    assert!(btmalloc::owns(p));

    let stack_byte = 0u8;
    assert!(!btmalloc::owns(&stack_byte));
    assert!(!btmalloc::owns(std::ptr::null()));

    static FOREIGN: [u8; 64] = [0; 64];
    assert!(!btmalloc::owns(FOREIGN.as_ptr()));

    unsafe { btmalloc::deallocate(p) };
}

//! Spans: contiguous OS-mapped page runs that hold blocks.
//!
//! The first 32 bytes of a mapped region form the span header; everything
//! after is block storage. Spans link into one process-wide doubly-linked
//! list, newest first, and each span keeps its own free-block list, most
//! recently freed first and in no other particular order.

use crate::block::Block;
use crate::layout::SPAN_HEADER_SIZE;
use core::ptr;

/// Span header, living at the base of the mapped region.
///
/// `size` and `live_blocks` are 32-bit so the header fits its 32-byte slot
/// on 64-bit targets; spans are capped below 4 GiB.
#[repr(C)]
pub struct Span {
    size: u32,
    live_blocks: u32,
    /// Neighbors in the process-wide span list.
    pub prev: *mut Span,
    pub next: *mut Span,
    /// Head of this span's free-block list.
    pub free: *mut Block,
}

const _: () = assert!(core::mem::size_of::<Span>() == SPAN_HEADER_SIZE);

impl Span {
    /// Total mapped bytes, header included.
    #[inline]
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Number of blocks currently handed out from this span.
    #[inline]
    pub fn live_blocks(&self) -> usize {
        self.live_blocks as usize
    }

    #[inline]
    pub(crate) fn inc_live(&mut self) {
        self.live_blocks += 1;
    }

    #[inline]
    pub(crate) fn dec_live(&mut self) {
        debug_assert!(self.live_blocks > 0);
        self.live_blocks -= 1;
    }

    /// Write a fresh, unlinked span header over the base of a mapped region.
    pub unsafe fn init(base: *mut u8, size: usize) -> *mut Span {
        debug_assert!(size <= u32::MAX as usize);
        let sp = base as *mut Span;
        unsafe {
            (*sp).size = size as u32;
            (*sp).live_blocks = 0;
            (*sp).prev = ptr::null_mut();
            (*sp).next = ptr::null_mut();
            (*sp).free = ptr::null_mut();
        }
        sp
    }

    /// Address of the first block header, right after the span header.
    #[inline]
    pub fn first_block(sp: *mut Span) -> *mut Block {
        (sp as usize + SPAN_HEADER_SIZE) as *mut Block
    }

    /// One past the last byte of the span.
    #[inline]
    pub unsafe fn end(sp: *mut Span) -> usize {
        unsafe { sp as usize + (*sp).size() }
    }

    /// Insert a free block at the head of this span's free list.
    ///
    /// # Safety
    ///
    /// `b` must be a valid block inside `sp` that is not already listed.
    pub unsafe fn prepend(sp: *mut Span, b: *mut Block) {
        unsafe {
            (*b).prev = ptr::null_mut();
            (*b).next = (*sp).free;
            if !(*sp).free.is_null() {
                (*(*sp).free).prev = b;
            }
            (*sp).free = b;
        }
    }

    /// Remove a block from this span's free list.
    ///
    /// # Safety
    ///
    /// `b` must currently be on `sp`'s free list.
    pub unsafe fn sever(sp: *mut Span, b: *mut Block) {
        unsafe {
            if (*sp).free == b {
                (*sp).free = (*b).next;
                if !(*sp).free.is_null() {
                    (*(*sp).free).prev = ptr::null_mut();
                }
            } else {
                debug_assert!(!(*b).prev.is_null());
                (*(*b).prev).next = (*b).next;
                if !(*b).next.is_null() {
                    (*(*b).next).prev = (*b).prev;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block;

    #[repr(align(16))]
    struct Arena([u8; 1024]);

    #[test]
    fn test_header_init() {
        let mut a = Arena([0; 1024]);
        unsafe {
            let sp = Span::init(a.0.as_mut_ptr(), 1024);
            assert_eq!((*sp).size(), 1024);
            assert_eq!((*sp).live_blocks(), 0);
            assert!((*sp).prev.is_null());
            assert!((*sp).next.is_null());
            assert!((*sp).free.is_null());
            assert_eq!(Span::first_block(sp) as usize, sp as usize + SPAN_HEADER_SIZE);
            assert_eq!(Span::end(sp), sp as usize + 1024);
        }
    }

    #[test]
    fn test_prepend_and_sever() {
        let mut a = Arena([0; 1024]);
        unsafe {
            let sp = Span::init(a.0.as_mut_ptr(), 1024);
            let base = sp as usize + SPAN_HEADER_SIZE;
            let b1 = block::init_free(base as *mut Block, 64, sp, true);
            let b2 = block::init_free((base + 64) as *mut Block, 64, sp, false);
            let b3 = block::init_free((base + 128) as *mut Block, 64, sp, false);

            Span::prepend(sp, b1);
            Span::prepend(sp, b2);
            Span::prepend(sp, b3);

            // most recently freed first
            assert_eq!((*sp).free, b3);
            assert_eq!((*b3).next, b2);
            assert_eq!((*b2).next, b1);
            assert!((*b1).next.is_null());
            assert_eq!((*b1).prev, b2);
            assert_eq!((*b2).prev, b3);
            assert!((*b3).prev.is_null());

            // sever the middle element
            Span::sever(sp, b2);
            assert_eq!((*sp).free, b3);
            assert_eq!((*b3).next, b1);
            assert_eq!((*b1).prev, b3);

            // sever the head
            Span::sever(sp, b3);
            assert_eq!((*sp).free, b1);
            assert!((*b1).prev.is_null());

            // sever the last one
            Span::sever(sp, b1);
            assert!((*sp).free.is_null());
        }
    }
}

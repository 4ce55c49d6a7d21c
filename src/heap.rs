//! Heap core: span lifecycle, first-fit search, split/coalesce, and the
//! four user-facing operations.
//!
//! Responsibilities:
//! - Find a free block for a request (first-fit across spans and within a
//!   span's free list), mapping a new span when nothing fits
//! - Split allocations off the tail of free blocks; refuse splits that
//!   would leave a sliver below the minimum block size
//! - Coalesce freed blocks eagerly with both physical neighbors
//! - Unmap spans whose last block was freed, always retaining one idle
//!   span so steady-state workloads do not round-trip the OS
//!
//! A `Heap` is a plain value so tests can run each against a private
//! instance; the process-wide one lives in [`crate::allocator`]. All state
//! is reachable from the span-list head — blocks and spans are raw
//! locations inside OS-mapped memory, never owned objects.

use crate::block::{self, Block, MAGIC_FREE, MAGIC_USED};
use crate::config::{MIN_SPAN_SIZE, POISON_BYTE};
use crate::layout::{
    ALIGNMENT, BLOCK_HEADER_SIZE, FOOTER_SIZE, MIN_BLOCK_SIZE, SPAN_HEADER_SIZE, align_up,
    gross_size,
};
use crate::platform;
use crate::span::Span;
use crate::stat;
use core::ptr;

pub struct Heap {
    /// Head of the span list; newest span first.
    spans: *mut Span,
    /// Number of live spans.
    span_count: usize,
    /// OS page size, queried once on first use.
    page_size: usize,
}

// SAFETY: the raw pointers reach OS-mapped memory owned by this heap alone;
// the process-wide instance is only touched through a SpinMutex.
unsafe impl Send for Heap {}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub const fn new() -> Self {
        Self {
            spans: ptr::null_mut(),
            span_count: 0,
            page_size: 0,
        }
    }

    #[inline]
    fn page_size(&mut self) -> usize {
        if self.page_size == 0 {
            self.page_size = platform::page_size();
        }
        self.page_size
    }

    /// Allocate `n` bytes. Returns null when `n == 0` or the OS refuses to
    /// map more memory.
    pub unsafe fn allocate(&mut self, n: usize) -> *mut u8 {
        if n == 0 {
            return ptr::null_mut();
        }
        let Some(gross) = gross_size(n) else {
            return ptr::null_mut();
        };
        let mut b = unsafe { self.find(gross) };
        if b.is_null() {
            let sp = unsafe { self.span_alloc(gross) };
            if sp.is_null() {
                return ptr::null_mut();
            }
            b = unsafe { (*sp).free };
        }
        let used = unsafe { Self::block_alloc(gross, b) };
        unsafe { Block::payload(used) }
    }

    /// Release the allocation at `p`. Null is a no-op. Anything else must
    /// be a live payload previously returned by this heap.
    pub unsafe fn deallocate(&mut self, p: *mut u8) {
        if p.is_null() {
            return;
        }
        unsafe {
            let b = Block::from_payload(p);
            assert!(
                (*b).in_use() && (*b).magic == MAGIC_USED,
                "free of a pointer that is not a live allocation"
            );
            let owner = (*b).owner;
            Self::block_free(b);
            if (*owner).live_blocks() == 0 && self.span_count > 1 {
                self.span_free(owner);
                return;
            }
            if (*owner).live_blocks() == 0 {
                stat!(spans_retained);
            }
            let merged = Self::coalesce(b);
            // Paint the dead payload, leaving the footer intact.
            let fill = (merged as *mut u8).add(BLOCK_HEADER_SIZE);
            let len = (*merged).size() - BLOCK_HEADER_SIZE - FOOTER_SIZE;
            ptr::write_bytes(fill, POISON_BYTE, len);
        }
    }

    /// Allocate `count * size` bytes, zeroed. Fails to null when the
    /// product overflows.
    pub unsafe fn allocate_zeroed(&mut self, count: usize, size: usize) -> *mut u8 {
        let Some(bytes) = count.checked_mul(size) else {
            return ptr::null_mut();
        };
        let p = unsafe { self.allocate(bytes) };
        if !p.is_null() {
            // Zero the whole payload; rounding may have made it larger than
            // the request.
            unsafe {
                let b = Block::from_payload(p);
                ptr::write_bytes(p, 0, (*b).size() - BLOCK_HEADER_SIZE);
            }
        }
        p
    }

    /// Resize the allocation at `p` to `n` bytes. Shrinks happen in place;
    /// growth absorbs a free right-hand neighbor when possible and moves
    /// the allocation otherwise. On failure the original allocation stays
    /// valid and null is returned.
    pub unsafe fn reallocate(&mut self, p: *mut u8, n: usize) -> *mut u8 {
        if p.is_null() {
            return unsafe { self.allocate(n) };
        }
        let Some(gross) = gross_size(n) else {
            return ptr::null_mut();
        };
        unsafe {
            let b = Block::from_payload(p);
            assert!(
                (*b).in_use() && (*b).magic == MAGIC_USED,
                "resize of a pointer that is not a live allocation"
            );
            let cur = (*b).size();
            if gross == cur {
                return p;
            }
            if n == 0 || gross < cur {
                Self::shrink(b, gross);
                p
            } else {
                self.grow(b, gross, n)
            }
        }
    }

    /// Whether `p` is a payload address inside a live span: its derived
    /// block header must lie past some span's header and before its end.
    /// Pointers failing this are foreign and were never issued here.
    pub fn owns(&self, p: *const u8) -> bool {
        if (p as usize) <= BLOCK_HEADER_SIZE {
            return false;
        }
        let b = p as usize - BLOCK_HEADER_SIZE;
        let mut sp = self.spans;
        while !sp.is_null() {
            unsafe {
                let base = sp as usize;
                if b >= base + SPAN_HEADER_SIZE && b < base + (*sp).size() {
                    return true;
                }
                sp = (*sp).next;
            }
        }
        false
    }

    /// Map a new span able to hold a block of `gross` bytes and link it as
    /// the new list head. The whole usable area becomes one free block.
    unsafe fn span_alloc(&mut self, gross: usize) -> *mut Span {
        let page = self.page_size();
        let wanted = match gross.checked_add(SPAN_HEADER_SIZE) {
            Some(n) if n > MIN_SPAN_SIZE => n,
            Some(_) => MIN_SPAN_SIZE,
            None => return ptr::null_mut(),
        };
        // Span sizes live in 32 bits; larger requests are indistinguishable
        // from resource exhaustion.
        if wanted > u32::MAX as usize - page {
            return ptr::null_mut();
        }
        let spsz = align_up(wanted, page);
        let base = unsafe { platform::page_alloc(spsz) };
        if base.is_null() {
            return ptr::null_mut();
        }
        stat!(os_map_count);
        stat!(os_map_bytes, spsz);
        let sp = unsafe { Span::init(base, spsz) };
        unsafe {
            (*sp).next = self.spans;
            if !self.spans.is_null() {
                (*self.spans).prev = sp;
            }
        }
        self.spans = sp;
        self.span_count += 1;
        unsafe {
            let b = block::init_free(Span::first_block(sp), spsz - SPAN_HEADER_SIZE, sp, true);
            Span::prepend(sp, b);
        }
        sp
    }

    /// Splice a span out of the list and return its pages to the OS. The
    /// span must not be touched afterwards.
    unsafe fn span_free(&mut self, sp: *mut Span) {
        self.span_count -= 1;
        unsafe {
            let (prev, next) = ((*sp).prev, (*sp).next);
            if prev.is_null() {
                self.spans = next;
            } else {
                (*prev).next = next;
            }
            if !next.is_null() {
                (*next).prev = prev;
            }
            let size = (*sp).size();
            stat!(os_unmap_count);
            stat!(os_unmap_bytes, size);
            platform::page_dealloc(sp as *mut u8, size);
        }
    }

    /// First free block of at least `gross` bytes: spans in list order,
    /// each span's free list in list order.
    unsafe fn find(&mut self, gross: usize) -> *mut Block {
        let mut sp = self.spans;
        while !sp.is_null() {
            unsafe {
                let mut b = (*sp).free;
                while !b.is_null() {
                    if (*b).size() >= gross {
                        return b;
                    }
                    b = (*b).next;
                }
                sp = (*sp).next;
            }
        }
        ptr::null_mut()
    }

    /// Carve `gross` bytes off the tail of the free block `b`. `b` stays on
    /// its free list with the size reduced; the tail comes back as an
    /// in-use block whose mirror bit records that `b` below it is free.
    unsafe fn split(b: *mut Block, gross: usize) -> *mut Block {
        unsafe {
            debug_assert!(!(*b).in_use() && (*b).size() > gross);
            let remainder = (*b).size() - gross;
            debug_assert!(remainder >= MIN_BLOCK_SIZE);
            (*b).set_size(remainder);
            block::write_footer(b);
            let tail = (b as usize + remainder) as *mut Block;
            debug_assert!(tail as usize % ALIGNMENT == 0);
            debug_assert!(tail as usize + gross <= Span::end((*b).owner));
            block::init_used(tail, gross, (*b).owner, false)
        }
    }

    /// Turn the free block `b` (of at least `gross` bytes) into an in-use
    /// block. Splits the tail off unless the leftover would be below the
    /// minimum block size, in which case the whole block is taken.
    unsafe fn block_alloc(gross: usize, b: *mut Block) -> *mut Block {
        unsafe {
            debug_assert!(!(*b).in_use() && (*b).size() >= gross);
            let owner = (*b).owner;
            let used = if (*b).size() - gross < MIN_BLOCK_SIZE {
                Span::sever(owner, b);
                (*b).set_in_use(true);
                (*b).owner = owner;
                (*b).prev = block::poisoned_link();
                (*b).next = block::poisoned_link();
                (*b).magic = MAGIC_USED;
                b
            } else {
                stat!(block_splits);
                Self::split(b, gross)
            };
            (*owner).inc_live();
            let next = block::next_adjacent(used);
            if !next.is_null() {
                (*next).set_prev_in_use(true);
            }
            used
        }
    }

    /// Put an in-use block back on its span's free list and update the
    /// neighbor's mirror bit. Coalescing is the caller's decision.
    unsafe fn block_free(b: *mut Block) {
        unsafe {
            let owner = (*b).owner;
            (*owner).dec_live();
            (*b).set_in_use(false);
            (*b).magic = MAGIC_FREE;
            block::write_footer(b);
            Span::prepend(owner, b);
            let next = block::next_adjacent(b);
            if !next.is_null() {
                (*next).set_prev_in_use(false);
            }
        }
    }

    /// Fold `b` into `a`, its immediate physical predecessor. Both must be
    /// free; `b`'s header stops being a block.
    unsafe fn coalesce_pair(a: *mut Block, b: *mut Block) {
        unsafe {
            debug_assert!(a as usize + (*a).size() == b as usize);
            debug_assert!(!(*a).in_use() && !(*b).in_use());
            stat!(block_coalesces);
            Span::sever((*b).owner, b);
            (*a).set_size((*a).size() + (*b).size());
            block::write_footer(a);
        }
    }

    /// Merge a newly freed block with its free physical neighbors, next
    /// side first. Returns the surviving header.
    unsafe fn coalesce(b: *mut Block) -> *mut Block {
        unsafe {
            let next = block::next_adjacent(b);
            if !next.is_null() && !(*next).in_use() {
                Self::coalesce_pair(b, next);
            }
            if !(*b).prev_in_use() {
                let prev = block::prev_adjacent(b);
                if !prev.is_null() {
                    debug_assert!(!(*prev).in_use());
                    Self::coalesce_pair(prev, b);
                    return prev;
                }
            }
            b
        }
    }

    /// In-place shrink to `gross` bytes. Refused (silently) when the cut
    /// tail would be below the minimum block size; the block keeps its
    /// slack instead.
    unsafe fn shrink(b: *mut Block, gross: usize) {
        unsafe {
            let cur = (*b).size();
            debug_assert!(gross >= MIN_BLOCK_SIZE && gross < cur);
            let remainder = cur - gross;
            if remainder < MIN_BLOCK_SIZE {
                return;
            }
            (*b).set_size(gross);
            let owner = (*b).owner;
            let f = block::init_free((b as usize + gross) as *mut Block, remainder, owner, true);
            Span::prepend(owner, f);
            let next = block::next_adjacent(f);
            if !next.is_null() {
                (*next).set_prev_in_use(false);
                Self::coalesce(f);
            }
        }
    }

    /// Grow the block at `b` to `gross` bytes (a request of `n`). Absorbs
    /// the free right-hand neighbor when it covers the deficit, else moves
    /// the allocation to a fresh block.
    unsafe fn grow(&mut self, b: *mut Block, gross: usize, n: usize) -> *mut u8 {
        unsafe {
            let cur = (*b).size();
            let owner = (*b).owner;
            let next = block::next_adjacent(b);
            if !next.is_null() && !(*next).in_use() && (*next).size() >= gross - cur {
                let combined = cur + (*next).size();
                Span::sever(owner, next);
                if combined - gross < MIN_BLOCK_SIZE {
                    // take the whole neighbor, slack included
                    (*b).set_size(combined);
                    let after = block::next_adjacent(b);
                    if !after.is_null() {
                        (*after).set_prev_in_use(true);
                    }
                } else {
                    (*b).set_size(gross);
                    let f = block::init_free(
                        (b as usize + gross) as *mut Block,
                        combined - gross,
                        owner,
                        true,
                    );
                    Span::prepend(owner, f);
                }
                return Block::payload(b);
            }

            // no usable neighbor: allocate elsewhere, copy, release
            let q = self.allocate(n);
            if q.is_null() {
                return ptr::null_mut();
            }
            ptr::copy_nonoverlapping(Block::payload(b), q, cur - BLOCK_HEADER_SIZE);
            self.deallocate(Block::payload(b));
            q
        }
    }

    /// Unmap every span, retained one included. For tests and embedders
    /// shutting the heap down.
    #[cfg(any(test, feature = "testing"))]
    pub unsafe fn unmap_all(&mut self) {
        while !self.spans.is_null() {
            unsafe { self.span_free(self.spans) };
        }
    }

    /// Walk the whole heap and assert every structural invariant.
    #[cfg(any(test, feature = "testing"))]
    pub fn verify(&self) {
        unsafe {
            let mut seen = 0;
            let mut prev_sp: *mut Span = ptr::null_mut();
            let mut sp = self.spans;
            while !sp.is_null() {
                assert_eq!((*sp).prev, prev_sp, "span back-link broken");
                assert!((*sp).size() >= MIN_SPAN_SIZE);
                Self::verify_span(sp);
                seen += 1;
                prev_sp = sp;
                sp = (*sp).next;
            }
            assert_eq!(seen, self.span_count, "span counter out of sync");
        }
    }

    #[cfg(any(test, feature = "testing"))]
    unsafe fn verify_span(sp: *mut Span) {
        unsafe {
            let end = Span::end(sp);
            let mut b = Span::first_block(sp);
            let mut total = 0usize;
            let mut in_use = 0usize;
            let mut below: Option<bool> = None;
            while (b as usize) < end {
                assert_eq!(b as usize % ALIGNMENT, 0, "misaligned block header");
                let size = (*b).size();
                assert!(size >= MIN_BLOCK_SIZE && size % ALIGNMENT == 0);
                assert!(b as usize + size <= end, "block overruns its span");
                assert_eq!((*b).owner, sp, "owner back-pointer broken");
                match below {
                    None => assert!((*b).prev_in_use(), "first block must carry the mirror bit"),
                    Some(used) => {
                        assert_eq!((*b).prev_in_use(), used, "mirror bit out of sync");
                        assert!(used || (*b).in_use(), "two adjacent free blocks");
                    }
                }
                if (*b).in_use() {
                    assert_eq!((*b).magic, MAGIC_USED);
                    in_use += 1;
                } else {
                    assert_eq!((*b).magic, MAGIC_FREE);
                    assert_eq!(*block::footer_slot(b), size, "footer does not match size");
                    assert!(Self::on_free_list(sp, b), "free block missing from free list");
                }
                below = Some((*b).in_use());
                total += size;
                b = (b as usize + size) as *mut Block;
            }
            assert_eq!(b as usize, end, "block walk did not land on span end");
            assert_eq!(total, (*sp).size() - SPAN_HEADER_SIZE);
            assert_eq!(in_use, (*sp).live_blocks(), "live-block counter out of sync");

            let mut back: *mut Block = ptr::null_mut();
            let mut f = (*sp).free;
            while !f.is_null() {
                assert!(!(*f).in_use(), "in-use block on a free list");
                assert_eq!((*f).owner, sp);
                assert_eq!((*f).prev, back, "free-list back-link broken");
                back = f;
                f = (*f).next;
            }
        }
    }

    #[cfg(any(test, feature = "testing"))]
    unsafe fn on_free_list(sp: *mut Span, b: *mut Block) -> bool {
        unsafe {
            let mut f = (*sp).free;
            while !f.is_null() {
                if f == b {
                    return true;
                }
                f = (*f).next;
            }
        }
        false
    }
}

//! Implementation of the physical frame pool shared by every address space.
//!
//! The pool is a page-aligned arena acquired once from the global allocator;
//! frames are handed out as [`FrameTracker`]s whose `Drop` returns the frame
//! to the pool. The pool is a process-wide resource touched from every
//! execution context, so acquire/release serialize on a [`spin::Mutex`];
//! nothing above this layer takes a lock of its own.

use super::address::{PhysAddr, PhysPageNum};
use crate::config::{FRAME_POOL_PAGES, PAGE_SIZE};
use alloc::alloc::{alloc_zeroed, Layout};
use alloc::vec::Vec;
use core::fmt::{self, Debug, Formatter};
use lazy_static::*;
use spin::Mutex;

/// Owns one physical frame for as long as the tracker lives.
///
/// Dropping the tracker returns the frame to the pool (RAII), which is how
/// page-table nodes and leaf frames are reclaimed without explicit free
/// calls.
pub struct FrameTracker {
    /// The owned frame.
    pub ppn: PhysPageNum,
}

impl FrameTracker {
    /// Wrap a freshly allocated frame, zero-filling it first.
    pub fn new(ppn: PhysPageNum) -> Self {
        let bytes_array = ppn.get_bytes_array();
        for i in bytes_array {
            *i = 0;
        }
        Self { ppn }
    }
}

impl Debug for FrameTracker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("FrameTracker:PPN={:#x}", self.ppn.0))
    }
}

impl Drop for FrameTracker {
    fn drop(&mut self) {
        frame_dealloc(self.ppn);
    }
}

trait FrameAllocator {
    fn new() -> Self;
    fn alloc(&mut self) -> Option<PhysPageNum>;
    fn dealloc(&mut self, ppn: PhysPageNum);
}

/// Stack-style frame allocator over the arena's page-number interval.
///
/// `[current, end)` has never been allocated; `recycled` holds returned
/// frames last-in first-out.
pub struct StackFrameAllocator {
    current: usize,
    end: usize,
    recycled: Vec<usize>,
}

impl StackFrameAllocator {
    /// Acquire the backing arena and take ownership of its page numbers.
    ///
    /// The arena is never returned to the global allocator; it plays the
    /// role of the machine's physical RAM for the lifetime of the pool.
    fn init_pool(&mut self, pages: usize) {
        let layout = Layout::from_size_align(pages * PAGE_SIZE, PAGE_SIZE)
            .expect("frame pool: bad layout");
        let base = unsafe { alloc_zeroed(layout) };
        assert!(!base.is_null(), "frame pool: arena allocation failed");
        let base_ppn = PhysAddr::from(base as usize).floor();
        self.current = base_ppn.0;
        self.end = base_ppn.0 + pages;
    }
}

impl FrameAllocator for StackFrameAllocator {
    fn new() -> Self {
        Self {
            current: 0,
            end: 0,
            recycled: Vec::new(),
        }
    }

    fn alloc(&mut self) -> Option<PhysPageNum> {
        if let Some(ppn) = self.recycled.pop() {
            Some(ppn.into())
        } else if self.current == self.end {
            None
        } else {
            self.current += 1;
            Some((self.current - 1).into())
        }
    }

    /// # Panics
    ///
    /// A frame being returned must have been handed out and must not
    /// already sit in the recycled stack; either case is a double free.
    fn dealloc(&mut self, ppn: PhysPageNum) {
        let ppn = ppn.0;
        if ppn >= self.current || self.recycled.iter().any(|&v| v == ppn) {
            panic!("Frame ppn={:#x} has not been allocated!", ppn);
        }
        self.recycled.push(ppn);
    }
}

type FrameAllocatorImpl = StackFrameAllocator;

lazy_static! {
    /// The frame pool, initialized on first use.
    static ref FRAME_ALLOCATOR: Mutex<FrameAllocatorImpl> = {
        let mut allocator = FrameAllocatorImpl::new();
        allocator.init_pool(FRAME_POOL_PAGES);
        Mutex::new(allocator)
    };
}

/// Allocate a frame, zeroed and wrapped in a [`FrameTracker`].
///
/// Returns `None` when the pool is exhausted.
pub fn frame_alloc() -> Option<FrameTracker> {
    FRAME_ALLOCATOR.lock().alloc().map(FrameTracker::new)
}

/// Return a frame to the pool.
///
/// Called automatically by [`FrameTracker`]'s `Drop`; there is no need to
/// use this manually.
pub fn frame_dealloc(ppn: PhysPageNum) {
    FRAME_ALLOCATOR.lock().dealloc(ppn);
}

#[cfg(test)]
mod tests {
    use super::*;

    // The pool is shared by every test thread in the binary; identity
    // assertions below need the two tests serialized.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn alloc_recycle_realloc() {
        let _guard = TEST_LOCK.lock();
        let mut v: Vec<FrameTracker> = Vec::new();
        for _ in 0..5 {
            let frame = frame_alloc().unwrap();
            assert!(frame.ppn.get_bytes_array().iter().all(|&b| b == 0));
            v.push(frame);
        }
        let last = v[4].ppn;
        v.clear();
        // LIFO recycling hands back the most recently dropped frame first.
        let again = frame_alloc().unwrap();
        assert_eq!(again.ppn, last);
    }

    #[test]
    #[should_panic]
    fn double_free_is_rejected() {
        let _guard = TEST_LOCK.lock();
        let frame = frame_alloc().unwrap();
        let ppn = frame.ppn;
        drop(frame);
        frame_dealloc(ppn);
    }
}

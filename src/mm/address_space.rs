//! Implementation of [`AddressSpace`].
//!
//! An address space owns exactly one root [`PageTable`] plus the physical
//! frames backing its leaf mappings, and tracks a byte-granular high-water
//! mark of mapped memory from address 0. Growth, shrinkage and fork-copy
//! are driven through [`super::paging::ProcessVm`], which keeps the paging
//! rosters in step with the mechanics exposed here.

use super::address::VirtPageNum;
use super::frame_allocator::{frame_alloc, FrameTracker};
use super::page_table::{MapPermission, PageTable, PteFlags};
use crate::config::PAGE_SIZE;
use crate::error::{Result, VmError};
use alloc::collections::BTreeMap;
use log::trace;

/// A user address space: one page table, the leaf frames it maps, and the
/// mapped-size high-water mark.
///
/// Dropping the address space reclaims every leaf frame and then every
/// page-table node; the `FrameTracker` RAII handles both without an
/// explicit teardown walk.
pub struct AddressSpace {
    page_table: PageTable,
    frames: BTreeMap<VirtPageNum, FrameTracker>,
    size: usize,
}

impl AddressSpace {
    /// Create an empty address space with a fresh root table.
    pub fn new() -> Result<Self> {
        Ok(Self {
            page_table: PageTable::new()?,
            frames: BTreeMap::new(),
            size: 0,
        })
    }

    /// The underlying page table.
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    /// Mutable access to the underlying page table.
    pub(super) fn page_table_mut(&mut self) -> &mut PageTable {
        &mut self.page_table
    }

    /// Bytes mapped from address 0.
    pub fn size(&self) -> usize {
        self.size
    }

    pub(super) fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    /// Map the very first page of the very first process.
    ///
    /// Address 0 is mapped to one fresh zeroed frame and `data` is copied
    /// in.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not fit in one page; the initial process
    /// image is tiny by construction.
    pub fn load_initial_image(&mut self, data: &[u8]) -> Result<()> {
        assert!(
            data.len() < PAGE_SIZE,
            "load initial image: more than a page"
        );
        self.map_page(
            VirtPageNum(0),
            MapPermission::R | MapPermission::W | MapPermission::X | MapPermission::U,
        )?;
        let ppn = self
            .page_table
            .translate(VirtPageNum(0))
            .unwrap()
            .ppn();
        ppn.get_bytes_array()[..data.len()].copy_from_slice(data);
        self.size = PAGE_SIZE;
        Ok(())
    }

    /// Allocate a zeroed frame and map `vpn` to it with `perm`.
    pub fn map_page(&mut self, vpn: VirtPageNum, perm: MapPermission) -> Result<()> {
        let frame = frame_alloc().ok_or(VmError::OutOfFrames)?;
        let flags = PteFlags::from_bits(perm.bits()).unwrap();
        self.page_table.map(vpn, frame.ppn, flags)?;
        trace!("map {:?} -> {:?}", vpn, frame.ppn);
        self.frames.insert(vpn, frame);
        Ok(())
    }

    /// Unmap a resident page and release its frame.
    ///
    /// # Panics
    ///
    /// Panics if the page is not mapped or its frame is not tracked here.
    pub fn unmap_page(&mut self, vpn: VirtPageNum) {
        self.page_table.unmap(vpn);
        trace!("unmap {:?}", vpn);
        assert!(
            self.frames.remove(&vpn).is_some(),
            "unmap: frame for {:?} not tracked",
            vpn
        );
    }

    /// Hand ownership of an already-filled frame to this space and map it;
    /// the paging engine uses this when faulting a page back in, and
    /// fork-copy when duplicating a resident page.
    pub(super) fn adopt_frame(
        &mut self,
        vpn: VirtPageNum,
        frame: FrameTracker,
        flags: PteFlags,
    ) -> Result<()> {
        self.page_table.map(vpn, frame.ppn, flags)?;
        self.frames.insert(vpn, frame);
        Ok(())
    }

    /// Map `vpn` into a frame that the page table already points at after a
    /// swap-in; only the ownership record changes hands.
    pub(super) fn adopt_swapped_in_frame(&mut self, vpn: VirtPageNum, frame: FrameTracker) {
        debug_assert_eq!(
            self.page_table.translate(vpn).map(|pte| pte.ppn()),
            Some(frame.ppn)
        );
        self.frames.insert(vpn, frame);
    }

    /// Release the frame backing `vpn` without touching the page table;
    /// the eviction path flips the leaf to swapped first and then drops
    /// the frame here.
    pub(super) fn release_frame(&mut self, vpn: VirtPageNum) {
        let frame = self
            .frames
            .remove(&vpn)
            .unwrap_or_else(|| panic!("release: frame for {:?} not tracked", vpn));
        // frame drops here, returning the page to the pool
        drop(frame);
    }

    /// Turn the page at `vpn` into a guard page by stripping its
    /// user-accessible bit.
    ///
    /// # Panics
    ///
    /// Panics if the page is unmapped.
    pub fn clear_user_access(&mut self, vpn: VirtPageNum) {
        self.page_table.clear_user_access(vpn);
    }
}

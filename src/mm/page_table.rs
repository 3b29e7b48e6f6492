//! ## A page table entry(64bit) in SV39 paging mode
//!
//! Besides the architectural V/R/W/X/U/G/A/D bits, one bit of the RSW field
//! (reserved for supervisor software, exactly for uses like this) marks a
//! leaf whose page content currently lives in a swap store instead of a
//! frame. A populated leaf carries exactly one of `V` and `S`: both clear
//! means unmapped, and `V` with none of R/W/X is an internal node pointing
//! to a child table.

use super::address::{PhysPageNum, VirtAddr, VirtPageNum};
use super::frame_allocator::{frame_alloc, FrameTracker};
use crate::config::PAGE_SIZE;
use crate::error::{Result, VmError};
use alloc::vec;
use alloc::vec::Vec;
use bitflags::*;

bitflags! {
    /// Flag bits of an SV39 page table entry, plus the swapped-out marker
    /// in RSW bit 8.
    pub struct PteFlags: u16 {
        /// Valid: the entry takes part in translation.
        const V = 1 << 0;
        /// Readable.
        const R = 1 << 1;
        /// Writable.
        const W = 1 << 2;
        /// Executable.
        const X = 1 << 3;
        /// User-accessible at U privilege.
        const U = 1 << 4;
        /// Global mapping; unused here.
        const G = 1 << 5;
        /// Accessed since the bit was last cleared.
        const A = 1 << 6;
        /// Written since the bit was last cleared.
        const D = 1 << 7;
        /// Swapped out: content lives in the owning process's swap store,
        /// permission bits remain meaningful, the PPN field does not.
        const S = 1 << 8;
    }
}

/// # Page table entry (64bit)
///
/// | Bit number  |63------54|53------28|27------19|18------10|9---8| 7 | 6 | 5 | 4 | 3 | 2 | 1 | 0 |
/// |-------------|----------|----------|----------|----------|-----|---|---|---|---|---|---|---|---|
/// | Bit meaning | Reserved | PPN\[2\] | PPN\[1\] | PPN\[0\] | RSW | D | A | G | U | X | W | R | V |
#[derive(Copy, Clone)]
#[repr(C)]
pub struct PageTableEntry {
    /// Raw bit representation.
    pub bits: usize,
}

impl PageTableEntry {
    /// Combine a physical page number and flags into an entry.
    pub fn new(ppn: PhysPageNum, flags: PteFlags) -> Self {
        PageTableEntry {
            bits: ppn.0 << 10 | flags.bits as usize,
        }
    }

    /// The all-zero entry: neither valid nor swapped, i.e. unmapped.
    pub fn empty() -> Self {
        PageTableEntry { bits: 0 }
    }

    /// Physical page number field (44 bits).
    pub fn ppn(&self) -> PhysPageNum {
        (self.bits >> 10 & ((1usize << 44) - 1)).into()
    }

    /// Flag bits, including the RSW swapped marker.
    pub fn flags(&self) -> PteFlags {
        PteFlags::from_bits_truncate((self.bits & 0x3ff) as u16)
    }

    /// Whether `V` is set.
    pub fn is_valid(&self) -> bool {
        self.flags().contains(PteFlags::V)
    }

    /// Whether `S` is set: the page content lives in the swap store.
    pub fn is_swapped(&self) -> bool {
        self.flags().contains(PteFlags::S)
    }

    /// Whether the entry terminates translation (any of R/W/X set), as
    /// opposed to pointing at a child table.
    pub fn is_leaf(&self) -> bool {
        self.flags()
            .intersects(PteFlags::R | PteFlags::W | PteFlags::X)
    }

    /// Whether `R` is set.
    pub fn readable(&self) -> bool {
        self.flags().contains(PteFlags::R)
    }

    /// Whether `W` is set.
    pub fn writable(&self) -> bool {
        self.flags().contains(PteFlags::W)
    }

    /// Whether `X` is set.
    pub fn executable(&self) -> bool {
        self.flags().contains(PteFlags::X)
    }

    /// Whether `U` is set.
    pub fn is_user(&self) -> bool {
        self.flags().contains(PteFlags::U)
    }

    /// Whether the hardware accessed bit is set.
    pub fn is_accessed(&self) -> bool {
        self.flags().contains(PteFlags::A)
    }
}

bitflags! {
    /// The caller-facing subset of [`PteFlags`]: only R/W/X/U. The
    /// remaining bits belong to the translation mechanism and the paging
    /// engine and are never chosen by callers.
    pub struct MapPermission: u16 {
        /// Readable.
        const R = 1 << 1;
        /// Writable.
        const W = 1 << 2;
        /// Executable.
        const X = 1 << 3;
        /// User-accessible at U privilege.
        const U = 1 << 4;
    }
}

/// # Page table
///
/// A tree of 512-entry nodes, three levels deep. The root node's physical
/// page number identifies the table; every node (root included) is owned
/// through a [`FrameTracker`], so the table's nodes are reclaimed when the
/// `PageTable` is dropped. Internal nodes are allocated lazily on first
/// mapping and never shared across address spaces.
pub struct PageTable {
    root_ppn: PhysPageNum,
    frames: Vec<FrameTracker>,
}

impl PageTable {
    /// Allocate an empty table: one zeroed root node.
    pub fn new() -> Result<Self> {
        let frame = frame_alloc().ok_or(VmError::OutOfFrames)?;
        Ok(PageTable {
            root_ppn: frame.ppn,
            frames: vec![frame],
        })
    }

    /// Physical page number of the root node.
    pub fn root_ppn(&self) -> PhysPageNum {
        self.root_ppn
    }

    /// Walk to the leaf entry for `vpn`, allocating internal nodes on
    /// demand. Fails with [`VmError::OutOfFrames`] if a node cannot be
    /// allocated; nodes already installed stay in place.
    fn find_pte_create(&mut self, vpn: VirtPageNum) -> Result<&mut PageTableEntry> {
        let idxs = vpn.indexes();
        let mut ppn = self.root_ppn;
        for (i, idx) in idxs.iter().enumerate() {
            let pte = &mut ppn.get_pte_array()[*idx];
            if i == 2 {
                return Ok(pte);
            }
            if !pte.is_valid() {
                let frame = frame_alloc().ok_or(VmError::OutOfFrames)?;
                *pte = PageTableEntry::new(frame.ppn, PteFlags::V);
                self.frames.push(frame);
            }
            ppn = pte.ppn();
        }
        unreachable!()
    }

    /// Walk to the leaf entry for `vpn` without allocating; `None` if an
    /// internal node on the path is missing.
    fn find_pte(&self, vpn: VirtPageNum) -> Option<&mut PageTableEntry> {
        let idxs = vpn.indexes();
        let mut ppn = self.root_ppn;
        let mut result: Option<&mut PageTableEntry> = None;
        for (i, idx) in idxs.iter().enumerate() {
            let pte = &mut ppn.get_pte_array()[*idx];
            if i == 2 {
                result = Some(pte);
                break;
            }
            if !pte.is_valid() {
                return None;
            }
            ppn = pte.ppn();
        }
        result
    }

    /// Install a leaf mapping `vpn -> ppn` with `flags | V`.
    ///
    /// # Panics
    ///
    /// Panics if the target entry is already populated (valid or swapped).
    /// Remapping a live page means bookkeeping is broken elsewhere and must
    /// not be silently allowed.
    pub fn map(&mut self, vpn: VirtPageNum, ppn: PhysPageNum, flags: PteFlags) -> Result<()> {
        let pte = self.find_pte_create(vpn)?;
        assert!(
            !pte.is_valid() && !pte.is_swapped(),
            "vpn {:?} is mapped before mapping",
            vpn
        );
        *pte = PageTableEntry::new(ppn, flags | PteFlags::V);
        Ok(())
    }

    /// Clear the leaf entry for `vpn`.
    ///
    /// # Panics
    ///
    /// Panics if the entry is neither valid nor swapped, or is not a leaf.
    pub fn unmap(&mut self, vpn: VirtPageNum) {
        let pte = self
            .find_pte(vpn)
            .unwrap_or_else(|| panic!("unmap: walk failed for {:?}", vpn));
        assert!(
            pte.is_valid() || pte.is_swapped(),
            "vpn {:?} is not mapped before unmapping",
            vpn
        );
        assert!(
            pte.is_leaf() || pte.is_swapped(),
            "unmap: {:?} is not a leaf",
            vpn
        );
        *pte = PageTableEntry::empty();
    }

    /// Copy of the leaf entry for `vpn`, or `None` if the walk fails.
    ///
    /// The returned entry may be unpopulated; callers check `is_valid` /
    /// `is_swapped`.
    pub fn translate(&self, vpn: VirtPageNum) -> Option<PageTableEntry> {
        self.find_pte(vpn).map(|pte| *pte)
    }

    /// Resolve `vpn` to its frame, for user-space accesses only.
    ///
    /// Anything that is not a valid, user-accessible leaf resolves to
    /// `None`; unmapped, swapped-out and kernel-only pages are
    /// indistinguishable to the caller by design.
    pub fn translate_user(&self, vpn: VirtPageNum) -> Option<PhysPageNum> {
        let pte = self.find_pte(vpn)?;
        if pte.is_valid() && pte.is_user() {
            Some(pte.ppn())
        } else {
            None
        }
    }

    /// Record an access to `vpn`, as MMU hardware would on a load or store.
    ///
    /// # Panics
    ///
    /// Panics if the page is not resident.
    pub fn mark_accessed(&mut self, vpn: VirtPageNum) {
        let pte = self
            .find_pte(vpn)
            .unwrap_or_else(|| panic!("mark accessed: walk failed for {:?}", vpn));
        assert!(pte.is_valid(), "mark accessed: {:?} is not resident", vpn);
        *pte = PageTableEntry::new(pte.ppn(), pte.flags() | PteFlags::A);
    }

    /// Read and clear the accessed bit of a resident leaf, returning
    /// whether it was set.
    pub(super) fn take_accessed(&mut self, vpn: VirtPageNum) -> bool {
        let pte = self
            .find_pte(vpn)
            .unwrap_or_else(|| panic!("take accessed: walk failed for {:?}", vpn));
        assert!(pte.is_valid(), "take accessed: {:?} is not resident", vpn);
        let was_set = pte.is_accessed();
        *pte = PageTableEntry::new(pte.ppn(), pte.flags() - PteFlags::A);
        was_set
    }

    /// Flip a resident leaf to swapped-out, keeping its permission bits,
    /// and return the frame it was mapped to. The accessed bit is dropped;
    /// it describes a residency that no longer exists.
    pub(super) fn swap_out(&mut self, vpn: VirtPageNum) -> PhysPageNum {
        let pte = self
            .find_pte(vpn)
            .unwrap_or_else(|| panic!("swap out: walk failed for {:?}", vpn));
        assert!(pte.is_valid(), "swap out: {:?} is not resident", vpn);
        let ppn = pte.ppn();
        let flags = (pte.flags() - PteFlags::V - PteFlags::A) | PteFlags::S;
        *pte = PageTableEntry::new(PhysPageNum(0), flags);
        ppn
    }

    /// Flip a swapped-out leaf back to resident in `ppn`, restoring the
    /// permission bits it was evicted with.
    pub(super) fn swap_in(&mut self, vpn: VirtPageNum, ppn: PhysPageNum) {
        let pte = self
            .find_pte(vpn)
            .unwrap_or_else(|| panic!("swap in: walk failed for {:?}", vpn));
        assert!(pte.is_swapped(), "swap in: {:?} is not swapped out", vpn);
        let flags = (pte.flags() - PteFlags::S) | PteFlags::V;
        *pte = PageTableEntry::new(ppn, flags);
    }

    /// Install a swapped-out leaf carrying `flags` (S plus permissions)
    /// without any backing frame; used when copying an address space whose
    /// source page is itself swapped out.
    pub(super) fn set_swapped_entry(&mut self, vpn: VirtPageNum, flags: PteFlags) -> Result<()> {
        let pte = self.find_pte_create(vpn)?;
        assert!(
            !pte.is_valid() && !pte.is_swapped(),
            "vpn {:?} is mapped before mapping",
            vpn
        );
        *pte = PageTableEntry::new(PhysPageNum(0), flags);
        Ok(())
    }

    /// Strip the user-accessible bit from one leaf, turning it into a
    /// guard page.
    ///
    /// # Panics
    ///
    /// Panics if the page is unmapped.
    pub fn clear_user_access(&mut self, vpn: VirtPageNum) {
        let pte = self
            .find_pte(vpn)
            .unwrap_or_else(|| panic!("clear user access: walk failed for {:?}", vpn));
        assert!(
            pte.is_valid() || pte.is_swapped(),
            "clear user access: {:?} is not mapped",
            vpn
        );
        *pte = PageTableEntry::new(pte.ppn(), pte.flags() - PteFlags::U);
    }

    /// Check that no populated leaf survives anywhere in the tree.
    ///
    /// Callers tear an address space down by unmapping every page first;
    /// a leaf found here means that did not happen.
    ///
    /// # Panics
    ///
    /// Panics on the first live leaf encountered.
    pub fn assert_empty(&self) {
        fn check(ppn: PhysPageNum, level: usize) {
            for pte in ppn.get_pte_array().iter() {
                if pte.is_valid() && !pte.is_leaf() && level < 2 {
                    check(pte.ppn(), level + 1);
                } else if pte.is_valid() || pte.is_swapped() {
                    panic!("page table teardown: live leaf");
                }
            }
        }
        check(self.root_ppn, 0);
    }
}

/// Copy `src` into user memory at `dst_va`, crossing page boundaries
/// transparently.
///
/// Fails with [`VmError::BadUserAddress`] the moment a page in the range is
/// not mapped user-accessible; pages before it have already been written.
pub fn copy_out(page_table: &PageTable, dst_va: VirtAddr, src: &[u8]) -> Result<()> {
    let mut va: usize = dst_va.0;
    let mut copied: usize = 0;
    while copied < src.len() {
        let cur = VirtAddr::from(va);
        let ppn = page_table
            .translate_user(cur.floor())
            .ok_or(VmError::BadUserAddress)?;
        let offset = cur.page_offset();
        let n = (PAGE_SIZE - offset).min(src.len() - copied);
        ppn.get_bytes_array()[offset..offset + n].copy_from_slice(&src[copied..copied + n]);
        copied += n;
        va += n;
    }
    Ok(())
}

/// Copy user memory at `src_va` into `dst`, crossing page boundaries
/// transparently.
///
/// Fails with [`VmError::BadUserAddress`] the moment a page in the range is
/// not mapped user-accessible; `dst`'s prefix up to that point has already
/// been filled and its tail is left untouched.
pub fn copy_in(page_table: &PageTable, dst: &mut [u8], src_va: VirtAddr) -> Result<()> {
    let mut va: usize = src_va.0;
    let mut copied: usize = 0;
    while copied < dst.len() {
        let cur = VirtAddr::from(va);
        let ppn = page_table
            .translate_user(cur.floor())
            .ok_or(VmError::BadUserAddress)?;
        let offset = cur.page_offset();
        let n = (PAGE_SIZE - offset).min(dst.len() - copied);
        dst[copied..copied + n].copy_from_slice(&ppn.get_bytes_array()[offset..offset + n]);
        copied += n;
        va += n;
    }
    Ok(())
}

/// Copy a NUL-terminated string from user memory at `src_va` into `dst`.
///
/// On success the terminator has been written to `dst` and the string
/// length (excluding the terminator) is returned. Fails with
/// [`VmError::StringTooLong`] if `dst` fills up before a terminator is
/// found, or [`VmError::BadUserAddress`] if a page in the walk is not
/// mapped user-accessible.
pub fn copy_in_str(page_table: &PageTable, dst: &mut [u8], src_va: VirtAddr) -> Result<usize> {
    let mut va: usize = src_va.0;
    let mut written: usize = 0;
    loop {
        let cur = VirtAddr::from(va);
        let ppn = page_table
            .translate_user(cur.floor())
            .ok_or(VmError::BadUserAddress)?;
        let offset = cur.page_offset();
        for &byte in &ppn.get_bytes_array()[offset..] {
            if written >= dst.len() {
                return Err(VmError::StringTooLong);
            }
            dst[written] = byte;
            if byte == 0 {
                return Ok(written);
            }
            written += 1;
        }
        va += PAGE_SIZE - offset;
    }
}

//! Per-process demand paging: rosters, eviction policies and the fault
//! handler.
//!
//! A paged process keeps at most [`MAX_RESIDENT_PAGES`] pages in physical
//! frames, tracked by a resident roster; overflow pages are written to the
//! process's [`SwapStore`] and tracked by a swap roster whose slot index,
//! times the page size, is the byte offset of the page in the store. Every
//! page cycles `Unused -> Resident -> Swapped -> Resident (on fault) -> ...
//! -> Unused (on unmap)`; there is no in-flight state, because a process's
//! virtual memory is only ever touched by the one execution context running
//! on its behalf.
//!
//! The replacement policy is picked once per process-vm and dispatched
//! through [`EvictionPolicy`] wherever a policy decision is needed; the
//! roster machinery itself is shared by all policies. The second-chance
//! list is kept as `older`/`newer` indexes into the fixed resident array
//! with `None` as the end marker, so ordering costs no separate allocation
//! and removal from the middle stays O(1).

use super::address::{VPNRange, VirtAddr, VirtPageNum};
use super::address_space::AddressSpace;
use super::frame_allocator::frame_alloc;
use super::page_table::{MapPermission, PageTable, PteFlags};
use crate::config::{MAX_RESIDENT_PAGES, MAX_SWAP_PAGES, MAX_TOTAL_PAGES, PAGE_SIZE};
use crate::error::{Result, VmError};
use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use log::{debug, trace};

/// Page replacement policy, fixed for the life of a [`ProcessVm`].
///
/// A kernel picks one policy at configuration time and constructs every
/// process's vm with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// No rosters and no eviction; memory is bounded only by the frame
    /// pool.
    Disabled,
    /// FIFO with a second chance: a page found with its accessed bit set
    /// is spared once, requeued as newest with the bit cleared.
    SecondChanceFifo,
    /// Not-frequently-used approximation: evict the smallest aged
    /// recency counter.
    LeastRecentCounter,
    /// Least-active approximation: evict the counter with the fewest set
    /// bits, ties broken by smaller value.
    LeastActiveApprox,
}

/// What the trap dispatcher should do after reporting a page fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// The fault was not caused by a swapped-out page; the process made an
    /// illegal access.
    Segfault,
    /// The page was brought back in; retry the faulting instruction.
    Resumed,
}

/// Per-process page-granular backing store.
///
/// Transfers are byte-exact and page-sized, never partial; the call may
/// block the calling context while the underlying device completes.
pub trait SwapStore {
    /// Read one page at `offset` into `dst` (`dst.len() == PAGE_SIZE`).
    fn read_page(&mut self, offset: usize, dst: &mut [u8]);
    /// Write one page from `src` at `offset` (`src.len() == PAGE_SIZE`).
    fn write_page(&mut self, offset: usize, src: &[u8]);
}

/// Memory-backed [`SwapStore`] covering all [`MAX_SWAP_PAGES`] slots;
/// stands in for a swap file where no storage device exists.
pub struct MemSwapStore {
    bytes: Vec<u8>,
}

impl MemSwapStore {
    /// A zero-filled store with room for every swap slot.
    pub fn new() -> Self {
        Self {
            bytes: vec![0; MAX_SWAP_PAGES * PAGE_SIZE],
        }
    }
}

impl Default for MemSwapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SwapStore for MemSwapStore {
    fn read_page(&mut self, offset: usize, dst: &mut [u8]) {
        assert_eq!(dst.len(), PAGE_SIZE, "swap store: partial read");
        dst.copy_from_slice(&self.bytes[offset..offset + PAGE_SIZE]);
    }

    fn write_page(&mut self, offset: usize, src: &[u8]) {
        assert_eq!(src.len(), PAGE_SIZE, "swap store: partial write");
        self.bytes[offset..offset + PAGE_SIZE].copy_from_slice(src);
    }
}

/// One resident roster slot: the page it tracks plus policy metadata
/// (aging counter for the counter policies, list links for second-chance).
#[derive(Clone, Copy)]
struct ResidentSlot {
    used: bool,
    vpn: VirtPageNum,
    counter: u64,
    older: Option<usize>,
    newer: Option<usize>,
}

const EMPTY_RESIDENT: ResidentSlot = ResidentSlot {
    used: false,
    vpn: VirtPageNum(0),
    counter: 0,
    older: None,
    newer: None,
};

/// One swap roster slot; its index times the page size is the page's byte
/// offset in the store.
#[derive(Clone, Copy)]
struct SwapSlot {
    used: bool,
    vpn: VirtPageNum,
}

const EMPTY_SWAP: SwapSlot = SwapSlot {
    used: false,
    vpn: VirtPageNum(0),
};

/// Rosters and store of one paged process.
struct PagingState {
    resident: [ResidentSlot; MAX_RESIDENT_PAGES],
    swap: [SwapSlot; MAX_SWAP_PAGES],
    resident_count: usize,
    swapped_count: usize,
    /// Head of the second-chance list (eviction candidate side).
    oldest: Option<usize>,
    /// Tail of the second-chance list (most recently admitted side).
    newest: Option<usize>,
    store: Box<dyn SwapStore>,
}

impl PagingState {
    fn new(store: Box<dyn SwapStore>) -> Self {
        Self {
            resident: [EMPTY_RESIDENT; MAX_RESIDENT_PAGES],
            swap: [EMPTY_SWAP; MAX_SWAP_PAGES],
            resident_count: 0,
            swapped_count: 0,
            oldest: None,
            newest: None,
            store,
        }
    }

    fn free_resident_index(&self) -> Option<usize> {
        self.resident.iter().position(|slot| !slot.used)
    }

    fn free_swap_index(&self) -> Option<usize> {
        self.swap.iter().position(|slot| !slot.used)
    }

    fn resident_index_of(&self, vpn: VirtPageNum) -> Option<usize> {
        self.resident
            .iter()
            .position(|slot| slot.used && slot.vpn == vpn)
    }

    /// Append `idx` at the newest end of the second-chance list.
    fn fifo_push_newest(&mut self, idx: usize) {
        self.resident[idx].newer = None;
        self.resident[idx].older = self.newest;
        if let Some(n) = self.newest {
            self.resident[n].newer = Some(idx);
        }
        self.newest = Some(idx);
        if self.oldest.is_none() {
            self.oldest = Some(idx);
        }
    }

    /// Unlink `idx` from the second-chance list wherever it sits.
    fn fifo_unlink(&mut self, idx: usize) {
        let older = self.resident[idx].older;
        let newer = self.resident[idx].newer;
        match older {
            Some(o) => self.resident[o].newer = newer,
            None => self.oldest = newer,
        }
        match newer {
            Some(n) => self.resident[n].older = older,
            None => self.newest = older,
        }
        self.resident[idx].older = None;
        self.resident[idx].newer = None;
    }

    /// Record `vpn` as resident, initializing the policy metadata.
    fn install_resident(&mut self, vpn: VirtPageNum, policy: EvictionPolicy) {
        let idx = self
            .free_resident_index()
            .expect("admit: resident roster full");
        self.resident[idx].used = true;
        self.resident[idx].vpn = vpn;
        match policy {
            EvictionPolicy::SecondChanceFifo => self.fifo_push_newest(idx),
            EvictionPolicy::LeastRecentCounter => self.resident[idx].counter = 0,
            EvictionPolicy::LeastActiveApprox => self.resident[idx].counter = u64::MAX,
            EvictionPolicy::Disabled => unreachable!("admit with paging disabled"),
        }
        self.resident_count += 1;
    }

    fn remove_resident_index(&mut self, idx: usize, policy: EvictionPolicy) {
        if policy == EvictionPolicy::SecondChanceFifo {
            self.fifo_unlink(idx);
        }
        self.resident[idx] = EMPTY_RESIDENT;
        self.resident_count -= 1;
    }

    /// Drop `vpn` from the resident roster.
    ///
    /// # Panics
    ///
    /// The page table said this page was resident; a missing roster entry
    /// means the two went out of step.
    fn remove_resident(&mut self, vpn: VirtPageNum, policy: EvictionPolicy) {
        let idx = self
            .resident_index_of(vpn)
            .unwrap_or_else(|| panic!("resident roster: no entry for {:?}", vpn));
        self.remove_resident_index(idx, policy);
    }

    /// Find and clear the swap slot of `vpn`, returning its index. Slots
    /// are map-once: a faulting page surrenders its slot immediately.
    ///
    /// # Panics
    ///
    /// Panics if no slot tracks `vpn`; the leaf said swapped, so one must.
    fn take_swap_slot(&mut self, vpn: VirtPageNum) -> usize {
        let idx = self
            .swap
            .iter()
            .position(|slot| slot.used && slot.vpn == vpn)
            .unwrap_or_else(|| panic!("swap roster: no entry for {:?}", vpn));
        self.swap[idx] = EMPTY_SWAP;
        self.swapped_count -= 1;
        idx
    }

    /// Copy the other state's rosters wholesale: contents, counters, list
    /// order and counts. Used at fork so the child starts from the
    /// parent's exact replacement state.
    fn clone_rosters_from(&mut self, other: &PagingState) {
        self.resident = other.resident;
        self.swap = other.swap;
        self.resident_count = other.resident_count;
        self.swapped_count = other.swapped_count;
        self.oldest = other.oldest;
        self.newest = other.newest;
    }
}

/// Pick the resident roster index to evict.
///
/// - Second-chance FIFO scans from the oldest entry; an entry whose
///   accessed bit is set is spared (bit cleared, requeued newest) and the
///   scan continues. Clearing the bit cannot be undone before the entry is
///   revisited, so the scan terminates.
/// - Least-recent-counter takes the numerically smallest counter; the
///   first occurrence wins ties.
/// - Least-active takes the fewest set bits, ties broken by smaller
///   counter value, then first occurrence.
fn select_victim(
    page_table: &mut PageTable,
    st: &mut PagingState,
    policy: EvictionPolicy,
) -> usize {
    match policy {
        EvictionPolicy::SecondChanceFifo => loop {
            let idx = st.oldest.expect("evict: no resident page");
            let vpn = st.resident[idx].vpn;
            if !page_table.take_accessed(vpn) {
                return idx;
            }
            st.fifo_unlink(idx);
            st.fifo_push_newest(idx);
        },
        EvictionPolicy::LeastRecentCounter => {
            let mut min: Option<usize> = None;
            for (i, slot) in st.resident.iter().enumerate() {
                if !slot.used {
                    continue;
                }
                let better = match min {
                    None => true,
                    Some(m) => slot.counter < st.resident[m].counter,
                };
                if better {
                    min = Some(i);
                }
            }
            min.expect("evict: no resident page")
        }
        EvictionPolicy::LeastActiveApprox => {
            let mut min: Option<usize> = None;
            for (i, slot) in st.resident.iter().enumerate() {
                if !slot.used {
                    continue;
                }
                let better = match min {
                    None => true,
                    Some(m) => {
                        let min_ones = st.resident[m].counter.count_ones();
                        let ones = slot.counter.count_ones();
                        ones < min_ones
                            || (ones == min_ones && slot.counter < st.resident[m].counter)
                    }
                };
                if better {
                    min = Some(i);
                }
            }
            min.expect("evict: no resident page")
        }
        EvictionPolicy::Disabled => unreachable!("evict with paging disabled"),
    }
}

/// The virtual memory of one process: its [`AddressSpace`] plus, for paged
/// processes, the rosters and swap store of the demand-paging engine.
///
/// Every entry point names the process vm it operates on; there is no
/// ambient "current process" anywhere in this module.
pub struct ProcessVm {
    space: AddressSpace,
    policy: EvictionPolicy,
    exempt: bool,
    paging: Option<PagingState>,
}

impl ProcessVm {
    /// Create the vm of a new process.
    ///
    /// `exempt` is decided once by the spawner, normally from
    /// [`crate::config::is_exempt_process`]; exempt processes (and every
    /// process under [`EvictionPolicy::Disabled`]) keep all pages resident,
    /// never touch `store`, and are bounded only by the frame pool.
    pub fn new(policy: EvictionPolicy, exempt: bool, store: Box<dyn SwapStore>) -> Result<Self> {
        let paging = if policy != EvictionPolicy::Disabled && !exempt {
            Some(PagingState::new(store))
        } else {
            None
        };
        Ok(Self {
            space: AddressSpace::new()?,
            policy,
            exempt,
            paging,
        })
    }

    /// The process's address space.
    pub fn space(&self) -> &AddressSpace {
        &self.space
    }

    /// The process's page table, for the copy layer and the dispatcher.
    pub fn page_table(&self) -> &PageTable {
        self.space.page_table()
    }

    /// Bytes mapped from address 0.
    pub fn size(&self) -> usize {
        self.space.size()
    }

    /// The replacement policy this vm was created with.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Whether this process bypasses paging accounting.
    pub fn is_exempt(&self) -> bool {
        self.exempt
    }

    /// Pages currently tracked as resident; always 0 for exempt processes
    /// and under [`EvictionPolicy::Disabled`].
    pub fn resident_count(&self) -> usize {
        self.paging.as_ref().map_or(0, |st| st.resident_count)
    }

    /// Pages currently tracked as swapped out.
    pub fn swapped_count(&self) -> usize {
        self.paging.as_ref().map_or(0, |st| st.swapped_count)
    }

    /// Whether the page containing `va` is backed by a frame.
    pub fn is_resident(&self, va: VirtAddr) -> bool {
        self.space
            .page_table()
            .translate(va.floor())
            .map_or(false, |pte| pte.is_valid())
    }

    /// Whether the page containing `va` currently lives in the swap store.
    pub fn is_swapped_out(&self, va: VirtAddr) -> bool {
        self.space
            .page_table()
            .translate(va.floor())
            .map_or(false, |pte| pte.is_swapped())
    }

    /// Aging counter of the resident page containing `va`, for
    /// diagnostics; `None` when the page is not in the resident roster.
    pub fn age_counter(&self, va: VirtAddr) -> Option<u64> {
        let vpn = va.floor();
        let st = self.paging.as_ref()?;
        st.resident
            .iter()
            .find(|slot| slot.used && slot.vpn == vpn)
            .map(|slot| slot.counter)
    }

    /// Record an access to `va`, as MMU hardware would on a load or store.
    pub fn touch(&mut self, va: VirtAddr) {
        self.space.page_table_mut().mark_accessed(va.floor());
    }

    /// Map the initial process image at address 0.
    ///
    /// The page is not entered into any roster: the first process is on
    /// the exemption list by construction.
    pub fn load_initial_image(&mut self, data: &[u8]) -> Result<()> {
        self.space.load_initial_image(data)
    }

    /// Turn the page at `va` into a guard page (strip user access).
    ///
    /// # Panics
    ///
    /// Panics if the page is unmapped.
    pub fn clear_user_access(&mut self, va: VirtAddr) {
        self.space.clear_user_access(va.floor());
    }

    /// Grow the address space to `new_size` bytes, mapping fresh zeroed
    /// frames with `R | U | perm` and admitting each page to the resident
    /// roster.
    ///
    /// Rejected with [`VmError::PageBudgetExceeded`] when the projected
    /// page count of a paged process exceeds [`MAX_TOTAL_PAGES`]. Any
    /// failure mid-growth rolls back to the old size before returning the
    /// error. A `new_size` at or below the current size changes nothing.
    pub fn grow(&mut self, new_size: usize, perm: MapPermission) -> Result<usize> {
        let old_size = self.space.size();
        if new_size <= old_size {
            return Ok(old_size);
        }
        if self.paging.is_some() && VirtAddr::from(new_size).ceil().0 > MAX_TOTAL_PAGES {
            debug!(
                "grow to {:#x} rejected: over the {}-page budget",
                new_size, MAX_TOTAL_PAGES
            );
            return Err(VmError::PageBudgetExceeded);
        }
        let perm = perm | MapPermission::R | MapPermission::U;
        let start = VirtAddr::from(old_size).ceil();
        let end = VirtAddr::from(new_size).ceil();
        for vpn in VPNRange::new(start, end) {
            if let Err(e) = self.grow_one(vpn, perm) {
                self.dealloc_pages(old_size, VirtAddr::from(vpn).into());
                return Err(e);
            }
        }
        self.space.set_size(new_size);
        Ok(new_size)
    }

    /// Shrink the address space to `new_size` bytes, unmapping and freeing
    /// every whole page between the rounded-up boundaries; a `new_size` at
    /// or above the current size changes nothing. Returns the new size.
    pub fn shrink(&mut self, new_size: usize) -> usize {
        let old_size = self.space.size();
        if new_size >= old_size {
            return old_size;
        }
        self.dealloc_pages(new_size, old_size);
        self.space.set_size(new_size);
        new_size
    }

    /// Copy this vm for a forked child.
    ///
    /// Resident pages are duplicated into fresh frames mapped with the
    /// parent's permission bits. Swapped pages copy their leaf flags and
    /// roster slot, and the slot's bytes are copied from the parent's
    /// store into `child_store` at the same index, so a later child fault
    /// reads the data as it was at fork time. Fails atomically: on error
    /// the partially built child is dropped, which unwinds everything
    /// already mapped into it.
    pub fn fork(&mut self, child_store: Box<dyn SwapStore>) -> Result<ProcessVm> {
        let mut child = ProcessVm::new(self.policy, self.exempt, child_store)?;
        let size = self.space.size();
        for vpn in VPNRange::new(VirtPageNum(0), VirtAddr::from(size).ceil()) {
            let pte = self
                .space
                .page_table()
                .translate(vpn)
                .unwrap_or_else(|| panic!("fork: walk failed for {:?}", vpn));
            if pte.is_valid() {
                let frame = frame_alloc().ok_or(VmError::OutOfFrames)?;
                frame
                    .ppn
                    .get_bytes_array()
                    .copy_from_slice(pte.ppn().get_bytes_array());
                child
                    .space
                    .adopt_frame(vpn, frame, pte.flags() - PteFlags::V)?;
            } else if pte.is_swapped() {
                child
                    .space
                    .page_table_mut()
                    .set_swapped_entry(vpn, pte.flags())?;
            } else {
                panic!("fork: {:?} is not mapped", vpn);
            }
        }
        if self.paging.is_some() && child.paging.is_some() {
            {
                let pst = self.paging.as_ref().unwrap();
                child.paging.as_mut().unwrap().clone_rosters_from(pst);
            }
            let pst = self.paging.as_mut().unwrap();
            let cst = child.paging.as_mut().unwrap();
            let mut buf = [0u8; PAGE_SIZE];
            for idx in 0..MAX_SWAP_PAGES {
                if pst.swap[idx].used {
                    pst.store.read_page(idx * PAGE_SIZE, &mut buf);
                    cst.store.write_page(idx * PAGE_SIZE, &buf);
                }
            }
        }
        child.space.set_size(size);
        Ok(child)
    }

    /// Handle a page fault at `va`, reported by the trap dispatcher.
    ///
    /// Only a leaf carrying the swapped marker is this engine's business:
    /// the page is read back from the swap store into a fresh frame,
    /// re-admitted (which may evict another page first) and its leaf
    /// flipped back to valid with its original permission bits, answering
    /// [`FaultOutcome::Resumed`] so the faulting instruction is retried.
    /// Every other cause answers [`FaultOutcome::Segfault`].
    pub fn handle_fault(&mut self, va: VirtAddr) -> Result<FaultOutcome> {
        let vpn = va.floor();
        if self.paging.is_none() {
            return Ok(FaultOutcome::Segfault);
        }
        match self.space.page_table().translate(vpn) {
            Some(pte) if pte.is_swapped() => {}
            _ => return Ok(FaultOutcome::Segfault),
        }
        let frame = frame_alloc().ok_or(VmError::OutOfFrames)?;
        {
            let st = self.paging.as_mut().unwrap();
            let slot = st.take_swap_slot(vpn);
            st.store.read_page(slot * PAGE_SIZE, frame.ppn.get_bytes_array());
        }
        // The slot freed above guarantees the nested eviction, if any,
        // finds room in the swap roster.
        self.admit(vpn)?;
        self.space.page_table_mut().swap_in(vpn, frame.ppn);
        self.space.adopt_swapped_in_frame(vpn, frame);
        debug!("fault in {:?}", vpn);
        Ok(FaultOutcome::Resumed)
    }

    /// Age the resident pages of a counter-based policy: shift each
    /// counter right one bit, then fold the hardware accessed bit into the
    /// top bit and clear it. No-op under FIFO, when paging is disabled and
    /// for exempt processes. Invoked at a regular cadence by the caller,
    /// typically once per scheduling tick.
    pub fn age(&mut self) {
        match self.policy {
            EvictionPolicy::LeastRecentCounter | EvictionPolicy::LeastActiveApprox => {}
            _ => return,
        }
        let ProcessVm { space, paging, .. } = self;
        let st = match paging {
            Some(st) => st,
            None => return,
        };
        for slot in st.resident.iter_mut().filter(|slot| slot.used) {
            slot.counter >>= 1;
            if space.page_table_mut().take_accessed(slot.vpn) {
                slot.counter |= 1 << 63;
            }
        }
        trace!("aged {} resident pages", st.resident_count);
    }

    /// Map one fresh page and admit it, undoing the mapping if admission
    /// fails.
    fn grow_one(&mut self, vpn: VirtPageNum, perm: MapPermission) -> Result<()> {
        self.space.map_page(vpn, perm)?;
        if self.paging.is_some() {
            if let Err(e) = self.admit(vpn) {
                // Not in any roster yet; take the mapping back out by hand.
                self.space.unmap_page(vpn);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Register a freshly mapped page in the resident roster, evicting
    /// first if the roster is full.
    fn admit(&mut self, vpn: VirtPageNum) -> Result<()> {
        if self.paging.as_ref().unwrap().resident_count == MAX_RESIDENT_PAGES {
            self.evict()?;
        }
        let policy = self.policy;
        self.paging.as_mut().unwrap().install_resident(vpn, policy);
        Ok(())
    }

    /// Write one victim page out to the swap store and drop its frame.
    ///
    /// The swap slot is reserved before the victim is chosen so a full
    /// swap roster surfaces as [`VmError::OutOfSwapSlots`] without having
    /// reordered the second-chance list for nothing.
    fn evict(&mut self) -> Result<()> {
        let policy = self.policy;
        let ProcessVm { space, paging, .. } = self;
        let st = paging.as_mut().unwrap();
        let slot = st.free_swap_index().ok_or(VmError::OutOfSwapSlots)?;
        let victim = select_victim(space.page_table_mut(), st, policy);
        let vpn = st.resident[victim].vpn;
        let ppn = space.page_table_mut().swap_out(vpn);
        st.store.write_page(slot * PAGE_SIZE, ppn.get_bytes_array());
        space.release_frame(vpn);
        st.swap[slot] = SwapSlot { used: true, vpn };
        st.swapped_count += 1;
        st.remove_resident_index(victim, policy);
        debug!("evict {:?} to swap slot {}", vpn, slot);
        Ok(())
    }

    /// Unmap every whole page between the rounded-up boundaries of
    /// `new_size` and `old_size`, releasing frames, roster entries and
    /// swap slots as appropriate.
    fn dealloc_pages(&mut self, new_size: usize, old_size: usize) {
        let policy = self.policy;
        let start = VirtAddr::from(new_size).ceil();
        let end = VirtAddr::from(old_size).ceil();
        for vpn in VPNRange::new(start, end) {
            let pte = self
                .space
                .page_table()
                .translate(vpn)
                .unwrap_or_else(|| panic!("dealloc: walk failed for {:?}", vpn));
            if pte.is_valid() {
                if let Some(st) = self.paging.as_mut() {
                    st.remove_resident(vpn, policy);
                }
                self.space.unmap_page(vpn);
            } else if pte.is_swapped() {
                if let Some(st) = self.paging.as_mut() {
                    st.take_swap_slot(vpn);
                }
                self.space.page_table_mut().unmap(vpn);
            } else {
                panic!("dealloc: {:?} is not mapped", vpn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PagingState {
        PagingState::new(Box::new(MemSwapStore::new()))
    }

    #[test]
    fn fifo_push_and_unlink_middle() {
        let mut st = state();
        for vpn in 0..3 {
            st.install_resident(VirtPageNum(vpn), EvictionPolicy::SecondChanceFifo);
        }
        assert_eq!(st.oldest, Some(0));
        assert_eq!(st.newest, Some(2));
        st.fifo_unlink(1);
        assert_eq!(st.resident[0].newer, Some(2));
        assert_eq!(st.resident[2].older, Some(0));
        assert_eq!(st.oldest, Some(0));
        assert_eq!(st.newest, Some(2));
    }

    #[test]
    fn fifo_unlink_last_empties_list() {
        let mut st = state();
        st.install_resident(VirtPageNum(7), EvictionPolicy::SecondChanceFifo);
        st.fifo_unlink(0);
        assert_eq!(st.oldest, None);
        assert_eq!(st.newest, None);
    }

    #[test]
    fn requeue_moves_oldest_to_newest() {
        let mut st = state();
        for vpn in 0..3 {
            st.install_resident(VirtPageNum(vpn), EvictionPolicy::SecondChanceFifo);
        }
        let idx = st.oldest.unwrap();
        st.fifo_unlink(idx);
        st.fifo_push_newest(idx);
        assert_eq!(st.oldest, Some(1));
        assert_eq!(st.newest, Some(0));
    }

    #[test]
    fn swap_slots_are_find_and_clear() {
        let mut st = state();
        st.swap[3] = SwapSlot {
            used: true,
            vpn: VirtPageNum(9),
        };
        st.swapped_count = 1;
        assert_eq!(st.take_swap_slot(VirtPageNum(9)), 3);
        assert_eq!(st.swapped_count, 0);
        assert!(st.free_swap_index() == Some(0));
    }
}

//! A demand-paged virtual-memory core isolated from the kernel
//!
//! `easy-vm` implements the SV39 page-based virtual-memory machinery a small
//! RV64 kernel needs for user address spaces:
//!
//! - a three-level radix [`PageTable`] with per-leaf permission and status
//!   bits, including a swapped-out marker kept in the RSW field;
//! - an [`AddressSpace`] owning one root table plus the physical page frames
//!   backing its leaf mappings;
//! - a byte/string copy layer ([`copy_in`], [`copy_out`], [`copy_in_str`])
//!   for crossing the user/kernel page-table boundary;
//! - a per-process demand-paging engine ([`ProcessVm`]) that bounds resident
//!   memory to a fixed page budget and evicts to a per-process [`SwapStore`]
//!   under a configurable [`EvictionPolicy`].
//!
//! The physical-frame pool is a page-aligned arena acquired once from the
//! global allocator, so physical page numbers index real memory and the
//! crate runs unmodified under a hosted test harness.
#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

extern crate alloc;

pub mod config;
mod error;
mod mm;

pub use error::{Result, VmError};
pub use mm::address::{PhysAddr, PhysPageNum, VirtAddr, VirtPageNum};
pub use mm::address_space::AddressSpace;
pub use mm::frame_allocator::{frame_alloc, frame_dealloc, FrameTracker};
pub use mm::page_table::{copy_in, copy_in_str, copy_out};
pub use mm::page_table::{MapPermission, PageTable, PageTableEntry, PteFlags};
pub use mm::paging::{
    EvictionPolicy, FaultOutcome, MemSwapStore, ProcessVm, SwapStore,
};

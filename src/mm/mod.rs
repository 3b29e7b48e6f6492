//! Memory management implementation
//!
//! SV39 page-based virtual-memory architecture for RV64 systems: physical
//! and virtual address types, the frame pool, the three-level page table,
//! the address-space lifecycle and the demand-paging engine all live here.
//!
//! Every process owns one [`paging::ProcessVm`] controlling its virtual
//! memory.

pub mod address;
pub mod address_space;
pub mod frame_allocator;
pub mod page_table;
pub mod paging;

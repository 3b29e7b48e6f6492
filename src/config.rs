//! Constants used in easy-vm

/// 4096byte == 4KiB
pub const PAGE_SIZE: usize = 0x1000;
/// Bit width of intra-page offset
pub const PAGE_SIZE_BITS: usize = 0xc;

/// Number of page frames in the physical frame pool.
///
/// The pool is one page-aligned arena acquired from the global allocator the
/// first time a frame is requested; a kernel embedding this crate sizes it to
/// the physical RAM handed over at boot.
pub const FRAME_POOL_PAGES: usize = 4096;

/// Upper bound of resident roster slots per process.
pub const MAX_RESIDENT_PAGES: usize = 16;
/// Upper bound of swap roster slots per process.
///
/// The slot index doubles as the page-granular byte offset into the
/// process's swap store.
pub const MAX_SWAP_PAGES: usize = 16;
/// Hard ceiling of pages a paged process may own, resident plus swapped.
pub const MAX_TOTAL_PAGES: usize = MAX_RESIDENT_PAGES + MAX_SWAP_PAGES;

/// Process names that never participate in paging accounting.
///
/// System-critical processes keep every page resident and never appear in
/// either roster. The spawner consults this list once at process creation
/// and carries the result as an explicit flag; nothing inside the engine
/// compares names.
pub const EXEMPT_PROCESS_NAMES: [&str; 3] = ["sh", "init", "initcode"];

/// Whether a process with the given name is exempt from paging.
pub fn is_exempt_process(name: &str) -> bool {
    EXEMPT_PROCESS_NAMES.contains(&name)
}

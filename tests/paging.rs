use easy_vm::config::{is_exempt_process, MAX_RESIDENT_PAGES, MAX_TOTAL_PAGES, PAGE_SIZE};
use easy_vm::{
    copy_in, copy_out, EvictionPolicy, FaultOutcome, MapPermission, MemSwapStore, ProcessVm,
    VirtAddr, VmError,
};

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn paged(policy: EvictionPolicy) -> ProcessVm {
    ProcessVm::new(policy, false, Box::new(MemSwapStore::new())).unwrap()
}

fn page_va(page: usize) -> VirtAddr {
    VirtAddr::from(page * PAGE_SIZE)
}

/// Grow to `pages` whole pages, writable.
fn grow_pages(vm: &mut ProcessVm, pages: usize) {
    vm.grow(pages * PAGE_SIZE, MapPermission::W).unwrap();
}

fn write_page(vm: &ProcessVm, page: usize, fill: u8) {
    copy_out(vm.page_table(), page_va(page), &[fill; PAGE_SIZE]).unwrap();
}

fn read_page(vm: &ProcessVm, page: usize) -> Vec<u8> {
    let mut buf = vec![0u8; PAGE_SIZE];
    copy_in(vm.page_table(), &mut buf, page_va(page)).unwrap();
    buf
}

#[test]
fn eviction_starts_past_the_resident_limit() {
    let mut vm = paged(EvictionPolicy::SecondChanceFifo);
    grow_pages(&mut vm, MAX_RESIDENT_PAGES);
    assert_eq!(vm.resident_count(), MAX_RESIDENT_PAGES);
    assert_eq!(vm.swapped_count(), 0);

    grow_pages(&mut vm, MAX_RESIDENT_PAGES + 1);
    assert_eq!(vm.resident_count(), MAX_RESIDENT_PAGES);
    assert_eq!(vm.swapped_count(), 1);
    // Nothing was touched, so plain FIFO order holds: page 0 went out.
    assert!(vm.is_swapped_out(page_va(0)));
    assert!(vm.is_resident(page_va(MAX_RESIDENT_PAGES)));
}

#[test]
fn faulted_page_comes_back_with_its_contents() {
    let mut vm = paged(EvictionPolicy::SecondChanceFifo);
    grow_pages(&mut vm, MAX_RESIDENT_PAGES);
    let mut rng = StdRng::seed_from_u64(7);
    let data: Vec<u8> = (0..PAGE_SIZE).map(|_| rng.gen()).collect();
    copy_out(vm.page_table(), page_va(0), &data).unwrap();

    grow_pages(&mut vm, MAX_RESIDENT_PAGES + 1);
    assert!(vm.is_swapped_out(page_va(0)));
    // The copy layer refuses swapped-out pages; only a fault brings them back.
    let mut buf = vec![0u8; PAGE_SIZE];
    assert_eq!(
        copy_in(vm.page_table(), &mut buf, page_va(0)),
        Err(VmError::BadUserAddress)
    );

    assert_eq!(vm.handle_fault(page_va(0)), Ok(FaultOutcome::Resumed));
    assert!(vm.is_resident(page_va(0)));
    assert_eq!(read_page(&vm, 0), data);
    assert_eq!(vm.swapped_count(), 1);
}

#[test]
fn fault_elsewhere_is_a_segfault() {
    let mut vm = paged(EvictionPolicy::SecondChanceFifo);
    grow_pages(&mut vm, 1);
    // Unmapped address.
    assert_eq!(vm.handle_fault(page_va(5)), Ok(FaultOutcome::Segfault));
    // Already-resident page: the fault had another cause.
    assert_eq!(vm.handle_fault(page_va(0)), Ok(FaultOutcome::Segfault));

    let mut small = ProcessVm::new(
        EvictionPolicy::Disabled,
        false,
        Box::new(MemSwapStore::new()),
    )
    .unwrap();
    small.grow(PAGE_SIZE, MapPermission::W).unwrap();
    assert_eq!(small.handle_fault(page_va(0)), Ok(FaultOutcome::Segfault));
}

#[test]
fn second_chance_spares_recently_touched_pages() {
    let mut vm = paged(EvictionPolicy::SecondChanceFifo);
    grow_pages(&mut vm, MAX_RESIDENT_PAGES);
    vm.touch(page_va(0));
    vm.touch(page_va(1));

    grow_pages(&mut vm, MAX_RESIDENT_PAGES + 1);
    // Pages 0 and 1 got their second chance; page 2 was the first clean one.
    assert!(vm.is_resident(page_va(0)));
    assert!(vm.is_resident(page_va(1)));
    assert!(vm.is_swapped_out(page_va(2)));

    // Their chance is spent: the next eviction takes page 3, then 0 and 1
    // are back at the head of the queue.
    grow_pages(&mut vm, MAX_RESIDENT_PAGES + 2);
    assert!(vm.is_swapped_out(page_va(3)));
    grow_pages(&mut vm, MAX_RESIDENT_PAGES + 3);
    assert!(vm.is_swapped_out(page_va(4)));
}

#[test]
fn aging_folds_the_accessed_bit_into_the_counter() {
    let mut vm = paged(EvictionPolicy::LeastRecentCounter);
    grow_pages(&mut vm, 4);
    assert_eq!(vm.age_counter(page_va(1)), Some(0));

    for _ in 0..3 {
        vm.touch(page_va(1));
        vm.age();
    }
    assert_eq!(vm.age_counter(page_va(1)), Some(0xE000_0000_0000_0000));
    assert_eq!(vm.age_counter(page_va(0)), Some(0));
    assert_eq!(vm.age_counter(page_va(20)), None);
}

#[test]
fn least_recent_counter_evicts_the_coldest_page() {
    let mut vm = paged(EvictionPolicy::LeastRecentCounter);
    grow_pages(&mut vm, MAX_RESIDENT_PAGES);
    for page in 1..MAX_RESIDENT_PAGES {
        vm.touch(page_va(page));
    }
    vm.age();

    // Page 0 is the only counter still at zero.
    grow_pages(&mut vm, MAX_RESIDENT_PAGES + 1);
    assert!(vm.is_swapped_out(page_va(0)));

    // The newcomer starts cold and is the next victim.
    grow_pages(&mut vm, MAX_RESIDENT_PAGES + 2);
    assert!(vm.is_swapped_out(page_va(MAX_RESIDENT_PAGES)));
}

#[test]
fn least_active_evicts_the_fewest_set_bits() {
    let mut vm = paged(EvictionPolicy::LeastActiveApprox);
    grow_pages(&mut vm, MAX_RESIDENT_PAGES);
    // One aging round with everything but page 0 touched leaves page 0
    // with 63 set bits and everyone else with 64.
    for page in 1..MAX_RESIDENT_PAGES {
        vm.touch(page_va(page));
    }
    vm.age();
    assert_eq!(vm.age_counter(page_va(0)), Some(u64::MAX >> 1));
    assert_eq!(vm.age_counter(page_va(1)), Some(u64::MAX));

    grow_pages(&mut vm, MAX_RESIDENT_PAGES + 1);
    assert!(vm.is_swapped_out(page_va(0)));
}

#[test]
fn exempt_processes_bypass_paging_entirely() {
    assert!(is_exempt_process("sh"));
    assert!(is_exempt_process("init"));
    assert!(is_exempt_process("initcode"));
    assert!(!is_exempt_process("cat"));

    let mut vm = ProcessVm::new(
        EvictionPolicy::SecondChanceFifo,
        is_exempt_process("init"),
        Box::new(MemSwapStore::new()),
    )
    .unwrap();
    assert!(vm.is_exempt());
    // Past both the resident limit and the total budget, all resident.
    let pages = MAX_TOTAL_PAGES + 8;
    grow_pages(&mut vm, pages);
    assert_eq!(vm.resident_count(), 0);
    assert_eq!(vm.swapped_count(), 0);
    for page in 0..pages {
        assert!(vm.is_resident(page_va(page)));
    }
}

#[test]
fn disabled_policy_keeps_everything_resident() {
    let mut vm = ProcessVm::new(
        EvictionPolicy::Disabled,
        false,
        Box::new(MemSwapStore::new()),
    )
    .unwrap();
    let pages = MAX_TOTAL_PAGES + 8;
    grow_pages(&mut vm, pages);
    for page in 0..pages {
        assert!(vm.is_resident(page_va(page)));
    }
}

#[test]
fn growth_past_the_page_budget_is_rejected() {
    let mut vm = paged(EvictionPolicy::SecondChanceFifo);
    grow_pages(&mut vm, MAX_RESIDENT_PAGES);
    assert_eq!(
        vm.grow((MAX_TOTAL_PAGES + 1) * PAGE_SIZE, MapPermission::W),
        Err(VmError::PageBudgetExceeded)
    );
    assert_eq!(vm.size(), MAX_RESIDENT_PAGES * PAGE_SIZE);

    // The budget itself is reachable: 16 resident plus 16 swapped.
    grow_pages(&mut vm, MAX_TOTAL_PAGES);
    assert_eq!(vm.resident_count(), MAX_RESIDENT_PAGES);
    assert_eq!(vm.swapped_count(), MAX_TOTAL_PAGES - MAX_RESIDENT_PAGES);
}

#[test]
fn shrink_releases_frames_and_swap_slots() {
    let mut vm = paged(EvictionPolicy::SecondChanceFifo);
    grow_pages(&mut vm, 20);
    // Pages 0..=3 were evicted to make room for 16..=19.
    assert_eq!(vm.swapped_count(), 4);
    write_page(&vm, 19, 0x5a);

    assert_eq!(vm.shrink(2 * PAGE_SIZE), 2 * PAGE_SIZE);
    assert_eq!(vm.size(), 2 * PAGE_SIZE);
    // The surviving pages 0 and 1 are still swapped out.
    assert_eq!(vm.resident_count(), 0);
    assert_eq!(vm.swapped_count(), 2);
    assert_eq!(vm.handle_fault(page_va(0)), Ok(FaultOutcome::Resumed));
    assert_eq!(vm.resident_count(), 1);

    // Shrinking never grows.
    assert_eq!(vm.shrink(10 * PAGE_SIZE), 2 * PAGE_SIZE);
}

#[test]
fn fork_isolates_resident_and_swapped_pages() {
    let mut parent = paged(EvictionPolicy::SecondChanceFifo);
    grow_pages(&mut parent, MAX_RESIDENT_PAGES);
    write_page(&parent, 0, 0xaa);
    write_page(&parent, 1, 0x11);
    // Evict page 0 with marker 0xaa in the parent's store.
    grow_pages(&mut parent, MAX_RESIDENT_PAGES + 1);
    assert!(parent.is_swapped_out(page_va(0)));

    let mut child = parent.fork(Box::new(MemSwapStore::new())).unwrap();
    assert_eq!(child.size(), parent.size());
    assert_eq!(child.resident_count(), parent.resident_count());
    assert_eq!(child.swapped_count(), 1);
    assert!(child.is_swapped_out(page_va(0)));
    assert_eq!(read_page(&child, 1), vec![0x11; PAGE_SIZE]);

    // Writes after the fork stay private on both sides.
    write_page(&parent, 1, 0x22);
    assert_eq!(read_page(&child, 1), vec![0x11; PAGE_SIZE]);
    write_page(&child, 1, 0x33);
    assert_eq!(read_page(&parent, 1), vec![0x22; PAGE_SIZE]);

    // The child's swap slot holds the page as it was at fork time, even
    // after the parent faults it back and rewrites it.
    assert_eq!(parent.handle_fault(page_va(0)), Ok(FaultOutcome::Resumed));
    write_page(&parent, 0, 0xbb);
    assert_eq!(child.handle_fault(page_va(0)), Ok(FaultOutcome::Resumed));
    assert_eq!(read_page(&child, 0), vec![0xaa; PAGE_SIZE]);
    assert_eq!(read_page(&parent, 0), vec![0xbb; PAGE_SIZE]);
}

#[test]
fn rosters_stay_within_bounds_under_random_traffic() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut vm = paged(EvictionPolicy::SecondChanceFifo);
    let mut pages = 0usize;
    for _ in 0..400 {
        match rng.gen_range(0..5) {
            0 if pages < MAX_TOTAL_PAGES => {
                pages += 1;
                grow_pages(&mut vm, pages);
            }
            1 if pages > 0 => {
                pages -= 1;
                vm.shrink(pages * PAGE_SIZE);
            }
            2 => {
                if let Some(page) =
                    (0..pages).find(|&page| vm.is_swapped_out(page_va(page)))
                {
                    assert_eq!(vm.handle_fault(page_va(page)), Ok(FaultOutcome::Resumed));
                }
            }
            3 => {
                if let Some(page) = (0..pages).find(|&page| vm.is_resident(page_va(page))) {
                    vm.touch(page_va(page));
                }
            }
            _ => vm.age(),
        }
        assert!(vm.resident_count() <= MAX_RESIDENT_PAGES);
        assert!(vm.swapped_count() <= MAX_TOTAL_PAGES - MAX_RESIDENT_PAGES);
        assert_eq!(vm.size(), pages * PAGE_SIZE);
        // Every mapped page is exactly one of resident or swapped.
        assert_eq!(vm.resident_count() + vm.swapped_count(), pages);
    }
}

use easy_vm::{copy_in, AddressSpace, MapPermission, VirtAddr, VirtPageNum};

use pretty_assertions::assert_eq;

const PAGE_SIZE: usize = easy_vm::config::PAGE_SIZE;

#[test]
fn initial_image_lands_at_address_zero() {
    let mut space = AddressSpace::new().unwrap();
    let image = b"\x17\x05\x00\x00\x13\x05\x45\x02initcode";
    space.load_initial_image(image).unwrap();
    assert_eq!(space.size(), PAGE_SIZE);

    let mut page = vec![0u8; PAGE_SIZE];
    copy_in(space.page_table(), &mut page, VirtAddr::from(0usize)).unwrap();
    assert_eq!(&page[..image.len()], image);
    // The rest of the frame came zeroed.
    assert!(page[image.len()..].iter().all(|&b| b == 0));
}

#[test]
#[should_panic(expected = "more than a page")]
fn oversized_initial_image_is_rejected() {
    let mut space = AddressSpace::new().unwrap();
    let image = vec![0u8; PAGE_SIZE];
    let _ = space.load_initial_image(&image);
}

#[test]
fn guard_page_loses_user_access_only() {
    let mut space = AddressSpace::new().unwrap();
    let vpn = VirtPageNum(4);
    space
        .map_page(vpn, MapPermission::R | MapPermission::W | MapPermission::U)
        .unwrap();
    space.clear_user_access(vpn);
    let pte = space.page_table().translate(vpn).unwrap();
    assert!(pte.is_valid());
    assert!(!pte.is_user());
    assert_eq!(space.page_table().translate_user(vpn), None);
}

#[test]
#[should_panic(expected = "is not mapped before unmapping")]
fn unmapping_twice_is_rejected() {
    let mut space = AddressSpace::new().unwrap();
    let vpn = VirtPageNum(2);
    space
        .map_page(vpn, MapPermission::R | MapPermission::U)
        .unwrap();
    space.unmap_page(vpn);
    space.unmap_page(vpn);
}

#[test]
fn unmapping_everything_leaves_a_clean_tree() {
    let mut space = AddressSpace::new().unwrap();
    let vpns = [VirtPageNum(0), VirtPageNum(1), VirtPageNum(700)];
    for &vpn in &vpns {
        space
            .map_page(vpn, MapPermission::R | MapPermission::W | MapPermission::U)
            .unwrap();
    }
    for &vpn in &vpns {
        space.unmap_page(vpn);
    }
    space.page_table().assert_empty();
}

//! Mount orchestration tests

mod common;

use common::{build_mounter, pattern, BrokenStore, MemoryPlaceholders, MemoryRamDisks, MemoryStore, TEST_GUID};
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;
use morpheus_ramdisk::registrar::{VIRTUAL_CD_GUID, VIRTUAL_DISK_GUID};
use morpheus_ramdisk::section::{self, ImageStore, SectionType};
use morpheus_ramdisk::uefi::status;
use morpheus_ramdisk::{
    guid, DuplicatePolicy, ImageKind, MountConfig, MountError, Mounter, RegisterError,
};

#[test]
fn test_mount_registers_section_in_place() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(4096))];
    let (mut mounter, ram_disks, placeholders) = build_mounter(stores, MountConfig::default());

    let mount = mounter.mount(TEST_GUID).expect("mount should succeed");
    let base = mount.registration().buffer().as_ptr() as u64;
    let locator = mount.locator().clone();
    assert_eq!(mount.identifier(), &TEST_GUID);
    assert_eq!(mount.registration().kind(), ImageKind::VirtualCd);

    let disks = ram_disks.disks();
    assert_eq!(disks.len(), 1);
    assert_eq!(disks[0].base, base);
    assert_eq!(disks[0].size, 4096);
    assert_eq!(disks[0].disk_type, VIRTUAL_CD_GUID);
    assert_eq!(disks[0].path, locator);

    // Placeholder stays for the rest of the session
    assert_eq!(placeholders.count_for(&TEST_GUID), 1);
    assert!(mounter.is_mounted(&TEST_GUID));
}

#[test]
fn test_mounted_image_reads_back() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(4096))];
    let (mut mounter, _, _) = build_mounter(stores, MountConfig::default());

    let mount = mounter.mount(TEST_GUID).expect("mount should succeed");
    let mut io = mount.block_io();
    assert_eq!(io.size_bytes(), 4096);
    assert_eq!(io.block_size().to_u32(), 2048);
    assert_eq!(io.num_blocks().unwrap(), 2);

    let mut block = vec![0u8; 2048];
    io.read_blocks(Lba(1), &mut block).expect("read should succeed");
    assert_eq!(block, pattern(4096)[2048..]);
}

#[test]
fn test_missing_section_is_not_found() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(512))];
    let (mut mounter, ram_disks, placeholders) = build_mounter(stores, MountConfig::default());

    let missing = guid!("00000000-0000-0000-0000-000000000000");
    assert_eq!(mounter.mount(missing).unwrap_err(), MountError::NotFound);
    assert_eq!(ram_disks.disk_count(), 0);
    assert_eq!(placeholders.count(), 0);
    assert!(mounter.mounts().is_empty());
}

#[test]
fn test_no_image_stores() {
    let (mut mounter, ram_disks, _) = build_mounter(Vec::new(), MountConfig::default());
    assert_eq!(mounter.mount(TEST_GUID).unwrap_err(), MountError::NotFound);
    assert_eq!(ram_disks.disk_count(), 0);
}

#[test]
fn test_permit_policy_mounts_again() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(1024))];
    let (mut mounter, ram_disks, placeholders) = build_mounter(stores, MountConfig::default());
    assert_eq!(mounter.config().duplicate_policy, DuplicatePolicy::Permit);

    let first = mounter.mount(TEST_GUID).expect("first mount").locator().clone();
    let second = mounter.mount(TEST_GUID).expect("second mount").locator().clone();

    assert_ne!(first, second);
    assert_eq!(ram_disks.disk_count(), 2);
    assert_eq!(placeholders.count_for(&TEST_GUID), 2);
    assert_eq!(mounter.mounts().len(), 2);
}

#[test]
fn test_reject_policy_refuses_second_mount() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(1024))];
    let (mut mounter, ram_disks, placeholders) = build_mounter(stores, MountConfig::single_mount());

    mounter.mount(TEST_GUID).expect("first mount");
    assert_eq!(mounter.mount(TEST_GUID).unwrap_err(), MountError::AlreadyMounted);
    assert_eq!(ram_disks.disk_count(), 1);
    assert_eq!(placeholders.count_for(&TEST_GUID), 1);
}

#[test]
fn test_service_unavailable_rolls_back_placeholder() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(1024))];
    let placeholders = MemoryPlaceholders::new();
    let mut mounter = Mounter::new(
        stores,
        MemoryRamDisks::unavailable(),
        placeholders.clone(),
        MountConfig::default(),
    );

    assert_eq!(
        mounter.mount(TEST_GUID).unwrap_err(),
        MountError::Device(RegisterError::ServiceUnavailable)
    );
    assert_eq!(placeholders.count(), 0);
    assert!(mounter.mounts().is_empty());
}

#[test]
fn test_registration_failure_is_device_error() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(1024))];
    let (mut mounter, ram_disks, placeholders) = build_mounter(stores, MountConfig::default());
    ram_disks.fail_register(status::OUT_OF_RESOURCES);

    assert_eq!(
        mounter.mount(TEST_GUID).unwrap_err(),
        MountError::Device(RegisterError::RegistrationFailed(status::OUT_OF_RESOURCES))
    );
    assert_eq!(placeholders.count(), 0);
}

#[test]
fn test_placeholder_failure_stops_before_registration() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(1024))];
    let (mut mounter, ram_disks, placeholders) = build_mounter(stores, MountConfig::default());
    placeholders.fail_install(status::OUT_OF_RESOURCES);

    assert_eq!(
        mounter.mount(TEST_GUID).unwrap_err(),
        MountError::Placeholder(status::OUT_OF_RESOURCES)
    );
    assert_eq!(ram_disks.disk_count(), 0);
}

#[test]
fn test_virtual_disk_configuration() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(1000))];
    let config = MountConfig::with_image_kind(ImageKind::VirtualDisk);
    let (mut mounter, ram_disks, _) = build_mounter(stores, config);

    let mount = mounter.mount(TEST_GUID).expect("mount should succeed");
    let mut io = mount.block_io();
    assert_eq!(io.block_size().to_u32(), 512);
    assert_eq!(io.num_blocks().unwrap(), 2);
    assert_eq!(ram_disks.disks()[0].disk_type, VIRTUAL_DISK_GUID);
    assert_eq!(mount.locator().to_string().split('(').next(), Some("VirtualDisk"));
}

#[test]
fn test_configured_section_type_and_instance() {
    let store = MemoryStore::new()
        .with_section(TEST_GUID, vec![1u8; 512])
        .with_section(TEST_GUID, vec![2u8; 512])
        .with_typed_section(TEST_GUID, SectionType::FreeformSubtypeGuid, vec![3u8; 512]);
    let config = MountConfig {
        section_instance: 1,
        ..MountConfig::default()
    };
    let (mut mounter, _, _) = build_mounter(vec![store.clone()], config);
    let mount = mounter.mount(TEST_GUID).expect("second raw section");
    assert!(mount.registration().buffer().iter().all(|&b| b == 2));

    let config = MountConfig {
        section_type: SectionType::FreeformSubtypeGuid,
        ..MountConfig::default()
    };
    let (mut mounter, _, _) = build_mounter(vec![store], config);
    let mount = mounter.mount(TEST_GUID).expect("freeform section");
    assert!(mount.registration().buffer().iter().all(|&b| b == 3));
}

#[test]
fn test_broken_stores_are_skipped() {
    let stores: Vec<Box<dyn ImageStore>> = vec![
        Box::new(BrokenStore(status::DEVICE_ERROR)),
        Box::new(MemoryStore::new().with_section(TEST_GUID, pattern(512))),
    ];
    let section = section::locate(&stores[..], &TEST_GUID, SectionType::Raw, 0)
        .expect("second store has the section");
    assert_eq!(section.len(), 512);
}

#[test]
fn test_teardown_unregisters_everything() {
    let other = guid!("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
    let stores = vec![MemoryStore::new()
        .with_section(TEST_GUID, pattern(1024))
        .with_section(other, pattern(2048))];
    let (mut mounter, ram_disks, placeholders) = build_mounter(stores, MountConfig::default());

    mounter.mount(TEST_GUID).expect("mount");
    mounter.mount(other).expect("mount");
    assert_eq!(ram_disks.disk_count(), 2);

    assert_eq!(mounter.teardown(), 0);
    assert_eq!(ram_disks.disk_count(), 0);
    assert_eq!(placeholders.count(), 0);
    assert!(mounter.mounts().is_empty());

    // Nothing left to do the second time
    assert_eq!(mounter.teardown(), 0);
}

#[test]
fn test_teardown_keeps_devices_it_cannot_remove() {
    let stores = vec![MemoryStore::new().with_section(TEST_GUID, pattern(1024))];
    let (mut mounter, ram_disks, placeholders) = build_mounter(stores, MountConfig::default());
    mounter.mount(TEST_GUID).expect("mount");

    ram_disks.fail_unregister(Some(status::ACCESS_DENIED));
    assert_eq!(mounter.teardown(), 1);

    // The device still exists and its memory was leaked, not freed
    let disks = ram_disks.disks();
    assert_eq!(disks.len(), 1);
    let bytes = unsafe { std::slice::from_raw_parts(disks[0].base as *const u8, 1024) };
    assert_eq!(bytes, &pattern(1024)[..]);
    assert_eq!(placeholders.count(), 0);
}

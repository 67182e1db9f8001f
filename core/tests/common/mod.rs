//! Common test utilities: in-memory firmware services
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use morpheus_ramdisk::command::StringPackage;
use morpheus_ramdisk::device_path::DevicePath;
use morpheus_ramdisk::lifecycle::CommandTable;
use morpheus_ramdisk::placeholder::{PlaceholderHandle, PlaceholderTable};
use morpheus_ramdisk::registrar::{RamDiskProvider, RamDiskService};
use morpheus_ramdisk::section::{ImageStore, SectionBuffer, SectionType};
use morpheus_ramdisk::uefi::status;
use morpheus_ramdisk::{guid, Guid, MountConfig, MountError, MountService, Mounter, Status};

pub const TEST_GUID: Guid = guid!("12345678-1234-1234-1234-123456789abc");

/// Stores, RAM disk service and placeholder table the tests can inspect
pub type TestMounter = Mounter<Vec<MemoryStore>, MemoryRamDisks, MemoryPlaceholders>;

/// Build a mounter over `stores`, returning handles to its fake services
pub fn build_mounter(
    stores: Vec<MemoryStore>,
    config: MountConfig,
) -> (TestMounter, MemoryRamDisks, MemoryPlaceholders) {
    let ram_disks = MemoryRamDisks::new();
    let placeholders = MemoryPlaceholders::new();
    let mounter = Mounter::new(stores, ram_disks.clone(), placeholders.clone(), config);
    (mounter, ram_disks, placeholders)
}

/// Bytes `0, 1, 2, ...` wrapping at 256
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// IMAGE STORES
// ═══════════════════════════════════════════════════════════════════════════

/// In-memory firmware volume
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sections: Vec<(Guid, SectionType, Vec<u8>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw section
    pub fn with_section(self, name: Guid, data: Vec<u8>) -> Self {
        self.with_typed_section(name, SectionType::Raw, data)
    }

    pub fn with_typed_section(mut self, name: Guid, section_type: SectionType, data: Vec<u8>) -> Self {
        self.sections.push((name, section_type, data));
        self
    }
}

impl ImageStore for MemoryStore {
    fn read_section(
        &self,
        name: &Guid,
        section_type: SectionType,
        instance: usize,
    ) -> Result<SectionBuffer, Status> {
        self.sections
            .iter()
            .filter(|(n, t, _)| n == name && *t == section_type)
            .nth(instance)
            .map(|(_, _, data)| SectionBuffer::from(data.clone()))
            .ok_or(status::NOT_FOUND)
    }
}

/// Image store that always fails with the given status
pub struct BrokenStore(pub Status);

impl ImageStore for BrokenStore {
    fn read_section(&self, _: &Guid, _: SectionType, _: usize) -> Result<SectionBuffer, Status> {
        Err(self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RAM DISK SERVICE
// ═══════════════════════════════════════════════════════════════════════════

/// One entry in the fake device registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredDisk {
    pub base: u64,
    pub size: u64,
    pub disk_type: Guid,
    pub path: DevicePath,
}

#[derive(Debug)]
struct RamDiskState {
    available: bool,
    disks: Vec<RegisteredDisk>,
    next_instance: u16,
    fail_register: Option<Status>,
    fail_unregister: Option<Status>,
}

/// Fake RAM disk protocol; clones share one registry
#[derive(Debug, Clone)]
pub struct MemoryRamDisks {
    state: Rc<RefCell<RamDiskState>>,
}

impl MemoryRamDisks {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(RamDiskState {
                available: true,
                disks: Vec::new(),
                next_instance: 0,
                fail_register: None,
                fail_unregister: None,
            })),
        }
    }

    /// Provider whose protocol is not installed
    pub fn unavailable() -> Self {
        let disks = Self::new();
        disks.state.borrow_mut().available = false;
        disks
    }

    pub fn disks(&self) -> Vec<RegisteredDisk> {
        self.state.borrow().disks.clone()
    }

    pub fn disk_count(&self) -> usize {
        self.state.borrow().disks.len()
    }

    pub fn fail_register(&self, status: Status) {
        self.state.borrow_mut().fail_register = Some(status);
    }

    pub fn fail_unregister(&self, status: Option<Status>) {
        self.state.borrow_mut().fail_unregister = status;
    }
}

impl RamDiskProvider for MemoryRamDisks {
    type Service = MemoryRamDisk;

    fn locate(&self) -> Option<MemoryRamDisk> {
        self.state.borrow().available.then(|| MemoryRamDisk {
            state: self.state.clone(),
        })
    }
}

pub struct MemoryRamDisk {
    state: Rc<RefCell<RamDiskState>>,
}

impl RamDiskService for MemoryRamDisk {
    fn register(&mut self, base: u64, size: u64, disk_type: &Guid) -> Result<DevicePath, Status> {
        let mut state = self.state.borrow_mut();
        if let Some(status) = state.fail_register {
            return Err(status);
        }
        let instance = state.next_instance;
        state.next_instance += 1;
        let path = DevicePath::ram_disk(base, base + size - 1, disk_type, instance);
        state.disks.push(RegisteredDisk {
            base,
            size,
            disk_type: *disk_type,
            path: path.clone(),
        });
        Ok(path)
    }

    fn unregister(&mut self, path: &DevicePath) -> Result<(), Status> {
        let mut state = self.state.borrow_mut();
        if let Some(status) = state.fail_unregister {
            return Err(status);
        }
        let index = state
            .disks
            .iter()
            .position(|disk| disk.path == *path)
            .ok_or(status::NOT_FOUND)?;
        state.disks.remove(index);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PLACEHOLDER TABLE
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct PlaceholderState {
    installed: Vec<PlaceholderHandle>,
    next_handle: usize,
    fail_install: Option<Status>,
}

/// Fake handle database; clones share one table
#[derive(Debug, Clone, Default)]
pub struct MemoryPlaceholders {
    state: Rc<RefCell<PlaceholderState>>,
}

impl MemoryPlaceholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.state.borrow().installed.len()
    }

    pub fn count_for(&self, identifier: &Guid) -> usize {
        self.state
            .borrow()
            .installed
            .iter()
            .filter(|h| h.identifier() == identifier)
            .count()
    }

    pub fn fail_install(&self, status: Status) {
        self.state.borrow_mut().fail_install = Some(status);
    }
}

impl PlaceholderTable for MemoryPlaceholders {
    fn install(&mut self, identifier: &Guid) -> Result<PlaceholderHandle, Status> {
        let mut state = self.state.borrow_mut();
        if let Some(status) = state.fail_install {
            return Err(status);
        }
        state.next_handle += 1;
        let handle = PlaceholderHandle::new(*identifier, state.next_handle);
        state.installed.push(handle);
        Ok(handle)
    }

    fn is_installed(&self, identifier: &Guid) -> bool {
        self.count_for(identifier) > 0
    }

    fn uninstall(&mut self, handle: PlaceholderHandle) -> Result<(), Status> {
        let mut state = self.state.borrow_mut();
        let index = state
            .installed
            .iter()
            .position(|h| *h == handle)
            .ok_or(status::NOT_FOUND)?;
        state.installed.remove(index);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SHELL COMMAND TABLE
// ═══════════════════════════════════════════════════════════════════════════

/// Records what the lifecycle hooks registered
#[derive(Debug, Default)]
pub struct MockCommandTable {
    pub strings: Vec<(usize, &'static str)>,
    pub commands: Vec<&'static str>,
    pub reject_strings: bool,
    pub reject_command: Option<Status>,
    pub reject_unregister: Option<Status>,
    next_id: usize,
}

impl MockCommandTable {
    /// Refuses every string package
    pub fn rejecting_strings() -> Self {
        Self {
            reject_strings: true,
            ..Default::default()
        }
    }

    /// Accepts strings but refuses the command with `status`
    pub fn rejecting_command(status: Status) -> Self {
        Self {
            reject_command: Some(status),
            ..Default::default()
        }
    }
}

impl CommandTable for MockCommandTable {
    type Strings = usize;

    fn add_strings(&mut self, package: &'static StringPackage) -> Option<usize> {
        if self.reject_strings {
            return None;
        }
        self.next_id += 1;
        self.strings.push((self.next_id, package.language));
        Some(self.next_id)
    }

    fn remove_strings(&mut self, strings: usize) {
        self.strings.retain(|(id, _)| *id != strings);
    }

    fn register_command(&mut self, name: &'static str, _strings: &usize) -> Result<(), Status> {
        if let Some(status) = self.reject_command {
            return Err(status);
        }
        self.commands.push(name);
        Ok(())
    }

    fn unregister_command(&mut self, name: &'static str) -> Result<(), Status> {
        if let Some(status) = self.reject_unregister {
            return Err(status);
        }
        self.commands.retain(|c| *c != name);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MOUNT SERVICE SPY
// ═══════════════════════════════════════════════════════════════════════════

/// Records every mount request and answers with a canned result
pub struct SpyMounter {
    pub calls: Vec<Guid>,
    pub result: Result<DevicePath, MountError>,
}

impl SpyMounter {
    pub fn returning(result: Result<DevicePath, MountError>) -> Self {
        Self {
            calls: Vec::new(),
            result,
        }
    }
}

impl MountService for SpyMounter {
    fn mount(&mut self, identifier: Guid) -> Result<DevicePath, MountError> {
        self.calls.push(identifier);
        self.result.clone()
    }
}

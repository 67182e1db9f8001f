//! `EFI_RAM_DISK_PROTOCOL` backend for the registrar.

use core::ffi::c_void;
use core::ptr::{self, NonNull};

use log::warn;
use uguid::Guid;

use super::bindings::{status, BootServices, RamDiskProtocol, RAM_DISK_PROTOCOL_GUID};
use super::boot;
use crate::device_path::DevicePath;
use crate::registrar::{RamDiskProvider, RamDiskService};
use crate::Status;

/// Looks the RAM disk protocol up on every use.
pub struct UefiRamDisks {
    bs: &'static BootServices,
}

impl UefiRamDisks {
    pub fn new(bs: &'static BootServices) -> Self {
        Self { bs }
    }
}

impl RamDiskProvider for UefiRamDisks {
    type Service = UefiRamDisk;

    fn locate(&self) -> Option<UefiRamDisk> {
        // SAFETY: RAM_DISK_PROTOCOL_GUID names a RamDiskProtocol
        unsafe { boot::locate_protocol::<RamDiskProtocol>(self.bs, &RAM_DISK_PROTOCOL_GUID) }
            .ok()
            .map(|protocol| UefiRamDisk {
                protocol,
                bs: self.bs,
            })
    }
}

pub struct UefiRamDisk {
    protocol: NonNull<RamDiskProtocol>,
    bs: &'static BootServices,
}

impl RamDiskService for UefiRamDisk {
    fn register(&mut self, base: u64, size: u64, disk_type: &Guid) -> Result<DevicePath, Status> {
        let mut path: *mut c_void = ptr::null_mut();
        // SAFETY: located interface; the caller keeps the region alive
        let result = unsafe {
            (self.protocol.as_ref().register)(base, size, disk_type, ptr::null(), &mut path)
        };
        status::to_result(result)?;

        // SAFETY: Register returns a pool copy of the new device's path
        let owned = unsafe { DevicePath::from_raw(path.cast()) };
        if !path.is_null() {
            let _ = (self.bs.free_pool)(path.cast());
        }

        Ok(owned.unwrap_or_else(|| {
            warn!("RAM disk service returned no usable device path");
            DevicePath::ram_disk(base, base + size - 1, disk_type, 0)
        }))
    }

    fn unregister(&mut self, path: &DevicePath) -> Result<(), Status> {
        // SAFETY: `path` is an end-terminated device path
        let result = unsafe { (self.protocol.as_ref().unregister)(path.as_ptr().cast()) };
        status::to_result(result)
    }
}

//! Firmware volumes as image stores.

use core::ffi::c_void;
use core::ptr::{self, NonNull};

use log::{debug, warn};
use uguid::Guid;

use super::bindings::{status, BootServices, FirmwareVolume2Protocol, FIRMWARE_VOLUME2_PROTOCOL_GUID};
use super::boot;
use crate::section::{ImageStore, ImageStores, SectionBuffer, SectionType};
use crate::Status;

/// One `EFI_FIRMWARE_VOLUME2_PROTOCOL` instance.
pub struct FirmwareVolume {
    protocol: NonNull<FirmwareVolume2Protocol>,
    bs: &'static BootServices,
}

impl FirmwareVolume {
    /// # Safety
    /// `protocol` must be a live FV2 interface.
    pub unsafe fn new(protocol: NonNull<FirmwareVolume2Protocol>, bs: &'static BootServices) -> Self {
        Self { protocol, bs }
    }
}

impl ImageStore for FirmwareVolume {
    fn read_section(
        &self,
        name: &Guid,
        section_type: SectionType,
        instance: usize,
    ) -> Result<SectionBuffer, Status> {
        let mut buffer: *mut c_void = ptr::null_mut();
        let mut size = 0usize;
        let mut authentication = 0u32;

        // SAFETY: a null buffer asks the volume to allocate from pool
        let result = unsafe {
            let fv = self.protocol.as_ref();
            (fv.read_section)(
                fv,
                name,
                section_type.as_raw(),
                instance,
                &mut buffer,
                &mut size,
                &mut authentication,
            )
        };
        status::to_result(result)?;

        match NonNull::new(buffer.cast::<u8>()) {
            // SAFETY: ReadSection allocated `size` bytes from pool for us
            Some(ptr) => Ok(unsafe { SectionBuffer::from_pool(ptr, size, self.bs.free_pool) }),
            None => Ok(SectionBuffer::from(alloc::vec::Vec::new())),
        }
    }
}

/// All firmware volumes present when searched.
///
/// Handles are enumerated again on every search so volumes published after
/// load are seen.
pub struct FirmwareVolumes {
    bs: &'static BootServices,
}

impl FirmwareVolumes {
    pub fn new(bs: &'static BootServices) -> Self {
        Self { bs }
    }
}

impl ImageStores for FirmwareVolumes {
    /// Visits volumes in `LocateHandleBuffer` order. The volume this image
    /// was loaded from gets no priority.
    fn find_map<T, F>(&self, mut visit: F) -> Option<T>
    where
        F: FnMut(usize, &dyn ImageStore) -> Option<T>,
    {
        // SAFETY: `bs` is the boot services table we were loaded with
        let handles = match unsafe { boot::locate_handle_buffer(self.bs, &FIRMWARE_VOLUME2_PROTOCOL_GUID) } {
            Ok(handles) => handles,
            Err(status) => {
                warn!("no firmware volumes ({:#x})", status);
                return None;
            }
        };
        debug!("searching {} firmware volumes", handles.as_slice().len());

        handles
            .as_slice()
            .iter()
            .enumerate()
            .find_map(|(index, &handle)| {
                // SAFETY: handle came from LocateHandleBuffer for this protocol
                let protocol = unsafe {
                    boot::handle_protocol::<FirmwareVolume2Protocol>(
                        self.bs,
                        handle,
                        &FIRMWARE_VOLUME2_PROTOCOL_GUID,
                    )
                };
                match protocol {
                    // SAFETY: interface is live while the handle is
                    Ok(protocol) => visit(index, &unsafe { FirmwareVolume::new(protocol, self.bs) }),
                    Err(status) => {
                        warn!("firmware volume {}: HandleProtocol failed ({:#x})", index, status);
                        None
                    }
                }
            })
    }
}

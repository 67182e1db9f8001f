//! Block-Device Registrar
//!
//! Exposes a memory buffer as a RAM disk through the firmware's RAM disk
//! service. The buffer is never copied: the service reads through the
//! original memory, so a registration owns its buffer for as long as the
//! device exists.

use log::{error, info};
use uguid::{guid, Guid};

use crate::device_path::DevicePath;
use crate::error::RegisterError;
use crate::section::SectionBuffer;
use crate::Status;

/// RAM disk type: virtual disk (`EFI_VIRTUAL_DISK_GUID`).
pub const VIRTUAL_DISK_GUID: Guid = guid!("77ab535a-45fc-624b-5560-f7b281d1f96e");

/// RAM disk type: virtual CD (`EFI_VIRTUAL_CD_GUID`).
pub const VIRTUAL_CD_GUID: Guid = guid!("3d5abd30-4175-87ce-6d64-d2ade523c4bb");

/// Kind of image held in a RAM disk.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    VirtualCd = 0,
    VirtualDisk = 1,
}

impl ImageKind {
    /// RAM disk type GUID presented to the service.
    pub const fn type_guid(self) -> Guid {
        match self {
            Self::VirtualCd => VIRTUAL_CD_GUID,
            Self::VirtualDisk => VIRTUAL_DISK_GUID,
        }
    }

    /// Logical block size of the resulting device.
    pub const fn block_size(self) -> u32 {
        match self {
            Self::VirtualCd => 2048,
            Self::VirtualDisk => 512,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VirtualCd => "VirtualCD",
            Self::VirtualDisk => "VirtualDisk",
        }
    }
}

impl TryFrom<u32> for ImageKind {
    type Error = RegisterError;

    fn try_from(tag: u32) -> Result<Self, RegisterError> {
        match tag {
            0 => Ok(Self::VirtualCd),
            1 => Ok(Self::VirtualDisk),
            other => Err(RegisterError::Unsupported(other)),
        }
    }
}

/// The RAM disk service contract (`EFI_RAM_DISK_PROTOCOL`).
pub trait RamDiskService {
    /// Register `size` bytes at `base` as a RAM disk of type `disk_type`.
    fn register(&mut self, base: u64, size: u64, disk_type: &Guid) -> Result<DevicePath, Status>;

    /// Remove the RAM disk identified by `path`.
    fn unregister(&mut self, path: &DevicePath) -> Result<(), Status>;
}

/// Finds the RAM disk service in the running environment.
pub trait RamDiskProvider {
    type Service: RamDiskService;

    fn locate(&self) -> Option<Self::Service>;
}

/// A live RAM disk and the memory backing it.
#[derive(Debug)]
pub struct BlockDeviceRegistration {
    buffer: SectionBuffer,
    kind: ImageKind,
    locator: DevicePath,
}

impl BlockDeviceRegistration {
    /// Memory the device reads through.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn type_guid(&self) -> Guid {
        self.kind.type_guid()
    }

    /// Device path returned by the service.
    pub fn locator(&self) -> &DevicePath {
        &self.locator
    }

    /// Drop the registration but keep its memory alive forever.
    ///
    /// Used when the device could not be removed from the service.
    pub fn leak(self) -> &'static [u8] {
        self.buffer.leak()
    }
}

/// Registers buffers with the RAM disk service.
pub struct Registrar<P> {
    provider: P,
}

impl<P: RamDiskProvider> Registrar<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Register a region in place.
    ///
    /// Panics if `region` is empty.
    ///
    /// # Safety
    /// The service keeps reading `region` after this returns. The caller must
    /// keep the memory alive and unchanged until the device is unregistered.
    pub unsafe fn register_region(
        &self,
        region: &[u8],
        kind: ImageKind,
    ) -> Result<DevicePath, RegisterError> {
        assert!(!region.is_empty(), "RAM disk region must not be empty");

        let disk_type = kind.type_guid();
        let mut service = self.provider.locate().ok_or_else(|| {
            error!("couldn't find the RAM disk protocol");
            RegisterError::ServiceUnavailable
        })?;

        let base = region.as_ptr() as u64;
        let locator = service
            .register(base, region.len() as u64, &disk_type)
            .map_err(|status| {
                error!("failed to register RAM disk ({:#x})", status);
                RegisterError::RegistrationFailed(status)
            })?;

        info!(
            "registered {} bytes at {:#x} as {} -> {}",
            region.len(),
            base,
            kind.as_str(),
            locator
        );
        Ok(locator)
    }

    /// Register `buffer` and move it into the returned registration.
    pub fn register(
        &self,
        buffer: SectionBuffer,
        kind: ImageKind,
    ) -> Result<BlockDeviceRegistration, RegisterError> {
        // SAFETY: the buffer moves into the registration, which outlives the
        // device until `unregister` succeeds or the memory is leaked.
        let locator = unsafe { self.register_region(&buffer, kind)? };
        Ok(BlockDeviceRegistration {
            buffer,
            kind,
            locator,
        })
    }

    /// Register `buffer` using a raw kind tag.
    ///
    /// Unknown tags fail with `Unsupported` before the service is located.
    pub fn register_tagged(
        &self,
        buffer: SectionBuffer,
        tag: u32,
    ) -> Result<BlockDeviceRegistration, RegisterError> {
        let kind = ImageKind::try_from(tag)?;
        self.register(buffer, kind)
    }

    /// Remove the device. The buffer may only be freed after this succeeds.
    pub fn unregister(&self, registration: &BlockDeviceRegistration) -> Result<(), RegisterError> {
        let mut service = self
            .provider
            .locate()
            .ok_or(RegisterError::ServiceUnavailable)?;
        service
            .unregister(&registration.locator)
            .map_err(RegisterError::UnregistrationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags() {
        assert_eq!(ImageKind::try_from(0), Ok(ImageKind::VirtualCd));
        assert_eq!(ImageKind::try_from(1), Ok(ImageKind::VirtualDisk));
        assert_eq!(ImageKind::try_from(7), Err(RegisterError::Unsupported(7)));
    }

    #[test]
    fn kind_type_guids() {
        assert_eq!(
            ImageKind::VirtualCd.type_guid(),
            guid!("3D5ABD30-4175-87CE-6D64-D2ADE523C4BB")
        );
        assert_eq!(
            ImageKind::VirtualDisk.type_guid(),
            guid!("77AB535A-45FC-624B-5560-F7B281D1F96E")
        );
    }
}

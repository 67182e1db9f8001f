//! Boot-phase hand-off records.
//!
//! The early phase publishes where the firmware volumes live and copies the
//! flattened device tree it was started with; the DXE phase picks them up to
//! build its image stores and hardware description.
//!
//! A record whose source fails validation is not published. Publication of
//! the other records carries on.

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{debug, info, warn};
use thiserror::Error;
use uguid::{guid, Guid};

use crate::config::PlatformVolumes;

/// `EFI_FIRMWARE_FILE_SYSTEM3_GUID`
pub const FFS3_GUID: Guid = guid!("5473c07a-3dcb-4dca-bd6f-1e9689e7349a");

/// Flattened device tree magic (big-endian on the wire)
pub const FDT_MAGIC: u32 = 0xd00d_feed;

/// Oldest header version we accept
pub const FDT_FIRST_SUPPORTED_VERSION: u32 = 0x02;

/// Newest `last_comp_version` we understand
pub const FDT_LAST_SUPPORTED_VERSION: u32 = 0x11;

/// magic..last_comp_version
const FDT_V1_HEADER_LEN: usize = 28;

/// Errors while validating a hand-off source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandoffError {
    /// Blob shorter than the fixed header fields
    #[error("device tree header is truncated")]
    TruncatedHeader,
    /// Header magic is not 0xd00dfeed
    #[error("device tree magic mismatch ({0:#010x})")]
    InvalidMagic(u32),
    /// Header version outside the supported range
    #[error("unsupported device tree version {version} (last compatible {last_comp})")]
    UnsupportedVersion { version: u32, last_comp: u32 },
    /// Size or block offsets inconsistent with the blob
    #[error("device tree layout is inconsistent")]
    BadLayout,
}

/// A published hand-off record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffRecord {
    /// Memory-mapped firmware volume.
    FirmwareVolume {
        base: u64,
        size: u64,
        /// File system format, when the consumer has to be told.
        format: Option<Guid>,
    },
    /// Copy of the flattened device tree.
    DeviceTree { data: Box<[u8]> },
}

/// Records published so far, in publication order.
#[derive(Debug, Default)]
pub struct HandoffList {
    records: Vec<HandoffRecord>,
}

impl HandoffList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[HandoffRecord] {
        &self.records
    }

    /// Published firmware volumes as `(base, size, format)`.
    pub fn firmware_volumes(&self) -> impl Iterator<Item = (u64, u64, Option<Guid>)> + '_ {
        self.records.iter().filter_map(|r| match r {
            HandoffRecord::FirmwareVolume { base, size, format } => Some((*base, *size, *format)),
            HandoffRecord::DeviceTree { .. } => None,
        })
    }

    /// The published device tree, if any.
    pub fn device_tree(&self) -> Option<&[u8]> {
        self.records.iter().find_map(|r| match r {
            HandoffRecord::DeviceTree { data } => Some(&data[..]),
            HandoffRecord::FirmwareVolume { .. } => None,
        })
    }

    pub fn publish_firmware_volume(&mut self, base: u64, size: u64, format: Option<Guid>) {
        info!("publishing FV at {:#x}, size {:#x}", base, size);
        self.records
            .push(HandoffRecord::FirmwareVolume { base, size, format });
    }

    /// Validate `blob` as a flattened device tree and publish a copy of it.
    ///
    /// Bytes past the header's `totalsize` are not copied.
    pub fn publish_device_tree(&mut self, blob: &[u8]) -> Result<(), HandoffError> {
        let total = check_fdt_header(blob).inspect_err(|err| {
            warn!("FDT header is invalid: {}", err);
        })?;

        info!("installing FDT record with length {}", total);
        self.records.push(HandoffRecord::DeviceTree {
            data: blob[..total].into(),
        });
        Ok(())
    }
}

/// Let later phases know about the DXE volume and the embedded (ramdisk)
/// volume. The embedded volume is FFS3-formatted.
pub fn publish_platform_volumes(volumes: &PlatformVolumes, list: &mut HandoffList) {
    debug!("platform firmware volume initialization");
    list.publish_firmware_volume(volumes.dxe_fv_base, volumes.dxe_fv_size, None);
    list.publish_firmware_volume(
        volumes.embedded_fv_base,
        volumes.embedded_fv_size,
        Some(FFS3_GUID),
    );
}

fn be32(blob: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        blob[offset],
        blob[offset + 1],
        blob[offset + 2],
        blob[offset + 3],
    ])
}

/// Check a flattened device tree header and return its total size.
pub fn check_fdt_header(blob: &[u8]) -> Result<usize, HandoffError> {
    if blob.len() < FDT_V1_HEADER_LEN {
        return Err(HandoffError::TruncatedHeader);
    }

    let magic = be32(blob, 0);
    if magic != FDT_MAGIC {
        return Err(HandoffError::InvalidMagic(magic));
    }

    let version = be32(blob, 20);
    let last_comp = be32(blob, 24);
    if version < FDT_FIRST_SUPPORTED_VERSION || last_comp > FDT_LAST_SUPPORTED_VERSION {
        return Err(HandoffError::UnsupportedVersion { version, last_comp });
    }

    let header_len = match version {
        v if v >= 17 => 40,
        v if v >= 3 => 36,
        _ => 32,
    };

    let total = be32(blob, 4) as usize;
    if total < header_len || total > blob.len() {
        return Err(HandoffError::BadLayout);
    }

    let off_struct = be32(blob, 8) as usize;
    let off_strings = be32(blob, 12) as usize;
    let off_rsvmap = be32(blob, 16) as usize;
    for offset in [off_struct, off_strings, off_rsvmap] {
        if offset < header_len || offset > total {
            return Err(HandoffError::BadLayout);
        }
    }

    Ok(total)
}

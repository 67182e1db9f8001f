//! Mount and platform configuration.

use crate::registrar::ImageKind;
use crate::section::SectionType;

/// What the orchestrator does when an identifier already has a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Log the collision and mount again; every mount yields a new device.
    #[default]
    Permit,
    /// Refuse the second mount with `AlreadyMounted`.
    Reject,
}

/// Mount orchestration configuration.
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// RAM disk type presented to the registrar.
    pub image_kind: ImageKind,
    /// Section type looked up in the image stores.
    pub section_type: SectionType,
    /// Section instance within the matching file.
    pub section_instance: usize,
    /// Collision handling for repeated identifiers.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            image_kind: ImageKind::VirtualCd,
            section_type: SectionType::Raw,
            section_instance: 0,
            duplicate_policy: DuplicatePolicy::Permit,
        }
    }
}

impl MountConfig {
    /// Default configuration, but refuse to mount an identifier twice.
    pub fn single_mount() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Reject,
            ..Default::default()
        }
    }

    /// Register sections as virtual disks instead of virtual CDs.
    pub fn with_image_kind(image_kind: ImageKind) -> Self {
        Self {
            image_kind,
            ..Default::default()
        }
    }
}

/// Location of the platform's memory-mapped firmware volumes.
///
/// Published as hand-off records by [`crate::handoff::publish_platform_volumes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformVolumes {
    /// DXE firmware volume base address.
    pub dxe_fv_base: u64,
    /// DXE firmware volume size in bytes.
    pub dxe_fv_size: u64,
    /// Embedded (ramdisk) firmware volume base address.
    pub embedded_fv_base: u64,
    /// Embedded firmware volume size in bytes.
    pub embedded_fv_size: u64,
}


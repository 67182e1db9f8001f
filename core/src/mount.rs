//! Mount Orchestrator
//!
//! One mount runs through three steps:
//!
//! ```text
//!   InstallPlaceholder ──► Locate ──► Register ──► Success
//!          │                  │           │
//!          ▼                  ▼           ▼
//!   AlreadyMounted /      NotFound    Device(..)
//!   Placeholder(..)
//! ```
//!
//! The placeholder goes in before the (slow) section load so a repeated
//! mount of the same GUID can see it. Successful mounts are retained for the
//! rest of the boot session together with their placeholder; failed steps
//! remove the placeholder again.

use alloc::vec::Vec;

use log::{error, info, warn};
use uguid::Guid;

use crate::block_io::RamDiskBlockIo;
use crate::config::{DuplicatePolicy, MountConfig};
use crate::device_path::DevicePath;
use crate::error::MountError;
use crate::placeholder::{PlaceholderHandle, PlaceholderTable};
use crate::registrar::{BlockDeviceRegistration, RamDiskProvider, Registrar};
use crate::section::{self, ImageStores};

/// A mounted section.
#[derive(Debug)]
pub struct Mount {
    identifier: Guid,
    placeholder: PlaceholderHandle,
    registration: BlockDeviceRegistration,
}

impl Mount {
    pub fn identifier(&self) -> &Guid {
        &self.identifier
    }

    pub fn placeholder(&self) -> PlaceholderHandle {
        self.placeholder
    }

    pub fn registration(&self) -> &BlockDeviceRegistration {
        &self.registration
    }

    /// Device path of the RAM disk.
    pub fn locator(&self) -> &DevicePath {
        self.registration.locator()
    }

    /// Read-only block view of the mounted image.
    pub fn block_io(&self) -> RamDiskBlockIo<'_> {
        RamDiskBlockIo::new(
            self.registration.buffer(),
            self.registration.kind().block_size(),
        )
    }
}

/// What the command front-end needs from the orchestrator.
pub trait MountService {
    /// Mount `identifier` and return the new device's path.
    fn mount(&mut self, identifier: Guid) -> Result<DevicePath, MountError>;
}

/// Composes image stores, the registrar and the placeholder table.
pub struct Mounter<S, P, H> {
    stores: S,
    registrar: Registrar<P>,
    placeholders: H,
    config: MountConfig,
    mounts: Vec<Mount>,
}

impl<S, P, H> Mounter<S, P, H>
where
    S: ImageStores,
    P: RamDiskProvider,
    H: PlaceholderTable,
{
    pub fn new(stores: S, provider: P, placeholders: H, config: MountConfig) -> Self {
        Self {
            stores,
            registrar: Registrar::new(provider),
            placeholders,
            config,
            mounts: Vec::new(),
        }
    }

    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    /// Mounts made during this session, oldest first.
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    pub fn is_mounted(&self, identifier: &Guid) -> bool {
        self.mounts.iter().any(|m| m.identifier == *identifier)
    }

    /// Load section `identifier` from any image store and register it as a
    /// RAM disk.
    pub fn mount(&mut self, identifier: Guid) -> Result<&Mount, MountError> {
        if self.placeholders.is_installed(&identifier) {
            match self.config.duplicate_policy {
                DuplicatePolicy::Reject => {
                    warn!("{} is already mounted", identifier);
                    return Err(MountError::AlreadyMounted);
                }
                DuplicatePolicy::Permit => {
                    warn!("{} is already mounted, mounting another copy", identifier);
                }
            }
        }

        let placeholder = self.placeholders.install(&identifier).map_err(|status| {
            error!("couldn't install placeholder for {} ({:#x})", identifier, status);
            MountError::Placeholder(status)
        })?;

        let registration = match self.load_and_register(&identifier) {
            Ok(registration) => registration,
            Err(err) => {
                self.release_placeholder(placeholder);
                return Err(err);
            }
        };

        let index = self.mounts.len();
        self.mounts.push(Mount {
            identifier,
            placeholder,
            registration,
        });
        Ok(&self.mounts[index])
    }

    fn load_and_register(&self, identifier: &Guid) -> Result<BlockDeviceRegistration, MountError> {
        let section = section::locate(
            &self.stores,
            identifier,
            self.config.section_type,
            self.config.section_instance,
        )
        .map_err(|err| {
            info!("{}: {}", identifier, err);
            MountError::from(err)
        })?;

        info!("loading image of size {} into ramdisk", section.len());
        Ok(self.registrar.register(section.data, self.config.image_kind)?)
    }

    fn release_placeholder(&mut self, placeholder: PlaceholderHandle) {
        if let Err(status) = self.placeholders.uninstall(placeholder) {
            warn!(
                "couldn't remove placeholder for {} ({:#x})",
                placeholder.identifier(),
                status
            );
        }
    }

    /// Unregister every mount and drop its placeholder.
    ///
    /// Returns the number of images whose device could not be removed; their
    /// memory is leaked so the device never reads freed memory.
    pub fn teardown(&mut self) -> usize {
        let mut leaked = 0;
        for mount in self.mounts.drain(..) {
            match self.registrar.unregister(&mount.registration) {
                Ok(()) => info!("unmounted {}", mount.identifier),
                Err(err) => {
                    warn!("keeping {} mapped: {}", mount.identifier, err);
                    mount.registration.leak();
                    leaked += 1;
                }
            }
            if let Err(status) = self.placeholders.uninstall(mount.placeholder) {
                warn!(
                    "couldn't remove placeholder for {} ({:#x})",
                    mount.identifier, status
                );
            }
        }
        leaked
    }
}

impl<S, P, H> MountService for Mounter<S, P, H>
where
    S: ImageStores,
    P: RamDiskProvider,
    H: PlaceholderTable,
{
    fn mount(&mut self, identifier: Guid) -> Result<DevicePath, MountError> {
        Mounter::mount(self, identifier).map(|m| m.locator().clone())
    }
}

impl<S, P, H> Drop for Mounter<S, P, H> {
    fn drop(&mut self) {
        // Devices still registered keep reading their buffers.
        for mount in self.mounts.drain(..) {
            mount.registration.leak();
        }
    }
}

//! Morpheus Embedded RAM Disk
//!
//! Mounts a raw section stored in a firmware volume as a RAM disk, driven by
//! the `embeddedramdisk <GUID>` shell command.
//!
//! ```text
//!   command (front-end)
//!        │
//!        ▼
//!   mount::Mounter ──► placeholder table
//!        │
//!        ├──► section::locate ──► every image store (FV2)
//!        └──► registrar::Registrar ──► RAM disk service
//! ```
//!
//! The crate is `no_std` + `alloc`. Everything that touches firmware lives in
//! [`uefi`]; the rest is written against small traits so it runs under
//! `cargo test` on the host.

#![no_std]
#![allow(clippy::new_without_default)]

extern crate alloc;

pub mod block_io;
pub mod command;
pub mod config;
pub mod device_path;
pub mod error;
pub mod handoff;
pub mod lifecycle;
pub mod logger;
pub mod mount;
pub mod placeholder;
pub mod registrar;
pub mod section;
pub mod uefi;

pub use uguid::{guid, Guid};

pub use config::{DuplicatePolicy, MountConfig};
pub use error::{LocateError, MountError, RegisterError};
pub use mount::{Mount, MountService, Mounter};
pub use registrar::{BlockDeviceRegistration, ImageKind, Registrar};
pub use section::{Section, SectionBuffer, SectionType};

/// Raw UEFI status code.
pub type Status = usize;

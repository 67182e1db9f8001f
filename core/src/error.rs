//! Error types shared by the locator, registrar and mount orchestrator.
//!
//! Firmware failures keep the raw status code so the caller can print it.
//! Argument and hand-off errors live next to the code that produces them
//! ([`crate::command::ArgError`], [`crate::handoff::HandoffError`]).

use crate::Status;
use thiserror::Error;

/// Section lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocateError {
    /// No image store holds a non-empty section with that name and type
    #[error("section not found in any image store")]
    NotFound,
}

/// RAM disk registration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Image kind tag has no RAM disk type GUID
    #[error("unsupported image kind {0}")]
    Unsupported(u32),
    /// RAM disk protocol not installed
    #[error("RAM disk service unavailable")]
    ServiceUnavailable,
    /// RAM disk protocol rejected the request
    #[error("RAM disk registration failed (status {0:#x})")]
    RegistrationFailed(Status),
    /// RAM disk protocol refused to remove the device
    #[error("RAM disk unregistration failed (status {0:#x})")]
    UnregistrationFailed(Status),
}

/// Mount failure, as seen by the command front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MountError {
    /// Identifier absent from every image store
    #[error("section not found")]
    NotFound,
    /// Identifier already carries a placeholder (reject policy only)
    #[error("section is already mounted")]
    AlreadyMounted,
    /// Placeholder handle could not be installed
    #[error("placeholder install failed (status {0:#x})")]
    Placeholder(Status),
    /// Block-device registration failed
    #[error(transparent)]
    Device(#[from] RegisterError),
}

impl From<LocateError> for MountError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::NotFound => Self::NotFound,
        }
    }
}

//! Placeholder handles.
//!
//! Before a section is loaded, a handle carrying the section GUID as an
//! (interface-less) protocol is installed. A later mount of the same GUID can
//! see it and detect the collision.

use uguid::Guid;

use crate::Status;

/// A placeholder installed for one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderHandle {
    identifier: Guid,
    raw: usize,
}

impl PlaceholderHandle {
    /// Wrap a firmware handle (or any table-specific key).
    pub const fn new(identifier: Guid, raw: usize) -> Self {
        Self { identifier, raw }
    }

    pub fn identifier(&self) -> &Guid {
        &self.identifier
    }

    /// The firmware handle value.
    pub fn raw(&self) -> usize {
        self.raw
    }
}

/// Where placeholders live (the firmware handle database).
pub trait PlaceholderTable {
    /// Install a new placeholder keyed by `identifier`.
    fn install(&mut self, identifier: &Guid) -> Result<PlaceholderHandle, Status>;

    /// Whether any placeholder for `identifier` exists.
    fn is_installed(&self, identifier: &Guid) -> bool;

    /// Remove a placeholder returned by `install`.
    fn uninstall(&mut self, handle: PlaceholderHandle) -> Result<(), Status>;
}

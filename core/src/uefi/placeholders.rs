//! Placeholder handles in the firmware handle database.
//!
//! A placeholder is a fresh handle with the section GUID installed as a
//! protocol with no interface.

use core::ffi::c_void;
use core::ptr;

use uguid::Guid;

use super::bindings::{status, BootServices, Handle, NATIVE_INTERFACE};
use super::boot;
use crate::placeholder::{PlaceholderHandle, PlaceholderTable};
use crate::Status;

pub struct UefiPlaceholders {
    bs: &'static BootServices,
}

impl UefiPlaceholders {
    pub fn new(bs: &'static BootServices) -> Self {
        Self { bs }
    }
}

impl PlaceholderTable for UefiPlaceholders {
    fn install(&mut self, identifier: &Guid) -> Result<PlaceholderHandle, Status> {
        let mut handle: Handle = ptr::null_mut();
        // A null handle asks for a new one
        let result = (self.bs.install_protocol_interface)(
            &mut handle,
            identifier,
            NATIVE_INTERFACE,
            ptr::null_mut(),
        );
        status::to_result(result)?;
        Ok(PlaceholderHandle::new(*identifier, handle as usize))
    }

    fn is_installed(&self, identifier: &Guid) -> bool {
        // SAFETY: boot services table we were loaded with
        unsafe { boot::protocol_installed(self.bs, identifier) }
    }

    fn uninstall(&mut self, handle: PlaceholderHandle) -> Result<(), Status> {
        let result = (self.bs.uninstall_protocol_interface)(
            handle.raw() as Handle,
            handle.identifier(),
            ptr::null_mut::<c_void>(),
        );
        status::to_result(result)
    }
}

//! Thin wrappers over the boot services we call.

use core::ffi::c_void;
use core::ptr::{self, NonNull};

use uguid::Guid;

use super::bindings::{status, BootServices, Handle, BOOT_SERVICES_DATA, BY_PROTOCOL};
use crate::section::FreePool;
use crate::Status;

/// First instance of `protocol` in the system.
///
/// # Safety
/// `T` must be the layout of the interface `protocol` names.
pub unsafe fn locate_protocol<T>(bs: &BootServices, protocol: &Guid) -> Result<NonNull<T>, Status> {
    let mut interface: *mut c_void = ptr::null_mut();
    status::to_result((bs.locate_protocol)(protocol, ptr::null(), &mut interface))?;
    NonNull::new(interface.cast()).ok_or(status::NOT_FOUND)
}

/// `protocol`'s interface on `handle`.
///
/// # Safety
/// `T` must be the layout of the interface `protocol` names.
pub unsafe fn handle_protocol<T>(
    bs: &BootServices,
    handle: Handle,
    protocol: &Guid,
) -> Result<NonNull<T>, Status> {
    let mut interface: *mut c_void = ptr::null_mut();
    status::to_result((bs.handle_protocol)(handle, protocol, &mut interface))?;
    NonNull::new(interface.cast()).ok_or(status::NOT_FOUND)
}

/// Handle array returned by `LocateHandleBuffer`, freed on drop.
pub struct HandleBuffer {
    handles: NonNull<Handle>,
    count: usize,
    free_pool: FreePool,
}

impl HandleBuffer {
    pub fn as_slice(&self) -> &[Handle] {
        // SAFETY: firmware returned `count` handles at `handles`
        unsafe { core::slice::from_raw_parts(self.handles.as_ptr(), self.count) }
    }
}

impl Drop for HandleBuffer {
    fn drop(&mut self) {
        let _ = (self.free_pool)(self.handles.as_ptr().cast());
    }
}

/// Every handle that carries `protocol`.
///
/// # Safety
/// `bs` must be the live boot services table.
pub unsafe fn locate_handle_buffer(bs: &BootServices, protocol: &Guid) -> Result<HandleBuffer, Status> {
    let mut count = 0usize;
    let mut handles: *mut Handle = ptr::null_mut();
    status::to_result((bs.locate_handle_buffer)(
        BY_PROTOCOL,
        protocol,
        ptr::null(),
        &mut count,
        &mut handles,
    ))?;
    let handles = NonNull::new(handles).ok_or(status::NOT_FOUND)?;
    Ok(HandleBuffer {
        handles,
        count,
        free_pool: bs.free_pool,
    })
}

/// Whether any handle carries `protocol`.
///
/// Probes with an empty buffer: `BUFFER_TOO_SMALL` means there is at least
/// one.
///
/// # Safety
/// `bs` must be the live boot services table.
pub unsafe fn protocol_installed(bs: &BootServices, protocol: &Guid) -> bool {
    let mut size = 0usize;
    let result = (bs.locate_handle)(
        BY_PROTOCOL,
        protocol,
        ptr::null(),
        &mut size,
        ptr::null_mut(),
    );
    result == status::BUFFER_TOO_SMALL
}

/// Allocate `size` bytes of boot services pool memory.
///
/// # Safety
/// `bs` must be the live boot services table.
pub unsafe fn allocate_pool(bs: &BootServices, size: usize) -> Result<NonNull<u8>, Status> {
    let mut buffer: *mut u8 = ptr::null_mut();
    status::to_result((bs.allocate_pool)(BOOT_SERVICES_DATA, size, &mut buffer))?;
    NonNull::new(buffer).ok_or(status::OUT_OF_RESOURCES)
}

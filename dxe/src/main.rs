//! Embedded RAM Disk DXE driver
//!
//! Loads as a UEFI driver, registers the `embeddedramdisk` shell command and
//! removes it again when the image is unloaded. All mounting logic lives in
//! `morpheus-ramdisk`; this crate is the image entry point, allocator and
//! the FFI callbacks.
//!
//! Off the UEFI targets it builds as an empty host binary so the workspace
//! can be checked and tested with a plain `cargo test`.

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]
#![cfg_attr(not(target_os = "uefi"), allow(dead_code))]

extern crate alloc;

#[cfg(target_os = "uefi")]
mod allocator;
mod driver;

#[cfg(target_os = "uefi")]
use morpheus_ramdisk::uefi::bindings::{status, Handle, SystemTable};
#[cfg(target_os = "uefi")]
use morpheus_ramdisk::Status;

#[cfg(target_os = "uefi")]
#[no_mangle]
pub extern "efiapi" fn efi_main(image_handle: Handle, system_table: *const SystemTable) -> Status {
    // SAFETY: firmware passes the live system table
    let Some(st) = (unsafe { system_table.as_ref() }) else {
        return status::INVALID_PARAMETER;
    };
    allocator::set_boot_services(st.boot_services);

    // SAFETY: called once, from the image entry point
    unsafe { driver::load(image_handle, st) }
}

#[cfg(target_os = "uefi")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("panic: {}", info);
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(not(target_os = "uefi"))]
fn main() {
    eprintln!("embedded-ramdisk is a UEFI driver; build it for a *-unknown-uefi target");
}

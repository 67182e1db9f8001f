//! Firmware backends.
//!
//! Raw table layouts plus implementations of the crate's seams
//! ([`ImageStores`](crate::section::ImageStores),
//! [`RamDiskProvider`](crate::registrar::RamDiskProvider),
//! [`PlaceholderTable`](crate::placeholder::PlaceholderTable),
//! [`CommandTable`](crate::lifecycle::CommandTable)) on top of boot services.

pub mod bindings;
pub mod boot;
pub mod console;
pub mod firmware_volume;
pub mod placeholders;
pub mod ram_disk;
pub mod shell;

use alloc::string::String;
use alloc::vec::Vec;

pub use bindings::status;
pub use console::ConsoleWriter;
pub use firmware_volume::{FirmwareVolume, FirmwareVolumes};
pub use placeholders::UefiPlaceholders;
pub use ram_disk::{UefiRamDisk, UefiRamDisks};
pub use shell::{HelpText, UefiShellCommands};

/// NUL-terminated UCS-2 copy of `s`.
pub fn encode_ucs2(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(core::iter::once(0)).collect()
}

/// Read a NUL-terminated UCS-2 string. Unpaired surrogates become U+FFFD.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated UCS-2 string.
pub unsafe fn decode_ucs2(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let units = core::slice::from_raw_parts(ptr, len);
    char::decode_utf16(units.iter().copied())
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

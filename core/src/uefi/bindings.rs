// Raw UEFI / PI table layouts used by the driver.
//
// Only the entries we call are typed; the rest are `usize` slots so the
// offsets stay right.

use core::ffi::c_void;

use uguid::{guid, Guid};

use crate::section::FreePool;
use crate::Status;

pub type Handle = *mut c_void;

/// EFI_STATUS values
pub mod status {
    use crate::Status;

    pub const ERROR_BIT: Status = 1 << (usize::BITS - 1);

    pub const SUCCESS: Status = 0;
    pub const LOAD_ERROR: Status = ERROR_BIT | 1;
    pub const INVALID_PARAMETER: Status = ERROR_BIT | 2;
    pub const UNSUPPORTED: Status = ERROR_BIT | 3;
    pub const BUFFER_TOO_SMALL: Status = ERROR_BIT | 5;
    pub const DEVICE_ERROR: Status = ERROR_BIT | 7;
    pub const OUT_OF_RESOURCES: Status = ERROR_BIT | 9;
    pub const NOT_FOUND: Status = ERROR_BIT | 14;
    pub const ACCESS_DENIED: Status = ERROR_BIT | 15;

    pub const fn is_error(status: Status) -> bool {
        status & ERROR_BIT != 0
    }

    /// `Ok` for success and warnings.
    pub fn to_result(status: Status) -> Result<(), Status> {
        if is_error(status) {
            Err(status)
        } else {
            Ok(())
        }
    }
}

/// EFI_FIRMWARE_VOLUME2_PROTOCOL_GUID
pub const FIRMWARE_VOLUME2_PROTOCOL_GUID: Guid = guid!("220e73b6-6bdb-4413-8405-b974b108619a");

/// EFI_RAM_DISK_PROTOCOL_GUID
pub const RAM_DISK_PROTOCOL_GUID: Guid = guid!("ab38a0df-6873-44a9-87e6-d4eb56148449");

/// EFI_SHELL_DYNAMIC_COMMAND_PROTOCOL_GUID
pub const SHELL_DYNAMIC_COMMAND_PROTOCOL_GUID: Guid =
    guid!("3c7200e9-005f-4ea4-87de-a3dfac8a27c3");

/// EFI_LOADED_IMAGE_PROTOCOL_GUID
pub const LOADED_IMAGE_PROTOCOL_GUID: Guid = guid!("5b1b31a1-9562-11d2-8e3f-00a0c969723b");

/// EFI_NATIVE_INTERFACE
pub const NATIVE_INTERFACE: usize = 0;

/// EFI_LOCATE_SEARCH_TYPE ByProtocol
pub const BY_PROTOCOL: usize = 2;

/// EfiBootServicesData
pub const BOOT_SERVICES_DATA: usize = 4;

#[repr(C)]
pub struct SystemTable {
    _header: [u8; 24],
    pub firmware_vendor: *const u16,
    pub firmware_revision: u32,
    pub console_in_handle: Handle,
    _con_in: usize,
    pub console_out_handle: Handle,
    pub con_out: *mut SimpleTextOutputProtocol,
    _standard_error_handle: Handle,
    _std_err: usize,
    _runtime_services: usize,
    pub boot_services: *const BootServices,
    pub number_of_table_entries: usize,
    _configuration_table: usize,
}

#[repr(C)]
pub struct SimpleTextOutputProtocol {
    _reset: usize,
    pub output_string: extern "efiapi" fn(*mut SimpleTextOutputProtocol, *const u16) -> Status,
    _test_string: usize,
    _query_mode: usize,
    _set_mode: usize,
    _set_attribute: usize,
    _clear_screen: usize,
    _set_cursor_position: usize,
    _enable_cursor: usize,
    _mode: usize,
}

#[repr(C)]
pub struct BootServices {
    _header: [u8; 24],
    // Task Priority Services
    _raise_tpl: usize,
    _restore_tpl: usize,
    // Memory Services
    _allocate_pages: usize,
    _free_pages: usize,
    _get_memory_map: usize,
    pub allocate_pool:
        extern "efiapi" fn(pool_type: usize, size: usize, buffer: *mut *mut u8) -> Status,
    pub free_pool: FreePool,
    // Event & Timer Services
    _create_event: usize,
    _set_timer: usize,
    _wait_for_event: usize,
    _signal_event: usize,
    _close_event: usize,
    _check_event: usize,
    // Protocol Handler Services
    pub install_protocol_interface: extern "efiapi" fn(
        handle: *mut Handle,
        protocol: *const Guid,
        interface_type: usize,
        interface: *mut c_void,
    ) -> Status,
    _reinstall_protocol_interface: usize,
    pub uninstall_protocol_interface:
        extern "efiapi" fn(handle: Handle, protocol: *const Guid, interface: *mut c_void) -> Status,
    pub handle_protocol:
        extern "efiapi" fn(handle: Handle, protocol: *const Guid, interface: *mut *mut c_void) -> Status,
    _reserved: usize,
    _register_protocol_notify: usize,
    pub locate_handle: extern "efiapi" fn(
        search_type: usize,
        protocol: *const Guid,
        search_key: *const c_void,
        buffer_size: *mut usize,
        buffer: *mut Handle,
    ) -> Status,
    _locate_device_path: usize,
    _install_configuration_table: usize,
    // Image Services
    _load_image: usize,
    _start_image: usize,
    _exit: usize,
    _unload_image: usize,
    _exit_boot_services: usize,
    // Miscellaneous Services
    _get_next_monotonic_count: usize,
    _stall: usize,
    _set_watchdog_timer: usize,
    // Driver Support Services
    _connect_controller: usize,
    _disconnect_controller: usize,
    // Open/Close Protocol Services
    _open_protocol: usize,
    _close_protocol: usize,
    _open_protocol_information: usize,
    // Library Services
    _protocols_per_handle: usize,
    pub locate_handle_buffer: extern "efiapi" fn(
        search_type: usize,
        protocol: *const Guid,
        search_key: *const c_void,
        no_handles: *mut usize,
        buffer: *mut *mut Handle,
    ) -> Status,
    pub locate_protocol: extern "efiapi" fn(
        protocol: *const Guid,
        registration: *const c_void,
        interface: *mut *mut c_void,
    ) -> Status,
    _install_multiple_protocol_interfaces: usize,
    _uninstall_multiple_protocol_interfaces: usize,
    // 32-bit CRC Services
    _calculate_crc32: usize,
    // Miscellaneous Services (continued)
    _copy_mem: usize,
    _set_mem: usize,
    _create_event_ex: usize,
}

pub type ImageUnload = extern "efiapi" fn(image_handle: Handle) -> Status;

#[repr(C)]
pub struct LoadedImageProtocol {
    pub revision: u32,
    pub parent_handle: Handle,
    pub system_table: *const SystemTable,
    pub device_handle: Handle,
    pub file_path: *const c_void,
    _reserved: *const c_void,
    pub load_options_size: u32,
    pub load_options: *const c_void,
    pub image_base: *const c_void,
    pub image_size: u64,
    pub image_code_type: u32,
    pub image_data_type: u32,
    pub unload: Option<ImageUnload>,
}

#[repr(C)]
pub struct FirmwareVolume2Protocol {
    _get_volume_attributes: usize,
    _set_volume_attributes: usize,
    _read_file: usize,
    pub read_section: extern "efiapi" fn(
        this: *const FirmwareVolume2Protocol,
        name_guid: *const Guid,
        section_type: u8,
        section_instance: usize,
        buffer: *mut *mut c_void,
        buffer_size: *mut usize,
        authentication_status: *mut u32,
    ) -> Status,
    _write_file: usize,
    _get_next_file: usize,
    pub key_size: u32,
    pub parent_handle: Handle,
    _get_info: usize,
    _set_info: usize,
}

#[repr(C)]
pub struct RamDiskProtocol {
    pub register: extern "efiapi" fn(
        ram_disk_base: u64,
        ram_disk_size: u64,
        ram_disk_type: *const Guid,
        parent_device_path: *const c_void,
        device_path: *mut *mut c_void,
    ) -> Status,
    pub unregister: extern "efiapi" fn(device_path: *const c_void) -> Status,
}

pub type ShellCommandHandler = extern "efiapi" fn(
    this: *mut ShellDynamicCommandProtocol,
    system_table: *const SystemTable,
    shell_parameters: *mut ShellParametersProtocol,
    shell: *mut c_void,
) -> usize;

pub type ShellCommandGetHelp =
    extern "efiapi" fn(this: *mut ShellDynamicCommandProtocol, language: *const u8) -> *mut u16;

#[repr(C)]
pub struct ShellDynamicCommandProtocol {
    pub command_name: *const u16,
    pub handler: ShellCommandHandler,
    pub get_help: ShellCommandGetHelp,
}

#[repr(C)]
pub struct ShellParametersProtocol {
    pub argv: *const *const u16,
    pub argc: usize,
    pub std_in: *mut c_void,
    pub std_out: *mut c_void,
    pub std_err: *mut c_void,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn boot_services_offsets() {
        // Offsets from the UEFI 2.x table on 64-bit targets
        if size_of::<usize>() == 8 {
            assert_eq!(offset_of!(BootServices, allocate_pool), 0x40);
            assert_eq!(offset_of!(BootServices, install_protocol_interface), 0x80);
            assert_eq!(offset_of!(BootServices, locate_handle), 0xB0);
            assert_eq!(offset_of!(BootServices, locate_handle_buffer), 0x138);
            assert_eq!(offset_of!(BootServices, locate_protocol), 0x140);
            assert_eq!(offset_of!(SystemTable, boot_services), 0x60);
        }
    }

    #[test]
    fn error_statuses() {
        assert!(status::is_error(status::NOT_FOUND));
        assert!(!status::is_error(status::SUCCESS));
        assert_eq!(status::to_result(status::SUCCESS), Ok(()));
        assert_eq!(
            status::to_result(status::DEVICE_ERROR),
            Err(status::DEVICE_ERROR)
        );
    }
}

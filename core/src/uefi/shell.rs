//! The shell's dynamic command table.
//!
//! A command is an `EFI_SHELL_DYNAMIC_COMMAND_PROTOCOL` installed on our
//! image handle; the shell discovers it by protocol and calls back through
//! the function pointers in it.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::ffi::c_void;
use core::ptr;

use log::debug;

use super::bindings::{
    status, BootServices, Handle, ShellCommandGetHelp, ShellCommandHandler,
    ShellDynamicCommandProtocol, ShellParametersProtocol, NATIVE_INTERFACE,
    SHELL_DYNAMIC_COMMAND_PROTOCOL_GUID,
};
use super::{boot, decode_ucs2, encode_ucs2};
use crate::command::StringPackage;
use crate::lifecycle::CommandTable;
use crate::Status;

/// Help text of a registered string package, as UCS-2.
pub struct HelpText {
    language: &'static str,
    units: Vec<u16>,
}

impl HelpText {
    pub fn language(&self) -> &'static str {
        self.language
    }

    /// NUL-terminated text.
    pub fn as_units(&self) -> &[u16] {
        &self.units
    }

    /// Pool copy for `GetHelp`; the shell frees it. Null if out of memory.
    pub fn to_pool(&self, bs: &BootServices) -> *mut u16 {
        let bytes = self.units.len() * core::mem::size_of::<u16>();
        // SAFETY: `bs` is the live boot services table
        match unsafe { boot::allocate_pool(bs, bytes) } {
            Ok(buffer) => {
                let buffer = buffer.as_ptr().cast::<u16>();
                // SAFETY: fresh pool allocation sized for `units`
                unsafe { ptr::copy_nonoverlapping(self.units.as_ptr(), buffer, self.units.len()) };
                buffer
            }
            Err(_) => ptr::null_mut(),
        }
    }
}

pub struct UefiShellCommands {
    bs: &'static BootServices,
    image_handle: Handle,
    interface: Box<ShellDynamicCommandProtocol>,
    name: Vec<u16>,
}

impl UefiShellCommands {
    pub fn new(
        bs: &'static BootServices,
        image_handle: Handle,
        handler: ShellCommandHandler,
        get_help: ShellCommandGetHelp,
    ) -> Self {
        Self {
            bs,
            image_handle,
            interface: Box::new(ShellDynamicCommandProtocol {
                command_name: ptr::null(),
                handler,
                get_help,
            }),
            name: Vec::new(),
        }
    }

    fn interface_ptr(&mut self) -> *mut c_void {
        (&mut *self.interface as *mut ShellDynamicCommandProtocol).cast()
    }
}

impl CommandTable for UefiShellCommands {
    type Strings = HelpText;

    fn add_strings(&mut self, package: &'static StringPackage) -> Option<HelpText> {
        let help = package.help();
        if help.is_empty() {
            return None;
        }
        Some(HelpText {
            language: package.language,
            units: encode_ucs2(help),
        })
    }

    fn remove_strings(&mut self, strings: HelpText) {
        debug!("dropping '{}' strings", strings.language);
    }

    fn register_command(&mut self, name: &'static str, _strings: &HelpText) -> Result<(), Status> {
        self.name = encode_ucs2(name);
        self.interface.command_name = self.name.as_ptr();

        let mut handle = self.image_handle;
        let interface = self.interface_ptr();
        let result = (self.bs.install_protocol_interface)(
            &mut handle,
            &SHELL_DYNAMIC_COMMAND_PROTOCOL_GUID,
            NATIVE_INTERFACE,
            interface,
        );
        status::to_result(result)
    }

    fn unregister_command(&mut self, _name: &'static str) -> Result<(), Status> {
        let interface = self.interface_ptr();
        let result = (self.bs.uninstall_protocol_interface)(
            self.image_handle,
            &SHELL_DYNAMIC_COMMAND_PROTOCOL_GUID,
            interface,
        );
        status::to_result(result)
    }
}

/// Command-line tokens, `argv[0]` first.
///
/// # Safety
/// `params` must be null or point to the shell's parameters for this call.
pub unsafe fn arguments(params: *const ShellParametersProtocol) -> Vec<String> {
    let Some(params) = params.as_ref() else {
        return Vec::new();
    };
    if params.argv.is_null() {
        return Vec::new();
    }
    (0..params.argc)
        .map(|i| decode_ucs2(*params.argv.add(i)))
        .collect()
}

// Driver instance and the firmware callbacks that reach it.
//
// The shell calls `handler`/`get_help` and the image loader calls `unload`
// with nothing but raw pointers, so the one instance lives in a static.

use alloc::boxed::Box;
use core::ffi::c_void;
use core::ptr;

use log::{error, info, warn, LevelFilter};
use spin::Mutex;

use morpheus_ramdisk::command::{self, ShellStatus, EN_US};
use morpheus_ramdisk::lifecycle::CommandModule;
use morpheus_ramdisk::logger::{self, RingLogger};
use morpheus_ramdisk::uefi::bindings::{
    status, BootServices, Handle, ImageUnload, LoadedImageProtocol, ShellDynamicCommandProtocol,
    ShellParametersProtocol, SystemTable, LOADED_IMAGE_PROTOCOL_GUID,
};
use morpheus_ramdisk::uefi::{
    boot, shell, ConsoleWriter, FirmwareVolumes, UefiPlaceholders, UefiRamDisks,
    UefiShellCommands,
};
use morpheus_ramdisk::{MountConfig, Mounter, Status};

type UefiMounter = Mounter<FirmwareVolumes, UefiRamDisks, UefiPlaceholders>;

const LOG_LEVEL: LevelFilter = if cfg!(debug_assertions) {
    LevelFilter::Debug
} else {
    LevelFilter::Info
};

static LOGGER: RingLogger = RingLogger::new();

struct DriverInstance {
    bs: &'static BootServices,
    table: UefiShellCommands,
    module: CommandModule<UefiShellCommands>,
    mounter: UefiMounter,
}

struct Instance(Box<DriverInstance>);

// SAFETY: boot services code runs on the boot CPU only
unsafe impl Send for Instance {}

static INSTANCE: Mutex<Option<Instance>> = Mutex::new(None);

/// Image entry point body.
///
/// # Safety
/// `st` must be the system table the image was started with.
pub unsafe fn load(image_handle: Handle, st: &'static SystemTable) -> Status {
    let Some(bs) = st.boot_services.as_ref() else {
        return status::INVALID_PARAMETER;
    };
    // A logger left over from an earlier load stays in place
    let _ = logger::init(&LOGGER, LOG_LEVEL);

    let mut table = UefiShellCommands::new(bs, image_handle, handler, get_help);
    let module = match CommandModule::load(&mut table, &EN_US) {
        Ok(module) => module,
        Err(err) => {
            error!("embedded ramdisk: {}", err);
            return err.status();
        }
    };

    let mounter = Mounter::new(
        FirmwareVolumes::new(bs),
        UefiRamDisks::new(bs),
        UefiPlaceholders::new(bs),
        MountConfig::default(),
    );

    *INSTANCE.lock() = Some(Instance(Box::new(DriverInstance {
        bs,
        table,
        module,
        mounter,
    })));

    match boot::handle_protocol::<LoadedImageProtocol>(bs, image_handle, &LOADED_IMAGE_PROTOCOL_GUID) {
        Ok(mut loaded) => loaded.as_mut().unload = Some(unload as ImageUnload),
        Err(status) => warn!("no loaded image protocol ({:#x}), driver stays resident", status),
    }

    info!("embedded ramdisk driver loaded");
    status::SUCCESS
}

extern "efiapi" fn handler(
    _this: *mut ShellDynamicCommandProtocol,
    system_table: *const SystemTable,
    params: *mut ShellParametersProtocol,
    _shell: *mut c_void,
) -> usize {
    let mut guard = INSTANCE.lock();
    let Some(Instance(instance)) = guard.as_mut() else {
        return ShellStatus::DeviceError.as_raw();
    };
    let DriverInstance {
        module, mounter, ..
    } = &mut **instance;

    // SAFETY: the shell passes its parameters and system table for this call
    let argv = unsafe { shell::arguments(params) };
    let con_out = unsafe { system_table.as_ref() }.map_or(ptr::null_mut(), |st| st.con_out);
    let mut console = unsafe { ConsoleWriter::new(con_out) };

    command::run(module.context(), mounter, &argv, &mut console).as_raw()
}

extern "efiapi" fn get_help(_this: *mut ShellDynamicCommandProtocol, _language: *const u8) -> *mut u16 {
    let guard = INSTANCE.lock();
    match guard.as_ref() {
        Some(Instance(instance)) => instance
            .module
            .strings()
            .map_or(ptr::null_mut(), |help| help.to_pool(instance.bs)),
        None => ptr::null_mut(),
    }
}

extern "efiapi" fn unload(_image_handle: Handle) -> Status {
    let mut guard = INSTANCE.lock();
    let Some(Instance(instance)) = guard.as_mut() else {
        return status::SUCCESS;
    };
    let DriverInstance {
        table,
        module,
        mounter,
        ..
    } = &mut **instance;

    if let Err(status) = module.unload(table) {
        return status;
    }
    let leaked = mounter.teardown();
    if leaked > 0 {
        warn!("{} images stay mapped after unload", leaked);
    }

    *guard = None;
    info!("embedded ramdisk driver unloaded");
    status::SUCCESS
}

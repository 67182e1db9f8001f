//! Command Front-End
//!
//! `embeddedramdisk <GUID>`: parse one GUID, mount it, print what happened
//! and return a shell status. All user-facing text comes from the
//! [`CommandContext`] the lifecycle hooks created at load time.

mod args;
pub mod strings;

use alloc::string::String;
use core::fmt;

use log::debug;
use uguid::Guid;

use crate::device_path::DevicePath;
use crate::error::MountError;
use crate::mount::MountService;

pub use args::{ArgError, CommandArgs};
pub use strings::{StringId, StringPackage, EN_US};

/// Name the command is registered under.
pub const COMMAND_NAME: &str = "embeddedramdisk";

/// Shell exit status (`SHELL_STATUS`).
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellStatus {
    Success = 0,
    InvalidParameter = 2,
    DeviceError = 7,
}

impl ShellStatus {
    pub const fn as_raw(self) -> usize {
        self as usize
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Mounted; carries the new device's path
    Success(DevicePath),
    InvalidArgument(ArgError),
    NotFound,
    /// Rejected as a duplicate (single-mount policy)
    AlreadyMounted,
    DeviceError(MountError),
}

impl Outcome {
    pub fn status(&self) -> ShellStatus {
        match self {
            Self::Success(_) => ShellStatus::Success,
            Self::InvalidArgument(_) | Self::NotFound | Self::AlreadyMounted => {
                ShellStatus::InvalidParameter
            }
            Self::DeviceError(_) => ShellStatus::DeviceError,
        }
    }
}

/// One run of the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The positional argument as typed, when there was exactly one.
    pub raw_argument: Option<String>,
    pub identifier: Option<Guid>,
    pub outcome: Outcome,
}

/// State the command needs from its module: the string table.
#[derive(Debug)]
pub struct CommandContext {
    strings: &'static StringPackage,
}

impl CommandContext {
    pub(crate) fn new(strings: &'static StringPackage) -> Self {
        Self { strings }
    }

    pub fn strings(&self) -> &'static StringPackage {
        self.strings
    }

    fn print(&self, out: &mut dyn fmt::Write, id: StringId, args: &[&dyn fmt::Display]) {
        // Console errors have nowhere to be reported
        let _ = self.strings.render(out, id, args);
    }
}

/// Parse `argv`, mount, and report. `argv[0]` is the command name.
pub fn execute<M, S>(
    ctx: &CommandContext,
    mounter: &mut M,
    argv: &[S],
    out: &mut dyn fmt::Write,
) -> Invocation
where
    M: MountService + ?Sized,
    S: AsRef<str>,
{
    let args = match CommandArgs::parse(argv) {
        Ok(args) => args,
        Err(err) => {
            debug!("{}: {}", COMMAND_NAME, err);
            report_usage_error(ctx, out, &err);
            let raw_argument = match &err {
                ArgError::MalformedGuid(raw) => Some(raw.clone()),
                _ => None,
            };
            return Invocation {
                raw_argument,
                identifier: None,
                outcome: Outcome::InvalidArgument(err),
            };
        }
    };

    ctx.print(out, StringId::SelectedGuid, &[&args.raw]);
    ctx.print(out, StringId::Mounting, &[]);

    let outcome = match mounter.mount(args.identifier) {
        Ok(locator) => {
            ctx.print(out, StringId::Mounted, &[&locator]);
            Outcome::Success(locator)
        }
        Err(MountError::NotFound) => {
            ctx.print(out, StringId::NotFound, &[&COMMAND_NAME, &args.raw]);
            Outcome::NotFound
        }
        Err(MountError::AlreadyMounted) => {
            ctx.print(out, StringId::AlreadyMounted, &[&COMMAND_NAME, &args.raw]);
            Outcome::AlreadyMounted
        }
        Err(err) => {
            ctx.print(out, StringId::MountFailed, &[&COMMAND_NAME, &args.raw, &err]);
            Outcome::DeviceError(err)
        }
    };

    Invocation {
        raw_argument: Some(args.raw),
        identifier: Some(args.identifier),
        outcome,
    }
}

/// [`execute`], reduced to the shell status.
pub fn run<M, S>(
    ctx: &CommandContext,
    mounter: &mut M,
    argv: &[S],
    out: &mut dyn fmt::Write,
) -> ShellStatus
where
    M: MountService + ?Sized,
    S: AsRef<str>,
{
    execute(ctx, mounter, argv, out).outcome.status()
}

fn report_usage_error(ctx: &CommandContext, out: &mut dyn fmt::Write, err: &ArgError) {
    match err {
        ArgError::UnknownFlag(flag) => {
            ctx.print(out, StringId::UnknownFlag, &[&COMMAND_NAME, flag]);
        }
        ArgError::TooFewArguments => ctx.print(out, StringId::TooFewArguments, &[&COMMAND_NAME]),
        ArgError::TooManyArguments => ctx.print(out, StringId::TooManyArguments, &[&COMMAND_NAME]),
        ArgError::MalformedGuid(raw) => {
            ctx.print(out, StringId::InvalidArgument, &[&COMMAND_NAME, raw]);
        }
    }
}

//! Lifecycle Hooks
//!
//! Load: register the string package, then the command. Unload: undo both.
//! The [`CommandContext`] handed to the front-end exists exactly as long as
//! the loaded module.

use log::{info, warn};
use thiserror::Error;

use crate::command::{CommandContext, StringPackage, COMMAND_NAME};
use crate::uefi::status;
use crate::Status;

/// The shell's command table.
pub trait CommandTable {
    /// Handle for registered string resources.
    type Strings;

    /// Register a string package. `None` if the table can't take it.
    fn add_strings(&mut self, package: &'static StringPackage) -> Option<Self::Strings>;

    fn remove_strings(&mut self, strings: Self::Strings);

    fn register_command(&mut self, name: &'static str, strings: &Self::Strings) -> Result<(), Status>;

    fn unregister_command(&mut self, name: &'static str) -> Result<(), Status>;
}

/// Module load failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadError {
    /// String package incomplete or rejected by the table
    #[error("string resources could not be registered")]
    StringsUnavailable,
    /// Command table refused the command
    #[error("command registration failed (status {0:#x})")]
    CommandRegistration(Status),
}

impl LoadError {
    /// Status returned from the image entry point.
    pub fn status(&self) -> Status {
        match self {
            Self::StringsUnavailable => status::DEVICE_ERROR,
            Self::CommandRegistration(status) => *status,
        }
    }
}

/// A loaded `embeddedramdisk` command.
pub struct CommandModule<T: CommandTable> {
    context: CommandContext,
    strings: Option<T::Strings>,
    command_registered: bool,
}

impl<T: CommandTable> CommandModule<T> {
    /// Register strings and the command with `table`.
    pub fn load(table: &mut T, package: &'static StringPackage) -> Result<Self, LoadError> {
        if !package.is_complete() {
            warn!("string package '{}' is incomplete", package.language);
            return Err(LoadError::StringsUnavailable);
        }

        let strings = table
            .add_strings(package)
            .ok_or(LoadError::StringsUnavailable)?;

        if let Err(status) = table.register_command(COMMAND_NAME, &strings) {
            warn!("couldn't register '{}' ({:#x})", COMMAND_NAME, status);
            table.remove_strings(strings);
            return Err(LoadError::CommandRegistration(status));
        }

        info!("'{}' command registered", COMMAND_NAME);
        Ok(Self {
            context: CommandContext::new(package),
            strings: Some(strings),
            command_registered: true,
        })
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Registered string handle, until unload.
    pub fn strings(&self) -> Option<&T::Strings> {
        self.strings.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.command_registered || self.strings.is_some()
    }

    /// Deregister the command and strings. Safe to call more than once.
    ///
    /// If the table refuses to drop the command, nothing is released and the
    /// module stays loaded: the shell may still call into it.
    pub fn unload(&mut self, table: &mut T) -> Result<(), Status> {
        if self.command_registered {
            table.unregister_command(COMMAND_NAME).inspect_err(|status| {
                warn!("couldn't unregister '{}' ({:#x})", COMMAND_NAME, status);
            })?;
            self.command_registered = false;
        }
        if let Some(strings) = self.strings.take() {
            table.remove_strings(strings);
        }
        Ok(())
    }
}

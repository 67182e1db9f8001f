//! Localized strings for the `embeddedramdisk` command.
//!
//! Templates use `%s` placeholders, filled left to right.

use core::fmt;

/// String identifiers used by the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringId {
    UnknownFlag,
    TooFewArguments,
    TooManyArguments,
    InvalidArgument,
    NotFound,
    AlreadyMounted,
    MountFailed,
    SelectedGuid,
    Mounting,
    Mounted,
    Help,
}

impl StringId {
    pub const ALL: [StringId; 11] = [
        StringId::UnknownFlag,
        StringId::TooFewArguments,
        StringId::TooManyArguments,
        StringId::InvalidArgument,
        StringId::NotFound,
        StringId::AlreadyMounted,
        StringId::MountFailed,
        StringId::SelectedGuid,
        StringId::Mounting,
        StringId::Mounted,
        StringId::Help,
    ];
}

/// One language's string table.
#[derive(Debug)]
pub struct StringPackage {
    pub language: &'static str,
    entries: &'static [(StringId, &'static str)],
}

impl StringPackage {
    pub const fn new(language: &'static str, entries: &'static [(StringId, &'static str)]) -> Self {
        Self { language, entries }
    }

    pub fn get(&self, id: StringId) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|(_, text)| *text)
    }

    /// Every `StringId` has a template.
    pub fn is_complete(&self) -> bool {
        StringId::ALL.iter().all(|id| self.get(*id).is_some())
    }

    /// Manual page text returned by the shell's `help` command.
    pub fn help(&self) -> &'static str {
        self.get(StringId::Help).unwrap_or("")
    }

    /// Write template `id` with its `%s` placeholders replaced by `args`.
    ///
    /// Missing arguments render as nothing; a missing template is an error.
    pub fn render(
        &self,
        out: &mut dyn fmt::Write,
        id: StringId,
        args: &[&dyn fmt::Display],
    ) -> fmt::Result {
        let template = self.get(id).ok_or(fmt::Error)?;
        let mut args = args.iter();
        let mut pieces = template.split("%s");
        if let Some(first) = pieces.next() {
            out.write_str(first)?;
        }
        for piece in pieces {
            if let Some(arg) = args.next() {
                write!(out, "{}", arg)?;
            }
            out.write_str(piece)?;
        }
        Ok(())
    }
}

const HELP_TEXT: &str = "\
.TH embeddedramdisk 0 \"Mount an embedded image as a RAM disk.\"
.SH NAME
Loads a raw section from a firmware volume and registers it as a RAM disk.
.SH SYNOPSIS

embeddedramdisk GUID

.SH OPTIONS

  GUID - Name of the firmware file holding the image, in the form
         xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx.

.SH DESCRIPTION

NOTES:
  1. The image is registered as a virtual CD. It is not copied.
  2. Run 'map -r' afterwards to assign a mapping to the new device.

.SH EXAMPLES

  * Mount the image stored under a known GUID:
    fs0:\\> embeddedramdisk 12345678-1234-1234-1234-123456789abc

.SH RETURNVALUES

  SHELL_SUCCESS             The image was mounted.
  SHELL_INVALID_PARAMETER   Bad arguments, or no such image.
  SHELL_DEVICE_ERROR        The RAM disk could not be registered.
";

/// English strings.
pub static EN_US: StringPackage = StringPackage::new(
    "en-US",
    &[
        (StringId::UnknownFlag, "%s: Unknown flag - '%s'\n"),
        (StringId::TooFewArguments, "%s: Too few arguments.\n"),
        (StringId::TooManyArguments, "%s: Too many arguments.\n"),
        (StringId::InvalidArgument, "%s: Invalid argument - '%s'\n"),
        (StringId::NotFound, "%s: '%s' not found.\n"),
        (StringId::AlreadyMounted, "%s: '%s' is already mounted.\n"),
        (StringId::MountFailed, "%s: Unable to mount '%s' - %s\n"),
        (StringId::SelectedGuid, "Selected GUID to mount: %s\n"),
        (StringId::Mounting, "Mounting selected section as ramdisk...\n"),
        (
            StringId::Mounted,
            "Successfully mounted the ramdisk as %s. Use 'map -r' to map it.\n",
        ),
        (StringId::Help, HELP_TEXT),
    ],
);

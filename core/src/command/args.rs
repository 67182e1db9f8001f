// Argument parsing for `embeddedramdisk <GUID>`.

use alloc::string::{String, ToString};

use thiserror::Error;
use uguid::Guid;

/// Usage errors. None of them has side effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),
    #[error("missing GUID argument")]
    TooFewArguments,
    #[error("too many arguments")]
    TooManyArguments,
    #[error("'{0}' is not a GUID")]
    MalformedGuid(String),
}

/// The single positional argument, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs {
    pub raw: String,
    pub identifier: Guid,
}

impl CommandArgs {
    /// Parse shell tokens; `argv[0]` is the command name.
    pub fn parse<S: AsRef<str>>(argv: &[S]) -> Result<Self, ArgError> {
        let positional = argv.get(1..).unwrap_or(&[]);

        // The command takes no flags at all
        if let Some(flag) = positional
            .iter()
            .map(|arg| arg.as_ref())
            .find(|arg| arg.len() > 1 && arg.starts_with('-'))
        {
            return Err(ArgError::UnknownFlag(flag.to_string()));
        }

        let raw = match positional {
            [] => return Err(ArgError::TooFewArguments),
            [one] => one.as_ref(),
            _ => return Err(ArgError::TooManyArguments),
        };

        let identifier =
            Guid::try_parse(raw).map_err(|_| ArgError::MalformedGuid(raw.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            identifier,
        })
    }
}

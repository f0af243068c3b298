//! Error types for command dispatch.
//!
//! Every failure a command can produce falls into one of four kinds:
//!
//! - **`UnknownCommand`**: the command name is not in the command table.
//! - **`Usage`**: the number of words does not match the command's signature.
//! - **`ArgumentParse`**: an argument could not be converted to the type the
//!   command needs (task handle, floating point number, unsigned integer).
//! - **`Backend`**: the acquisition backend reported a failure. The message
//!   has already been normalized by [`crate::backend::translate`].
//!
//! All four are terminal to the current command only. The session loop is
//! the single place that renders them for the client.

use std::fmt;

use thiserror::Error;

/// Result type alias for command handlers and the dispatcher.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Result type alias for backend capability calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A failed backend call, translated into a single-line message.
///
/// The message carries the subsystem tag (e.g. `DAQmx: ...`) and never
/// contains a newline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    /// Raw status code reported by the backend (negative for failures)
    pub code: i32,
    /// Normalized, single-line message
    pub message: String,
}

/// Semantic type an argument was expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Opaque task handle (`0x...` or decimal)
    Handle,
    /// Finite floating point number
    Float,
    /// Unsigned integer
    UnsignedInteger,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handle => write!(f, "task handle"),
            Self::Float => write!(f, "floating point number"),
            Self::UnsignedInteger => write!(f, "unsigned integer"),
        }
    }
}

/// Errors that can occur while dispatching a single command.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// No command with this name exists
    #[error("Unknown command: {name}")]
    UnknownCommand {
        /// Command name as typed
        name: String,
    },

    /// Wrong number of arguments; carries the command's usage line
    #[error("{usage}")]
    Usage {
        /// `Usage: <name> <params>` line
        usage: String,
    },

    /// An argument could not be parsed into the expected type
    #[error("Cannot parse \"{arg}\" as {expected}")]
    ArgumentParse {
        /// Offending argument text
        arg: String,
        /// Type the argument should have parsed as
        expected: ArgKind,
    },

    /// Translated backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Discriminant of [`CommandError`], used for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    /// [`CommandError::UnknownCommand`]
    UnknownCommand,
    /// [`CommandError::Usage`]
    Usage,
    /// [`CommandError::ArgumentParse`]
    ArgumentParse,
    /// [`CommandError::Backend`]
    Backend,
}

impl fmt::Display for CommandErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UnknownCommand => "unknown_command",
            Self::Usage => "usage",
            Self::ArgumentParse => "argument_parse",
            Self::Backend => "backend",
        };
        write!(f, "{}", label)
    }
}

impl CommandError {
    /// Kind of this error.
    pub fn kind(&self) -> CommandErrorKind {
        match self {
            Self::UnknownCommand { .. } => CommandErrorKind::UnknownCommand,
            Self::Usage { .. } => CommandErrorKind::Usage,
            Self::ArgumentParse { .. } => CommandErrorKind::ArgumentParse,
            Self::Backend(_) => CommandErrorKind::Backend,
        }
    }

    /// Create an argument parse error for the given word.
    pub fn argument(arg: impl Into<String>, expected: ArgKind) -> Self {
        Self::ArgumentParse {
            arg: arg.into(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommandError::UnknownCommand {
            name: "task_frobnicate".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown command: task_frobnicate");

        let err = CommandError::argument("0xZZ", ArgKind::Handle);
        assert_eq!(err.to_string(), "Cannot parse \"0xZZ\" as task handle");
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let err: CommandError = BackendError {
            code: -200088,
            message: "DAQmx: Task specified is invalid or does not exist.".to_string(),
        }
        .into();
        assert_eq!(err.kind(), CommandErrorKind::Backend);
        assert_eq!(
            err.to_string(),
            "DAQmx: Task specified is invalid or does not exist."
        );
    }

    #[test]
    fn test_usage_error_carries_usage_line() {
        let err = CommandError::Usage {
            usage: "Usage: task_start <task>".to_string(),
        };
        assert_eq!(err.kind(), CommandErrorKind::Usage);
        assert_eq!(err.to_string(), "Usage: task_start <task>");
    }
}

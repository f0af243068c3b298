//! Opaque task handles passed through the text protocol.
//!
//! The backend hands out a native handle on task creation; the client echoes
//! it back verbatim on every later call. The dispatch layer never inspects
//! the value beyond converting it to and from text. Whether a handle refers
//! to a live task is decided by the backend alone.

use std::fmt;
use std::str::FromStr;

/// Opaque identifier of a backend task.
///
/// Encoded as lowercase hexadecimal with a `0x` prefix (`0x1a2b`). Decoding
/// also accepts an uppercase `0X` prefix or plain decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    /// Wrap a raw native handle value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw native handle value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The text is not a valid handle encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHandleError;

impl fmt::Display for ParseHandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task handle")
    }
}

impl std::error::Error for ParseHandleError {}

impl FromStr for TaskHandle {
    type Err = ParseHandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => (hex, 16),
            None => (s, 10),
        };

        // from_str_radix tolerates a leading sign; handles never carry one
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(ParseHandleError);
        }

        u64::from_str_radix(digits, radix)
            .map(Self)
            .map_err(|_| ParseHandleError)
    }
}

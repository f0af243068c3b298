//! Strict argument parsers.
//!
//! Every parser either returns a value of the semantic type or an
//! [`CommandError::ArgumentParse`] naming the offending word. Parsing is
//! locale independent and never accepts trailing garbage.

use crate::error::{ArgKind, CommandError, Result};
use crate::handle::TaskHandle;

/// Parse a task handle (`0x...` hexadecimal or decimal).
pub fn parse_handle(word: &str) -> Result<TaskHandle> {
    word.parse()
        .map_err(|_| CommandError::argument(word, ArgKind::Handle))
}

/// Parse a finite floating point number.
pub fn parse_float(word: &str) -> Result<f64> {
    match word.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CommandError::argument(word, ArgKind::Float)),
    }
}

/// Parse an unsigned integer that fits in `T`.
pub fn parse_uint<T>(word: &str) -> Result<T>
where
    T: std::str::FromStr,
{
    // Integer FromStr accepts a leading '+'
    if word.starts_with(['+', '-']) {
        return Err(CommandError::argument(word, ArgKind::UnsignedInteger));
    }
    word.parse::<T>()
        .map_err(|_| CommandError::argument(word, ArgKind::UnsignedInteger))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handle() {
        assert_eq!(parse_handle("0x20").unwrap(), TaskHandle::from_raw(0x20));
        assert_eq!(parse_handle("32").unwrap(), TaskHandle::from_raw(32));

        let err = parse_handle("task1").unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse \"task1\" as task handle");
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("-10").unwrap(), -10.0);
        assert_eq!(parse_float("2.5e3").unwrap(), 2500.0);
        assert_eq!(parse_float(".5").unwrap(), 0.5);

        for word in ["", "1,5", "10V", "nan", "inf", "-infinity", "1e999"] {
            let err = parse_float(word).unwrap_err();
            assert_eq!(
                err,
                CommandError::argument(word, ArgKind::Float),
                "{word:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_uint() {
        assert_eq!(parse_uint::<u32>("1000").unwrap(), 1000);
        assert_eq!(parse_uint::<u64>("0").unwrap(), 0);

        for word in ["-1", "+1", "1.0", "", "0x10", "4294967296"] {
            assert!(
                parse_uint::<u32>(word).is_err(),
                "{word:?} should be rejected"
            );
        }
        let err = parse_uint::<u32>("-1").unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse \"-1\" as unsigned integer");
    }
}

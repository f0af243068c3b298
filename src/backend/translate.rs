//! Translation of backend status codes into [`BackendError`] values.
//!
//! Driver calls return a status code: zero for success, a positive value for
//! a warning and a negative value for a failure. Only failures are
//! translated. The driver's diagnostic text usually spans several lines
//! (message, property names, status code); the translated message is
//! collapsed onto one line and tagged with the subsystem name so that it can
//! be embedded in a single `#Error:` protocol line.

use crate::error::{BackendError, BackendResult};

/// NI-DAQmx status codes referenced by the backends.
pub mod status {
    /// Task specified is invalid or does not exist
    pub const INVALID_TASK: i32 = -200_088;
    /// Device identifier is invalid
    pub const INVALID_DEVICE: i32 = -200_220;
    /// Physical channel does not exist on this device
    pub const INVALID_PHYSICAL_CHANNEL: i32 = -200_170;
    /// Channel with the same name is already in the task
    pub const DUPLICATE_CHANNEL: i32 = -200_489;
    /// Requested value is not a supported value for this property
    pub const INVALID_PROPERTY_VALUE: i32 = -200_077;
    /// Operation cannot be performed when there are no channels in the task
    pub const NO_CHANNELS: i32 = -200_478;
    /// Operation cannot be performed while the task is running
    pub const TASK_RUNNING: i32 = -200_479;
    /// Wait Until Done timed out
    pub const WAIT_TIMEOUT: i32 = -200_560;
    /// Samples requested have not yet been acquired
    pub const SAMPLES_NOT_AVAILABLE: i32 = -200_284;
    /// Attempted to read beyond the final sample acquired
    pub const READ_PAST_END: i32 = -200_278;
}

/// Tag prefixed to every translated message.
pub const SUBSYSTEM_TAG: &str = "DAQmx";

/// Whether a status code denotes a failure.
#[inline]
pub fn is_failure(status: i32) -> bool {
    status < 0
}

/// Translate a status code and its diagnostic text.
///
/// Returns `None` for success and warning codes.
pub fn translate(status: i32, diagnostics: &str) -> Option<BackendError> {
    if !is_failure(status) {
        return None;
    }

    let text = single_line(diagnostics);
    let message = if text.is_empty() {
        format!("{}: error code {}", SUBSYSTEM_TAG, status)
    } else {
        format!("{}: {}", SUBSYSTEM_TAG, text)
    };

    Some(BackendError {
        code: status,
        message,
    })
}

/// Turn a status code into a result.
///
/// `diagnostics` is only invoked for failures, so callers can defer the
/// (possibly expensive) driver query for extended error information.
pub fn check_status<F>(status: i32, diagnostics: F) -> BackendResult<()>
where
    F: FnOnce() -> String,
{
    if !is_failure(status) {
        return Ok(());
    }
    match translate(status, &diagnostics()) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Replace line breaks with spaces and trim the ends.
///
/// A `\r\n` pair becomes a single space.
fn single_line(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_warnings_are_not_errors() {
        assert!(translate(0, "ignored").is_none());
        assert!(translate(200_015, "Warning text").is_none());
        assert!(check_status(0, || unreachable!("diagnostics not queried")).is_ok());
    }

    #[test]
    fn test_failure_is_tagged_and_single_line() {
        let err = translate(
            -200_088,
            "Task specified is invalid or does not exist.\nStatus Code: -200088",
        )
        .unwrap();

        assert_eq!(err.code, -200_088);
        assert_eq!(
            err.message,
            "DAQmx: Task specified is invalid or does not exist. Status Code: -200088"
        );
        assert!(!err.message.contains('\n'));
    }

    #[test]
    fn test_crlf_and_trailing_newlines() {
        let err = translate(-1, "First line\r\nSecond line\n\n").unwrap();
        assert_eq!(err.message, "DAQmx: First line Second line");
    }

    #[test]
    fn test_empty_diagnostics_fall_back_to_code() {
        let err = translate(-50_103, "").unwrap();
        assert_eq!(err.message, "DAQmx: error code -50103");
    }

    #[test]
    fn test_check_status_reports_failure() {
        let result = check_status(-200_220, || "Device identifier is invalid.".to_string());
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "DAQmx: Device identifier is invalid.");
    }
}

/// Error classification for recovery strategy selection
///
/// The engine has exactly one recovery decision: whether the direct path is
/// usable at all. Classification keeps that decision in one place.
use super::EraseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;

/// Classification of errors for recovery strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Raw device cannot be used directly (privilege, busy, missing, empty).
    /// The session switches to the fallback utility.
    DirectAccessUnavailable,

    /// Read-back did not match what was written
    Verification,

    /// The fallback utility exited non-zero or timed out
    ExternalTool,

    /// Unrecoverable mid-session failure
    Fatal,

    /// User interrupted - graceful shutdown requested
    UserInterrupted,
}

impl ErrorClass {
    pub fn description(&self) -> &'static str {
        match self {
            ErrorClass::DirectAccessUnavailable => "Direct device access unavailable",
            ErrorClass::Verification => "Written data could not be confirmed",
            ErrorClass::ExternalTool => "External wipe utility failed",
            ErrorClass::Fatal => "Unrecoverable error requiring abort",
            ErrorClass::UserInterrupted => "Operation cancelled by user",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::DirectAccessUnavailable => write!(f, "DirectAccessUnavailable"),
            ErrorClass::Verification => write!(f, "Verification"),
            ErrorClass::ExternalTool => write!(f, "ExternalTool"),
            ErrorClass::Fatal => write!(f, "Fatal"),
            ErrorClass::UserInterrupted => write!(f, "UserInterrupted"),
        }
    }
}

/// Map an OS error raised while opening `path` onto the taxonomy.
///
/// Permission problems and "device busy" become `AccessDenied`; missing
/// paths and absent media become `NotFound`; anything else stays `Io`.
pub fn classify_io_error(path: &Path, err: io::Error) -> EraseError {
    let shown = path.display().to_string();

    if err.kind() == io::ErrorKind::PermissionDenied || is_busy(&err) {
        return EraseError::AccessDenied {
            path: shown,
            reason: err.to_string(),
        };
    }

    if err.kind() == io::ErrorKind::NotFound || is_no_device(&err) {
        return EraseError::NotFound(shown);
    }

    EraseError::Io(err)
}

#[cfg(unix)]
fn is_busy(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EBUSY)
}

#[cfg(windows)]
fn is_busy(err: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    matches!(err.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(any(unix, windows)))]
fn is_busy(_err: &io::Error) -> bool {
    false
}

#[cfg(unix)]
fn is_no_device(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::ENXIO) | Some(libc::ENODEV))
}

#[cfg(not(unix))]
fn is_no_device(_err: &io::Error) -> bool {
    false
}

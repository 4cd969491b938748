/// Error taxonomy for the erase engine
///
/// Every component reports failures through [`EraseError`]. The session
/// orchestrator is the only place these are converted into event-log
/// entries; nothing below it decides whether a failure is fatal.
///
/// # Classification
///
/// ```text
///  EraseError ──classify──▶ ErrorClass
///     AccessDenied / NotFound / ZeroSize  → DirectAccessUnavailable (fallback)
///     VerificationMismatch               → Verification
///     ExternalToolFailure / Timeout      → ExternalTool
///     Cancelled                          → UserInterrupted
///     everything else                    → Fatal
/// ```
pub mod classification;

pub use classification::{classify_io_error, ErrorClass};

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EraseError {
    #[error("Access denied to {path}: {reason}")]
    AccessDenied { path: String, reason: String },

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Device {0} reports a size of zero bytes")]
    ZeroSize(String),

    #[error("Verification mismatch at byte {offset}")]
    VerificationMismatch { offset: u64 },

    #[error("Pattern '{0}' has no expected value and cannot be verified")]
    UnverifiablePattern(String),

    #[error("External wipe tool failed: {0}")]
    ExternalToolFailure(String),

    #[error("External wipe tool timed out after {0:?}")]
    ExternalToolTimeout(Duration),

    #[error("Unknown erase standard: {0}")]
    UnknownStandard(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Random generator failure: {0}")]
    Rng(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled by user")]
    Cancelled,
}

impl EraseError {
    /// Category used for recovery decisions
    pub fn class(&self) -> ErrorClass {
        match self {
            EraseError::AccessDenied { .. } | EraseError::NotFound(_) | EraseError::ZeroSize(_) => {
                ErrorClass::DirectAccessUnavailable
            }
            EraseError::VerificationMismatch { .. } | EraseError::UnverifiablePattern(_) => {
                ErrorClass::Verification
            }
            EraseError::ExternalToolFailure(_) | EraseError::ExternalToolTimeout(_) => {
                ErrorClass::ExternalTool
            }
            EraseError::Cancelled => ErrorClass::UserInterrupted,
            _ => ErrorClass::Fatal,
        }
    }

    /// Whether this failure should route the session to the fallback utility
    pub fn triggers_fallback(&self) -> bool {
        self.class() == ErrorClass::DirectAccessUnavailable
    }
}

impl From<::config::ConfigError> for EraseError {
    fn from(err: ::config::ConfigError) -> Self {
        EraseError::Config(err.to_string())
    }
}

pub type EraseResult<T> = Result<T, EraseError>;

// Session event log and report
//
// The report is the only thing a session hands back. It is serialized
// verbatim for reporting collaborators and carries a SHA-256 fingerprint
// over its own canonical JSON (computed with the fingerprint field empty).

use crate::algorithms::StandardId;
use crate::compliance::{ComplianceAssessment, EraseMethod, VerificationOutcome};
use crate::crypto::sha256_fingerprint;
use crate::error::EraseResult;
use crate::DeviceIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    /// Result of opening the raw device
    Access,
    /// Which erase method the session is using
    Method,
    /// Switch to the external utility
    Fallback,
    PassStart,
    PassEnd,
    VerifyStart,
    VerifySuccess,
    VerifyFail,
    VerifySkip,
    /// Terminal event of the external utility
    Clean,
    CriticalError,
    Cancelled,
    Complete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        f.write_str(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub message: String,
    pub severity: Severity,
}

/// Append-only session log, mirrored to tracing as entries are added
#[derive(Debug, Clone)]
pub struct EventLog {
    device: String,
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: EventKind, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info | Severity::Success => {
                tracing::info!(device = %self.device, event = %kind, "{}", message)
            }
            Severity::Warning => tracing::warn!(device = %self.device, event = %kind, "{}", message),
            Severity::Error => tracing::error!(device = %self.device, event = %kind, "{}", message),
        }

        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            kind,
            message,
            severity,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// Terminal status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Erased,
    Failed,
    Cancelled,
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Erased => write!(f, "erased"),
            SessionOutcome::Failed => write!(f, "failed"),
            SessionOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What is known about the device contents when the session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Untouched,
    PartiallyOverwritten,
    /// Every write pass of the standard completed
    Overwritten,
    /// The external utility failed; how much it wrote is unknown
    Indeterminate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub device: DeviceIdentity,
    /// Size reported by the opened device; absent when it never opened
    pub device_size: Option<u64>,
    pub standard: StandardId,
    pub standard_name: String,
    pub method: EraseMethod,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub passes_completed: usize,
    pub passes_required: usize,
    pub verification: VerificationOutcome,
    pub outcome: SessionOutcome,
    pub device_state: DeviceState,
    pub success: bool,
    pub compliance: ComplianceAssessment,
    pub log: Vec<LogEntry>,
    #[serde(default)]
    pub fingerprint: String,
}

impl SessionReport {
    fn body_fingerprint(&self) -> EraseResult<String> {
        let mut body = self.clone();
        body.fingerprint.clear();
        sha256_fingerprint(&body)
    }

    /// Stamp the report with its fingerprint
    pub fn seal(mut self) -> Self {
        match self.body_fingerprint() {
            Ok(fingerprint) => self.fingerprint = fingerprint,
            Err(e) => tracing::warn!(error = %e, "Could not fingerprint session report"),
        }
        self
    }

    /// Whether the report is unchanged since it was sealed
    pub fn verify_fingerprint(&self) -> EraseResult<bool> {
        Ok(!self.fingerprint.is_empty() && self.body_fingerprint()? == self.fingerprint)
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.log.iter().filter(|e| e.kind == kind).count()
    }

    pub fn events(&self, kind: EventKind) -> impl Iterator<Item = &LogEntry> {
        self.log.iter().filter(move |e| e.kind == kind)
    }
}

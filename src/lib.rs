// Allow complex types where needed for trait-object plumbing
#![allow(clippy::type_complexity)]

pub mod algorithms;
pub mod compliance;
pub mod crypto;
pub mod error;
pub mod fallback;
pub mod io;
pub mod logging;
pub mod progress;
pub mod settings;
pub mod telemetry;
pub mod ui;
pub mod wipe_orchestrator;

// Re-export the session entry points for convenience
pub use algorithms::{Pattern, StandardDefinition, StandardId, Step};
pub use error::{EraseError, EraseResult};
pub use settings::EngineConfig;
pub use wipe_orchestrator::{
    erase_device, EraseSession, SessionOutcome, SessionReport,
};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative abort flag shared between a session and whoever may cancel it
/// (signal handler, front-end). Each session owns its own token.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (called by signal handler)
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag (primarily for testing)
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

lazy_static! {
    static ref WINDOWS_PHYSICAL_DRIVE: Regex =
        Regex::new(r"(?i)PhysicalDrive(\d+)$").expect("valid regex");
    static ref LINUX_SD_DEVICE: Regex = Regex::new(r"^/dev/sd([a-z])$").expect("valid regex");
}

/// Identity of a physical storage unit as supplied by the enumeration layer.
///
/// `size_hint` is provisional: the block device handle re-derives the
/// authoritative size when it opens the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub path: PathBuf,
    pub disk_number: Option<u32>,
    pub size_hint: Option<u64>,
    pub model: Option<String>,
    pub serial: Option<String>,
}

impl DeviceIdentity {
    /// Create an identity for a device path, inferring the disk number
    /// from `\\.\PhysicalDriveN` or `/dev/sdX` style paths.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let disk_number = infer_disk_number(&path);
        Self {
            path,
            disk_number,
            size_hint: None,
            model: None,
            serial: None,
        }
    }

    pub fn with_disk_number(mut self, number: u32) -> Self {
        self.disk_number = Some(number);
        self
    }

    pub fn with_size_hint(mut self, bytes: u64) -> Self {
        self.size_hint = Some(bytes);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Key used to give every device its own progress slot
    pub fn key(&self) -> String {
        self.path.display().to_string()
    }

    /// Short human-readable label ("Disk 2 (\\.\PhysicalDrive2)")
    pub fn label(&self) -> String {
        match self.disk_number {
            Some(n) => format!("Disk {} ({})", n, self.path.display()),
            None => self.path.display().to_string(),
        }
    }
}

fn infer_disk_number(path: &Path) -> Option<u32> {
    let text = path.to_string_lossy();
    if let Some(caps) = WINDOWS_PHYSICAL_DRIVE.captures(&text) {
        return caps[1].parse().ok();
    }
    LINUX_SD_DEVICE
        .captures(&text)
        .and_then(|caps| caps[1].bytes().next())
        .map(|letter| u32::from(letter - b'a'))
}

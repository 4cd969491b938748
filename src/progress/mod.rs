// Live progress shared between a running session and its observers
//
// One `ProgressState` record per device, always replaced whole. The
// serialized form is the status-file format read by external visualizers.

pub mod channel;
pub mod mirror;
pub mod tracker;

#[cfg(test)]
mod progress_tests;

pub use channel::{board, ProgressBoard, ProgressChannel};
pub use mirror::{read_status_file, write_status_file, StatusMirror};
pub use tracker::ProgressTracker;

use crate::DeviceIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a session as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WipeStatus {
    Initializing,
    Ready,
    Wiping,
    Complete,
    Failed,
    Cancelled,
}

impl WipeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WipeStatus::Complete | WipeStatus::Failed | WipeStatus::Cancelled)
    }
}

impl fmt::Display for WipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WipeStatus::Initializing => "initializing",
            WipeStatus::Ready => "ready",
            WipeStatus::Wiping => "wiping",
            WipeStatus::Complete => "complete",
            WipeStatus::Failed => "failed",
            WipeStatus::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Where the progress numbers come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateMode {
    /// Counted bytes from the pass executor
    Measured,
    /// Device write counters sampled while the fallback utility runs
    Telemetry,
    /// Elapsed time against an assumed throughput, never reaching 100
    TimeExtrapolated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSummary {
    pub path: String,
    pub model: String,
    pub serial: String,
    pub disk_number: Option<u32>,
    pub capacity_gb: f64,
}

impl DiskSummary {
    pub fn from_identity(device: &DeviceIdentity, size_bytes: u64) -> Self {
        Self {
            path: device.key(),
            model: device.model.clone().unwrap_or_else(|| "Unknown".to_string()),
            serial: device.serial.clone().unwrap_or_else(|| "N/A".to_string()),
            disk_number: device.disk_number,
            capacity_gb: size_bytes as f64 / (1024.0 * 1024.0 * 1024.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WipeSummary {
    pub total_sectors: u64,
    pub wiped_sectors: u64,
    pub progress_percent: f64,
    pub speed_mbps: f64,
    pub elapsed_seconds: u64,
    pub eta_seconds: u64,
    pub status: WipeStatus,
    pub estimate: EstimateMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub sector: u64,
    /// Position along the device scaled to 0..=1000, for visualizers
    pub track: u64,
    pub head: u32,
    pub pattern: String,
    pub pass_number: u32,
    pub operation: String,
}

/// Complete progress record for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub disk: DiskSummary,
    pub wipe: WipeSummary,
    pub current_operation: OperationSummary,
    pub timestamp: DateTime<Utc>,
}

impl ProgressState {
    /// Record published before anything has happened to the device
    pub fn initial(device: &DeviceIdentity, sector_size: u64) -> Self {
        let size = device.size_hint.unwrap_or(0);
        Self {
            disk: DiskSummary::from_identity(device, size),
            wipe: WipeSummary {
                total_sectors: size / sector_size.max(1),
                wiped_sectors: 0,
                progress_percent: 0.0,
                speed_mbps: 0.0,
                elapsed_seconds: 0,
                eta_seconds: 0,
                status: WipeStatus::Initializing,
                estimate: EstimateMode::Measured,
            },
            current_operation: OperationSummary {
                sector: 0,
                track: 0,
                head: 0,
                pattern: "0x00".to_string(),
                pass_number: 1,
                operation: "Preparing...".to_string(),
            },
            timestamp: Utc::now(),
        }
    }
}

use super::{DiskSummary, EstimateMode, ProgressChannel, ProgressState, WipeStatus};
use crate::DeviceIdentity;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

const MIB: f64 = 1024.0 * 1024.0;

/// Single-owner writer for one device's progress channel.
///
/// Keeps a working copy of the record, applies each update to it and
/// publishes the whole record. Percent is kept within 0..=100 and the
/// processed count never exceeds the total.
pub struct ProgressTracker {
    channel: Arc<ProgressChannel>,
    state: ProgressState,
    sector_size: u64,
    started: Instant,
    pass_started: Instant,
    total_passes: u32,
}

impl ProgressTracker {
    pub fn new(channel: Arc<ProgressChannel>, sector_size: u64) -> Self {
        let state = (*channel.snapshot()).clone();
        let now = Instant::now();
        Self {
            channel,
            state,
            sector_size: sector_size.max(1),
            started: now,
            pass_started: now,
            total_passes: 1,
        }
    }

    pub fn channel(&self) -> &Arc<ProgressChannel> {
        &self.channel
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Replace the provisional size with the one the device reported
    pub fn set_device_size(&mut self, device: &DeviceIdentity, size_bytes: u64) {
        self.state.disk = DiskSummary::from_identity(device, size_bytes);
        self.state.wipe.total_sectors = size_bytes / self.sector_size;
        self.publish();
    }

    pub fn set_total_passes(&mut self, passes: u32) {
        self.total_passes = passes.max(1);
    }

    pub fn set_status(&mut self, status: WipeStatus) {
        self.state.wipe.status = status;
        if status == WipeStatus::Complete {
            self.state.wipe.progress_percent = 100.0;
            self.state.wipe.wiped_sectors = self.state.wipe.total_sectors;
            self.state.wipe.eta_seconds = 0;
        }
        self.publish();
    }

    /// Start a new pass; per-pass counters start over
    pub fn begin_pass(
        &mut self,
        pass_number: u32,
        pattern_label: &str,
        operation: impl Into<String>,
        mode: EstimateMode,
    ) {
        self.pass_started = Instant::now();

        let op = &mut self.state.current_operation;
        op.pass_number = pass_number;
        op.head = pass_number % 8;
        op.pattern = pattern_label.to_string();
        op.operation = operation.into();
        op.sector = 0;
        op.track = 0;

        let wipe = &mut self.state.wipe;
        wipe.status = WipeStatus::Wiping;
        wipe.estimate = mode;
        wipe.wiped_sectors = 0;
        wipe.progress_percent = 0.0;

        self.publish();
    }

    /// Byte-accurate progress from the pass executor
    pub fn record_bytes(&mut self, processed: u64, total: u64) {
        let processed = processed.min(total);
        let percent = if total == 0 {
            100.0
        } else {
            processed as f64 / total as f64 * 100.0
        };

        let pass_secs = self.pass_started.elapsed().as_secs_f64();
        let speed = if pass_secs > 0.0 {
            processed as f64 / pass_secs / MIB
        } else {
            0.0
        };

        let remaining_passes = self
            .total_passes
            .saturating_sub(self.state.current_operation.pass_number);
        let remaining_bytes = (total - processed) + u64::from(remaining_passes) * total;
        let eta = if speed > 0.0 {
            (remaining_bytes as f64 / MIB / speed) as u64
        } else {
            0
        };

        let sector = processed / self.sector_size;
        self.state.wipe.estimate = EstimateMode::Measured;
        self.apply(sector, percent, speed, eta);
        self.state.current_operation.track = if total == 0 {
            1000
        } else {
            processed.saturating_mul(1000) / total
        };
        self.publish();
    }

    /// Progress from the fallback path, where only a percentage is known
    pub fn record_estimate(&mut self, percent: f64, speed_mbps: f64, eta_seconds: u64, mode: EstimateMode) {
        let percent = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
        let sector = (self.state.wipe.total_sectors as f64 * percent / 100.0) as u64;

        self.state.wipe.estimate = mode;
        self.apply(sector, percent, speed_mbps.max(0.0), eta_seconds);
        self.state.current_operation.track = (percent * 10.0) as u64;
        self.publish();
    }

    fn apply(&mut self, sector: u64, percent: f64, speed_mbps: f64, eta_seconds: u64) {
        let wipe = &mut self.state.wipe;
        wipe.wiped_sectors = sector.min(wipe.total_sectors);
        wipe.progress_percent = (percent.clamp(0.0, 100.0) * 100.0).round() / 100.0;
        wipe.speed_mbps = (speed_mbps * 100.0).round() / 100.0;
        wipe.eta_seconds = eta_seconds;
        self.state.current_operation.sector = wipe.wiped_sectors;
    }

    fn publish(&mut self) {
        self.state.wipe.elapsed_seconds = self.started.elapsed().as_secs();
        self.state.timestamp = Utc::now();
        self.channel.update(self.state.clone());
    }
}

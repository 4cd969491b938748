// Progress estimation for an opaque external wipe
//
// Two modes, kept distinct in every published record:
//   telemetry          bytes-written counters sampled between polls
//   time_extrapolated  elapsed / expected, capped below 100 until exit

use crate::progress::EstimateMode;
use crate::settings::FallbackConfig;
use crate::telemetry::IoTelemetry;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Highest percentage reported while the utility is still running
pub const RUNNING_PERCENT_CAP: f64 = 99.5;

const MIB: f64 = 1024.0 * 1024.0;

/// How long the utility should take at the assumed throughput
pub fn expected_duration(size_bytes: Option<u64>, config: &FallbackConfig) -> Duration {
    match size_bytes {
        Some(bytes) if bytes > 0 => {
            let secs = bytes as f64 / (config.assumed_throughput_mib_s * MIB);
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::from_secs(config.default_estimate_secs))
        }
        _ => Duration::from_secs(config.default_estimate_secs),
    }
}

/// Expected duration x multiplier, never below the configured floor
pub fn hard_timeout(expected: Duration, config: &FallbackConfig) -> Duration {
    let scaled = Duration::try_from_secs_f64(expected.as_secs_f64() * config.timeout_multiplier)
        .unwrap_or(Duration::MAX);
    scaled.max(Duration::from_secs(config.min_timeout_secs))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub percent: f64,
    pub speed_mbps: f64,
    pub eta_seconds: u64,
    pub mode: EstimateMode,
}

/// Elapsed-time extrapolation against an expected duration
#[derive(Debug, Clone, Copy)]
pub struct TimeEstimator {
    expected: Duration,
    size_bytes: Option<u64>,
}

impl TimeEstimator {
    pub fn new(expected: Duration, size_bytes: Option<u64>) -> Self {
        Self { expected, size_bytes }
    }

    pub fn estimate(&self, elapsed: Duration) -> Estimate {
        let expected = self.expected.as_secs_f64();
        let percent = if expected > 0.0 {
            (elapsed.as_secs_f64() / expected * 100.0).min(RUNNING_PERCENT_CAP)
        } else {
            RUNNING_PERCENT_CAP
        };

        let speed_mbps = match self.size_bytes {
            Some(bytes) if expected > 0.0 => bytes as f64 / expected / MIB,
            _ => 0.0,
        };

        Estimate {
            percent,
            speed_mbps,
            eta_seconds: self.expected.saturating_sub(elapsed).as_secs(),
            mode: EstimateMode::TimeExtrapolated,
        }
    }
}

/// Measured progress from device write counters
pub struct TelemetryEstimator {
    telemetry: Box<dyn IoTelemetry>,
    device: PathBuf,
    size_bytes: u64,
    baseline: u64,
    last: (Instant, u64),
    speed_mbps: f64,
}

impl TelemetryEstimator {
    /// `None` when the device has no counters or its size is unknown
    pub fn start(telemetry: Box<dyn IoTelemetry>, device: PathBuf, size_bytes: Option<u64>) -> Option<Self> {
        let size_bytes = size_bytes.filter(|&s| s > 0)?;
        let baseline = telemetry.bytes_written(&device)?;
        Some(Self {
            telemetry,
            device,
            size_bytes,
            baseline,
            last: (Instant::now(), baseline),
            speed_mbps: 0.0,
        })
    }

    pub fn sample(&mut self) -> Option<Estimate> {
        self.sample_at(Instant::now())
    }

    fn sample_at(&mut self, now: Instant) -> Option<Estimate> {
        let counter = self.telemetry.bytes_written(&self.device)?;
        let (last_at, last_counter) = self.last;

        let dt = now.saturating_duration_since(last_at).as_secs_f64();
        if dt > 0.0 {
            let delta = counter.saturating_sub(last_counter);
            self.speed_mbps = delta as f64 / dt / MIB;
        }
        self.last = (now, counter);

        let written = counter.saturating_sub(self.baseline).min(self.size_bytes);
        let percent = (written as f64 / self.size_bytes as f64 * 100.0).min(RUNNING_PERCENT_CAP);
        let remaining = (self.size_bytes - written) as f64 / MIB;
        let eta_seconds = if self.speed_mbps > 0.0 {
            (remaining / self.speed_mbps) as u64
        } else {
            0
        };

        Some(Estimate {
            percent,
            speed_mbps: self.speed_mbps,
            eta_seconds,
            mode: EstimateMode::Telemetry,
        })
    }
}

/// Telemetry when available, time extrapolation otherwise
pub struct FallbackEstimator {
    telemetry: Option<TelemetryEstimator>,
    time: TimeEstimator,
}

impl FallbackEstimator {
    pub fn new(telemetry: Option<TelemetryEstimator>, time: TimeEstimator) -> Self {
        Self { telemetry, time }
    }

    pub fn mode(&self) -> EstimateMode {
        if self.telemetry.is_some() {
            EstimateMode::Telemetry
        } else {
            EstimateMode::TimeExtrapolated
        }
    }

    pub fn estimate(&mut self, elapsed: Duration) -> Estimate {
        if let Some(sampler) = self.telemetry.as_mut() {
            if let Some(estimate) = sampler.sample() {
                return estimate;
            }
            tracing::debug!("Telemetry counter disappeared, switching to time-based estimate");
            self.telemetry = None;
        }
        self.time.estimate(elapsed)
    }
}

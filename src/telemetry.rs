// Optional per-device write counters
//
// Used by the fallback path to turn an opaque external process into a
// measured progress figure. Every source may be absent.

use std::path::Path;

/// Cumulative bytes written to a device since boot
#[cfg_attr(test, mockall::automock)]
pub trait IoTelemetry: Send + Sync {
    /// `None` when no counter exists for this device
    fn bytes_written(&self, device: &Path) -> Option<u64>;

    fn source_name(&self) -> &'static str;
}

/// Telemetry source for platforms without counters
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTelemetry;

impl IoTelemetry for NoTelemetry {
    fn bytes_written(&self, _device: &Path) -> Option<u64> {
        None
    }

    fn source_name(&self) -> &'static str {
        "none"
    }
}

/// `/proc/diskstats` reader
#[cfg(target_os = "linux")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcDiskStats;

#[cfg(target_os = "linux")]
impl ProcDiskStats {
    /// diskstats always counts in 512-byte units
    const SECTOR_BYTES: u64 = 512;
}

#[cfg(target_os = "linux")]
impl IoTelemetry for ProcDiskStats {
    fn bytes_written(&self, device: &Path) -> Option<u64> {
        let name = device.file_name()?.to_str()?;
        let stats = match procfs::diskstats() {
            Ok(stats) => stats,
            Err(e) => {
                tracing::debug!(error = %e, "diskstats unavailable");
                return None;
            }
        };

        stats
            .into_iter()
            .find(|stat| stat.name == name)
            .map(|stat| stat.sectors_written as u64 * Self::SECTOR_BYTES)
    }

    fn source_name(&self) -> &'static str {
        "procfs"
    }
}

/// Best telemetry source for this platform
pub fn default_telemetry() -> Box<dyn IoTelemetry> {
    #[cfg(target_os = "linux")]
    {
        Box::new(ProcDiskStats)
    }

    #[cfg(not(target_os = "linux"))]
    {
        Box::new(NoTelemetry)
    }
}

/// Fallback path: hand the whole device to an external wipe utility
///
/// Used once the direct path is known to be unusable. The utility is an
/// opaque child process; its exit status is the only success signal and
/// its output is kept as diagnostic text. While it runs, this unit polls
/// the child, publishes estimated progress and enforces a hard timeout.
///
/// ```text
///   spawn ──▶ poll (try_wait) ──▶ exited ──▶ success / ExternalToolFailure
///               │    ▲
///               ▼    │ sleep(poll_interval)
///          estimate + publish
///               │
///               ├── cancelled ──▶ kill ──▶ Cancelled
///               └── elapsed ≥ timeout ──▶ kill ──▶ ExternalToolTimeout
/// ```
pub mod command;
pub mod estimate;

pub use command::{FallbackCommand, RenderedCommand, DISKPART_SCRIPT};
pub use estimate::{
    expected_duration, hard_timeout, Estimate, FallbackEstimator, TelemetryEstimator, TimeEstimator,
    RUNNING_PERCENT_CAP,
};

use crate::error::{EraseError, EraseResult};
use crate::progress::{EstimateMode, ProgressTracker};
use crate::settings::FallbackConfig;
use crate::telemetry::{default_telemetry, IoTelemetry};
use crate::{CancelToken, DeviceIdentity};
use std::io::{Read, Write};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest output excerpt carried into an error message
const DIAGNOSTIC_EXCERPT: usize = 512;

/// How long to wait for the output pipes to close once the utility is gone
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

/// Outcome of a utility run that exited successfully
#[derive(Debug, Clone)]
pub struct FallbackRun {
    pub command: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    pub stdout: String,
    pub stderr: String,
    pub estimate: EstimateMode,
}

/// Something that can wipe a whole device without direct access
pub trait FallbackRunner: Send + Sync {
    /// Short description of what will run, for the event log
    fn describe(&self, device: &DeviceIdentity) -> EraseResult<String>;

    /// How progress will be estimated while the utility runs
    fn estimate_mode(&self, _device: &DeviceIdentity) -> EstimateMode {
        EstimateMode::TimeExtrapolated
    }

    fn run(
        &self,
        device: &DeviceIdentity,
        tracker: &mut ProgressTracker,
        cancel: &CancelToken,
    ) -> EraseResult<FallbackRun>;
}

pub struct FallbackExecutor {
    command: Option<FallbackCommand>,
    config: FallbackConfig,
    telemetry_factory: fn() -> Box<dyn IoTelemetry>,
}

impl FallbackExecutor {
    /// Configured command if any, else the platform default utility
    pub fn new(config: FallbackConfig) -> Self {
        let command = config
            .command
            .as_ref()
            .map(FallbackCommand::from_config)
            .or_else(FallbackCommand::platform_default);
        Self {
            command,
            config,
            telemetry_factory: default_telemetry,
        }
    }

    pub fn with_command(mut self, command: FallbackCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_telemetry(mut self, factory: fn() -> Box<dyn IoTelemetry>) -> Self {
        self.telemetry_factory = factory;
        self
    }

    fn command(&self) -> EraseResult<&FallbackCommand> {
        self.command.as_ref().ok_or_else(|| {
            EraseError::ExternalToolFailure("no whole-disk wipe utility available on this platform".to_string())
        })
    }

    fn spawn(&self, rendered: &RenderedCommand) -> EraseResult<Child> {
        let mut command = rendered.to_command();
        command
            .stdin(if rendered.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            EraseError::ExternalToolFailure(format!("failed to start {}: {}", rendered.program, e))
        })?;

        if let (Some(script), Some(mut stdin)) = (rendered.stdin.as_deref(), child.stdin.take()) {
            if let Err(e) = stdin.write_all(script.as_bytes()) {
                terminate(&mut child);
                return Err(EraseError::ExternalToolFailure(format!(
                    "failed to send script to {}: {}",
                    rendered.program, e
                )));
            }
            // stdin closes here so the utility sees end of script
        }

        Ok(child)
    }

    fn wait(
        &self,
        child: &mut Child,
        device: &DeviceIdentity,
        tracker: &mut ProgressTracker,
        cancel: &CancelToken,
    ) -> EraseResult<(ExitStatus, Duration, EstimateMode)> {
        let expected = expected_duration(device.size_hint, &self.config);
        let timeout = hard_timeout(expected, &self.config);
        let poll = self.config.poll_interval();

        let telemetry =
            TelemetryEstimator::start((self.telemetry_factory)(), device.path.clone(), device.size_hint);
        let mut estimator = FallbackEstimator::new(telemetry, TimeEstimator::new(expected, device.size_hint));
        let mode = estimator.mode();

        tracing::info!(
            device = %device.path.display(),
            expected_secs = expected.as_secs(),
            timeout_secs = timeout.as_secs(),
            estimate = ?mode,
            "Waiting for external wipe utility"
        );

        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                terminate(child);
                return Err(EraseError::Cancelled);
            }

            if let Some(status) = poll_exit(child)? {
                return Ok((status, started.elapsed(), estimator.mode()));
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                terminate(child);
                return Err(EraseError::ExternalToolTimeout(timeout));
            }

            let estimate = estimator.estimate(elapsed);
            tracker.record_estimate(estimate.percent, estimate.speed_mbps, estimate.eta_seconds, estimate.mode);

            thread::sleep(poll.min(timeout - elapsed));
        }
    }
}

impl FallbackRunner for FallbackExecutor {
    fn describe(&self, device: &DeviceIdentity) -> EraseResult<String> {
        Ok(self.command()?.render(device)?.to_string())
    }

    fn estimate_mode(&self, device: &DeviceIdentity) -> EstimateMode {
        match TelemetryEstimator::start((self.telemetry_factory)(), device.path.clone(), device.size_hint) {
            Some(_) => EstimateMode::Telemetry,
            None => EstimateMode::TimeExtrapolated,
        }
    }

    fn run(
        &self,
        device: &DeviceIdentity,
        tracker: &mut ProgressTracker,
        cancel: &CancelToken,
    ) -> EraseResult<FallbackRun> {
        let rendered = self.command()?.render(device)?;
        tracing::warn!(device = %device.path.display(), command = %rendered, "Starting external wipe utility");

        let mut child = self.spawn(&rendered)?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = self.wait(&mut child, device, tracker, cancel);
        let deadline = Instant::now() + OUTPUT_GRACE;
        let stdout = collect(stdout, deadline);
        let stderr = collect(stderr, deadline);
        let (status, elapsed, estimate) = waited?;

        tracing::debug!(stdout = %stdout.trim(), stderr = %stderr.trim(), "External wipe utility output");

        if !status.success() {
            let detail = if stderr.trim().is_empty() { &stdout } else { &stderr };
            return Err(EraseError::ExternalToolFailure(format!(
                "{} exited with {}: {}",
                rendered.program,
                status,
                excerpt(detail)
            )));
        }

        Ok(FallbackRun {
            command: rendered.to_string(),
            exit_code: status.code(),
            elapsed,
            stdout,
            stderr,
            estimate,
        })
    }
}

/// Non-blocking exit check; a child that can no longer be waited on is
/// killed rather than left running unobserved
fn poll_exit(child: &mut Child) -> EraseResult<Option<ExitStatus>> {
    match child.try_wait() {
        Ok(status) => Ok(status),
        Err(e) => {
            tracing::warn!(pid = child.id(), error = %e, "Lost track of external wipe utility, terminating it");
            terminate(child);
            Err(e.into())
        }
    }
}

/// Kill the utility and anything it started, then reap it
fn terminate(child: &mut Child) {
    kill_tree(child);
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "Kill failed, child already exited");
    }
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_tree(child: &Child) {
    // The child leads its own group, see RenderedCommand::to_command
    let pgid = child.id() as libc::pid_t;
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        tracing::debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(windows)]
fn kill_tree(child: &Child) {
    let pid = child.id().to_string();
    let killed = std::process::Command::new("taskkill")
        .args(["/T", "/F", "/PID", pid.as_str()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = killed {
        tracing::debug!(pid = %pid, error = %e, "taskkill failed");
    }
}

#[cfg(not(any(unix, windows)))]
fn kill_tree(_child: &Child) {}

/// Child pipe being read to the end on its own thread
struct OutputReader {
    buffer: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

/// Read a child pipe on its own thread so the child never blocks
fn drain<R: Read + Send + 'static>(source: Option<R>) -> Option<OutputReader> {
    source.map(|mut pipe| {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let handle = thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut bytes) => bytes.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
        });
        OutputReader { buffer, handle }
    })
}

/// Whatever output arrived before the pipe closed or `deadline` passed.
///
/// A process that escaped the kill can hold the pipe open indefinitely;
/// its reader is left detached.
fn collect(reader: Option<OutputReader>, deadline: Instant) -> String {
    let Some(reader) = reader else {
        return String::new();
    };
    while !reader.handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    if reader.handle.is_finished() {
        let _ = reader.handle.join();
    } else {
        tracing::debug!("Utility output pipe still open, keeping partial output");
    }
    let output = match reader.buffer.lock() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    };
    output
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= DIAGNOSTIC_EXCERPT {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - DIAGNOSTIC_EXCERPT;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}

// Erase Session Orchestrator - sequences one standard-driven erase of one device
//
// A session opens the device once and makes a single strategy decision:
// direct passes through the pass executor, or the external fallback
// utility when the raw device cannot be used. Every failure below this
// point is caught here, logged, and turned into the session report.

pub mod report;

pub use report::{DeviceState, EventKind, EventLog, LogEntry, SessionOutcome, SessionReport, Severity};

use crate::algorithms::{PassExecutor, Pattern, StandardDefinition, StandardId};
use crate::compliance::{assess, EraseMethod, SessionFacts, VerificationOutcome};
use crate::error::{EraseError, EraseResult};
use crate::fallback::{FallbackExecutor, FallbackRunner};
use crate::io::{BlockIo, DeviceOpener, RawDeviceOpener};
use crate::progress::{board, EstimateMode, ProgressChannel, ProgressTracker, WipeStatus};
use crate::settings::EngineConfig;
use crate::{CancelToken, DeviceIdentity};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// How the session will reach the device
enum Strategy {
    Direct(Box<dyn BlockIo>),
    Fallback,
    Abort,
}

/// Mutable facts accumulated while the session runs
struct RunState {
    method: EraseMethod,
    device_size: Option<u64>,
    passes_completed: usize,
    verification: VerificationOutcome,
    outcome: SessionOutcome,
    device_state: DeviceState,
}

impl RunState {
    fn new() -> Self {
        Self {
            method: EraseMethod::None,
            device_size: None,
            passes_completed: 0,
            verification: VerificationOutcome::NotPerformed,
            outcome: SessionOutcome::Erased,
            device_state: DeviceState::Untouched,
        }
    }

    fn mark_written(&mut self) {
        if self.device_state == DeviceState::Untouched {
            self.device_state = DeviceState::PartiallyOverwritten;
        }
    }
}

/// One erase of one device with one standard
pub struct EraseSession {
    device: DeviceIdentity,
    standard: StandardId,
    config: EngineConfig,
    opener: Box<dyn DeviceOpener>,
    fallback: Box<dyn FallbackRunner>,
    channel: Option<Arc<ProgressChannel>>,
    cancel: CancelToken,
}

impl EraseSession {
    pub fn new(device: DeviceIdentity, standard: StandardId, config: EngineConfig) -> Self {
        let opener = RawDeviceOpener {
            exclusive: config.exclusive_open,
        };
        let fallback = FallbackExecutor::new(config.fallback.clone());
        Self {
            device,
            standard,
            config,
            opener: Box::new(opener),
            fallback: Box::new(fallback),
            channel: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_opener(mut self, opener: Box<dyn DeviceOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_fallback(mut self, fallback: Box<dyn FallbackRunner>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Publish progress here instead of the device's slot on the global board
    pub fn with_channel(mut self, channel: Arc<ProgressChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// Run the session to completion. Never fails; the outcome is in the report.
    pub fn run(self) -> SessionReport {
        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let definition = self.standard.definition();

        let channel = match &self.channel {
            Some(channel) => Arc::clone(channel),
            None => board().register(&self.device, self.config.sector_size),
        };
        let mut tracker = ProgressTracker::new(channel, self.config.sector_size);
        tracker.set_total_passes(definition.write_pass_count() as u32);

        let mut log = EventLog::new(self.device.key());
        let mut run = RunState::new();

        log.push(
            EventKind::Start,
            Severity::Info,
            format!(
                "Erasing {} with {} (session {})",
                self.device.label(),
                definition.name,
                session_id
            ),
        );

        match self.acquire(&mut log, &mut tracker, &mut run) {
            Strategy::Direct(handle) => self.run_direct(handle, definition, &mut log, &mut tracker, &mut run),
            Strategy::Fallback => self.run_fallback(&mut log, &mut tracker, &mut run),
            Strategy::Abort => run.outcome = SessionOutcome::Failed,
        }

        self.finish(session_id, started_at, clock, definition, log, tracker, run)
    }

    /// The session's single recovery decision
    fn acquire(&self, log: &mut EventLog, tracker: &mut ProgressTracker, run: &mut RunState) -> Strategy {
        match self.opener.open(&self.device) {
            Ok(handle) if handle.size() == 0 => {
                drop(handle);
                run.device_size = Some(0);
                let err = EraseError::ZeroSize(self.device.key());
                log.push(EventKind::Access, Severity::Error, err.to_string());

                if self.config.fallback.enabled && self.config.fallback.on_zero_size {
                    self.choose_fallback(log)
                } else {
                    Strategy::Abort
                }
            }
            Ok(handle) => {
                let size = handle.size();
                run.device_size = Some(size);
                tracker.set_device_size(&self.device, size);
                tracker.set_status(WipeStatus::Ready);
                log.push(
                    EventKind::Access,
                    Severity::Info,
                    format!("Opened {} ({} bytes)", self.device.label(), size),
                );
                Strategy::Direct(handle)
            }
            Err(err) if err.triggers_fallback() => {
                log.push(EventKind::Access, Severity::Warning, err.to_string());
                if self.config.fallback.enabled {
                    self.choose_fallback(log)
                } else {
                    log.push(
                        EventKind::CriticalError,
                        Severity::Error,
                        "Direct access unavailable and fallback is disabled",
                    );
                    Strategy::Abort
                }
            }
            Err(err) => {
                log.push(EventKind::CriticalError, Severity::Error, err.to_string());
                Strategy::Abort
            }
        }
    }

    fn choose_fallback(&self, log: &mut EventLog) -> Strategy {
        log.push(
            EventKind::Fallback,
            Severity::Warning,
            "Direct device access unavailable, switching to the external wipe utility",
        );
        Strategy::Fallback
    }

    fn run_direct(
        &self,
        mut handle: Box<dyn BlockIo>,
        definition: &StandardDefinition,
        log: &mut EventLog,
        tracker: &mut ProgressTracker,
        run: &mut RunState,
    ) {
        run.method = EraseMethod::Direct;
        log.push(
            EventKind::Method,
            Severity::Info,
            format!(
                "Direct overwrite: {} pass(es) in {} byte chunks",
                definition.write_pass_count(),
                self.config.buffer_size
            ),
        );

        let executor = PassExecutor::new(self.config.buffer_size, self.cancel.clone());
        let result = self.execute_passes(&executor, handle.as_mut(), definition, log, tracker, run);

        // Release the device before reporting
        drop(handle);

        match result {
            Ok(()) => {}
            Err(EraseError::Cancelled) => {
                run.outcome = SessionOutcome::Cancelled;
                log.push(EventKind::Cancelled, Severity::Warning, "Erase cancelled by user");
            }
            Err(err) => {
                run.outcome = SessionOutcome::Failed;
                log.push(EventKind::CriticalError, Severity::Error, err.to_string());
            }
        }
    }

    fn execute_passes(
        &self,
        executor: &PassExecutor,
        device: &mut dyn BlockIo,
        definition: &StandardDefinition,
        log: &mut EventLog,
        tracker: &mut ProgressTracker,
        run: &mut RunState,
    ) -> EraseResult<()> {
        let patterns: Vec<Pattern> = definition.write_patterns().collect();
        let total = patterns.len();

        for (index, pattern) in patterns.into_iter().enumerate() {
            let pass_number = index + 1;
            let operation = format!("Pass {}/{}: writing {}", pass_number, total, pattern.label());
            log.push(EventKind::PassStart, Severity::Info, operation.clone());
            tracker.begin_pass(pass_number as u32, &pattern.label(), operation, EstimateMode::Measured);

            let started = Instant::now();
            for checkpoint in executor.write_pass(device, pattern) {
                let checkpoint = checkpoint.map_err(|err| {
                    // A failed write may still have reached the medium
                    if !matches!(err, EraseError::Cancelled) {
                        run.mark_written();
                    }
                    err
                })?;
                run.mark_written();
                tracker.record_bytes(checkpoint.processed, checkpoint.total);
            }

            run.passes_completed += 1;
            log.push(
                EventKind::PassEnd,
                Severity::Success,
                format!(
                    "Pass {}/{} complete in {}",
                    pass_number,
                    total,
                    humantime::format_duration(std::time::Duration::from_secs(started.elapsed().as_secs()))
                ),
            );
        }
        run.device_state = DeviceState::Overwritten;

        if !definition.verify {
            run.verification = VerificationOutcome::NotRequested;
            return Ok(());
        }

        match definition.verification_target() {
            Some(pattern) if pattern.is_verifiable() => {
                self.verify(executor, device, pattern, total, log, tracker, run)
            }
            Some(pattern) => {
                run.verification = VerificationOutcome::Skipped;
                log.push(
                    EventKind::VerifySkip,
                    Severity::Warning,
                    format!("Final pass wrote {} data, which cannot be verified", pattern),
                );
                Ok(())
            }
            None => {
                run.verification = VerificationOutcome::NotRequested;
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn verify(
        &self,
        executor: &PassExecutor,
        device: &mut dyn BlockIo,
        pattern: Pattern,
        pass_number: usize,
        log: &mut EventLog,
        tracker: &mut ProgressTracker,
        run: &mut RunState,
    ) -> EraseResult<()> {
        let operation = format!("Verifying final pass ({})", pattern.label());
        log.push(EventKind::VerifyStart, Severity::Info, operation.clone());
        tracker.begin_pass(pass_number as u32, &pattern.label(), operation, EstimateMode::Measured);

        let mismatch = match read_back(executor, device, pattern, tracker) {
            Ok(mismatch) => mismatch,
            Err(err) => {
                if !matches!(err, EraseError::Cancelled) {
                    run.verification = VerificationOutcome::Failed { offset: None };
                }
                return Err(err);
            }
        };

        match mismatch {
            None => {
                run.verification = VerificationOutcome::Passed;
                log.push(
                    EventKind::VerifySuccess,
                    Severity::Success,
                    format!("Every byte reads back as {}", pattern.label()),
                );
            }
            Some(offset) => {
                run.verification = VerificationOutcome::Failed { offset: Some(offset) };
                run.outcome = SessionOutcome::Failed;
                log.push(
                    EventKind::VerifyFail,
                    Severity::Error,
                    EraseError::VerificationMismatch { offset }.to_string(),
                );
            }
        }
        Ok(())
    }

    fn run_fallback(&self, log: &mut EventLog, tracker: &mut ProgressTracker, run: &mut RunState) {
        run.method = EraseMethod::Fallback;

        let description = match self.fallback.describe(&self.device) {
            Ok(description) => description,
            Err(err) => {
                run.outcome = SessionOutcome::Failed;
                log.push(EventKind::Clean, Severity::Error, err.to_string());
                return;
            }
        };
        log.push(
            EventKind::Method,
            Severity::Info,
            format!("External whole-disk wipe: {}", description),
        );

        tracker.set_status(WipeStatus::Ready);
        let mode = self.fallback.estimate_mode(&self.device);
        tracker.begin_pass(1, &Pattern::Zeros.label(), "External wipe utility running", mode);

        match self.fallback.run(&self.device, tracker, &self.cancel) {
            Ok(done) => {
                run.passes_completed = 1;
                run.device_state = DeviceState::Overwritten;
                log.push(
                    EventKind::Clean,
                    Severity::Success,
                    format!(
                        "External wipe finished in {} (exit code {})",
                        humantime::format_duration(std::time::Duration::from_secs(done.elapsed.as_secs())),
                        done.exit_code.map_or_else(|| "none".to_string(), |c| c.to_string())
                    ),
                );
            }
            Err(EraseError::Cancelled) => {
                run.outcome = SessionOutcome::Cancelled;
                run.device_state = DeviceState::PartiallyOverwritten;
                log.push(
                    EventKind::Cancelled,
                    Severity::Warning,
                    "External wipe cancelled by user, utility terminated",
                );
            }
            Err(err) => {
                run.outcome = SessionOutcome::Failed;
                run.device_state = DeviceState::Indeterminate;
                log.push(EventKind::Clean, Severity::Error, err.to_string());
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        session_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        clock: Instant,
        definition: &StandardDefinition,
        mut log: EventLog,
        mut tracker: ProgressTracker,
        run: RunState,
    ) -> SessionReport {
        let success = run.outcome == SessionOutcome::Erased;
        tracker.set_status(match run.outcome {
            SessionOutcome::Erased => WipeStatus::Complete,
            SessionOutcome::Failed => WipeStatus::Failed,
            SessionOutcome::Cancelled => WipeStatus::Cancelled,
        });

        let duration = clock.elapsed();
        let severity = match run.outcome {
            SessionOutcome::Erased => Severity::Success,
            SessionOutcome::Cancelled => Severity::Warning,
            SessionOutcome::Failed => Severity::Error,
        };
        log.push(
            EventKind::Complete,
            severity,
            format!(
                "Session {} after {}",
                run.outcome,
                humantime::format_duration(std::time::Duration::from_secs(duration.as_secs()))
            ),
        );

        let compliance = assess(
            definition,
            &SessionFacts {
                method: run.method,
                passes_completed: run.passes_completed,
                verification: run.verification,
                erased: success,
            },
        );

        SessionReport {
            session_id,
            device: self.device.clone(),
            device_size: run.device_size,
            standard: self.standard,
            standard_name: definition.name.to_string(),
            method: run.method,
            started_at,
            finished_at: Utc::now(),
            duration_seconds: duration.as_secs_f64(),
            passes_completed: run.passes_completed,
            passes_required: definition.write_pass_count(),
            verification: run.verification,
            outcome: run.outcome,
            device_state: run.device_state,
            success,
            compliance,
            log: log.into_entries(),
            fingerprint: String::new(),
        }
        .seal()
    }
}

/// Drive a verify pass to its end, returning the first mismatching offset
fn read_back(
    executor: &PassExecutor,
    device: &mut dyn BlockIo,
    pattern: Pattern,
    tracker: &mut ProgressTracker,
) -> EraseResult<Option<u64>> {
    let mut mismatch = None;
    for progress in executor.verify_pass(device, pattern)? {
        let progress = progress?;
        tracker.record_bytes(progress.verified, progress.total);
        mismatch = progress.mismatch_offset();
    }
    Ok(mismatch)
}

/// Convenience function for a one-off erase with default collaborators
pub fn erase_device(device: DeviceIdentity, standard: StandardId, config: EngineConfig) -> SessionReport {
    EraseSession::new(device, standard, config).run()
}

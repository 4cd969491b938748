use super::{ProgressChannel, ProgressState};
use crate::error::{EraseError, EraseResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Write a snapshot so readers only ever see a complete file.
///
/// The record goes to a temp file in the target directory which is then
/// renamed over `path`.
pub fn write_status_file(path: &Path, state: &ProgressState) -> EraseResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, state)?;
    temp.write_all(b"\n")?;
    temp.flush()?;
    temp.persist(path).map_err(|e| EraseError::Io(e.error))?;
    Ok(())
}

pub fn read_status_file(path: &Path) -> EraseResult<ProgressState> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Background task mirroring a progress channel into a status file
pub struct StatusMirror {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl StatusMirror {
    /// Must be called from within a tokio runtime
    pub fn spawn(channel: Arc<ProgressChannel>, path: PathBuf, interval: Duration) -> Self {
        let (stop, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        persist_snapshot(&channel, &path).await;
                    }
                    _ = stop_rx.changed() => break,
                }
            }

            // Final record after the session has settled
            persist_snapshot(&channel, &path).await;
            tracing::debug!(path = %path.display(), "Status mirror stopped");
        });

        Self { stop, handle }
    }

    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Status mirror task ended abnormally");
        }
    }
}

async fn persist_snapshot(channel: &ProgressChannel, path: &Path) {
    let snapshot = channel.snapshot();
    let target = path.to_path_buf();

    let result = tokio::task::spawn_blocking(move || write_status_file(&target, &snapshot)).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(path = %path.display(), error = %e, "Failed to write status file"),
        Err(e) => tracing::warn!(error = %e, "Status writer task failed"),
    }
}

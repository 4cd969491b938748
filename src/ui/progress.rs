use crate::progress::{EstimateMode, ProgressState, WipeStatus};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Bar resolution; progress is drawn in tenths of a percent
const BAR_SCALE: u64 = 1000;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.green/white}] {msg}";

/// Terminal rendering of progress snapshots.
///
/// The view never talks to a session; it is fed whatever the progress
/// channel last published, so it can be driven from any thread.
pub struct ProgressView {
    bar: ProgressBar,
    last_pass: u32,
}

impl ProgressView {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(BAR_SCALE))
    }

    /// A view that draws nothing (non-interactive output, tests)
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(Some(BAR_SCALE), ProgressDrawTarget::hidden()))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        bar.set_style(style);
        Self { bar, last_pass: 0 }
    }

    /// Draw one snapshot
    pub fn render(&mut self, state: &ProgressState) {
        let pass = state.current_operation.pass_number;
        if pass != self.last_pass {
            if self.last_pass != 0 && !state.current_operation.operation.is_empty() {
                self.bar.println(format!("  {}", state.current_operation.operation));
            }
            self.last_pass = pass;
        }

        self.bar.set_position(bar_position(state.wipe.progress_percent));
        self.bar.set_message(status_line(state));
    }

    /// Draw the final snapshot and leave it on screen
    pub fn finish(&self, state: &ProgressState) {
        self.bar.set_position(bar_position(state.wipe.progress_percent));
        self.bar.finish_with_message(status_line(state));
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for ProgressView {
    fn default() -> Self {
        Self::new()
    }
}

fn bar_position(percent: f64) -> u64 {
    if percent.is_nan() {
        return 0;
    }
    (percent.clamp(0.0, 100.0) * (BAR_SCALE as f64 / 100.0)).round() as u64
}

/// One-line description of a snapshot, shown next to the bar
pub fn status_line(state: &ProgressState) -> String {
    let wipe = &state.wipe;
    let mut line = format!("{:>5.1}%", if wipe.progress_percent.is_nan() { 0.0 } else { wipe.progress_percent });

    if state.current_operation.pass_number > 0 {
        line.push_str(&format!(
            "  pass {} ({})",
            state.current_operation.pass_number, state.current_operation.pattern
        ));
    }

    match wipe.status {
        WipeStatus::Wiping => {
            if wipe.speed_mbps > 0.0 {
                line.push_str(&format!("  @ {}/s", human_bytes(wipe.speed_mbps * 1024.0 * 1024.0)));
            }
            line.push_str(&format!("  ETA {}", format_duration(wipe.eta_seconds)));
            if wipe.estimate == EstimateMode::TimeExtrapolated {
                line.push_str("  (estimated)");
            }
        }
        status => line.push_str(&format!("  {}", status)),
    }
    line
}

/// Convert bytes/sec to readable string
pub fn human_bytes(bps: f64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    if !bps.is_finite() || bps <= 0.0 {
        return "0B".to_string();
    }
    let mut val = bps;
    let mut i = 0usize;
    while val >= 1024.0 && i + 1 < units.len() {
        val /= 1024.0;
        i += 1;
    }
    format!("{:.2}{}", val, units[i])
}

/// Format seconds to H:MM:SS or M:SS
pub fn format_duration(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

// Tests for the terminal progress view
//
// Tests cover: human_bytes conversion, duration formatting, status line
// composition and bar positioning from progress snapshots.

use super::progress::*;
use crate::progress::{EstimateMode, ProgressState, WipeStatus};
use crate::DeviceIdentity;

fn wiping_state(percent: f64) -> ProgressState {
    let mut state = ProgressState::initial(&DeviceIdentity::new("/dev/sdb"), 512);
    state.wipe.status = WipeStatus::Wiping;
    state.wipe.progress_percent = percent;
    state.wipe.speed_mbps = 150.0;
    state.wipe.eta_seconds = 125;
    state.current_operation.pass_number = 2;
    state.current_operation.pattern = "0xFF".to_string();
    state.current_operation.operation = "Pass 2/3: writing 0xFF".to_string();
    state
}

// ==================== HUMAN BYTES CONVERSION TESTS ====================

#[test]
fn test_human_bytes_zero() {
    assert_eq!(human_bytes(0.0), "0B");
}

#[test]
fn test_human_bytes_negative() {
    assert_eq!(human_bytes(-100.0), "0B", "Negative values should return 0B");
}

#[test]
fn test_human_bytes_not_finite() {
    assert_eq!(human_bytes(f64::NAN), "0B");
    assert_eq!(human_bytes(f64::INFINITY), "0B");
}

#[test]
fn test_human_bytes_units() {
    assert_eq!(human_bytes(512.0), "512.00B");
    assert_eq!(human_bytes(1536.0), "1.50KB");
    assert_eq!(human_bytes(2.5 * 1024.0 * 1024.0), "2.50MB");
    assert_eq!(human_bytes(5.75 * 1024.0 * 1024.0 * 1024.0), "5.75GB");
    assert_eq!(human_bytes(2.25 * 1024.0 * 1024.0 * 1024.0 * 1024.0), "2.25TB");
}

#[test]
fn test_human_bytes_boundary_1023_mb() {
    assert_eq!(human_bytes(1023.0 * 1024.0 * 1024.0), "1023.00MB");
}

#[test]
fn test_human_bytes_caps_at_terabytes() {
    let result = human_bytes(2048.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0);
    assert_eq!(result, "2048.00TB");
}

// ==================== DURATION FORMATTING TESTS ====================

#[test]
fn test_format_duration_zero() {
    assert_eq!(format_duration(0), "0:00");
}

#[test]
fn test_format_duration_minutes_seconds() {
    assert_eq!(format_duration(59), "0:59");
    assert_eq!(format_duration(60), "1:00");
    assert_eq!(format_duration(3599), "59:59");
}

#[test]
fn test_format_duration_hours() {
    assert_eq!(format_duration(3600), "1:00:00");
    assert_eq!(format_duration(3661), "1:01:01");
    assert_eq!(format_duration(86400), "24:00:00");
}

#[test]
fn test_format_duration_real_world_1tb_drive() {
    // 1 TB at 150 MB/s
    let secs = (1024 * 1024) / 150;
    assert_eq!(format_duration(secs), "1:56:30");
}

// ==================== STATUS LINE TESTS ====================

#[test]
fn test_status_line_while_wiping() {
    let line = status_line(&wiping_state(42.25));
    assert!(line.starts_with(" 42.2%") || line.starts_with(" 42.3%"), "{}", line);
    assert!(line.contains("pass 2 (0xFF)"));
    assert!(line.contains("@ 150.00MB/s"));
    assert!(line.contains("ETA 2:05"));
    assert!(!line.contains("estimated"));
}

#[test]
fn test_status_line_marks_extrapolated_estimates() {
    let mut state = wiping_state(10.0);
    state.wipe.estimate = EstimateMode::TimeExtrapolated;
    state.wipe.speed_mbps = 0.0;

    let line = status_line(&state);
    assert!(line.contains("(estimated)"));
    assert!(!line.contains('@'), "No speed shown without a measurement");
}

#[test]
fn test_status_line_terminal_status() {
    let mut state = wiping_state(100.0);
    state.wipe.status = WipeStatus::Complete;

    let line = status_line(&state);
    assert!(line.starts_with("100.0%"));
    assert!(line.ends_with("complete"));
    assert!(!line.contains("ETA"));
}

#[test]
fn test_status_line_before_first_pass() {
    let state = ProgressState::initial(&DeviceIdentity::new("/dev/sdc"), 512);
    let line = status_line(&state);
    assert!(line.starts_with("  0.0%"));
    assert!(line.ends_with("initializing"));
    assert!(!line.contains("ETA"));
}

#[test]
fn test_status_line_nan_percent() {
    let line = status_line(&wiping_state(f64::NAN));
    assert!(line.starts_with("  0.0%"));
}

// ==================== VIEW TESTS ====================

#[test]
fn test_view_position_tracks_percent() {
    let mut view = ProgressView::hidden();
    view.render(&wiping_state(50.0));
    assert_eq!(view.position(), 500);

    view.render(&wiping_state(99.5));
    assert_eq!(view.position(), 995);
}

#[test]
fn test_view_clamps_out_of_range_percent() {
    let mut view = ProgressView::hidden();
    view.render(&wiping_state(140.0));
    assert_eq!(view.position(), 1000);

    view.render(&wiping_state(-3.0));
    assert_eq!(view.position(), 0);

    view.render(&wiping_state(f64::NAN));
    assert_eq!(view.position(), 0);
}

#[test]
fn test_view_finish_keeps_final_position() {
    let mut view = ProgressView::hidden();
    let mut state = wiping_state(100.0);
    view.render(&state);
    state.wipe.status = WipeStatus::Complete;
    view.finish(&state);
    assert_eq!(view.position(), 1000);
}

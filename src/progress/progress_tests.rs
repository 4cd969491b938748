// Tests for the progress channel, board, tracker and status file
//
// Tests cover: whole-record replacement, concurrent readers, per-device
// slots, clamping of percent and processed counts, and atomic status files.

use super::*;
use crate::DeviceIdentity;
use proptest::prelude::*;
use serial_test::serial;
use std::sync::Arc;
use std::thread;

fn device() -> DeviceIdentity {
    DeviceIdentity::new("/dev/sdb")
        .with_size_hint(10 * 1024 * 1024)
        .with_model("Test Disk")
}

fn tracker_for(device: &DeviceIdentity) -> ProgressTracker {
    let channel = Arc::new(ProgressChannel::new(ProgressState::initial(device, 512)));
    ProgressTracker::new(channel, 512)
}

// ==================== CHANNEL TESTS ====================

#[test]
fn test_initial_state_is_initializing() {
    let state = ProgressState::initial(&device(), 512);
    assert_eq!(state.wipe.status, WipeStatus::Initializing);
    assert_eq!(state.wipe.total_sectors, 20480);
    assert_eq!(state.disk.model, "Test Disk");
    assert_eq!(state.disk.serial, "N/A");
    assert_eq!(state.current_operation.operation, "Preparing...");
}

#[test]
fn test_update_replaces_whole_record() {
    let channel = ProgressChannel::new(ProgressState::initial(&device(), 512));
    let before = channel.snapshot();

    let mut next = (*before).clone();
    next.wipe.status = WipeStatus::Wiping;
    next.wipe.progress_percent = 42.0;
    channel.update(next);

    let after = channel.snapshot();
    assert_eq!(after.wipe.progress_percent, 42.0);
    assert_eq!(before.wipe.progress_percent, 0.0, "Old snapshots stay intact");
}

#[test]
fn test_concurrent_readers_see_complete_records() {
    let channel = Arc::new(ProgressChannel::new(ProgressState::initial(&device(), 512)));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for _ in 0..500 {
                    let snap = channel.snapshot();
                    // Writer keeps these two fields in lockstep
                    assert_eq!(snap.wipe.wiped_sectors, snap.current_operation.sector);
                }
            })
        })
        .collect();

    for i in 0..500u64 {
        let mut next = (*channel.snapshot()).clone();
        next.wipe.wiped_sectors = i;
        next.current_operation.sector = i;
        channel.update(next);
    }

    for reader in readers {
        reader.join().unwrap();
    }
}

// ==================== BOARD TESTS ====================

#[test]
fn test_board_keeps_devices_apart() {
    let board = ProgressBoard::new();
    let a = board.register(&DeviceIdentity::new("/dev/sda"), 512);
    let b = board.register(&DeviceIdentity::new("/dev/sdb"), 512);

    let mut state = (*a.snapshot()).clone();
    state.wipe.status = WipeStatus::Wiping;
    a.update(state);

    assert_eq!(board.snapshot("/dev/sda").unwrap().wipe.status, WipeStatus::Wiping);
    assert_eq!(b.snapshot().wipe.status, WipeStatus::Initializing);
    assert!(board.get("/dev/sdc").is_none());
}

#[test]
fn test_board_register_resets_existing_slot() {
    let board = ProgressBoard::new();
    let first = board.register(&device(), 512);
    let mut state = (*first.snapshot()).clone();
    state.wipe.status = WipeStatus::Complete;
    first.update(state);

    let second = board.register(&device(), 512);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.snapshot().wipe.status, WipeStatus::Initializing);
}

#[test]
#[serial]
fn test_global_board_is_shared() {
    let id = DeviceIdentity::new("/dev/global-board-test");
    let channel = board().register(&id, 512);
    assert!(Arc::ptr_eq(&channel, &board().get(&id.key()).unwrap()));
    board().remove(&id.key());
    assert!(board().get(&id.key()).is_none());
}

// ==================== TRACKER TESTS ====================

#[test]
fn test_tracker_publishes_pass_start() {
    let id = device();
    let mut tracker = tracker_for(&id);
    tracker.begin_pass(2, "0xFF", "Pass 2/3", EstimateMode::Measured);

    let snap = tracker.channel().snapshot();
    assert_eq!(snap.wipe.status, WipeStatus::Wiping);
    assert_eq!(snap.current_operation.pass_number, 2);
    assert_eq!(snap.current_operation.pattern, "0xFF");
    assert_eq!(snap.current_operation.head, 2);
}

#[test]
fn test_tracker_records_bytes() {
    let id = device();
    let mut tracker = tracker_for(&id);
    tracker.set_device_size(&id, 10 * 1024 * 1024);
    tracker.begin_pass(1, "0x00", "Pass 1/1", EstimateMode::Measured);
    tracker.record_bytes(5 * 1024 * 1024, 10 * 1024 * 1024);

    let snap = tracker.channel().snapshot();
    assert_eq!(snap.wipe.progress_percent, 50.0);
    assert_eq!(snap.wipe.wiped_sectors, 10240);
    assert_eq!(snap.current_operation.track, 500);
}

#[test]
fn test_tracker_clamps_processed_beyond_total() {
    let id = device();
    let mut tracker = tracker_for(&id);
    tracker.record_bytes(20 * 1024 * 1024, 10 * 1024 * 1024);

    let snap = tracker.channel().snapshot();
    assert_eq!(snap.wipe.progress_percent, 100.0);
    assert!(snap.wipe.wiped_sectors <= snap.wipe.total_sectors);
}

#[test]
fn test_tracker_complete_sets_full_progress() {
    let id = device();
    let mut tracker = tracker_for(&id);
    tracker.set_status(WipeStatus::Complete);
    let snap = tracker.channel().snapshot();
    assert_eq!(snap.wipe.progress_percent, 100.0);
    assert!(snap.wipe.status.is_terminal());
}

#[test]
fn test_estimate_mode_is_published() {
    let id = device();
    let mut tracker = tracker_for(&id);
    tracker.record_estimate(12.5, 0.0, 600, EstimateMode::TimeExtrapolated);
    let snap = tracker.channel().snapshot();
    assert_eq!(snap.wipe.estimate, EstimateMode::TimeExtrapolated);
    assert_eq!(snap.wipe.eta_seconds, 600);

    let json = serde_json::to_value(&*snap).unwrap();
    assert_eq!(json["wipe"]["estimate"], "time_extrapolated");
    assert_eq!(json["wipe"]["status"], "initializing");
}

proptest! {
    #[test]
    fn prop_tracker_percent_always_in_range(
        processed in any::<u64>(),
        total in any::<u32>(),
        estimate in prop::num::f64::ANY,
    ) {
        let id = device();
        let mut tracker = tracker_for(&id);

        tracker.record_bytes(processed, u64::from(total));
        let snap = tracker.channel().snapshot();
        prop_assert!((0.0..=100.0).contains(&snap.wipe.progress_percent));
        prop_assert!(snap.wipe.wiped_sectors <= snap.wipe.total_sectors);

        tracker.record_estimate(estimate, 1.0, 0, EstimateMode::Telemetry);
        let snap = tracker.channel().snapshot();
        prop_assert!((0.0..=100.0).contains(&snap.wipe.progress_percent));
        prop_assert!(snap.wipe.wiped_sectors <= snap.wipe.total_sectors);
    }
}

// ==================== STATUS FILE TESTS ====================

#[test]
fn test_status_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live_wipe_status.json");
    let state = ProgressState::initial(&device(), 512);

    write_status_file(&path, &state).unwrap();
    let back = read_status_file(&path).unwrap();
    assert_eq!(back, state);
}

#[test]
fn test_status_file_replaced_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.json");
    let mut state = ProgressState::initial(&device(), 512);

    write_status_file(&path, &state).unwrap();
    state.wipe.status = WipeStatus::Complete;
    write_status_file(&path, &state).unwrap();

    assert_eq!(read_status_file(&path).unwrap().wipe.status, WipeStatus::Complete);
    // Only the status file remains; temp files were renamed away
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_status_mirror_writes_final_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.json");
    let id = device();
    let mut tracker = tracker_for(&id);

    let mirror = StatusMirror::spawn(
        Arc::clone(tracker.channel()),
        path.clone(),
        std::time::Duration::from_millis(20),
    );
    tracker.set_status(WipeStatus::Ready);
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    tracker.set_status(WipeStatus::Complete);
    mirror.shutdown().await;

    let written = read_status_file(&path).unwrap();
    assert_eq!(written.wipe.status, WipeStatus::Complete);
}

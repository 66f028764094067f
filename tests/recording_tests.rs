// SPDX-License-Identifier: GPL-3.0-only

//! Recording lifecycle and storage watchdog integration tests

mod support;

use shutter::device::DeviceRegistry;
use shutter::device::simulated::SimulatedPlatform;
use shutter::session::SessionController;
use shutter::settings::MemorySettingsStore;
use shutter::{CameraEvent, CaptureError, StopReason};
use std::sync::Arc;
use std::time::Duration;
use support::{TestStorage, test_config, wait_for};

fn controller_with(storage: Arc<TestStorage>) -> SessionController {
    let registry = Arc::new(DeviceRegistry::new(Arc::new(
        SimulatedPlatform::default_pair(),
    )));
    SessionController::with_config(
        registry,
        storage,
        Arc::new(MemorySettingsStore::new()),
        test_config(),
    )
}

#[tokio::test]
async fn test_record_start_stop_produces_file() {
    let storage = Arc::new(TestStorage::new("rec-roundtrip"));
    let controller = controller_with(storage.clone());
    let mut events = controller.subscribe();

    controller.open(None).await.unwrap();
    controller.start_recording();
    wait_for(&mut events, |e| matches!(e, CameraEvent::RecordingStarted)).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    controller.stop_recording();

    let event = wait_for(&mut events, |e| {
        matches!(e, CameraEvent::RecordingStopped { .. })
    })
    .await;
    match event {
        CameraEvent::RecordingStopped { path, reason } => {
            assert_eq!(reason, StopReason::Requested);
            assert_eq!(path.extension().unwrap(), "mp4");
            assert!(path.exists(), "recording file should be finalized");
            assert_eq!(storage.scanned_paths(), vec![path]);
        }
        other => panic!("expected RecordingStopped, got {:?}", other),
    }
}

#[tokio::test]
async fn test_record_blocked_without_free_space() {
    let storage = Arc::new(TestStorage::new("rec-low-space"));
    // 200 MB is the threshold; at-threshold is not enough
    storage.set_free_mb(Some(200));
    let controller = controller_with(storage);
    let mut events = controller.subscribe();

    controller.open(None).await.unwrap();
    controller.start_recording();

    let event = wait_for(&mut events, |e| matches!(e, CameraEvent::CaptureFailed(_))).await;
    assert!(matches!(
        event,
        CameraEvent::CaptureFailed(CaptureError::StorageExhausted)
    ));
}

#[tokio::test]
async fn test_record_blocked_when_storage_not_ready() {
    let storage = Arc::new(TestStorage::new("rec-not-ready"));
    storage.set_ready(false);
    let controller = controller_with(storage);
    let mut events = controller.subscribe();

    controller.open(None).await.unwrap();
    controller.start_recording();

    let event = wait_for(&mut events, |e| matches!(e, CameraEvent::CaptureFailed(_))).await;
    assert!(matches!(
        event,
        CameraEvent::CaptureFailed(CaptureError::StorageUnavailable)
    ));
}

#[tokio::test]
async fn test_recording_auto_stops_when_space_exhausts() {
    let storage = Arc::new(TestStorage::new("rec-watchdog"));
    let controller = controller_with(storage.clone());
    let mut events = controller.subscribe();

    controller.open(None).await.unwrap();
    controller.start_recording();
    wait_for(&mut events, |e| matches!(e, CameraEvent::RecordingStarted)).await;

    // Space runs out mid-recording; the poll notices and stops it
    storage.set_free_mb(Some(50));

    let event = wait_for(&mut events, |e| {
        matches!(e, CameraEvent::RecordingStopped { .. })
    })
    .await;
    match event {
        CameraEvent::RecordingStopped { path, reason } => {
            assert_eq!(reason, StopReason::StorageExhausted);
            assert!(path.exists(), "auto-stopped recording must still be finalized");
        }
        other => panic!("expected RecordingStopped, got {:?}", other),
    }
}

#[tokio::test]
async fn test_capture_ignored_while_recording() {
    let storage = Arc::new(TestStorage::new("rec-no-stills"));
    let controller = controller_with(storage);
    let mut events = controller.subscribe();

    controller.open(None).await.unwrap();
    controller.start_recording();
    wait_for(&mut events, |e| matches!(e, CameraEvent::RecordingStarted)).await;

    controller.capture();
    controller.stop_recording();

    // The stop outcome arrives without any still capture event in between
    loop {
        match wait_for(&mut events, |_| true).await {
            CameraEvent::RecordingStopped { .. } => break,
            CameraEvent::CaptureSucceeded(_) | CameraEvent::CaptureFailed(_) => {
                panic!("capture must be ignored while recording")
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_close_while_recording_finalizes_file() {
    let storage = Arc::new(TestStorage::new("rec-close"));
    let controller = controller_with(storage);
    let mut events = controller.subscribe();

    controller.open(None).await.unwrap();
    controller.start_recording();
    wait_for(&mut events, |e| matches!(e, CameraEvent::RecordingStarted)).await;

    controller.close().await;

    let event = wait_for(&mut events, |e| {
        matches!(e, CameraEvent::RecordingStopped { .. })
    })
    .await;
    match event {
        CameraEvent::RecordingStopped { path, reason } => {
            assert_eq!(reason, StopReason::Requested);
            assert!(path.exists());
        }
        other => panic!("expected RecordingStopped, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stop_without_recording_is_silent() {
    let storage = Arc::new(TestStorage::new("rec-stop-noop"));
    let controller = controller_with(storage);
    let mut events = controller.subscribe();

    controller.open(None).await.unwrap();
    controller.stop_recording();

    // Nothing should be emitted for the no-op stop
    let outcome = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            if let Ok(event) = events.recv().await {
                if matches!(event, CameraEvent::RecordingStopped { .. }) {
                    return;
                }
            }
        }
    })
    .await;
    assert!(outcome.is_err(), "no-op stop must not emit RecordingStopped");
}

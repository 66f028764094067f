// SPDX-License-Identifier: GPL-3.0-only

//! Capture request ordering against a call-logging device
//!
//! The simulated platform converges autofocus on its own, so it cannot
//! tell whether the controller skipped the focus-lock phase or ran it
//! redundantly. These tests use a platform that records every session
//! call instead, making the submitted request sequence observable.

mod support;

use shutter::device::{
    Capabilities, CaptureDevice, DeviceEvent, DeviceEventSender, DeviceId, DevicePlatform,
    DeviceRegistry, DeviceSession, ExposureState, FocusState, FrameMetadata, LensFacing,
    OutputSize, SessionOutputs, StillImage,
};
use shutter::errors::CaptureResult;
use shutter::request::{BakedRequest, RequestKind};
use shutter::session::SessionController;
use shutter::settings::MemorySettingsStore;
use shutter::CameraEvent;
use std::path::Path;
use std::sync::{Arc, Mutex};
use support::{test_config, wait_for, TestStorage};

type CallLog = Arc<Mutex<Vec<String>>>;

struct LoggingPlatform {
    caps: Capabilities,
    log: CallLog,
}

impl LoggingPlatform {
    fn new(continuous_autofocus: bool) -> Self {
        Self {
            caps: Capabilities {
                flash_supported: false,
                continuous_autofocus,
                lens_facing: LensFacing::Back,
                sensor_orientation: 90,
                still_sizes: vec![OutputSize::new(1920, 1080)],
                preview_sizes: vec![OutputSize::new(1280, 720)],
            },
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl DevicePlatform for LoggingPlatform {
    fn list_devices(&self) -> Vec<DeviceId> {
        vec![DeviceId::new("cam0")]
    }

    fn capabilities(&self, id: &DeviceId) -> Option<Capabilities> {
        (id == &DeviceId::new("cam0")).then(|| self.caps.clone())
    }

    fn open(&self, _id: &DeviceId, events: DeviceEventSender) {
        let log = Arc::clone(&self.log);
        tokio::spawn(async move {
            let device = LoggingDevice {
                id: DeviceId::new("cam0"),
                log,
                events: events.clone(),
            };
            let _ = events.send(DeviceEvent::Opened(Box::new(device)));
        });
    }
}

struct LoggingDevice {
    id: DeviceId,
    log: CallLog,
    events: DeviceEventSender,
}

impl CaptureDevice for LoggingDevice {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn create_session(&mut self, _outputs: SessionOutputs) -> CaptureResult<Box<dyn DeviceSession>> {
        Ok(Box::new(LoggingSession {
            log: Arc::clone(&self.log),
            events: self.events.clone(),
        }))
    }

    fn close(&mut self) {}
}

struct LoggingSession {
    log: CallLog,
    events: DeviceEventSender,
}

impl DeviceSession for LoggingSession {
    fn set_repeating(&mut self, _request: &BakedRequest) -> CaptureResult<()> {
        self.log.lock().unwrap().push("set_repeating".into());
        Ok(())
    }

    fn stop_repeating(&mut self) -> CaptureResult<()> {
        self.log.lock().unwrap().push("stop_repeating".into());
        Ok(())
    }

    fn abort_captures(&mut self) -> CaptureResult<()> {
        self.log.lock().unwrap().push("abort_captures".into());
        Ok(())
    }

    fn submit(&mut self, request: &BakedRequest) -> CaptureResult<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("submit:{:?}", request.kind));
        match request.kind {
            // A trigger resolves on a later frame; answer with a settled one
            RequestKind::Trigger => {
                let _ = self.events.send(DeviceEvent::Frame(FrameMetadata::new(
                    Some(FocusState::FocusedLocked),
                    Some(ExposureState::Converged),
                )));
            }
            RequestKind::Still => {
                let _ = self
                    .events
                    .send(DeviceEvent::StillCaptured(StillImage::new(
                        vec![0xFFu8, 0xD8, 0xFF, 0xD9],
                        None,
                    )));
            }
            _ => {}
        }
        Ok(())
    }

    fn start_recording(&mut self, _path: &Path) -> CaptureResult<()> {
        Ok(())
    }

    fn stop_recording(&mut self) -> CaptureResult<()> {
        Ok(())
    }
}

fn controller_with(platform: LoggingPlatform, storage: Arc<TestStorage>) -> SessionController {
    let registry = Arc::new(DeviceRegistry::new(Arc::new(platform)));
    SessionController::with_config(
        registry,
        storage,
        Arc::new(MemorySettingsStore::new()),
        test_config(),
    )
}

async fn capture_and_collect(platform: LoggingPlatform, tag: &str) -> Vec<String> {
    let log = Arc::clone(&platform.log);
    let storage = Arc::new(TestStorage::new(tag));
    let controller = controller_with(platform, storage);
    let mut events = controller.subscribe();

    controller.open(None).await.unwrap();
    controller.capture();

    let event = wait_for(&mut events, |e| {
        matches!(
            e,
            CameraEvent::CaptureSucceeded(_) | CameraEvent::CaptureFailed(_)
        )
    })
    .await;
    assert!(
        matches!(event, CameraEvent::CaptureSucceeded(_)),
        "expected CaptureSucceeded, got {:?}",
        event
    );

    let calls = log.lock().unwrap();
    calls.clone()
}

#[tokio::test]
async fn test_fixed_focus_capture_submits_no_trigger_before_still() {
    let calls = capture_and_collect(LoggingPlatform::new(false), "order-fixed").await;

    let still = calls
        .iter()
        .position(|c| c == "submit:Still")
        .expect("still request was never submitted");
    assert!(
        calls[..still].iter().all(|c| c != "submit:Trigger"),
        "fixed-focus capture must go straight to the still, got {:?}",
        calls
    );
}

#[tokio::test]
async fn test_continuous_af_capture_locks_focus_before_still() {
    let calls = capture_and_collect(LoggingPlatform::new(true), "order-caf").await;

    let trigger = calls
        .iter()
        .position(|c| c == "submit:Trigger")
        .expect("focus lock trigger was never submitted");
    let still = calls
        .iter()
        .position(|c| c == "submit:Still")
        .expect("still request was never submitted");
    assert!(
        trigger < still,
        "focus lock must precede the still, got {:?}",
        calls
    );
}

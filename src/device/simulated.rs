// SPDX-License-Identifier: GPL-3.0-only

//! Simulated capture device platform
//!
//! A software device that stands in for real hardware in the CLI and in
//! tests: it ticks out frame metadata at a fixed interval, converges
//! focus/exposure in response to triggers, completes one-shot stills from
//! a finite buffer pool and finalizes recording files on stop. Specs are
//! scriptable (open delay, open failure, metadata omission, forced
//! disconnect) so failure paths can be exercised deterministically.

use super::types::*;
use super::{
    CaptureDevice, DeviceEvent, DeviceEventSender, DevicePlatform, DeviceSession, SessionOutputs,
};
use crate::constants::{SIM_FRAME_INTERVAL, STILL_IMAGE_POOL_SIZE};
use crate::errors::{CaptureError, CaptureResult, Operation};
use crate::request::{AfTrigger, BakedRequest, PrecaptureTrigger, RequestKind};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Description of one simulated device
#[derive(Debug, Clone)]
pub struct SimulatedDeviceSpec {
    pub id: DeviceId,
    pub capabilities: Capabilities,
    /// Device populates the focus metadata field
    pub report_focus: bool,
    /// Device populates the exposure metadata field
    pub report_exposure: bool,
    /// Delay before the open outcome is reported
    pub open_delay: Duration,
    /// Force opening to fail with this error
    pub open_failure: Option<CaptureError>,
    /// Emit a disconnect after this many frames
    pub disconnect_after_frames: Option<u32>,
}

impl SimulatedDeviceSpec {
    /// A typical back camera: flash, continuous AF, large sensor.
    pub fn back(id: impl Into<String>) -> Self {
        Self {
            id: DeviceId::new(id),
            capabilities: Capabilities {
                flash_supported: true,
                continuous_autofocus: true,
                lens_facing: LensFacing::Back,
                sensor_orientation: 90,
                still_sizes: vec![
                    OutputSize::new(4032, 3024),
                    OutputSize::new(1920, 1080),
                    OutputSize::new(1280, 720),
                ],
                preview_sizes: vec![OutputSize::new(1920, 1080), OutputSize::new(1280, 720)],
            },
            report_focus: true,
            report_exposure: true,
            open_delay: Duration::ZERO,
            open_failure: None,
            disconnect_after_frames: None,
        }
    }

    /// A typical front camera: no flash, fixed focus, smaller sensor.
    pub fn front(id: impl Into<String>) -> Self {
        Self {
            id: DeviceId::new(id),
            capabilities: Capabilities {
                flash_supported: false,
                continuous_autofocus: false,
                lens_facing: LensFacing::Front,
                sensor_orientation: 270,
                still_sizes: vec![OutputSize::new(2560, 1920), OutputSize::new(1280, 720)],
                preview_sizes: vec![OutputSize::new(1280, 720)],
            },
            report_focus: true,
            report_exposure: true,
            open_delay: Duration::ZERO,
            open_failure: None,
            disconnect_after_frames: None,
        }
    }

    /// Device that never populates focus or exposure metadata.
    pub fn without_metadata(mut self) -> Self {
        self.report_focus = false;
        self.report_exposure = false;
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn with_open_failure(mut self, error: CaptureError) -> Self {
        self.open_failure = Some(error);
        self
    }

    pub fn with_disconnect_after_frames(mut self, frames: u32) -> Self {
        self.disconnect_after_frames = Some(frames);
        self
    }
}

/// Simulated device platform
pub struct SimulatedPlatform {
    devices: Vec<SimulatedDeviceSpec>,
}

impl SimulatedPlatform {
    pub fn new(devices: Vec<SimulatedDeviceSpec>) -> Self {
        Self { devices }
    }

    /// The usual phone pair: back camera `cam0`, front camera `cam1`.
    pub fn default_pair() -> Self {
        Self::new(vec![
            SimulatedDeviceSpec::back("cam0"),
            SimulatedDeviceSpec::front("cam1"),
        ])
    }
}

impl DevicePlatform for SimulatedPlatform {
    fn list_devices(&self) -> Vec<DeviceId> {
        self.devices.iter().map(|d| d.id.clone()).collect()
    }

    fn capabilities(&self, id: &DeviceId) -> Option<Capabilities> {
        self.devices
            .iter()
            .find(|d| &d.id == id)
            .map(|d| d.capabilities.clone())
    }

    fn open(&self, id: &DeviceId, events: DeviceEventSender) {
        let Some(spec) = self.devices.iter().find(|d| &d.id == id).cloned() else {
            let id = id.clone();
            tokio::spawn(async move {
                let _ = events.send(DeviceEvent::OpenFailed(CaptureError::DeviceAccessDenied(
                    format!("unknown device {}", id),
                )));
            });
            return;
        };

        tokio::spawn(async move {
            if !spec.open_delay.is_zero() {
                tokio::time::sleep(spec.open_delay).await;
            }
            let event = match spec.open_failure.clone() {
                Some(err) => DeviceEvent::OpenFailed(err),
                None => {
                    debug!(device = %spec.id, "Simulated device opened");
                    DeviceEvent::Opened(Box::new(SimulatedDevice::new(spec, events.clone())))
                }
            };
            let _ = events.send(event);
        });
    }
}

/// Shared state between device handle, session handles and the frame ticker
struct SimShared {
    repeating: Option<BakedRequest>,
    focus: Option<FocusState>,
    exposure: Option<ExposureState>,
    focus_script: VecDeque<FocusState>,
    exposure_script: VecDeque<ExposureState>,
    /// Frames until the pending one-shot still completes
    pending_still_in: Option<u8>,
    recording_path: Option<PathBuf>,
    frames_emitted: u32,
    session_generation: u64,
    closed: bool,
}

impl SimShared {
    fn new() -> Self {
        Self {
            repeating: None,
            focus: None,
            exposure: None,
            focus_script: VecDeque::new(),
            exposure_script: VecDeque::new(),
            pending_still_in: None,
            recording_path: None,
            frames_emitted: 0,
            session_generation: 0,
            closed: false,
        }
    }
}

/// An open simulated device
pub struct SimulatedDevice {
    spec: SimulatedDeviceSpec,
    events: DeviceEventSender,
    shared: Arc<Mutex<SimShared>>,
    pool: Arc<Semaphore>,
}

impl SimulatedDevice {
    fn new(spec: SimulatedDeviceSpec, events: DeviceEventSender) -> Self {
        Self {
            spec,
            events,
            shared: Arc::new(Mutex::new(SimShared::new())),
            pool: Arc::new(Semaphore::new(STILL_IMAGE_POOL_SIZE)),
        }
    }
}

impl CaptureDevice for SimulatedDevice {
    fn id(&self) -> &DeviceId {
        &self.spec.id
    }

    fn create_session(&mut self, outputs: SessionOutputs) -> CaptureResult<Box<dyn DeviceSession>> {
        let generation = {
            let mut shared = self.shared.lock().unwrap();
            if shared.closed {
                return Err(CaptureError::communication(
                    Operation::ConfigureSession,
                    "device is closed",
                ));
            }
            // Invalidate any previous session and reset the frame pipeline
            shared.session_generation += 1;
            shared.repeating = None;
            shared.focus = None;
            shared.exposure = None;
            shared.focus_script.clear();
            shared.exposure_script.clear();
            shared.pending_still_in = None;
            shared.session_generation
        };

        debug!(device = %self.spec.id, ?outputs, "Simulated session configured");

        spawn_frame_ticker(
            self.spec.clone(),
            Arc::clone(&self.shared),
            Arc::clone(&self.pool),
            self.events.clone(),
            generation,
        );

        Ok(Box::new(SimulatedSession {
            shared: Arc::clone(&self.shared),
            generation,
        }))
    }

    fn close(&mut self) {
        let mut shared = self.shared.lock().unwrap();
        if !shared.closed {
            debug!(device = %self.spec.id, "Simulated device closed");
            shared.closed = true;
        }
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// A configured session on a simulated device
struct SimulatedSession {
    shared: Arc<Mutex<SimShared>>,
    generation: u64,
}

impl SimulatedSession {
    /// Run `f` against the shared state unless this handle is stale
    /// (device closed or session replaced); stale handles are no-ops.
    fn with_live<R>(&self, f: impl FnOnce(&mut SimShared) -> R) -> Option<R> {
        let mut shared = self.shared.lock().unwrap();
        if shared.closed || shared.session_generation != self.generation {
            return None;
        }
        Some(f(&mut shared))
    }
}

impl DeviceSession for SimulatedSession {
    fn set_repeating(&mut self, request: &BakedRequest) -> CaptureResult<()> {
        self.with_live(|shared| {
            shared.repeating = Some(request.clone());
            // Steady-state convergence after (re)starting the stream
            if shared.focus_script.is_empty() {
                shared
                    .focus_script
                    .extend([FocusState::PassiveScan, FocusState::PassiveFocused]);
            }
            if shared.exposure_script.is_empty() {
                shared
                    .exposure_script
                    .extend([ExposureState::Searching, ExposureState::Converged]);
            }
        });
        Ok(())
    }

    fn stop_repeating(&mut self) -> CaptureResult<()> {
        self.with_live(|shared| shared.repeating = None);
        Ok(())
    }

    fn abort_captures(&mut self) -> CaptureResult<()> {
        self.with_live(|shared| shared.pending_still_in = None);
        Ok(())
    }

    fn submit(&mut self, request: &BakedRequest) -> CaptureResult<()> {
        self.with_live(|shared| match request.kind {
            RequestKind::Trigger => {
                match request.af_trigger {
                    Some(AfTrigger::Start) => {
                        shared.focus = Some(FocusState::ActiveScan);
                        shared.focus_script.clear();
                        shared
                            .focus_script
                            .extend([FocusState::ActiveScan, FocusState::FocusedLocked]);
                    }
                    Some(AfTrigger::Cancel) => {
                        shared.focus = Some(FocusState::Inactive);
                        shared.focus_script.clear();
                    }
                    None => {}
                }
                match request.precapture_trigger {
                    Some(PrecaptureTrigger::Start) => {
                        shared.exposure = Some(ExposureState::Precapture);
                        shared.exposure_script.clear();
                        shared
                            .exposure_script
                            .extend([ExposureState::Precapture, ExposureState::Converged]);
                    }
                    Some(PrecaptureTrigger::Cancel) => {
                        shared.exposure = Some(ExposureState::Inactive);
                        shared.exposure_script.clear();
                    }
                    None => {}
                }
            }
            RequestKind::Still => {
                shared.pending_still_in = Some(2);
            }
            RequestKind::Preview | RequestKind::Record => {}
        });
        Ok(())
    }

    fn start_recording(&mut self, path: &Path) -> CaptureResult<()> {
        let started = self.with_live(|shared| {
            if shared.recording_path.is_some() {
                return Err(CaptureError::communication(
                    Operation::CaptureVideo,
                    "recorder already running",
                ));
            }
            shared.recording_path = Some(path.to_path_buf());
            Ok(())
        });
        started.unwrap_or(Ok(()))
    }

    fn stop_recording(&mut self) -> CaptureResult<()> {
        let finalized = self.with_live(|shared| shared.recording_path.take());
        if let Some(Some(path)) = finalized {
            // Finalize: the simulated encoder just writes a stub container
            std::fs::write(&path, b"shutter simulated video container\n")?;
            debug!(path = %path.display(), "Simulated recording finalized");
        }
        Ok(())
    }
}

/// Drive the per-session frame callbacks until the session is replaced or
/// the device closes.
fn spawn_frame_ticker(
    spec: SimulatedDeviceSpec,
    shared: Arc<Mutex<SimShared>>,
    pool: Arc<Semaphore>,
    events: DeviceEventSender,
    generation: u64,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SIM_FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let outcome = {
                let mut state = shared.lock().unwrap();
                if state.closed || state.session_generation != generation {
                    break;
                }

                state.frames_emitted += 1;
                if let Some(limit) = spec.disconnect_after_frames {
                    if state.frames_emitted > limit {
                        state.closed = true;
                        TickOutcome::Disconnect
                    } else {
                        advance_frame(&spec, &mut state, &pool)
                    }
                } else {
                    advance_frame(&spec, &mut state, &pool)
                }
            };

            match outcome {
                TickOutcome::Idle => {}
                TickOutcome::Frame(meta) => {
                    if events.send(DeviceEvent::Frame(meta)).is_err() {
                        break;
                    }
                }
                TickOutcome::Still(image) => {
                    if events.send(DeviceEvent::StillCaptured(image)).is_err() {
                        break;
                    }
                }
                TickOutcome::Disconnect => {
                    warn!(device = %spec.id, "Simulated device disconnecting");
                    let _ = events.send(DeviceEvent::Disconnected);
                    break;
                }
            }
        }
    });
}

enum TickOutcome {
    Idle,
    Frame(FrameMetadata),
    Still(StillImage),
    Disconnect,
}

fn advance_frame(
    spec: &SimulatedDeviceSpec,
    state: &mut SimShared,
    pool: &Arc<Semaphore>,
) -> TickOutcome {
    // A pending one-shot still completes ahead of further preview frames
    if let Some(remaining) = state.pending_still_in {
        if remaining == 0 {
            // The pool bounds in-flight buffers; retry next tick when full
            match Arc::clone(pool).try_acquire_owned() {
                Ok(permit) => {
                    state.pending_still_in = None;
                    return TickOutcome::Still(StillImage::new(fake_jpeg(), Some(permit)));
                }
                Err(_) => return TickOutcome::Idle,
            }
        }
        state.pending_still_in = Some(remaining - 1);
    }

    if state.repeating.is_none() {
        return TickOutcome::Idle;
    }

    if let Some(next) = state.focus_script.pop_front() {
        state.focus = Some(next);
    }
    if let Some(next) = state.exposure_script.pop_front() {
        state.exposure = Some(next);
    }

    TickOutcome::Frame(FrameMetadata::new(
        spec.report_focus.then_some(state.focus).flatten(),
        spec.report_exposure.then_some(state.exposure).flatten(),
    ))
}

/// A recognizable JPEG-shaped stub buffer.
fn fake_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(data.len() + 1024, 0);
    data.extend([0xFF, 0xD9]);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_open_unknown_device_fails() {
        let platform = SimulatedPlatform::default_pair();
        let (tx, mut rx) = mpsc::unbounded_channel();
        platform.open(&DeviceId::new("ghost"), tx);

        match rx.recv().await {
            Some(DeviceEvent::OpenFailed(CaptureError::DeviceAccessDenied(_))) => {}
            other => panic!("expected OpenFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_and_frames_flow() {
        let platform = SimulatedPlatform::default_pair();
        let (tx, mut rx) = mpsc::unbounded_channel();
        platform.open(&DeviceId::new("cam0"), tx);

        let mut device = match rx.recv().await {
            Some(DeviceEvent::Opened(device)) => device,
            other => panic!("expected Opened, got {:?}", other),
        };

        let outputs = SessionOutputs::for_still(OutputSize::new(1280, 720), OutputSize::new(4032, 3024));
        let mut session = device.create_session(outputs).unwrap();

        let caps = platform.capabilities(&DeviceId::new("cam0")).unwrap();
        let template = crate::request::RequestTemplate::new(&caps, crate::request::CaptureIntent::Still);
        session.set_repeating(&template.bake_repeating()).unwrap();

        match rx.recv().await {
            Some(DeviceEvent::Frame(_)) => {}
            other => panic!("expected Frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stale_session_ops_are_noops() {
        let platform = SimulatedPlatform::default_pair();
        let (tx, mut rx) = mpsc::unbounded_channel();
        platform.open(&DeviceId::new("cam0"), tx);

        let mut device = match rx.recv().await {
            Some(DeviceEvent::Opened(device)) => device,
            other => panic!("expected Opened, got {:?}", other),
        };

        let outputs = SessionOutputs::for_still(OutputSize::new(1280, 720), OutputSize::new(4032, 3024));
        let mut session = device.create_session(outputs).unwrap();
        device.close();

        let caps = platform.capabilities(&DeviceId::new("cam0")).unwrap();
        let template = crate::request::RequestTemplate::new(&caps, crate::request::CaptureIntent::Still);

        // None of these may fail or panic on a stale handle
        session.set_repeating(&template.bake_repeating()).unwrap();
        session.stop_repeating().unwrap();
        session.abort_captures().unwrap();
        session.submit(&template.bake_one_shot(90)).unwrap();
        session.stop_recording().unwrap();
    }
}

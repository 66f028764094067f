// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! [`SessionController`] is the single owner of the device lifecycle: a
//! dedicated task holds the open device, its configured session and the
//! capture state machine, and processes commands and device callbacks one
//! at a time. Opening and closing are serialized through a one-permit
//! device lock with a bounded wait, so a wedged open can never deadlock
//! the controller; an open attempt that cannot get the lock in time is
//! reported as busy.
//!
//! Commands are fire-and-forget where the outcome is an event (capture,
//! recording, settings) and request/reply where the caller needs the
//! result inline (open, close, device switch).

pub mod dispatcher;
pub mod recording;
pub mod saver;
pub mod state;

use crate::constants::{DEVICE_LOCK_TIMEOUT, STORAGE_POLL_INTERVAL};
use crate::device::{
    Capabilities, CaptureDevice, DeviceEvent, DeviceEventReceiver, DeviceId, DeviceRegistry,
    DeviceSession, SessionOutputs,
};
use crate::errors::{CaptureError, CaptureResult, Operation};
use crate::events::{self, CameraEvent, StopReason};
use crate::request::{
    CaptureIntent, DisplayRotation, FocusMode, RequestTemplate, output_rotation,
};
use crate::settings::{SettingUpdate, SettingsStore, SizeMode};
use crate::storage::{MediaKind, StorageProvider};
use recording::RecordingController;
use state::CaptureState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, broadcast, mpsc, oneshot};
use tracing::{debug, info, trace, warn};

/// Tunables of the controller; defaults match production behavior, tests
/// shorten the waits.
#[derive(Debug, Clone, Copy)]
pub struct SessionControllerConfig {
    /// Bounded wait for the device lock on open
    pub lock_timeout: Duration,
    /// Free-space check interval while recording
    pub storage_poll_interval: Duration,
    /// Host display rotation, folded into still output rotation
    pub display_rotation: DisplayRotation,
}

impl Default for SessionControllerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEVICE_LOCK_TIMEOUT,
            storage_poll_interval: STORAGE_POLL_INTERVAL,
            display_rotation: DisplayRotation::default(),
        }
    }
}

enum Command {
    Open {
        device: Option<DeviceId>,
        reply: oneshot::Sender<CaptureResult<DeviceId>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
    SwitchDevice {
        reply: oneshot::Sender<CaptureResult<DeviceId>>,
    },
    Capture,
    StartRecording,
    StopRecording,
    UpdateSetting(SettingUpdate),
    Shutdown,
}

/// What a queued lock acquisition was for
enum LockIntent {
    Open {
        device: DeviceId,
        reply: Option<oneshot::Sender<CaptureResult<DeviceId>>>,
    },
    Close {
        reply: Option<oneshot::Sender<()>>,
    },
}

enum Msg {
    Cmd(Command),
    /// Device callback, tagged with the open generation it belongs to
    Dev { generation: u64, event: DeviceEvent },
    LockAcquired {
        intent: LockIntent,
        permit: tokio::sync::OwnedSemaphorePermit,
    },
}

/// Handle to the controller task
///
/// Must be constructed inside a tokio runtime. Dropping the handle shuts
/// the controller down and closes any open device.
pub struct SessionController {
    msgs: mpsc::UnboundedSender<Msg>,
    events: broadcast::Sender<CameraEvent>,
}

impl SessionController {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        storage: Arc<dyn StorageProvider>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self::with_config(registry, storage, settings, SessionControllerConfig::default())
    }

    pub fn with_config(
        registry: Arc<DeviceRegistry>,
        storage: Arc<dyn StorageProvider>,
        settings: Arc<dyn SettingsStore>,
        config: SessionControllerConfig,
    ) -> Self {
        let (msgs_tx, msgs_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = events::event_channel();

        let actor = Actor {
            registry,
            storage,
            settings,
            config,
            events: events_tx.clone(),
            msgs_tx: msgs_tx.clone(),
            device_lock: Arc::new(Semaphore::new(1)),
            generation: 0,
            active: None,
            pending_open: None,
            last_device: None,
            poll_reset_needed: false,
        };
        tokio::spawn(actor.run(msgs_rx));

        Self {
            msgs: msgs_tx,
            events: events_tx,
        }
    }

    /// Subscribe to controller outcome events.
    pub fn subscribe(&self) -> broadcast::Receiver<CameraEvent> {
        self.events.subscribe()
    }

    /// Open a device (or the last/first device when `None`) and start the
    /// preview stream. Resolves once the device reports the open outcome.
    pub async fn open(&self, device: Option<DeviceId>) -> CaptureResult<DeviceId> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Open { device, reply: tx });
        rx.await.unwrap_or(Err(CaptureError::DeviceDisconnected))
    }

    /// Close the active device. Idempotent; resolves once the hardware is
    /// released.
    pub async fn close(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close { reply: tx });
        let _ = rx.await;
    }

    /// Switch to the next enumerated device, wrapping at the end. With a
    /// single device this reopens it.
    pub async fn switch_device(&self) -> CaptureResult<DeviceId> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SwitchDevice { reply: tx });
        rx.await.unwrap_or(Err(CaptureError::DeviceDisconnected))
    }

    /// Request a still capture; the outcome arrives as a
    /// [`CameraEvent::CaptureSucceeded`] or [`CameraEvent::CaptureFailed`].
    pub fn capture(&self) {
        self.send(Command::Capture);
    }

    pub fn start_recording(&self) {
        self.send(Command::StartRecording);
    }

    pub fn stop_recording(&self) {
        self.send(Command::StopRecording);
    }

    /// Persist a setting change and apply it to the live session.
    pub fn update_setting(&self, update: SettingUpdate) {
        self.send(Command::UpdateSetting(update));
    }

    fn send(&self, cmd: Command) {
        let _ = self.msgs.send(Msg::Cmd(cmd));
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let _ = self.msgs.send(Msg::Cmd(Command::Shutdown));
    }
}

/// Open attempt in flight; holds the device lock permit until the device
/// reports an outcome, so concurrent opens stay queued behind it.
struct PendingOpen {
    device: DeviceId,
    _permit: tokio::sync::OwnedSemaphorePermit,
    reply: Option<oneshot::Sender<CaptureResult<DeviceId>>>,
}

/// Everything belonging to the currently open device
struct ActiveSession {
    device: Box<dyn CaptureDevice>,
    session: Box<dyn DeviceSession>,
    caps: Capabilities,
    template: RequestTemplate,
    rotation: u32,
    capture_state: CaptureState,
    /// Cleared while a still capture is in flight to debounce requests
    capture_enabled: bool,
    recording: RecordingController,
}

struct Actor {
    registry: Arc<DeviceRegistry>,
    storage: Arc<dyn StorageProvider>,
    settings: Arc<dyn SettingsStore>,
    config: SessionControllerConfig,
    events: broadcast::Sender<CameraEvent>,
    msgs_tx: mpsc::UnboundedSender<Msg>,
    device_lock: Arc<Semaphore>,
    /// Bumped on every open/teardown; device events from older generations
    /// are dropped.
    generation: u64,
    active: Option<ActiveSession>,
    pending_open: Option<PendingOpen>,
    last_device: Option<DeviceId>,
    poll_reset_needed: bool,
}

impl Actor {
    async fn run(mut self, mut msgs: mpsc::UnboundedReceiver<Msg>) {
        let mut poll = tokio::time::interval(self.config.storage_poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                msg = msgs.recv() => {
                    let Some(msg) = msg else { break };
                    if self.handle_msg(msg) {
                        break;
                    }
                    if self.poll_reset_needed {
                        self.poll_reset_needed = false;
                        poll.reset();
                    }
                }
                _ = poll.tick() => self.poll_storage(),
            }
        }

        self.teardown();
    }

    /// Returns true when the controller should stop.
    fn handle_msg(&mut self, msg: Msg) -> bool {
        match msg {
            Msg::Cmd(cmd) => return self.handle_command(cmd),
            Msg::LockAcquired { intent, permit } => self.handle_lock_acquired(intent, permit),
            Msg::Dev { generation, event } => {
                if generation != self.generation {
                    trace!(generation, current = self.generation, "Dropping stale device event");
                    if let DeviceEvent::Opened(mut device) = event {
                        device.close();
                    }
                    return false;
                }
                self.handle_device_event(event);
            }
        }
        false
    }

    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Open { device, reply } => {
                let resolved = device
                    .or_else(|| self.last_device.clone())
                    .or_else(|| self.registry.initial_device());
                match resolved {
                    Some(id) => self.begin_open(id, Some(reply)),
                    None => {
                        let _ = reply.send(Err(CaptureError::DeviceAccessDenied(
                            "no capture devices available".into(),
                        )));
                    }
                }
            }
            Command::Close { reply } => self.begin_close(Some(reply)),
            Command::SwitchDevice { reply } => {
                let current = self
                    .active
                    .as_ref()
                    .map(|a| a.device.id().clone())
                    .or_else(|| self.last_device.clone());
                let target = match current {
                    Some(cur) => self.registry.next_device(&cur),
                    None => match self.registry.initial_device() {
                        Some(id) => id,
                        None => {
                            let _ = reply.send(Err(CaptureError::DeviceAccessDenied(
                                "no capture devices available".into(),
                            )));
                            return false;
                        }
                    },
                };
                self.begin_open(target, Some(reply));
            }
            Command::Capture => self.handle_capture(),
            Command::StartRecording => self.handle_start_recording(),
            Command::StopRecording => self.finish_recording(StopReason::Requested),
            Command::UpdateSetting(update) => self.handle_setting(update),
            Command::Shutdown => return true,
        }
        false
    }

    /// Queue a lock acquisition for an open. The waiter gives up after the
    /// configured timeout and reports the device as busy.
    fn begin_open(&self, device: DeviceId, reply: Option<oneshot::Sender<CaptureResult<DeviceId>>>) {
        let lock = Arc::clone(&self.device_lock);
        let tx = self.msgs_tx.clone();
        let wait = self.config.lock_timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(wait, lock.acquire_owned()).await {
                Ok(Ok(permit)) => {
                    let _ = tx.send(Msg::LockAcquired {
                        intent: LockIntent::Open { device, reply },
                        permit,
                    });
                }
                Ok(Err(_)) | Err(_) => {
                    warn!(device = %device, "Timed out waiting for the device lock");
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(CaptureError::DeviceBusy));
                    }
                }
            }
        });
    }

    /// Queue a lock acquisition for a close. Closing waits as long as it
    /// takes; it must not be abandoned with the hardware still held.
    fn begin_close(&self, reply: Option<oneshot::Sender<()>>) {
        let lock = Arc::clone(&self.device_lock);
        let tx = self.msgs_tx.clone();

        tokio::spawn(async move {
            if let Ok(permit) = lock.acquire_owned().await {
                let _ = tx.send(Msg::LockAcquired {
                    intent: LockIntent::Close { reply },
                    permit,
                });
            }
        });
    }

    fn handle_lock_acquired(
        &mut self,
        intent: LockIntent,
        permit: tokio::sync::OwnedSemaphorePermit,
    ) {
        match intent {
            LockIntent::Open { device, reply } => {
                self.release_active();

                self.generation += 1;
                let (dev_tx, dev_rx) = mpsc::unbounded_channel();
                spawn_event_forwarder(dev_rx, self.msgs_tx.clone(), self.generation);

                info!(device = %device, "Opening capture device");
                self.pending_open = Some(PendingOpen {
                    device: device.clone(),
                    _permit: permit,
                    reply,
                });
                self.registry.platform().open(&device, dev_tx);
            }
            LockIntent::Close { reply } => {
                self.release_active();
                self.generation += 1;
                drop(permit);
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    /// Stop whatever the active device is doing and release the hardware.
    fn release_active(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if active.recording.is_recording() {
            match active.recording.stop(self.storage.as_ref(), active.session.as_mut()) {
                Ok(Some(path)) => {
                    let _ = self.events.send(CameraEvent::RecordingStopped {
                        path,
                        reason: StopReason::Requested,
                    });
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "Failed to finalize recording on close"),
            }
        }
        active.device.close();
    }

    fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Opened(device) => self.handle_opened(device),
            DeviceEvent::OpenFailed(err) => {
                warn!(error = %err, "Device open failed");
                if let Some(pending) = self.pending_open.take() {
                    if let Some(reply) = pending.reply {
                        let _ = reply.send(Err(err));
                    }
                }
            }
            DeviceEvent::Frame(meta) => {
                let result = match self.active.as_mut() {
                    Some(active) => dispatcher::dispatch_frame(
                        &mut active.capture_state,
                        &meta,
                        &active.template,
                        active.session.as_mut(),
                        active.rotation,
                    ),
                    None => Ok(dispatcher::DispatchOutcome::Idle),
                };
                if let Err(err) = result {
                    self.abort_capture_attempt(err);
                }
            }
            DeviceEvent::StillCaptured(image) => {
                let Some(active) = self.active.as_mut() else {
                    return;
                };
                debug!(bytes = image.len(), "Still captured");
                saver::spawn_save(image, Arc::clone(&self.storage), self.events.clone());

                // Unlock focus and resume the preview stream
                active.capture_state = CaptureState::Preview;
                active.capture_enabled = true;
                if let Err(err) =
                    dispatcher::resume_preview(&active.template, active.session.as_mut())
                {
                    warn!(error = %err, "Failed to resume preview after capture");
                }
            }
            DeviceEvent::Disconnected => {
                warn!("Device disconnected");
                self.handle_device_loss();
            }
            DeviceEvent::Error(message) => {
                warn!(message = %message, "Device error");
                self.handle_device_loss();
            }
        }
    }

    fn handle_opened(&mut self, mut device: Box<dyn CaptureDevice>) {
        let Some(pending) = self.pending_open.take() else {
            // No one is waiting for this device (open raced a close)
            device.close();
            return;
        };

        let outcome = self.configure_still_session(device, &pending.device);
        let reply_value = match outcome {
            Ok(()) => {
                self.last_device = Some(pending.device.clone());
                let _ = self.events.send(CameraEvent::PreviewReady);
                info!(device = %pending.device, "Preview running");
                Ok(pending.device)
            }
            Err(err) => {
                warn!(device = %pending.device, error = %err, "Session configuration failed");
                Err(err)
            }
        };
        if let Some(reply) = pending.reply {
            let _ = reply.send(reply_value);
        }
        // PendingOpen (and the lock permit) dropped here
    }

    fn configure_still_session(
        &mut self,
        mut device: Box<dyn CaptureDevice>,
        id: &DeviceId,
    ) -> CaptureResult<()> {
        let caps = self.registry.capabilities_of(id).ok_or_else(|| {
            CaptureError::DeviceAccessDenied(format!("no capabilities for {}", id))
        })?;

        let (session, template) =
            install_still_pipeline(device.as_mut(), &caps, self.settings.as_ref())?;
        let rotation = output_rotation(self.config.display_rotation, caps.sensor_orientation);

        self.active = Some(ActiveSession {
            device,
            session,
            caps,
            template,
            rotation,
            capture_state: CaptureState::Preview,
            capture_enabled: true,
            recording: RecordingController::new(),
        });
        Ok(())
    }

    fn handle_device_loss(&mut self) {
        self.generation += 1;
        if let Some(mut active) = self.active.take() {
            active.device.close();
        }
        if let Some(pending) = self.pending_open.take() {
            if let Some(reply) = pending.reply {
                let _ = reply.send(Err(CaptureError::DeviceDisconnected));
            }
        }
        let _ = self.events.send(CameraEvent::DeviceUnavailable);
    }

    fn handle_capture(&mut self) {
        let Some(active) = self.active.as_mut() else {
            let _ = self.events.send(CameraEvent::CaptureFailed(CaptureError::communication(
                Operation::CaptureStill,
                "no active session",
            )));
            return;
        };
        if !active.capture_enabled || active.recording.is_recording() {
            debug!("Capture request ignored, capture unavailable");
            return;
        }
        if !self.storage.has_free_space(MediaKind::Still) {
            let _ = self
                .events
                .send(CameraEvent::CaptureFailed(CaptureError::StorageExhausted));
            return;
        }

        active.capture_enabled = false;
        let result = if active.template.focus_mode() == FocusMode::ContinuousPicture {
            active.capture_state = CaptureState::LockingFocus;
            dispatcher::request_focus_lock(&active.template, active.session.as_mut())
        } else {
            // No autofocus to settle; capture directly
            active.capture_state = CaptureState::Capturing;
            dispatcher::begin_still_capture(
                &active.template,
                active.session.as_mut(),
                active.rotation,
            )
        };

        if let Err(err) = result {
            self.abort_capture_attempt(err);
        }
    }

    /// A per-operation failure abandons the attempt: reset to preview,
    /// re-enable capture and surface the error. Best effort; the device
    /// may already be gone.
    fn abort_capture_attempt(&mut self, err: CaptureError) {
        warn!(error = %err, "Capture attempt aborted");
        if let Some(active) = self.active.as_mut() {
            active.capture_state = CaptureState::Preview;
            active.capture_enabled = true;
            if let Err(resume_err) =
                dispatcher::resume_preview(&active.template, active.session.as_mut())
            {
                warn!(error = %resume_err, "Failed to resume preview after abort");
            }
        }
        let _ = self.events.send(CameraEvent::CaptureFailed(err));
    }

    fn handle_start_recording(&mut self) {
        match self.begin_recording() {
            Ok(()) => {
                let _ = self.events.send(CameraEvent::RecordingStarted);
                // Restart the poll clock so the first check is a full
                // interval after the recording began
                self.poll_reset_needed = true;
            }
            Err(err) => {
                warn!(error = %err, "Failed to start recording");
                let _ = self.events.send(CameraEvent::CaptureFailed(err));
            }
        }
    }

    fn begin_recording(&mut self) -> CaptureResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Err(CaptureError::communication(
                Operation::CaptureVideo,
                "no active session",
            ));
        };
        if active.recording.is_recording() {
            return Ok(());
        }
        if active.capture_state != CaptureState::Preview {
            return Err(CaptureError::communication(
                Operation::CaptureVideo,
                "still capture in progress",
            ));
        }
        // Gate on storage before touching the session configuration
        if !self.storage.storage_ready() {
            return Err(CaptureError::StorageUnavailable);
        }
        if !self.storage.has_free_space(MediaKind::Video) {
            return Err(CaptureError::StorageExhausted);
        }

        let (session, template) = install_recording_pipeline(
            active.device.as_mut(),
            &active.caps,
            self.settings.as_ref(),
        )?;
        active.session = session;
        active.template = template;
        active
            .recording
            .start(self.storage.as_ref(), active.session.as_mut())
    }

    fn finish_recording(&mut self, reason: StopReason) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if !active.recording.is_recording() {
            return;
        }

        let path = match active.recording.stop(self.storage.as_ref(), active.session.as_mut()) {
            Ok(Some(path)) => path,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "Failed to stop recording");
                let _ = self.events.send(CameraEvent::CaptureFailed(err));
                return;
            }
        };

        // Back to the still configuration
        match install_still_pipeline(active.device.as_mut(), &active.caps, self.settings.as_ref())
        {
            Ok((session, template)) => {
                active.session = session;
                active.template = template;
                active.capture_state = CaptureState::Preview;
                active.capture_enabled = true;
            }
            Err(err) => {
                warn!(error = %err, "Failed to restore preview after recording");
            }
        }

        let _ = self.events.send(CameraEvent::RecordingStopped { path, reason });
    }

    /// Periodic free-space check; only bites while recording.
    fn poll_storage(&mut self) {
        let recording = self
            .active
            .as_ref()
            .map(|a| a.recording.is_recording())
            .unwrap_or(false);
        if !recording {
            return;
        }
        if self.storage.has_free_space(MediaKind::Video) {
            return;
        }
        warn!("Free space exhausted, stopping recording");
        self.finish_recording(StopReason::StorageExhausted);
    }

    fn handle_setting(&mut self, update: SettingUpdate) {
        match update {
            SettingUpdate::Flash(mode) => {
                self.settings.set_flash_mode(mode);
                self.refresh_repeating();
            }
            SettingUpdate::BlackAndWhite(mode) => {
                self.settings.set_black_and_white_mode(mode);
                self.refresh_repeating();
            }
            SettingUpdate::Size(mode) => {
                self.settings.set_size_mode(mode);
                self.apply_size_change(mode);
            }
        }
    }

    /// Flash and black-and-white apply to the live stream by re-baking the
    /// repeating request.
    fn refresh_repeating(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let intent = if active.recording.is_recording() {
            CaptureIntent::Record
        } else {
            CaptureIntent::Still
        };
        let mut template = RequestTemplate::new(&active.caps, intent);
        template
            .apply_flash_mode(self.settings.flash_mode())
            .apply_black_and_white(self.settings.black_and_white_mode());

        if let Err(err) = active
            .session
            .set_repeating(&template.bake_repeating())
            .map_err(|err| err.with_operation(Operation::PreviewUpdate))
        {
            warn!(error = %err, "Failed to apply setting to the live stream");
        }
        active.template = template;
    }

    /// A size change alters the still output target, which requires a
    /// fresh session; reopen the device to rebuild it.
    fn apply_size_change(&mut self, mode: SizeMode) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        if active.recording.is_recording() {
            debug!(mode = ?mode, "Recording active, new size applies to the next session");
            return;
        }
        let device = active.device.id().clone();
        self.begin_open(device, None);
    }

    fn teardown(&mut self) {
        self.release_active();
        self.generation += 1;
        debug!("Session controller stopped");
    }
}

/// Configure the steady-state still pipeline: preview at the largest
/// preview size, stills at the largest sensor size (halved for SMALL),
/// settings applied, repeating request running.
fn install_still_pipeline(
    device: &mut dyn CaptureDevice,
    caps: &Capabilities,
    settings: &dyn SettingsStore,
) -> CaptureResult<(Box<dyn DeviceSession>, RequestTemplate)> {
    let preview = caps.largest_preview_size().ok_or_else(|| {
        CaptureError::communication(Operation::ConfigureSession, "device reports no preview sizes")
    })?;
    let base = caps.largest_still_size().ok_or_else(|| {
        CaptureError::communication(Operation::ConfigureSession, "device reports no still sizes")
    })?;
    let still = match settings.size_mode() {
        SizeMode::Small => base.halved(),
        SizeMode::Large => base,
    };

    let mut session = device.create_session(SessionOutputs::for_still(preview, still))?;
    let mut template = RequestTemplate::new(caps, CaptureIntent::Still);
    template
        .apply_flash_mode(settings.flash_mode())
        .apply_black_and_white(settings.black_and_white_mode());
    session
        .set_repeating(&template.bake_repeating())
        .map_err(|err| err.with_operation(Operation::PreviewUpdate))?;
    Ok((session, template))
}

/// Configure the recording pipeline: preview plus a recorder output capped
/// at 1080p, with the recording flash mapping (torch, never single-fire).
fn install_recording_pipeline(
    device: &mut dyn CaptureDevice,
    caps: &Capabilities,
    settings: &dyn SettingsStore,
) -> CaptureResult<(Box<dyn DeviceSession>, RequestTemplate)> {
    let preview = caps.largest_preview_size().ok_or_else(|| {
        CaptureError::communication(Operation::ConfigureSession, "device reports no preview sizes")
    })?;
    let recorder = caps.recording_size().ok_or_else(|| {
        CaptureError::communication(
            Operation::ConfigureSession,
            "device reports no recording sizes",
        )
    })?;

    let mut session = device.create_session(SessionOutputs::for_recording(preview, recorder))?;
    let mut template = RequestTemplate::new(caps, CaptureIntent::Record);
    template
        .apply_flash_mode(settings.flash_mode())
        .apply_black_and_white(settings.black_and_white_mode());
    session
        .set_repeating(&template.bake_repeating())
        .map_err(|err| err.with_operation(Operation::PreviewUpdate))?;
    Ok((session, template))
}

/// Pipe raw device callbacks into the controller's message queue, tagged
/// with the generation they belong to.
fn spawn_event_forwarder(
    mut rx: DeviceEventReceiver,
    tx: mpsc::UnboundedSender<Msg>,
    generation: u64,
) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if tx.send(Msg::Dev { generation, event }).is_err() {
                break;
            }
        }
    });
}

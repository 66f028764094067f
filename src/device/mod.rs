// SPDX-License-Identifier: GPL-3.0-only

//! Capture device platform abstraction
//!
//! A [`DevicePlatform`] enumerates devices and opens them callback-style:
//! `open` returns immediately and the outcome arrives as a [`DeviceEvent`]
//! on the channel the caller supplied. All further device activity (frame
//! metadata, still completion, disconnects) flows over the same channel,
//! in device-frame order, so the consumer never sees two callbacks
//! concurrently.

pub mod registry;
pub mod simulated;
pub mod types;

pub use registry::DeviceRegistry;
pub use types::*;

use crate::errors::{CaptureError, CaptureResult};
use crate::request::BakedRequest;
use std::fmt;
use std::path::Path;
use tokio::sync::mpsc;

/// Sender half of a session's device event channel
pub type DeviceEventSender = mpsc::UnboundedSender<DeviceEvent>;

/// Receiver half of a session's device event channel
pub type DeviceEventReceiver = mpsc::UnboundedReceiver<DeviceEvent>;

/// Asynchronous device callback payload
pub enum DeviceEvent {
    /// Device finished opening; the handle is now live
    Opened(Box<dyn CaptureDevice>),
    /// Opening failed (access denied, transport error)
    OpenFailed(CaptureError),
    /// Per-frame metadata from the active repeating/one-shot requests
    Frame(FrameMetadata),
    /// A one-shot still request completed with its buffer
    StillCaptured(StillImage),
    /// Device disconnected; fatal to the session
    Disconnected,
    /// Device-level error; fatal to the session
    Error(String),
}

impl fmt::Debug for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceEvent::Opened(_) => write!(f, "Opened"),
            DeviceEvent::OpenFailed(err) => write!(f, "OpenFailed({})", err),
            DeviceEvent::Frame(meta) => write!(f, "Frame({:?})", meta),
            DeviceEvent::StillCaptured(img) => write!(f, "StillCaptured({:?})", img),
            DeviceEvent::Disconnected => write!(f, "Disconnected"),
            DeviceEvent::Error(msg) => write!(f, "Error({})", msg),
        }
    }
}

/// Output targets a capture session is configured with
#[derive(Debug, Clone, Copy)]
pub struct SessionOutputs {
    /// Preview output size (always present)
    pub preview: OutputSize,
    /// Still output size, absent for record-only sessions
    pub still: Option<OutputSize>,
    /// Recorder output size, present only while configuring for recording
    pub recorder: Option<OutputSize>,
}

impl SessionOutputs {
    /// Preview + still outputs (the steady-state still configuration).
    pub fn for_still(preview: OutputSize, still: OutputSize) -> Self {
        Self {
            preview,
            still: Some(still),
            recorder: None,
        }
    }

    /// Preview + recorder outputs.
    pub fn for_recording(preview: OutputSize, recorder: OutputSize) -> Self {
        Self {
            preview,
            still: None,
            recorder: Some(recorder),
        }
    }
}

/// Capture device platform (hardware stack or simulated)
pub trait DevicePlatform: Send + Sync {
    /// Ordered list of device identifiers; empty on enumeration failure.
    fn list_devices(&self) -> Vec<DeviceId>;

    /// Capability snapshot of a device, `None` if unknown.
    fn capabilities(&self, id: &DeviceId) -> Option<Capabilities>;

    /// Begin opening a device. Returns immediately; the outcome and all
    /// subsequent device activity arrive as [`DeviceEvent`]s on `events`.
    fn open(&self, id: &DeviceId, events: DeviceEventSender);
}

/// An open capture device
pub trait CaptureDevice: Send {
    fn id(&self) -> &DeviceId;

    /// Configure a capture session bound to the given output targets.
    /// Replaces any previously configured session on this device.
    fn create_session(&mut self, outputs: SessionOutputs) -> CaptureResult<Box<dyn DeviceSession>>;

    /// Close the device. Idempotent; pending session handles become stale
    /// no-ops.
    fn close(&mut self);
}

/// A configured capture session on an open device
///
/// Every method on a stale handle (device closed underneath it) is a
/// silent no-op, never an error or a panic.
pub trait DeviceSession: Send {
    /// Install/replace the continuously reapplied request.
    fn set_repeating(&mut self, request: &BakedRequest) -> CaptureResult<()>;

    /// Stop the repeating request.
    fn stop_repeating(&mut self) -> CaptureResult<()>;

    /// Abort in-flight captures.
    fn abort_captures(&mut self) -> CaptureResult<()>;

    /// Submit a one-shot request (trigger or still).
    fn submit(&mut self, request: &BakedRequest) -> CaptureResult<()>;

    /// Begin continuous encoding to `path`.
    fn start_recording(&mut self, path: &Path) -> CaptureResult<()>;

    /// Stop encoding and finalize the output file.
    fn stop_recording(&mut self) -> CaptureResult<()>;
}

impl fmt::Debug for dyn DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn DeviceSession")
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Session event stream
//!
//! The controller reports outcomes over a broadcast channel so any number
//! of observers (UI, CLI, tests) can follow along without holding up the
//! capture pipeline.

use crate::errors::CaptureError;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Channel capacity; observers that lag beyond this lose oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stopped on request
    Requested,
    /// Stopped automatically because free space fell below the threshold
    StorageExhausted,
}

/// Outcome notifications emitted by the session controller
#[derive(Debug, Clone)]
pub enum CameraEvent {
    /// Device opened and the preview stream is running
    PreviewReady,
    /// A still capture completed and was persisted to this path
    CaptureSucceeded(PathBuf),
    /// A still capture attempt failed
    CaptureFailed(CaptureError),
    /// A recording started
    RecordingStarted,
    /// A recording ended; the file at `path` is finalized
    RecordingStopped { path: PathBuf, reason: StopReason },
    /// The active device disconnected or errored; the session is torn down
    DeviceUnavailable,
}

pub fn event_channel() -> (broadcast::Sender<CameraEvent>, broadcast::Receiver<CameraEvent>) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}

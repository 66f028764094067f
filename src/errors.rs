// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture controller

use std::fmt;

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Device/session operation that an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Building a capture session with output targets
    ConfigureSession,
    /// Reissuing the repeating preview request
    PreviewUpdate,
    /// Submitting the autofocus-start trigger
    LockFocus,
    /// Submitting the precapture trigger
    Precapture,
    /// Submitting the one-shot still request
    CaptureStill,
    /// Starting or stopping continuous recording
    CaptureVideo,
    /// Resetting focus/exposure triggers after a capture
    UnlockFocus,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ConfigureSession => "configure-session",
            Operation::PreviewUpdate => "preview-update",
            Operation::LockFocus => "lock-focus",
            Operation::Precapture => "precapture",
            Operation::CaptureStill => "capture-still",
            Operation::CaptureVideo => "capture-video",
            Operation::UnlockFocus => "unlock-focus",
        };
        write!(f, "{}", name)
    }
}

/// Capture controller error categories
///
/// Per-operation failures (`DeviceCommunication`) reset the capture state
/// machine and surface as a dismissible event; `DeviceDisconnected` is fatal
/// to the session and is never recovered in-process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Device lock acquisition timed out
    DeviceBusy,
    /// Permission or capability absent
    DeviceAccessDenied(String),
    /// Transport-level failure during open/configure/capture
    DeviceCommunication {
        /// Operation that failed
        op: Operation,
        /// Underlying failure description
        message: String,
    },
    /// Device reported disconnect or a device-level error (fatal)
    DeviceDisconnected,
    /// Storage medium not writable or media directory missing
    StorageUnavailable,
    /// Free space below the threshold for the requested media kind
    StorageExhausted,
    /// Writing the captured output file failed
    FileWriteFailed(String),
}

impl CaptureError {
    /// Shorthand for a transport-level failure tagged with its operation
    pub fn communication(op: Operation, message: impl Into<String>) -> Self {
        CaptureError::DeviceCommunication {
            op,
            message: message.into(),
        }
    }

    /// Retag a transport-level failure with the operation it interrupted;
    /// other categories pass through unchanged.
    pub fn with_operation(self, op: Operation) -> Self {
        match self {
            CaptureError::DeviceCommunication { message, .. } => {
                CaptureError::DeviceCommunication { op, message }
            }
            other => other,
        }
    }

    /// True for errors that end the session (no per-operation recovery)
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::DeviceDisconnected)
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceBusy => write!(f, "Device is busy"),
            CaptureError::DeviceAccessDenied(msg) => write!(f, "Device access denied: {}", msg),
            CaptureError::DeviceCommunication { op, message } => {
                write!(f, "Device communication failed during {}: {}", op, message)
            }
            CaptureError::DeviceDisconnected => write!(f, "Device disconnected"),
            CaptureError::StorageUnavailable => write!(f, "Storage unavailable"),
            CaptureError::StorageExhausted => write!(f, "Not enough free storage space"),
            CaptureError::FileWriteFailed(msg) => write!(f, "File write failed: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::FileWriteFailed(err.to_string())
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Still-capture state machine
//!
//! Pure transition logic over per-frame metadata. The controller feeds
//! every frame through [`advance`] and executes the returned action; the
//! function itself never touches the device. Missing metadata always moves
//! the machine forward, so a device that reports neither focus nor
//! exposure still completes a capture within a bounded number of frames.

use crate::device::types::{ExposureState, FrameMetadata};

/// Phase of an in-flight still capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Streaming preview, no capture in flight
    Preview,
    /// Autofocus lock requested, waiting for the lens to settle
    LockingFocus,
    /// Precapture metering requested, waiting for it to start
    Precapturing,
    /// Waiting for precapture metering to finish
    WaitingNonPrecapture,
    /// One-shot still submitted, waiting for the buffer
    Capturing,
}

/// Device work a transition asks the controller to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    None,
    /// Submit the precapture metering trigger
    RunPrecapture,
    /// Submit the one-shot still request
    CaptureStill,
}

/// Advance the capture phase for one frame of metadata.
pub fn advance(state: CaptureState, meta: &FrameMetadata) -> (CaptureState, FrameAction) {
    match state {
        CaptureState::Preview | CaptureState::Capturing => (state, FrameAction::None),

        CaptureState::LockingFocus => match meta.focus {
            // No focus metadata: proceed rather than stall
            None => (CaptureState::Precapturing, FrameAction::RunPrecapture),
            Some(focus) if focus.is_settled() => match meta.exposure {
                None | Some(ExposureState::Converged) => {
                    (CaptureState::Capturing, FrameAction::CaptureStill)
                }
                Some(_) => (CaptureState::Precapturing, FrameAction::RunPrecapture),
            },
            Some(_) => (state, FrameAction::None),
        },

        CaptureState::Precapturing => match meta.exposure {
            None
            | Some(ExposureState::Precapture)
            | Some(ExposureState::FlashRequired)
            | Some(ExposureState::Converged) => {
                (CaptureState::WaitingNonPrecapture, FrameAction::None)
            }
            Some(_) => (state, FrameAction::None),
        },

        CaptureState::WaitingNonPrecapture => match meta.exposure {
            Some(ExposureState::Precapture) => (state, FrameAction::None),
            _ => (CaptureState::Capturing, FrameAction::CaptureStill),
        },
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Frame dispatch
//!
//! Bridges the pure capture state machine to the device session: feeds each
//! frame through [`state::advance`] and issues whatever device work the
//! transition asks for.

use super::state::{self, CaptureState, FrameAction};
use crate::device::{DeviceSession, FrameMetadata};
use crate::errors::{CaptureResult, Operation};
use crate::request::{AfTrigger, PrecaptureTrigger, RequestTemplate};
use tracing::debug;

/// What the dispatcher did with a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Idle,
    PrecaptureStarted,
    StillSubmitted,
}

/// Advance the capture phase for one frame and perform the resulting
/// device work. On error the state is left at the value the transition
/// produced; the controller aborts the attempt either way.
pub fn dispatch_frame(
    capture_state: &mut CaptureState,
    meta: &FrameMetadata,
    template: &RequestTemplate,
    session: &mut dyn DeviceSession,
    rotation_degrees: u32,
) -> CaptureResult<DispatchOutcome> {
    let (next, action) = state::advance(*capture_state, meta);
    if next != *capture_state {
        debug!(from = ?*capture_state, to = ?next, "Capture phase transition");
    }
    *capture_state = next;

    match action {
        FrameAction::None => Ok(DispatchOutcome::Idle),
        FrameAction::RunPrecapture => {
            session
                .submit(&template.bake_trigger(None, Some(PrecaptureTrigger::Start)))
                .map_err(|err| err.with_operation(Operation::Precapture))?;
            Ok(DispatchOutcome::PrecaptureStarted)
        }
        FrameAction::CaptureStill => {
            begin_still_capture(template, session, rotation_degrees)?;
            Ok(DispatchOutcome::StillSubmitted)
        }
    }
}

/// Submit the one-shot still: the repeating stream is quiesced first so the
/// still request is the next thing the device processes.
pub fn begin_still_capture(
    template: &RequestTemplate,
    session: &mut dyn DeviceSession,
    rotation_degrees: u32,
) -> CaptureResult<()> {
    session
        .stop_repeating()
        .map_err(|err| err.with_operation(Operation::CaptureStill))?;
    session
        .abort_captures()
        .map_err(|err| err.with_operation(Operation::CaptureStill))?;
    session
        .submit(&template.bake_one_shot(rotation_degrees))
        .map_err(|err| err.with_operation(Operation::CaptureStill))
}

/// Submit the autofocus lock trigger that starts a capture attempt on
/// devices with continuous autofocus.
pub fn request_focus_lock(
    template: &RequestTemplate,
    session: &mut dyn DeviceSession,
) -> CaptureResult<()> {
    session
        .submit(&template.bake_trigger(Some(AfTrigger::Start), None))
        .map_err(|err| err.with_operation(Operation::LockFocus))
}

/// Cancel any outstanding triggers and restart the repeating stream; run
/// after a still completes or an attempt is abandoned.
pub fn resume_preview(
    template: &RequestTemplate,
    session: &mut dyn DeviceSession,
) -> CaptureResult<()> {
    session
        .submit(&template.bake_trigger(
            Some(AfTrigger::Cancel),
            Some(PrecaptureTrigger::Cancel),
        ))
        .map_err(|err| err.with_operation(Operation::UnlockFocus))?;
    session
        .set_repeating(&template.bake_repeating())
        .map_err(|err| err.with_operation(Operation::UnlockFocus))
}

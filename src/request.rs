// SPDX-License-Identifier: GPL-3.0-only

//! Capture request templates
//!
//! A [`RequestTemplate`] is the mutable set of capture parameters kept for
//! the lifetime of a session; [`BakedRequest`] is the immutable snapshot
//! actually submitted to the device. The repeating preview request is baked
//! from the template as-is; one-shot requests clone it and overlay trigger
//! or rotation fields.

use crate::device::types::Capabilities;
use crate::settings::{BlackAndWhiteMode, FlashMode};

/// Autofocus mode, auto-selected from the capability snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    /// Single-shot autofocus (fallback)
    Auto,
    /// Continuous autofocus optimized for stills
    ContinuousPicture,
}

/// Auto-exposure mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    /// AE on, flash never fired by AE
    On,
    /// AE on, hardware decides whether to fire the flash
    OnAutoFlash,
    /// AE on, flash always fired for stills
    OnAlwaysFlash,
}

/// Explicit flash unit control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashControl {
    Off,
    /// Single fire synchronized with a still capture
    Single,
    /// Continuous illumination while recording
    Torch,
}

/// Color effect applied by the ISP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorEffect {
    #[default]
    Off,
    Mono,
}

/// Color correction / aberration mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorCorrectionMode {
    Fast,
    #[default]
    HighQuality,
}

/// One-shot autofocus trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfTrigger {
    Start,
    Cancel,
}

/// One-shot precapture metering trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecaptureTrigger {
    Start,
    Cancel,
}

/// What a baked request is for; the device treats kinds differently
/// (repeating vs one-shot, which outputs it targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Continuously reapplied preview request
    Preview,
    /// Continuously reapplied preview+recorder request
    Record,
    /// One-shot request carrying AF/AE triggers
    Trigger,
    /// One-shot request targeting the still output
    Still,
}

/// Whether flash mapping follows still or continuous-recording rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureIntent {
    Still,
    Record,
}

/// Immutable request snapshot submitted to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakedRequest {
    pub kind: RequestKind,
    pub focus_mode: FocusMode,
    pub exposure_mode: Option<ExposureMode>,
    pub flash: Option<FlashControl>,
    pub color_effect: ColorEffect,
    pub color_correction: ColorCorrectionMode,
    pub af_trigger: Option<AfTrigger>,
    pub precapture_trigger: Option<PrecaptureTrigger>,
    /// Output rotation for one-shot stills
    pub rotation_degrees: Option<u32>,
}

/// Mutable capture parameter set for one open session
///
/// Rebuilt (not replaced) when a setting changes; the session controller
/// re-bakes and reissues the repeating request afterwards.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    intent: CaptureIntent,
    flash_supported: bool,
    focus_mode: FocusMode,
    exposure_mode: Option<ExposureMode>,
    flash: Option<FlashControl>,
    color_effect: ColorEffect,
    color_correction: ColorCorrectionMode,
}

impl RequestTemplate {
    /// Build the default template for a device: AF mode auto-selected from
    /// the capability snapshot, high-quality color correction.
    pub fn new(caps: &Capabilities, intent: CaptureIntent) -> Self {
        let focus_mode = if caps.continuous_autofocus {
            FocusMode::ContinuousPicture
        } else {
            FocusMode::Auto
        };
        Self {
            intent,
            flash_supported: caps.flash_supported,
            focus_mode,
            exposure_mode: Some(ExposureMode::On),
            flash: None,
            color_effect: ColorEffect::Off,
            color_correction: ColorCorrectionMode::HighQuality,
        }
    }

    /// Selected autofocus mode
    pub fn focus_mode(&self) -> FocusMode {
        self.focus_mode
    }

    /// Apply the user flash preference.
    ///
    /// Still capture: ON fires the flash once with always-flash exposure,
    /// AUTO leaves the flash field unset so the hardware decides.
    /// Recording: ON means torch (continuous illumination) and AUTO is
    /// defined as "no flash".
    pub fn apply_flash_mode(&mut self, mode: FlashMode) -> &mut Self {
        if !self.flash_supported {
            return self;
        }
        let (exposure, flash) = match self.intent {
            CaptureIntent::Still => match mode {
                FlashMode::On => (Some(ExposureMode::OnAlwaysFlash), Some(FlashControl::Single)),
                FlashMode::Off => (Some(ExposureMode::On), Some(FlashControl::Off)),
                FlashMode::Auto => (Some(ExposureMode::OnAutoFlash), None),
            },
            CaptureIntent::Record => match mode {
                FlashMode::On => (Some(ExposureMode::On), Some(FlashControl::Torch)),
                FlashMode::Off => (Some(ExposureMode::On), Some(FlashControl::Off)),
                // Auto-flash has no meaning for continuous recording
                FlashMode::Auto => (self.exposure_mode, Some(FlashControl::Off)),
            },
        };
        self.exposure_mode = exposure;
        self.flash = flash;
        self
    }

    /// Map the black-and-white preference onto the mono color effect.
    pub fn apply_black_and_white(&mut self, mode: BlackAndWhiteMode) -> &mut Self {
        self.color_effect = match mode {
            BlackAndWhiteMode::Enabled => ColorEffect::Mono,
            BlackAndWhiteMode::Disabled => ColorEffect::Off,
        };
        self
    }

    fn snapshot(&self, kind: RequestKind) -> BakedRequest {
        BakedRequest {
            kind,
            focus_mode: self.focus_mode,
            exposure_mode: self.exposure_mode,
            flash: self.flash,
            color_effect: self.color_effect,
            color_correction: self.color_correction,
            af_trigger: None,
            precapture_trigger: None,
            rotation_degrees: None,
        }
    }

    /// Bake the repeating request applied continuously for preview (or
    /// preview + recorder for a recording template).
    pub fn bake_repeating(&self) -> BakedRequest {
        let kind = match self.intent {
            CaptureIntent::Still => RequestKind::Preview,
            CaptureIntent::Record => RequestKind::Record,
        };
        self.snapshot(kind)
    }

    /// Bake a one-shot trigger request: the repeating template plus the
    /// given AF/precapture triggers.
    pub fn bake_trigger(
        &self,
        af: Option<AfTrigger>,
        precapture: Option<PrecaptureTrigger>,
    ) -> BakedRequest {
        let mut request = self.snapshot(RequestKind::Trigger);
        request.af_trigger = af;
        request.precapture_trigger = precapture;
        request
    }

    /// Bake the one-shot still request: a clone of the repeating template
    /// with the output rotation overlaid.
    pub fn bake_one_shot(&self, rotation_degrees: u32) -> BakedRequest {
        let mut request = self.snapshot(RequestKind::Still);
        request.rotation_degrees = Some(rotation_degrees);
        request
    }
}

/// Host display rotation, supplied by the embedding UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl DisplayRotation {
    fn base_mapping(&self) -> u32 {
        match self {
            DisplayRotation::Deg0 => 90,
            DisplayRotation::Deg90 => 0,
            DisplayRotation::Deg180 => 270,
            DisplayRotation::Deg270 => 180,
        }
    }
}

/// Output rotation for a still: the display rotation mapped through the
/// sensor mounting orientation. Sensors mounted at 270 need the output
/// rotated a further 180 degrees relative to the common 90 mounting.
pub fn output_rotation(display: DisplayRotation, sensor_orientation: u32) -> u32 {
    (display.base_mapping() + sensor_orientation + 270) % 360
}

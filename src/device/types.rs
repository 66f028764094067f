// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for capture device platforms

use crate::constants::MAX_RECORDING_HEIGHT;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;

/// Opaque capture device identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Physical direction the lens points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LensFacing {
    Front,
    Back,
    External,
}

impl fmt::Display for LensFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LensFacing::Front => write!(f, "front"),
            LensFacing::Back => write!(f, "back"),
            LensFacing::External => write!(f, "external"),
        }
    }
}

/// An output size a device can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

impl OutputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Both dimensions divided by two (the SMALL size mode).
    pub fn halved(&self) -> Self {
        Self {
            width: self.width / 2,
            height: self.height / 2,
        }
    }
}

impl fmt::Display for OutputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Static capability snapshot of a device, immutable once queried
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Device has a flash unit
    pub flash_supported: bool,
    /// Device supports continuous-picture autofocus
    pub continuous_autofocus: bool,
    /// Lens direction
    pub lens_facing: LensFacing,
    /// Sensor mounting orientation in degrees
    pub sensor_orientation: u32,
    /// Still (JPEG) output sizes
    pub still_sizes: Vec<OutputSize>,
    /// Preview output sizes
    pub preview_sizes: Vec<OutputSize>,
}

impl Capabilities {
    /// Largest still output size by area; stills always use the maximum.
    pub fn largest_still_size(&self) -> Option<OutputSize> {
        self.still_sizes.iter().copied().max_by_key(OutputSize::area)
    }

    /// Largest preview size by area.
    pub fn largest_preview_size(&self) -> Option<OutputSize> {
        self.preview_sizes
            .iter()
            .copied()
            .max_by_key(OutputSize::area)
    }

    /// Largest size usable for recording: capped at 1080p, falling back to
    /// the overall largest if nothing fits the cap.
    pub fn recording_size(&self) -> Option<OutputSize> {
        self.still_sizes
            .iter()
            .copied()
            .filter(|s| s.height <= MAX_RECORDING_HEIGHT)
            .max_by_key(OutputSize::area)
            .or_else(|| self.largest_still_size())
    }
}

/// Per-frame autofocus state reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    /// AF idle, no scan running
    Inactive,
    /// Continuous AF scanning
    PassiveScan,
    /// Continuous AF settled without a lock
    PassiveFocused,
    /// Triggered AF scan in progress
    ActiveScan,
    /// Lens locked, subject in focus
    FocusedLocked,
    /// Lens locked, focus not achieved
    NotFocusedLocked,
}

impl FocusState {
    /// States in which a capture may proceed to the exposure check.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            FocusState::Inactive | FocusState::FocusedLocked | FocusState::NotFocusedLocked
        )
    }
}

/// Per-frame auto-exposure state reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureState {
    /// AE idle
    Inactive,
    /// AE metering
    Searching,
    /// AE has converged
    Converged,
    /// AE locked
    Locked,
    /// AE converged but flash is required for good exposure
    FlashRequired,
    /// Precapture metering sequence running
    Precapture,
}

/// Metadata delivered with every preview/capture frame
///
/// Either field may be absent; some devices never populate one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameMetadata {
    pub focus: Option<FocusState>,
    pub exposure: Option<ExposureState>,
}

impl FrameMetadata {
    pub fn new(focus: Option<FocusState>, exposure: Option<ExposureState>) -> Self {
        Self { focus, exposure }
    }
}

/// A captured still image buffer
///
/// Holds a slot in the device's finite in-flight image pool; dropping the
/// image on any path returns the slot, so a leaked buffer is the only way
/// to starve the pool.
pub struct StillImage {
    data: Arc<[u8]>,
    _pool_slot: Option<OwnedSemaphorePermit>,
}

impl StillImage {
    pub fn new(data: impl Into<Arc<[u8]>>, pool_slot: Option<OwnedSemaphorePermit>) -> Self {
        Self {
            data: data.into(),
            _pool_slot: pool_slot,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for StillImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StillImage({} bytes)", self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps_with_sizes(still: Vec<OutputSize>) -> Capabilities {
        Capabilities {
            flash_supported: true,
            continuous_autofocus: true,
            lens_facing: LensFacing::Back,
            sensor_orientation: 90,
            still_sizes: still,
            preview_sizes: vec![OutputSize::new(1280, 720)],
        }
    }

    #[test]
    fn test_largest_still_size() {
        let caps = caps_with_sizes(vec![
            OutputSize::new(1920, 1080),
            OutputSize::new(4032, 3024),
            OutputSize::new(640, 480),
        ]);
        assert_eq!(caps.largest_still_size(), Some(OutputSize::new(4032, 3024)));
    }

    #[test]
    fn test_recording_size_capped_at_1080p() {
        let caps = caps_with_sizes(vec![
            OutputSize::new(4032, 3024),
            OutputSize::new(1920, 1080),
            OutputSize::new(1280, 720),
        ]);
        assert_eq!(caps.recording_size(), Some(OutputSize::new(1920, 1080)));
    }

    #[test]
    fn test_recording_size_falls_back_when_all_exceed_cap() {
        let caps = caps_with_sizes(vec![OutputSize::new(4032, 3024)]);
        assert_eq!(caps.recording_size(), Some(OutputSize::new(4032, 3024)));
    }

    #[test]
    fn test_halved_size() {
        assert_eq!(
            OutputSize::new(4032, 3024).halved(),
            OutputSize::new(2016, 1512)
        );
    }

    #[test]
    fn test_settled_focus_states() {
        assert!(FocusState::Inactive.is_settled());
        assert!(FocusState::FocusedLocked.is_settled());
        assert!(FocusState::NotFocusedLocked.is_settled());
        assert!(!FocusState::PassiveScan.is_settled());
        assert!(!FocusState::ActiveScan.is_settled());
    }
}

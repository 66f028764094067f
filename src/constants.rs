// SPDX-License-Identifier: GPL-3.0-only

//! Controller-wide constants

use std::time::Duration;

/// Bounded wait for the device lock before an open attempt is abandoned
/// and reported as busy.
pub const DEVICE_LOCK_TIMEOUT: Duration = Duration::from_millis(2500);

/// Interval of the free-space liveness check while recording.
pub const STORAGE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Minimum free space (MB) required to start a still capture.
pub const STILL_FREE_SPACE_MB: u64 = 20;

/// Minimum free space (MB) required to start or continue recording.
pub const VIDEO_FREE_SPACE_MB: u64 = 200;

/// Directory created under the pictures location for produced media.
pub const MEDIA_DIR_NAME: &str = "Shutter";

/// Timestamp format used for media file names (e.g. `20260825_143059.123`).
pub const MEDIA_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%.3f";

/// Recorder output is capped at 1080p; larger sensor sizes are skipped
/// when choosing the recording size.
pub const MAX_RECORDING_HEIGHT: u32 = 1080;

/// In-flight still image buffers a session may hold before the device
/// stops producing captures.
pub const STILL_IMAGE_POOL_SIZE: usize = 2;

/// Frame metadata delivery interval of the simulated device platform.
pub const SIM_FRAME_INTERVAL: Duration = Duration::from_millis(33);

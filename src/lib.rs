// SPDX-License-Identifier: GPL-3.0-only

//! Shutter - a camera capture session controller
//!
//! This library owns the full lifecycle of a capture device: opening it
//! behind a bounded-wait lock, streaming preview, driving the
//! autofocus/exposure state machine for still captures, recording video
//! with a free-space watchdog, and persisting output files off the hot
//! path.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`]: The session controller task and capture state machine
//! - [`device`]: Device platform abstraction, registry and the simulated
//!   platform
//! - [`request`]: Capture request templates and the flash/rotation mappings
//! - [`storage`]: Media paths, free-space gates and the media scan hook
//! - [`settings`]: User preferences and their persistence
//! - [`events`]: The controller's outcome event stream
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(DeviceRegistry::new(Arc::new(SimulatedPlatform::default_pair())));
//! let controller = SessionController::new(registry, storage, settings);
//! controller.open(None).await?;
//! controller.capture();
//! ```

pub mod constants;
pub mod device;
pub mod errors;
pub mod events;
pub mod request;
pub mod session;
pub mod settings;
pub mod storage;

// Re-export commonly used types
pub use device::{DeviceId, DeviceRegistry};
pub use errors::{CaptureError, CaptureResult};
pub use events::{CameraEvent, StopReason};
pub use session::{SessionController, SessionControllerConfig};
pub use settings::{BlackAndWhiteMode, FlashMode, SettingUpdate, SizeMode};
pub use storage::{DiskStorage, StorageProvider};

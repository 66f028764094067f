// SPDX-License-Identifier: GPL-3.0-only

//! Background still persistence
//!
//! Writes happen off the controller task so a slow disk never blocks the
//! preview stream. The image buffer (and its pool slot) is dropped as soon
//! as the write finishes, on every path.

use crate::device::types::StillImage;
use crate::errors::CaptureError;
use crate::events::CameraEvent;
use crate::storage::{MediaKind, StorageProvider};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Persist a captured still on a blocking worker and report the outcome on
/// the event channel.
pub fn spawn_save(
    image: StillImage,
    storage: Arc<dyn StorageProvider>,
    events: broadcast::Sender<CameraEvent>,
) {
    tokio::spawn(async move {
        let result = tokio::task::spawn_blocking(move || {
            let path = storage.reserve_path(MediaKind::Still)?;
            std::fs::write(&path, image.data())?;
            storage.scan(&path);
            drop(image);
            Ok::<_, std::io::Error>(path)
        })
        .await;

        let event = match result {
            Ok(Ok(path)) => {
                info!(path = %path.display(), "Still image saved");
                CameraEvent::CaptureSucceeded(path)
            }
            Ok(Err(err)) => {
                error!(error = %err, "Failed to persist still image");
                CameraEvent::CaptureFailed(CaptureError::FileWriteFailed(err.to_string()))
            }
            Err(err) => {
                error!(error = %err, "Still persistence worker panicked");
                CameraEvent::CaptureFailed(CaptureError::FileWriteFailed(err.to_string()))
            }
        };
        let _ = events.send(event);
    });
}

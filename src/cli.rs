// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the capture controller
//!
//! This module provides command-line functionality for:
//! - Listing available capture devices
//! - Taking photos
//! - Recording videos
//!
//! The commands run against the simulated device platform; real hardware
//! is wired in by embedding [`shutter::session::SessionController`] with a
//! platform implementation.

use shutter::device::simulated::SimulatedPlatform;
use shutter::device::{DeviceId, DeviceRegistry};
use shutter::session::SessionController;
use shutter::settings::{BlackAndWhiteMode, FlashMode, MemorySettingsStore, SizeMode};
use shutter::storage::DiskStorage;
use shutter::{CameraEvent, SettingUpdate};
use std::sync::Arc;
use std::time::Duration;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// How long a one-shot command waits for the controller to report back
const EVENT_WAIT: Duration = Duration::from_secs(10);

/// List all available capture devices
pub fn list_devices() -> CliResult {
    let registry = DeviceRegistry::new(Arc::new(SimulatedPlatform::default_pair()));
    let devices = registry.list_devices();

    if devices.is_empty() {
        println!("No capture devices found.");
        return Ok(());
    }

    println!("Available capture devices:");
    println!();
    for id in devices {
        match registry.capabilities_of(&id) {
            Some(caps) => {
                let largest = caps
                    .largest_still_size()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".into());
                println!(
                    "  {} ({} facing, max still {}{})",
                    id,
                    caps.lens_facing,
                    largest,
                    if caps.flash_supported { ", flash" } else { "" },
                );
            }
            None => println!("  {}", id),
        }
    }

    Ok(())
}

/// Take a photo using the specified device
pub fn take_photo(
    device: Option<String>,
    flash: Option<String>,
    small: bool,
    black_and_white: bool,
) -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    let result: CliResult = runtime.block_on(async move {
        let controller = build_controller();
        let mut events = controller.subscribe();

        if let Some(flash) = flash {
            let mode = FlashMode::from_str_lossy(&flash.to_uppercase());
            controller.update_setting(SettingUpdate::Flash(mode));
        }
        if small {
            controller.update_setting(SettingUpdate::Size(SizeMode::Small));
        }
        if black_and_white {
            controller.update_setting(SettingUpdate::BlackAndWhite(BlackAndWhiteMode::Enabled));
        }

        let id = controller.open(device.map(DeviceId::new)).await?;
        println!("Using device: {}", id);

        controller.capture();
        loop {
            match tokio::time::timeout(EVENT_WAIT, events.recv()).await {
                Ok(Ok(CameraEvent::CaptureSucceeded(path))) => {
                    println!("Photo saved to {}", path.display());
                    break;
                }
                Ok(Ok(CameraEvent::CaptureFailed(err))) => return Err(err.into()),
                Ok(Ok(_)) => {}
                Ok(Err(_)) | Err(_) => return Err("timed out waiting for the capture".into()),
            }
        }

        controller.close().await;
        Ok(())
    });
    result
}

/// Record a video using the specified device
pub fn record_video(device: Option<String>, duration: u64) -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    let result: CliResult = runtime.block_on(async move {
        let controller = build_controller();
        let mut events = controller.subscribe();

        let id = controller.open(device.map(DeviceId::new)).await?;
        println!("Using device: {}", id);

        controller.start_recording();
        loop {
            match tokio::time::timeout(EVENT_WAIT, events.recv()).await {
                Ok(Ok(CameraEvent::RecordingStarted)) => break,
                Ok(Ok(CameraEvent::CaptureFailed(err))) => return Err(err.into()),
                Ok(Ok(_)) => {}
                Ok(Err(_)) | Err(_) => {
                    return Err("timed out waiting for the recording to start".into());
                }
            }
        }

        println!("Recording for {} seconds...", duration);
        tokio::time::sleep(Duration::from_secs(duration)).await;

        controller.stop_recording();
        loop {
            match tokio::time::timeout(EVENT_WAIT, events.recv()).await {
                Ok(Ok(CameraEvent::RecordingStopped { path, .. })) => {
                    println!("Video saved to {}", path.display());
                    break;
                }
                Ok(Ok(CameraEvent::CaptureFailed(err))) => return Err(err.into()),
                Ok(Ok(_)) => {}
                Ok(Err(_)) | Err(_) => {
                    return Err("timed out waiting for the recording to stop".into());
                }
            }
        }

        controller.close().await;
        Ok(())
    });
    result
}

/// Controller wired to the simulated platform, disk storage under the
/// pictures directory, and in-memory settings (one-shot commands must not
/// disturb persisted preferences).
fn build_controller() -> SessionController {
    let registry = Arc::new(DeviceRegistry::new(Arc::new(
        SimulatedPlatform::default_pair(),
    )));
    let storage = Arc::new(DiskStorage::default_location());
    let settings = Arc::new(MemorySettingsStore::new());
    SessionController::new(registry, storage, settings)
}

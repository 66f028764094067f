// SPDX-License-Identifier: GPL-3.0-only

//! Recording lifecycle
//!
//! Tracks the single in-flight recording and enforces the storage gates
//! before one starts. The periodic free-space poll lives in the controller;
//! this type only answers whether a recording is active and starts/stops it.

use crate::device::DeviceSession;
use crate::errors::{CaptureError, CaptureResult};
use crate::storage::{MediaKind, StorageProvider};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

struct ActiveRecording {
    path: PathBuf,
    started_at: Instant,
}

/// State of the (at most one) active recording
#[derive(Default)]
pub struct RecordingController {
    active: Option<ActiveRecording>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Start a recording: storage must be ready and above the video
    /// free-space threshold before the encoder is touched.
    pub fn start(
        &mut self,
        storage: &dyn StorageProvider,
        session: &mut dyn DeviceSession,
    ) -> CaptureResult<()> {
        if self.active.is_some() {
            warn!("Recording already in progress, ignoring start");
            return Ok(());
        }
        if !storage.storage_ready() {
            return Err(CaptureError::StorageUnavailable);
        }
        if !storage.has_free_space(MediaKind::Video) {
            return Err(CaptureError::StorageExhausted);
        }

        let path = storage.reserve_path(MediaKind::Video)?;
        session.start_recording(&path)?;

        info!(path = %path.display(), "Recording started");
        self.active = Some(ActiveRecording {
            path,
            started_at: Instant::now(),
        });
        Ok(())
    }

    /// Stop the active recording and finalize its file. Returns the output
    /// path, or `None` when nothing was recording.
    pub fn stop(
        &mut self,
        storage: &dyn StorageProvider,
        session: &mut dyn DeviceSession,
    ) -> CaptureResult<Option<PathBuf>> {
        let Some(recording) = self.active.take() else {
            return Ok(None);
        };

        session.stop_recording()?;
        storage.scan(&recording.path);

        info!(
            path = %recording.path.display(),
            duration_secs = recording.started_at.elapsed().as_secs(),
            "Recording stopped"
        );
        Ok(Some(recording.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::BakedRequest;
    use std::io;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSession {
        recording: bool,
    }

    impl DeviceSession for FakeSession {
        fn set_repeating(&mut self, _request: &BakedRequest) -> CaptureResult<()> {
            Ok(())
        }

        fn stop_repeating(&mut self) -> CaptureResult<()> {
            Ok(())
        }

        fn abort_captures(&mut self) -> CaptureResult<()> {
            Ok(())
        }

        fn submit(&mut self, _request: &BakedRequest) -> CaptureResult<()> {
            Ok(())
        }

        fn start_recording(&mut self, _path: &Path) -> CaptureResult<()> {
            self.recording = true;
            Ok(())
        }

        fn stop_recording(&mut self) -> CaptureResult<()> {
            self.recording = false;
            Ok(())
        }
    }

    struct FakeStorage {
        ready: bool,
        free_mb: Option<u64>,
        scanned: Mutex<Vec<PathBuf>>,
    }

    impl FakeStorage {
        fn new(ready: bool, free_mb: Option<u64>) -> Self {
            Self {
                ready,
                free_mb,
                scanned: Mutex::new(Vec::new()),
            }
        }
    }

    impl StorageProvider for FakeStorage {
        fn reserve_path(&self, kind: MediaKind) -> io::Result<PathBuf> {
            Ok(PathBuf::from(format!("/tmp/rec.{}", kind.extension())))
        }

        fn available_space_mb(&self) -> Option<u64> {
            self.free_mb
        }

        fn storage_ready(&self) -> bool {
            self.ready
        }

        fn scan(&self, path: &Path) {
            self.scanned.lock().unwrap().push(path.to_path_buf());
        }
    }

    #[test]
    fn test_start_and_stop_round_trip() {
        let storage = FakeStorage::new(true, Some(10_000));
        let mut session = FakeSession::default();
        let mut recording = RecordingController::new();

        recording.start(&storage, &mut session).unwrap();
        assert!(recording.is_recording());
        assert!(session.recording);

        let path = recording.stop(&storage, &mut session).unwrap();
        assert_eq!(path, Some(PathBuf::from("/tmp/rec.mp4")));
        assert!(!recording.is_recording());
        assert!(!session.recording);
        assert_eq!(storage.scanned.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_start_requires_ready_storage() {
        let storage = FakeStorage::new(false, Some(10_000));
        let mut session = FakeSession::default();
        let mut recording = RecordingController::new();

        assert_eq!(
            recording.start(&storage, &mut session),
            Err(CaptureError::StorageUnavailable)
        );
        assert!(!recording.is_recording());
    }

    #[test]
    fn test_start_requires_free_space() {
        // At the threshold is not enough; the gate needs strictly more
        let storage = FakeStorage::new(true, Some(200));
        let mut session = FakeSession::default();
        let mut recording = RecordingController::new();

        assert_eq!(
            recording.start(&storage, &mut session),
            Err(CaptureError::StorageExhausted)
        );
    }

    #[test]
    fn test_unknown_free_space_blocks_start() {
        let storage = FakeStorage::new(true, None);
        let mut session = FakeSession::default();
        let mut recording = RecordingController::new();

        assert_eq!(
            recording.start(&storage, &mut session),
            Err(CaptureError::StorageExhausted)
        );
    }

    #[test]
    fn test_stop_without_recording_is_noop() {
        let storage = FakeStorage::new(true, Some(10_000));
        let mut session = FakeSession::default();
        let mut recording = RecordingController::new();

        assert_eq!(recording.stop(&storage, &mut session).unwrap(), None);
    }
}

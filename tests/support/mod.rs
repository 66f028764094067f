// SPDX-License-Identifier: GPL-3.0-only

//! Shared helpers for controller integration tests

#![allow(dead_code)]

use shutter::CameraEvent;
use shutter::session::SessionControllerConfig;
use shutter::storage::{MediaKind, StorageProvider};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

/// Controller config with waits short enough for tests
pub fn test_config() -> SessionControllerConfig {
    SessionControllerConfig {
        lock_timeout: Duration::from_millis(200),
        storage_poll_interval: Duration::from_millis(100),
        ..SessionControllerConfig::default()
    }
}

/// Storage with controllable free space and readiness
pub struct TestStorage {
    dir: PathBuf,
    free_mb: Mutex<Option<u64>>,
    ready: AtomicBool,
    counter: AtomicU64,
    scanned: Mutex<Vec<PathBuf>>,
}

impl TestStorage {
    pub fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "shutter-test-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        Self {
            dir,
            free_mb: Mutex::new(Some(10_000)),
            ready: AtomicBool::new(true),
            counter: AtomicU64::new(0),
            scanned: Mutex::new(Vec::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn set_free_mb(&self, mb: Option<u64>) {
        *self.free_mb.lock().unwrap() = mb;
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn scanned_paths(&self) -> Vec<PathBuf> {
        self.scanned.lock().unwrap().clone()
    }
}

impl StorageProvider for TestStorage {
    fn reserve_path(&self, kind: MediaKind) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(self.dir.join(format!("media-{:03}.{}", n, kind.extension())))
    }

    fn available_space_mb(&self) -> Option<u64> {
        *self.free_mb.lock().unwrap()
    }

    fn storage_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn scan(&self, path: &Path) {
        self.scanned.lock().unwrap().push(path.to_path_buf());
    }
}

/// Receive the next event, failing the test after five seconds.
pub async fn next_event(rx: &mut broadcast::Receiver<CameraEvent>) -> CameraEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a controller event")
        .expect("event channel closed")
}

/// Receive events until one matches, failing the test after five seconds.
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<CameraEvent>, mut matches: F) -> CameraEvent
where
    F: FnMut(&CameraEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for a matching controller event")
}

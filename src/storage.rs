// SPDX-License-Identifier: GPL-3.0-only

//! Media storage collaborator
//!
//! Reserves timestamped output paths, answers free-space queries and fires
//! the best-effort media index refresh after a write. The free-space
//! thresholds gate capture (20 MB) and recording (200 MB) before they start.

use crate::constants::{
    MEDIA_DIR_NAME, MEDIA_TIMESTAMP_FORMAT, STILL_FREE_SPACE_MB, VIDEO_FREE_SPACE_MB,
};
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Kind of media a path is reserved for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Still,
    Video,
}

impl MediaKind {
    /// File extension for the produced media
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Still => "jpg",
            MediaKind::Video => "mp4",
        }
    }

    /// Free space (MB) that must remain before starting this kind of capture
    pub fn free_space_threshold_mb(&self) -> u64 {
        match self {
            MediaKind::Still => STILL_FREE_SPACE_MB,
            MediaKind::Video => VIDEO_FREE_SPACE_MB,
        }
    }
}

/// Storage collaborator the session controller is constructed with
pub trait StorageProvider: Send + Sync {
    /// Reserve the destination path for the next capture of `kind`,
    /// creating the media directory if needed.
    fn reserve_path(&self, kind: MediaKind) -> io::Result<PathBuf>;

    /// Free space on the storage medium in MB, `None` if the query failed.
    fn available_space_mb(&self) -> Option<u64>;

    /// Storage medium writable and media directory present (or creatable).
    fn storage_ready(&self) -> bool;

    /// Best-effort, fire-and-forget media index refresh after a write.
    /// Failure here is never a capture failure.
    fn scan(&self, path: &Path);

    /// Whether enough space remains to start a capture of `kind`.
    fn has_free_space(&self, kind: MediaKind) -> bool {
        match self.available_space_mb() {
            Some(mb) => mb > kind.free_space_threshold_mb(),
            None => false,
        }
    }
}

/// Filesystem-backed storage under a single media directory
pub struct DiskStorage {
    media_dir: PathBuf,
}

impl DiskStorage {
    /// Use an explicit media directory (created lazily).
    pub fn new(media_dir: PathBuf) -> Self {
        Self { media_dir }
    }

    /// `<pictures>/Shutter`, falling back to the home directory when the
    /// platform reports no pictures location.
    pub fn default_location() -> Self {
        let base = dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir);
        Self::new(base.join(MEDIA_DIR_NAME))
    }

    /// Directory all media is written into
    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.media_dir)
    }

    fn timestamp_name(kind: MediaKind) -> String {
        let stamp = chrono::Local::now().format(MEDIA_TIMESTAMP_FORMAT);
        format!("{}.{}", stamp, kind.extension())
    }
}

impl StorageProvider for DiskStorage {
    fn reserve_path(&self, kind: MediaKind) -> io::Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.media_dir.join(Self::timestamp_name(kind));

        // Stills are claimed eagerly so two rapid captures can never
        // resolve to the same file.
        if kind == MediaKind::Still {
            std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)?;
        }

        debug!(path = %path.display(), "Reserved media path");
        Ok(path)
    }

    fn available_space_mb(&self) -> Option<u64> {
        // Walk up to the nearest existing ancestor; the media dir itself
        // may not have been created yet.
        let mut probe: &Path = &self.media_dir;
        while !probe.exists() {
            probe = probe.parent()?;
        }
        free_space_mb(probe)
    }

    fn storage_ready(&self) -> bool {
        if self.media_dir.is_dir() {
            return true;
        }
        match self.ensure_dir() {
            Ok(()) => true,
            Err(err) => {
                warn!(dir = %self.media_dir.display(), error = %err, "Media directory unavailable");
                false
            }
        }
    }

    fn scan(&self, path: &Path) {
        // The host's media indexer picks the file up asynchronously; this
        // only announces the new path.
        debug!(path = %path.display(), "Media scan requested");
    }
}

/// Free space at `path` in MB via statvfs, `None` on failure.
fn free_space_mb(path: &Path) -> Option<u64> {
    let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        warn!(path = %path.display(), "statvfs failed");
        return None;
    }
    let free_bytes = stat.f_bavail as u64 * stat.f_frsize as u64;
    Some(free_bytes / (1024 * 1024))
}

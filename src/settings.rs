// SPDX-License-Identifier: GPL-3.0-only

//! User preference enumerations and their persistence
//!
//! Settings are stored as plain strings so that an unrecognized value left
//! behind by an older or newer build silently resolves to the documented
//! default instead of failing the load.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Flash behavior requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlashMode {
    /// Flash always fires (torch while recording)
    On,
    /// Flash never fires
    #[default]
    Off,
    /// Hardware decides for stills; defined as "no flash" while recording
    Auto,
}

impl FlashMode {
    /// Stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashMode::On => "ON",
            FlashMode::Off => "OFF",
            FlashMode::Auto => "AUTO",
        }
    }

    /// Parse a stored value, falling back to the default on anything
    /// unrecognized.
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "ON" => FlashMode::On,
            "OFF" => FlashMode::Off,
            "AUTO" => FlashMode::Auto,
            other => {
                debug!(value = other, "Unrecognized flash mode, using default");
                FlashMode::default()
            }
        }
    }
}

/// Still output size preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeMode {
    /// Half the maximum sensor dimensions
    Small,
    /// Maximum sensor dimensions
    #[default]
    Large,
}

impl SizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeMode::Small => "SMALL",
            SizeMode::Large => "LARGE",
        }
    }

    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "SMALL" => SizeMode::Small,
            "LARGE" => SizeMode::Large,
            other => {
                debug!(value = other, "Unrecognized size mode, using default");
                SizeMode::default()
            }
        }
    }
}

/// Black-and-white (mono color effect) preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlackAndWhiteMode {
    #[default]
    Disabled,
    Enabled,
}

impl BlackAndWhiteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlackAndWhiteMode::Disabled => "DISABLED",
            BlackAndWhiteMode::Enabled => "ENABLED",
        }
    }

    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "DISABLED" => BlackAndWhiteMode::Disabled,
            "ENABLED" => BlackAndWhiteMode::Enabled,
            other => {
                debug!(value = other, "Unrecognized B&W mode, using default");
                BlackAndWhiteMode::default()
            }
        }
    }
}

/// A single setting change posted to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingUpdate {
    Flash(FlashMode),
    Size(SizeMode),
    BlackAndWhite(BlackAndWhiteMode),
}

/// Preference storage collaborator
///
/// Reads never fail: missing or unrecognized stored values resolve to the
/// defaults (flash=OFF, size=LARGE, bw=DISABLED).
pub trait SettingsStore: Send + Sync {
    fn flash_mode(&self) -> FlashMode;
    fn set_flash_mode(&self, mode: FlashMode);

    fn size_mode(&self) -> SizeMode;
    fn set_size_mode(&self, mode: SizeMode);

    fn black_and_white_mode(&self) -> BlackAndWhiteMode;
    fn set_black_and_white_mode(&self, mode: BlackAndWhiteMode);
}

const FLASH_MODE_KEY: &str = "FLASH_MODE";
const SIZE_MODE_KEY: &str = "SIZE_MODE";
const BW_MODE_KEY: &str = "BW_MODE";

/// JSON-file backed settings store
///
/// Values live in a flat string map so foreign keys and values survive a
/// round-trip untouched.
pub struct JsonSettingsStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonSettingsStore {
    /// Open (or lazily create) the store at an explicit path.
    pub fn new(path: PathBuf) -> Self {
        let values = Self::load(&path);
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    /// Store under the user config directory (`<config>/shutter/settings.json`).
    pub fn default_location() -> Self {
        let base = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("shutter").join("settings.json"))
    }

    fn load(path: &PathBuf) -> HashMap<String, String> {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "Settings file unreadable, starting fresh");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) {
        let snapshot = {
            let mut values = self.values.lock().unwrap();
            values.insert(key.to_string(), value.to_string());
            values.clone()
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&snapshot) {
            Ok(raw) => {
                if let Err(err) = std::fs::write(&self.path, raw) {
                    warn!(path = %self.path.display(), error = %err, "Failed to persist settings");
                }
            }
            Err(err) => warn!(error = %err, "Failed to serialize settings"),
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn flash_mode(&self) -> FlashMode {
        self.get(FLASH_MODE_KEY)
            .map(|v| FlashMode::from_str_lossy(&v))
            .unwrap_or_default()
    }

    fn set_flash_mode(&self, mode: FlashMode) {
        self.put(FLASH_MODE_KEY, mode.as_str());
    }

    fn size_mode(&self) -> SizeMode {
        self.get(SIZE_MODE_KEY)
            .map(|v| SizeMode::from_str_lossy(&v))
            .unwrap_or_default()
    }

    fn set_size_mode(&self, mode: SizeMode) {
        self.put(SIZE_MODE_KEY, mode.as_str());
    }

    fn black_and_white_mode(&self) -> BlackAndWhiteMode {
        self.get(BW_MODE_KEY)
            .map(|v| BlackAndWhiteMode::from_str_lossy(&v))
            .unwrap_or_default()
    }

    fn set_black_and_white_mode(&self, mode: BlackAndWhiteMode) {
        self.put(BW_MODE_KEY, mode.as_str());
    }
}

/// In-memory settings store for tests and one-shot CLI runs
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a raw stored string, bypassing the typed setters.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

impl SettingsStore for MemorySettingsStore {
    fn flash_mode(&self) -> FlashMode {
        self.values
            .lock()
            .unwrap()
            .get(FLASH_MODE_KEY)
            .map(|v| FlashMode::from_str_lossy(v))
            .unwrap_or_default()
    }

    fn set_flash_mode(&self, mode: FlashMode) {
        self.put_raw(FLASH_MODE_KEY, mode.as_str());
    }

    fn size_mode(&self) -> SizeMode {
        self.values
            .lock()
            .unwrap()
            .get(SIZE_MODE_KEY)
            .map(|v| SizeMode::from_str_lossy(v))
            .unwrap_or_default()
    }

    fn set_size_mode(&self, mode: SizeMode) {
        self.put_raw(SIZE_MODE_KEY, mode.as_str());
    }

    fn black_and_white_mode(&self) -> BlackAndWhiteMode {
        self.values
            .lock()
            .unwrap()
            .get(BW_MODE_KEY)
            .map(|v| BlackAndWhiteMode::from_str_lossy(v))
            .unwrap_or_default()
    }

    fn set_black_and_white_mode(&self, mode: BlackAndWhiteMode) {
        self.put_raw(BW_MODE_KEY, mode.as_str());
    }
}

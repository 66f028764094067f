// SPDX-License-Identifier: GPL-3.0-only

//! Device registry
//!
//! Pure queries over platform-reported device data, memoized for the
//! registry's lifetime. Enumeration order is the platform's order; it
//! defines what "next device" means for a facing switch.

use super::types::{Capabilities, DeviceId};
use super::DevicePlatform;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Enumerates devices and serves capability snapshots
pub struct DeviceRegistry {
    platform: Arc<dyn DevicePlatform>,
    devices: Mutex<Option<Vec<DeviceId>>>,
    capabilities: Mutex<HashMap<DeviceId, Capabilities>>,
}

impl DeviceRegistry {
    pub fn new(platform: Arc<dyn DevicePlatform>) -> Self {
        Self {
            platform,
            devices: Mutex::new(None),
            capabilities: Mutex::new(HashMap::new()),
        }
    }

    /// Platform the registry fronts (used by the controller to open).
    pub fn platform(&self) -> &Arc<dyn DevicePlatform> {
        &self.platform
    }

    /// Ordered device ids, memoized on first call.
    pub fn list_devices(&self) -> Vec<DeviceId> {
        let mut cached = self.devices.lock().unwrap();
        if cached.is_none() {
            *cached = Some(self.platform.list_devices());
        }
        cached.clone().unwrap_or_default()
    }

    /// Capability snapshot of `id`, memoized; `None` when the platform
    /// does not know the device.
    pub fn capabilities_of(&self, id: &DeviceId) -> Option<Capabilities> {
        {
            let cached = self.capabilities.lock().unwrap();
            if let Some(caps) = cached.get(id) {
                return Some(caps.clone());
            }
        }
        let caps = self.platform.capabilities(id)?;
        self.capabilities
            .lock()
            .unwrap()
            .insert(id.clone(), caps.clone());
        Some(caps)
    }

    /// First enumerated device, used when no device was previously active.
    pub fn initial_device(&self) -> Option<DeviceId> {
        self.list_devices().into_iter().next()
    }

    /// Resolve the device a facing switch moves to: the next id in
    /// enumeration order, wrapping to the first. Returns `current`
    /// unchanged if it is the only device, it is unknown and enumeration
    /// is empty, or enumeration failed; callers treat that as "no switch
    /// occurred".
    pub fn next_device(&self, current: &DeviceId) -> DeviceId {
        let devices = self.list_devices();
        if devices.is_empty() {
            warn!(device = %current, "Device enumeration empty, staying on current device");
            return current.clone();
        }

        let current_index = devices.iter().position(|d| d == current).unwrap_or(0);
        let next_index = if current_index + 1 < devices.len() {
            current_index + 1
        } else {
            0
        };
        devices[next_index].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::types::{LensFacing, OutputSize};
    use crate::device::{DeviceEventSender, DevicePlatform};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubPlatform {
        devices: Vec<DeviceId>,
        enumerations: AtomicUsize,
    }

    impl StubPlatform {
        fn with_devices(ids: &[&str]) -> Self {
            Self {
                devices: ids.iter().map(|id| DeviceId::new(*id)).collect(),
                enumerations: AtomicUsize::new(0),
            }
        }
    }

    impl DevicePlatform for StubPlatform {
        fn list_devices(&self) -> Vec<DeviceId> {
            self.enumerations.fetch_add(1, Ordering::SeqCst);
            self.devices.clone()
        }

        fn capabilities(&self, id: &DeviceId) -> Option<Capabilities> {
            self.devices.contains(id).then(|| Capabilities {
                flash_supported: false,
                continuous_autofocus: false,
                lens_facing: LensFacing::Back,
                sensor_orientation: 90,
                still_sizes: vec![OutputSize::new(640, 480)],
                preview_sizes: vec![OutputSize::new(640, 480)],
            })
        }

        fn open(&self, _id: &DeviceId, _events: DeviceEventSender) {}
    }

    #[test]
    fn test_next_device_wraps() {
        let registry = DeviceRegistry::new(Arc::new(StubPlatform::with_devices(&["cam0", "cam1"])));
        assert_eq!(registry.next_device(&"cam0".into()), DeviceId::new("cam1"));
        assert_eq!(registry.next_device(&"cam1".into()), DeviceId::new("cam0"));
    }

    #[test]
    fn test_next_device_single_device_is_no_switch() {
        let registry = DeviceRegistry::new(Arc::new(StubPlatform::with_devices(&["cam0"])));
        assert_eq!(registry.next_device(&"cam0".into()), DeviceId::new("cam0"));
    }

    #[test]
    fn test_next_device_empty_enumeration_is_no_switch() {
        let registry = DeviceRegistry::new(Arc::new(StubPlatform::with_devices(&[])));
        assert_eq!(registry.next_device(&"cam0".into()), DeviceId::new("cam0"));
    }

    #[test]
    fn test_next_device_unknown_id_starts_from_first() {
        let registry = DeviceRegistry::new(Arc::new(StubPlatform::with_devices(&["cam0", "cam1"])));
        assert_eq!(registry.next_device(&"ghost".into()), DeviceId::new("cam1"));
    }

    #[test]
    fn test_enumeration_is_memoized() {
        let platform = Arc::new(StubPlatform::with_devices(&["cam0"]));
        let registry = DeviceRegistry::new(platform.clone());

        registry.list_devices();
        registry.list_devices();
        registry.next_device(&"cam0".into());

        assert_eq!(platform.enumerations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_capabilities_unknown_device() {
        let registry = DeviceRegistry::new(Arc::new(StubPlatform::with_devices(&["cam0"])));
        assert!(registry.capabilities_of(&"ghost".into()).is_none());
        assert!(registry.capabilities_of(&"cam0".into()).is_some());
    }

    #[test]
    fn test_initial_device() {
        let registry = DeviceRegistry::new(Arc::new(StubPlatform::with_devices(&["cam0", "cam1"])));
        assert_eq!(registry.initial_device(), Some(DeviceId::new("cam0")));
    }
}

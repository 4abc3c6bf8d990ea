//! Device registry — stable id → device aggregate.

use std::collections::BTreeMap;
use std::sync::Arc;

use homelink_domain::device::Device;
use homelink_domain::error::ValidationError;
use homelink_domain::id::DeviceId;

/// All devices known to this bridge, built once at startup from
/// configuration.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, Arc<Device>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, taking ownership of the aggregate.
    ///
    /// Returns the shared handle so the caller can keep wiring the driver.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateDevice`] when the id is already
    /// taken — a configuration error that must halt startup.
    pub fn register(&mut self, device: Device) -> Result<Arc<Device>, ValidationError> {
        let id = device.id().clone();
        if self.devices.contains_key(&id) {
            return Err(ValidationError::DuplicateDevice {
                id: id.to_string(),
            });
        }
        let device = Arc::new(device);
        self.devices.insert(id, Arc::clone(&device));
        Ok(device)
    }

    /// Look up a device by id.
    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<&Arc<Device>> {
        self.devices.get(id)
    }

    /// Iterate all devices in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.values()
    }

    /// Number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homelink_domain::device::DeviceKind;

    fn device(id: &str) -> Device {
        Device::builder(id, DeviceKind::Other).build().unwrap()
    }

    #[test]
    fn should_register_and_look_up_device() {
        let mut registry = DeviceRegistry::new();
        registry.register(device("device1")).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get(&DeviceId::from("device1")).is_some());
        assert!(registry.get(&DeviceId::from("device2")).is_none());
    }

    #[test]
    fn should_reject_duplicate_device_id() {
        let mut registry = DeviceRegistry::new();
        registry.register(device("device1")).unwrap();

        let result = registry.register(device("device1"));
        assert!(matches!(
            result,
            Err(ValidationError::DuplicateDevice { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_iterate_devices_in_id_order() {
        let mut registry = DeviceRegistry::new();
        registry.register(device("b")).unwrap();
        registry.register(device("a")).unwrap();

        let ids: Vec<String> = registry.iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}

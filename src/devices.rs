//! In-memory device registry
//!
//! Holds the ordered list of device records. Lookups are linear scans and the
//! first match wins; identifiers are not checked for uniqueness on insert.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{RegistryError, Result};

/// A single device tracked by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub status: bool,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
        }
    }
}

/// Store handle shared between HTTP handlers and WebSocket sessions
pub type SharedStore = Arc<RwLock<DeviceStore>>;

/// Ordered, insertion-preserving collection of devices
#[derive(Debug, Clone)]
pub struct DeviceStore {
    devices: Vec<Device>,
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl DeviceStore {
    /// Store with the three devices every fresh process starts with
    pub fn seeded() -> Self {
        Self::with_devices(vec![
            Device::new("1", "Luz da sala", false),
            Device::new("2", "Luz da sala 2", true),
            Device::new("3", "Porta", true),
        ])
    }

    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Snapshot of every device in insertion order
    pub fn list(&self) -> Vec<Device> {
        self.devices.clone()
    }

    /// Copy of the first device with the given id
    pub fn find_by_id(&self, id: &str) -> Option<Device> {
        self.devices.iter().find(|d| d.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.iter().any(|d| d.id == id)
    }

    /// Append a device. Duplicate ids are accepted.
    pub fn insert(&mut self, device: Device) {
        tracing::debug!(device_id = %device.id, "Inserting device");
        self.devices.push(device);
    }

    pub fn update_status(&mut self, id: &str, status: bool) -> Result<Device> {
        let device = self.find_mut(id)?;
        device.status = status;
        Ok(device.clone())
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<Device> {
        let device = self.find_mut(id)?;
        device.name = name.into();
        Ok(device.clone())
    }

    /// Remove every device with the given id, returning how many were dropped
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.devices.len();
        self.devices.retain(|d| d.id != id);
        before - self.devices.len()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Device> {
        self.devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| RegistryError::DeviceNotFound(id.to_string()))
    }
}

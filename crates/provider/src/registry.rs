//! In-memory device and profile registry.
//!
//! Stands in for the inventory cache. Reads and writes may interleave freely;
//! each lookup sees a consistent snapshot of one map.

use crate::TargetRegistry;
use fieldops_core::error::{FieldOpsError, FieldOpsResult};
use fieldops_core::Device;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

/// On-disk inventory: known devices and the names of existing profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub devices: Vec<Device>,
    pub profiles: Vec<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    devices: RwLock<HashMap<String, Device>>,
    profiles: RwLock<HashSet<String>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_inventory(inventory: Inventory) -> Self {
        let registry = Self::new();
        for device in inventory.devices {
            registry.add_device(device);
        }
        for profile in inventory.profiles {
            registry.add_profile(profile);
        }
        registry
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> FieldOpsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FieldOpsError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let inventory: Inventory = serde_json::from_str(&text)
            .map_err(|e| FieldOpsError::Config(format!("invalid inventory: {e}")))?;

        tracing::info!(
            path = %path.display(),
            devices = inventory.devices.len(),
            profiles = inventory.profiles.len(),
            "loaded inventory"
        );
        Ok(Self::from_inventory(inventory))
    }

    /// Inserts or replaces a device, keyed by name.
    pub fn add_device(&self, device: Device) {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device.name.clone(), device);
    }

    pub fn remove_device(&self, name: &str) -> Option<Device> {
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn add_profile(&self, name: impl Into<String>) {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into());
    }

    pub fn device_count(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl TargetRegistry for InMemoryRegistry {
    fn device(&self, name: &str) -> Option<Device> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn profile_exists(&self, name: &str) -> bool {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}

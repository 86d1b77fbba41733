//! Collaborator contracts for the coordinator, plus in-memory and simulated
//! implementations.

pub mod config;
pub mod registry;
pub mod sim;

use fieldops_core::error::FieldOpsResult;
use fieldops_core::{AdminState, Device, DeviceProfile, DiscoveredDevice, ResolvedScanRequest};
use async_trait::async_trait;
use std::time::Duration;

pub use config::{ServiceConfig, SharedConfig};
pub use registry::InMemoryRegistry;
pub use sim::SimulatedDriver;

/// Read-only lookup of known devices and profiles.
///
/// Implementations must tolerate concurrent reads while the inventory is
/// being updated elsewhere.
pub trait TargetRegistry: Send + Sync {
    fn device(&self, name: &str) -> Option<Device>;
    fn profile_exists(&self, name: &str) -> bool;
}

/// Snapshot accessors over the current service configuration.
pub trait ServiceState: Send + Sync {
    fn admin_state(&self) -> AdminState;
    fn discovery_enabled(&self) -> bool;

    /// Upper bound on a single profile scan. `None` means no limit.
    fn scan_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Fleet-wide discovery sweep. Coalescing overlapping sweeps is up to the driver.
#[async_trait]
pub trait DiscoveryDriver: Send + Sync {
    async fn discover(&self) -> FieldOpsResult<Vec<DiscoveredDevice>>;
}

/// Per-device protocol scan producing a device profile.
#[async_trait]
pub trait ProfileScanner: Send + Sync {
    async fn scan(&self, request: ResolvedScanRequest) -> FieldOpsResult<DeviceProfile>;
}

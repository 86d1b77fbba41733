//! Service configuration and the shared snapshot the coordinators read.

use crate::ServiceState;
use fieldops_core::error::{FieldOpsError, FieldOpsResult};
use fieldops_core::AdminState;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub admin_state: AdminState,
    pub discovery: DiscoveryConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    /// Watchdog for a single scan. Absent or `0` means scans may run
    /// indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ServiceConfig {
    pub fn from_json_str(s: &str) -> FieldOpsResult<Self> {
        serde_json::from_str(s).map_err(|e| FieldOpsError::Config(format!("invalid config: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> FieldOpsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FieldOpsError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded service config");
        Ok(config)
    }
}

/// Live configuration shared between the coordinators and whoever administers
/// the service. Every accessor reads a fresh snapshot.
#[derive(Debug, Default)]
pub struct SharedConfig {
    inner: RwLock<ServiceConfig>,
}

impl SharedConfig {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    pub fn snapshot(&self) -> ServiceConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lock(&self) {
        self.set_admin_state(AdminState::Locked);
    }

    pub fn unlock(&self) {
        self.set_admin_state(AdminState::Unlocked);
    }

    pub fn set_admin_state(&self, state: AdminState) {
        self.write().admin_state = state;
        tracing::info!(?state, "admin state changed");
    }

    pub fn set_discovery_enabled(&self, enabled: bool) {
        self.write().discovery.enabled = enabled;
    }

    pub fn set_scan_timeout(&self, timeout: Option<Duration>) {
        self.write().scan.timeout_ms = timeout.map(|d| d.as_millis() as u64);
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ServiceConfig> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ServiceState for SharedConfig {
    fn admin_state(&self) -> AdminState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .admin_state
    }

    fn discovery_enabled(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .discovery
            .enabled
    }

    fn scan_timeout(&self) -> Option<Duration> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .scan
            .timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

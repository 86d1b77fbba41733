//! Simulated protocol driver.
//!
//! Sleeps for a fixed delay instead of talking to hardware, then reports a
//! canned result. Failure can be injected at runtime.

use crate::{DiscoveryDriver, ProfileScanner};
use async_trait::async_trait;
use fieldops_core::error::{FieldOpsError, FieldOpsResult};
use fieldops_core::{DeviceProfile, DiscoveredDevice, ResolvedScanRequest};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Default resources reported for every scanned device.
const DEFAULT_RESOURCES: &[&str] = &["temperature", "humidity", "setpoint"];

pub struct SimulatedDriver {
    delay: Duration,
    discoverable: Vec<DiscoveredDevice>,
    fail: AtomicBool,
    sweeps: AtomicUsize,
    scans: AtomicUsize,
}

impl SimulatedDriver {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            discoverable: Vec::new(),
            fail: AtomicBool::new(false),
            sweeps: AtomicUsize::new(0),
            scans: AtomicUsize::new(0),
        }
    }

    /// Devices every sweep will report.
    pub fn with_discoverable(mut self, devices: Vec<DiscoveredDevice>) -> Self {
        self.discoverable = devices;
        self
    }

    /// Makes subsequent sweeps and scans fail after their delay.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Completed sweeps, successful or not.
    pub fn sweeps(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }

    /// Completed scans, successful or not.
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscoveryDriver for SimulatedDriver {
    async fn discover(&self) -> FieldOpsResult<Vec<DiscoveredDevice>> {
        tokio::time::sleep(self.delay).await;
        self.sweeps.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(FieldOpsError::Driver("simulated discovery failure".into()));
        }
        tracing::debug!(found = self.discoverable.len(), "simulated sweep");
        Ok(self.discoverable.clone())
    }
}

#[async_trait]
impl ProfileScanner for SimulatedDriver {
    async fn scan(&self, request: ResolvedScanRequest) -> FieldOpsResult<DeviceProfile> {
        tracing::debug!(
            device = %request.device_name,
            protocols = request.protocols.len(),
            "simulated scan"
        );
        tokio::time::sleep(self.delay).await;
        self.scans.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(FieldOpsError::Driver(format!(
                "simulated scan failure for {}",
                request.device_name
            )));
        }
        Ok(DeviceProfile {
            name: request.profile_name,
            device_name: request.device_name,
            resources: DEFAULT_RESOURCES.iter().map(|r| r.to_string()).collect(),
        })
    }
}

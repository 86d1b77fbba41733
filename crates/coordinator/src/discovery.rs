//! Fire-and-forget trigger for fleet-wide discovery sweeps.

use crate::validation::ensure_unlocked;
use fieldops_core::{CorrelationId, ErrorKind, OperationOutcome};
use fieldops_provider::{DiscoveryDriver, ServiceState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Starts discovery sweeps without waiting for them.
///
/// Sweeps are not guarded per target; overlapping triggers each start a
/// sweep and the driver decides whether to coalesce them.
pub struct DiscoveryCoordinator {
    state: Arc<dyn ServiceState>,
    driver: Arc<dyn DiscoveryDriver>,
    in_flight: Arc<AtomicUsize>,
}

impl DiscoveryCoordinator {
    pub fn new(state: Arc<dyn ServiceState>, driver: Arc<dyn DiscoveryDriver>) -> Self {
        Self {
            state,
            driver,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Checks lock and feature state, then launches a sweep and returns.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self, correlation_id: CorrelationId) -> OperationOutcome {
        if let Err(e) = ensure_unlocked(self.state.as_ref()) {
            tracing::warn!(correlation_id = %correlation_id, "discovery rejected: service locked");
            return e.into();
        }
        if !self.state.discovery_enabled() {
            tracing::warn!(correlation_id = %correlation_id, "discovery rejected: disabled");
            return OperationOutcome::rejected(
                ErrorKind::ServiceUnavailable,
                "device discovery disabled",
            );
        }

        let sweep = InFlight::enter(&self.in_flight);
        let driver = Arc::clone(&self.driver);
        let cid = correlation_id.clone();

        tokio::spawn(async move {
            let _sweep = sweep;
            tracing::info!(correlation_id = %cid, "discovery triggered");
            match driver.discover().await {
                Ok(found) => {
                    tracing::info!(correlation_id = %cid, found = found.len(), "discovered devices")
                }
                Err(e) => {
                    tracing::error!(correlation_id = %cid, error = %e, "discovery failed")
                }
            }
            tracing::info!(correlation_id = %cid, "discovery done");
        });

        OperationOutcome::Accepted {
            correlation_id,
            profile_name: None,
        }
    }

    /// Sweeps launched by this coordinator that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Counts one running sweep; decrements on drop.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

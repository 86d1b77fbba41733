//! Per-target mutual exclusion for long-running operations.
//!
//! One coarse mutex over the whole map: targets are few and operations run
//! far longer than the lock is held.

use fieldops_core::CorrelationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tracks which targets have an exclusive operation in flight.
///
/// Construct one per service and share it via `Arc`; independent instances
/// never see each other's entries.
#[derive(Debug, Default)]
pub struct OperationGuard {
    entries: Mutex<HashMap<String, CorrelationId>>,
}

impl OperationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `target` busy on behalf of `owner` unless it already is.
    ///
    /// Check and insert happen under one lock acquisition.
    pub fn try_acquire(&self, target: &str, owner: &CorrelationId) -> bool {
        let mut entries = self.entries();
        if entries.contains_key(target) {
            return false;
        }
        entries.insert(target.to_string(), owner.clone());
        true
    }

    /// Clears `target`. A no-op if it is not busy.
    pub fn release(&self, target: &str) {
        if self.entries().remove(target).is_none() {
            tracing::trace!(target_name = target, "release of idle target ignored");
        }
    }

    /// Like [`try_acquire`](Self::try_acquire), but returns a lease that
    /// releases the target when dropped.
    pub fn try_lease(self: &Arc<Self>, target: &str, owner: &CorrelationId) -> Option<GuardLease> {
        self.try_acquire(target, owner).then(|| GuardLease {
            guard: Arc::clone(self),
            target: target.to_string(),
        })
    }

    pub fn is_busy(&self, target: &str) -> bool {
        self.entries().contains_key(target)
    }

    /// Correlation id of the operation currently holding `target`.
    pub fn owner(&self, target: &str) -> Option<CorrelationId> {
        self.entries().get(target).cloned()
    }

    pub fn busy_count(&self) -> usize {
        self.entries().len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CorrelationId>> {
        // The map stays consistent even if a holder panicked mid-call.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive hold on one target. Dropping it releases the target.
#[derive(Debug)]
pub struct GuardLease {
    guard: Arc<OperationGuard>,
    target: String,
}

impl GuardLease {
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Drop for GuardLease {
    fn drop(&mut self) {
        self.guard.release(&self.target);
    }
}

//! Device-action coordinators: discovery sweeps and guarded profile scans.

pub mod discovery;
pub mod guard;
pub mod naming;
pub mod scan;
pub mod validation;

pub use discovery::DiscoveryCoordinator;
pub use guard::{GuardLease, OperationGuard};
pub use scan::ScanCoordinator;

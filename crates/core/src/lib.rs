//! Domain models, operation outcomes, and the reading validity gate.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod gate;
pub mod types;

pub use error::{ErrorKind, FieldOpsError, OperationError, OperationOutcome};
pub use gate::{is_valid, Reading, ValueType};
pub use types::{
    AdminState, CorrelationId, Device, DeviceProfile, DiscoveredDevice, ProtocolMap,
    ResolvedScanRequest, ScanRequest,
};

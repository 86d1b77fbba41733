//! Centralized error and outcome types for the FieldOps workspace.

use crate::types::CorrelationId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Top-level error enum for collaborator and configuration failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FieldOpsError {
    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type FieldOpsResult<T> = Result<T, FieldOpsError>;

// ---------------------------------------------------------------------------
// Trigger outcomes
// ---------------------------------------------------------------------------

/// Why a trigger was rejected. The transport layer owns the status-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ServiceLocked,
    /// Feature disabled, or the operation is not implemented by the driver.
    ServiceUnavailable,
    ContractInvalid,
    EntityNotFound,
    /// Duplicate name, or the target already has a scan in flight.
    Conflict,
    ServerError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ServiceLocked => "ServiceLocked",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
            ErrorKind::ContractInvalid => "ContractInvalid",
            ErrorKind::EntityNotFound => "EntityNotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::ServerError => "ServerError",
        };
        f.write_str(s)
    }
}

/// A synchronous rejection: the kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct OperationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl OperationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn service_locked() -> Self {
        Self::new(ErrorKind::ServiceLocked, "service locked")
    }
}

/// What a trigger call reports back before the background work finishes.
///
/// `Accepted` only means the work was launched; its eventual result is
/// reported through logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum OperationOutcome {
    #[serde(rename_all = "camelCase")]
    Accepted {
        correlation_id: CorrelationId,
        /// Resolved profile name for scans; `None` for discovery.
        #[serde(skip_serializing_if = "Option::is_none")]
        profile_name: Option<String>,
    },
    Rejected(OperationError),
}

impl OperationOutcome {
    pub fn rejected(kind: ErrorKind, message: impl Into<String>) -> Self {
        OperationOutcome::Rejected(OperationError::new(kind, message))
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, OperationOutcome::Accepted { .. })
    }

    /// The rejection kind, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            OperationOutcome::Accepted { .. } => None,
            OperationOutcome::Rejected(e) => Some(e.kind),
        }
    }

    pub fn profile_name(&self) -> Option<&str> {
        match self {
            OperationOutcome::Accepted { profile_name, .. } => profile_name.as_deref(),
            OperationOutcome::Rejected(_) => None,
        }
    }

    /// Acknowledgement text for an accepted trigger, or the rejection message.
    pub fn message(&self) -> String {
        match self {
            OperationOutcome::Accepted {
                correlation_id,
                profile_name: Some(_),
            } => format!("Trigger profile scan with correlationId {correlation_id}"),
            OperationOutcome::Accepted {
                correlation_id,
                profile_name: None,
            } => format!("Trigger discovery with correlationId {correlation_id}"),
            OperationOutcome::Rejected(e) => e.message.clone(),
        }
    }
}

impl From<OperationError> for OperationOutcome {
    fn from(e: OperationError) -> Self {
        OperationOutcome::Rejected(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_error_display() {
        assert_eq!(
            FieldOpsError::Driver("bus timeout".into()).to_string(),
            "Driver error: bus timeout"
        );
        assert_eq!(
            FieldOpsError::Config("bad json".into()).to_string(),
            "Config error: bad json"
        );
    }

    #[test]
    fn rejection_display_includes_kind() {
        let e = OperationError::new(ErrorKind::EntityNotFound, "device x not found");
        assert_eq!(e.to_string(), "EntityNotFound: device x not found");
    }

    #[test]
    fn accepted_scan_message_mentions_correlation_id() {
        let outcome = OperationOutcome::Accepted {
            correlation_id: CorrelationId::from("abc"),
            profile_name: Some("p".into()),
        };
        assert!(outcome.is_accepted());
        assert_eq!(outcome.error_kind(), None);
        assert_eq!(outcome.message(), "Trigger profile scan with correlationId abc");
    }

    #[test]
    fn outcome_serializes_tagged() {
        let outcome = OperationOutcome::rejected(ErrorKind::Conflict, "busy");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["kind"], "Conflict");

        let accepted = OperationOutcome::Accepted {
            correlation_id: CorrelationId::from("c-1"),
            profile_name: None,
        };
        let json = serde_json::to_value(&accepted).unwrap();
        assert_eq!(json["outcome"], "accepted");
        assert_eq!(json["correlationId"], "c-1");
        assert!(json.get("profileName").is_none());
    }
}

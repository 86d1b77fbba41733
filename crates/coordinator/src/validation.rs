//! Synchronous precondition checks shared by the coordinators.

use crate::naming::synthesize_profile_name;
use fieldops_core::{AdminState, ErrorKind, OperationError, ResolvedScanRequest, ScanRequest};
use fieldops_provider::{ServiceState, TargetRegistry};

/// Fresh names tried before a synthesized name is given up on.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Rejects with `ServiceLocked` when the service is administratively locked.
pub fn ensure_unlocked(state: &dyn ServiceState) -> Result<(), OperationError> {
    match state.admin_state() {
        AdminState::Locked => Err(OperationError::service_locked()),
        AdminState::Unlocked => Ok(()),
    }
}

/// Decodes a scan payload. Any decode failure, or an empty device name, is a
/// `ContractInvalid` rejection.
pub fn parse_scan_request(body: &[u8]) -> Result<ScanRequest, OperationError> {
    let request: ScanRequest = serde_json::from_slice(body).map_err(|e| {
        OperationError::new(
            ErrorKind::ContractInvalid,
            format!("failed to parse request body: {e}"),
        )
    })?;

    if request.device_name.trim().is_empty() {
        return Err(OperationError::new(
            ErrorKind::ContractInvalid,
            "deviceName must not be empty",
        ));
    }
    Ok(request)
}

/// Checks the request against the inventory and fills in the device's
/// protocols and, when absent, a synthesized profile name.
pub fn resolve_scan_request(
    request: ScanRequest,
    registry: &dyn TargetRegistry,
) -> Result<ResolvedScanRequest, OperationError> {
    let device = registry.device(&request.device_name).ok_or_else(|| {
        OperationError::new(
            ErrorKind::EntityNotFound,
            format!("device {} not found", request.device_name),
        )
    })?;

    let profile_name = match request.profile_name.filter(|n| !n.is_empty()) {
        Some(name) if registry.profile_exists(&name) => {
            return Err(OperationError::new(
                ErrorKind::Conflict,
                format!("profile name {name} is duplicated"),
            ));
        }
        Some(name) => name,
        None => unused_profile_name(&request.device_name, registry)?,
    };

    Ok(ResolvedScanRequest {
        device_name: request.device_name,
        profile_name,
        options: request.options,
        protocols: device.protocols,
    })
}

/// Synthesizes names until one is not already a profile in the registry.
fn unused_profile_name(
    device: &str,
    registry: &dyn TargetRegistry,
) -> Result<String, OperationError> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let name = synthesize_profile_name(device);
        if !registry.profile_exists(&name) {
            return Ok(name);
        }
        tracing::debug!(device, profile = %name, "synthesized profile name taken; retrying");
    }
    Err(OperationError::new(
        ErrorKind::ServerError,
        format!("could not synthesize an unused profile name for {device}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldops_core::Device;
    use fieldops_provider::{InMemoryRegistry, SharedConfig};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Reports the first `taken` profile names it is asked about as existing.
    struct CrowdedRegistry {
        inner: InMemoryRegistry,
        taken: usize,
        asked: Mutex<Vec<String>>,
    }

    impl TargetRegistry for CrowdedRegistry {
        fn device(&self, name: &str) -> Option<Device> {
            self.inner.device(name)
        }

        fn profile_exists(&self, name: &str) -> bool {
            let mut asked = self.asked.lock().unwrap();
            asked.push(name.to_string());
            asked.len() <= self.taken
        }
    }

    fn registry() -> InMemoryRegistry {
        let mut settings = BTreeMap::new();
        settings.insert("Address".to_string(), serde_json::json!("10.0.0.1"));
        let registry = InMemoryRegistry::new();
        registry.add_device(Device::new("thermostat-1").with_protocol("bacnet-ip", settings));
        registry.add_profile("thermostat");
        registry
    }

    #[test]
    fn locked_service_is_rejected() {
        let state = SharedConfig::default();
        assert!(ensure_unlocked(&state).is_ok());
        state.lock();
        assert_eq!(
            ensure_unlocked(&state).unwrap_err().kind,
            ErrorKind::ServiceLocked
        );
    }

    #[test]
    fn malformed_payload_is_contract_invalid() {
        let bodies: [&[u8]; 3] = [b"not json", br#"{"profileName":"x"}"#, br#"{"deviceName":""}"#];
        for body in bodies {
            let err = parse_scan_request(body).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ContractInvalid);
        }
    }

    #[test]
    fn unknown_device_is_not_found() {
        let err = resolve_scan_request(ScanRequest::for_device("ghost"), &registry()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::EntityNotFound);
        assert_eq!(err.message, "device ghost not found");
    }

    #[test]
    fn duplicate_profile_is_conflict() {
        let req = ScanRequest::for_device("thermostat-1").with_profile_name("thermostat");
        let err = resolve_scan_request(req, &registry()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.message.contains("duplicated"));
    }

    #[test]
    fn resolved_request_carries_protocols() {
        let req = ScanRequest::for_device("thermostat-1").with_profile_name("thermostat-v2");
        let resolved = resolve_scan_request(req, &registry()).unwrap();
        assert_eq!(resolved.profile_name, "thermostat-v2");
        assert_eq!(resolved.protocols["bacnet-ip"]["Address"], "10.0.0.1");
    }

    #[test]
    fn missing_profile_name_is_synthesized() {
        let resolved =
            resolve_scan_request(ScanRequest::for_device("thermostat-1"), &registry()).unwrap();
        assert!(resolved.profile_name.starts_with("thermostat-1_profile_"));
    }

    #[test]
    fn taken_synthesized_name_is_replaced() {
        let crowded = CrowdedRegistry {
            inner: registry(),
            taken: 3,
            asked: Mutex::new(Vec::new()),
        };
        let resolved =
            resolve_scan_request(ScanRequest::for_device("thermostat-1"), &crowded).unwrap();

        let asked = crowded.asked.lock().unwrap();
        assert_eq!(asked.len(), 4);
        assert_eq!(resolved.profile_name, asked[3]);
        assert!(!asked[..3].contains(&resolved.profile_name));
    }

    #[test]
    fn exhausted_name_synthesis_is_server_error() {
        let crowded = CrowdedRegistry {
            inner: registry(),
            taken: usize::MAX,
            asked: Mutex::new(Vec::new()),
        };
        let err =
            resolve_scan_request(ScanRequest::for_device("thermostat-1"), &crowded).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServerError);
        assert_eq!(crowded.asked.lock().unwrap().len(), MAX_NAME_ATTEMPTS);
    }
}

//! Domain types for the FieldOps device-action coordinator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Protocol name -> protocol-specific settings. Opaque to the coordinator.
pub type ProtocolMap = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

/// A managed device, addressed by its unique name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub protocols: ProtocolMap,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile_name: None,
            protocols: ProtocolMap::new(),
        }
    }

    pub fn with_protocol(
        mut self,
        protocol: impl Into<String>,
        settings: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        self.protocols.insert(protocol.into(), settings);
        self
    }
}

/// Administrative state of the device service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminState {
    #[default]
    Unlocked,
    Locked,
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Opaque per-trigger identifier, used for log correlation only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Fresh id for triggers that arrive without one.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Scan requests
// ---------------------------------------------------------------------------

/// Profile scan payload as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub device_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl ScanRequest {
    pub fn for_device(device_name: impl Into<String>) -> Self {
        Self {
            api_version: None,
            device_name: device_name.into(),
            profile_name: None,
            options: None,
        }
    }

    pub fn with_profile_name(mut self, name: impl Into<String>) -> Self {
        self.profile_name = Some(name.into());
        self
    }
}

/// A validated scan request, handed to the profile scanner.
///
/// `profile_name` is always set: caller-supplied or synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedScanRequest {
    pub device_name: String,
    pub profile_name: String,
    pub options: Option<serde_json::Value>,
    pub protocols: ProtocolMap,
}

// ---------------------------------------------------------------------------
// Driver results
// ---------------------------------------------------------------------------

/// Profile produced by a completed scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub name: String,
    pub device_name: String,
    pub resources: Vec<String>,
}

/// A device reported by a discovery sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub name: String,
    #[serde(default)]
    pub protocols: ProtocolMap,
}

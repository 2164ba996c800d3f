//! Device identity and configuration snapshot models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device identity as reported by `Shelly.GetDeviceInfo`.
///
/// Fetched at the start of every sweep and every restore so that a device
/// swapped behind a fixed endpoint is noticed before anything is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Unique device identifier (e.g. `shellyplus1-a8032ab12345`)
    pub id: String,
    /// User-assigned device name, if one was configured
    #[serde(default)]
    pub name: Option<String>,
    /// Device generation (2 for Plus/Pro lines)
    #[serde(default)]
    pub gen: u32,
    /// Hardware model code
    #[serde(default)]
    pub model: String,
    /// Whether the device requires authentication
    #[serde(default)]
    pub auth_en: bool,
}

impl DeviceInfo {
    /// Display name for logs and snapshot metadata: the user-assigned
    /// name when present, otherwise the device id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Persisted `device_config.json` snapshot: the full remote configuration
/// blob alongside the identity it was taken from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSnapshot {
    /// Device the configuration was read from
    pub device_id: String,
    /// Device display name at backup time
    pub device_name: String,
    /// Opaque configuration blob as returned by `Shelly.GetConfig`
    pub config: serde_json::Value,
    /// When the snapshot was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_time: Option<DateTime<Utc>>,
}

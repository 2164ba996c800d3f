//! Script records as reported by the `Script.*` RPC surface.

use serde::{Deserialize, Serialize};

/// One script as listed by `Script.List` (code omitted).
///
/// Identity is `id`; `name` is advisory and only used to build
/// human-readable snapshot filenames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptInfo {
    /// Device-scoped unique script id
    pub id: u32,
    /// Advisory script name; collisions are possible
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the script is enabled on the device
    #[serde(default)]
    pub enable: bool,
}

impl ScriptInfo {
    /// Name used for snapshot filenames: the advisory name when present,
    /// otherwise `script_{id}`.
    pub fn file_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("script_{}", self.id),
        }
    }
}

/// Response body of `Script.List`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScriptList {
    /// Scripts resident on the device
    #[serde(default)]
    pub scripts: Vec<ScriptInfo>,
}

/// Response body of `Script.GetCode`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptCode {
    /// Raw script source text
    #[serde(default)]
    pub data: String,
}

/// Metadata persisted alongside each script's code snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptMetadata {
    /// Script id on the device
    pub id: u32,
    /// Script name at backup time
    pub name: String,
    /// Whether the script was enabled at backup time
    pub enable: bool,
    /// Device the script was read from
    pub device_id: String,
    /// Device display name at backup time
    pub device_name: String,
}

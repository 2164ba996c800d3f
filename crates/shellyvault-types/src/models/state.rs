//! Coordinator state value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observable state of one backup coordinator.
///
/// Mutated only by the coordinator itself; observers receive whole
/// snapshots of this value, so every observation point is internally
/// consistent (no half-updated field pairs).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CoordinatorState {
    /// Last known device id, absent until first successful probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Last known device display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// True iff the most recent identity probe succeeded
    #[serde(default)]
    pub is_available: bool,
    /// Timestamp of the most recent successful probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Timestamp of the most recent fully completed sweep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_time: Option<DateTime<Utc>>,
    /// Completed sweeps since the coordinator was created
    #[serde(default)]
    pub backup_count: u64,
    /// Scripts enumerated in the most recent sweep
    #[serde(default)]
    pub script_count: usize,
    /// Most recent error message, `None` if the last operation succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

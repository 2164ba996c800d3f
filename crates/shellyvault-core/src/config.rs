//! Daemon configuration: the resolved `{endpoint, credential, storage
//! path, interval}` tuple, persisted as a JSON file.

use crate::error::{VaultError, VaultResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Data directory name under the user's home.
const DATA_DIR: &str = ".shellyvault";
/// Configuration filename inside the data directory.
const CONFIG_FILE: &str = "vault_config.json";

/// Default sweep interval: 24 hours.
pub const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 86_400;

/// Resolved daemon configuration for one device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultConfig {
    /// Device endpoint, e.g. `http://192.168.1.40`
    #[serde(default)]
    pub url: String,
    /// Device password; `None` for devices without authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Snapshot store root
    #[serde(default = "default_backup_path")]
    pub backup_path: PathBuf,
    /// Seconds between scheduled sweeps
    #[serde(default = "default_backup_interval")]
    pub backup_interval_secs: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            password: None,
            backup_path: default_backup_path(),
            backup_interval_secs: DEFAULT_BACKUP_INTERVAL_SECS,
        }
    }
}

impl VaultConfig {
    /// Check that the configuration is usable for network operations.
    pub fn validate(&self) -> VaultResult<()> {
        if self.url.is_empty() {
            return Err(VaultError::Config("device url is not configured".to_string()));
        }
        Url::parse(&self.url)
            .map_err(|e| VaultError::InvalidUrl(format!("{}: {}", self.url, e)))?;
        Ok(())
    }
}

fn default_backup_interval() -> u64 {
    DEFAULT_BACKUP_INTERVAL_SECS
}

fn default_backup_path() -> PathBuf {
    match data_dir() {
        Ok(dir) => dir.join("backups"),
        Err(_) => PathBuf::from("shelly_backups"),
    }
}

/// Gets the data directory path, creating it if necessary.
pub fn data_dir() -> VaultResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| VaultError::Config("failed to resolve home directory".to_string()))?;
    let dir = home.join(DATA_DIR);
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Load configuration from the given file, or from the default location
/// when `path` is `None`. A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> VaultResult<VaultConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => data_dir()?.join(CONFIG_FILE),
    };
    if !config_path.exists() {
        return Ok(VaultConfig::default());
    }
    let content = fs::read_to_string(&config_path)?;
    let config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration atomically (write tmp, then rename).
pub fn save_config(config: &VaultConfig, path: Option<&Path>) -> VaultResult<()> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => data_dir()?.join(CONFIG_FILE),
    };
    let tmp_path = config_path.with_extension("json.tmp");

    let content = serde_json::to_string_pretty(config)?;
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, &config_path)?;
    Ok(())
}

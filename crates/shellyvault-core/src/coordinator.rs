//! Backup/restore coordinator for one device.
//!
//! Owns the device's observable state, drives the backup sweep
//! (enumerate, fetch, persist, with per-script failure isolation) and
//! the restore path (locate, read, push). One coordinator serves exactly
//! one device; scheduling is external (periodic timer or direct calls).

use crate::client::ShellyClient;
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::snapshot::SnapshotStore;
use chrono::Utc;
use serde_json::Value;
use shellyvault_types::{ConfigSnapshot, CoordinatorState, DeviceInfo, ScriptInfo, ScriptMetadata};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Stateful orchestrator of probe/backup/restore for one device.
pub struct BackupCoordinator {
    endpoint: String,
    password: Option<String>,
    store: SnapshotStore,
    state_tx: watch::Sender<CoordinatorState>,
    /// At most one sweep or restore runs at a time per coordinator; a
    /// second trigger while one is in flight is rejected, not queued.
    op_guard: tokio::sync::Mutex<()>,
}

impl BackupCoordinator {
    /// Create a coordinator for one device endpoint with snapshots
    /// rooted at `backup_path`.
    pub fn new(
        endpoint: impl Into<String>,
        password: Option<String>,
        backup_path: impl Into<PathBuf>,
    ) -> Self {
        let (state_tx, _) = watch::channel(CoordinatorState::default());
        Self {
            endpoint: endpoint.into(),
            password,
            store: SnapshotStore::new(backup_path),
            state_tx,
            op_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a coordinator from a resolved configuration.
    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.url.clone(), config.password.clone(), config.backup_path.clone())
    }

    /// Consistent snapshot of the coordinator state.
    pub fn state(&self) -> CoordinatorState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to state changes. Every mutation publishes a whole new
    /// state value; display collaborators refresh without polling.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state_tx.subscribe()
    }

    /// Probe the device identity endpoint and update availability.
    ///
    /// This is the sole gate for every other operation: a failed probe
    /// marks the device unavailable and nothing else is attempted.
    pub async fn probe_identity(&self) -> VaultResult<DeviceInfo> {
        let mut client = self.client()?;
        self.probe_with(&mut client).await
    }

    /// Run one full backup sweep: probe, config snapshot (best effort),
    /// then every script with per-script failure isolation.
    ///
    /// A failed probe logs and returns `Ok(())` without touching the
    /// sweep counters; structural failures (directory creation, script
    /// enumeration) record `last_error` and propagate.
    pub async fn backup_all(&self) -> VaultResult<()> {
        let _guard =
            self.op_guard.try_lock().map_err(|_| VaultError::Busy("backup or restore"))?;

        let mut client = self.client()?;
        let device = match self.probe_with(&mut client).await {
            Ok(device) => device,
            Err(_) => {
                tracing::error!("Device at {} is offline, skipping backup", self.endpoint);
                return Ok(());
            }
        };

        match self.run_sweep(&mut client, &device).await {
            Ok(()) => {
                self.state_tx.send_modify(|state| {
                    state.last_backup_time = Some(Utc::now());
                    state.backup_count += 1;
                    state.last_error = None;
                });
                tracing::info!("Backup completed for device {}", device.id);
                Ok(())
            }
            Err(err) => {
                tracing::error!("Error during backup of {}: {}", device.id, err);
                self.state_tx.send_modify(|state| state.last_error = Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Restore a script from its snapshot (or an explicit file) onto the
    /// device.
    ///
    /// A missing snapshot is a logged no-op; read or upload failures
    /// propagate. An unreachable device logs and returns without error,
    /// matching the sweep's probe gate.
    pub async fn restore_script(
        &self,
        script_id: u32,
        backup_path: Option<PathBuf>,
    ) -> VaultResult<()> {
        let _guard =
            self.op_guard.try_lock().map_err(|_| VaultError::Busy("backup or restore"))?;

        let mut client = self.client()?;
        let device = match self.probe_with(&mut client).await {
            Ok(device) => device,
            Err(_) => {
                tracing::error!("Device at {} is offline, cannot restore script", self.endpoint);
                return Ok(());
            }
        };

        let source = match backup_path {
            Some(path) => path,
            None => match self.store.find_script_code(&device.id, script_id) {
                Some(path) => path,
                None => {
                    tracing::error!(
                        "No backup found for script id {} on device {}",
                        script_id,
                        device.id
                    );
                    return Ok(());
                }
            },
        };

        match self.push_script(&mut client, script_id, &source).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!("Error restoring script {}: {}", script_id, err);
                Err(err)
            }
        }
    }

    /// Restore the device configuration from its snapshot (or an
    /// explicit file).
    pub async fn restore_config(&self, backup_path: Option<PathBuf>) -> VaultResult<()> {
        let _guard =
            self.op_guard.try_lock().map_err(|_| VaultError::Busy("backup or restore"))?;

        let mut client = self.client()?;
        let device = match self.probe_with(&mut client).await {
            Ok(device) => device,
            Err(_) => {
                tracing::error!(
                    "Device at {} is offline, cannot restore configuration",
                    self.endpoint
                );
                return Ok(());
            }
        };

        let source = backup_path.unwrap_or_else(|| self.store.config_path(&device.id));
        if !source.exists() {
            tracing::error!("No configuration backup found at {}", source.display());
            return Ok(());
        }

        match self.push_config(&mut client, &device, &source).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!("Error restoring configuration for {}: {}", device.id, err);
                Err(err)
            }
        }
    }

    fn client(&self) -> VaultResult<ShellyClient> {
        ShellyClient::new(&self.endpoint, self.password.as_deref())
    }

    async fn probe_with(&self, client: &mut ShellyClient) -> VaultResult<DeviceInfo> {
        match client.get_device_info().await {
            Ok(device) => {
                self.state_tx.send_modify(|state| {
                    state.device_id = Some(device.id.clone());
                    state.device_name = Some(device.display_name().to_string());
                    state.is_available = true;
                    state.last_seen = Some(Utc::now());
                    state.last_error = None;
                });
                Ok(device)
            }
            Err(err) => {
                tracing::warn!("Failed to probe device at {}: {}", self.endpoint, err);
                self.state_tx.send_modify(|state| {
                    state.is_available = false;
                    state.last_error = Some(err.to_string());
                });
                Err(err)
            }
        }
    }

    async fn run_sweep(&self, client: &mut ShellyClient, device: &DeviceInfo) -> VaultResult<()> {
        tracing::info!("Starting backup for device {} ({})", device.display_name(), device.id);
        self.store.ensure_device_dir(&device.id)?;

        // Config backup is best effort; a failure here never aborts the
        // script sweep.
        if let Err(err) = self.backup_config(client, device).await {
            tracing::error!("Error backing up configuration for {}: {}", device.id, err);
        }

        let scripts = client.list_scripts().await?.scripts;
        self.state_tx.send_modify(|state| state.script_count = scripts.len());

        if scripts.is_empty() {
            tracing::info!("No scripts found on device {}", device.id);
            return Ok(());
        }

        for script in &scripts {
            // One bad script never aborts the sweep.
            if let Err(err) = self.backup_script(client, device, script).await {
                tracing::error!(
                    "Error backing up script {} (id {}) on {}: {}",
                    script.file_name(),
                    script.id,
                    device.id,
                    err
                );
            }
        }
        Ok(())
    }

    async fn backup_script(
        &self,
        client: &mut ShellyClient,
        device: &DeviceInfo,
        script: &ScriptInfo,
    ) -> VaultResult<()> {
        tracing::debug!("Backing up script {} (id {})", script.file_name(), script.id);

        let code = client.get_script_code(script.id).await?.data;
        let metadata = ScriptMetadata {
            id: script.id,
            name: script.file_name(),
            enable: script.enable,
            device_id: device.id.clone(),
            device_name: device.display_name().to_string(),
        };
        let path = self.store.write_script(&device.id, script, &code, &metadata)?;

        tracing::info!(
            "Backed up script {} (id {}) to {}",
            script.file_name(),
            script.id,
            path.display()
        );
        Ok(())
    }

    async fn backup_config(
        &self,
        client: &mut ShellyClient,
        device: &DeviceInfo,
    ) -> VaultResult<()> {
        tracing::debug!("Backing up configuration for device {}", device.id);

        let config = client.get_config().await?;
        let snapshot = ConfigSnapshot {
            device_id: device.id.clone(),
            device_name: device.display_name().to_string(),
            config,
            backup_time: Some(Utc::now()),
        };
        self.store.write_config(&device.id, &snapshot)?;

        tracing::info!("Backed up configuration for device {}", device.id);
        Ok(())
    }

    async fn push_script(
        &self,
        client: &mut ShellyClient,
        script_id: u32,
        source: &Path,
    ) -> VaultResult<()> {
        let code = fs::read_to_string(source)?;
        tracing::info!("Restoring script id {} from {}", script_id, source.display());
        client.put_script_code(script_id, &code).await?;
        tracing::info!("Script id {} restored successfully", script_id);
        Ok(())
    }

    async fn push_config(
        &self,
        client: &mut ShellyClient,
        device: &DeviceInfo,
        source: &Path,
    ) -> VaultResult<()> {
        let data: Value = serde_json::from_str(&fs::read_to_string(source)?)?;
        let config = data.get("config").cloned().unwrap_or_else(|| Value::Object(Default::default()));

        tracing::info!("Restoring configuration from {}", source.display());
        client.set_config(&config).await?;
        tracing::info!("Configuration restored successfully for device {}", device.id);
        Ok(())
    }
}

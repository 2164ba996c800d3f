//! # Shellyvault Core
//!
//! Backup and restore logic for Shelly Gen2+ devices.
//!
//! ```text
//! shellyvault-core/src/
//! ├── digest.rs       # RFC 2617 digest authentication handler
//! ├── client.rs       # One-shot transport client for the /rpc/ surface
//! ├── coordinator.rs  # Probe/backup/restore orchestration + observable state
//! ├── snapshot.rs     # On-disk snapshot layout
//! ├── config.rs       # Resolved daemon configuration
//! └── error.rs        # Unified error type
//! ```
//!
//! One [`coordinator::BackupCoordinator`] instance serves exactly one
//! device; two devices mean two coordinators with independent snapshot
//! subdirectories.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod digest;
pub mod error;
pub mod snapshot;

pub use client::ShellyClient;
pub use config::VaultConfig;
pub use coordinator::BackupCoordinator;
pub use digest::DigestAuth;
pub use error::{VaultError, VaultResult};

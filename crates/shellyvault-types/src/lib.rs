//! # Shellyvault Types
//!
//! Core domain models for the Shellyvault ecosystem.
//!
//! This crate sits at the bottom of the dependency graph and provides:
//!
//! - **`models::device`** - Device identity and remote config snapshot models
//! - **`models::script`** - Script records as reported by the `Script.*` RPC surface
//! - **`models::state`** - The coordinator's observable state value object
//!
//! All types are designed to be:
//! - **Serializable** via serde (wire decoding and snapshot files)
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod models;

pub use models::{
    ConfigSnapshot, CoordinatorState, DeviceInfo, ScriptCode, ScriptInfo, ScriptList,
    ScriptMetadata,
};

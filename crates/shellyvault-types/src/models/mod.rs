//! Domain models shared across Shellyvault crates.

pub mod device;
pub mod script;
pub mod state;

pub use device::{ConfigSnapshot, DeviceInfo};
pub use script::{ScriptCode, ScriptInfo, ScriptList, ScriptMetadata};
pub use state::CoordinatorState;

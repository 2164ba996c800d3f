//! On-disk snapshot store.
//!
//! Layout, one directory per device id:
//!
//! ```text
//! {base_path}/{device_id}/{script_id}_{script_name}.js    raw script source, UTF-8
//! {base_path}/{device_id}/{script_id}_{script_name}.json  script metadata
//! {base_path}/{device_id}/device_config.json              full remote configuration
//! ```
//!
//! Files for a given script id are overwritten on every sweep; the store
//! never deletes anything, so snapshots of scripts since removed from the
//! device remain until an operator prunes them.

use crate::error::VaultResult;
use shellyvault_types::{ConfigSnapshot, ScriptInfo, ScriptMetadata};
use std::fs;
use std::path::PathBuf;

/// Extension for raw script source snapshots.
pub const SCRIPT_CODE_EXT: &str = "js";
/// Extension for script metadata snapshots.
pub const SCRIPT_META_EXT: &str = "json";
/// Per-device configuration snapshot filename.
pub const CONFIG_FILE_NAME: &str = "device_config.json";

/// Snapshot store rooted at a configured base path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    base_path: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `base_path`. Nothing is created on disk
    /// until the first successful sweep.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    /// Directory holding one device's snapshots.
    pub fn device_dir(&self, device_id: &str) -> PathBuf {
        self.base_path.join(device_id)
    }

    /// Create the device directory if it does not exist yet.
    pub fn ensure_device_dir(&self, device_id: &str) -> VaultResult<PathBuf> {
        let dir = self.device_dir(device_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write one script's source and metadata, overwriting any prior
    /// snapshot for the same id. Returns the code file path.
    pub fn write_script(
        &self,
        device_id: &str,
        script: &ScriptInfo,
        code: &str,
        metadata: &ScriptMetadata,
    ) -> VaultResult<PathBuf> {
        let dir = self.device_dir(device_id);
        let stem = script_stem(script);

        let code_path = dir.join(format!("{}.{}", stem, SCRIPT_CODE_EXT));
        fs::write(&code_path, code)?;

        let meta_path = dir.join(format!("{}.{}", stem, SCRIPT_META_EXT));
        fs::write(&meta_path, serde_json::to_string_pretty(metadata)?)?;

        Ok(code_path)
    }

    /// Write the device configuration snapshot.
    pub fn write_config(&self, device_id: &str, snapshot: &ConfigSnapshot) -> VaultResult<PathBuf> {
        let path = self.config_path(device_id);
        fs::write(&path, serde_json::to_string_pretty(snapshot)?)?;
        Ok(path)
    }

    /// Path of the device configuration snapshot.
    pub fn config_path(&self, device_id: &str) -> PathBuf {
        self.device_dir(device_id).join(CONFIG_FILE_NAME)
    }

    /// Locate the code snapshot for a script id.
    ///
    /// Filenames are `{id}_{name}.js` and names may collide, so several
    /// files can match one id; the lexically smallest filename wins to
    /// keep the lookup deterministic across platforms.
    pub fn find_script_code(&self, device_id: &str, script_id: u32) -> Option<PathBuf> {
        let dir = self.device_dir(device_id);
        let prefix = format!("{}_", script_id);

        let entries = fs::read_dir(&dir).ok()?;
        let mut matches: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().and_then(|ext| ext.to_str()) == Some(SCRIPT_CODE_EXT)
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(&prefix))
            })
            .collect();

        matches.sort();
        matches.into_iter().next()
    }
}

/// Filename stem for one script: `{id}_{sanitized name}`.
fn script_stem(script: &ScriptInfo) -> String {
    format!("{}_{}", script.id, sanitize_name(&script.file_name()))
}

/// Replace filesystem-hostile characters in a device-supplied script
/// name. Lookups are by id prefix, so this never affects restores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(id: u32, name: &str) -> ScriptInfo {
        ScriptInfo { id, name: Some(name.to_string()), enable: true }
    }

    fn metadata(script: &ScriptInfo) -> ScriptMetadata {
        ScriptMetadata {
            id: script.id,
            name: script.file_name(),
            enable: script.enable,
            device_id: "shellyplus1-test".to_string(),
            device_name: "bench".to_string(),
        }
    }

    #[test]
    fn test_write_script_produces_code_and_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        store.ensure_device_dir("shellyplus1-test").unwrap();

        let s = script(3, "heating");
        let path = store.write_script("shellyplus1-test", &s, "print(3);", &metadata(&s)).unwrap();

        assert!(path.ends_with("3_heating.js"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "print(3);");

        let meta_path = path.with_extension("json");
        let meta: ScriptMetadata =
            serde_json::from_str(&fs::read_to_string(meta_path).unwrap()).unwrap();
        assert_eq!(meta.id, 3);
        assert_eq!(meta.name, "heating");
    }

    #[test]
    fn test_find_script_code_prefers_lexically_smallest() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        let dir = store.ensure_device_dir("dev").unwrap();

        fs::write(dir.join("7_zeta.js"), "b").unwrap();
        fs::write(dir.join("7_alpha.js"), "a").unwrap();
        fs::write(dir.join("7_alpha.json"), "{}").unwrap();
        fs::write(dir.join("71_other.js"), "c").unwrap();

        let found = store.find_script_code("dev", 7).unwrap();
        assert!(found.ends_with("7_alpha.js"));
    }

    #[test]
    fn test_find_script_code_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        assert!(store.find_script_code("never-seen", 1).is_none());
    }

    #[test]
    fn test_sanitize_name_strips_path_separators() {
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("plain"), "plain");
    }
}

//! Saved device preferences.
//!
//! The store is a flat JSON object keyed by `<platform>_<simulator|device>`.
//! It is read once when loaded and written back in full on every change.
//! Keys this tool does not recognise are carried through untouched.
//!
//! There is no locking: two invocations saving at the same time race and
//! the last writer wins. Writes go through a sibling temp file and a rename,
//! so readers never see a half-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Result, StateError};
use crate::platform::{DeviceClass, Platform};

/// Default preference file name, relative to the working directory.
pub const DEFAULT_PREFERENCES_FILE: &str = "devices.json";

/// Durable `(platform, device class) -> device identifier` mapping.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

/// Preference key for a platform and device class, e.g. `ios_simulator`.
pub fn preference_key(platform: Platform, class: DeviceClass) -> String {
    format!("{}_{}", platform.key(), class.key())
}

impl PreferenceStore {
    /// Load preferences from `path`.
    ///
    /// A missing file is an empty store. An unreadable or malformed file is
    /// logged and also treated as empty; the next save replaces it.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Could not load {}: {}", path.display(), e);
                Map::new()
            }
        };
        Self { path, entries }
    }

    fn read_entries(path: &Path) -> Result<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }

        let contents = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| StateError::Corrupted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        match value {
            Value::Object(entries) => Ok(entries),
            other => Err(StateError::Corrupted {
                path: path.to_path_buf(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }
            .into()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved identifier for the pair, if any
    pub fn get(&self, platform: Platform, class: DeviceClass) -> Option<&str> {
        self.entries
            .get(&preference_key(platform, class))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Record `identifier` for the pair and write the whole store to disk.
    pub fn set(&mut self, platform: Platform, class: DeviceClass, identifier: &str) -> Result<()> {
        self.entries.insert(
            preference_key(platform, class),
            Value::String(identifier.to_string()),
        );
        self.save()
    }

    /// Number of stored keys, including ones this tool does not use
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every entry to the backing file.
    pub fn save(&self) -> Result<()> {
        let save_failed = |reason: String| StateError::SaveFailed {
            path: self.path.clone(),
            reason,
        };

        let serialized = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| save_failed(format!("Failed to serialize preferences: {e}")))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| save_failed(format!("Failed to create directory: {e}")))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)
                .map_err(|e| save_failed(format!("Failed to create temp file: {e}")))?;
            file.write_all(serialized.as_bytes())
                .and_then(|_| file.write_all(b"\n"))
                .map_err(|e| save_failed(format!("Failed to write preferences: {e}")))?;
            file.sync_all()
                .map_err(|e| save_failed(format!("Failed to sync file: {e}")))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| save_failed(format!("Failed to rename temp file: {e}")))?;

        log::debug!("Saved device preferences to {}", self.path.display());
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn keys_follow_platform_and_class() {
        assert_eq!(preference_key(Platform::Ios, DeviceClass::Simulator), "ios_simulator");
        assert_eq!(preference_key(Platform::Tvos, DeviceClass::Physical), "tvos_device");
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = TempDir::new().expect("temp dir");
        let store = PreferenceStore::load(dir.path().join("devices.json"));
        assert!(store.is_empty());
        assert_eq!(store.get(Platform::Ios, DeviceClass::Simulator), None);
    }

    #[test]
    fn saved_preference_survives_reload() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("devices.json");

        let mut store = PreferenceStore::load(&path);
        store
            .set(Platform::Ios, DeviceClass::Simulator, "A1B2-C3")
            .expect("save");

        let reloaded = PreferenceStore::load(&path);
        assert_eq!(reloaded.get(Platform::Ios, DeviceClass::Simulator), Some("A1B2-C3"));
        assert_eq!(reloaded.get(Platform::Ios, DeviceClass::Physical), None);
        assert!(!dir.path().join("devices.json.tmp").exists());
    }

    #[test]
    fn unknown_keys_are_preserved_on_save() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("devices.json");
        fs::write(
            &path,
            r#"{"watchos_simulator": "W-1", "notes": {"owner": "ci"}, "ios_device": "OLD"}"#,
        )
        .expect("seed");

        let mut store = PreferenceStore::load(&path);
        store
            .set(Platform::Ios, DeviceClass::Physical, "NEW")
            .expect("save");

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(raw["watchos_simulator"], "W-1");
        assert_eq!(raw["notes"]["owner"], "ci");
        assert_eq!(raw["ios_device"], "NEW");
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("devices.json");
        fs::write(&path, "[1, 2, 3]").expect("seed");

        assert!(PreferenceStore::load(&path).is_empty());
        let err = PreferenceStore::read_entries(&path).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }

    #[test]
    fn non_string_values_are_not_identifiers() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("devices.json");
        fs::write(&path, r#"{"ios_simulator": 42, "tvos_simulator": ""}"#).expect("seed");

        let store = PreferenceStore::load(&path);
        assert_eq!(store.get(Platform::Ios, DeviceClass::Simulator), None);
        assert_eq!(store.get(Platform::Tvos, DeviceClass::Simulator), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn save_writes_two_space_indented_json() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("devices.json");
        let mut store = PreferenceStore::load(&path);
        store
            .set(Platform::Tvos, DeviceClass::Simulator, "T-1")
            .expect("save");
        let raw = fs::read_to_string(&path).expect("read");
        assert_eq!(raw, "{\n  \"tvos_simulator\": \"T-1\"\n}\n");
    }
}

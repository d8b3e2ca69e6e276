//! Durable storage for the single persisted document.
//!
//! The document lives under one key of a key-value backend. Loading never
//! fails: a missing key yields defaults and malformed fields are logged and
//! replaced by their defaults. Saving merges the present fields of a
//! `StatePatch` into whatever is stored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{self, create_dir_all};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{CookifyError, Result};
use crate::filter::ProjectFilter;
use crate::profile::{CookieProfile, SwaggerProfile};

pub const STORAGE_KEY: &str = "cookify";
pub const LEGACY_STORAGE_KEY: &str = "kurabiye";
pub const DOCUMENT_NAME: &str = "cookify";
pub const DOCUMENT_VERSION: u32 = 1;

/// Raw string storage addressed by key.
pub trait KeyValueStore: Send + Sync {
  fn read(&self, key: &str) -> Result<Option<String>>;
  fn write(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
  fn read(&self, key: &str) -> Result<Option<String>> {
    (**self).read(key)
  }

  fn write(&self, key: &str, value: &str) -> Result<()> {
    (**self).write(key, value)
  }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
  dir: PathBuf,
}

impl FileStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{key}.json"))
  }
}

impl KeyValueStore for FileStore {
  fn read(&self, key: &str) -> Result<Option<String>> {
    let path = self.path_for(key);
    if !path.exists() {
      return Ok(None);
    }
    let content = fs::read_to_string(&path)
      .map_err(|e| CookifyError::Storage(format!("Failed to read {}: {e}", path.display())))?;
    Ok(Some(content))
  }

  fn write(&self, key: &str, value: &str) -> Result<()> {
    create_dir_all(&self.dir)
      .map_err(|e| CookifyError::Storage(format!("Failed to create storage directory: {e}")))?;

    let path = self.path_for(key);
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, value)
      .map_err(|e| CookifyError::Storage(format!("Failed to write storage file: {e}")))?;
    fs::rename(&tmp_path, &path)
      .map_err(|e| CookifyError::Storage(format!("Failed to replace storage file: {e}")))?;
    Ok(())
  }
}

/// In-memory backend. `set_fail_writes` simulates an unavailable disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
  fail_writes: Mutex<bool>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_entry(key: &str, value: impl Into<String>) -> Self {
    let store = Self::default();
    if let Ok(mut entries) = store.entries.lock() {
      entries.insert(key.to_string(), value.into());
    }
    store
  }

  pub fn set_fail_writes(&self, fail: bool) {
    if let Ok(mut flag) = self.fail_writes.lock() {
      *flag = fail;
    }
  }
}

impl KeyValueStore for MemoryStore {
  fn read(&self, key: &str) -> Result<Option<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| CookifyError::Storage(e.to_string()))?;
    Ok(entries.get(key).cloned())
  }

  fn write(&self, key: &str, value: &str) -> Result<()> {
    if self.fail_writes.lock().map(|flag| *flag).unwrap_or(false) {
      return Err(CookifyError::Storage("Storage is unavailable".to_string()));
    }
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| CookifyError::Storage(e.to_string()))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
  #[serde(default)]
  pub apply_on_click: bool,
  #[serde(default)]
  pub projects: Vec<String>,
}

/// Project selected on each list when the state was last saved.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SelectedProjects {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cookies: Option<ProjectFilter>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub swaggers: Option<ProjectFilter>,
}

/// Everything `load` recovers from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
  pub cookies: Vec<CookieProfile>,
  pub swaggers: Vec<SwaggerProfile>,
  pub settings: Settings,
  pub selected_projects: SelectedProjects,
  /// Read from the legacy key; the caller should write the full state back.
  pub from_legacy: bool,
}

/// Fields to merge into the stored document. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
  pub cookies: Option<Vec<CookieProfile>>,
  pub swaggers: Option<Vec<SwaggerProfile>>,
  pub settings: Option<Settings>,
  pub selected_projects: Option<SelectedProjects>,
}

impl StatePatch {
  pub fn cookies(mut self, cookies: Vec<CookieProfile>) -> Self {
    self.cookies = Some(cookies);
    self
  }

  pub fn swaggers(mut self, swaggers: Vec<SwaggerProfile>) -> Self {
    self.swaggers = Some(swaggers);
    self
  }

  pub fn settings(mut self, settings: Settings) -> Self {
    self.settings = Some(settings);
    self
  }

  pub fn selected_projects(mut self, selected: SelectedProjects) -> Self {
    self.selected_projects = Some(selected);
    self
  }
}

pub struct StorageAdapter {
  backend: Box<dyn KeyValueStore>,
}

impl StorageAdapter {
  pub fn new(backend: impl KeyValueStore + 'static) -> Self {
    Self {
      backend: Box::new(backend),
    }
  }

  pub fn load(&self) -> PersistedState {
    let (document, from_legacy) = match self.read_document(STORAGE_KEY) {
      Some(document) => (document, false),
      None => match self.read_document(LEGACY_STORAGE_KEY) {
        Some(document) => {
          log::info!("Migrating profiles from legacy storage key '{LEGACY_STORAGE_KEY}'");
          (document, true)
        }
        None => return PersistedState::default(),
      },
    };

    PersistedState {
      cookies: field_or_default(&document, "cookies"),
      swaggers: field_or_default(&document, "swaggers"),
      settings: field_or_default(&document, "settings"),
      selected_projects: field_or_default(&document, "selectedProjects"),
      from_legacy,
    }
  }

  /// Merge `patch` into the stored document and write it back.
  pub fn save(&self, patch: &StatePatch) -> Result<()> {
    let mut document = self.read_document(STORAGE_KEY).unwrap_or_default();

    document.insert("name".to_string(), Value::from(DOCUMENT_NAME));
    document.insert("version".to_string(), Value::from(DOCUMENT_VERSION));
    merge_field(&mut document, "cookies", patch.cookies.as_ref())?;
    merge_field(&mut document, "swaggers", patch.swaggers.as_ref())?;
    merge_field(&mut document, "settings", patch.settings.as_ref())?;
    merge_field(&mut document, "selectedProjects", patch.selected_projects.as_ref())?;

    let json = serde_json::to_string_pretty(&Value::Object(document))
      .map_err(|e| CookifyError::Storage(format!("Failed to serialize state: {e}")))?;
    self.backend.write(STORAGE_KEY, &json)
  }

  /// The stored object under `key`, or `None` when absent or unusable.
  fn read_document(&self, key: &str) -> Option<Map<String, Value>> {
    let content = match self.backend.read(key) {
      Ok(Some(content)) => content,
      Ok(None) => return None,
      Err(e) => {
        log::warn!("Failed to read stored state, using defaults: {e}");
        return None;
      }
    };

    match serde_json::from_str::<Value>(&content) {
      Ok(Value::Object(document)) => Some(document),
      Ok(other) => {
        log::warn!("Stored state under '{key}' is not an object ({other}), using defaults");
        None
      }
      Err(e) => {
        log::warn!("Failed to parse stored state under '{key}', using defaults: {e}");
        None
      }
    }
  }
}

fn field_or_default<T>(document: &Map<String, Value>, field: &str) -> T
where
  T: serde::de::DeserializeOwned + Default,
{
  let Some(value) = document.get(field) else {
    return T::default();
  };
  match serde_json::from_value(value.clone()) {
    Ok(parsed) => parsed,
    Err(e) => {
      log::warn!("Ignoring malformed stored field '{field}': {e}");
      T::default()
    }
  }
}

fn merge_field<T: Serialize>(
  document: &mut Map<String, Value>,
  field: &str,
  value: Option<&T>,
) -> Result<()> {
  if let Some(value) = value {
    let value = serde_json::to_value(value)
      .map_err(|e| CookifyError::Storage(format!("Failed to serialize {field}: {e}")))?;
    document.insert(field.to_string(), value);
  }
  Ok(())
}

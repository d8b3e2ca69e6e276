use directories::BaseDirs;
use std::path::PathBuf;

use crate::error::{CookifyError, Result};

pub const DATA_DIR_ENV: &str = "COOKIFY_DATA_DIR";

pub fn app_name() -> &'static str {
  if cfg!(debug_assertions) {
    "CookifyDev"
  } else {
    "Cookify"
  }
}

/// Directory holding the persisted document. Fails only when no home
/// directory can be determined and no override is set.
pub fn data_dir() -> Result<PathBuf> {
  if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
    if !dir.trim().is_empty() {
      return Ok(PathBuf::from(dir));
    }
  }

  BaseDirs::new()
    .map(|dirs| dirs.data_local_dir().join(app_name()))
    .ok_or_else(|| CookifyError::Storage("Failed to get base directories".to_string()))
}

/// Default location for exports written without an explicit path.
pub fn exports_dir() -> Result<PathBuf> {
  Ok(data_dir()?.join("exports"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn test_app_name() {
    let name = app_name();
    assert!(
      name == "Cookify" || name == "CookifyDev",
      "app_name should be Cookify or CookifyDev, got: {name}"
    );
  }

  #[test]
  #[serial]
  fn test_data_dir_defaults_under_app_name() {
    std::env::remove_var(DATA_DIR_ENV);
    let dir = data_dir().unwrap();
    assert!(
      dir.to_string_lossy().contains(app_name()),
      "data_dir should contain app_name"
    );
    assert!(exports_dir().unwrap().ends_with("exports"));
  }

  #[test]
  #[serial]
  fn test_blank_env_override_is_ignored() {
    std::env::set_var(DATA_DIR_ENV, "  ");
    let dir = data_dir().unwrap();
    std::env::remove_var(DATA_DIR_ENV);
    assert!(dir.ends_with(app_name()));
  }

  #[test]
  #[serial]
  fn test_env_override() {
    std::env::set_var(DATA_DIR_ENV, "/tmp/cookify-env-dir");
    let dir = data_dir().unwrap();
    std::env::remove_var(DATA_DIR_ENV);
    assert_eq!(dir, PathBuf::from("/tmp/cookify-env-dir"));
  }
}

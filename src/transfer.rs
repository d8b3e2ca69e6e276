//! Portable import/export document.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CookifyError, Result};
use crate::profile::{CookieProfile, SwaggerProfile};
use crate::storage::{Settings, DOCUMENT_NAME, DOCUMENT_VERSION};

pub const EXPORT_FILE_NAME: &str = "cookify-export.json";
pub const LEGACY_EXPORT_FILE_NAME: &str = "kurabiye_export.json";

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ExportDocument<'a> {
  pub name: &'static str,
  pub version: u32,
  pub cookies: &'a [CookieProfile],
  pub swaggers: &'a [SwaggerProfile],
  pub settings: &'a Settings,
}

/// Top-level fields found in an imported document. Absent fields stay
/// `None` and must leave the current state untouched.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ImportedState {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub version: Option<u32>,
  #[serde(default)]
  pub cookies: Option<Vec<CookieProfile>>,
  #[serde(default)]
  pub swaggers: Option<Vec<SwaggerProfile>>,
  #[serde(default)]
  pub settings: Option<Settings>,
}

impl ImportedState {
  pub fn is_empty(&self) -> bool {
    self.cookies.is_none() && self.swaggers.is_none() && self.settings.is_none()
  }
}

pub fn export_document(
  cookies: &[CookieProfile],
  swaggers: &[SwaggerProfile],
  settings: &Settings,
) -> Result<String> {
  let document = ExportDocument {
    name: DOCUMENT_NAME,
    version: DOCUMENT_VERSION,
    cookies,
    swaggers,
    settings,
  };
  serde_json::to_string_pretty(&document)
    .map_err(|e| CookifyError::Parse(format!("Failed to serialize export: {e}")))
}

pub fn import_document(json: &str) -> Result<ImportedState> {
  let imported: ImportedState =
    serde_json::from_str(json).map_err(|e| CookifyError::Parse(format!("Invalid import file: {e}")))?;

  if let Some(version) = imported.version.filter(|v| *v > DOCUMENT_VERSION) {
    log::warn!("Importing document version {version}, newer than {DOCUMENT_VERSION}");
  }
  Ok(imported)
}

/// Whether `path` carries the `.json` extension exports are written with.
pub fn is_json_file(path: &Path) -> bool {
  path
    .extension()
    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// The export to import when no file is named: the current export name
/// first, then the legacy one.
pub fn find_export(dir: &Path) -> Option<PathBuf> {
  [EXPORT_FILE_NAME, LEGACY_EXPORT_FILE_NAME]
    .iter()
    .map(|name| dir.join(name))
    .find(|path| path.is_file())
}

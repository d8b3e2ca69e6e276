//! Error types shared across the crate.

use thiserror::Error;

use crate::profile::ProfileKind;

/// Which required field a submitted profile is missing, or why it clashes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
  #[error("Alias is required")]
  EmptyAlias,
  #[error("Cookie name is required")]
  EmptyCookieName,
  #[error("Cookie value is required")]
  EmptyCookieValue,
  #[error("Bearer token is required")]
  EmptyBearerToken,
  #[error("Alias '{0}' is already in use")]
  DuplicateAlias(String),
}

/// Failures reported by the page-context collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyFailure {
  #[error("No active tab found!")]
  NoActiveTab,
  #[error("Failed to set cookie '{name}' on {domain}")]
  CookieRejected { name: String, domain: String },
  #[error("Failed to remove cookie '{name}'")]
  CookieRemoveFailed { name: String },
  #[error("No Swagger Docs Page found!")]
  NotSwaggerPage,
  #[error("Page error: {0}")]
  Page(String),
}

#[derive(Error, Debug)]
pub enum CookifyError {
  #[error("Validation failed: {0}")]
  Validation(#[from] ValidationIssue),
  #[error("{kind} profile '{alias}' not found")]
  NotFound { kind: ProfileKind, alias: String },
  #[error("Storage error: {0}")]
  Storage(String),
  #[error("Parse error: {0}")]
  Parse(String),
  #[error("Apply error: {0}")]
  Apply(#[from] ApplyFailure),
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

impl CookifyError {
  pub fn not_found(kind: ProfileKind, alias: impl Into<String>) -> Self {
    CookifyError::NotFound {
      kind,
      alias: alias.into(),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, CookifyError::NotFound { .. })
  }
}

pub type Result<T> = std::result::Result<T, CookifyError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validation_message_names_field() {
    let err = CookifyError::from(ValidationIssue::EmptyCookieName);
    assert_eq!(err.to_string(), "Validation failed: Cookie name is required");
  }

  #[test]
  fn test_field_errors_are_error_sources() {
    use std::error::Error as _;

    let issue = ValidationIssue::DuplicateAlias("Admin".to_string());
    assert_eq!(issue.to_string(), "Alias 'Admin' is already in use");
    let err = CookifyError::from(issue.clone());
    assert_eq!(err.source().map(|e| e.to_string()), Some(issue.to_string()));

    let failure = ApplyFailure::CookieRejected {
      name: "session".to_string(),
      domain: "example.com".to_string(),
    };
    assert_eq!(failure.to_string(), "Failed to set cookie 'session' on example.com");
    let err = CookifyError::from(failure);
    assert_eq!(
      err.to_string(),
      "Apply error: Failed to set cookie 'session' on example.com"
    );
    assert!(err.source().is_some());
  }

  #[test]
  fn test_not_found_message() {
    let err = CookifyError::not_found(ProfileKind::Swagger, "staging");
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "swagger profile 'staging' not found");
  }

  #[test]
  fn test_io_error_converts() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: CookifyError = io.into();
    assert!(matches!(err, CookifyError::Io(_)));
  }
}

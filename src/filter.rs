//! Visible-subset computation for the profile lists.
//!
//! Everything here is a pure function of (items, search term, active
//! project) so the presentation layer can recompute freely.

use serde::{Deserialize, Serialize};

use crate::profile::Entity;

/// Project selector label for profiles without a project.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Active project selection on a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectFilter {
  /// Profiles with an empty or absent project.
  Unassigned,
  Named(String),
}

impl ProjectFilter {
  pub fn parse(value: &str) -> Self {
    let value = value.trim();
    if value == NOT_SPECIFIED {
      ProjectFilter::Unassigned
    } else {
      ProjectFilter::Named(value.to_string())
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      ProjectFilter::Unassigned => NOT_SPECIFIED,
      ProjectFilter::Named(name) => name,
    }
  }

  pub fn matches<T: Entity>(&self, item: &T) -> bool {
    match self {
      ProjectFilter::Unassigned => item.project().is_none(),
      ProjectFilter::Named(name) => item.project() == Some(name.as_str()),
    }
  }

  pub fn is_named(&self, project: &str) -> bool {
    matches!(self, ProjectFilter::Named(name) if name == project)
  }
}

impl From<String> for ProjectFilter {
  fn from(value: String) -> Self {
    ProjectFilter::parse(&value)
  }
}

impl From<ProjectFilter> for String {
  fn from(filter: ProjectFilter) -> Self {
    filter.as_str().to_string()
  }
}

impl std::fmt::Display for ProjectFilter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Search term plus optional project selection for one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
  pub search: String,
  pub project: Option<ProjectFilter>,
}

impl FilterQuery {
  pub fn new(search: impl Into<String>, project: Option<ProjectFilter>) -> Self {
    Self {
      search: search.into(),
      project,
    }
  }

  pub fn is_active(&self) -> bool {
    !self.search.trim().is_empty() || self.project.is_some()
  }

  /// Human-readable summary of an active query, `None` when it keeps
  /// everything.
  pub fn summary(&self) -> Option<String> {
    if !self.is_active() {
      return None;
    }
    let mut parts = Vec::new();
    if !self.search.trim().is_empty() {
      parts.push(format!("search \"{}\"", self.search.trim()));
    }
    if let Some(project) = &self.project {
      parts.push(format!("project \"{project}\""));
    }
    Some(parts.join(", "))
  }

  pub fn matches<T: Entity>(&self, item: &T) -> bool {
    matches_search(item, &self.search)
      && self.project.as_ref().map_or(true, |p| p.matches(item))
  }

  pub fn apply<T: Entity>(&self, items: &[T]) -> Vec<T> {
    items.iter().filter(|item| self.matches(*item)).cloned().collect()
  }
}

fn matches_search<T: Entity>(item: &T, search: &str) -> bool {
  let needle = search.trim().to_lowercase();
  if needle.is_empty() {
    return true;
  }

  let contains = |field: &str| field.to_lowercase().contains(&needle);
  contains(item.alias())
    || item.project().is_some_and(contains)
    || item.extra_search_fields().into_iter().any(contains)
}

/// Keep items matching the search term AND the project selection, in their
/// original relative order.
pub fn filter<T: Entity>(items: &[T], search: &str, project: Option<&ProjectFilter>) -> Vec<T> {
  FilterQuery::new(search, project.cloned()).apply(items)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::profile::{CookieProfile, SwaggerProfile};

  fn cookies() -> Vec<CookieProfile> {
    vec![
      CookieProfile::new("Admin", "session", "a1").with_project("Shop"),
      CookieProfile {
        domain: Some("api.example.com".to_string()),
        ..CookieProfile::new("Viewer", "token", "v1")
      },
      CookieProfile::new("Tester", "jwt", "t1").with_project("Billing"),
    ]
  }

  fn aliases<T: Entity>(items: &[T]) -> Vec<&str> {
    items.iter().map(|i| i.alias()).collect()
  }

  #[test]
  fn test_empty_query_keeps_everything() {
    let items = cookies();
    assert_eq!(filter(&items, "", None), items);
  }

  #[test]
  fn test_search_is_case_insensitive_on_alias_project_and_cookie_fields() {
    let items = cookies();
    assert_eq!(aliases(&filter(&items, "ADMIN", None)), vec!["Admin"]);
    assert_eq!(aliases(&filter(&items, "bill", None)), vec!["Tester"]);
    assert_eq!(aliases(&filter(&items, "JWT", None)), vec!["Tester"]);
    assert_eq!(aliases(&filter(&items, "example.com", None)), vec!["Viewer"]);
  }

  #[test]
  fn test_swagger_search_ignores_token() {
    let items = vec![SwaggerProfile::new("dev", "secret-token").with_project("Shop")];
    assert!(filter(&items, "secret", None).is_empty());
    assert_eq!(filter(&items, "shop", None).len(), 1);
  }

  #[test]
  fn test_not_specified_keeps_unassigned_only() {
    let items = cookies();
    let unassigned = filter(&items, "", Some(&ProjectFilter::Unassigned));
    assert_eq!(aliases(&unassigned), vec!["Viewer"]);
  }

  #[test]
  fn test_named_project_and_search_compose() {
    let items = cookies();
    let shop = ProjectFilter::Named("Shop".to_string());
    assert_eq!(aliases(&filter(&items, "", Some(&shop))), vec!["Admin"]);
    assert!(filter(&items, "viewer", Some(&shop)).is_empty());
  }

  #[test]
  fn test_filter_composes_with_itself() {
    let items = cookies();
    let terms = ["", "t", "admin", "zzz"];
    let projects = [
      None,
      Some(ProjectFilter::Unassigned),
      Some(ProjectFilter::Named("Shop".to_string())),
      Some(ProjectFilter::Named("Billing".to_string())),
    ];
    for term in terms {
      for project in &projects {
        let staged = filter(&filter(&items, term, None), "", project.as_ref());
        assert_eq!(staged, filter(&items, term, project.as_ref()), "term={term:?}");
      }
    }
  }

  #[test]
  fn test_padded_project_tag_matches_trimmed_filter() {
    let items = vec![CookieProfile::new("A", "token", "abc").with_project(" P1 ")];
    assert_eq!(filter(&items, "", Some(&ProjectFilter::parse("P1"))).len(), 1);
    assert_eq!(filter(&items, "", Some(&ProjectFilter::parse(" P1"))).len(), 1);
    assert!(filter(&items, "", Some(&ProjectFilter::Unassigned)).is_empty());
  }

  #[test]
  fn test_query_is_active_and_apply_matches_filter() {
    let items = cookies();
    assert!(!FilterQuery::new("  ", None).is_active());

    let query = FilterQuery::new("t", Some(ProjectFilter::Named("Billing".to_string())));
    assert!(query.is_active());
    assert_eq!(aliases(&query.apply(&items)), vec!["Tester"]);
    assert_eq!(query.apply(&items), filter(&items, "t", query.project.as_ref()));
  }

  #[test]
  fn test_query_summary() {
    assert_eq!(FilterQuery::default().summary(), None);
    assert_eq!(
      FilterQuery::new("", Some(ProjectFilter::Unassigned)).summary().as_deref(),
      Some("project \"Not specified\"")
    );
    assert_eq!(
      FilterQuery::new(" adm ", Some(ProjectFilter::parse("Shop"))).summary().as_deref(),
      Some("search \"adm\", project \"Shop\"")
    );
  }

  #[test]
  fn test_scenario_single_project_cookie() {
    let items = vec![CookieProfile::new("A", "token", "abc").with_project("P1")];
    let p1 = ProjectFilter::parse("P1");
    assert_eq!(filter(&items, "", Some(&p1)).len(), 1);
    assert!(filter(&items, "", Some(&ProjectFilter::parse(NOT_SPECIFIED))).is_empty());
  }

  #[test]
  fn test_project_filter_serializes_as_label() {
    let json = serde_json::to_string(&ProjectFilter::Unassigned).unwrap();
    assert_eq!(json, "\"Not specified\"");
    let back: ProjectFilter = serde_json::from_str("\"Shop\"").unwrap();
    assert_eq!(back, ProjectFilter::Named("Shop".to_string()));
  }
}

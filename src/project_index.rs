use crate::store::EntityStore;

/// Registry of project tags. Explicitly registered names come first, in
/// registration order; tags discovered on profiles are appended as they
/// are first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectIndex {
  projects: Vec<String>,
}

impl ProjectIndex {
  pub fn new(projects: Vec<String>) -> Self {
    let mut index = Self::default();
    for project in projects {
      index.add_project(&project);
    }
    index
  }

  /// Registered names only, without consulting live profiles.
  pub fn registered(&self) -> &[String] {
    &self.projects
  }

  pub fn contains(&self, name: &str) -> bool {
    self.projects.iter().any(|p| p == name)
  }

  /// Register a tag. Returns false for blank or already-known names.
  pub fn add_project(&mut self, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() || self.contains(name) {
      return false;
    }
    self.projects.push(name.to_string());
    true
  }

  /// Append every tag in use on a profile that is not registered yet.
  /// Returns the newly registered names.
  pub fn reconcile(&mut self, store: &EntityStore) -> Vec<String> {
    let mut added = Vec::new();
    for project in store.projects_in_use() {
      if self.add_project(project) {
        added.push(project.trim().to_string());
      }
    }
    if !added.is_empty() {
      log::debug!("Registered projects discovered on profiles: {added:?}");
    }
    added
  }

  /// Registered names plus every tag in use, deduplicated and order-stable.
  pub fn all_projects(&self, store: &EntityStore) -> Vec<String> {
    let mut all = self.projects.clone();
    for project in store.projects_in_use() {
      let project = project.trim();
      if !all.iter().any(|p| p == project) {
        all.push(project.to_string());
      }
    }
    all
  }

  /// Drop the tag from the registry and detach it from every profile in
  /// both collections. Returns how many profiles were detached.
  pub fn delete_project(&mut self, name: &str, store: &mut EntityStore) -> usize {
    let name = name.trim();
    self.projects.retain(|p| p != name);
    let detached = store.detach_project(name);
    log::info!("Deleted project '{name}', detached from {detached} profile(s)");
    detached
  }
}

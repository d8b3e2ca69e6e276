//! In-memory entity store for the two profile collections.
//!
//! The store itself never touches durable storage; `Cookify` persists after
//! every successful mutation.

use std::cmp::Ordering;

use crate::error::{CookifyError, Result, ValidationIssue};
use crate::filter::FilterQuery;
use crate::profile::{CookieProfile, Entity, Profile, ProfileKind, SwaggerProfile};

/// Stable ascending sort by `order`; entries without an order go last and
/// keep their relative position.
pub fn sort_by_order<T: Entity>(items: &[T]) -> Vec<T> {
  let mut sorted = items.to_vec();
  sorted.sort_by(|a, b| match (a.order(), b.order()) {
    (Some(x), Some(y)) => x.cmp(&y),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  });
  sorted
}

/// Move `from` to `to` inside `visible` and renumber the whole slice 0..N-1.
/// Returns `None` when either index is out of range.
pub fn reorder_slice<T: Entity>(mut visible: Vec<T>, from: usize, to: usize) -> Option<Vec<T>> {
  if from >= visible.len() || to >= visible.len() {
    return None;
  }
  let moved = visible.remove(from);
  visible.insert(to, moved);
  for (index, item) in visible.iter_mut().enumerate() {
    item.set_order(Some(index as i64));
  }
  Some(visible)
}

/// Store the project tag trimmed, or drop it when blank.
fn normalized<T: Entity>(mut item: T) -> T {
  let project = item.project().map(str::to_string);
  item.set_project(project);
  item
}

/// An ordered collection of one profile kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection<T: Entity> {
  items: Vec<T>,
}

impl<T: Entity> Default for Collection<T> {
  fn default() -> Self {
    Self { items: Vec::new() }
  }
}

impl<T: Entity> Collection<T> {
  pub fn new(items: Vec<T>) -> Self {
    Self {
      items: items.into_iter().map(normalized).collect(),
    }
  }

  pub fn items(&self) -> &[T] {
    &self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn get(&self, alias: &str) -> Option<&T> {
    self.items.iter().find(|item| item.alias() == alias)
  }

  pub fn contains(&self, alias: &str) -> bool {
    self.get(alias).is_some()
  }

  /// Rendered sequence: filtered by `query`, then sorted by `order`.
  pub fn visible(&self, query: &FilterQuery) -> Vec<T> {
    sort_by_order(&query.apply(&self.items))
  }

  pub fn add(&mut self, item: T) -> Result<()> {
    item.validate()?;
    if self.contains(item.alias()) {
      return Err(ValidationIssue::DuplicateAlias(item.alias().to_string()).into());
    }
    log::debug!("Adding {} profile '{}'", T::KIND, item.alias());
    self.items.push(normalized(item));
    Ok(())
  }

  /// Replace the entry whose alias is `identity`, keeping its position. An
  /// incoming profile without an order inherits the replaced entry's order.
  pub fn update(&mut self, identity: &str, mut item: T) -> Result<()> {
    item.validate()?;
    let position = self
      .items
      .iter()
      .position(|existing| existing.alias() == identity)
      .ok_or_else(|| CookifyError::not_found(T::KIND, identity))?;

    let clashes = self
      .items
      .iter()
      .enumerate()
      .any(|(i, existing)| i != position && existing.alias() == item.alias());
    if clashes {
      return Err(ValidationIssue::DuplicateAlias(item.alias().to_string()).into());
    }

    if item.order().is_none() {
      item.set_order(self.items[position].order());
    }
    log::debug!("Updating {} profile '{identity}'", T::KIND);
    self.items[position] = normalized(item);
    Ok(())
  }

  /// Remove by alias. Returns whether anything was removed.
  pub fn remove(&mut self, alias: &str) -> bool {
    let before = self.items.len();
    self.items.retain(|item| item.alias() != alias);
    before != self.items.len()
  }

  /// Reorder within the sequence visible under `query`, then merge the new
  /// order values back into the full collection by alias. Entries outside
  /// the visible subset keep their previous order.
  pub fn reorder(&mut self, query: &FilterQuery, from: usize, to: usize) -> bool {
    let Some(reordered) = reorder_slice(self.visible(query), from, to) else {
      log::debug!("Ignoring {} reorder {from} -> {to}: index out of range", T::KIND);
      return false;
    };

    let mut merged = vec![false; self.items.len()];
    for item in reordered {
      let target = self
        .items
        .iter()
        .enumerate()
        .position(|(i, existing)| !merged[i] && existing.alias() == item.alias());
      if let Some(index) = target {
        self.items[index].set_order(item.order());
        merged[index] = true;
      }
    }
    true
  }

  /// Clear `project` on every entry carrying it. Returns how many changed.
  pub fn detach_project(&mut self, project: &str) -> usize {
    let project = project.trim();
    let mut detached = 0;
    for item in self.items.iter_mut() {
      if item.project() == Some(project) {
        item.set_project(None);
        detached += 1;
      }
    }
    detached
  }

  pub fn projects(&self) -> impl Iterator<Item = &str> {
    self.items.iter().filter_map(|item| item.project())
  }

  pub fn replace_all(&mut self, items: Vec<T>) {
    self.items = items.into_iter().map(normalized).collect();
  }
}

/// Both profile collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStore {
  pub cookies: Collection<CookieProfile>,
  pub swaggers: Collection<SwaggerProfile>,
}

impl EntityStore {
  pub fn new(cookies: Vec<CookieProfile>, swaggers: Vec<SwaggerProfile>) -> Self {
    Self {
      cookies: Collection::new(cookies),
      swaggers: Collection::new(swaggers),
    }
  }

  pub fn add(&mut self, profile: Profile) -> Result<()> {
    match profile {
      Profile::Cookie(cookie) => self.cookies.add(cookie),
      Profile::Swagger(swagger) => self.swaggers.add(swagger),
    }
  }

  /// Replace the profile of the same kind whose alias is `identity`.
  pub fn update(&mut self, identity: &str, profile: Profile) -> Result<()> {
    match profile {
      Profile::Cookie(cookie) => self.cookies.update(identity, cookie),
      Profile::Swagger(swagger) => self.swaggers.update(identity, swagger),
    }
  }

  pub fn remove(&mut self, kind: ProfileKind, alias: &str) -> bool {
    match kind {
      ProfileKind::Cookie => self.cookies.remove(alias),
      ProfileKind::Swagger => self.swaggers.remove(alias),
    }
  }

  pub fn reorder(&mut self, kind: ProfileKind, query: &FilterQuery, from: usize, to: usize) -> bool {
    match kind {
      ProfileKind::Cookie => self.cookies.reorder(query, from, to),
      ProfileKind::Swagger => self.swaggers.reorder(query, from, to),
    }
  }

  pub fn get(&self, kind: ProfileKind, alias: &str) -> Option<Profile> {
    match kind {
      ProfileKind::Cookie => self.cookies.get(alias).cloned().map(Profile::Cookie),
      ProfileKind::Swagger => self.swaggers.get(alias).cloned().map(Profile::Swagger),
    }
  }

  pub fn contains(&self, kind: ProfileKind, alias: &str) -> bool {
    match kind {
      ProfileKind::Cookie => self.cookies.contains(alias),
      ProfileKind::Swagger => self.swaggers.contains(alias),
    }
  }

  /// Non-empty project tags in scan order: cookies first, then swaggers.
  pub fn projects_in_use(&self) -> impl Iterator<Item = &str> {
    self.cookies.projects().chain(self.swaggers.projects())
  }

  pub fn detach_project(&mut self, project: &str) -> usize {
    self.cookies.detach_project(project) + self.swaggers.detach_project(project)
  }
}

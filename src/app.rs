//! The `Cookify` state container.
//!
//! Owns the entity store, project index, navigation state and per-list
//! filters, persists after every mutation and turns storage and apply
//! failures into notices. Built once at the composition root and passed by
//! reference; there is no global instance.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::apply::{self, PageContext};
use crate::error::{CookifyError, Result};
use crate::events::{emit, emit_notice, EventEmitter, Notice, STATE_CHANGED_EVENT};
use crate::filter::{FilterQuery, ProjectFilter};
use crate::navigation::{Navigator, SubmitOutcome, ViewState};
use crate::profile::{CookieProfile, Profile, ProfileKind, SwaggerProfile};
use crate::project_index::ProjectIndex;
use crate::storage::{SelectedProjects, Settings, StatePatch, StorageAdapter};
use crate::store::EntityStore;
use crate::transfer;

pub struct Cookify {
  store: EntityStore,
  projects: ProjectIndex,
  navigator: Navigator,
  apply_on_click: bool,
  cookie_query: FilterQuery,
  swagger_query: FilterQuery,
  active: BTreeSet<String>,
  storage: StorageAdapter,
  emitter: Arc<dyn EventEmitter>,
  /// Set after a failed save; the next save writes everything.
  pending_full_write: bool,
}

impl Cookify {
  /// Read persisted state and leave the uninitialized view.
  pub fn load(storage: StorageAdapter, emitter: Arc<dyn EventEmitter>) -> Self {
    let state = storage.load();
    let store = EntityStore::new(state.cookies, state.swaggers);
    let mut projects = ProjectIndex::new(state.settings.projects);
    let discovered = projects.reconcile(&store);

    let mut app = Self {
      store,
      projects,
      navigator: Navigator::new(),
      apply_on_click: state.settings.apply_on_click,
      cookie_query: FilterQuery::default(),
      swagger_query: FilterQuery::default(),
      active: BTreeSet::new(),
      storage,
      emitter,
      pending_full_write: state.from_legacy,
    };

    app.cookie_query.project = app.existing_filter(state.selected_projects.cookies);
    app.swagger_query.project = app.existing_filter(state.selected_projects.swaggers);
    app.navigator.initialize();

    log::info!(
      "Loaded {} cookie and {} swagger profile(s)",
      app.store.cookies.len(),
      app.store.swaggers.len()
    );

    if app.pending_full_write || !discovered.is_empty() {
      app.persist(StatePatch::default().settings(app.settings()));
    }
    app
  }

  fn existing_filter(&self, filter: Option<ProjectFilter>) -> Option<ProjectFilter> {
    match filter {
      Some(ProjectFilter::Named(name)) if !self.all_projects().contains(&name) => {
        log::debug!("Dropping saved filter for vanished project '{name}'");
        None
      }
      other => other,
    }
  }

  pub fn store(&self) -> &EntityStore {
    &self.store
  }

  pub fn navigator(&self) -> &Navigator {
    &self.navigator
  }

  pub fn current_view(&self) -> Option<ViewState> {
    self.navigator.current()
  }

  pub fn settings(&self) -> Settings {
    Settings {
      apply_on_click: self.apply_on_click,
      projects: self.projects.registered().to_vec(),
    }
  }

  pub fn query(&self, kind: ProfileKind) -> &FilterQuery {
    match kind {
      ProfileKind::Cookie => &self.cookie_query,
      ProfileKind::Swagger => &self.swagger_query,
    }
  }

  fn query_mut(&mut self, kind: ProfileKind) -> &mut FilterQuery {
    match kind {
      ProfileKind::Cookie => &mut self.cookie_query,
      ProfileKind::Swagger => &mut self.swagger_query,
    }
  }

  pub fn visible_cookies(&self) -> Vec<CookieProfile> {
    self.store.cookies.visible(&self.cookie_query)
  }

  pub fn visible_swaggers(&self) -> Vec<SwaggerProfile> {
    self.store.swaggers.visible(&self.swagger_query)
  }

  pub fn all_projects(&self) -> Vec<String> {
    self.projects.all_projects(&self.store)
  }

  pub fn active_aliases(&self) -> &BTreeSet<String> {
    &self.active
  }

  pub fn is_active(&self, alias: &str) -> bool {
    self.active.contains(alias)
  }

  pub fn navigate_to(&mut self, view: ViewState) {
    self.navigator.navigate_to(view);
  }

  pub fn begin_edit(&mut self, kind: ProfileKind, alias: &str) -> Result<()> {
    let profile = self
      .store
      .get(kind, alias)
      .ok_or_else(|| CookifyError::not_found(kind, alias))?;
    self.navigator.begin_edit(profile);
    Ok(())
  }

  pub fn begin_create(&mut self, kind: ProfileKind) {
    self.navigator.begin_create(kind);
  }

  pub fn cancel(&mut self) {
    self.navigator.cancel();
  }

  /// Validation errors are returned for the form to display; the view and
  /// edit target stay as they were.
  pub fn submit(&mut self, profile: Profile) -> Result<SubmitOutcome> {
    let outcome = self
      .navigator
      .submit(&mut self.store, &mut self.projects, profile)?;
    let patch = self.collection_patch(outcome.kind()).settings(self.settings());
    self.persist(patch);
    Ok(outcome)
  }

  pub fn delete_profile(&mut self, kind: ProfileKind, alias: &str) -> bool {
    if !self.navigator.delete_profile(&mut self.store, kind, alias) {
      log::debug!("Nothing to delete: {kind} profile '{alias}' is absent");
      return false;
    }
    if kind == ProfileKind::Cookie {
      self.active.remove(alias);
    }
    self.persist(self.collection_patch(kind));
    true
  }

  /// Move a row within the list as it is currently filtered.
  pub fn reorder(&mut self, kind: ProfileKind, from: usize, to: usize) -> bool {
    let query = self.query(kind).clone();
    if !self.store.reorder(kind, &query, from, to) {
      return false;
    }
    self.persist(self.collection_patch(kind));
    true
  }

  pub fn add_project(&mut self, name: &str) -> bool {
    if !self.projects.add_project(name) {
      return false;
    }
    self.persist(StatePatch::default().settings(self.settings()));
    true
  }

  /// Remove the tag everywhere and clear it from any list filter using it.
  pub fn delete_project(&mut self, name: &str) -> usize {
    let name = name.trim();
    let detached = self.projects.delete_project(name, &mut self.store);
    for query in [&mut self.cookie_query, &mut self.swagger_query] {
      if query.project.as_ref().is_some_and(|p| p.is_named(name)) {
        query.project = None;
      }
    }
    self.persist(self.full_patch());
    detached
  }

  pub fn set_search(&mut self, kind: ProfileKind, search: impl Into<String>) {
    self.query_mut(kind).search = search.into();
  }

  pub fn set_project_filter(&mut self, kind: ProfileKind, project: Option<ProjectFilter>) {
    self.query_mut(kind).project = project;
    self.persist(StatePatch::default().selected_projects(self.selected_projects()));
  }

  pub fn set_apply_on_click(&mut self, enabled: bool) {
    self.apply_on_click = enabled;
    self.persist(StatePatch::default().settings(self.settings()));
  }

  pub fn export(&self) -> Result<String> {
    transfer::export_document(
      self.store.cookies.items(),
      self.store.swaggers.items(),
      &self.settings(),
    )
  }

  /// Replace every top-level field present in `json`. Nothing changes when
  /// the document does not parse.
  pub fn import(&mut self, json: &str) -> Result<()> {
    let imported = match transfer::import_document(json) {
      Ok(imported) => imported,
      Err(e) => {
        emit_notice(self.emitter.as_ref(), Notice::error(e.to_string()));
        return Err(e);
      }
    };
    if imported.is_empty() {
      emit_notice(self.emitter.as_ref(), Notice::info("Nothing to import"));
      return Ok(());
    }

    if let Some(cookies) = imported.cookies {
      self.store.cookies.replace_all(cookies);
    }
    if let Some(swaggers) = imported.swaggers {
      self.store.swaggers.replace_all(swaggers);
    }
    if let Some(settings) = imported.settings {
      self.apply_on_click = settings.apply_on_click;
      self.projects = ProjectIndex::new(settings.projects);
    }
    self.projects.reconcile(&self.store);
    let (cookie_filter, swagger_filter) = (
      self.cookie_query.project.take(),
      self.swagger_query.project.take(),
    );
    self.cookie_query.project = self.existing_filter(cookie_filter);
    self.swagger_query.project = self.existing_filter(swagger_filter);

    self.persist(self.full_patch());
    emit_notice(self.emitter.as_ref(), Notice::success("Data imported successfully!"));
    Ok(())
  }

  /// Push a stored credential into the active tab.
  pub async fn apply(&mut self, page: &dyn PageContext, kind: ProfileKind, alias: &str) -> Result<()> {
    let result = match self.store.get(kind, alias) {
      None => Err(CookifyError::not_found(kind, alias)),
      Some(Profile::Cookie(cookie)) => apply::apply_cookie(page, &cookie)
        .await
        .map(|_| "Cookie applied successfully!"),
      Some(Profile::Swagger(swagger)) => apply::apply_swagger(page, &swagger)
        .await
        .map(|_| "Logged in successfully!"),
    };

    match result {
      Ok(message) => {
        emit_notice(self.emitter.as_ref(), Notice::success(message));
        if kind == ProfileKind::Cookie {
          self.refresh_active(page).await;
        }
        Ok(())
      }
      Err(e) => {
        emit_notice(self.emitter.as_ref(), Notice::error(e.to_string()));
        Err(e)
      }
    }
  }

  /// Apply on row selection when the setting asks for it. Returns whether
  /// anything was applied.
  pub async fn select_row(&mut self, page: &dyn PageContext, kind: ProfileKind, alias: &str) -> Result<bool> {
    if !self.apply_on_click {
      return Ok(false);
    }
    self.apply(page, kind, alias).await?;
    Ok(true)
  }

  pub async fn remove_applied_cookie(&mut self, page: &dyn PageContext, alias: &str) -> Result<()> {
    let cookie = self
      .store
      .cookies
      .get(alias)
      .cloned()
      .ok_or_else(|| CookifyError::not_found(ProfileKind::Cookie, alias))?;

    match apply::remove_cookie(page, &cookie).await {
      Ok(()) => {
        emit_notice(self.emitter.as_ref(), Notice::success("Cookie removed successfully!"));
        self.active.remove(alias);
        Ok(())
      }
      Err(e) => {
        emit_notice(self.emitter.as_ref(), Notice::error(e.to_string()));
        Err(e)
      }
    }
  }

  pub async fn logout_swagger(&mut self, page: &dyn PageContext, notify: bool) -> Result<bool> {
    match apply::logout_swagger(page).await {
      Ok(done) => {
        if notify {
          let notice = if done {
            Notice::success("Logged out successfully!")
          } else {
            Notice::info("No active session to log out")
          };
          emit_notice(self.emitter.as_ref(), notice);
        }
        Ok(done)
      }
      Err(e) => {
        emit_notice(self.emitter.as_ref(), Notice::error(e.to_string()));
        Err(e)
      }
    }
  }

  /// Recompute which cookie profiles are live; keeps the previous set when
  /// the page cannot be read.
  pub async fn refresh_active(&mut self, page: &dyn PageContext) {
    match page.read_cookies().await {
      Ok(live) => self.active = apply::active_aliases(self.store.cookies.items(), &live),
      Err(e) => log::warn!("Failed to read cookies from the active tab: {e}"),
    }
  }

  fn selected_projects(&self) -> SelectedProjects {
    SelectedProjects {
      cookies: self.cookie_query.project.clone(),
      swaggers: self.swagger_query.project.clone(),
    }
  }

  fn collection_patch(&self, kind: ProfileKind) -> StatePatch {
    match kind {
      ProfileKind::Cookie => StatePatch::default().cookies(self.store.cookies.items().to_vec()),
      ProfileKind::Swagger => StatePatch::default().swaggers(self.store.swaggers.items().to_vec()),
    }
  }

  fn full_patch(&self) -> StatePatch {
    StatePatch::default()
      .cookies(self.store.cookies.items().to_vec())
      .swaggers(self.store.swaggers.items().to_vec())
      .settings(self.settings())
      .selected_projects(self.selected_projects())
  }

  /// Save `patch`, or the full state after an earlier failure. Failures
  /// become a notice; the in-memory state stays authoritative.
  fn persist(&mut self, patch: StatePatch) {
    let patch = if self.pending_full_write {
      self.full_patch()
    } else {
      patch
    };

    match self.storage.save(&patch) {
      Ok(()) => {
        self.pending_full_write = false;
        if let Err(e) = emit(self.emitter.as_ref(), STATE_CHANGED_EVENT, serde_json::Value::Null) {
          log::debug!("Failed to emit state change: {e}");
        }
      }
      Err(e) => {
        self.pending_full_write = true;
        emit_notice(self.emitter.as_ref(), Notice::error(format!("Failed to save changes: {e}")));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::apply::fake::FakePage;
  use crate::apply::BrowserCookie;
  use crate::error::ValidationIssue;
  use crate::events::{drain_notices, BroadcastEmitter, BroadcastEvent, NoticeLevel};
  use crate::storage::{MemoryStore, STORAGE_KEY};
  use tokio::sync::broadcast::Receiver;

  fn app_with(backend: Arc<MemoryStore>) -> (Cookify, Receiver<BroadcastEvent>) {
    let (emitter, events) = BroadcastEmitter::with_capacity(64);
    let app = Cookify::load(StorageAdapter::new(backend), Arc::new(emitter));
    (app, events)
  }

  fn app() -> (Cookify, Arc<MemoryStore>, Receiver<BroadcastEvent>) {
    let backend = Arc::new(MemoryStore::new());
    let (app, emitter) = app_with(backend.clone());
    (app, backend, emitter)
  }

  fn add_cookie(app: &mut Cookify, cookie: CookieProfile) {
    app.begin_create(ProfileKind::Cookie);
    app.submit(cookie.into()).expect("submit should succeed");
  }

  #[test]
  fn test_first_load_is_empty_list_view() {
    let (app, _, _) = app();
    assert_eq!(app.current_view(), Some(ViewState::ListCookies));
    assert!(app.store().cookies.is_empty());
    assert_eq!(app.settings(), Settings::default());
  }

  #[test]
  fn test_mutations_survive_reload() {
    let (mut app, backend, _) = app();
    add_cookie(&mut app, CookieProfile::new("A", "token", "abc").with_project("P1"));
    app.set_apply_on_click(true);

    let (reloaded, _) = app_with(backend);
    assert_eq!(reloaded.store().cookies.len(), 1);
    assert!(reloaded.settings().apply_on_click);
    assert_eq!(reloaded.all_projects(), vec!["P1"]);
  }

  #[test]
  fn test_project_scenario() {
    let (mut app, _, _) = app();
    add_cookie(&mut app, CookieProfile::new("A", "token", "abc").with_project("P1"));

    app.set_project_filter(ProfileKind::Cookie, Some(ProjectFilter::parse("P1")));
    assert_eq!(app.visible_cookies().len(), 1);
    app.set_project_filter(ProfileKind::Cookie, Some(ProjectFilter::Unassigned));
    assert!(app.visible_cookies().is_empty());

    app.set_project_filter(ProfileKind::Cookie, Some(ProjectFilter::parse("P1")));
    app.set_project_filter(ProfileKind::Swagger, Some(ProjectFilter::parse("P1")));
    assert_eq!(app.delete_project("P1"), 1);

    assert_eq!(app.store().cookies.get("A").unwrap().project, None);
    assert!(!app.all_projects().contains(&"P1".to_string()));
    assert_eq!(app.query(ProfileKind::Cookie).project, None);
    assert_eq!(app.query(ProfileKind::Swagger).project, None);
  }

  #[test]
  fn test_padded_project_tag_is_trimmed_everywhere() {
    let (mut app, backend, _) = app();
    add_cookie(&mut app, CookieProfile::new("A", "token", "abc").with_project(" P1 "));
    assert_eq!(app.store().cookies.get("A").unwrap().project.as_deref(), Some("P1"));
    assert_eq!(app.all_projects(), vec!["P1"]);

    app.set_project_filter(ProfileKind::Cookie, Some(ProjectFilter::parse("P1")));
    assert_eq!(app.visible_cookies().len(), 1);

    assert_eq!(app.delete_project("P1"), 1);
    assert_eq!(app.store().cookies.get("A").unwrap().project, None);
    assert!(app.all_projects().is_empty());

    let (reloaded, _) = app_with(backend);
    assert!(reloaded.all_projects().is_empty());
  }

  #[test]
  fn test_padded_project_tag_from_import_is_trimmed() {
    let (mut app, _, _) = app();
    app
      .import(r#"{"cookies": [{"alias": "A", "name": "n", "value": "v", "project": " P1 "}]}"#)
      .unwrap();
    app.set_project_filter(ProfileKind::Cookie, Some(ProjectFilter::parse("P1")));
    assert_eq!(app.visible_cookies().len(), 1);
    assert_eq!(app.delete_project("P1"), 1);
    assert!(app.all_projects().is_empty());
  }

  #[test]
  fn test_invalid_submit_returns_error_and_keeps_store() {
    let (mut app, _, _) = app();
    app.begin_create(ProfileKind::Cookie);
    let err = app
      .submit(CookieProfile::new("", "token", "abc").into())
      .unwrap_err();
    assert!(matches!(err, CookifyError::Validation(ValidationIssue::EmptyAlias)));
    assert!(app.store().cookies.is_empty());
    assert_eq!(app.current_view(), Some(ViewState::AddCookie));
  }

  #[test]
  fn test_reorder_uses_current_filter() {
    let (mut app, _, _) = app();
    for (alias, project) in [("A", "P"), ("B", "Q"), ("C", "P")] {
      add_cookie(&mut app, CookieProfile::new(alias, "n", "v").with_project(project));
    }
    app.set_project_filter(ProfileKind::Cookie, Some(ProjectFilter::parse("P")));

    assert!(app.reorder(ProfileKind::Cookie, 1, 0));
    let visible: Vec<_> = app.visible_cookies().into_iter().map(|c| c.alias).collect();
    assert_eq!(visible, vec!["C", "A"]);
    assert_eq!(app.store().cookies.get("B").unwrap().order, None);
  }

  #[test]
  fn test_storage_failure_becomes_notice_then_full_write() {
    let (mut app, backend, mut events) = app();
    backend.set_fail_writes(true);
    add_cookie(&mut app, CookieProfile::new("A", "token", "abc"));

    let notices = drain_notices(&mut events);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(app.store().cookies.len(), 1);

    backend.set_fail_writes(false);
    app.set_project_filter(ProfileKind::Swagger, None);

    let (reloaded, _) = app_with(backend);
    assert_eq!(reloaded.store().cookies.len(), 1);
  }

  #[test]
  fn test_import_replaces_present_fields_only() {
    let (mut app, _, mut events) = app();
    add_cookie(&mut app, CookieProfile::new("A", "token", "abc"));

    app
      .import(r#"{"swaggers": [{"alias": "dev", "bearerToken": "t", "project": "API"}]}"#)
      .unwrap();
    assert_eq!(app.store().cookies.len(), 1);
    assert_eq!(app.store().swaggers.len(), 1);
    assert_eq!(app.all_projects(), vec!["API"]);
    assert_eq!(drain_notices(&mut events)[0].level, NoticeLevel::Success);
  }

  #[test]
  fn test_invalid_import_changes_nothing() {
    let (mut app, _, mut events) = app();
    add_cookie(&mut app, CookieProfile::new("A", "token", "abc"));
    let before = app.store().clone();

    assert!(app.import("not json").is_err());
    assert_eq!(app.store(), &before);
    assert_eq!(drain_notices(&mut events)[0].level, NoticeLevel::Error);
  }

  #[test]
  fn test_import_without_known_fields_changes_nothing() {
    let (mut app, backend, mut events) = app();
    add_cookie(&mut app, CookieProfile::new("A", "token", "abc"));
    drain_notices(&mut events);
    backend.set_fail_writes(true);

    app.import(r#"{"name": "cookify", "version": 1}"#).unwrap();
    assert_eq!(app.store().cookies.len(), 1);
    assert_eq!(drain_notices(&mut events), vec![Notice::info("Nothing to import")]);
  }

  #[test]
  fn test_export_import_round_trip() {
    let (mut app, _, _) = app();
    add_cookie(&mut app, CookieProfile::new("A", "token", "abc").with_project("P1"));
    app.set_apply_on_click(true);
    let exported = app.export().unwrap();

    let (mut other, _, _) = self::app();
    other.import(&exported).unwrap();
    assert_eq!(other.store(), app.store());
    assert_eq!(other.settings(), app.settings());
  }

  #[test]
  fn test_saved_filter_for_vanished_project_is_dropped() {
    let doc = r#"{
      "cookies": [{"alias": "A", "name": "n", "value": "v", "project": "Live"}],
      "selectedProjects": {"cookies": "Gone", "swaggers": "Live"}
    }"#;
    let (app, _) = app_with(Arc::new(MemoryStore::with_entry(STORAGE_KEY, doc)));
    assert_eq!(app.query(ProfileKind::Cookie).project, None);
    assert_eq!(
      app.query(ProfileKind::Swagger).project,
      Some(ProjectFilter::parse("Live"))
    );
  }

  #[tokio::test]
  async fn test_apply_cookie_updates_active_set() {
    let (mut app, _, mut events) = app();
    add_cookie(&mut app, CookieProfile::new("A", "session", "abc"));
    let page = FakePage {
      cookies: vec![BrowserCookie {
        name: "session".to_string(),
        value: "abc".to_string(),
      }],
      ..FakePage::on("https://example.com")
    };

    app.apply(&page, ProfileKind::Cookie, "A").await.unwrap();
    assert!(app.is_active("A"));
    assert_eq!(
      drain_notices(&mut events),
      vec![Notice::success("Cookie applied successfully!")]
    );
  }

  #[tokio::test]
  async fn test_select_row_respects_setting() {
    let (mut app, _, _) = app();
    add_cookie(&mut app, CookieProfile::new("A", "session", "abc"));
    let page = FakePage::on("https://example.com");

    assert!(!app.select_row(&page, ProfileKind::Cookie, "A").await.unwrap());
    assert!(page.set_requests.lock().unwrap().is_empty());

    app.set_apply_on_click(true);
    assert!(app.select_row(&page, ProfileKind::Cookie, "A").await.unwrap());
    assert_eq!(page.set_requests.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_apply_failure_is_notice() {
    let (mut app, _, mut events) = app();
    app.begin_create(ProfileKind::Swagger);
    app.submit(SwaggerProfile::new("dev", "tok").into()).unwrap();
    let page = FakePage::on("https://example.com");

    assert!(app.apply(&page, ProfileKind::Swagger, "dev").await.is_err());
    assert_eq!(
      drain_notices(&mut events),
      vec![Notice::error("Apply error: No Swagger Docs Page found!")]
    );
  }
}

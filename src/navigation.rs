//! Screen routing for the presentation layer.
//!
//! `Navigator` tracks the current screen and the profile being edited.
//! Submit and delete go through it so the edit target and the store stay
//! consistent.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::profile::{Profile, ProfileKind};
use crate::project_index::ProjectIndex;
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewState {
  ListCookies,
  ListSwaggers,
  Settings,
  AddCookie,
  EditCookie,
  AddSwagger,
  EditSwagger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenGroup {
  Main,
  Detail,
}

/// Animation hint for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
  #[default]
  Forward,
  Backward,
}

impl Direction {
  pub fn as_i8(self) -> i8 {
    match self {
      Direction::Forward => 1,
      Direction::Backward => -1,
    }
  }

  pub fn between(from: Option<ViewState>, to: ViewState) -> Self {
    match from.map(ViewState::group) {
      Some(ScreenGroup::Detail) if to.group() == ScreenGroup::Main => Direction::Backward,
      _ => Direction::Forward,
    }
  }
}

impl ViewState {
  pub const ALL: [ViewState; 7] = [
    ViewState::ListCookies,
    ViewState::ListSwaggers,
    ViewState::Settings,
    ViewState::AddCookie,
    ViewState::EditCookie,
    ViewState::AddSwagger,
    ViewState::EditSwagger,
  ];

  pub fn group(self) -> ScreenGroup {
    match self {
      ViewState::ListCookies | ViewState::ListSwaggers | ViewState::Settings => ScreenGroup::Main,
      _ => ScreenGroup::Detail,
    }
  }

  /// List screen this view returns to on submit or cancel.
  pub fn list_view(self) -> ViewState {
    match self {
      ViewState::ListSwaggers | ViewState::AddSwagger | ViewState::EditSwagger => {
        ViewState::ListSwaggers
      }
      _ => ViewState::ListCookies,
    }
  }

  pub fn list_for(kind: ProfileKind) -> ViewState {
    match kind {
      ProfileKind::Cookie => ViewState::ListCookies,
      ProfileKind::Swagger => ViewState::ListSwaggers,
    }
  }

  pub fn add_for(kind: ProfileKind) -> ViewState {
    match kind {
      ProfileKind::Cookie => ViewState::AddCookie,
      ProfileKind::Swagger => ViewState::AddSwagger,
    }
  }

  pub fn edit_for(kind: ProfileKind) -> ViewState {
    match kind {
      ProfileKind::Cookie => ViewState::EditCookie,
      ProfileKind::Swagger => ViewState::EditSwagger,
    }
  }

  /// Kind an edit screen requires as its target.
  pub fn edit_kind(self) -> Option<ProfileKind> {
    match self {
      ViewState::EditCookie => Some(ProfileKind::Cookie),
      ViewState::EditSwagger => Some(ProfileKind::Swagger),
      _ => None,
    }
  }
}

impl std::fmt::Display for ViewState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = match self {
      ViewState::ListCookies => "list-cookies",
      ViewState::ListSwaggers => "list-swaggers",
      ViewState::Settings => "settings",
      ViewState::AddCookie => "add-cookie",
      ViewState::EditCookie => "edit-cookie",
      ViewState::AddSwagger => "add-swagger",
      ViewState::EditSwagger => "edit-swagger",
    };
    write!(f, "{label}")
  }
}

/// What a successful submit did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  Added { kind: ProfileKind, alias: String },
  Updated { kind: ProfileKind, previous_alias: String, alias: String },
}

impl SubmitOutcome {
  pub fn kind(&self) -> ProfileKind {
    match self {
      SubmitOutcome::Added { kind, .. } | SubmitOutcome::Updated { kind, .. } => *kind,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct Navigator {
  current: Option<ViewState>,
  editing: Option<Profile>,
  direction: Direction,
}

impl Navigator {
  pub fn new() -> Self {
    Self::default()
  }

  /// `None` until the first load has completed.
  pub fn current(&self) -> Option<ViewState> {
    self.current
  }

  pub fn editing(&self) -> Option<&Profile> {
    self.editing.as_ref()
  }

  pub fn direction(&self) -> Direction {
    self.direction
  }

  /// Leave the uninitialized state once stored data is in memory.
  pub fn initialize(&mut self) {
    if self.current.is_none() {
      self.current = Some(ViewState::ListCookies);
      self.direction = Direction::Forward;
    }
  }

  /// Switch screens. Edit screens need a target of the matching kind and
  /// fall back to the add screen without one; leaving an edit screen
  /// clears the target.
  pub fn navigate_to(&mut self, view: ViewState) {
    let view = match view.edit_kind() {
      Some(kind) if self.editing.as_ref().map(Profile::kind) != Some(kind) => {
        log::debug!("No {kind} edit target for {view}, falling back to the add screen");
        self.editing = None;
        ViewState::add_for(kind)
      }
      _ => view,
    };

    if view.edit_kind().is_none() {
      self.editing = None;
    }

    self.direction = Direction::between(self.current, view);
    self.current = Some(view);
  }

  pub fn begin_edit(&mut self, profile: Profile) {
    let view = ViewState::edit_for(profile.kind());
    self.editing = Some(profile);
    self.navigate_to(view);
  }

  pub fn begin_create(&mut self, kind: ProfileKind) {
    self.editing = None;
    self.navigate_to(ViewState::add_for(kind));
  }

  /// Store the submitted profile: replace the edit target (matched by the
  /// target's alias, not the submitted one) or append. A target that
  /// vanished in the meantime turns the submit into an add. On validation
  /// failure the form stays open.
  pub fn submit(
    &mut self,
    store: &mut EntityStore,
    projects: &mut ProjectIndex,
    profile: Profile,
  ) -> Result<SubmitOutcome> {
    profile.validate()?;
    let kind = profile.kind();
    let alias = profile.alias().to_string();
    let target = self
      .editing
      .as_ref()
      .filter(|target| target.kind() == kind)
      .map(|target| target.alias().to_string());
    let project = profile.project().map(str::to_string);

    let outcome = match target {
      Some(previous_alias) if store.contains(kind, &previous_alias) => {
        store.update(&previous_alias, profile)?;
        SubmitOutcome::Updated {
          kind,
          previous_alias,
          alias,
        }
      }
      Some(previous_alias) => {
        log::warn!("Edit target {kind} '{previous_alias}' no longer exists, adding instead");
        store.add(profile)?;
        SubmitOutcome::Added { kind, alias }
      }
      None => {
        store.add(profile)?;
        SubmitOutcome::Added { kind, alias }
      }
    };

    if let Some(project) = project {
      projects.add_project(&project);
    }

    self.editing = None;
    self.navigate_to(ViewState::list_for(kind));
    Ok(outcome)
  }

  pub fn cancel(&mut self) {
    let list = self.current.map_or(ViewState::ListCookies, ViewState::list_view);
    self.editing = None;
    self.navigate_to(list);
  }

  /// Remove a profile from a list row; the current screen is unchanged.
  pub fn delete_profile(&mut self, store: &mut EntityStore, kind: ProfileKind, alias: &str) -> bool {
    store.remove(kind, alias)
  }
}

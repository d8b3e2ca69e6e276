use serde::{Deserialize, Serialize};

use crate::error::ValidationIssue;

/// Discriminant of the two profile collections. Cookies and swaggers are
/// separate alias namespaces.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
  Cookie,
  Swagger,
}

impl std::fmt::Display for ProfileKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ProfileKind::Cookie => write!(f, "cookie"),
      ProfileKind::Swagger => write!(f, "swagger"),
    }
  }
}

impl std::str::FromStr for ProfileKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "cookie" | "cookies" => Ok(ProfileKind::Cookie),
      "swagger" | "swaggers" => Ok(ProfileKind::Swagger),
      other => Err(format!("Unknown profile kind: {other}")),
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct CookieProfile {
  pub alias: String,
  pub name: String,
  pub value: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>, // Overrides the active tab origin
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub domain: Option<String>, // Overrides the active tab hostname
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub project: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub order: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SwaggerProfile {
  pub alias: String,
  pub bearer_token: String,
  #[serde(default, deserialize_with = "deserialize_auto_login")]
  pub auto_login: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub urls: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub project: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub order: Option<i64>,
}

/// Older exports wrote `autoLogin` as the strings "true" / "false".
fn deserialize_auto_login<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
  D: serde::Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum BoolOrString {
    Bool(bool),
    Str(String),
  }

  match BoolOrString::deserialize(deserializer)? {
    BoolOrString::Bool(b) => Ok(b),
    BoolOrString::Str(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
  }
}

/// A profile of either kind, tagged once at creation time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Profile {
  Cookie(CookieProfile),
  Swagger(SwaggerProfile),
}

impl Profile {
  pub fn kind(&self) -> ProfileKind {
    match self {
      Profile::Cookie(_) => ProfileKind::Cookie,
      Profile::Swagger(_) => ProfileKind::Swagger,
    }
  }

  pub fn alias(&self) -> &str {
    match self {
      Profile::Cookie(c) => &c.alias,
      Profile::Swagger(s) => &s.alias,
    }
  }

  pub fn project(&self) -> Option<&str> {
    match self {
      Profile::Cookie(c) => c.project(),
      Profile::Swagger(s) => s.project(),
    }
  }

  pub fn validate(&self) -> Result<(), ValidationIssue> {
    match self {
      Profile::Cookie(c) => c.validate(),
      Profile::Swagger(s) => s.validate(),
    }
  }
}

impl From<CookieProfile> for Profile {
  fn from(cookie: CookieProfile) -> Self {
    Profile::Cookie(cookie)
  }
}

impl From<SwaggerProfile> for Profile {
  fn from(swagger: SwaggerProfile) -> Self {
    Profile::Swagger(swagger)
  }
}

/// Behaviour shared by both profile collections: identity, project tag,
/// explicit order and the type-specific search fields.
pub trait Entity: Clone {
  const KIND: ProfileKind;

  fn alias(&self) -> &str;
  fn project(&self) -> Option<&str>;
  fn set_project(&mut self, project: Option<String>);
  fn order(&self) -> Option<i64>;
  fn set_order(&mut self, order: Option<i64>);
  fn validate(&self) -> Result<(), ValidationIssue>;

  /// Fields matched by a search term besides alias and project.
  fn extra_search_fields(&self) -> Vec<&str>;
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CookieProfile {
  pub fn new(alias: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      alias: alias.into(),
      name: name.into(),
      value: value.into(),
      ..Default::default()
    }
  }

  pub fn with_project(mut self, project: impl Into<String>) -> Self {
    self.project = Some(project.into());
    self
  }

  pub fn with_order(mut self, order: i64) -> Self {
    self.order = Some(order);
    self
  }

  pub fn url(&self) -> Option<&str> {
    non_empty(&self.url)
  }

  pub fn domain(&self) -> Option<&str> {
    non_empty(&self.domain)
  }
}

impl SwaggerProfile {
  pub fn new(alias: impl Into<String>, bearer_token: impl Into<String>) -> Self {
    Self {
      alias: alias.into(),
      bearer_token: bearer_token.into(),
      ..Default::default()
    }
  }

  pub fn with_project(mut self, project: impl Into<String>) -> Self {
    self.project = Some(project.into());
    self
  }

  pub fn with_order(mut self, order: i64) -> Self {
    self.order = Some(order);
    self
  }
}

impl Entity for CookieProfile {
  const KIND: ProfileKind = ProfileKind::Cookie;

  fn alias(&self) -> &str {
    &self.alias
  }

  fn project(&self) -> Option<&str> {
    non_empty(&self.project)
  }

  fn set_project(&mut self, project: Option<String>) {
    self.project = project;
  }

  fn order(&self) -> Option<i64> {
    self.order
  }

  fn set_order(&mut self, order: Option<i64>) {
    self.order = order;
  }

  fn validate(&self) -> Result<(), ValidationIssue> {
    if self.alias.trim().is_empty() {
      return Err(ValidationIssue::EmptyAlias);
    }
    if self.name.trim().is_empty() {
      return Err(ValidationIssue::EmptyCookieName);
    }
    if self.value.is_empty() {
      return Err(ValidationIssue::EmptyCookieValue);
    }
    Ok(())
  }

  fn extra_search_fields(&self) -> Vec<&str> {
    let mut fields = vec![self.name.as_str()];
    if let Some(domain) = self.domain() {
      fields.push(domain);
    }
    fields
  }
}

impl Entity for SwaggerProfile {
  const KIND: ProfileKind = ProfileKind::Swagger;

  fn alias(&self) -> &str {
    &self.alias
  }

  fn project(&self) -> Option<&str> {
    non_empty(&self.project)
  }

  fn set_project(&mut self, project: Option<String>) {
    self.project = project;
  }

  fn order(&self) -> Option<i64> {
    self.order
  }

  fn set_order(&mut self, order: Option<i64>) {
    self.order = order;
  }

  fn validate(&self) -> Result<(), ValidationIssue> {
    if self.alias.trim().is_empty() {
      return Err(ValidationIssue::EmptyAlias);
    }
    if self.bearer_token.trim().is_empty() {
      return Err(ValidationIssue::EmptyBearerToken);
    }
    Ok(())
  }

  fn extra_search_fields(&self) -> Vec<&str> {
    Vec::new()
  }
}

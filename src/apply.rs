//! Pushing stored credentials into the active browser tab.
//!
//! The browser itself sits behind `PageContext`; everything here only
//! builds requests for it and interprets its answers.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

use crate::error::{ApplyFailure, Result};
use crate::profile::{CookieProfile, SwaggerProfile};

pub const COOKIE_LIFETIME_DAYS: i64 = 30;
pub const LOCALHOST: &str = "localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
  pub url: Url,
}

impl TabInfo {
  pub fn parse(url: &str) -> Result<Self> {
    let url = Url::parse(url).map_err(|e| ApplyFailure::Page(format!("Invalid tab URL: {e}")))?;
    Ok(Self { url })
  }

  pub fn hostname(&self) -> &str {
    self.url.host_str().unwrap_or_default()
  }

  pub fn is_https(&self) -> bool {
    self.url.scheme() == "https"
  }

  pub fn origin(&self) -> String {
    self.url.origin().ascii_serialization()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
  Strict,
  Lax,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCookieDetails {
  pub url: String,
  pub domain: String,
  pub name: String,
  pub value: String,
  pub expiration_date: i64,
  pub secure: bool,
  pub path: String,
  pub same_site: SameSite,
}

impl SetCookieDetails {
  /// Request for `cookie` against `tab`, honoring the profile's url and
  /// domain overrides.
  pub fn for_profile(cookie: &CookieProfile, tab: &TabInfo) -> Self {
    let domain = cookie.domain().unwrap_or(tab.hostname()).to_string();
    let url = match cookie.url() {
      Some(url) => with_scheme(url, &domain),
      None => tab.origin(),
    };
    let secure = tab.is_https();
    let expires = Utc::now() + Duration::days(COOKIE_LIFETIME_DAYS);

    Self {
      url,
      domain,
      name: cookie.name.clone(),
      value: cookie.value.clone(),
      expiration_date: expires.timestamp(),
      secure,
      path: "/".to_string(),
      same_site: if secure { SameSite::Strict } else { SameSite::Lax },
    }
  }
}

fn is_local(domain: &str) -> bool {
  domain == LOCALHOST || domain == "127.0.0.1"
}

fn with_scheme(url: &str, domain: &str) -> String {
  if url.contains("://") {
    url.to_string()
  } else if is_local(domain) {
    format!("http://{url}")
  } else {
    format!("https://{url}")
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveCookieDetails {
  pub url: String,
  pub name: String,
}

impl RemoveCookieDetails {
  pub fn for_profile(cookie: &CookieProfile, tab: &TabInfo) -> Self {
    let domain = cookie.domain().unwrap_or(tab.hostname());
    Self {
      url: format!("{}://{domain}", tab.url.scheme()),
      name: cookie.name.clone(),
    }
  }
}

/// A cookie as the browser reports it for the active tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserCookie {
  pub name: String,
  pub value: String,
}

/// Browser-side collaborator. Implementations answer `Ok(false)` when the
/// browser declined a request and `Err` when it could not be asked at all.
#[async_trait]
pub trait PageContext: Send + Sync {
  async fn active_tab(&self) -> Result<Option<TabInfo>>;
  async fn set_cookie(&self, details: &SetCookieDetails) -> Result<bool>;
  async fn remove_cookie(&self, details: &RemoveCookieDetails) -> Result<bool>;
  async fn is_swagger_page(&self) -> Result<bool>;
  async fn swagger_login(&self, bearer_token: &str) -> Result<bool>;
  async fn swagger_logout(&self) -> Result<bool>;
  async fn read_cookies(&self) -> Result<Vec<BrowserCookie>>;
}

async fn require_tab(page: &dyn PageContext) -> Result<TabInfo> {
  page
    .active_tab()
    .await?
    .ok_or_else(|| ApplyFailure::NoActiveTab.into())
}

/// Set the profile's cookie on the active tab. A rejected cookie on a
/// non-localhost domain is retried once on `localhost`. Returns the domain
/// the cookie landed on.
pub async fn apply_cookie(page: &dyn PageContext, cookie: &CookieProfile) -> Result<String> {
  let tab = require_tab(page).await?;
  let details = SetCookieDetails::for_profile(cookie, &tab);

  if page.set_cookie(&details).await? {
    log::info!("Cookie '{}' set on {}", details.name, details.domain);
    return Ok(details.domain);
  }

  if details.domain != LOCALHOST {
    log::warn!(
      "Cookie '{}' rejected on {}, retrying on {LOCALHOST}",
      details.name,
      details.domain
    );
    let on_localhost = CookieProfile {
      domain: Some(LOCALHOST.to_string()),
      ..cookie.clone()
    };
    let retry = SetCookieDetails::for_profile(&on_localhost, &tab);
    if page.set_cookie(&retry).await? {
      return Ok(retry.domain);
    }
  }

  Err(
    ApplyFailure::CookieRejected {
      name: details.name,
      domain: details.domain,
    }
    .into(),
  )
}

pub async fn remove_cookie(page: &dyn PageContext, cookie: &CookieProfile) -> Result<()> {
  let tab = require_tab(page).await?;
  let details = RemoveCookieDetails::for_profile(cookie, &tab);
  if page.remove_cookie(&details).await? {
    log::info!("Cookie '{}' removed from {}", details.name, details.url);
    Ok(())
  } else {
    Err(ApplyFailure::CookieRemoveFailed { name: details.name }.into())
  }
}

async fn require_swagger_page(page: &dyn PageContext) -> Result<()> {
  require_tab(page).await?;
  if page.is_swagger_page().await? {
    Ok(())
  } else {
    Err(ApplyFailure::NotSwaggerPage.into())
  }
}

/// Log out of the docs page silently, then authorize with the profile's
/// bearer token.
pub async fn apply_swagger(page: &dyn PageContext, swagger: &SwaggerProfile) -> Result<()> {
  require_swagger_page(page).await?;

  if !page.swagger_logout().await? {
    log::debug!("Silent logout before '{}' login had nothing to do", swagger.alias);
  }
  if !page.swagger_login(&swagger.bearer_token).await? {
    return Err(ApplyFailure::Page(format!("Authorization for '{}' was not accepted", swagger.alias)).into());
  }
  log::info!("Authorized docs page as '{}'", swagger.alias);
  Ok(())
}

/// Returns whether the page reported a completed logout.
pub async fn logout_swagger(page: &dyn PageContext) -> Result<bool> {
  require_swagger_page(page).await?;
  page.swagger_logout().await
}

/// Aliases of the cookie profiles whose name and value are both live.
pub fn active_aliases(cookies: &[CookieProfile], browser: &[BrowserCookie]) -> BTreeSet<String> {
  cookies
    .iter()
    .filter(|cookie| {
      browser
        .iter()
        .any(|live| live.name == cookie.name && live.value == cookie.value)
    })
    .map(|cookie| cookie.alias.clone())
    .collect()
}

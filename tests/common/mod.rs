#![allow(dead_code)]

use async_trait::async_trait;
use cookify_lib::apply::{BrowserCookie, PageContext, RemoveCookieDetails, SetCookieDetails, TabInfo};
use cookify_lib::events::{drain_notices, BroadcastEmitter, BroadcastEvent, Notice};
use cookify_lib::storage::{FileStore, StorageAdapter};
use cookify_lib::{Cookify, Result};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::broadcast::Receiver;

/// A `Cookify` backed by files in a temporary directory.
pub struct TestApp {
  pub dir: TempDir,
  pub app: Cookify,
  pub events: Receiver<BroadcastEvent>,
}

impl TestApp {
  pub fn new() -> Self {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (app, events) = Self::open(&dir);
    Self { dir, app, events }
  }

  fn open(dir: &TempDir) -> (Cookify, Receiver<BroadcastEvent>) {
    let (emitter, events) = BroadcastEmitter::with_capacity(64);
    let app = Cookify::load(
      StorageAdapter::new(FileStore::new(dir.path())),
      Arc::new(emitter),
    );
    (app, events)
  }

  /// Drop the in-memory state and load again from disk.
  pub fn reload(&mut self) {
    let (app, events) = Self::open(&self.dir);
    self.app = app;
    self.events = events;
  }

  pub fn take_notices(&mut self) -> Vec<Notice> {
    drain_notices(&mut self.events)
  }

  pub fn store_file(&self) -> std::path::PathBuf {
    self.dir.path().join("cookify.json")
  }
}

/// Browser stand-in that keeps set cookies in a jar.
pub struct ScriptedPage {
  pub tab: Option<TabInfo>,
  pub swagger_page: bool,
  pub jar: Mutex<Vec<SetCookieDetails>>,
  pub token: Mutex<Option<String>>,
}

impl ScriptedPage {
  pub fn on(url: &str) -> Self {
    Self {
      tab: Some(TabInfo::parse(url).expect("valid tab url")),
      swagger_page: false,
      jar: Mutex::new(Vec::new()),
      token: Mutex::new(None),
    }
  }

  pub fn docs(url: &str) -> Self {
    Self {
      swagger_page: true,
      ..Self::on(url)
    }
  }
}

#[async_trait]
impl PageContext for ScriptedPage {
  async fn active_tab(&self) -> Result<Option<TabInfo>> {
    Ok(self.tab.clone())
  }

  async fn set_cookie(&self, details: &SetCookieDetails) -> Result<bool> {
    let mut jar = self.jar.lock().unwrap();
    jar.retain(|c| c.name != details.name);
    jar.push(details.clone());
    Ok(true)
  }

  async fn remove_cookie(&self, details: &RemoveCookieDetails) -> Result<bool> {
    let mut jar = self.jar.lock().unwrap();
    let before = jar.len();
    jar.retain(|c| c.name != details.name);
    Ok(jar.len() != before)
  }

  async fn is_swagger_page(&self) -> Result<bool> {
    Ok(self.swagger_page)
  }

  async fn swagger_login(&self, bearer_token: &str) -> Result<bool> {
    *self.token.lock().unwrap() = Some(bearer_token.to_string());
    Ok(true)
  }

  async fn swagger_logout(&self) -> Result<bool> {
    Ok(self.token.lock().unwrap().take().is_some())
  }

  async fn read_cookies(&self) -> Result<Vec<BrowserCookie>> {
    Ok(
      self
        .jar
        .lock()
        .unwrap()
        .iter()
        .map(|c| BrowserCookie {
          name: c.name.clone(),
          value: c.value.clone(),
        })
        .collect(),
    )
  }
}

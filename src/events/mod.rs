use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub const NOTICE_EVENT: &str = "notice";
pub const STATE_CHANGED_EVENT: &str = "state-changed";

/// Trait for emitting events to whatever presents the state.
///
/// Note: This trait uses `serde_json::Value` to be dyn-compatible.
/// Use the convenience functions `emit()` and `emit_notice()` which accept
/// typed payloads.
pub trait EventEmitter: Send + Sync {
  /// Emit an event with a JSON value payload.
  fn emit_value(&self, event: &str, payload: serde_json::Value) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
  Success,
  Info,
  Error,
}

/// Transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
  pub level: NoticeLevel,
  pub message: String,
}

impl Notice {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Success,
      message: message.into(),
    }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Info,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Error,
      message: message.into(),
    }
  }
}

/// Event message sent through a broadcast channel.
#[derive(Clone, Debug)]
pub struct BroadcastEvent {
  pub event_type: String,
  pub payload: serde_json::Value,
}

/// Broadcasts events to every subscribed receiver.
#[derive(Clone)]
pub struct BroadcastEmitter {
  tx: broadcast::Sender<BroadcastEvent>,
}

impl BroadcastEmitter {
  pub fn with_capacity(capacity: usize) -> (Self, broadcast::Receiver<BroadcastEvent>) {
    let (tx, rx) = broadcast::channel(capacity);
    (Self { tx }, rx)
  }
}

impl EventEmitter for BroadcastEmitter {
  fn emit_value(&self, event: &str, payload: serde_json::Value) -> Result<(), String> {
    let event = BroadcastEvent {
      event_type: event.to_string(),
      payload,
    };
    // Ignore send errors (no receivers connected)
    let _ = self.tx.send(event);
    Ok(())
  }
}

/// Drain every queued event from `rx` and return the notices among them.
pub fn drain_notices(rx: &mut broadcast::Receiver<BroadcastEvent>) -> Vec<Notice> {
  let mut notices = Vec::new();
  loop {
    match rx.try_recv() {
      Ok(event) if event.event_type == NOTICE_EVENT => {
        match serde_json::from_value(event.payload) {
          Ok(notice) => notices.push(notice),
          Err(e) => log::debug!("Skipping malformed notice: {e}"),
        }
      }
      Ok(_) => {}
      Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
        log::warn!("Dropped {skipped} event(s) before they were read");
      }
      Err(_) => break,
    }
  }
  notices
}

/// Emit any serializable payload through `emitter`.
pub fn emit<S: Serialize>(emitter: &dyn EventEmitter, event: &str, payload: S) -> Result<(), String> {
  let value = serde_json::to_value(payload).map_err(|e| e.to_string())?;
  emitter.emit_value(event, value)
}

/// Emit a notice; failures are logged, never propagated.
pub fn emit_notice(emitter: &dyn EventEmitter, notice: Notice) {
  match notice.level {
    NoticeLevel::Error => log::warn!("{}", notice.message),
    _ => log::info!("{}", notice.message),
  }
  if let Err(e) = emit(emitter, NOTICE_EVENT, &notice) {
    log::warn!("Failed to emit notice: {e}");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_broadcast_emitter() {
    let (emitter, mut rx) = BroadcastEmitter::with_capacity(16);

    emit_notice(&emitter, Notice::success("Cookie set"));

    let event = rx.try_recv().unwrap();
    assert_eq!(event.event_type, NOTICE_EVENT);
    assert_eq!(
      event.payload,
      serde_json::json!({"level": "success", "message": "Cookie set"})
    );
  }

  #[test]
  fn test_broadcast_emitter_no_receivers() {
    let (emitter, rx) = BroadcastEmitter::with_capacity(16);
    drop(rx);

    assert!(emitter
      .emit_value(STATE_CHANGED_EVENT, serde_json::Value::Null)
      .is_ok());
  }

  #[test]
  fn test_drain_notices_skips_other_events() {
    let (emitter, mut rx) = BroadcastEmitter::with_capacity(16);
    emit(&emitter, STATE_CHANGED_EVENT, serde_json::Value::Null).unwrap();
    emit_notice(&emitter, Notice::error("No active tab found!"));

    assert_eq!(drain_notices(&mut rx), vec![Notice::error("No active tab found!")]);
    assert!(drain_notices(&mut rx).is_empty());
  }

  #[test]
  fn test_drain_notices_survives_lag() {
    let (emitter, mut rx) = BroadcastEmitter::with_capacity(2);
    for i in 0..4 {
      emit_notice(&emitter, Notice::info(format!("notice {i}")));
    }

    assert_eq!(
      drain_notices(&mut rx),
      vec![Notice::info("notice 2"), Notice::info("notice 3")]
    );
  }
}

//! Echo area and message log.
//!
//! The echo area shows the most recent message. Every message is also
//! appended to a log that keeps the newest `capacity` entries.

use std::{
  collections::VecDeque,
  fmt,
};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Info,
  Warning,
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Info => "info",
      Self::Warning => "warning",
      Self::Error => "error",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EchoMessage {
  pub seq:      u64,
  pub severity: Severity,
  /// Command, plugin or subsystem the message came from.
  pub origin:   Option<String>,
  pub text:     String,
}

impl fmt::Display for EchoMessage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (&self.origin, self.severity) {
      (Some(origin), Severity::Info) => write!(f, "[{origin}] {}", self.text),
      (Some(origin), severity) => write!(f, "[{origin}] {severity}: {}", self.text),
      (None, Severity::Info) => f.write_str(&self.text),
      (None, severity) => write!(f, "{severity}: {}", self.text),
    }
  }
}

#[derive(Debug, Clone)]
pub struct EchoArea {
  current:  Option<EchoMessage>,
  log:      VecDeque<EchoMessage>,
  seq:      u64,
  capacity: usize,
}

impl Default for EchoArea {
  fn default() -> Self {
    Self::with_limit(100)
  }
}

impl EchoArea {
  /// A limit of zero is treated as one.
  pub fn with_limit(capacity: usize) -> Self {
    Self {
      current: None,
      log: VecDeque::new(),
      seq: 0,
      capacity: capacity.max(1),
    }
  }

  pub fn current(&self) -> Option<&EchoMessage> {
    self.current.as_ref()
  }

  pub fn text(&self) -> Option<&str> {
    self.current.as_ref().map(|message| message.text.as_str())
  }

  pub fn log(&self) -> impl Iterator<Item = &EchoMessage> {
    self.log.iter()
  }

  /// The log rendered one message per line, oldest first.
  pub fn log_text(&self) -> String {
    self
      .log
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>()
      .join("\n")
  }

  fn echo(&mut self, severity: Severity, origin: Option<String>, text: String) -> u64 {
    self.seq += 1;
    let message = EchoMessage {
      seq: self.seq,
      severity,
      origin,
      text,
    };
    if self.log.len() == self.capacity {
      self.log.pop_front();
    }
    self.log.push_back(message.clone());
    self.current = Some(message);
    self.seq
  }

  pub fn info(&mut self, origin: Option<String>, text: impl Into<String>) -> u64 {
    self.echo(Severity::Info, origin, text.into())
  }

  pub fn warning(&mut self, origin: Option<String>, text: impl Into<String>) -> u64 {
    self.echo(Severity::Warning, origin, text.into())
  }

  pub fn error(&mut self, origin: Option<String>, text: impl Into<String>) -> u64 {
    self.echo(Severity::Error, origin, text.into())
  }

  /// Empties the echo area. The log is untouched.
  pub fn clear_current(&mut self) -> Option<EchoMessage> {
    self.current.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn newest_message_is_shown_and_logged() {
    let mut echo = EchoArea::default();
    echo.info(None, "first");
    let seq = echo.error(Some("delete-window".into()), "cannot delete the only window");
    assert_eq!(seq, 2);
    assert_eq!(echo.text(), Some("cannot delete the only window"));
    assert_eq!(
      echo.log_text(),
      "first\n[delete-window] error: cannot delete the only window"
    );
  }

  #[test]
  fn log_drops_the_oldest_entries() {
    let mut echo = EchoArea::with_limit(2);
    for text in ["a", "b", "c"] {
      echo.info(None, text);
    }
    let kept: Vec<_> = echo.log().map(|message| message.text.as_str()).collect();
    assert_eq!(kept, ["b", "c"]);
    assert_eq!(echo.current().map(|message| message.seq), Some(3));
  }

  #[test]
  fn clearing_leaves_the_log() {
    let mut echo = EchoArea::with_limit(0);
    echo.warning(None, "careful");
    assert_eq!(echo.clear_current().map(|m| m.severity), Some(Severity::Warning));
    assert_eq!(echo.text(), None);
    assert_eq!(echo.log_text(), "warning: careful");
  }
}

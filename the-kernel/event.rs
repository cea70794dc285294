//! Well-known hook events and the payload handed to their callbacks.

use serde::Serialize;
use the_lib::value::{
  Value,
  ValueMap,
};

pub const BEFORE_COMMAND: &str = "before-command";
pub const AFTER_COMMAND: &str = "after-command";
pub const BUFFER_KILLED: &str = "buffer-killed";
pub const WINDOW_CONFIGURATION_CHANGE: &str = "window-configuration-change";
pub const PLUGIN_LOADED: &str = "plugin-loaded";
pub const STARTUP_COMPLETE: &str = "startup-complete";

pub const EVENTS: &[&str] = &[
  BEFORE_COMMAND,
  AFTER_COMMAND,
  BUFFER_KILLED,
  WINDOW_CONFIGURATION_CHANGE,
  PLUGIN_LOADED,
  STARTUP_COMPLETE,
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HookPayload {
  pub event:   String,
  pub command: Option<String>,
  pub args:    Vec<Value>,
  pub result:  Option<Value>,
  pub error:   Option<String>,
  pub detail:  Option<Value>,
}

impl HookPayload {
  pub fn new(event: &str) -> Self {
    Self {
      event: event.to_string(),
      ..Self::default()
    }
  }

  pub fn before_command(command: &str, args: &[Value]) -> Self {
    Self {
      command: Some(command.to_string()),
      args: args.to_vec(),
      ..Self::new(BEFORE_COMMAND)
    }
  }

  pub fn after_command(command: &str, args: &[Value], outcome: &anyhow::Result<Value>) -> Self {
    let (result, error) = match outcome {
      Ok(value) => (Some(value.clone()), None),
      Err(err) => (None, Some(format!("{err:#}"))),
    };
    Self {
      command: Some(command.to_string()),
      args: args.to_vec(),
      result,
      error,
      ..Self::new(AFTER_COMMAND)
    }
  }

  pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
    self.detail = Some(detail.into());
    self
  }

  /// Payload as a map value, the shape script callbacks receive.
  pub fn to_value(&self) -> Value {
    let mut map = ValueMap::new();
    map.insert("event".into(), Value::from(self.event.as_str()));
    map.insert("command".into(), Value::from(self.command.clone()));
    map.insert("args".into(), Value::List(self.args.clone()));
    if let Some(result) = &self.result {
      map.insert("result".into(), result.clone());
    }
    if let Some(error) = &self.error {
      map.insert("error".into(), Value::from(error.as_str()));
    }
    if let Some(detail) = &self.detail {
      map.insert("detail".into(), detail.clone());
    }
    Value::Map(map)
  }
}

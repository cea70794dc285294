//! Bookkeeping for loaded extension units.
//!
//! The registry does not load anything itself. The host records a unit
//! when it starts loading it, attributes the commands and hooks it
//! registers, and marks it active or failed.

use std::fmt;

use crate::hooks::HookId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(usize);

impl PluginId {
  /// Zero-based load order.
  pub const fn index(self) -> usize {
    self.0
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginStatus {
  Loading,
  Active,
  Failed(String),
}

impl fmt::Display for PluginStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Loading => f.write_str("loading"),
      Self::Active => f.write_str("active"),
      Self::Failed(reason) => write!(f, "failed: {reason}"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRecord {
  pub id:       PluginId,
  /// Canonical path, or a synthetic name for source strings.
  pub identity: String,
  pub status:   PluginStatus,
  pub commands: Vec<String>,
  pub hooks:    Vec<HookId>,
}

#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
  records: Vec<PluginRecord>,
}

impl PluginRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts a load of `identity`. A previously failed unit is reset and
  /// keeps its place in the load order.
  pub fn begin(&mut self, identity: &str) -> PluginId {
    if let Some(record) = self.records.iter_mut().find(|r| r.identity == identity) {
      record.status = PluginStatus::Loading;
      record.commands.clear();
      record.hooks.clear();
      return record.id;
    }
    let id = PluginId(self.records.len());
    self.records.push(PluginRecord {
      id,
      identity: identity.to_string(),
      status: PluginStatus::Loading,
      commands: Vec::new(),
      hooks: Vec::new(),
    });
    id
  }

  pub fn find(&self, identity: &str) -> Option<&PluginRecord> {
    self.records.iter().find(|r| r.identity == identity)
  }

  pub fn is_active(&self, identity: &str) -> bool {
    self
      .find(identity)
      .is_some_and(|r| r.status == PluginStatus::Active)
  }

  pub fn get(&self, id: PluginId) -> Option<&PluginRecord> {
    self.records.get(id.0)
  }

  pub fn set_status(&mut self, id: PluginId, status: PluginStatus) {
    if let Some(record) = self.records.get_mut(id.0) {
      record.status = status;
    }
  }

  pub fn attribute_command(&mut self, id: PluginId, command: &str) {
    if let Some(record) = self.records.get_mut(id.0)
      && !record.commands.iter().any(|c| c == command)
    {
      record.commands.push(command.to_string());
    }
  }

  pub fn attribute_hook(&mut self, id: PluginId, hook: HookId) {
    if let Some(record) = self.records.get_mut(id.0) {
      record.hooks.push(hook);
    }
  }

  /// Records in load order.
  pub fn iter(&self) -> impl Iterator<Item = &PluginRecord> {
    self.records.iter()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

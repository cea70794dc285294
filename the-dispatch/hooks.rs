//! Named hook lists with per-callback failure isolation.
//!
//! Callbacks for an event run in registration order. Registering the same
//! callback twice runs it twice. [`emit_isolated`] runs a snapshot of the
//! list, so callbacks registered while an emit is in progress only fire from
//! the next emit on.

use std::{
  any::Any,
  collections::HashMap,
  fmt,
  panic::{
    self,
    AssertUnwindSafe,
  },
  rc::Rc,
};

pub type HookFn<Ctx, Payload, Error> = Rc<dyn Fn(&Ctx, &Payload) -> Result<(), Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

impl HookId {
  pub const fn get(self) -> u64 {
    self.0
  }
}

impl fmt::Display for HookId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

pub struct HookEntry<Ctx, Payload, Error> {
  pub id:       HookId,
  pub event:    String,
  /// Who registered the callback, for diagnostics.
  pub origin:   String,
  pub callback: HookFn<Ctx, Payload, Error>,
}

impl<Ctx, Payload, Error> Clone for HookEntry<Ctx, Payload, Error> {
  fn clone(&self) -> Self {
    Self {
      id:       self.id,
      event:    self.event.clone(),
      origin:   self.origin.clone(),
      callback: Rc::clone(&self.callback),
    }
  }
}

impl<Ctx, Payload, Error> fmt::Debug for HookEntry<Ctx, Payload, Error> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HookEntry")
      .field("id", &self.id)
      .field("event", &self.event)
      .field("origin", &self.origin)
      .finish_non_exhaustive()
  }
}

/// Why a callback did not complete.
#[derive(Debug)]
pub enum HookFailure<Error> {
  Failed(Error),
  Panicked(String),
}

impl<Error: fmt::Display> fmt::Display for HookFailure<Error> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Failed(err) => write!(f, "{err}"),
      Self::Panicked(msg) => write!(f, "panicked: {msg}"),
    }
  }
}

pub struct HookRegistry<Ctx, Payload, Error> {
  hooks:   HashMap<String, Vec<HookEntry<Ctx, Payload, Error>>>,
  next_id: u64,
}

impl<Ctx, Payload, Error> Default for HookRegistry<Ctx, Payload, Error> {
  fn default() -> Self {
    Self::new()
  }
}

impl<Ctx, Payload, Error> HookRegistry<Ctx, Payload, Error> {
  pub fn new() -> Self {
    Self {
      hooks:   HashMap::new(),
      next_id: 1,
    }
  }

  pub fn register(
    &mut self,
    event: impl Into<String>,
    origin: impl Into<String>,
    callback: HookFn<Ctx, Payload, Error>,
  ) -> HookId {
    let id = HookId(self.next_id);
    self.next_id += 1;
    let event = event.into();
    self.hooks.entry(event.clone()).or_default().push(HookEntry {
      id,
      event,
      origin: origin.into(),
      callback,
    });
    id
  }

  pub fn remove(&mut self, id: HookId) -> bool {
    for entries in self.hooks.values_mut() {
      if let Some(pos) = entries.iter().position(|entry| entry.id == id) {
        entries.remove(pos);
        return true;
      }
    }
    false
  }

  /// Snapshot of the callbacks for `event`, in registration order.
  pub fn callbacks(&self, event: &str) -> Vec<HookEntry<Ctx, Payload, Error>> {
    self.hooks.get(event).cloned().unwrap_or_default()
  }

  pub fn count(&self, event: &str) -> usize {
    self.hooks.get(event).map_or(0, Vec::len)
  }

  /// Events with at least one callback, sorted.
  pub fn events(&self) -> Vec<&str> {
    let mut events: Vec<&str> = self
      .hooks
      .iter()
      .filter(|(_, entries)| !entries.is_empty())
      .map(|(event, _)| event.as_str())
      .collect();
    events.sort_unstable();
    events
  }
}

/// Runs every callback in `entries`. A callback that returns an error or
/// panics is reported through `on_failure`; the remaining callbacks still
/// run.
pub fn emit_isolated<Ctx, Payload, Error>(
  entries: &[HookEntry<Ctx, Payload, Error>],
  ctx: &Ctx,
  payload: &Payload,
  mut on_failure: impl FnMut(&HookEntry<Ctx, Payload, Error>, HookFailure<Error>),
) -> usize {
  let mut failures = 0;
  for entry in entries {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (entry.callback)(ctx, payload)));
    let failure = match outcome {
      Ok(Ok(())) => continue,
      Ok(Err(err)) => HookFailure::Failed(err),
      Err(panic) => HookFailure::Panicked(panic_message(panic.as_ref())),
    };
    failures += 1;
    on_failure(entry, failure);
  }
  failures
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(msg) = payload.downcast_ref::<&str>() {
    (*msg).to_string()
  } else if let Some(msg) = payload.downcast_ref::<String>() {
    msg.clone()
  } else {
    "unknown panic".to_string()
  }
}

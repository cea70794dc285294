//! Editor state: buffers, the window split tree, point memory, keymap
//! layers, variables and the echo area.
//!
//! Everything here is synchronous and deterministic. Operations check their
//! preconditions before mutating, so an `Err` leaves the state exactly as it
//! was. The invariant maintained across every public method is that each
//! window of the split tree is bound to a live buffer.

use std::{
  collections::BTreeMap,
  num::NonZeroUsize,
};

use thiserror::Error;

use crate::{
  buffer::{
    Buffer,
    BufferId,
  },
  input::{
    KeyChord,
    KeySequence,
    ParseKeyError,
  },
  keymap::{
    KeyOutcome,
    KeyResolver,
    Keymap,
    LayerScope,
    Resolution,
  },
  messages::EchoArea,
  movement::{
    self,
    Direction,
  },
  split_tree::{
    SplitAxis,
    SplitTree,
    SplitTreeError,
    WindowId,
  },
  value::Value,
};

pub const DEFAULT_BUFFER: &str = "*scratch*";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
  #[error("split ratio {0} is outside (0, 1)")]
  InvalidRatio(f32),
  #[error("cannot delete the only window")]
  LastWindow,
  #[error("unknown window: {}", .0.get())]
  UnknownWindow(WindowId),
  #[error("unknown buffer: {0}")]
  UnknownBuffer(String),
  #[error("buffer already exists: {0}")]
  DuplicateBuffer(String),
  #[error("invalid key sequence: {0}")]
  InvalidKey(#[from] ParseKeyError),
  #[error("editor state is corrupt: {0}")]
  Corrupt(String),
}

impl From<SplitTreeError> for EditorError {
  fn from(err: SplitTreeError) -> Self {
    match err {
      SplitTreeError::InvalidRatio(ratio) => Self::InvalidRatio(ratio),
      SplitTreeError::LastWindow => Self::LastWindow,
      SplitTreeError::UnknownWindow(window) => Self::UnknownWindow(window),
      SplitTreeError::Corrupt => Self::Corrupt("split tree".into()),
    }
  }
}

pub type Result<T> = std::result::Result<T, EditorError>;

/// Keymap layers owned by the editor.
#[derive(Debug, Clone, Default)]
pub struct Keymaps {
  pub global: Keymap,
  modes:      BTreeMap<String, Keymap>,
  buffers:    BTreeMap<BufferId, Keymap>,
}

impl Keymaps {
  pub fn mode(&self, mode: &str) -> Option<&Keymap> {
    self.modes.get(mode)
  }

  pub fn mode_mut(&mut self, mode: &str) -> &mut Keymap {
    self.modes.entry(mode.to_string()).or_default()
  }

  pub fn buffer(&self, buffer: BufferId) -> Option<&Keymap> {
    self.buffers.get(&buffer)
  }

  pub fn buffer_mut(&mut self, buffer: BufferId) -> &mut Keymap {
    self.buffers.entry(buffer).or_default()
  }
}

#[derive(Debug, Clone)]
pub struct EditorState {
  buffers:        BTreeMap<BufferId, Buffer>,
  next_buffer_id: NonZeroUsize,
  /// Most recently shown first.
  buffer_history: Vec<BufferId>,
  tree:           SplitTree,
  window_buffers: BTreeMap<WindowId, BufferId>,
  points:         BTreeMap<(WindowId, BufferId), usize>,
  keymaps:        Keymaps,
  /// Enabled modes per buffer, in enabling order.
  buffer_modes:   BTreeMap<BufferId, Vec<String>>,
  variables:      BTreeMap<String, Value>,
  echo:           EchoArea,
  resolver:       KeyResolver,
  default_buffer: String,
}

impl Default for EditorState {
  fn default() -> Self {
    Self::new(DEFAULT_BUFFER)
  }
}

impl EditorState {
  pub fn new(default_buffer: &str) -> Self {
    let default_buffer = if default_buffer.trim().is_empty() {
      DEFAULT_BUFFER.to_string()
    } else {
      default_buffer.to_string()
    };

    let mut state = Self {
      buffers: BTreeMap::new(),
      next_buffer_id: NonZeroUsize::MIN,
      buffer_history: Vec::new(),
      tree: SplitTree::new(),
      window_buffers: BTreeMap::new(),
      points: BTreeMap::new(),
      keymaps: Keymaps::default(),
      buffer_modes: BTreeMap::new(),
      variables: BTreeMap::new(),
      echo: EchoArea::default(),
      resolver: KeyResolver::default(),
      default_buffer,
    };

    let scratch = state.insert_buffer(&state.default_buffer.clone(), "");
    let window = state.tree.selected();
    state.window_buffers.insert(window, scratch);
    state.points.insert((window, scratch), 0);
    state.mark_recent(scratch);
    state
  }

  pub fn default_buffer_name(&self) -> &str {
    &self.default_buffer
  }

  // Buffers.

  pub fn buffers(&self) -> impl Iterator<Item = &Buffer> {
    self.buffers.values()
  }

  pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
    self.buffers.get(&id)
  }

  pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
    self.buffers.get_mut(&id)
  }

  pub fn buffer_id(&self, name: &str) -> Option<BufferId> {
    self
      .buffers
      .values()
      .find(|buffer| buffer.name() == name)
      .map(Buffer::id)
  }

  pub fn require_buffer(&self, name: &str) -> Result<BufferId> {
    self
      .buffer_id(name)
      .ok_or_else(|| EditorError::UnknownBuffer(name.to_string()))
  }

  pub fn buffer_by_name(&self, name: &str) -> Option<&Buffer> {
    self.buffer_id(name).and_then(|id| self.buffers.get(&id))
  }

  /// Buffer names, most recently shown first; never-shown buffers follow
  /// in creation order.
  pub fn buffer_names_mru(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self
      .buffer_history
      .iter()
      .filter_map(|id| self.buffers.get(id))
      .map(Buffer::name)
      .collect();
    for buffer in self.buffers.values() {
      if !self.buffer_history.contains(&buffer.id()) {
        names.push(buffer.name());
      }
    }
    names
  }

  pub fn create_buffer(&mut self, name: &str, text: &str) -> Result<BufferId> {
    if self.buffer_id(name).is_some() {
      return Err(EditorError::DuplicateBuffer(name.to_string()));
    }
    Ok(self.insert_buffer(name, text))
  }

  pub fn ensure_buffer(&mut self, name: &str) -> BufferId {
    match self.buffer_id(name) {
      Some(id) => id,
      None => self.insert_buffer(name, ""),
    }
  }

  pub fn mark_recent(&mut self, id: BufferId) {
    self.buffer_history.retain(|entry| *entry != id);
    self.buffer_history.insert(0, id);
  }

  /// Kills `name` and returns the buffer now shown in its windows.
  ///
  /// Windows showing the buffer switch to the most recently shown other
  /// buffer; when no other buffer exists the default buffer is recreated.
  pub fn kill_buffer(&mut self, name: &str) -> Result<BufferId> {
    let killed = self.require_buffer(name)?;

    self.buffers.remove(&killed);
    self.keymaps.buffers.remove(&killed);
    self.buffer_modes.remove(&killed);
    self.buffer_history.retain(|id| *id != killed);
    self.points.retain(|(_, buffer), _| *buffer != killed);

    let replacement = self
      .buffer_history
      .iter()
      .copied()
      .find(|id| self.buffers.contains_key(id))
      .or_else(|| self.buffers.keys().next().copied());
    let replacement = match replacement {
      Some(id) => id,
      None => self.insert_buffer(&self.default_buffer.clone(), ""),
    };

    for (window, buffer) in self.window_buffers.iter_mut() {
      if *buffer == killed {
        *buffer = replacement;
        self.points.entry((*window, replacement)).or_insert(0);
      }
    }
    self.mark_recent(replacement);
    Ok(replacement)
  }

  fn insert_buffer(&mut self, name: &str, text: &str) -> BufferId {
    let id = BufferId::new(self.next_buffer_id);
    self.next_buffer_id = self.next_buffer_id.saturating_add(1);
    self.buffers.insert(id, Buffer::new(id, name, text));
    id
  }

  // Windows.

  pub fn tree(&self) -> &SplitTree {
    &self.tree
  }

  pub fn windows(&self) -> Vec<WindowId> {
    self.tree.windows()
  }

  pub fn selected_window(&self) -> WindowId {
    self.tree.selected()
  }

  pub fn window_buffer(&self, window: WindowId) -> Option<BufferId> {
    self.window_buffers.get(&window).copied()
  }

  pub fn selected_buffer_id(&self) -> BufferId {
    *self
      .window_buffers
      .get(&self.tree.selected())
      .expect("selected window is always bound to a buffer")
  }

  pub fn selected_buffer(&self) -> &Buffer {
    self
      .buffers
      .get(&self.selected_buffer_id())
      .expect("windows only reference live buffers")
  }

  pub fn selected_buffer_mut(&mut self) -> &mut Buffer {
    let id = self.selected_buffer_id();
    self
      .buffers
      .get_mut(&id)
      .expect("windows only reference live buffers")
  }

  /// Point of `window` in its current buffer, clamped to the buffer.
  pub fn point(&self, window: WindowId) -> usize {
    let Some(buffer) = self.window_buffer(window) else {
      return 0;
    };
    let point = self.points.get(&(window, buffer)).copied().unwrap_or(0);
    self
      .buffers
      .get(&buffer)
      .map_or(0, |buffer| buffer.clamp(point))
  }

  pub fn set_point(&mut self, window: WindowId, point: usize) -> Result<usize> {
    let buffer = self
      .window_buffer(window)
      .ok_or(EditorError::UnknownWindow(window))?;
    let clamped = self
      .buffers
      .get(&buffer)
      .map_or(0, |buffer| buffer.clamp(point));
    self.points.insert((window, buffer), clamped);
    Ok(clamped)
  }

  pub fn selected_point(&self) -> usize {
    self.point(self.tree.selected())
  }

  pub fn set_selected_point(&mut self, point: usize) -> usize {
    let window = self.tree.selected();
    self.set_point(window, point).unwrap_or(0)
  }

  /// Recorded point memory entries for `window`.
  pub fn window_points(&self, window: WindowId) -> Vec<(BufferId, usize)> {
    self
      .points
      .iter()
      .filter(|((w, _), _)| *w == window)
      .map(|((_, buffer), point)| (*buffer, *point))
      .collect()
  }

  /// Splits the selected window. The new window shows the same buffer at
  /// the same point; the original window stays selected.
  pub fn split_window(&mut self, axis: SplitAxis, ratio: f32) -> Result<WindowId> {
    let buffer = self.selected_buffer_id();
    let point = self.selected_point();
    let window = self.tree.split(axis, ratio)?;
    self.window_buffers.insert(window, buffer);
    self.points.insert((window, buffer), point);
    Ok(window)
  }

  pub fn select_window(&mut self, window: WindowId) -> Result<()> {
    self.tree.select(window)?;
    Ok(())
  }

  pub fn other_window(&mut self) -> WindowId {
    self.tree.select_other();
    self.tree.selected()
  }

  pub fn previous_window(&mut self) -> WindowId {
    self.tree.select_previous();
    self.tree.selected()
  }

  /// Deletes the selected window and returns its id.
  pub fn delete_window(&mut self) -> Result<WindowId> {
    let removed = self.tree.delete_selected()?;
    self.forget_window(removed);
    Ok(removed)
  }

  pub fn delete_other_windows(&mut self) -> Vec<WindowId> {
    let removed = self.tree.delete_other();
    for window in &removed {
      self.forget_window(*window);
    }
    removed
  }

  fn forget_window(&mut self, window: WindowId) {
    self.window_buffers.remove(&window);
    self.points.retain(|(w, _), _| *w != window);
  }

  pub fn set_window_buffer(&mut self, window: WindowId, buffer: BufferId) -> Result<()> {
    if !self.tree.contains(window) {
      return Err(EditorError::UnknownWindow(window));
    }
    if !self.buffers.contains_key(&buffer) {
      return Err(EditorError::UnknownBuffer(buffer.get().to_string()));
    }
    self.window_buffers.insert(window, buffer);
    self.points.entry((window, buffer)).or_insert(0);
    self.mark_recent(buffer);
    Ok(())
  }

  /// Shows `name` in the selected window, creating the buffer if needed.
  pub fn switch_to_buffer(&mut self, name: &str) -> BufferId {
    let buffer = self.ensure_buffer(name);
    let window = self.tree.selected();
    self.window_buffers.insert(window, buffer);
    self.points.entry((window, buffer)).or_insert(0);
    self.mark_recent(buffer);
    buffer
  }

  /// Shows `name` in some window and returns it. With `prefer_other` the
  /// first non-selected window is used when there is one.
  pub fn pop_to_buffer(&mut self, name: &str, prefer_other: bool) -> WindowId {
    let buffer = self.ensure_buffer(name);
    let selected = self.tree.selected();
    let target = if prefer_other {
      self
        .tree
        .windows()
        .into_iter()
        .find(|window| *window != selected)
        .unwrap_or(selected)
    } else {
      selected
    };
    self.window_buffers.insert(target, buffer);
    self.points.entry((target, buffer)).or_insert(0);
    self.mark_recent(buffer);
    target
  }

  // Editing at point in the selected window.

  pub fn insert(&mut self, text: &str) -> usize {
    let point = self.selected_point();
    let end = self.selected_buffer_mut().insert(point, text);
    self.set_selected_point(end)
  }

  pub fn delete_chars(&mut self, count: usize, dir: Direction) -> usize {
    let point = self.selected_point();
    let range = movement::char_range(self.selected_buffer(), point, count, dir);
    let start = range.start;
    let removed = self.selected_buffer_mut().remove(range);
    self.set_selected_point(start);
    removed
  }

  pub fn kill_line(&mut self) -> String {
    let point = self.selected_point();
    let range = movement::kill_line_range(self.selected_buffer(), point);
    let killed = self
      .selected_buffer()
      .text()
      .slice(range.clone())
      .to_string();
    self.selected_buffer_mut().remove(range);
    self.set_selected_point(point);
    killed
  }

  pub fn move_point(&mut self, motion: impl FnOnce(&Buffer, usize) -> usize) -> usize {
    let point = self.selected_point();
    let next = motion(self.selected_buffer(), point);
    self.set_selected_point(next)
  }

  // Keymaps and modes.

  pub fn keymaps(&self) -> &Keymaps {
    &self.keymaps
  }

  pub fn keymaps_mut(&mut self) -> &mut Keymaps {
    &mut self.keymaps
  }

  /// Keymap layer addressed by `scope`, created on demand.
  pub fn keymap_mut(&mut self, scope: &LayerScope) -> Result<&mut Keymap> {
    match scope {
      LayerScope::Global => Ok(&mut self.keymaps.global),
      LayerScope::Mode(mode) => Ok(self.keymaps.mode_mut(mode)),
      LayerScope::Buffer(name) => {
        let id = self.require_buffer(name)?;
        Ok(self.keymaps.buffer_mut(id))
      },
    }
  }

  pub fn modes(&self, buffer: BufferId) -> &[String] {
    self
      .buffer_modes
      .get(&buffer)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  /// Enables `mode` in `buffer`. Re-enabling moves it to the front of the
  /// mode layers.
  pub fn enable_mode(&mut self, buffer: BufferId, mode: &str) -> Result<()> {
    if !self.buffers.contains_key(&buffer) {
      return Err(EditorError::UnknownBuffer(buffer.get().to_string()));
    }
    let modes = self.buffer_modes.entry(buffer).or_default();
    modes.retain(|m| m != mode);
    modes.push(mode.to_string());
    Ok(())
  }

  pub fn disable_mode(&mut self, buffer: BufferId, mode: &str) -> bool {
    let Some(modes) = self.buffer_modes.get_mut(&buffer) else {
      return false;
    };
    let before = modes.len();
    modes.retain(|m| m != mode);
    before != modes.len()
  }

  /// Active layers for `buffer`: buffer-local, then enabled modes (most
  /// recently enabled first), then global.
  pub fn layers(&self, buffer: BufferId) -> Vec<(LayerScope, &Keymap)> {
    collect_layers(&self.keymaps, &self.buffers, &self.buffer_modes, buffer)
  }

  pub fn resolve(&self, keys: &[KeyChord]) -> Resolution {
    crate::keymap::resolve(&self.layers(self.selected_buffer_id()), keys)
  }

  pub fn where_is(&self, command: &str) -> Vec<(KeySequence, LayerScope)> {
    crate::keymap::where_is(&self.layers(self.selected_buffer_id()), command)
  }

  pub fn resolver(&self) -> &KeyResolver {
    &self.resolver
  }

  pub fn resolver_mut(&mut self) -> &mut KeyResolver {
    &mut self.resolver
  }

  /// Feeds one chord to the resolver against the selected buffer's layers.
  pub fn feed_key(&mut self, chord: KeyChord) -> KeyOutcome {
    let buffer = self.selected_buffer_id();
    let layers = collect_layers(&self.keymaps, &self.buffers, &self.buffer_modes, buffer);
    self.resolver.feed(chord, &layers)
  }

  // Variables and messages.

  pub fn variable(&self, name: &str) -> Option<&Value> {
    self.variables.get(name)
  }

  pub fn set_variable(&mut self, name: &str, value: Value) -> Option<Value> {
    self.variables.insert(name.to_string(), value)
  }

  pub fn variables(&self) -> &BTreeMap<String, Value> {
    &self.variables
  }

  pub fn echo(&self) -> &EchoArea {
    &self.echo
  }

  pub fn echo_mut(&mut self) -> &mut EchoArea {
    &mut self.echo
  }

  /// Checks the split tree and the window to buffer bindings.
  pub fn validate(&self) -> Result<()> {
    self
      .tree
      .validate()
      .map_err(|err| EditorError::Corrupt(err.to_string()))?;
    for window in self.tree.windows() {
      let buffer = self
        .window_buffers
        .get(&window)
        .ok_or_else(|| EditorError::Corrupt(format!("window {} has no buffer", window.get())))?;
      if !self.buffers.contains_key(buffer) {
        return Err(EditorError::Corrupt(format!(
          "window {} shows a dead buffer",
          window.get()
        )));
      }
    }
    if self.window_buffers.len() != self.tree.window_count() {
      return Err(EditorError::Corrupt("stale window bindings".into()));
    }
    Ok(())
  }
}

fn collect_layers<'a>(
  keymaps: &'a Keymaps,
  buffers: &BTreeMap<BufferId, Buffer>,
  buffer_modes: &BTreeMap<BufferId, Vec<String>>,
  buffer: BufferId,
) -> Vec<(LayerScope, &'a Keymap)> {
  let mut layers = Vec::new();
  if let Some(keymap) = keymaps.buffers.get(&buffer)
    && let Some(owner) = buffers.get(&buffer)
  {
    layers.push((LayerScope::Buffer(owner.name().to_string()), keymap));
  }
  if let Some(modes) = buffer_modes.get(&buffer) {
    for mode in modes.iter().rev() {
      if let Some(keymap) = keymaps.modes.get(mode) {
        layers.push((LayerScope::Mode(mode.clone()), keymap));
      }
    }
  }
  layers.push((LayerScope::Global, &keymaps.global));
  layers
}

#[cfg(test)]
mod tests {
  use super::*;

  fn keys(s: &str) -> KeySequence {
    s.parse().unwrap()
  }

  #[test]
  fn new_state_shows_default_buffer() {
    let state = EditorState::default();
    assert_eq!(state.selected_buffer().name(), DEFAULT_BUFFER);
    assert_eq!(state.windows().len(), 1);
    assert_eq!(state.validate(), Ok(()));
  }

  #[test]
  fn split_copies_buffer_and_point_then_delete_restores() {
    let mut state = EditorState::default();
    state.insert("hello");
    let original = state.selected_window();
    let buffer = state.selected_buffer_id();

    let new_window = state.split_window(SplitAxis::Horizontal, 0.5).unwrap();
    assert_eq!(state.selected_window(), original);
    assert_eq!(state.window_buffer(new_window), Some(buffer));
    assert_eq!(state.point(new_window), 5);

    state.select_window(new_window).unwrap();
    let removed = state.delete_window().unwrap();
    assert_eq!(removed, new_window);
    assert_eq!(state.windows(), vec![original]);
    assert_eq!(state.selected_buffer_id(), buffer);
    assert!(state.window_points(new_window).is_empty());
    assert_eq!(state.validate(), Ok(()));
  }

  #[test]
  fn failed_operations_leave_state_untouched() {
    let mut state = EditorState::default();
    state.insert("text");
    let window = state.selected_window();
    let tree = state.tree().clone();
    let points = state.window_points(window);

    assert_eq!(state.delete_window(), Err(EditorError::LastWindow));
    assert_eq!(*state.tree(), tree);
    assert_eq!(state.window_points(window), points);

    state.split_window(SplitAxis::Vertical, 0.5).unwrap();
    let tree = state.tree().clone();
    for ratio in [1.0, 0.0, f32::NAN] {
      assert!(matches!(
        state.split_window(SplitAxis::Vertical, ratio),
        Err(EditorError::InvalidRatio(_))
      ));
      assert_eq!(*state.tree(), tree);
    }
    assert_eq!(state.validate(), Ok(()));
  }

  #[test]
  fn delete_other_windows_forgets_removed_points() {
    let mut state = EditorState::default();
    let a = state.split_window(SplitAxis::Vertical, 0.5).unwrap();
    let b = state.split_window(SplitAxis::Horizontal, 0.5).unwrap();
    let mut removed = state.delete_other_windows();
    removed.sort();
    assert_eq!(removed, vec![a, b]);
    assert!(state.window_points(a).is_empty());
    assert!(state.delete_other_windows().is_empty());
    assert_eq!(state.validate(), Ok(()));
  }

  #[test]
  fn point_memory_is_per_window_and_buffer() {
    let mut state = EditorState::default();
    state.insert("scratch text");
    state.switch_to_buffer("notes");
    state.insert("abc");
    assert_eq!(state.selected_point(), 3);

    state.switch_to_buffer(DEFAULT_BUFFER);
    assert_eq!(state.selected_point(), 12);
    state.switch_to_buffer("notes");
    assert_eq!(state.selected_point(), 3);
  }

  #[test]
  fn kill_buffer_reassigns_windows_to_recent_buffer() {
    let mut state = EditorState::default();
    state.switch_to_buffer("a");
    state.switch_to_buffer("b");
    let other = state.split_window(SplitAxis::Vertical, 0.5).unwrap();
    let b = state.selected_buffer_id();
    state.keymaps_mut().buffer_mut(b).bind(&keys("x"), "self-insert-command");
    state.enable_mode(b, "lisp").unwrap();

    let replacement = state.kill_buffer("b").unwrap();
    assert_eq!(state.buffer(replacement).map(Buffer::name), Some("a"));
    assert_eq!(state.window_buffer(other), Some(replacement));
    assert_eq!(state.selected_buffer_id(), replacement);
    assert!(state.keymaps().buffer(b).is_none());
    assert!(state.modes(b).is_empty());
    assert_eq!(state.validate(), Ok(()));
  }

  #[test]
  fn killing_last_buffer_recreates_default() {
    let mut state = EditorState::default();
    let scratch = state.selected_buffer_id();
    let replacement = state.kill_buffer(DEFAULT_BUFFER).unwrap();
    assert_ne!(replacement, scratch);
    assert_eq!(state.selected_buffer().name(), DEFAULT_BUFFER);
    assert!(state.kill_buffer("missing").is_err());
    assert_eq!(state.validate(), Ok(()));
  }

  #[test]
  fn pop_to_buffer_prefers_other_window() {
    let mut state = EditorState::default();
    let selected = state.selected_window();
    assert_eq!(state.pop_to_buffer("*Help*", true), selected);

    state.switch_to_buffer(DEFAULT_BUFFER);
    let other = state.split_window(SplitAxis::Vertical, 0.5).unwrap();
    assert_eq!(state.pop_to_buffer("*Help*", true), other);
    assert_eq!(state.selected_window(), selected);
    assert_eq!(state.selected_buffer().name(), DEFAULT_BUFFER);
  }

  #[test]
  fn layers_order_buffer_then_modes_then_global() {
    let mut state = EditorState::default();
    let buffer = state.selected_buffer_id();
    state.keymaps_mut().global.bind(&keys("g"), "global-g");
    state.keymaps_mut().mode_mut("one").bind(&keys("g"), "one-g");
    state.keymaps_mut().mode_mut("two").bind(&keys("g"), "two-g");
    state.enable_mode(buffer, "one").unwrap();
    state.enable_mode(buffer, "two").unwrap();

    assert!(matches!(
      state.resolve(&keys("g")),
      Resolution::Command { command, .. } if command == "two-g"
    ));

    state.keymaps_mut().buffer_mut(buffer).bind(&keys("g"), "local-g");
    let scopes: Vec<_> = state
      .layers(buffer)
      .into_iter()
      .map(|(scope, _)| scope.to_string())
      .collect();
    assert_eq!(scopes, vec!["buffer:*scratch*", "mode:two", "mode:one", "global"]);
    assert!(matches!(
      state.resolve(&keys("g")),
      Resolution::Command { command, .. } if command == "local-g"
    ));

    assert!(state.disable_mode(buffer, "two"));
    state.keymaps_mut().buffer_mut(buffer).unbind(&keys("g"));
    assert!(matches!(
      state.resolve(&keys("g")),
      Resolution::Command { command, .. } if command == "one-g"
    ));
  }

  #[test]
  fn editing_at_point() {
    let mut state = EditorState::default();
    state.insert("one\ntwo");
    assert_eq!(state.delete_chars(2, Direction::Backward), 2);
    assert_eq!(state.selected_buffer().contents(), "one\nt");

    state.move_point(|buffer, point| movement::line_beginning(buffer, point));
    assert_eq!(state.selected_point(), 4);
    state.move_point(|buffer, point| movement::move_lines(buffer, point, Direction::Backward));
    assert_eq!(state.kill_line(), "one");
    assert_eq!(state.kill_line(), "\n");
    assert_eq!(state.selected_buffer().contents(), "t");
  }

  fn apply_state_ops(ops: &[u8]) -> EditorState {
    let mut state = EditorState::default();
    for op in ops {
      let name = ["a", "b", DEFAULT_BUFFER][usize::from(op / 7) % 3];
      match op % 7 {
        0 => {
          let _ = state.split_window(SplitAxis::Horizontal, 0.5);
        },
        1 => {
          let _ = state.split_window(SplitAxis::Vertical, 0.3);
        },
        2 => {
          state.other_window();
        },
        3 => {
          let _ = state.delete_window();
        },
        4 => {
          state.delete_other_windows();
        },
        5 => {
          state.switch_to_buffer(name);
        },
        _ => {
          let _ = state.kill_buffer(name);
        },
      }
    }
    state
  }

  quickcheck::quickcheck! {
      fn prop_windows_always_show_live_buffers(ops: Vec<u8>) -> bool {
          let state = apply_state_ops(&ops);
          state.validate().is_ok()
            && state
              .windows()
              .iter()
              .all(|window| state.window_buffer(*window).and_then(|id| state.buffer(id)).is_some())
      }
  }
}

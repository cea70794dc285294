//! Keymap tries and the layered key resolver.
//!
//! A [`Keymap`] is one layer: a trie from chords to either a command name or
//! a nested prefix node. An explicitly bound empty node is a *blocking
//! prefix*: it claims the sequence for its layer without continuing it.
//!
//! Resolution walks the active layers from most to least specific. The
//! first layer that has any entry for the typed sequence decides the
//! outcome; a layer without an entry is skipped.

use std::{
  collections::HashMap,
  fmt,
};

use serde::Serialize;

use crate::input::{
  KeyChord,
  KeySequence,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTrie {
  Command(String),
  Node(KeyTrieNode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTrieNode {
  map:   HashMap<KeyChord, KeyTrie>,
  order: Vec<KeyChord>,
}

impl KeyTrieNode {
  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }

  pub fn get(&self, chord: &KeyChord) -> Option<&KeyTrie> {
    self.map.get(chord)
  }

  /// Children in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = (&KeyChord, &KeyTrie)> {
    self
      .order
      .iter()
      .filter_map(|chord| self.map.get(chord).map(|trie| (chord, trie)))
  }

  fn insert(&mut self, chord: KeyChord, trie: KeyTrie) -> Option<KeyTrie> {
    let previous = self.map.insert(chord, trie);
    if previous.is_none() {
      self.order.push(chord);
    }
    previous
  }

  fn remove(&mut self, chord: &KeyChord) -> Option<KeyTrie> {
    let removed = self.map.remove(chord)?;
    self.order.retain(|c| c != chord);
    Some(removed)
  }

  fn node_mut(&mut self, chord: KeyChord) -> &mut KeyTrieNode {
    let needs_node = !matches!(self.map.get(&chord), Some(KeyTrie::Node(_)));
    if needs_node {
      self.insert(chord, KeyTrie::Node(KeyTrieNode::default()));
    }
    match self.map.get_mut(&chord) {
      Some(KeyTrie::Node(node)) => node,
      _ => unreachable!("node inserted above"),
    }
  }
}

/// What a single layer says about a key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerLookup<'a> {
  /// The layer has nothing for this sequence.
  Absent,
  Command(&'a str),
  Prefix,
  Blocked,
}

/// One keymap layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keymap {
  root: KeyTrieNode,
}

impl Keymap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.root.is_empty()
  }

  /// Binds `keys` to `command`, replacing whatever was at that position or
  /// along its prefix. Returns the previous entry at the exact position.
  pub fn bind(&mut self, keys: &[KeyChord], command: impl Into<String>) -> Option<KeyTrie> {
    self.set(keys, KeyTrie::Command(command.into()))
  }

  /// Makes `keys` a blocking prefix in this layer.
  pub fn block(&mut self, keys: &[KeyChord]) -> Option<KeyTrie> {
    self.set(keys, KeyTrie::Node(KeyTrieNode::default()))
  }

  fn set(&mut self, keys: &[KeyChord], trie: KeyTrie) -> Option<KeyTrie> {
    let (last, prefix) = keys.split_last()?;
    let mut node = &mut self.root;
    for chord in prefix {
      node = node.node_mut(*chord);
    }
    node.insert(*last, trie)
  }

  /// Removes the entry at `keys` and prunes prefix nodes left empty.
  pub fn unbind(&mut self, keys: &[KeyChord]) -> Option<KeyTrie> {
    fn remove_in(node: &mut KeyTrieNode, keys: &[KeyChord]) -> Option<KeyTrie> {
      let (first, rest) = keys.split_first()?;
      if rest.is_empty() {
        return node.remove(first);
      }
      let KeyTrie::Node(child) = node.map.get_mut(first)? else {
        return None;
      };
      let removed = remove_in(child, rest)?;
      if child.is_empty() {
        node.remove(first);
      }
      Some(removed)
    }
    remove_in(&mut self.root, keys)
  }

  pub fn search(&self, keys: &[KeyChord]) -> Option<&KeyTrie> {
    let (first, rest) = keys.split_first()?;
    let mut trie = self.root.get(first)?;
    for chord in rest {
      trie = match trie {
        KeyTrie::Node(node) => node.get(chord)?,
        KeyTrie::Command(_) => return None,
      };
    }
    Some(trie)
  }

  pub fn lookup(&self, keys: &[KeyChord]) -> LayerLookup<'_> {
    match self.search(keys) {
      None => LayerLookup::Absent,
      Some(KeyTrie::Command(command)) => LayerLookup::Command(command),
      Some(KeyTrie::Node(node)) if node.is_empty() => LayerLookup::Blocked,
      Some(KeyTrie::Node(_)) => LayerLookup::Prefix,
    }
  }

  /// Every command binding in the layer, depth first in insertion order.
  pub fn bindings(&self) -> Vec<(KeySequence, &str)> {
    fn walk<'a>(
      node: &'a KeyTrieNode,
      prefix: &mut Vec<KeyChord>,
      out: &mut Vec<(KeySequence, &'a str)>,
    ) {
      for (chord, trie) in node.iter() {
        prefix.push(*chord);
        match trie {
          KeyTrie::Command(command) => {
            out.push((KeySequence::from(prefix.as_slice()), command.as_str()));
          },
          KeyTrie::Node(child) => walk(child, prefix, out),
        }
        prefix.pop();
      }
    }

    let mut out = Vec::new();
    walk(&self.root, &mut Vec::new(), &mut out);
    out
  }

  /// Drops every binding that points at `command`.
  pub fn unbind_command(&mut self, command: &str) -> usize {
    let targets: Vec<_> = self
      .bindings()
      .into_iter()
      .filter(|(_, bound)| *bound == command)
      .map(|(keys, _)| keys)
      .collect();
    for keys in &targets {
      self.unbind(keys);
    }
    targets.len()
  }
}

/// Where a binding lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "name", rename_all = "kebab-case")]
pub enum LayerScope {
  Buffer(String),
  Mode(String),
  Global,
}

impl fmt::Display for LayerScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Buffer(name) => write!(f, "buffer:{name}"),
      Self::Mode(name) => write!(f, "mode:{name}"),
      Self::Global => f.write_str("global"),
    }
  }
}

/// Active layers, most specific first.
pub type Layers<'a> = [(LayerScope, &'a Keymap)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  Command { command: String, scope: LayerScope },
  Prefix { scope: LayerScope },
  /// Nothing bound, or a blocking prefix claimed the sequence.
  Undefined { blocked_by: Option<LayerScope> },
}

pub fn resolve(layers: &Layers<'_>, keys: &[KeyChord]) -> Resolution {
  for (scope, keymap) in layers {
    match keymap.lookup(keys) {
      LayerLookup::Absent => continue,
      LayerLookup::Command(command) => {
        return Resolution::Command {
          command: command.to_string(),
          scope:   scope.clone(),
        };
      },
      LayerLookup::Prefix => return Resolution::Prefix { scope: scope.clone() },
      LayerLookup::Blocked => {
        return Resolution::Undefined {
          blocked_by: Some(scope.clone()),
        };
      },
    }
  }
  Resolution::Undefined { blocked_by: None }
}

/// Every binding of `command` across the active layers, shadowed ones
/// included.
pub fn where_is(layers: &Layers<'_>, command: &str) -> Vec<(KeySequence, LayerScope)> {
  let mut found = Vec::new();
  for (scope, keymap) in layers {
    let mut bindings: Vec<_> = keymap
      .bindings()
      .into_iter()
      .filter(|(_, bound)| *bound == command)
      .map(|(keys, _)| keys)
      .collect();
    bindings.sort_by_key(|keys| keys.to_string());
    found.extend(bindings.into_iter().map(|keys| (keys, scope.clone())));
  }
  found
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
  Resolved {
    command: String,
    keys:    KeySequence,
    scope:   LayerScope,
  },
  Pending(KeySequence),
  Undefined(KeySequence),
  Cancelled(KeySequence),
}

/// Chord-at-a-time state machine over the layered keymaps.
///
/// The resolver keeps only the pending prefix; layers are passed in on
/// every chord so rebinding between chords takes effect immediately.
#[derive(Debug, Clone)]
pub struct KeyResolver {
  pending: KeySequence,
  cancel:  KeyChord,
}

impl Default for KeyResolver {
  fn default() -> Self {
    Self::new(KeyChord::ctrl('g'))
  }
}

impl KeyResolver {
  pub fn new(cancel: KeyChord) -> Self {
    Self {
      pending: KeySequence::new(),
      cancel,
    }
  }

  pub fn pending(&self) -> &KeySequence {
    &self.pending
  }

  pub fn is_pending(&self) -> bool {
    !self.pending.is_empty()
  }

  pub fn cancel_key(&self) -> KeyChord {
    self.cancel
  }

  pub fn set_cancel_key(&mut self, chord: KeyChord) {
    self.cancel = chord;
  }

  /// Drops any pending prefix.
  pub fn cancel(&mut self) -> Option<KeySequence> {
    if self.pending.is_empty() {
      return None;
    }
    Some(self.pending.take())
  }

  pub fn feed(&mut self, chord: KeyChord, layers: &Layers<'_>) -> KeyOutcome {
    if chord == self.cancel && self.is_pending() {
      let mut keys = self.pending.take();
      keys.push(chord);
      return KeyOutcome::Cancelled(keys);
    }

    self.pending.push(chord);
    match resolve(layers, &self.pending) {
      Resolution::Command { command, scope } => {
        KeyOutcome::Resolved {
          command,
          keys: self.pending.take(),
          scope,
        }
      },
      Resolution::Prefix { .. } => KeyOutcome::Pending(self.pending.clone()),
      Resolution::Undefined { .. } => KeyOutcome::Undefined(self.pending.take()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn keys(s: &str) -> KeySequence {
    s.parse().unwrap()
  }

  #[test]
  fn bind_and_search_nested_sequences() {
    let mut map = Keymap::new();
    map.bind(&keys("C-x C-f"), "find-file");
    map.bind(&keys("C-x 2"), "split-window-below");

    assert_eq!(map.lookup(&keys("C-x")), LayerLookup::Prefix);
    assert_eq!(map.lookup(&keys("C-x C-f")), LayerLookup::Command("find-file"));
    assert_eq!(map.lookup(&keys("C-x 3")), LayerLookup::Absent);
    assert_eq!(map.lookup(&keys("C-x C-f a")), LayerLookup::Absent);
  }

  #[test]
  fn unbind_prunes_empty_prefixes() {
    let mut map = Keymap::new();
    map.bind(&keys("C-c a b"), "deep");
    assert!(map.unbind(&keys("C-c a b")).is_some());
    assert_eq!(map.lookup(&keys("C-c")), LayerLookup::Absent);
    assert!(map.is_empty());
    assert!(map.unbind(&keys("C-c")).is_none());
  }

  #[test]
  fn explicit_empty_node_blocks() {
    let mut map = Keymap::new();
    map.block(&keys("C-x"));
    assert_eq!(map.lookup(&keys("C-x")), LayerLookup::Blocked);
    assert_eq!(map.lookup(&keys("C-x 2")), LayerLookup::Absent);
  }

  #[test]
  fn buffer_layer_shadows_global_only_where_bound() {
    let mut global = Keymap::new();
    global.bind(&keys("g"), "A");
    global.bind(&keys("h"), "H");
    let mut local = Keymap::new();
    local.bind(&keys("g"), "B");

    let layers = [
      (LayerScope::Buffer("notes".into()), &local),
      (LayerScope::Global, &global),
    ];
    assert_eq!(resolve(&layers, &keys("g")), Resolution::Command {
      command: "B".into(),
      scope:   LayerScope::Buffer("notes".into()),
    });
    assert_eq!(resolve(&layers, &keys("h")), Resolution::Command {
      command: "H".into(),
      scope:   LayerScope::Global,
    });

    let global_only = [(LayerScope::Global, &global)];
    assert!(matches!(
      resolve(&global_only, &keys("g")),
      Resolution::Command { command, .. } if command == "A"
    ));
  }

  #[test]
  fn blocking_prefix_hides_lower_layers() {
    let mut global = Keymap::new();
    global.bind(&keys("C-x 2"), "split-window-below");
    let mut mode = Keymap::new();
    mode.block(&keys("C-x"));

    let layers = [
      (LayerScope::Mode("locked".into()), &mode),
      (LayerScope::Global, &global),
    ];
    assert_eq!(resolve(&layers, &keys("C-x")), Resolution::Undefined {
      blocked_by: Some(LayerScope::Mode("locked".into())),
    });
  }

  #[test]
  fn upper_prefix_governs_over_lower_command() {
    let mut global = Keymap::new();
    global.bind(&keys("C-c"), "global-c");
    let mut buffer = Keymap::new();
    buffer.bind(&keys("C-c C-c"), "local-cc");

    let layers = [
      (LayerScope::Buffer("b".into()), &buffer),
      (LayerScope::Global, &global),
    ];
    let mut resolver = KeyResolver::default();
    assert!(matches!(
      resolver.feed(KeyChord::ctrl('c'), &layers),
      KeyOutcome::Pending(_)
    ));
    assert!(matches!(
      resolver.feed(KeyChord::ctrl('c'), &layers),
      KeyOutcome::Resolved { command, .. } if command == "local-cc"
    ));
  }

  #[test]
  fn resolver_walks_pending_to_resolution() {
    let mut global = Keymap::new();
    global.bind(&keys("C-x 2"), "split-window-below");
    let layers = [(LayerScope::Global, &global)];

    let mut resolver = KeyResolver::default();
    assert_eq!(
      resolver.feed(KeyChord::ctrl('x'), &layers),
      KeyOutcome::Pending(keys("C-x"))
    );
    assert_eq!(resolver.pending(), &keys("C-x"));
    assert_eq!(
      resolver.feed("2".parse().unwrap(), &layers),
      KeyOutcome::Resolved {
        command: "split-window-below".into(),
        keys:    keys("C-x 2"),
        scope:   LayerScope::Global,
      }
    );
    assert!(!resolver.is_pending());
  }

  #[test]
  fn undefined_continuation_discards_prefix() {
    let mut global = Keymap::new();
    global.bind(&keys("C-x 2"), "split-window-below");
    let layers = [(LayerScope::Global, &global)];

    let mut resolver = KeyResolver::default();
    resolver.feed(KeyChord::ctrl('x'), &layers);
    assert_eq!(
      resolver.feed("9".parse().unwrap(), &layers),
      KeyOutcome::Undefined(keys("C-x 9"))
    );
    assert!(!resolver.is_pending());
  }

  #[test]
  fn cancel_key_while_pending_returns_to_idle() {
    let mut global = Keymap::new();
    global.bind(&keys("C-x 2"), "split-window-below");
    global.bind(&keys("C-g"), "keyboard-quit");
    let layers = [(LayerScope::Global, &global)];

    let mut resolver = KeyResolver::default();
    resolver.feed(KeyChord::ctrl('x'), &layers);
    assert_eq!(
      resolver.feed(KeyChord::ctrl('g'), &layers),
      KeyOutcome::Cancelled(keys("C-x C-g"))
    );
    assert!(!resolver.is_pending());

    // From idle the cancel key is an ordinary binding.
    assert!(matches!(
      resolver.feed(KeyChord::ctrl('g'), &layers),
      KeyOutcome::Resolved { command, .. } if command == "keyboard-quit"
    ));
  }

  #[test]
  fn rebinding_between_chords_is_observed() {
    let mut global = Keymap::new();
    global.bind(&keys("C-c x"), "old");
    let mut resolver = KeyResolver::default();
    resolver.feed(KeyChord::ctrl('c'), &[(LayerScope::Global, &global)]);

    global.bind(&keys("C-c x"), "new");
    assert!(matches!(
      resolver.feed("x".parse().unwrap(), &[(LayerScope::Global, &global)]),
      KeyOutcome::Resolved { command, .. } if command == "new"
    ));
  }

  #[test]
  fn where_is_lists_every_layer() {
    let mut global = Keymap::new();
    global.bind(&keys("C-n"), "next-line");
    global.bind(&keys("<down>"), "next-line");
    let mut mode = Keymap::new();
    mode.bind(&keys("j"), "next-line");

    let layers = [
      (LayerScope::Mode("vi".into()), &mode),
      (LayerScope::Global, &global),
    ];
    let found = where_is(&layers, "next-line");
    assert_eq!(found, vec![
      (keys("j"), LayerScope::Mode("vi".into())),
      (keys("<down>"), LayerScope::Global),
      (keys("C-n"), LayerScope::Global),
    ]);
    assert_eq!(LayerScope::Mode("vi".into()).to_string(), "mode:vi");
  }

  #[test]
  fn unbind_command_drops_all_its_keys() {
    let mut map = Keymap::new();
    map.bind(&keys("a"), "x");
    map.bind(&keys("C-c b"), "x");
    map.bind(&keys("C-c c"), "y");
    assert_eq!(map.unbind_command("x"), 2);
    assert_eq!(map.bindings().len(), 1);
  }
}

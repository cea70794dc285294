//! Key chords and key sequences.
//!
//! Textual form follows the usual `C-M-S-x` convention: modifiers are
//! written in that fixed order, the base key is lowercased, and a sequence
//! is whitespace-separated chords (`C-x C-f`).

use std::{
  fmt,
  ops::Deref,
  str::FromStr,
};

use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer,
};
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
  bits: u8,
}

impl Modifiers {
  pub const CTRL: u8 = 0b0000_0001;
  pub const META: u8 = 0b0000_0010;
  pub const SHIFT: u8 = 0b0000_0100;

  #[must_use]
  pub const fn empty() -> Self {
    Self { bits: 0 }
  }

  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.bits == 0
  }

  #[must_use]
  pub const fn ctrl(self) -> bool {
    (self.bits & Self::CTRL) != 0
  }

  #[must_use]
  pub const fn meta(self) -> bool {
    (self.bits & Self::META) != 0
  }

  #[must_use]
  pub const fn shift(self) -> bool {
    (self.bits & Self::SHIFT) != 0
  }

  #[must_use]
  pub const fn with(mut self, bits: u8) -> Self {
    self.bits |= bits;
    self
  }

  pub fn insert(&mut self, bits: u8) {
    self.bits |= bits;
  }

  pub const fn contains(self, bits: u8) -> bool {
    (self.bits & bits) == bits
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
  Char(char),
  Enter,
  Escape,
  Backspace,
  Tab,
  Delete,
  Insert,
  Home,
  End,
  PageUp,
  PageDown,
  Left,
  Right,
  Up,
  Down,
  F(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseKeyError {
  #[error("empty key sequence")]
  EmptySequence,
  #[error("empty key")]
  EmptyChord,
  #[error("unknown key modifier '{0}-'")]
  UnknownModifier(String),
  #[error("repeated key modifier '{0}-'")]
  RepeatedModifier(String),
  #[error("unknown key '{0}'")]
  UnknownKey(String),
}

/// A single key press together with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
  pub key:       Key,
  pub modifiers: Modifiers,
}

impl KeyChord {
  pub const fn new(key: Key) -> Self {
    Self {
      key,
      modifiers: Modifiers::empty(),
    }
  }

  pub const fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
    Self { key, modifiers }
  }

  pub const fn ctrl(c: char) -> Self {
    Self::with_modifiers(Key::Char(c), Modifiers::empty().with(Modifiers::CTRL))
  }

  /// Chord produced by typing `c` on a keyboard: uppercase letters become
  /// the lowercase key with shift held.
  pub fn from_char(c: char) -> Self {
    match c {
      '\n' | '\r' => Self::new(Key::Enter),
      '\t' => Self::new(Key::Tab),
      c if c.is_uppercase() => {
        let lower = c.to_lowercase().next().unwrap_or(c);
        Self::with_modifiers(Key::Char(lower), Modifiers::empty().with(Modifiers::SHIFT))
      },
      c => Self::new(Key::Char(c)),
    }
  }

  /// The character this chord inserts when it is not bound to anything.
  pub fn printable(&self) -> Option<char> {
    let Key::Char(c) = self.key else {
      return None;
    };
    if c.is_control() || self.modifiers.ctrl() || self.modifiers.meta() {
      return None;
    }
    if self.modifiers.shift() {
      return c.to_uppercase().next();
    }
    Some(c)
  }
}

impl fmt::Display for KeyChord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.modifiers.ctrl() {
      f.write_str("C-")?;
    }
    if self.modifiers.meta() {
      f.write_str("M-")?;
    }
    if self.modifiers.shift() {
      f.write_str("S-")?;
    }

    match self.key {
      Key::Char(' ') => f.write_str("SPC"),
      Key::Char(c) => write!(f, "{c}"),
      Key::Enter => f.write_str("RET"),
      Key::Escape => f.write_str("ESC"),
      Key::Backspace => f.write_str("DEL"),
      Key::Tab => f.write_str("TAB"),
      Key::Delete => f.write_str("<delete>"),
      Key::Insert => f.write_str("<insert>"),
      Key::Home => f.write_str("<home>"),
      Key::End => f.write_str("<end>"),
      Key::PageUp => f.write_str("<prior>"),
      Key::PageDown => f.write_str("<next>"),
      Key::Left => f.write_str("<left>"),
      Key::Right => f.write_str("<right>"),
      Key::Up => f.write_str("<up>"),
      Key::Down => f.write_str("<down>"),
      Key::F(n) => write!(f, "<f{n}>"),
    }
  }
}

impl FromStr for KeyChord {
  type Err = ParseKeyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
      return Err(ParseKeyError::EmptyChord);
    }

    let (prefix, key_token) = if trimmed == "-" {
      ("", "-")
    } else if let Some(prefix) = trimmed.strip_suffix("--") {
      (prefix, "-")
    } else {
      match trimmed.rsplit_once('-') {
        Some((prefix, key)) => (prefix, key),
        None => ("", trimmed),
      }
    };

    let mut modifiers = Modifiers::empty();
    for token in prefix.split('-') {
      let modifier = token.trim();
      if modifier.is_empty() {
        continue;
      }
      let bit = match modifier.to_ascii_uppercase().as_str() {
        "C" | "CTRL" | "CONTROL" => Modifiers::CTRL,
        "M" | "META" | "A" | "ALT" => Modifiers::META,
        "S" | "SHIFT" => Modifiers::SHIFT,
        _ => return Err(ParseKeyError::UnknownModifier(modifier.to_string())),
      };
      if modifiers.contains(bit) {
        return Err(ParseKeyError::RepeatedModifier(modifier.to_string()));
      }
      modifiers.insert(bit);
    }

    Ok(Self {
      key: parse_key_token(key_token)?,
      modifiers,
    })
  }
}

fn parse_key_token(token: &str) -> Result<Key, ParseKeyError> {
  let mut chars = token.chars();
  match (chars.next(), chars.next()) {
    (None, _) => return Err(ParseKeyError::EmptyChord),
    (Some(c), None) => return Ok(Key::Char(c.to_lowercase().next().unwrap_or(c))),
    _ => {},
  }

  let name = token
    .strip_prefix('<')
    .and_then(|rest| rest.strip_suffix('>'))
    .unwrap_or(token)
    .to_ascii_lowercase();

  let key = match name.as_str() {
    "spc" | "space" => Key::Char(' '),
    "minus" => Key::Char('-'),
    "ret" | "return" | "enter" => Key::Enter,
    "esc" | "escape" => Key::Escape,
    "del" | "backspace" | "bs" => Key::Backspace,
    "tab" => Key::Tab,
    "delete" | "deletechar" => Key::Delete,
    "insert" | "ins" => Key::Insert,
    "home" => Key::Home,
    "end" => Key::End,
    "prior" | "pageup" | "pgup" => Key::PageUp,
    "next" | "pagedown" | "pgdown" => Key::PageDown,
    "left" => Key::Left,
    "right" => Key::Right,
    "up" => Key::Up,
    "down" => Key::Down,
    other => {
      match other.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        Some(n @ 1..=12) => Key::F(n),
        _ => return Err(ParseKeyError::UnknownKey(token.to_string())),
      }
    },
  };
  Ok(key)
}

/// Ordered chords, e.g. `C-x C-f`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeySequence(SmallVec<[KeyChord; 4]>);

impl KeySequence {
  pub fn new() -> Self {
    Self(SmallVec::new())
  }

  pub fn push(&mut self, chord: KeyChord) {
    self.0.push(chord);
  }

  pub fn clear(&mut self) {
    self.0.clear();
  }

  pub fn take(&mut self) -> Self {
    std::mem::take(self)
  }

  pub fn as_slice(&self) -> &[KeyChord] {
    &self.0
  }
}

impl Deref for KeySequence {
  type Target = [KeyChord];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl From<&[KeyChord]> for KeySequence {
  fn from(chords: &[KeyChord]) -> Self {
    Self(chords.iter().copied().collect())
  }
}

impl From<KeyChord> for KeySequence {
  fn from(chord: KeyChord) -> Self {
    Self(std::iter::once(chord).collect())
  }
}

impl FromIterator<KeyChord> for KeySequence {
  fn from_iter<T: IntoIterator<Item = KeyChord>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl FromStr for KeySequence {
  type Err = ParseKeyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let chords = s
      .split_whitespace()
      .map(KeyChord::from_str)
      .collect::<Result<SmallVec<_>, _>>()?;
    if chords.is_empty() {
      return Err(ParseKeyError::EmptySequence);
    }
    Ok(Self(chords))
  }
}

impl fmt::Display for KeySequence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, chord) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(" ")?;
      }
      write!(f, "{chord}")?;
    }
    Ok(())
  }
}

impl Serialize for KeySequence {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for KeySequence {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chord(s: &str) -> KeyChord {
    s.parse().unwrap()
  }

  #[test]
  fn parses_modifier_aliases_in_canonical_order() {
    assert_eq!(chord("C-x"), KeyChord::ctrl('x'));
    assert_eq!(chord("ctrl-x"), KeyChord::ctrl('x'));
    assert_eq!(chord("S-M-C-a").to_string(), "C-M-S-a");
    assert_eq!(chord("alt-f").to_string(), "M-f");
    assert_eq!(chord("Meta-Shift-<left>").to_string(), "M-S-<left>");
  }

  #[test]
  fn base_key_is_lowercased() {
    assert_eq!(chord("C-X"), KeyChord::ctrl('x'));
    assert_eq!(chord("Q"), KeyChord::new(Key::Char('q')));
  }

  #[test]
  fn parses_named_keys() {
    assert_eq!(chord("RET").key, Key::Enter);
    assert_eq!(chord("DEL").key, Key::Backspace);
    assert_eq!(chord("<delete>").key, Key::Delete);
    assert_eq!(chord("SPC").key, Key::Char(' '));
    assert_eq!(chord("f5").key, Key::F(5));
    assert_eq!(chord("C--"), KeyChord::ctrl('-'));
    assert_eq!(chord("-").key, Key::Char('-'));
  }

  #[test]
  fn rejects_bad_chords() {
    assert_eq!(
      "H-x".parse::<KeyChord>(),
      Err(ParseKeyError::UnknownModifier("H".into()))
    );
    assert_eq!(
      "C-ctrl-x".parse::<KeyChord>(),
      Err(ParseKeyError::RepeatedModifier("ctrl".into()))
    );
    assert_eq!(
      "C-banana".parse::<KeyChord>(),
      Err(ParseKeyError::UnknownKey("banana".into()))
    );
    assert_eq!("f13".parse::<KeyChord>(), Err(ParseKeyError::UnknownKey("f13".into())));
  }

  #[test]
  fn sequence_round_trips_through_display() {
    let seq: KeySequence = "C-x   C-f".parse().unwrap();
    assert_eq!(seq.len(), 2);
    assert_eq!(seq.to_string(), "C-x C-f");
    assert_eq!("".parse::<KeySequence>(), Err(ParseKeyError::EmptySequence));
    assert_eq!("   ".parse::<KeySequence>(), Err(ParseKeyError::EmptySequence));
  }

  #[test]
  fn printable_ignores_command_modifiers() {
    assert_eq!(KeyChord::from_char('a').printable(), Some('a'));
    assert_eq!(KeyChord::from_char('A').printable(), Some('A'));
    assert_eq!(KeyChord::from_char('A').to_string(), "S-a");
    assert_eq!(KeyChord::ctrl('a').printable(), None);
    assert_eq!(KeyChord::new(Key::Enter).printable(), None);
  }
}

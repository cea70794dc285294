//! Named text buffers.
//!
//! Offsets are char indices into the rope. Every positional argument is
//! clamped to the buffer, so callers can pass stale points safely.

use std::{
  num::NonZeroUsize,
  ops::Range,
};

use ropey::Rope;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BufferId(NonZeroUsize);

impl BufferId {
  pub const fn new(id: NonZeroUsize) -> Self {
    Self(id)
  }

  pub const fn get(self) -> NonZeroUsize {
    self.0
  }
}

impl From<NonZeroUsize> for BufferId {
  fn from(value: NonZeroUsize) -> Self {
    Self::new(value)
  }
}

#[derive(Debug, Clone)]
pub struct Buffer {
  id:       BufferId,
  name:     String,
  text:     Rope,
  modified: bool,
}

impl Buffer {
  pub fn new(id: BufferId, name: impl Into<String>, text: &str) -> Self {
    Self {
      id,
      name: name.into(),
      text: Rope::from_str(text),
      modified: false,
    }
  }

  pub fn id(&self) -> BufferId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn contents(&self) -> String {
    self.text.to_string()
  }

  pub fn len_chars(&self) -> usize {
    self.text.len_chars()
  }

  pub fn is_empty(&self) -> bool {
    self.text.len_chars() == 0
  }

  pub fn is_modified(&self) -> bool {
    self.modified
  }

  pub fn set_modified(&mut self, modified: bool) {
    self.modified = modified;
  }

  pub fn clamp(&self, offset: usize) -> usize {
    offset.min(self.text.len_chars())
  }

  /// Inserts `text` at `offset` and returns the offset just past it.
  pub fn insert(&mut self, offset: usize, text: &str) -> usize {
    let at = self.clamp(offset);
    if text.is_empty() {
      return at;
    }
    self.text.insert(at, text);
    self.modified = true;
    at + text.chars().count()
  }

  /// Removes the clamped range and returns the number of chars removed.
  pub fn remove(&mut self, range: Range<usize>) -> usize {
    let start = self.clamp(range.start);
    let end = self.clamp(range.end).max(start);
    if start == end {
      return 0;
    }
    self.text.remove(start..end);
    self.modified = true;
    end - start
  }

  pub fn replace_contents(&mut self, text: &str) {
    self.text = Rope::from_str(text);
    self.modified = true;
  }

  /// Zero-based line and column of `offset`.
  pub fn position(&self, offset: usize) -> (usize, usize) {
    let offset = self.clamp(offset);
    let line = self.text.char_to_line(offset);
    (line, offset - self.text.line_to_char(line))
  }

  pub fn line_count(&self) -> usize {
    self.text.len_lines()
  }

  pub fn line_start(&self, line: usize) -> usize {
    let line = line.min(self.text.len_lines().saturating_sub(1));
    self.text.line_to_char(line)
  }

  /// Offset of the end of `line`, before its line break.
  pub fn line_end(&self, line: usize) -> usize {
    let line = line.min(self.text.len_lines().saturating_sub(1));
    let slice = self.text.line(line);
    let mut len = slice.len_chars();
    if len > 0 && slice.char(len - 1) == '\n' {
      len -= 1;
      if len > 0 && slice.char(len - 1) == '\r' {
        len -= 1;
      }
    }
    self.text.line_to_char(line) + len
  }

  /// Offset at `col` on `line`, clamped to the line's end.
  pub fn offset_at(&self, line: usize, col: usize) -> usize {
    let start = self.line_start(line);
    (start + col).min(self.line_end(line))
  }
}

//! Point motion over a [`Buffer`].
//!
//! All functions are pure: they take a point and return a new one (or a
//! range to delete) without touching the buffer.

use std::ops::Range;

use crate::buffer::Buffer;

/// The direction of point movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
  /// Toward the end of the buffer.
  Forward,
  /// Toward the start of the buffer.
  Backward,
}

pub fn move_chars(buffer: &Buffer, point: usize, count: usize, dir: Direction) -> usize {
  let point = buffer.clamp(point);
  match dir {
    Direction::Forward => buffer.clamp(point.saturating_add(count)),
    Direction::Backward => point.saturating_sub(count),
  }
}

pub fn line_beginning(buffer: &Buffer, point: usize) -> usize {
  let (line, _) = buffer.position(point);
  buffer.line_start(line)
}

pub fn line_end(buffer: &Buffer, point: usize) -> usize {
  let (line, _) = buffer.position(point);
  buffer.line_end(line)
}

/// Moves to the same column on the next or previous line, clamped to that
/// line's length. Stays put on the first or last line.
pub fn move_lines(buffer: &Buffer, point: usize, dir: Direction) -> usize {
  let (line, col) = buffer.position(point);
  let target = match dir {
    Direction::Forward if line + 1 < buffer.line_count() => line + 1,
    Direction::Backward if line > 0 => line - 1,
    _ => return buffer.clamp(point),
  };
  buffer.offset_at(target, col)
}

/// Range removed by deleting `count` chars in `dir` from `point`.
pub fn char_range(buffer: &Buffer, point: usize, count: usize, dir: Direction) -> Range<usize> {
  let point = buffer.clamp(point);
  let other = move_chars(buffer, point, count, dir);
  point.min(other)..point.max(other)
}

/// Range removed by `kill-line`: the rest of the line, or the line break
/// itself when point is already at the end of the line.
pub fn kill_line_range(buffer: &Buffer, point: usize) -> Range<usize> {
  let point = buffer.clamp(point);
  let end = line_end(buffer, point);
  if end > point {
    return point..end;
  }
  let (line, _) = buffer.position(point);
  if line + 1 < buffer.line_count() {
    point..buffer.line_start(line + 1)
  } else {
    point..point
  }
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use super::*;
  use crate::buffer::BufferId;

  fn buffer(text: &str) -> Buffer {
    Buffer::new(BufferId::new(NonZeroUsize::MIN), "test", text)
  }

  #[test]
  fn move_chars_clamps_at_both_ends() {
    let buf = buffer("abc");
    assert_eq!(move_chars(&buf, 1, 10, Direction::Forward), 3);
    assert_eq!(move_chars(&buf, 1, 10, Direction::Backward), 0);
  }

  #[test]
  fn line_motion_preserves_column_when_possible() {
    let buf = buffer("hello\nhi\nworld");
    assert_eq!(move_lines(&buf, 4, Direction::Forward), 8);
    assert_eq!(move_lines(&buf, 8, Direction::Forward), 11);
    assert_eq!(move_lines(&buf, 11, Direction::Forward), 11);
    assert_eq!(move_lines(&buf, 11, Direction::Backward), 8);
    assert_eq!(move_lines(&buf, 2, Direction::Backward), 2);
  }

  #[test]
  fn line_edges() {
    let buf = buffer("one\ntwo");
    assert_eq!(line_beginning(&buf, 6), 4);
    assert_eq!(line_end(&buf, 1), 3);
    assert_eq!(line_end(&buf, 5), 7);
  }

  #[test]
  fn kill_line_takes_rest_of_line_then_newline() {
    let buf = buffer("one\ntwo");
    assert_eq!(kill_line_range(&buf, 1), 1..3);
    assert_eq!(kill_line_range(&buf, 3), 3..4);
    assert_eq!(kill_line_range(&buf, 7), 7..7);
  }
}

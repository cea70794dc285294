use serde::Serialize;

/// Cell-based rectangle used for window layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rect {
  pub x:      u16,
  pub y:      u16,
  pub width:  u16,
  pub height: u16,
}

impl Rect {
  pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub const fn area(self) -> usize {
    self.width as usize * self.height as usize
  }

  pub const fn right(self) -> u16 {
    self.x.saturating_add(self.width)
  }

  pub const fn bottom(self) -> u16 {
    self.y.saturating_add(self.height)
  }

  pub const fn intersects(self, other: Rect) -> bool {
    self.x < other.right()
      && other.x < self.right()
      && self.y < other.bottom()
      && other.y < self.bottom()
  }
}

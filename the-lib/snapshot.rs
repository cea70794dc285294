//! Immutable render snapshots handed to front ends.
//!
//! A snapshot owns all of its data, so a front end can hold on to it while
//! the editor keeps mutating.

use serde::Serialize;

use crate::{
  editor::EditorState,
  graphics::Rect,
  split_tree::{
    SplitAxis,
    SplitNode,
    SplitNodeId,
    WindowId,
  },
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LayoutSnapshot {
  Window {
    window: WindowId,
  },
  Split {
    axis:   SplitAxis,
    ratio:  f32,
    first:  Box<LayoutSnapshot>,
    second: Box<LayoutSnapshot>,
  },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
  pub window:   WindowId,
  pub buffer:   String,
  pub text:     String,
  pub cursor:   usize,
  /// Zero-based.
  pub line:     usize,
  pub col:      usize,
  pub modes:    Vec<String>,
  pub selected: bool,
  pub modified: bool,
  pub rect:     Rect,
  pub status:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
  pub layout:       LayoutSnapshot,
  /// Windows in layout order.
  pub windows:      Vec<WindowSnapshot>,
  pub selected:     WindowId,
  pub echo:         Option<String>,
  pub pending_keys: Option<String>,
}

impl RenderSnapshot {
  pub fn selected_window(&self) -> Option<&WindowSnapshot> {
    self.windows.iter().find(|window| window.selected)
  }
}

impl EditorState {
  pub fn snapshot(&self, area: Rect) -> RenderSnapshot {
    let selected = self.selected_window();
    let windows = self
      .tree()
      .layout(area)
      .into_iter()
      .filter_map(|(window, rect)| self.window_snapshot(window, rect, window == selected))
      .collect();

    RenderSnapshot {
      layout: self.layout_snapshot(self.tree().root()),
      windows,
      selected,
      echo: self.echo().text().map(str::to_string),
      pending_keys: self
        .resolver()
        .is_pending()
        .then(|| format!("{}-", self.resolver().pending())),
    }
  }

  fn window_snapshot(&self, window: WindowId, rect: Rect, selected: bool) -> Option<WindowSnapshot> {
    let buffer = self.buffer(self.window_buffer(window)?)?;
    let cursor = self.point(window);
    let (line, col) = buffer.position(cursor);
    let modes = self.modes(buffer.id()).to_vec();

    let mut status = format!(
      "{} {}  L{} C{}",
      if buffer.is_modified() { "**" } else { "--" },
      buffer.name(),
      line + 1,
      col
    );
    if !modes.is_empty() {
      status.push_str(&format!("  ({})", modes.join(" ")));
    }

    Some(WindowSnapshot {
      window,
      buffer: buffer.name().to_string(),
      text: buffer.contents(),
      cursor,
      line,
      col,
      modes,
      selected,
      modified: buffer.is_modified(),
      rect,
      status,
    })
  }

  fn layout_snapshot(&self, node: SplitNodeId) -> LayoutSnapshot {
    match self.tree().node(node) {
      Some(SplitNode::Branch {
        axis,
        ratio,
        first,
        second,
      }) => {
        LayoutSnapshot::Split {
          axis,
          ratio,
          first: Box::new(self.layout_snapshot(first)),
          second: Box::new(self.layout_snapshot(second)),
        }
      },
      Some(SplitNode::Leaf { window }) => LayoutSnapshot::Window { window },
      None => {
        LayoutSnapshot::Window {
          window: self.selected_window(),
        }
      },
    }
  }
}

//! Window layout as a binary split tree.
//!
//! Every leaf is a window; every branch splits its area between two
//! children along an axis. Exactly one window is selected at all times, and
//! every mutation is checked up front so a rejected operation leaves the
//! tree untouched. Buffer assignment lives outside the tree (see
//! [`crate::editor::EditorState`]).

use std::{
  collections::{
    BTreeMap,
    BTreeSet,
  },
  num::NonZeroUsize,
};

use serde::Serialize;
use thiserror::Error;

use crate::graphics::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WindowId(NonZeroUsize);

impl WindowId {
  pub const fn new(id: NonZeroUsize) -> Self {
    Self(id)
  }

  pub const fn get(self) -> NonZeroUsize {
    self.0
  }
}

impl From<NonZeroUsize> for WindowId {
  fn from(value: NonZeroUsize) -> Self {
    Self::new(value)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SplitNodeId(NonZeroUsize);

impl SplitNodeId {
  pub const fn new(id: NonZeroUsize) -> Self {
    Self(id)
  }

  pub const fn get(self) -> NonZeroUsize {
    self.0
  }
}

/// Direction in which a branch divides its area.
///
/// `Horizontal` stacks the children top and bottom (a horizontal divider),
/// `Vertical` places them side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitAxis {
  Horizontal,
  Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitNode {
  Leaf {
    window: WindowId,
  },
  Branch {
    axis:   SplitAxis,
    ratio:  f32,
    first:  SplitNodeId,
    second: SplitNodeId,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SplitTreeError {
  #[error("split ratio {0} is outside (0, 1)")]
  InvalidRatio(f32),
  #[error("cannot delete the only window")]
  LastWindow,
  #[error("no such window: {}", .0.get())]
  UnknownWindow(WindowId),
  #[error("split tree is corrupt")]
  Corrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantError {
  #[error("tree has no nodes")]
  EmptyTree,
  #[error("root node is missing")]
  MissingRoot,
  #[error("root node has a parent")]
  RootHasParent,
  #[error("parent link does not match traversal")]
  ParentMismatch,
  #[error("node is missing")]
  MissingNode,
  #[error("branch references unknown child")]
  UnknownChild,
  #[error("node visited twice")]
  DuplicateVisit,
  #[error("node unreachable from root")]
  UnreachableNode,
  #[error("window table disagrees with leaves")]
  WindowMismatch,
  #[error("selected window is not a leaf")]
  MissingSelection,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NodeState {
  parent: Option<SplitNodeId>,
  node:   SplitNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitTree {
  root:           SplitNodeId,
  selected:       WindowId,
  nodes:          BTreeMap<SplitNodeId, NodeState>,
  window_nodes:   BTreeMap<WindowId, SplitNodeId>,
  next_node_id:   NonZeroUsize,
  next_window_id: NonZeroUsize,
}

impl Default for SplitTree {
  fn default() -> Self {
    Self::new()
  }
}

impl SplitTree {
  pub fn new() -> Self {
    let root = SplitNodeId::new(NonZeroUsize::MIN);
    let selected = WindowId::new(NonZeroUsize::MIN);

    let mut nodes = BTreeMap::new();
    nodes.insert(root, NodeState {
      parent: None,
      node:   SplitNode::Leaf { window: selected },
    });

    let mut window_nodes = BTreeMap::new();
    window_nodes.insert(selected, root);

    Self {
      root,
      selected,
      nodes,
      window_nodes,
      next_node_id: NonZeroUsize::MIN.saturating_add(1),
      next_window_id: NonZeroUsize::MIN.saturating_add(1),
    }
  }

  pub fn root(&self) -> SplitNodeId {
    self.root
  }

  pub fn selected(&self) -> WindowId {
    self.selected
  }

  pub fn window_count(&self) -> usize {
    self.window_nodes.len()
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  pub fn contains(&self, window: WindowId) -> bool {
    self.window_nodes.contains_key(&window)
  }

  pub fn node(&self, id: SplitNodeId) -> Option<SplitNode> {
    self.nodes.get(&id).map(|state| state.node)
  }

  pub fn select(&mut self, window: WindowId) -> Result<(), SplitTreeError> {
    if !self.contains(window) {
      return Err(SplitTreeError::UnknownWindow(window));
    }
    self.selected = window;
    Ok(())
  }

  /// Windows in pre-order (first child before second).
  pub fn windows(&self) -> Vec<WindowId> {
    self
      .leaf_order()
      .into_iter()
      .filter_map(|id| self.leaf_window(id))
      .collect()
  }

  /// Splits the selected window. The selected window becomes the first
  /// child and stays selected; the returned id is the new second child.
  pub fn split(&mut self, axis: SplitAxis, ratio: f32) -> Result<WindowId, SplitTreeError> {
    if !(ratio > 0.0 && ratio < 1.0) {
      return Err(SplitTreeError::InvalidRatio(ratio));
    }

    let window = self.selected;
    let leaf_id = *self
      .window_nodes
      .get(&window)
      .ok_or(SplitTreeError::UnknownWindow(window))?;

    let parent = self.node_parent(leaf_id);
    let first_leaf = self.alloc_node_id();
    let second_leaf = self.alloc_node_id();
    let new_window = self.alloc_window_id();

    self.nodes.insert(first_leaf, NodeState {
      parent: Some(leaf_id),
      node:   SplitNode::Leaf { window },
    });
    self.nodes.insert(second_leaf, NodeState {
      parent: Some(leaf_id),
      node:   SplitNode::Leaf { window: new_window },
    });
    self.nodes.insert(leaf_id, NodeState {
      parent,
      node: SplitNode::Branch {
        axis,
        ratio,
        first: first_leaf,
        second: second_leaf,
      },
    });

    self.window_nodes.insert(window, first_leaf);
    self.window_nodes.insert(new_window, second_leaf);

    debug_assert!(self.validate().is_ok());
    Ok(new_window)
  }

  /// Removes the selected window and returns its id. The sibling subtree
  /// takes the parent's place and its first window becomes selected.
  pub fn delete_selected(&mut self) -> Result<WindowId, SplitTreeError> {
    if self.window_count() <= 1 {
      return Err(SplitTreeError::LastWindow);
    }

    let closing = self.selected;
    let closing_leaf = *self
      .window_nodes
      .get(&closing)
      .ok_or(SplitTreeError::UnknownWindow(closing))?;
    let parent = self
      .node_parent(closing_leaf)
      .ok_or(SplitTreeError::Corrupt)?;

    let (first, second) = match self.node(parent).ok_or(SplitTreeError::Corrupt)? {
      SplitNode::Branch { first, second, .. } => (first, second),
      SplitNode::Leaf { .. } => return Err(SplitTreeError::Corrupt),
    };
    let sibling = if first == closing_leaf { second } else { first };
    let next_selected = self
      .first_leaf_window(sibling)
      .ok_or(SplitTreeError::Corrupt)?;
    let grand_parent = self.node_parent(parent);

    // Resolve the grandparent slot before touching anything.
    let slot = match grand_parent {
      Some(gp) => {
        match self.node(gp).ok_or(SplitTreeError::Corrupt)? {
          SplitNode::Branch { first, .. } if first == parent => Some((gp, true)),
          SplitNode::Branch { second, .. } if second == parent => Some((gp, false)),
          _ => return Err(SplitTreeError::Corrupt),
        }
      },
      None => None,
    };

    self.nodes.remove(&closing_leaf);
    self.window_nodes.remove(&closing);
    self.nodes.remove(&parent);

    match slot {
      Some((gp, is_first)) => {
        if let Some(NodeState {
          node: SplitNode::Branch { first, second, .. },
          ..
        }) = self.nodes.get_mut(&gp)
        {
          if is_first {
            *first = sibling;
          } else {
            *second = sibling;
          }
        }
        self.set_parent(sibling, Some(gp));
      },
      None => {
        self.root = sibling;
        self.set_parent(sibling, None);
      },
    }

    self.selected = next_selected;

    debug_assert!(self.validate().is_ok());
    Ok(closing)
  }

  /// Collapses the tree to the selected window and returns the removed
  /// windows. A single-window tree is left as is.
  pub fn delete_other(&mut self) -> Vec<WindowId> {
    if self.window_count() <= 1 {
      return Vec::new();
    }

    let selected = self.selected;
    let removed: Vec<_> = self
      .windows()
      .into_iter()
      .filter(|window| *window != selected)
      .collect();

    let root = self.alloc_node_id();
    self.nodes.clear();
    self.nodes.insert(root, NodeState {
      parent: None,
      node:   SplitNode::Leaf { window: selected },
    });
    self.window_nodes.clear();
    self.window_nodes.insert(selected, root);
    self.root = root;

    debug_assert!(self.validate().is_ok());
    removed
  }

  /// Moves the selection forward (or backward) in pre-order, wrapping.
  /// Returns `false` when there is nothing else to select.
  pub fn cycle_selection(&mut self, forward: bool) -> bool {
    let windows = self.windows();
    if windows.len() <= 1 {
      return false;
    }
    let Some(current) = windows.iter().position(|w| *w == self.selected) else {
      return false;
    };
    let next = if forward {
      (current + 1) % windows.len()
    } else {
      (current + windows.len() - 1) % windows.len()
    };
    self.selected = windows[next];
    true
  }

  pub fn select_other(&mut self) -> bool {
    self.cycle_selection(true)
  }

  pub fn select_previous(&mut self) -> bool {
    self.cycle_selection(false)
  }

  pub fn layout(&self, area: Rect) -> Vec<(WindowId, Rect)> {
    let mut windows = Vec::with_capacity(self.window_count());
    let mut stack = vec![(self.root, area)];
    while let Some((node_id, rect)) = stack.pop() {
      let Some(node) = self.node(node_id) else {
        continue;
      };
      match node {
        SplitNode::Leaf { window } => windows.push((window, rect)),
        SplitNode::Branch {
          axis,
          ratio,
          first,
          second,
        } => {
          let (first_rect, second_rect) = split_rect(rect, axis, ratio);
          stack.push((second, second_rect));
          stack.push((first, first_rect));
        },
      }
    }
    windows
  }

  pub fn validate(&self) -> Result<(), InvariantError> {
    if self.nodes.is_empty() {
      return Err(InvariantError::EmptyTree);
    }
    if !self.nodes.contains_key(&self.root) {
      return Err(InvariantError::MissingRoot);
    }
    if self.node_parent(self.root).is_some() {
      return Err(InvariantError::RootHasParent);
    }

    let mut visited = BTreeSet::new();
    let mut seen = BTreeMap::new();
    let mut stack = vec![(self.root, None)];

    while let Some((id, expected_parent)) = stack.pop() {
      if !visited.insert(id) {
        return Err(InvariantError::DuplicateVisit);
      }
      let Some(state) = self.nodes.get(&id).copied() else {
        return Err(InvariantError::MissingNode);
      };
      if state.parent != expected_parent {
        return Err(InvariantError::ParentMismatch);
      }

      match state.node {
        SplitNode::Leaf { window } => {
          if seen.insert(window, id).is_some() {
            return Err(InvariantError::WindowMismatch);
          }
        },
        SplitNode::Branch { first, second, .. } => {
          if !self.nodes.contains_key(&first) || !self.nodes.contains_key(&second) {
            return Err(InvariantError::UnknownChild);
          }
          stack.push((first, Some(id)));
          stack.push((second, Some(id)));
        },
      }
    }

    if visited.len() != self.nodes.len() {
      return Err(InvariantError::UnreachableNode);
    }
    if seen != self.window_nodes {
      return Err(InvariantError::WindowMismatch);
    }
    if !self.window_nodes.contains_key(&self.selected) {
      return Err(InvariantError::MissingSelection);
    }

    Ok(())
  }

  fn alloc_node_id(&mut self) -> SplitNodeId {
    let id = self.next_node_id;
    self.next_node_id = id.saturating_add(1);
    SplitNodeId::new(id)
  }

  fn alloc_window_id(&mut self) -> WindowId {
    let id = self.next_window_id;
    self.next_window_id = id.saturating_add(1);
    WindowId::new(id)
  }

  fn leaf_order(&self) -> Vec<SplitNodeId> {
    let mut order = Vec::with_capacity(self.window_count());
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      let Some(state) = self.nodes.get(&id) else {
        continue;
      };
      match state.node {
        SplitNode::Leaf { .. } => order.push(id),
        SplitNode::Branch { first, second, .. } => {
          stack.push(second);
          stack.push(first);
        },
      }
    }
    order
  }

  fn leaf_window(&self, leaf: SplitNodeId) -> Option<WindowId> {
    match self.nodes.get(&leaf)?.node {
      SplitNode::Leaf { window } => Some(window),
      SplitNode::Branch { .. } => None,
    }
  }

  fn first_leaf_window(&self, root: SplitNodeId) -> Option<WindowId> {
    let mut current = root;
    loop {
      match self.nodes.get(&current)?.node {
        SplitNode::Leaf { window } => return Some(window),
        SplitNode::Branch { first, .. } => current = first,
      }
    }
  }

  fn node_parent(&self, id: SplitNodeId) -> Option<SplitNodeId> {
    self.nodes.get(&id).and_then(|state| state.parent)
  }

  fn set_parent(&mut self, child: SplitNodeId, parent: Option<SplitNodeId>) {
    if let Some(state) = self.nodes.get_mut(&child) {
      state.parent = parent;
    }
  }
}

fn split_rect(rect: Rect, axis: SplitAxis, ratio: f32) -> (Rect, Rect) {
  let ratio = ratio.clamp(0.0, 1.0);
  match axis {
    SplitAxis::Vertical => {
      let total = rect.width;
      if total <= 1 {
        let first = Rect::new(rect.x, rect.y, total, rect.height);
        let second = Rect::new(rect.right(), rect.y, 0, rect.height);
        return (first, second);
      }
      let first_width = (((total as f32) * ratio).round() as u16).clamp(1, total - 1);
      let first = Rect::new(rect.x, rect.y, first_width, rect.height);
      let second = Rect::new(rect.x + first_width, rect.y, total - first_width, rect.height);
      (first, second)
    },
    SplitAxis::Horizontal => {
      let total = rect.height;
      if total <= 1 {
        let first = Rect::new(rect.x, rect.y, rect.width, total);
        let second = Rect::new(rect.x, rect.bottom(), rect.width, 0);
        return (first, second);
      }
      let first_height = (((total as f32) * ratio).round() as u16).clamp(1, total - 1);
      let first = Rect::new(rect.x, rect.y, rect.width, first_height);
      let second = Rect::new(rect.x, rect.y + first_height, rect.width, total - first_height);
      (first, second)
    },
  }
}

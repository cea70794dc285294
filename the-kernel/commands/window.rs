use anyhow::{
  Context,
  bail,
};
use the_dispatch::Signature;
use the_lib::{
  split_tree::SplitAxis,
  value::Value,
};

use super::builtin;
use crate::{
  editor::{
    Args,
    CommandOutput,
    Editor,
  },
  event::{
    self,
    HookPayload,
  },
};

const RATIO: Signature = Signature::between(0, 1).named(&["ratio"]);

pub(super) fn register(editor: &Editor) {
  let origin = module_path!();
  builtin(
    editor,
    origin,
    "split-window-below",
    "Split the selected window into two windows stacked vertically. RATIO is the share kept by the upper window.",
    cmd_split_below,
    RATIO,
  );
  builtin(
    editor,
    origin,
    "split-window-right",
    "Split the selected window into two side-by-side windows. RATIO is the share kept by the left window.",
    cmd_split_right,
    RATIO,
  );
  builtin(
    editor,
    origin,
    "other-window",
    "Select the next window in layout order.",
    cmd_other_window,
    Signature::NONE,
  );
  builtin(
    editor,
    origin,
    "delete-window",
    "Delete the selected window. The last window cannot be deleted.",
    cmd_delete_window,
    Signature::NONE,
  );
  builtin(
    editor,
    origin,
    "delete-other-windows",
    "Make the selected window fill the frame.",
    cmd_delete_other_windows,
    Signature::NONE,
  );
}

fn ratio_arg(editor: &Editor, args: &[Value]) -> anyhow::Result<f32> {
  match args.first() {
    None | Some(Value::Nil) => Ok(editor.split_ratio()),
    Some(Value::Float(x)) => Ok(*x as f32),
    Some(Value::Int(n)) => Ok(*n as f32),
    Some(Value::Str(s)) => {
      s.trim()
        .parse::<f32>()
        .with_context(|| format!("ratio must be a number, got \"{s}\""))
    },
    Some(other) => bail!("ratio must be a number, got {}", other.type_name()),
  }
}

fn split(editor: &Editor, args: &[Value], axis: SplitAxis, command: &str) -> CommandOutput {
  let ratio = ratio_arg(editor, args)?;
  editor.with_state_mut(|state| state.split_window(axis, ratio))?;
  layout_changed(editor, command);
  Ok(Value::Nil)
}

fn layout_changed(editor: &Editor, command: &str) {
  editor.emit(&HookPayload::new(event::WINDOW_CONFIGURATION_CHANGE).with_detail(command));
}

fn cmd_split_below(editor: &Editor, args: Args) -> CommandOutput {
  split(editor, &args, SplitAxis::Horizontal, "split-window-below")
}

fn cmd_split_right(editor: &Editor, args: Args) -> CommandOutput {
  split(editor, &args, SplitAxis::Vertical, "split-window-right")
}

fn cmd_other_window(editor: &Editor, _args: Args) -> CommandOutput {
  let before = editor.with_state(|state| state.selected_window());
  let after = editor.with_state_mut(|state| state.other_window());
  if before != after {
    layout_changed(editor, "other-window");
  }
  Ok(Value::Nil)
}

fn cmd_delete_window(editor: &Editor, _args: Args) -> CommandOutput {
  editor.with_state_mut(|state| state.delete_window())?;
  layout_changed(editor, "delete-window");
  Ok(Value::Nil)
}

fn cmd_delete_other_windows(editor: &Editor, _args: Args) -> CommandOutput {
  let removed = editor.with_state_mut(|state| state.delete_other_windows());
  if !removed.is_empty() {
    layout_changed(editor, "delete-other-windows");
  }
  Ok(Value::Nil)
}

#[cfg(test)]
mod tests {
  use std::{
    cell::Cell,
    rc::Rc,
  };

  use the_lib::editor::EditorError;

  use super::*;

  fn windows(editor: &Editor) -> usize {
    editor.with_state(|state| state.windows().len())
  }

  #[test]
  fn split_cycle_and_delete() {
    let editor = Editor::new();
    let changes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&changes);
    editor.add_hook(event::WINDOW_CONFIGURATION_CHANGE, move |_, _| {
      counter.set(counter.get() + 1);
      Ok(())
    });

    editor.execute("split-window-below", vec![]).unwrap();
    editor
      .execute("split-window-right", vec![Value::Float(0.25)])
      .unwrap();
    assert_eq!(windows(&editor), 3);

    let first = editor.with_state(|state| state.selected_window());
    editor.execute("other-window", vec![]).unwrap();
    assert_ne!(editor.with_state(|state| state.selected_window()), first);

    editor.execute("delete-other-windows", vec![]).unwrap();
    assert_eq!(windows(&editor), 1);
    editor.execute("delete-other-windows", vec![]).unwrap();
    assert_eq!(changes.get(), 4);
  }

  #[test]
  fn last_window_cannot_be_deleted() {
    let editor = Editor::new();
    let err = editor.execute("delete-window", vec![]).unwrap_err();
    let cause = err.command_cause().unwrap();
    assert!(matches!(
      cause.downcast_ref::<EditorError>(),
      Some(EditorError::LastWindow)
    ));
    assert_eq!(windows(&editor), 1);
  }

  #[test]
  fn bad_ratio_is_rejected_before_splitting() {
    let editor = Editor::new();
    assert!(
      editor
        .execute("split-window-below", vec![Value::Float(1.5)])
        .is_err()
    );
    assert!(
      editor
        .execute("split-window-below", vec![Value::from("wide")])
        .is_err()
    );
    assert_eq!(windows(&editor), 1);
  }
}

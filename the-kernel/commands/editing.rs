use the_dispatch::Signature;
use the_lib::{
  movement::{
    self,
    Direction,
  },
  value::Value,
};

use super::{
  builtin,
  count_arg,
  joined,
  str_arg,
};
use crate::editor::{
  Args,
  CommandOutput,
  Editor,
};

const COUNT: Signature = Signature::between(0, 1).named(&["count"]);

pub(super) fn register(editor: &Editor) {
  let origin = module_path!();
  builtin(
    editor,
    origin,
    "insert",
    "Insert TEXT at point. Several arguments are joined with spaces.",
    cmd_insert,
    Signature::DEFAULT.named(&["text"]),
  );
  builtin(
    editor,
    origin,
    crate::editor::SELF_INSERT,
    "Insert the typed character CHAR at point.",
    cmd_self_insert,
    Signature::exactly(1).named(&["char"]),
  );
  builtin(
    editor,
    origin,
    "newline",
    "Insert a newline at point.",
    cmd_newline,
    Signature::NONE,
  );
  builtin(
    editor,
    origin,
    "forward-char",
    "Move point forward by COUNT characters.",
    cmd_forward_char,
    COUNT,
  );
  builtin(
    editor,
    origin,
    "backward-char",
    "Move point backward by COUNT characters.",
    cmd_backward_char,
    COUNT,
  );
  builtin(
    editor,
    origin,
    "move-beginning-of-line",
    "Move point to the beginning of the current line.",
    cmd_beginning_of_line,
    Signature::NONE,
  );
  builtin(
    editor,
    origin,
    "move-end-of-line",
    "Move point to the end of the current line.",
    cmd_end_of_line,
    Signature::NONE,
  );
  builtin(
    editor,
    origin,
    "next-line",
    "Move point to the next line, keeping the column when possible.",
    cmd_next_line,
    Signature::NONE,
  );
  builtin(
    editor,
    origin,
    "previous-line",
    "Move point to the previous line, keeping the column when possible.",
    cmd_previous_line,
    Signature::NONE,
  );
  builtin(
    editor,
    origin,
    "delete-backward-char",
    "Delete COUNT characters before point.",
    cmd_delete_backward_char,
    COUNT,
  );
  builtin(
    editor,
    origin,
    "delete-forward-char",
    "Delete COUNT characters after point.",
    cmd_delete_forward_char,
    COUNT,
  );
  builtin(
    editor,
    origin,
    "kill-line",
    "Kill the rest of the current line, or the line break at the end of a line.",
    cmd_kill_line,
    Signature::NONE,
  );
  builtin(
    editor,
    origin,
    "show-buffer",
    "Return the contents of the current buffer.",
    cmd_show_buffer,
    Signature::NONE,
  );
}

fn cmd_insert(editor: &Editor, args: Args) -> CommandOutput {
  let text = joined(&args, 0);
  editor.with_state_mut(|state| state.insert(&text));
  Ok(Value::Nil)
}

fn cmd_self_insert(editor: &Editor, args: Args) -> CommandOutput {
  let text = str_arg(&args, 0, "character")?;
  editor.with_state_mut(|state| state.insert(&text));
  Ok(Value::Nil)
}

fn cmd_newline(editor: &Editor, _args: Args) -> CommandOutput {
  editor.with_state_mut(|state| state.insert("\n"));
  Ok(Value::Nil)
}

fn cmd_forward_char(editor: &Editor, args: Args) -> CommandOutput {
  let count = count_arg(&args, 0)?;
  editor.with_state_mut(|state| {
    state.move_point(|buffer, point| movement::move_chars(buffer, point, count, Direction::Forward))
  });
  Ok(Value::Nil)
}

fn cmd_backward_char(editor: &Editor, args: Args) -> CommandOutput {
  let count = count_arg(&args, 0)?;
  editor.with_state_mut(|state| {
    state.move_point(|buffer, point| movement::move_chars(buffer, point, count, Direction::Backward))
  });
  Ok(Value::Nil)
}

fn cmd_beginning_of_line(editor: &Editor, _args: Args) -> CommandOutput {
  editor.with_state_mut(|state| state.move_point(movement::line_beginning));
  Ok(Value::Nil)
}

fn cmd_end_of_line(editor: &Editor, _args: Args) -> CommandOutput {
  editor.with_state_mut(|state| state.move_point(movement::line_end));
  Ok(Value::Nil)
}

fn cmd_next_line(editor: &Editor, _args: Args) -> CommandOutput {
  editor.with_state_mut(|state| {
    state.move_point(|buffer, point| movement::move_lines(buffer, point, Direction::Forward))
  });
  Ok(Value::Nil)
}

fn cmd_previous_line(editor: &Editor, _args: Args) -> CommandOutput {
  editor.with_state_mut(|state| {
    state.move_point(|buffer, point| movement::move_lines(buffer, point, Direction::Backward))
  });
  Ok(Value::Nil)
}

fn cmd_delete_backward_char(editor: &Editor, args: Args) -> CommandOutput {
  let count = count_arg(&args, 0)?;
  editor.with_state_mut(|state| state.delete_chars(count, Direction::Backward));
  Ok(Value::Nil)
}

fn cmd_delete_forward_char(editor: &Editor, args: Args) -> CommandOutput {
  let count = count_arg(&args, 0)?;
  editor.with_state_mut(|state| state.delete_chars(count, Direction::Forward));
  Ok(Value::Nil)
}

fn cmd_kill_line(editor: &Editor, _args: Args) -> CommandOutput {
  let killed = editor.with_state_mut(|state| state.kill_line());
  log::trace!("killed {killed:?}");
  Ok(Value::Nil)
}

fn cmd_show_buffer(editor: &Editor, _args: Args) -> CommandOutput {
  Ok(Value::Str(
    editor.with_state(|state| state.selected_buffer().contents()),
  ))
}

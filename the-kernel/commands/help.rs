use the_dispatch::Signature;
use the_lib::value::Value;

use super::{
  HELP_BUFFER,
  builtin,
  joined,
  str_arg,
};
use crate::editor::{
  Args,
  CommandOutput,
  Editor,
};

pub(super) fn register(editor: &Editor) {
  let origin = module_path!();
  builtin(
    editor,
    origin,
    "describe-command",
    "Describe command NAME in the *Help* buffer.",
    cmd_describe_command,
    Signature::exactly(1).named(&["name"]),
  );
  builtin(
    editor,
    origin,
    "describe-key",
    "Describe the command bound to KEYS in the *Help* buffer.",
    cmd_describe_key,
    Signature::at_least(1).named(&["keys"]),
  );
  builtin(
    editor,
    origin,
    "where-is",
    "List the active key bindings of command NAME in the *Help* buffer.",
    cmd_where_is,
    Signature::exactly(1).named(&["name"]),
  );
}

/// Replaces the help buffer's text and shows it, in another window when
/// there is one.
fn show_help(editor: &Editor, text: &str) {
  editor.with_state_mut(|state| {
    let window = state.pop_to_buffer(HELP_BUFFER, true);
    if let Some(id) = state.window_buffer(window)
      && let Some(buffer) = state.buffer_mut(id)
    {
      buffer.replace_contents(text);
      buffer.set_modified(false);
    }
    state.set_point(window, 0).ok();
  });
}

fn cmd_describe_command(editor: &Editor, args: Args) -> CommandOutput {
  let name = str_arg(&args, 0, "command name")?;
  let name = name.trim();
  show_help(editor, &editor.describe_command(name)?);
  Ok(Value::Str(format!("help: {name}")))
}

fn cmd_describe_key(editor: &Editor, args: Args) -> CommandOutput {
  let keys = joined(&args, 0);
  let text = editor.describe_key(&keys)?;
  show_help(editor, &text);
  Ok(Value::Str(format!("help: {}", keys.trim())))
}

fn cmd_where_is(editor: &Editor, args: Args) -> CommandOutput {
  let name = str_arg(&args, 0, "command name")?;
  let name = name.trim();
  show_help(editor, &editor.where_is_text(name));
  Ok(Value::Str(format!("help: {name}")))
}

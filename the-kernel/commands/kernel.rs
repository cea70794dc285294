use std::{
  borrow::Cow,
  path::Path,
};

use the_dispatch::Signature;
use the_lib::value::Value;

use super::{
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
    "eval-expression",
    "Evaluate CODE with `editor` in scope and return its value.",
    cmd_eval_expression,
    Signature::at_least(1).named(&["code"]),
  );
  builtin(
    editor,
    origin,
    "load-plugin",
    "Load the plugin file at PATH and run its activate function.",
    cmd_load_plugin,
    Signature::exactly(1).named(&["path"]),
  );
  builtin(
    editor,
    origin,
    "keyboard-quit",
    "Abandon the pending key sequence.",
    cmd_keyboard_quit,
    Signature::NONE,
  );
  builtin(
    editor,
    origin,
    "quit",
    "Exit the editor.",
    cmd_quit,
    Signature::NONE,
  );
}

fn cmd_eval_expression(editor: &Editor, args: Args) -> CommandOutput {
  Ok(editor.eval(&joined(&args, 0))?)
}

fn cmd_load_plugin(editor: &Editor, args: Args) -> CommandOutput {
  let path = str_arg(&args, 0, "plugin path")?;
  let path = the_loader::expand_tilde(Cow::Borrowed(Path::new(&path)));
  let record = editor.load_plugin(&path)?;
  Ok(Value::Str(format!("loaded {}", record.identity)))
}

fn cmd_keyboard_quit(editor: &Editor, _args: Args) -> CommandOutput {
  editor.with_state_mut(|state| {
    state.resolver_mut().cancel();
    state.echo_mut().info(None, "Quit");
  });
  Ok(Value::Nil)
}

fn cmd_quit(editor: &Editor, _args: Args) -> CommandOutput {
  log::info!("quit requested");
  editor.quit();
  Ok(Value::Nil)
}

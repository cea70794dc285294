use the_dispatch::Signature;
use the_lib::value::Value;

use super::{
  builtin,
  joined,
  opt_str_arg,
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
    "set",
    "Set variable KEY to VALUE. Several value parts are joined with spaces.",
    cmd_set,
    Signature::at_least(1).named(&["key", "value"]),
  );
  builtin(
    editor,
    origin,
    "get",
    "Return the value of variable KEY, or nil.",
    cmd_get,
    Signature::exactly(1).named(&["key"]),
  );
  builtin(
    editor,
    origin,
    "bind-key",
    "Bind KEYS to COMMAND in SCOPE: global (default), buffer, buffer:NAME or mode:NAME.",
    cmd_bind_key,
    Signature::between(2, 3).named(&["keys", "command", "scope"]),
  );
  builtin(
    editor,
    origin,
    "unbind-key",
    "Remove the binding of KEYS in SCOPE. Returns whether there was one.",
    cmd_unbind_key,
    Signature::between(1, 2).named(&["keys", "scope"]),
  );
  builtin(
    editor,
    origin,
    "enable-mode",
    "Enable MODE in the current buffer.",
    cmd_enable_mode,
    Signature::exactly(1).named(&["mode"]),
  );
  builtin(
    editor,
    origin,
    "disable-mode",
    "Disable MODE in the current buffer. Returns whether it was enabled.",
    cmd_disable_mode,
    Signature::exactly(1).named(&["mode"]),
  );
}

fn cmd_set(editor: &Editor, args: Args) -> CommandOutput {
  let key = str_arg(&args, 0, "variable name")?;
  // A single value keeps its type.
  let value = match args.len() {
    2 => args[1].clone(),
    _ => Value::Str(joined(&args, 1)),
  };
  editor.set_variable(&key, value);
  Ok(Value::Nil)
}

fn cmd_get(editor: &Editor, args: Args) -> CommandOutput {
  let key = str_arg(&args, 0, "variable name")?;
  Ok(editor.variable(&key).unwrap_or_default())
}

fn cmd_bind_key(editor: &Editor, args: Args) -> CommandOutput {
  let keys = str_arg(&args, 0, "key sequence")?;
  let command = str_arg(&args, 1, "command")?;
  let scope = editor.parse_scope(&opt_str_arg(&args, 2).unwrap_or_default())?;
  editor.bind_key(&scope, &keys, &command)?;
  Ok(Value::Str(format!("bound {keys} -> {command} ({scope})")))
}

fn cmd_unbind_key(editor: &Editor, args: Args) -> CommandOutput {
  let keys = str_arg(&args, 0, "key sequence")?;
  let scope = editor.parse_scope(&opt_str_arg(&args, 1).unwrap_or_default())?;
  Ok(Value::Bool(editor.unbind_key(&scope, &keys)?))
}

fn cmd_enable_mode(editor: &Editor, args: Args) -> CommandOutput {
  let mode = str_arg(&args, 0, "mode")?;
  editor.enable_mode(&mode)?;
  Ok(Value::Nil)
}

fn cmd_disable_mode(editor: &Editor, args: Args) -> CommandOutput {
  let mode = str_arg(&args, 0, "mode")?;
  Ok(Value::Bool(editor.disable_mode(&mode)))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn run(editor: &Editor, name: &str, args: &[&str]) -> Value {
    let args = args.iter().map(|arg| Value::from(*arg)).collect();
    editor.execute(name, args).unwrap()
  }

  #[test]
  fn set_and_get() {
    let editor = Editor::new();
    run(&editor, "set", &["theme", "dark", "blue"]);
    assert_eq!(run(&editor, "get", &["theme"]), Value::from("dark blue"));
    editor
      .execute("set", vec![Value::from("n"), Value::Int(3)])
      .unwrap();
    assert_eq!(run(&editor, "get", &["n"]), Value::Int(3));
    assert_eq!(run(&editor, "get", &["missing"]), Value::Nil);
  }

  #[test]
  fn mode_bindings_follow_the_mode() {
    let editor = Editor::new();
    assert_eq!(
      run(&editor, "bind-key", &["C-c l", "newline", "mode:lisp"]),
      Value::from("bound C-c l -> newline (mode:lisp)")
    );
    assert_eq!(editor.press("C-c").unwrap(), "unbound key sequence: C-c");

    run(&editor, "enable-mode", &["lisp"]);
    assert_eq!(editor.press("C-c").unwrap(), "pending C-c");
    assert_eq!(editor.press("l").unwrap(), "ran newline");

    assert_eq!(run(&editor, "disable-mode", &["lisp"]), Value::Bool(true));
    assert_eq!(run(&editor, "disable-mode", &["lisp"]), Value::Bool(false));
  }

  #[test]
  fn unbind_reports_whether_anything_was_bound() {
    let editor = Editor::new();
    assert_eq!(run(&editor, "unbind-key", &["C-f"]), Value::Bool(true));
    assert_eq!(run(&editor, "unbind-key", &["C-f"]), Value::Bool(false));
    assert!(
      editor
        .execute("bind-key", vec![Value::from("C-c x"), Value::from("nope")])
        .is_err()
    );
  }
}

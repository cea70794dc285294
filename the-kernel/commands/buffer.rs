use the_dispatch::Signature;
use the_lib::value::Value;

use super::{
  builtin,
  opt_str_arg,
  str_arg,
};
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

pub(super) fn register(editor: &Editor) {
  let origin = module_path!();
  builtin(
    editor,
    origin,
    "new-buffer",
    "Create a buffer called NAME unless it already exists.",
    cmd_new_buffer,
    Signature::exactly(1).named(&["name"]),
  );
  builtin(
    editor,
    origin,
    "switch-to-buffer",
    "Show buffer NAME in the selected window, creating it if needed.",
    cmd_switch_to_buffer,
    Signature::exactly(1).named(&["name"]),
  );
  builtin(
    editor,
    origin,
    "kill-buffer",
    "Kill buffer NAME, or the current buffer. Windows showing it switch to another buffer.",
    cmd_kill_buffer,
    Signature::between(0, 1).named(&["name"]),
  );
  builtin(
    editor,
    origin,
    "list-buffers",
    "Return buffer names, most recently shown first.",
    cmd_list_buffers,
    Signature::NONE,
  );
}

fn cmd_new_buffer(editor: &Editor, args: Args) -> CommandOutput {
  let name = str_arg(&args, 0, "buffer name")?;
  editor.with_state_mut(|state| state.ensure_buffer(&name));
  Ok(Value::Nil)
}

fn cmd_switch_to_buffer(editor: &Editor, args: Args) -> CommandOutput {
  let name = str_arg(&args, 0, "buffer name")?;
  editor.with_state_mut(|state| state.switch_to_buffer(&name));
  Ok(Value::Nil)
}

fn cmd_kill_buffer(editor: &Editor, args: Args) -> CommandOutput {
  let name = opt_str_arg(&args, 0)
    .unwrap_or_else(|| editor.with_state(|state| state.selected_buffer().name().to_string()));
  let replacement = editor.with_state_mut(|state| -> the_lib::editor::Result<String> {
    let id = state.kill_buffer(&name)?;
    Ok(
      state
        .buffer(id)
        .map(|buffer| buffer.name().to_string())
        .unwrap_or_default(),
    )
  })?;
  log::debug!("killed buffer {name}, showing {replacement}");
  editor.emit(&HookPayload::new(event::BUFFER_KILLED).with_detail(name));
  Ok(Value::Nil)
}

fn cmd_list_buffers(editor: &Editor, _args: Args) -> CommandOutput {
  let names = editor.with_state(|state| {
    state
      .buffer_names_mru()
      .into_iter()
      .map(Value::from)
      .collect::<Vec<_>>()
  });
  Ok(Value::List(names))
}

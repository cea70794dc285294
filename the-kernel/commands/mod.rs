//! Built-in commands and the default key bindings.

mod buffer;
mod editing;
mod help;
mod kernel;
mod state;
mod window;

use std::rc::Rc;

use anyhow::{
  Context,
  bail,
};
use the_dispatch::{
  CommandMeta,
  Signature,
  SourceKind,
};
use the_lib::{
  keymap::LayerScope,
  value::Value,
};

use crate::{
  editor::{
    Args,
    CommandOutput,
    Editor,
  },
  error::Result,
};

pub type CommandHandler = fn(&Editor, Args) -> CommandOutput;

/// Name of the buffer help commands render into.
pub const HELP_BUFFER: &str = "*Help*";

/// Default global bindings, key sequence to command.
pub const DEFAULT_BINDINGS: &[(&str, &str)] = &[
  ("C-m", "newline"),
  ("RET", "newline"),
  ("DEL", "delete-backward-char"),
  ("C-d", "delete-forward-char"),
  ("C-f", "forward-char"),
  ("C-b", "backward-char"),
  ("C-a", "move-beginning-of-line"),
  ("C-e", "move-end-of-line"),
  ("C-n", "next-line"),
  ("C-p", "previous-line"),
  ("C-k", "kill-line"),
  ("C-q", "quit"),
  ("C-x C-c", "quit"),
  ("C-x 2", "split-window-below"),
  ("C-x 3", "split-window-right"),
  ("C-x o", "other-window"),
  ("C-x 0", "delete-window"),
  ("C-x 1", "delete-other-windows"),
  ("C-x C-b", "list-buffers"),
  ("C-x b", "switch-to-buffer"),
  ("C-x k", "kill-buffer"),
  ("C-h f", "describe-command"),
  ("C-h k", "describe-key"),
  ("C-h w", "where-is"),
  ("M-:", "eval-expression"),
  ("C-g", "keyboard-quit"),
];

pub fn register_builtins(editor: &Editor) {
  editing::register(editor);
  buffer::register(editor);
  window::register(editor);
  state::register(editor);
  kernel::register(editor);
  help::register(editor);
}

pub fn bind_defaults(editor: &Editor) -> Result<()> {
  for (keys, command) in DEFAULT_BINDINGS {
    editor.bind_key(&LayerScope::Global, keys, command)?;
  }
  Ok(())
}

fn builtin(
  editor: &Editor,
  origin: &str,
  name: &str,
  doc: &str,
  handler: CommandHandler,
  signature: Signature,
) {
  editor.register_command(
    name,
    CommandMeta::new(doc, origin, SourceKind::Builtin).with_signature(signature),
    Rc::new(handler),
  );
}

/// Repeat count at `index`; 1 when absent, negative counts clamp to 0.
fn count_arg(args: &[Value], index: usize) -> anyhow::Result<usize> {
  let Some(value) = args.get(index) else {
    return Ok(1);
  };
  let n = match value {
    Value::Int(n) => *n,
    Value::Str(s) => {
      s.trim()
        .parse::<i64>()
        .ok()
        .context("count must be an integer")?
    },
    _ => bail!("count must be an integer"),
  };
  Ok(usize::try_from(n).unwrap_or(0))
}

fn str_arg(args: &[Value], index: usize, what: &str) -> anyhow::Result<String> {
  match args.get(index) {
    Some(Value::Nil) | None => bail!("missing {what}"),
    Some(value) => Ok(value.to_string()),
  }
}

fn opt_str_arg(args: &[Value], index: usize) -> Option<String> {
  args
    .get(index)
    .filter(|value| !value.is_nil())
    .map(Value::to_string)
}

/// Arguments from `from` on, joined with single spaces.
fn joined(args: &[Value], from: usize) -> String {
  args
    .iter()
    .skip(from)
    .map(Value::to_string)
    .collect::<Vec<_>>()
    .join(" ")
}

//! Line-oriented front end.
//!
//! Lines starting with `:` are shell commands; anything else is inserted
//! into the current buffer. The shell only talks to the editor through its
//! public API, the same way a graphical front end would.

use std::{
  borrow::Cow,
  io::{
    BufRead,
    Write,
  },
  path::Path,
};

use the_lib::value::Value;

use crate::editor::Editor;

pub const PROMPT: &str = "the-kernel> ";

const HELP: &str = "\
Commands:
  :run <cmd> [args...]            run a command
  :press <keys> [-- args...]      feed keys, or run the command bound to keys with args
  :eval <code>                    evaluate code with `editor` in scope
  :load <path>                    load a plugin file
  :bind <keys> <cmd> [scope]      bind keys in global, buffer, buffer:<name> or mode:<name>
  :mode <name> [on|off]           toggle a mode in the current buffer
  :commands                       list command names
  :plugins                        list loaded plugins
  :messages                       show the message log
  :buf                            show the current buffer name
  :snapshot                       print the render snapshot as JSON
  :quit                           exit
Any other line is inserted at point.";

pub struct Shell {
  editor: Editor,
}

impl Shell {
  pub fn new(editor: Editor) -> Self {
    Self { editor }
  }

  pub fn editor(&self) -> &Editor {
    &self.editor
  }

  /// Handles one input line and returns what to print, if anything.
  pub fn handle_line(&self, line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
      return None;
    }
    let Some(input) = line.strip_prefix(':') else {
      return self.run("insert", vec![Value::from(line)]);
    };

    let (word, rest) = input
      .trim()
      .split_once(char::is_whitespace)
      .map_or((input.trim(), ""), |(word, rest)| (word, rest.trim()));

    match word {
      "q" | "quit" | "exit" => self.run("quit", vec![]),
      "help" => Some(HELP.to_string()),
      "commands" => Some(self.editor.commands().join("\n")),
      "buf" => {
        Some(
          self
            .editor
            .with_state(|state| state.selected_buffer().name().to_string()),
        )
      },
      "plugins" => Some(self.plugins()),
      "messages" => Some(self.editor.with_state(|state| state.echo().log_text())),
      "snapshot" => {
        Some(
          serde_json::to_string_pretty(&self.editor.snapshot())
            .unwrap_or_else(|err| format!("snapshot error: {err}")),
        )
      },
      "run" => {
        let mut parts = rest.split_whitespace();
        let Some(name) = parts.next() else {
          return Some("usage: :run <cmd> [args...]".to_string());
        };
        self.run(name, parts.map(Value::from).collect())
      },
      "press" => Some(self.press(rest)),
      "eval" => {
        match self.editor.eval(rest) {
          Ok(Value::Nil) => None,
          Ok(value) => Some(value.to_string()),
          Err(err) => Some(err.to_string()),
        }
      },
      "load" => {
        let path = the_loader::expand_tilde(Cow::Borrowed(Path::new(rest)));
        match self.editor.load_plugin(&path) {
          Ok(record) => Some(format!("loaded {}", record.identity)),
          Err(err) => Some(err.to_string()),
        }
      },
      "bind" => Some(self.bind(rest)),
      "mode" => Some(self.mode(rest)),
      _ => Some("unknown input. use :help".to_string()),
    }
  }

  fn run(&self, name: &str, args: Vec<Value>) -> Option<String> {
    match self.editor.execute(name, args) {
      Ok(Value::Nil) => None,
      Ok(value) => Some(value.to_string()),
      Err(err) => Some(format!("command error: {err}")),
    }
  }

  fn press(&self, rest: &str) -> String {
    let result = match rest.split_once("--") {
      Some((keys, args)) => {
        self
          .editor
          .execute_key(keys.trim(), args.split_whitespace().map(Value::from).collect())
      },
      None => self.editor.press(rest),
    };
    result.unwrap_or_else(|err| err.to_string())
  }

  /// `<keys...> <command> [scope]`: the last word is a scope when it looks
  /// like one, the word before it is the command.
  fn bind(&self, rest: &str) -> String {
    const USAGE: &str = "usage: :bind <keys> <cmd> [global|buffer|buffer:<name>|mode:<name>]";
    let mut words: Vec<&str> = rest.split_whitespace().collect();
    let has_scope = words.len() > 2 && words.last().is_some_and(|word| is_scope(word));
    let scope = if has_scope { words.pop() } else { None };
    let Some(command) = words.pop() else {
      return USAGE.to_string();
    };
    if words.is_empty() {
      return USAGE.to_string();
    }
    let keys = words.join(" ");
    let scope = match self.editor.parse_scope(scope.unwrap_or("global")) {
      Ok(scope) => scope,
      Err(err) => return err.to_string(),
    };
    match self.editor.bind_key(&scope, &keys, command) {
      Ok(()) => format!("bound {keys} -> {command} ({scope})"),
      Err(err) => err.to_string(),
    }
  }

  fn mode(&self, rest: &str) -> String {
    let mut words = rest.split_whitespace();
    let (Some(name), toggle) = (words.next(), words.next()) else {
      return "usage: :mode <name> [on|off]".to_string();
    };
    match toggle {
      None | Some("on") => {
        match self.editor.enable_mode(name) {
          Ok(()) => format!("mode {name} enabled"),
          Err(err) => err.to_string(),
        }
      },
      Some("off") => {
        if self.editor.disable_mode(name) {
          format!("mode {name} disabled")
        } else {
          format!("mode {name} was not enabled")
        }
      },
      Some(other) => format!("expected on or off, got {other}"),
    }
  }

  fn plugins(&self) -> String {
    let plugins = self.editor.plugins();
    if plugins.is_empty() {
      return "no plugins loaded".to_string();
    }
    plugins
      .iter()
      .map(|plugin| {
        format!(
          "{}  {}  ({} commands, {} hooks)",
          plugin.identity,
          plugin.status,
          plugin.commands.len(),
          plugin.hooks.len()
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  /// Reads lines from `input` until EOF or until the editor quits.
  pub fn run_loop(&self, mut input: impl BufRead, mut output: impl Write) -> std::io::Result<()> {
    let mut line = String::new();
    while !self.editor.should_quit() {
      write!(output, "{PROMPT}")?;
      output.flush()?;
      line.clear();
      if input.read_line(&mut line)? == 0 {
        writeln!(output)?;
        break;
      }
      if let Some(reply) = self.handle_line(&line) {
        writeln!(output, "{reply}")?;
      }
    }
    Ok(())
  }
}

fn is_scope(word: &str) -> bool {
  matches!(word, "global" | "buffer") || word.starts_with("buffer:") || word.starts_with("mode:")
}

use std::{
  collections::HashMap,
  fmt,
  rc::Rc,
};

use thiserror::Error;

/// Shared, type-erased command handler.
///
/// Handlers borrow the context immutably; contexts that need mutation use
/// interior mutability so handlers can re-enter the registry's owner.
pub type DynHandler<Ctx, Input, Output> = Rc<dyn Fn(&Ctx, Input) -> Output>;

/// Where a command definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
  Builtin,
  Plugin,
  Runtime,
}

impl SourceKind {
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Builtin => "builtin",
      Self::Plugin => "plugin",
      Self::Runtime => "runtime",
    }
  }
}

impl fmt::Display for SourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{command} expects {expected}, got {got}")]
pub struct ArityError {
  pub command:  String,
  pub expected: String,
  pub got:      usize,
}

/// Positional arity of a command plus optional argument names for docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
  pub positionals: (usize, Option<usize>),
  pub names:       &'static [&'static str],
}

impl Default for Signature {
  fn default() -> Self {
    Self::DEFAULT
  }
}

impl Signature {
  /// Any number of arguments.
  pub const DEFAULT: Self = Self {
    positionals: (0, None),
    names:       &[],
  };
  pub const NONE: Self = Self::exactly(0);

  pub const fn exactly(n: usize) -> Self {
    Self {
      positionals: (n, Some(n)),
      names:       &[],
    }
  }

  pub const fn between(min: usize, max: usize) -> Self {
    Self {
      positionals: (min, Some(max)),
      names:       &[],
    }
  }

  pub const fn at_least(min: usize) -> Self {
    Self {
      positionals: (min, None),
      names:       &[],
    }
  }

  pub const fn named(mut self, names: &'static [&'static str]) -> Self {
    self.names = names;
    self
  }

  pub fn accepts(&self, count: usize) -> bool {
    let (min, max) = self.positionals;
    count >= min && max.is_none_or(|max| count <= max)
  }

  pub fn check(&self, command: &str, count: usize) -> Result<(), ArityError> {
    if self.accepts(count) {
      return Ok(());
    }
    Err(ArityError {
      command: command.to_string(),
      expected: self.describe_arity(),
      got: count,
    })
  }

  pub fn describe_arity(&self) -> String {
    match self.positionals {
      (0, Some(0)) => "no arguments".to_string(),
      (min, Some(max)) if min == max => {
        format!("{min} argument{}", if min == 1 { "" } else { "s" })
      },
      (min, Some(max)) => format!("{min}-{max} arguments"),
      (min, None) => format!("at least {min} argument{}", if min == 1 { "" } else { "s" }),
    }
  }

  /// Lisp-style usage line, e.g. `(split-window-below &optional RATIO)`.
  pub fn usage(&self, command: &str) -> String {
    let name = |i: usize| {
      self
        .names
        .get(i)
        .map(|n| n.to_ascii_uppercase())
        .unwrap_or_else(|| format!("ARG{}", i + 1))
    };

    let mut usage = format!("({command}");
    let (min, max) = self.positionals;
    for i in 0..min {
      usage.push(' ');
      usage.push_str(&name(i));
    }
    match max {
      Some(max) if max > min => {
        usage.push_str(" &optional");
        for i in min..max {
          usage.push(' ');
          usage.push_str(&name(i));
        }
      },
      Some(_) => {},
      None => {
        usage.push_str(" &rest ");
        usage.push_str(&self.names.get(min).map_or_else(
          || "ARGS".to_string(),
          |n| n.to_ascii_uppercase(),
        ));
      },
    }
    usage.push(')');
    usage
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMeta {
  pub doc:       String,
  pub signature: Signature,
  /// Module path, plugin identity or `<eval>`.
  pub origin:    String,
  pub source:    SourceKind,
}

impl CommandMeta {
  pub fn new(doc: impl Into<String>, origin: impl Into<String>, source: SourceKind) -> Self {
    Self {
      doc: doc.into(),
      signature: Signature::DEFAULT,
      origin: origin.into(),
      source,
    }
  }

  pub fn with_signature(mut self, signature: Signature) -> Self {
    self.signature = signature;
    self
  }
}

pub struct CommandEntry<Ctx, Input, Output> {
  pub name:    String,
  pub handler: DynHandler<Ctx, Input, Output>,
  pub meta:    CommandMeta,
}

impl<Ctx, Input, Output> fmt::Debug for CommandEntry<Ctx, Input, Output> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CommandEntry")
      .field("name", &self.name)
      .field("meta", &self.meta)
      .finish_non_exhaustive()
  }
}

/// Name-keyed command table.
///
/// Entries are handed out as `Rc`s so callers can drop any borrow of the
/// registry before invoking a handler.
pub struct CommandRegistry<Ctx, Input, Output> {
  commands: HashMap<String, Rc<CommandEntry<Ctx, Input, Output>>>,
}

impl<Ctx, Input, Output> Default for CommandRegistry<Ctx, Input, Output> {
  fn default() -> Self {
    Self::new()
  }
}

impl<Ctx, Input, Output> Clone for CommandRegistry<Ctx, Input, Output> {
  fn clone(&self) -> Self {
    Self {
      commands: self.commands.clone(),
    }
  }
}

impl<Ctx, Input, Output> CommandRegistry<Ctx, Input, Output> {
  pub fn new() -> Self {
    Self {
      commands: HashMap::new(),
    }
  }

  /// Inserts or replaces `name`. Returns the replaced entry.
  pub fn register(
    &mut self,
    name: impl Into<String>,
    handler: DynHandler<Ctx, Input, Output>,
    meta: CommandMeta,
  ) -> Option<Rc<CommandEntry<Ctx, Input, Output>>> {
    let name = name.into();
    let entry = Rc::new(CommandEntry {
      name: name.clone(),
      handler,
      meta,
    });
    self.commands.insert(name, entry)
  }

  pub fn get(&self, name: &str) -> Option<Rc<CommandEntry<Ctx, Input, Output>>> {
    self.commands.get(name).cloned()
  }

  pub fn meta(&self, name: &str) -> Option<&CommandMeta> {
    self.commands.get(name).map(|entry| &entry.meta)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.commands.contains_key(name)
  }

  pub fn remove(&mut self, name: &str) -> Option<Rc<CommandEntry<Ctx, Input, Output>>> {
    self.commands.remove(name)
  }

  pub fn len(&self) -> usize {
    self.commands.len()
  }

  pub fn is_empty(&self) -> bool {
    self.commands.is_empty()
  }

  /// Command names in sorted order.
  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }
}

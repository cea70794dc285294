use std::path::PathBuf;

use the_dispatch::HookId;
use the_lib::editor::EditorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown command: {0}")]
  UnknownCommand(String),
  #[error("{name}: {cause:#}")]
  CommandFailed {
    name:  String,
    #[source]
    cause: anyhow::Error,
  },
  #[error("invalid plugin {plugin}: {reason}")]
  InvalidPlugin { plugin: String, reason: String },
  #[error(transparent)]
  Editor(#[from] EditorError),
  /// Only built for logging; hook failures never reach callers.
  #[error("hook failed for event {event} ({hook} from {origin}): {cause}")]
  HookCallbackFailed {
    event:  String,
    hook:   HookId,
    origin: String,
    cause:  String,
  },
  #[error("invalid argument: {0}")]
  InvalidArgument(String),
  #[error("eval error: {0}")]
  Eval(String),
  #[error("{}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("config error: {0}")]
  Config(String),
}

impl Error {
  /// The failure a command handler returned, when this is one.
  pub fn command_cause(&self) -> Option<&anyhow::Error> {
    match self {
      Self::CommandFailed { cause, .. } => Some(cause),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

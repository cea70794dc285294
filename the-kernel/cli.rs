use std::{
  borrow::Cow,
  path::{
    Path,
    PathBuf,
  },
};

use anyhow::Result;
use clap::{
  ArgAction,
  Parser,
};

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub verbosity:   u8,
  pub log_file:    Option<PathBuf>,
  pub config_file: Option<PathBuf>,
  pub load_init:   bool,
  pub plugins:     Vec<PathBuf>,
  pub eval:        Vec<String>,
}

impl CliOptions {
  pub fn parse() -> Result<Self> {
    let raw = RawCli::parse();
    raw.try_into()
  }
}

#[derive(Parser, Debug)]
#[command(
  name = "the-kernel",
  about = "Extensible editor kernel with a line shell",
  long_about = None,
  version = env!("CARGO_PKG_VERSION")
)]
struct RawCli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE", value_parser = parse_pathbuf)]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", value_parser = parse_pathbuf)]
  config_file: Option<PathBuf>,

  /// Skip init.rhai
  #[arg(long = "no-init")]
  no_init: bool,

  /// Load a plugin after the configured ones (repeatable)
  #[arg(short = 'l', long = "load", value_name = "PLUGIN", value_parser = parse_pathbuf)]
  plugins: Vec<PathBuf>,

  /// Evaluate code after startup and exit instead of starting the shell
  /// (repeatable)
  #[arg(short = 'e', long = "eval", value_name = "CODE")]
  eval: Vec<String>,
}

impl TryFrom<RawCli> for CliOptions {
  type Error = anyhow::Error;

  fn try_from(raw: RawCli) -> Result<Self> {
    Ok(Self {
      verbosity:   raw.verbosity,
      log_file:    raw.log_file,
      config_file: raw.config_file,
      load_init:   !raw.no_init,
      plugins:     raw.plugins,
      eval:        raw.eval,
    })
  }
}

fn parse_pathbuf(value: &str) -> std::result::Result<PathBuf, String> {
  if value.trim().is_empty() {
    return Err("path must not be empty".to_string());
  }
  Ok(the_loader::expand_tilde(Cow::Borrowed(Path::new(value))).into_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_map_to_options() {
    let raw = RawCli::try_parse_from([
      "the-kernel",
      "-vv",
      "--no-init",
      "-l",
      "a.rhai",
      "--load",
      "b.rhai",
      "-e",
      "1 + 1",
    ])
    .unwrap();
    let options = CliOptions::try_from(raw).unwrap();
    assert_eq!(options.verbosity, 2);
    assert!(!options.load_init);
    assert_eq!(
      options.plugins,
      vec![PathBuf::from("a.rhai"), PathBuf::from("b.rhai")]
    );
    assert_eq!(options.eval, vec!["1 + 1".to_string()]);
    assert!(options.config_file.is_none());
  }
}

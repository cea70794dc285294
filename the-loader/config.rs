//! The `config.toml` model.
//!
//! Layers are merged as raw TOML first (built-in defaults, then the user
//! file, then the workspace file) and deserialized once at the end, so a
//! later file only needs to mention the keys it changes.

use std::path::{
  Path,
  PathBuf,
};

use anyhow::{
  Context,
  Result,
  ensure,
};
use indexmap::IndexMap;
use serde::{
  Deserialize,
  Serialize,
};
use the_lib::value::Value;

/// Built-in `config.toml`.
pub const DEFAULT_CONFIG: &str = include_str!("config.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EditorConfig {
  /// Buffer shown at startup and recreated when the last buffer is killed.
  pub default_buffer:  String,
  /// Chord that abandons a pending key sequence.
  pub cancel_key:      String,
  /// Ratio used by the split commands when none is given.
  pub split_ratio:     f32,
  /// Echo area history length.
  pub message_history: usize,
}

impl Default for EditorConfig {
  fn default() -> Self {
    Self {
      default_buffer:  "*scratch*".to_string(),
      cancel_key:      "C-g".to_string(),
      split_ratio:     0.5,
      message_history: 100,
    }
  }
}

/// Extra bindings, key sequence to command name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeysConfig {
  pub global: IndexMap<String, String>,
  pub mode:   IndexMap<String, IndexMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub editor:    EditorConfig,
  pub keys:      KeysConfig,
  /// Seeds the variable store.
  pub variables: IndexMap<String, Value>,
  /// Plugin files loaded after `init.rhai`, in order.
  pub plugins:   Vec<PathBuf>,
}

impl Config {
  pub fn from_toml(value: toml::Value) -> Result<Self> {
    let config: Self = value.try_into().context("invalid configuration")?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    let ratio = self.editor.split_ratio;
    ensure!(
      ratio > 0.0 && ratio < 1.0,
      "editor.split-ratio must be between 0 and 1, got {ratio}"
    );
    ensure!(
      !self.editor.default_buffer.is_empty(),
      "editor.default-buffer must not be empty"
    );
    Ok(())
  }

  /// Built-in defaults with the user and workspace files merged on top.
  pub fn load() -> Result<Self> {
    Self::load_layers([crate::config_file(), crate::workspace_config_file()])
  }

  /// Built-in defaults with each existing file in `files` merged on top, in
  /// order. Missing files are skipped.
  pub fn load_layers(files: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
    let merged = files
      .into_iter()
      .filter_map(|file| read_layer(&file).transpose())
      .collect::<Result<Vec<_>>>()?
      .into_iter()
      .fold(default_config()?, |a, b| crate::merge_toml_values(a, b, 3));
    Self::from_toml(merged)
  }
}

/// Built-in `config.toml` as a TOML document.
pub fn default_config() -> Result<toml::Value> {
  toml::from_str(DEFAULT_CONFIG).context("failed to parse built-in config.toml")
}

fn read_layer(file: &Path) -> Result<Option<toml::Value>> {
  let text = match std::fs::read_to_string(file) {
    Ok(text) => text,
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
    Err(err) => {
      return Err(err).with_context(|| format!("failed to read {}", file.display()));
    },
  };
  log::debug!("loading config layer {}", file.display());
  toml::from_str(&text)
    .map(Some)
    .with_context(|| format!("failed to parse {}", file.display()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
  }

  #[test]
  fn built_in_config_matches_defaults() {
    let config = Config::from_toml(default_config().unwrap()).unwrap();
    assert_eq!(config, Config::default());
  }

  #[test]
  fn later_layers_override_earlier_ones() {
    let dir = tempfile::tempdir().unwrap();
    let user = write(
      dir.path(),
      "user.toml",
      r#"
        plugins = ["a.rhai"]

        [editor]
        cancel-key = "ESC"
        split-ratio = 0.25

        [keys.global]
        "C-c p" = "ping"

        [variables]
        fill-column = 70
        "#,
    );
    let workspace = write(
      dir.path(),
      "workspace.toml",
      r#"
        [editor]
        split-ratio = 0.75

        [keys.mode.lisp]
        "C-c C-e" = "eval-expression"
        "#,
    );

    let config =
      Config::load_layers([user, dir.path().join("missing.toml"), workspace]).unwrap();
    assert_eq!(config.editor.cancel_key, "ESC");
    assert_eq!(config.editor.split_ratio, 0.75);
    assert_eq!(config.editor.default_buffer, "*scratch*");
    assert_eq!(config.keys.global["C-c p"], "ping");
    assert_eq!(config.keys.mode["lisp"]["C-c C-e"], "eval-expression");
    assert_eq!(config.variables["fill-column"], Value::Int(70));
    assert_eq!(config.plugins, vec![PathBuf::from("a.rhai")]);
  }

  #[test]
  fn parse_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(dir.path(), "bad.toml", "[editor\n");
    let err = Config::load_layers([bad]).unwrap_err();
    assert!(format!("{err:#}").contains("bad.toml"));
  }

  #[test]
  fn unknown_keys_and_bad_ratio_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let unknown = write(dir.path(), "unknown.toml", "[editor]\ntheme = \"x\"\n");
    assert!(Config::load_layers([unknown]).is_err());

    let ratio = write(dir.path(), "ratio.toml", "[editor]\nsplit-ratio = 1.5\n");
    let err = Config::load_layers([ratio]).unwrap_err();
    assert!(err.to_string().contains("split-ratio"));
  }
}

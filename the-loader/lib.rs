//! Filesystem locations and configuration loading for the kernel.
//!
//! Directories follow the platform conventions picked by `etcetera` and can
//! be overridden with `THE_KERNEL_CONFIG_DIR` and `THE_KERNEL_CACHE_DIR`.

pub mod config;

use std::{
  borrow::Cow,
  path::{
    Path,
    PathBuf,
  },
  sync::OnceLock,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};

/// Name used for the config/cache subdirectories and the log file.
pub const APP_NAME: &str = "the-kernel";

/// Directory searched upward from the working directory for a workspace
/// local config.
pub const WORKSPACE_DIR: &str = ".the-kernel";

pub const INIT_FILE: &str = "init.rhai";

static CONFIG_FILE: OnceLock<PathBuf> = OnceLock::new();

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

pub fn initialize_config_file(specified_file: Option<PathBuf>) {
  let config_file = specified_file.unwrap_or_else(default_config_file);
  ensure_parent_dir(&config_file);
  CONFIG_FILE.set(config_file).ok();
}

pub fn initialize_log_file(specified_file: Option<PathBuf>) {
  let log_file = specified_file.unwrap_or_else(default_log_file);
  ensure_parent_dir(&log_file);
  LOG_FILE.set(log_file).ok();
}

pub fn config_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("THE_KERNEL_CONFIG_DIR") {
    return expand_tilde(Cow::Borrowed(Path::new(&dir))).into_owned();
  }
  let strategy = choose_base_strategy().expect("Unable to find the config directory!");
  let mut path = strategy.config_dir();
  path.push(APP_NAME);
  path
}

pub fn cache_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("THE_KERNEL_CACHE_DIR") {
    return expand_tilde(Cow::Borrowed(Path::new(&dir))).into_owned();
  }
  let strategy = choose_base_strategy().expect("Unable to find the cache directory!");
  let mut path = strategy.cache_dir();
  path.push(APP_NAME);
  path
}

pub fn config_file() -> PathBuf {
  CONFIG_FILE
    .get_or_init(|| {
      let path = default_config_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

pub fn log_file() -> PathBuf {
  LOG_FILE
    .get_or_init(|| {
      let path = default_log_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

/// `init.rhai` next to the user config file.
pub fn init_file() -> PathBuf {
  config_file()
    .parent()
    .map(|dir| dir.join(INIT_FILE))
    .unwrap_or_else(|| config_dir().join(INIT_FILE))
}

pub fn workspace_config_file() -> PathBuf {
  find_workspace().0.join(WORKSPACE_DIR).join("config.toml")
}

pub fn default_log_file() -> PathBuf {
  cache_dir().join(format!("{APP_NAME}.log"))
}

/// Layers `overlay` on top of `base`.
///
/// Tables present in both documents are merged key by key for up to `depth`
/// levels; below that, and for every other kind of value, the overlay wins
/// outright. Arrays are replaced rather than concatenated, so a workspace
/// `plugins = []` really empties the list.
pub fn merge_toml_values(base: toml::Value, overlay: toml::Value, depth: usize) -> toml::Value {
  match (base, overlay) {
    (toml::Value::Table(mut base), toml::Value::Table(overlay)) if depth > 0 => {
      for (key, value) in overlay {
        let merged = match base.remove(&key) {
          Some(existing) => merge_toml_values(existing, value, depth - 1),
          None => value,
        };
        base.insert(key, merged);
      }
      toml::Value::Table(base)
    },
    (_, overlay) => overlay,
  }
}

/// Finds the current workspace folder.
///
/// This function starts searching the FS upward from the CWD
/// and returns the first directory that contains either `.git`, `.svn`, `.jj`
/// or `.the-kernel`. If no workspace was found returns (CWD, true).
/// Otherwise (workspace, false) is returned
pub fn find_workspace() -> (PathBuf, bool) {
  match std::env::current_dir() {
    Ok(current_dir) => find_workspace_in(current_dir),
    Err(_) => (PathBuf::new(), true),
  }
}

pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  for ancestor in dir.ancestors() {
    if ancestor.join(".git").exists()
      || ancestor.join(".svn").exists()
      || ancestor.join(".jj").exists()
      || ancestor.join(WORKSPACE_DIR).exists()
    {
      return (ancestor.to_owned(), false);
    }
  }

  (dir.to_owned(), true)
}

/// Replaces a leading `~` with the home directory.
pub fn expand_tilde(path: Cow<'_, Path>) -> Cow<'_, Path> {
  let mut components = path.components();
  if let Some(std::path::Component::Normal(first)) = components.next()
    && first == "~"
    && let Ok(home) = etcetera::home_dir()
  {
    return Cow::Owned(home.join(components.as_path()));
  }
  path
}

fn default_config_file() -> PathBuf {
  config_dir().join("config.toml")
}

fn ensure_parent_dir(path: &Path) {
  if let Some(parent) = path.parent()
    && !parent.exists()
  {
    std::fs::create_dir_all(parent).ok();
  }
}

#[cfg(test)]
mod merge_toml_tests {
  use toml::Value;

  use super::merge_toml_values;

  #[test]
  fn editor_table_merges_key_by_key() {
    let base: Value = toml::from_str(crate::config::DEFAULT_CONFIG).unwrap();
    let user: Value = toml::from_str("[editor]\ncancel-key = \"ESC\"").unwrap();

    let merged = merge_toml_values(base, user, 3);
    let editor = merged.get("editor").unwrap();
    assert_eq!(editor.get("cancel-key").and_then(Value::as_str), Some("ESC"));
    assert_eq!(
      editor.get("default-buffer").and_then(Value::as_str),
      Some("*scratch*")
    );
  }

  #[test]
  fn arrays_are_replaced() {
    let base: Value = toml::from_str("plugins = [\"a.rhai\", \"b.rhai\"]").unwrap();
    let overlay: Value = toml::from_str("plugins = []").unwrap();
    let merged = merge_toml_values(base, overlay, 3);
    assert_eq!(merged.get("plugins").and_then(Value::as_array), Some(&vec![]));
  }

  #[test]
  fn depth_limits_recursion() {
    let base: Value = toml::from_str("[keys.global]\n\"C-a\" = \"x\"").unwrap();
    let overlay: Value = toml::from_str("[keys.global]\n\"C-b\" = \"y\"").unwrap();

    let shallow = merge_toml_values(base.clone(), overlay.clone(), 1);
    let global = &shallow["keys"]["global"];
    assert!(global.get("C-a").is_none());

    let deep = merge_toml_values(base, overlay, 3);
    let global = &deep["keys"]["global"];
    assert_eq!(global.get("C-a").and_then(Value::as_str), Some("x"));
    assert_eq!(global.get("C-b").and_then(Value::as_str), Some("y"));
  }
}

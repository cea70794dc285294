use std::{
  path::Path,
  time::{
    SystemTime,
    UNIX_EPOCH,
  },
};

use anyhow::{
  Context,
  Result,
};

/// Sends `log` output to `file`. Verbosity 0 logs warnings, each `-v`
/// adds a level up to trace.
pub fn setup_logging(verbosity: u8, file: &Path) -> Result<()> {
  let level = match verbosity {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    2 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };

  let file_config = fern::Dispatch::new()
    .format(|out, message, record| {
      let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
      out.finish(format_args!(
        "{}.{:03} {} [{}] {}",
        now.as_secs(),
        now.subsec_millis(),
        record.target(),
        record.level(),
        message
      ))
    })
    .chain(
      fern::log_file(file).with_context(|| format!("failed to open log file {}", file.display()))?,
    );

  fern::Dispatch::new()
    .level(level)
    .chain(file_config)
    .apply()
    .context("logger already initialized")?;
  Ok(())
}

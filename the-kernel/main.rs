mod cli;
mod logging;

use std::io;

use anyhow::{
  Context,
  Result,
};
use the_kernel::{
  Editor,
  shell::Shell,
};
use the_loader::config::Config;

use crate::cli::CliOptions;

fn main() -> Result<()> {
  let exit_code = main_impl()?;
  std::process::exit(exit_code);
}

fn main_impl() -> Result<i32> {
  let args = CliOptions::parse()?;

  the_loader::initialize_config_file(args.config_file.clone());
  the_loader::initialize_log_file(args.log_file.clone());
  logging::setup_logging(args.verbosity, &the_loader::log_file())?;

  let config = Config::load().context("failed to load configuration")?;
  let editor = Editor::with_config(&config)?;

  let init = args.load_init.then(the_loader::init_file);
  let plugins: Vec<_> = config
    .plugins
    .iter()
    .chain(&args.plugins)
    .map(|path| the_loader::expand_tilde(path.into()).into_owned())
    .collect();
  let failures = editor.startup(init.as_deref(), &plugins);
  for err in &failures {
    eprintln!("{err}");
  }

  let mut exit_code = 0;
  for code in &args.eval {
    match editor.eval(code) {
      Ok(value) if !value.is_nil() => println!("{value}"),
      Ok(_) => {},
      Err(err) => {
        eprintln!("{err}");
        exit_code = 1;
      },
    }
  }
  if !args.eval.is_empty() {
    return Ok(exit_code);
  }

  let shell = Shell::new(editor);
  println!("the-kernel {}. Type :help", env!("CARGO_PKG_VERSION"));
  shell.run_loop(io::stdin().lock(), io::stdout().lock())?;
  Ok(0)
}

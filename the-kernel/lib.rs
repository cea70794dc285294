//! # the-kernel
//!
//! An extensible editor kernel: the [`Editor`] handle ties the editor model
//! from `the-lib` to the dispatch tables from `the-dispatch`, runs built-in
//! commands, and loads Rhai extension units that add their own commands and
//! hooks at runtime.
//!
//! ```rust
//! use the_kernel::Editor;
//! use the_lib::value::Value;
//!
//! let editor = Editor::new();
//! editor.define("ping", "Reply with pong.", |_, _| Ok(Value::from("pong")));
//! assert_eq!(editor.execute("ping", vec![]).unwrap(), Value::from("pong"));
//!
//! editor
//!   .load_source(
//!     Some("hello"),
//!     r#"fn activate(editor) {
//!          editor.command("hello", |editor| editor.run("insert", ["hello"]));
//!        }"#,
//!   )
//!   .unwrap();
//! assert_eq!(editor.press("C-x 2").unwrap(), "ran split-window-below");
//! editor.execute("hello", vec![]).unwrap();
//! ```

pub mod commands;
pub mod editor;
pub mod error;
pub mod event;
pub mod script;
pub mod shell;

pub use editor::{
  Args,
  CommandFn,
  CommandOutput,
  Editor,
  HookCallback,
};
pub use error::{
  Error,
  Result,
};
pub use event::HookPayload;

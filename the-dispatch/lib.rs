//! # the-dispatch
//!
//! Generic, name-keyed dispatch tables for an extensible host.
//!
//! This crate knows nothing about editors. It provides three tables that a
//! host fills at runtime and drives itself:
//!
//! - [`CommandRegistry`]: command name to handler plus [`CommandMeta`]
//!   (documentation, [`Signature`], origin and [`SourceKind`]).
//! - [`HookRegistry`]: event name to an ordered list of callbacks, run with
//!   [`emit_isolated`] so one failing callback cannot stop the others.
//! - [`PluginRegistry`]: load order, status and attribution of extension
//!   units.
//!
//! ## Re-entrancy
//!
//! Handlers and callbacks are stored behind `Rc` and handed out as clones,
//! so a host can release its borrow of a table before running user code.
//! That user code may then register commands, add hooks or run other
//! commands through the same host.
//!
//! ```rust
//! use std::{
//!   cell::RefCell,
//!   rc::Rc,
//! };
//!
//! use the_dispatch::{
//!   CommandMeta,
//!   CommandRegistry,
//!   SourceKind,
//! };
//!
//! struct Host {
//!   commands: RefCell<CommandRegistry<Host, i64, i64>>,
//! }
//!
//! impl Host {
//!   fn run(&self, name: &str, arg: i64) -> Option<i64> {
//!     // Clone the entry out; no borrow is held while the handler runs.
//!     let entry = self.commands.borrow().get(name)?;
//!     Some((entry.handler)(self, arg))
//!   }
//! }
//!
//! let host = Host {
//!   commands: RefCell::new(CommandRegistry::new()),
//! };
//! host.commands.borrow_mut().register(
//!   "double",
//!   Rc::new(|_: &Host, n: i64| n * 2),
//!   CommandMeta::new("Double N.", "doc-test", SourceKind::Builtin),
//! );
//! host.commands.borrow_mut().register(
//!   "quadruple",
//!   Rc::new(|host: &Host, n: i64| host.run("double", host.run("double", n).unwrap()).unwrap()),
//!   CommandMeta::new("Quadruple N.", "doc-test", SourceKind::Builtin),
//! );
//!
//! assert_eq!(host.run("quadruple", 3), Some(12));
//! ```

mod hooks;
mod plugin;
mod registry;

pub use hooks::{
  HookEntry,
  HookFailure,
  HookFn,
  HookId,
  HookRegistry,
  emit_isolated,
  panic_message,
};
pub use plugin::{
  PluginId,
  PluginRecord,
  PluginRegistry,
  PluginStatus,
};
pub use registry::{
  ArityError,
  CommandEntry,
  CommandMeta,
  CommandRegistry,
  DynHandler,
  Signature,
  SourceKind,
};

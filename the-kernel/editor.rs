//! The editor handle.
//!
//! [`Editor`] is a cheap, cloneable handle around the editor state and the
//! dispatch tables. Every command handler, hook callback and extension entry
//! point receives one. State is only borrowed for the duration of a single
//! operation and never while user code runs, so handlers may freely call
//! back into the editor: run commands, register commands, emit hooks, split
//! windows.

use std::{
  cell::{
    Cell,
    RefCell,
  },
  panic::{
    self,
    AssertUnwindSafe,
  },
  path::{
    Path,
    PathBuf,
  },
  rc::Rc,
};

use rhai::{
  AST,
  Engine,
};
use the_dispatch::{
  CommandMeta,
  CommandRegistry,
  DynHandler,
  HookFn,
  HookId,
  HookRegistry,
  PluginId,
  PluginRecord,
  PluginRegistry,
  SourceKind,
  emit_isolated,
  panic_message,
};
use the_lib::{
  editor::EditorState,
  graphics::Rect,
  input::{
    KeyChord,
    KeySequence,
  },
  keymap::{
    KeyOutcome,
    LayerScope,
    Resolution,
  },
  messages::EchoArea,
  snapshot::RenderSnapshot,
  value::Value,
};
use the_loader::config::Config;

use crate::{
  commands,
  error::{
    Error,
    Result,
  },
  event::{
    self,
    HookPayload,
  },
  script,
};

pub type Args = Vec<Value>;
pub type CommandOutput = anyhow::Result<Value>;
pub type CommandFn = DynHandler<Editor, Args, CommandOutput>;
pub type HookCallback = HookFn<Editor, HookPayload, anyhow::Error>;

/// Name the fallback for unbound printable keys is registered under.
pub const SELF_INSERT: &str = "self-insert-command";

/// Area used for snapshots when the front end does not supply one.
pub const DEFAULT_AREA: Rect = Rect::new(0, 0, 80, 24);

/// Registration context: what is running right now.
///
/// Commands and hooks registered while a frame is active inherit its source
/// kind and origin, and are attributed to its plugin.
#[derive(Clone)]
pub(crate) struct Frame {
  pub source: SourceKind,
  pub origin: String,
  pub plugin: Option<PluginId>,
  /// Compiled unit that script callbacks defined in this frame resolve
  /// their functions against.
  pub ast:    Option<Rc<AST>>,
}

pub(crate) struct FrameGuard<'a> {
  editor: &'a Editor,
}

impl Drop for FrameGuard<'_> {
  fn drop(&mut self) {
    self.editor.inner.frames.borrow_mut().pop();
  }
}

/// Restores the command nesting depth, also when a handler unwinds.
struct DepthGuard<'a> {
  depth: &'a Cell<usize>,
  saved: usize,
}

impl<'a> DepthGuard<'a> {
  fn enter(depth: &'a Cell<usize>) -> Self {
    let saved = depth.get();
    depth.set(saved + 1);
    Self { depth, saved }
  }
}

impl Drop for DepthGuard<'_> {
  fn drop(&mut self) {
    self.depth.set(self.saved);
  }
}

pub(crate) struct Inner {
  pub state:       RefCell<EditorState>,
  pub commands:    RefCell<CommandRegistry<Editor, Args, CommandOutput>>,
  pub hooks:       RefCell<HookRegistry<Editor, HookPayload, anyhow::Error>>,
  pub plugins:     RefCell<PluginRegistry>,
  pub frames:      RefCell<Vec<Frame>>,
  pub engine:      Rc<Engine>,
  pub depth:       Cell<usize>,
  /// Counter for `<source:N>` identities.
  pub sources:     Cell<usize>,
  pub quit:        Cell<bool>,
  pub split_ratio: f32,
}

#[derive(Clone)]
pub struct Editor {
  pub(crate) inner: Rc<Inner>,
}

impl Default for Editor {
  fn default() -> Self {
    Self::new()
  }
}

impl Editor {
  /// Editor with the built-in commands and default bindings.
  pub fn new() -> Self {
    Self::with_config(&Config::default()).expect("built-in configuration is valid")
  }

  pub fn with_config(config: &Config) -> Result<Self> {
    config
      .validate()
      .map_err(|err| Error::Config(format!("{err:#}")))?;

    let mut state = EditorState::new(&config.editor.default_buffer);
    *state.echo_mut() = EchoArea::with_limit(config.editor.message_history);
    let cancel: KeyChord = config
      .editor
      .cancel_key
      .parse()
      .map_err(|err| Error::Config(format!("editor.cancel-key: {err}")))?;
    state.resolver_mut().set_cancel_key(cancel);
    for (name, value) in &config.variables {
      state.set_variable(name, value.clone());
    }

    let editor = Self {
      inner: Rc::new(Inner {
        state:       RefCell::new(state),
        commands:    RefCell::new(CommandRegistry::new()),
        hooks:       RefCell::new(HookRegistry::new()),
        plugins:     RefCell::new(PluginRegistry::new()),
        frames:      RefCell::new(Vec::new()),
        engine:      Rc::new(script::build_engine()),
        depth:       Cell::new(0),
        sources:     Cell::new(0),
        quit:        Cell::new(false),
        split_ratio: config.editor.split_ratio,
      }),
    };

    commands::register_builtins(&editor);
    commands::bind_defaults(&editor)?;

    let scoped = config
      .keys
      .global
      .iter()
      .map(|binding| (LayerScope::Global, binding))
      .chain(config.keys.mode.iter().flat_map(|(mode, bindings)| {
        bindings
          .iter()
          .map(move |binding| (LayerScope::Mode(mode.clone()), binding))
      }));
    for (scope, (keys, command)) in scoped {
      editor.bind_configured(&scope, keys, command)?;
    }

    Ok(editor)
  }

  /// Config bindings may name commands that a plugin defines later, so
  /// unknown commands are only warned about.
  fn bind_configured(&self, scope: &LayerScope, keys: &str, command: &str) -> Result<()> {
    let sequence: KeySequence = keys
      .parse()
      .map_err(|err| Error::Config(format!("keys.{scope} \"{keys}\": {err}")))?;
    if !self.has_command(command) {
      log::warn!("binding {keys} ({scope}) to {command}, which is not defined yet");
    }
    self.with_state_mut(|state| -> Result<()> {
      state.keymap_mut(scope)?.bind(&sequence, command);
      Ok(())
    })
  }

  pub fn ptr_eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }

  // State access.

  /// Runs `f` with shared access to the state. `f` must not call back into
  /// the editor.
  pub fn with_state<R>(&self, f: impl FnOnce(&EditorState) -> R) -> R {
    f(&self.inner.state.borrow())
  }

  /// Runs `f` with exclusive access to the state. `f` must not call back
  /// into the editor.
  pub fn with_state_mut<R>(&self, f: impl FnOnce(&mut EditorState) -> R) -> R {
    f(&mut self.inner.state.borrow_mut())
  }

  pub fn split_ratio(&self) -> f32 {
    self.inner.split_ratio
  }

  pub fn variable(&self, name: &str) -> Option<Value> {
    self.with_state(|state| state.variable(name).cloned())
  }

  pub fn set_variable(&self, name: &str, value: Value) -> Option<Value> {
    self.with_state_mut(|state| state.set_variable(name, value))
  }

  /// Shows `text` in the echo area.
  pub fn message(&self, text: impl Into<String>) {
    let source = self.current_frame().map(|frame| frame.origin);
    self.with_state_mut(|state| state.echo_mut().info(source, text));
  }

  pub fn snapshot(&self) -> RenderSnapshot {
    self.snapshot_in(DEFAULT_AREA)
  }

  pub fn snapshot_in(&self, area: Rect) -> RenderSnapshot {
    self.with_state(|state| state.snapshot(area))
  }

  pub fn quit(&self) {
    self.inner.quit.set(true);
  }

  pub fn should_quit(&self) -> bool {
    self.inner.quit.get()
  }

  // Registration context.

  pub(crate) fn engine(&self) -> Rc<Engine> {
    Rc::clone(&self.inner.engine)
  }

  pub(crate) fn push_frame(&self, frame: Frame) -> FrameGuard<'_> {
    self.inner.frames.borrow_mut().push(frame);
    FrameGuard { editor: self }
  }

  pub(crate) fn current_frame(&self) -> Option<Frame> {
    self.inner.frames.borrow().last().cloned()
  }

  /// Nesting depth of command execution.
  pub fn depth(&self) -> usize {
    self.inner.depth.get()
  }

  // Commands.

  /// Registers or replaces `name`.
  ///
  /// Outside of any plugin or eval the metadata is taken as given. Inside
  /// one, the source kind and origin come from the running unit and the
  /// command is attributed to its plugin record.
  pub fn register_command(&self, name: &str, mut meta: CommandMeta, handler: CommandFn) {
    if let Some(frame) = self.current_frame() {
      meta.source = frame.source;
      meta.origin = frame.origin;
      if let Some(plugin) = frame.plugin {
        self
          .inner
          .plugins
          .borrow_mut()
          .attribute_command(plugin, name);
      }
    }

    let source = meta.source;
    let replaced = self
      .inner
      .commands
      .borrow_mut()
      .register(name, handler, meta);
    match replaced {
      Some(old) => log::info!("redefined command {name} ({} -> {source})", old.meta.source),
      None => log::debug!("registered command {name} ({source})"),
    }
  }

  /// Registers a native command taking any number of arguments.
  pub fn define<F>(&self, name: &str, doc: &str, handler: F)
  where
    F: Fn(&Editor, Args) -> CommandOutput + 'static,
  {
    self.register_command(
      name,
      CommandMeta::new(doc, "native", SourceKind::Builtin),
      Rc::new(handler),
    );
  }

  pub fn has_command(&self, name: &str) -> bool {
    self.inner.commands.borrow().contains(name)
  }

  pub fn command_meta(&self, name: &str) -> Option<CommandMeta> {
    self.inner.commands.borrow().meta(name).cloned()
  }

  /// Registered command names, sorted.
  pub fn commands(&self) -> Vec<String> {
    self
      .inner
      .commands
      .borrow()
      .names()
      .into_iter()
      .map(str::to_string)
      .collect()
  }

  /// Runs `name` with `args`.
  ///
  /// `before-command` fires first and `after-command` fires after the
  /// handler whether or not it succeeded. Hook failures never affect the
  /// command.
  pub fn execute(&self, name: &str, args: Args) -> Result<Value> {
    let entry = self
      .inner
      .commands
      .borrow()
      .get(name)
      .ok_or_else(|| Error::UnknownCommand(name.to_string()))?;

    let depth = self.inner.depth.get();
    log::debug!(
      "{:indent$}execute {name} {args:?}",
      "",
      indent = depth * 2
    );

    self.emit(&HookPayload::before_command(name, &args));

    let guard = DepthGuard::enter(&self.inner.depth);
    let outcome = match entry.meta.signature.check(name, args.len()) {
      Ok(()) => {
        panic::catch_unwind(AssertUnwindSafe(|| (entry.handler)(self, args.clone())))
          .unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            log::error!("command {name} panicked: {message}");
            Err(anyhow::anyhow!("panicked: {message}"))
          })
      },
      Err(err) => Err(err.into()),
    };
    drop(guard);

    self.emit(&HookPayload::after_command(name, &args, &outcome));

    outcome.map_err(|cause| {
      Error::CommandFailed {
        name: name.to_string(),
        cause,
      }
    })
  }

  // Hooks.

  /// Appends `callback` to `event`. The same callback may be added twice.
  pub fn on(&self, event: &str, callback: HookCallback) -> HookId {
    let frame = self.current_frame();
    let origin = frame
      .as_ref()
      .map_or_else(|| "native".to_string(), |frame| frame.origin.clone());
    let id = self
      .inner
      .hooks
      .borrow_mut()
      .register(event, origin, callback);
    if let Some(plugin) = frame.and_then(|frame| frame.plugin) {
      self.inner.plugins.borrow_mut().attribute_hook(plugin, id);
    }
    log::debug!("added hook {id} for {event}");
    id
  }

  pub fn add_hook<F>(&self, event: &str, callback: F) -> HookId
  where
    F: Fn(&Editor, &HookPayload) -> anyhow::Result<()> + 'static,
  {
    self.on(event, Rc::new(callback))
  }

  pub fn remove_hook(&self, id: HookId) -> bool {
    self.inner.hooks.borrow_mut().remove(id)
  }

  pub fn hook_count(&self, event: &str) -> usize {
    self.inner.hooks.borrow().count(event)
  }

  /// Runs the callbacks registered for `payload.event` when the emit
  /// starts. Failing callbacks are logged and skipped. Returns the number
  /// of failures.
  pub fn emit(&self, payload: &HookPayload) -> usize {
    let entries = self.inner.hooks.borrow().callbacks(&payload.event);
    if entries.is_empty() {
      return 0;
    }
    emit_isolated(&entries, self, payload, |entry, failure| {
      let err = Error::HookCallbackFailed {
        event:  payload.event.clone(),
        hook:   entry.id,
        origin: entry.origin.clone(),
        cause:  failure.to_string(),
      };
      log::error!("{err}");
    })
  }

  // Keys.

  /// Feeds one chord through the resolver and runs whatever it resolves to.
  /// Returns a one-line status.
  pub fn feed_key(&self, chord: KeyChord) -> String {
    let outcome = self.with_state_mut(|state| state.feed_key(chord));
    match outcome {
      KeyOutcome::Resolved { command, keys, .. } => {
        log::debug!("{keys} runs {command}");
        self.run_for_status(&command, Args::new())
      },
      KeyOutcome::Pending(keys) => format!("pending {keys}"),
      KeyOutcome::Cancelled(keys) => {
        log::debug!("cancelled {keys}");
        self.with_state_mut(|state| state.echo_mut().info(None, "Quit"));
        "cancelled".to_string()
      },
      KeyOutcome::Undefined(keys) => {
        if let Some(c) = self.self_insert_char(&keys) {
          return self.run_for_status(SELF_INSERT, vec![Value::from(c.to_string())]);
        }
        let status = format!("unbound key sequence: {keys}");
        self.with_state_mut(|state| state.echo_mut().warning(None, format!("{keys} is undefined")));
        status
      },
    }
  }

  /// Feeds every chord of `keys` and returns the last status.
  pub fn press(&self, keys: &str) -> Result<String> {
    let sequence: KeySequence = keys.parse().map_err(the_lib::editor::EditorError::from)?;
    let mut status = String::new();
    for chord in sequence.iter() {
      status = self.feed_key(*chord);
    }
    Ok(status)
  }

  /// Resolves the whole of `keys` at once and runs the bound command with
  /// `args`, bypassing the pending-prefix state.
  pub fn execute_key(&self, keys: &str, args: Args) -> Result<String> {
    let sequence: KeySequence = keys.parse().map_err(the_lib::editor::EditorError::from)?;
    self.with_state_mut(|state| state.resolver_mut().cancel());
    match self.with_state(|state| state.resolve(&sequence)) {
      Resolution::Command { command, .. } => Ok(self.run_for_status(&command, args)),
      Resolution::Prefix { .. } => Ok(format!("{sequence} is a prefix key")),
      Resolution::Undefined { .. } => Ok(format!("unbound key sequence: {sequence}")),
    }
  }

  fn self_insert_char(&self, keys: &KeySequence) -> Option<char> {
    let [chord] = keys.as_slice() else {
      return None;
    };
    let c = chord.printable()?;
    if !self.has_command(SELF_INSERT) {
      return None;
    }
    // A blocking prefix on the key itself suppresses the fallback.
    let blocked = self.with_state(|state| {
      matches!(
        state.resolve(keys),
        Resolution::Undefined {
          blocked_by: Some(_),
        }
      )
    });
    (!blocked).then_some(c)
  }

  fn run_for_status(&self, command: &str, args: Args) -> String {
    match self.execute(command, args) {
      Ok(Value::Nil) => format!("ran {command}"),
      Ok(value) => {
        let text = value.to_string();
        self.with_state_mut(|state| state.echo_mut().info(Some(command.to_string()), text.clone()));
        text
      },
      Err(err) => {
        let status = format!("command error: {err}");
        log::warn!("{status}");
        self.with_state_mut(|state| state.echo_mut().error(Some(command.to_string()), status.clone()));
        status
      },
    }
  }

  // Bindings and modes.

  /// Parses `global`, `buffer` (the selected buffer), `buffer:NAME` or
  /// `mode:NAME`.
  pub fn parse_scope(&self, text: &str) -> Result<LayerScope> {
    match text.trim() {
      "" | "global" => Ok(LayerScope::Global),
      "buffer" => {
        Ok(LayerScope::Buffer(
          self.with_state(|state| state.selected_buffer().name().to_string()),
        ))
      },
      other => {
        match other.split_once(':') {
          Some(("buffer", name)) if !name.is_empty() => Ok(LayerScope::Buffer(name.to_string())),
          Some(("mode", name)) if !name.is_empty() => Ok(LayerScope::Mode(name.to_string())),
          _ => {
            Err(Error::InvalidArgument(format!(
              "bad scope \"{other}\", expected global, buffer, buffer:<name> or mode:<name>"
            )))
          },
        }
      },
    }
  }

  pub fn bind_key(&self, scope: &LayerScope, keys: &str, command: &str) -> Result<()> {
    if !self.has_command(command) {
      return Err(Error::UnknownCommand(command.to_string()));
    }
    let sequence: KeySequence = keys.parse().map_err(the_lib::editor::EditorError::from)?;
    self.with_state_mut(|state| -> Result<()> {
      state.keymap_mut(scope)?.bind(&sequence, command);
      Ok(())
    })?;
    log::debug!("bound {sequence} -> {command} ({scope})");
    Ok(())
  }

  /// Removes the binding of `keys`; returns whether there was one.
  pub fn unbind_key(&self, scope: &LayerScope, keys: &str) -> Result<bool> {
    let sequence: KeySequence = keys.parse().map_err(the_lib::editor::EditorError::from)?;
    self.with_state_mut(|state| -> Result<bool> {
      Ok(state.keymap_mut(scope)?.unbind(&sequence).is_some())
    })
  }

  /// Makes `keys` a blocking prefix in `scope`: lookups that reach it stop
  /// there and lower layers are not consulted.
  pub fn block_key(&self, scope: &LayerScope, keys: &str) -> Result<()> {
    let sequence: KeySequence = keys.parse().map_err(the_lib::editor::EditorError::from)?;
    self.with_state_mut(|state| -> Result<()> {
      state.keymap_mut(scope)?.block(&sequence);
      Ok(())
    })
  }

  /// Enables `mode` in the selected buffer.
  pub fn enable_mode(&self, mode: &str) -> Result<()> {
    self.with_state_mut(|state| {
      let buffer = state.selected_buffer_id();
      state.enable_mode(buffer, mode)
    })?;
    Ok(())
  }

  pub fn disable_mode(&self, mode: &str) -> bool {
    self.with_state_mut(|state| {
      let buffer = state.selected_buffer_id();
      state.disable_mode(buffer, mode)
    })
  }

  // Introspection.

  pub fn describe_command(&self, name: &str) -> Result<String> {
    let meta = self
      .command_meta(name)
      .ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
    Ok(format!(
      "{}\nSource: {} ({})\n\n{}",
      meta.signature.usage(name),
      meta.source,
      meta.origin,
      meta.doc
    ))
  }

  pub fn describe_key(&self, keys: &str) -> Result<String> {
    let sequence: KeySequence = keys.parse().map_err(the_lib::editor::EditorError::from)?;
    match self.with_state(|state| state.resolve(&sequence)) {
      Resolution::Command { command, scope } => {
        let mut text = format!("{sequence} runs command {command}\nScope: {scope}\n");
        match self.command_meta(&command) {
          Some(meta) => {
            text.push_str(&format!(
              "Source: {} ({})\n\n{}",
              meta.source, meta.origin, meta.doc
            ));
          },
          None => text.push_str("\nThe command is not defined."),
        }
        Ok(text)
      },
      Resolution::Prefix { scope } => {
        Err(Error::InvalidArgument(format!(
          "{sequence} is a prefix key ({scope})"
        )))
      },
      Resolution::Undefined {
        blocked_by: Some(scope),
      } => {
        Err(Error::InvalidArgument(format!(
          "{sequence} is undefined (blocked by {scope})"
        )))
      },
      Resolution::Undefined { blocked_by: None } => {
        Err(Error::InvalidArgument(format!("{sequence} is undefined")))
      },
    }
  }

  /// Every binding of `command` in the selected buffer's active layers,
  /// including ones shadowed by a higher layer.
  pub fn where_is(&self, command: &str) -> Vec<(KeySequence, LayerScope)> {
    self.with_state(|state| state.where_is(command))
  }

  pub fn where_is_text(&self, command: &str) -> String {
    let bindings = self.where_is(command);
    if bindings.is_empty() {
      return format!("{command} is not on any key in the current context.");
    }
    let mut text = format!("{command} is on:\n");
    for (keys, scope) in bindings {
      text.push_str(&format!("\n{:<12} {scope}", keys.to_string()));
    }
    text
  }

  // Plugins.

  pub fn plugins(&self) -> Vec<PluginRecord> {
    self.inner.plugins.borrow().iter().cloned().collect()
  }

  pub fn plugin(&self, identity: &str) -> Option<PluginRecord> {
    self.inner.plugins.borrow().find(identity).cloned()
  }

  /// Loads `init` (when it exists) and then `plugins`, in order. A failing
  /// unit is logged and echoed; the rest still load. Emits
  /// `startup-complete` at the end.
  pub fn startup(&self, init: Option<&Path>, plugins: &[PathBuf]) -> Vec<Error> {
    let init = init.filter(|path| path.exists()).map(Path::to_path_buf);
    let mut failures = Vec::new();
    for path in init.iter().chain(plugins) {
      if let Err(err) = self.load_plugin(path) {
        log::error!("{err}");
        self.with_state_mut(|state| state.echo_mut().error(Some("startup".into()), err.to_string()));
        failures.push(err);
      }
    }
    self.emit(&HookPayload::new(event::STARTUP_COMPLETE));
    failures
  }
}

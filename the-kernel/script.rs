//! Rhai extension units: plugin files, source strings and `eval`.
//!
//! A unit must define `fn activate(editor)`. Loading compiles the unit and
//! checks for that entry point before anything runs, then evaluates the
//! top level and calls `activate` once. Scripts reach the editor through
//! methods on the `editor` handle:
//!
//! ```rhai
//! fn activate(editor) {
//!   editor.command("hello", "Greet.", |editor, args| {
//!     editor.run("insert", ["hello"]);
//!   });
//!   editor.on("before-command", |editor, payload| {
//!     editor.set_var("last", payload.command);
//!   });
//! }
//! ```

use std::{
  path::Path,
  rc::Rc,
};

use rhai::{
  AST,
  CallFnOptions,
  Dynamic,
  Engine,
  EvalAltResult,
  FnPtr,
  Scope,
};
use the_dispatch::{
  CommandMeta,
  PluginRecord,
  PluginStatus,
  Signature,
  SourceKind,
};
use the_lib::value::{
  Value,
  ValueMap,
};

use crate::{
  editor::{
    Args,
    Editor,
    Frame,
  },
  error::{
    Error,
    Result,
  },
  event::{
    self,
    HookPayload,
  },
};

/// Name of the entry point every unit defines.
pub const ENTRY_POINT: &str = "activate";

/// Name the handle is bound to in a unit's top-level scope.
pub const HANDLE_NAME: &str = "editor";

pub const EVAL_ORIGIN: &str = "<eval>";

type ScriptResult<T> = std::result::Result<T, Box<EvalAltResult>>;

pub(crate) fn build_engine() -> Engine {
  let mut engine = Engine::new();
  // Debug builds default to shallow limits that reject ordinary closures.
  engine.set_max_expr_depths(0, 0);

  engine.on_print(|text| log::info!(target: "script", "{text}"));
  engine.on_debug(|text, source, pos| {
    log::debug!(target: "script", "{}{pos:?}: {text}", source.unwrap_or("<unknown>"));
  });

  engine.register_type_with_name::<Editor>("Editor");

  engine
    .register_fn(
      "command",
      |editor: &mut Editor, name: &str, callback: FnPtr| -> ScriptResult<()> {
        define_script_command(editor, name, "", callback)
      },
    )
    .register_fn(
      "command",
      |editor: &mut Editor, name: &str, doc: &str, callback: FnPtr| -> ScriptResult<()> {
        define_script_command(editor, name, doc, callback)
      },
    )
    .register_fn(
      "on",
      |editor: &mut Editor, event: &str, callback: FnPtr| -> ScriptResult<i64> {
        let callback = ScriptCallback::capture(editor, callback, "hook callback", "(editor, payload)")?;
        let id = editor.add_hook(event, move |editor, payload| {
          let payload = to_dynamic(&payload.to_value());
          callback.call(editor, payload).map(drop)
        });
        Ok(id.get() as i64)
      },
    )
    .register_fn("get_var", |editor: &mut Editor, name: &str| {
      editor
        .variable(name)
        .map_or(Dynamic::UNIT, |value| to_dynamic(&value))
    })
    .register_fn(
      "set_var",
      |editor: &mut Editor, name: &str, value: Dynamic| {
        editor.set_variable(name, from_dynamic(value));
      },
    )
    .register_fn(
      "run",
      |editor: &mut Editor, name: &str| -> ScriptResult<Dynamic> { run(editor, name, Args::new()) },
    )
    .register_fn(
      "run",
      |editor: &mut Editor, name: &str, args: rhai::Array| -> ScriptResult<Dynamic> {
        run(editor, name, args.into_iter().map(from_dynamic).collect())
      },
    )
    .register_fn("message", |editor: &mut Editor, text: &str| {
      editor.message(text);
    })
    .register_fn(
      "bind",
      |editor: &mut Editor, keys: &str, command: &str| -> ScriptResult<()> {
        bind(editor, "global", keys, command)
      },
    )
    .register_fn(
      "bind",
      |editor: &mut Editor, scope: &str, keys: &str, command: &str| -> ScriptResult<()> {
        bind(editor, scope, keys, command)
      },
    );

  engine
}

fn run(editor: &Editor, name: &str, args: Args) -> ScriptResult<Dynamic> {
  editor
    .execute(name, args)
    .map(|value| to_dynamic(&value))
    .map_err(|err| err.to_string().into())
}

fn bind(editor: &Editor, scope: &str, keys: &str, command: &str) -> ScriptResult<()> {
  let scope = editor.parse_scope(scope).map_err(|err| err.to_string())?;
  editor
    .bind_key(&scope, keys, command)
    .map_err(|err| err.to_string().into())
}

fn define_script_command(editor: &Editor, name: &str, doc: &str, callback: FnPtr) -> ScriptResult<()> {
  let callback = ScriptCallback::capture(editor, callback, "command handler", "(editor, args)")?;
  let signature = if callback.arity == 1 {
    Signature::NONE
  } else {
    Signature::DEFAULT
  };
  let meta = CommandMeta::new(doc, callback.frame.origin.clone(), callback.frame.source)
    .with_signature(signature);
  editor.register_command(
    name,
    meta,
    Rc::new(move |editor: &Editor, args: Args| {
      let args = Dynamic::from_array(args.iter().map(to_dynamic).collect());
      callback.call(editor, args).map(from_dynamic)
    }),
  );
  Ok(())
}

/// A script function stored as a command handler or hook callback.
///
/// Keeps the unit it was defined in so closures resolve, and re-enters that
/// unit's frame while running.
struct ScriptCallback {
  frame:  Frame,
  fn_ptr: FnPtr,
  /// 1 for `(editor)`, 2 for `(editor, extra)`.
  arity:  usize,
}

impl ScriptCallback {
  fn capture(editor: &Editor, fn_ptr: FnPtr, what: &str, full: &str) -> ScriptResult<Self> {
    let frame = editor
      .current_frame()
      .filter(|frame| frame.ast.is_some())
      .ok_or_else(|| format!("{what} registered outside of a script"))?;
    let ast = frame.ast.as_deref().ok_or("missing script unit")?;

    let arity = callback_arity(ast, &fn_ptr).unwrap_or(2);
    if !(1..=2).contains(&arity) {
      return Err(
        format!(
          "{what} {} takes {arity} parameters, expected (editor) or {full}",
          fn_ptr.fn_name()
        )
        .into(),
      );
    }
    Ok(Self {
      frame,
      fn_ptr,
      arity,
    })
  }

  fn call(&self, editor: &Editor, extra: Dynamic) -> anyhow::Result<Dynamic> {
    let Some(ast) = self.frame.ast.clone() else {
      anyhow::bail!("script unit {} is gone", self.frame.origin);
    };
    let engine = editor.engine();
    let _frame = editor.push_frame(self.frame.clone());
    let result = if self.arity == 1 {
      self
        .fn_ptr
        .call::<Dynamic>(&engine, &ast, (editor.clone(),))
    } else {
      self
        .fn_ptr
        .call::<Dynamic>(&engine, &ast, (editor.clone(), extra))
    };
    result.map_err(|err| anyhow::anyhow!("{err}"))
  }
}

/// Parameters the script function behind `fn_ptr` expects from a caller,
/// or `None` when it is not defined in `ast`.
fn callback_arity(ast: &AST, fn_ptr: &FnPtr) -> Option<usize> {
  let curried = fn_ptr.curry().len();
  ast
    .iter_functions()
    .filter(|f| f.name == fn_ptr.fn_name())
    .map(|f| f.params.len().saturating_sub(curried))
    .min()
}

fn check_activate(ast: &AST) -> std::result::Result<(), String> {
  let entry = ast
    .iter_functions()
    .find(|f| f.name == ENTRY_POINT)
    .ok_or_else(|| format!("missing fn {ENTRY_POINT}({HANDLE_NAME})"))?;
  match entry.params.len() {
    1 => Ok(()),
    n => {
      Err(format!(
        "fn {ENTRY_POINT} must take exactly one parameter ({HANDLE_NAME}), found {n}"
      ))
    },
  }
}

impl Editor {
  /// Loads the plugin file at `path`. Loading a file that is already active
  /// does nothing and returns its record.
  pub fn load_plugin(&self, path: &Path) -> Result<PluginRecord> {
    let canonical = path.canonicalize().map_err(|source| {
      Error::Io {
        path: path.to_path_buf(),
        source,
      }
    })?;
    let identity = canonical.display().to_string();
    if let Some(record) = self.plugin(&identity)
      && record.status == PluginStatus::Active
    {
      log::info!("plugin {identity} is already loaded");
      return Ok(record);
    }

    let source = std::fs::read_to_string(&canonical).map_err(|source| {
      Error::Io {
        path: canonical.clone(),
        source,
      }
    })?;
    self.load_unit(&identity, &source)
  }

  /// Loads a unit from a string. Without a name the unit is identified as
  /// `<source:N>`.
  pub fn load_source(&self, name: Option<&str>, source: &str) -> Result<PluginRecord> {
    let identity = match name {
      Some(name) => name.to_string(),
      None => {
        let n = self.inner.sources.get() + 1;
        self.inner.sources.set(n);
        format!("<source:{n}>")
      },
    };
    if let Some(record) = self.plugin(&identity)
      && record.status == PluginStatus::Active
    {
      log::info!("plugin {identity} is already loaded");
      return Ok(record);
    }
    self.load_unit(&identity, source)
  }

  fn load_unit(&self, identity: &str, source: &str) -> Result<PluginRecord> {
    let invalid = |reason: String| {
      Error::InvalidPlugin {
        plugin: identity.to_string(),
        reason,
      }
    };

    let engine = self.engine();
    let mut ast = engine
      .compile(source)
      .map_err(|err| invalid(err.to_string()))?;
    ast.set_source(identity);
    check_activate(&ast).map_err(invalid)?;
    let ast = Rc::new(ast);

    let id = self.inner.plugins.borrow_mut().begin(identity);
    log::info!("loading plugin {identity}");

    let outcome = {
      let _frame = self.push_frame(Frame {
        source: SourceKind::Plugin,
        origin: identity.to_string(),
        plugin: Some(id),
        ast:    Some(Rc::clone(&ast)),
      });
      let mut scope = Scope::new();
      scope.push(HANDLE_NAME, self.clone());
      let options = CallFnOptions::new().eval_ast(true).rewind_scope(true);
      engine.call_fn_with_options::<Dynamic>(
        options,
        &mut scope,
        &ast,
        ENTRY_POINT,
        (self.clone(),),
      )
    };

    if let Err(err) = outcome {
      let reason = err.to_string();
      self
        .inner
        .plugins
        .borrow_mut()
        .set_status(id, PluginStatus::Failed(reason.clone()));
      return Err(invalid(reason));
    }

    self
      .inner
      .plugins
      .borrow_mut()
      .set_status(id, PluginStatus::Active);
    let record = self
      .inner
      .plugins
      .borrow()
      .get(id)
      .cloned()
      .ok_or_else(|| invalid("plugin record disappeared".to_string()))?;
    log::info!(
      "loaded plugin {identity}: {} commands, {} hooks",
      record.commands.len(),
      record.hooks.len()
    );
    self.emit(&HookPayload::new(event::PLUGIN_LOADED).with_detail(identity));
    Ok(record)
  }

  /// Evaluates `code` with `editor` in scope and returns its value.
  pub fn eval(&self, code: &str) -> Result<Value> {
    let engine = self.engine();
    let mut ast = engine
      .compile(code)
      .map_err(|err| Error::Eval(err.to_string()))?;
    ast.set_source(EVAL_ORIGIN);
    let ast = Rc::new(ast);

    let _frame = self.push_frame(Frame {
      source: SourceKind::Runtime,
      origin: EVAL_ORIGIN.to_string(),
      plugin: None,
      ast:    Some(Rc::clone(&ast)),
    });
    let mut scope = Scope::new();
    scope.push(HANDLE_NAME, self.clone());
    engine
      .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
      .map(from_dynamic)
      .map_err(|err| Error::Eval(err.to_string()))
  }
}

pub fn to_dynamic(value: &Value) -> Dynamic {
  match value {
    Value::Nil => Dynamic::UNIT,
    Value::Bool(b) => Dynamic::from(*b),
    Value::Int(i) => Dynamic::from(*i),
    Value::Float(x) => Dynamic::from(*x),
    Value::Str(s) => Dynamic::from(s.clone()),
    Value::List(items) => Dynamic::from_array(items.iter().map(to_dynamic).collect()),
    Value::Map(map) => {
      Dynamic::from_map(
        map
          .iter()
          .map(|(key, value)| (key.as_str().into(), to_dynamic(value)))
          .collect(),
      )
    },
  }
}

/// Converts a script value. Values with no counterpart (functions, the
/// editor handle) become their display string.
pub fn from_dynamic(value: Dynamic) -> Value {
  if value.is_unit() {
    return Value::Nil;
  }
  if let Ok(b) = value.as_bool() {
    return Value::Bool(b);
  }
  if let Ok(i) = value.as_int() {
    return Value::Int(i);
  }
  if let Ok(x) = value.as_float() {
    return Value::Float(x);
  }
  if let Ok(c) = value.as_char() {
    return Value::Str(c.to_string());
  }
  if value.is_string() {
    return Value::Str(value.to_string());
  }
  if value.is_array() {
    let items = value.cast::<rhai::Array>();
    return Value::List(items.into_iter().map(from_dynamic).collect());
  }
  if value.is_map() {
    let map = value.cast::<rhai::Map>();
    return Value::Map(
      map
        .into_iter()
        .map(|(key, value)| (key.to_string(), from_dynamic(value)))
        .collect::<ValueMap>(),
    );
  }
  Value::Str(value.to_string())
}

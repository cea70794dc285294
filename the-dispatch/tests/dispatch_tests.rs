use std::cell::RefCell;
use std::rc::Rc;

use the_dispatch::{
  CommandMeta,
  CommandRegistry,
  DynHandler,
  HookFailure,
  HookFn,
  HookRegistry,
  PluginRegistry,
  PluginStatus,
  Signature,
  SourceKind,
  emit_isolated,
};

// Test context shared by handlers and callbacks
struct TestCtx {
  log:   Rc<RefCell<Vec<String>>>,
  hooks: RefCell<HookRegistry<TestCtx, String, String>>,
}

impl TestCtx {
  fn new() -> Self {
    Self {
      log:   Rc::new(RefCell::new(Vec::new())),
      hooks: RefCell::new(HookRegistry::new()),
    }
  }

  fn push(&self, msg: &str) {
    self.log.borrow_mut().push(msg.to_string());
  }

  fn logs(&self) -> Vec<String> {
    self.log.borrow().clone()
  }

  fn emit(&self, event: &str, payload: String) -> Vec<String> {
    let entries = self.hooks.borrow().callbacks(event);
    let mut failures = Vec::new();
    emit_isolated(&entries, self, &payload, |entry, failure| {
      failures.push(format!("{} {}", entry.id, failure));
    });
    failures
  }
}

type Registry = CommandRegistry<TestCtx, Vec<String>, Result<String, String>>;

fn handler<F>(f: F) -> DynHandler<TestCtx, Vec<String>, Result<String, String>>
where
  F: Fn(&TestCtx, Vec<String>) -> Result<String, String> + 'static,
{
  Rc::new(f)
}

fn hook<F>(f: F) -> HookFn<TestCtx, String, String>
where
  F: Fn(&TestCtx, &String) -> Result<(), String> + 'static,
{
  Rc::new(f)
}

fn meta(source: SourceKind) -> CommandMeta {
  CommandMeta::new("test command", "tests", source)
}

#[test]
fn test_register_overwrites_entry_and_source() {
  let mut registry = Registry::new();
  registry.register(
    "ping",
    handler(|_, _| Ok("pong".to_string())),
    meta(SourceKind::Builtin),
  );
  let previous = registry.register(
    "ping",
    handler(|_, _| Ok("PONG".to_string())),
    meta(SourceKind::Runtime),
  );

  assert!(previous.is_some());
  assert_eq!(registry.len(), 1);
  let entry = registry.get("ping").unwrap();
  assert_eq!(entry.meta.source, SourceKind::Runtime);
  assert_eq!((entry.handler)(&TestCtx::new(), vec![]), Ok("PONG".to_string()));
}

#[test]
fn test_names_are_sorted() {
  let mut registry = Registry::new();
  for name in ["zeta", "alpha", "mid"] {
    registry.register(
      name,
      handler(|_, _| Ok(String::new())),
      meta(SourceKind::Builtin).with_signature(Signature::NONE),
    );
  }
  assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
  assert!(registry.remove("mid").is_some());
  assert!(!registry.contains("mid"));
}

#[test]
fn test_hooks_run_in_registration_order_with_duplicates() {
  let ctx = TestCtx::new();
  let callback = hook(|ctx, payload| {
    ctx.push(&format!("dup:{payload}"));
    Ok(())
  });
  ctx.hooks.borrow_mut().register("before-command", "a", callback.clone());
  ctx.hooks.borrow_mut().register(
    "before-command",
    "b",
    hook(|ctx, payload| {
      ctx.push(&format!("b:{payload}"));
      Ok(())
    }),
  );
  ctx.hooks.borrow_mut().register("before-command", "a", callback);

  assert!(ctx.emit("before-command", "ping".into()).is_empty());
  assert_eq!(ctx.logs(), vec!["dup:ping", "b:ping", "dup:ping"]);
  assert_eq!(ctx.hooks.borrow().count("before-command"), 3);
}

#[test]
fn test_failing_callbacks_do_not_stop_later_ones() {
  let ctx = TestCtx::new();
  ctx.hooks.borrow_mut().register(
    "after-command",
    "errs",
    hook(|_, _| Err("boom".to_string())),
  );
  ctx.hooks.borrow_mut().register(
    "after-command",
    "panics",
    hook(|_, _| panic!("kaboom")),
  );
  ctx.hooks.borrow_mut().register(
    "after-command",
    "ok",
    hook(|ctx, _| {
      ctx.push("survived");
      Ok(())
    }),
  );

  let failures = ctx.emit("after-command", String::new());
  assert_eq!(failures, vec!["#1 boom", "#2 panicked: kaboom"]);
  assert_eq!(ctx.logs(), vec!["survived"]);
}

#[test]
fn test_hooks_added_during_emit_fire_next_time() {
  let ctx = TestCtx::new();
  ctx.hooks.borrow_mut().register(
    "tick",
    "adder",
    hook(|ctx, _| {
      ctx.push("adder");
      ctx.hooks.borrow_mut().register(
        "tick",
        "late",
        hook(|ctx, _| {
          ctx.push("late");
          Ok(())
        }),
      );
      Ok(())
    }),
  );

  ctx.emit("tick", String::new());
  assert_eq!(ctx.logs(), vec!["adder"]);
  ctx.emit("tick", String::new());
  assert_eq!(ctx.logs(), vec!["adder", "adder", "late"]);
}

#[test]
fn test_nested_emit_from_callback() {
  let ctx = TestCtx::new();
  ctx.hooks.borrow_mut().register(
    "outer",
    "outer",
    hook(|ctx, _| {
      ctx.push("outer:start");
      ctx.emit("inner", String::new());
      ctx.push("outer:end");
      Ok(())
    }),
  );
  ctx.hooks.borrow_mut().register(
    "inner",
    "inner",
    hook(|ctx, _| {
      ctx.push("inner");
      Ok(())
    }),
  );

  ctx.emit("outer", String::new());
  assert_eq!(ctx.logs(), vec!["outer:start", "inner", "outer:end"]);
}

#[test]
fn test_remove_hook_by_id() {
  let ctx = TestCtx::new();
  let id = ctx.hooks.borrow_mut().register(
    "e",
    "x",
    hook(|ctx, _| {
      ctx.push("x");
      Ok(())
    }),
  );
  assert!(ctx.hooks.borrow_mut().remove(id));
  assert!(!ctx.hooks.borrow_mut().remove(id));
  ctx.emit("e", String::new());
  assert!(ctx.logs().is_empty());
  assert!(ctx.hooks.borrow().events().is_empty());
}

#[test]
fn test_failure_kind_is_preserved() {
  let ctx = TestCtx::new();
  ctx.hooks.borrow_mut().register(
    "e",
    "x",
    hook(|_, _| Err("bad".to_string())),
  );
  let entries = ctx.hooks.borrow().callbacks("e");
  let mut seen = None;
  let failures = emit_isolated(&entries, &ctx, &String::new(), |entry, failure| {
    seen = Some((entry.origin.clone(), failure));
  });
  assert_eq!(failures, 1);
  assert!(matches!(seen, Some((origin, HookFailure::Failed(msg))) if origin == "x" && msg == "bad"));
}

#[test]
fn test_plugin_registry_tracks_load_order_and_status() {
  let mut plugins = PluginRegistry::new();
  let first = plugins.begin("/plugins/a.rhai");
  let second = plugins.begin("/plugins/b.rhai");
  plugins.attribute_command(first, "hello");
  plugins.attribute_command(first, "hello");
  plugins.set_status(first, PluginStatus::Active);
  plugins.set_status(second, PluginStatus::Failed("no activate".into()));

  assert!(plugins.is_active("/plugins/a.rhai"));
  assert!(!plugins.is_active("/plugins/b.rhai"));
  assert_eq!(plugins.get(first).unwrap().commands, vec!["hello"]);

  // Retrying a failed unit keeps its slot.
  assert_eq!(plugins.begin("/plugins/b.rhai"), second);
  assert_eq!(plugins.get(second).unwrap().status, PluginStatus::Loading);
  let order: Vec<_> = plugins.iter().map(|r| r.id.index()).collect();
  assert_eq!(order, vec![0, 1]);
}

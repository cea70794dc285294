use std::{
  cell::RefCell,
  path::PathBuf,
  rc::Rc,
};

use the_dispatch::{
  PluginStatus,
  SourceKind,
};
use the_kernel::{
  Editor,
  Error,
  event,
};
use the_lib::value::Value;

const HELLO: &str = r#"
fn activate(editor) {
  editor.set_var("hello-hooks", 0);
  editor.command("hello", "Insert a greeting.", |editor, args| {
    editor.run("insert", ["hello"]);
    "greeted"
  });
  editor.on("before-command", |editor, payload| {
    if payload.command == "hello" {
      editor.set_var("hello-hooks", editor.get_var("hello-hooks") + 1);
    }
  });
}
"#;

fn write_plugin(dir: &tempfile::TempDir, name: &str, source: &str) -> PathBuf {
  let path = dir.path().join(name);
  std::fs::write(&path, source).unwrap();
  path
}

fn contents(editor: &Editor) -> String {
  editor.with_state(|state| state.selected_buffer().contents())
}

#[test]
fn plugin_command_and_hook() {
  let dir = tempfile::tempdir().unwrap();
  let path = write_plugin(&dir, "hello.rhai", HELLO);
  let editor = Editor::new();

  let record = editor.load_plugin(&path).unwrap();
  assert_eq!(record.status, PluginStatus::Active);
  assert_eq!(record.commands, vec!["hello".to_string()]);
  assert_eq!(record.hooks.len(), 1);

  assert_eq!(editor.execute("hello", vec![]).unwrap(), Value::from("greeted"));
  assert_eq!(contents(&editor), "hello");
  assert_eq!(editor.variable("hello-hooks"), Some(Value::Int(1)));

  let meta = editor.command_meta("hello").unwrap();
  assert_eq!(meta.source, SourceKind::Plugin);
  assert_eq!(meta.origin, record.identity);
  let text = editor.describe_command("hello").unwrap();
  assert!(text.contains("Source: plugin"));
  assert!(text.ends_with("Insert a greeting."));
}

#[test]
fn loading_an_active_plugin_twice_is_a_no_op() {
  let dir = tempfile::tempdir().unwrap();
  let path = write_plugin(&dir, "hello.rhai", HELLO);
  let editor = Editor::new();

  let first = editor.load_plugin(&path).unwrap();
  let second = editor.load_plugin(&dir.path().join(".").join("hello.rhai")).unwrap();
  assert_eq!(first, second);
  assert_eq!(editor.plugins().len(), 1);
  assert_eq!(editor.hook_count(event::BEFORE_COMMAND), 1);
}

#[test]
fn plugin_loaded_event_carries_identity() {
  let editor = Editor::new();
  let seen = Rc::new(RefCell::new(Vec::new()));
  let sink = Rc::clone(&seen);
  editor.add_hook(event::PLUGIN_LOADED, move |_, payload| {
    sink.borrow_mut().push(payload.detail.clone());
    Ok(())
  });

  editor
    .load_source(Some("inline"), "fn activate(editor) {}")
    .unwrap();
  let record = editor.load_source(None, "fn activate(editor) {}").unwrap();
  assert_eq!(record.identity, "<source:1>");
  assert_eq!(
    *seen.borrow(),
    vec![Some(Value::from("inline")), Some(Value::from("<source:1>"))]
  );
}

#[test]
fn top_level_sees_the_editor_before_activate() {
  let editor = Editor::new();
  editor
    .load_source(
      Some("top"),
      r#"
      editor.set_var("order", "top");
      fn activate(editor) {
        editor.set_var("order", editor.get_var("order") + ",activate");
      }
      "#,
    )
    .unwrap();
  assert_eq!(editor.variable("order"), Some(Value::from("top,activate")));
}

#[test]
fn closures_capture_locals() {
  let editor = Editor::new();
  editor
    .load_source(
      Some("greet"),
      r#"
      fn activate(editor) {
        let greeting = "hi there";
        editor.command("greet", |editor| editor.run("insert", [greeting]));
      }
      "#,
    )
    .unwrap();
  editor.execute("greet", vec![]).unwrap();
  assert_eq!(contents(&editor), "hi there");
}

#[test]
fn invalid_units_fail_before_running_anything() {
  let editor = Editor::new();
  let cases = [
    (
      "no-activate",
      r#"editor.command("early", |editor| 1); fn setup(editor) {}"#,
      "missing fn activate",
    ),
    ("wrong-arity", "fn activate() {}", "exactly one parameter"),
    ("syntax", "fn activate(editor) {", ""),
  ];
  for (name, source, reason) in cases {
    let err = editor.load_source(Some(name), source).unwrap_err();
    match err {
      Error::InvalidPlugin { plugin, reason: got } => {
        assert_eq!(plugin, name);
        assert!(got.contains(reason), "{name}: {got}");
      },
      other => panic!("{name}: unexpected {other}"),
    }
  }
  assert!(!editor.has_command("early"));
  assert!(editor.plugins().is_empty());
}

#[test]
fn activation_failure_marks_the_record() {
  let editor = Editor::new();
  let err = editor
    .load_source(Some("boom"), r#"fn activate(editor) { throw "nope"; }"#)
    .unwrap_err();
  assert!(err.to_string().contains("invalid plugin boom"));
  let record = editor.plugin("boom").unwrap();
  assert!(matches!(record.status, PluginStatus::Failed(ref reason) if reason.contains("nope")));
}

#[test]
fn missing_plugin_file_is_an_io_error() {
  let editor = Editor::new();
  assert!(matches!(
    editor.load_plugin(std::path::Path::new("/nonexistent/plugin.rhai")),
    Err(Error::Io { .. })
  ));
}

#[test]
fn failing_script_hook_is_isolated() {
  let editor = Editor::new();
  editor
    .load_source(
      Some("flaky"),
      r#"
      fn activate(editor) {
        editor.on("before-command", |editor, payload| { throw "hook exploded"; });
        editor.on("after-command", |editor, payload| {
          editor.set_var("after", payload.command);
        });
      }
      "#,
    )
    .unwrap();

  editor.execute("insert", vec![Value::from("ok")]).unwrap();
  assert_eq!(contents(&editor), "ok");
  assert_eq!(editor.variable("after"), Some(Value::from("insert")));
}

#[test]
fn hooks_running_commands_nest() {
  let editor = Editor::new();
  editor
    .load_source(
      Some("nesting"),
      r#"
      fn activate(editor) {
        editor.set_var("trace", "");
        editor.on("before-command", |editor, payload| {
          editor.set_var("trace", editor.get_var("trace") + "<" + payload.command);
          if payload.command == "newline" {
            editor.run("insert", ["x"]);
          }
        });
        editor.on("after-command", |editor, payload| {
          editor.set_var("trace", editor.get_var("trace") + ">" + payload.command);
        });
      }
      "#,
    )
    .unwrap();

  editor.execute("newline", vec![]).unwrap();
  assert_eq!(
    editor.variable("trace"),
    Some(Value::from("<newline<insert>insert>newline"))
  );
  assert_eq!(contents(&editor), "x\n");
}

#[test]
fn hooks_added_during_emit_fire_next_time() {
  let editor = Editor::new();
  editor
    .load_source(
      Some("late"),
      r#"
      fn activate(editor) {
        editor.set_var("late", 0);
        editor.on("startup-complete", |editor| {
          editor.on("startup-complete", |editor| {
            editor.set_var("late", editor.get_var("late") + 1);
          });
        });
      }
      "#,
    )
    .unwrap();

  editor.startup(None, &[]);
  assert_eq!(editor.variable("late"), Some(Value::Int(0)));
  editor.startup(None, &[]);
  assert_eq!(editor.variable("late"), Some(Value::Int(1)));
}

#[test]
fn startup_loads_init_then_plugins_and_survives_failures() {
  let dir = tempfile::tempdir().unwrap();
  let init = write_plugin(
    &dir,
    "init.rhai",
    r#"fn activate(editor) { editor.set_var("init", true); }"#,
  );
  let broken = write_plugin(&dir, "broken.rhai", "fn nope(editor) {}");
  let hello = write_plugin(&dir, "hello.rhai", HELLO);

  let editor = Editor::new();
  let done = Rc::new(RefCell::new(false));
  let flag = Rc::clone(&done);
  editor.add_hook(event::STARTUP_COMPLETE, move |_, _| {
    *flag.borrow_mut() = true;
    Ok(())
  });

  let failures = editor.startup(Some(init.as_path()), &[broken, hello]);
  assert_eq!(failures.len(), 1);
  assert!(matches!(failures[0], Error::InvalidPlugin { .. }));
  assert_eq!(editor.variable("init"), Some(Value::Bool(true)));
  assert!(editor.has_command("hello"));
  assert!(*done.borrow());
  assert_eq!(editor.plugins().len(), 2);
}

#[test]
fn missing_init_file_is_not_an_error() {
  let dir = tempfile::tempdir().unwrap();
  let editor = Editor::new();
  let failures = editor.startup(Some(dir.path().join("init.rhai").as_path()), &[]);
  assert!(failures.is_empty());
}

#[test]
fn script_bindings_and_messages() {
  let editor = Editor::new();
  editor
    .load_source(
      Some("keys"),
      r#"
      fn activate(editor) {
        editor.command("shout", |editor| editor.message("HEY"));
        editor.bind("C-c s", "shout");
        editor.bind("mode:loud", "C-c l", "shout");
      }
      "#,
    )
    .unwrap();

  assert_eq!(editor.press("C-c s").unwrap(), "ran shout");
  assert_eq!(editor.snapshot().echo.as_deref(), Some("HEY"));
  assert_eq!(editor.where_is("shout").len(), 1);
  editor.enable_mode("loud").unwrap();
  assert_eq!(editor.where_is("shout").len(), 2);
}

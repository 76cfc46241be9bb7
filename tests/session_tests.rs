//! セッション統合テスト（設定ファイル、最近使ったファイル、スレッド間呼び出し）

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::thread;

use scribe::config::Config;
use scribe::input::Accelerator;
use scribe::menu::{ConfigChangeEvent, ConfigChangeListener, DocTypeSpec, KeybindingChange, ToolSpec};
use scribe::{ScribeError, Session};
use tempfile::TempDir;

fn session() -> Session {
    Session::new(Config::builtin().unwrap()).unwrap()
}

#[test]
fn test_session_from_saved_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scribe").join("config.json");

    let mut config = Config::builtin().unwrap();
    config.keybindings.insert("edit.select-all".into(), "C-M-a".into());
    config.keybindings.insert("file.close".into(), String::new());
    config.history.limit = 5;
    config.save(&path).unwrap();

    let session = Session::new(Config::load(&path).unwrap()).unwrap();
    let resolver = session.resolver();
    assert_eq!(
        resolver.lookup("edit.select-all").unwrap().accelerator(),
        Some(Accelerator::parse("C-M-a").unwrap())
    );
    assert_eq!(resolver.lookup("file.close").unwrap().accelerator(), None);
    assert_eq!(session.config().history.limit, 5);
}

#[test]
fn test_config_keybindings_survive_doc_type_change() {
    let mut config = Config::builtin().unwrap();
    config.keybindings.insert("doc.rust".into(), "C-r".into());
    let mut session = Session::new(config).unwrap();

    session.apply_config_change(&ConfigChangeEvent::DocTypeChanged {
        doc_types: vec![DocTypeSpec::new("doc.plain", "Plain Text"), DocTypeSpec::new("doc.rust", "Rust")],
        active: None,
    });
    assert_eq!(
        session.resolver().lookup("doc.rust").unwrap().accelerator(),
        Some(Accelerator::parse("C-r").unwrap())
    );
}

#[test]
fn test_open_path_updates_recent_menu() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    fs::write(&first, "one").unwrap();
    fs::write(&second, "two").unwrap();

    let mut session = session();
    session.open_path(&first).unwrap();
    session.open_path(&second).unwrap();
    assert_eq!(session.recent_files(), &[second.clone(), first.clone()]);

    let recent = session.resolver().menu_bar().find("file.recent").unwrap();
    let labels: Vec<&str> = recent.children().iter().map(|item| item.label()).collect();
    assert_eq!(labels, vec!["1 second.txt", "2 first.txt"]);

    // 開いているファイルは新しいドキュメントを作らない
    session.execute("file.recent.1").unwrap();
    assert_eq!(session.documents().len(), 2);
    assert_eq!(session.documents().active().unwrap().text(), "one");
}

#[test]
fn test_recent_entry_reopens_closed_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.md");
    fs::write(&path, "# notes").unwrap();

    let mut session = session();
    let id = session.open_path(&path).unwrap();
    session.documents_mut().close(id);
    assert!(session.documents().is_empty());

    session.execute("file.recent.0").unwrap();
    let active = session.documents().active().unwrap();
    assert_eq!(active.title(), "notes.md");
    assert_eq!(active.text(), "# notes");
    assert_eq!(session.recent_files().len(), 1);
}

#[test]
fn test_clear_recent_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "a").unwrap();

    let mut session = session();
    session.open_path(&path).unwrap();
    assert!(session.resolver().lookup("file.recent.0").is_some());

    session.execute("file.clear-recent").unwrap();
    assert!(session.recent_files().is_empty());
    assert!(session.resolver().lookup("file.recent.0").is_none());
    assert!(session.resolver().menu_bar().find("file.recent.0").is_none());
}

#[test]
fn test_open_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.txt");

    let mut session = session();
    match session.open_path(&missing) {
        Err(ScribeError::Io { path, .. }) => assert!(path.ends_with("missing.txt")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(session.documents().is_empty());
    assert!(session.recent_files().is_empty());
}

#[test]
fn test_invoke_and_wait_runs_on_session_thread() {
    let mut session = session();
    let id = session.open_document("untitled");
    let handle = session.ui_handle();

    let worker = thread::spawn(move || {
        let renamed = handle
            .invoke_and_wait(move |session: &mut Session| session.set_document_title(id, "renamed"))
            .unwrap();
        let disabled = handle
            .invoke_and_wait(|session: &mut Session| session.set_action_enabled("help.about", false))
            .unwrap();
        renamed && disabled
    });

    while !worker.is_finished() {
        session.pump();
        thread::yield_now();
    }
    assert!(worker.join().unwrap());
    assert_eq!(session.documents().get(id).unwrap().title(), "renamed");
    assert!(!session.resolver().lookup("help.about").unwrap().is_enabled());
}

#[test]
fn test_invoke_later_waits_for_pump() {
    let mut session = session();
    let handle = session.ui_handle();
    handle
        .invoke_later(|session: &mut Session| {
            session.open_document("from worker");
        })
        .unwrap();
    assert!(session.documents().is_empty());

    assert_eq!(session.pump(), 1);
    assert_eq!(session.documents().len(), 1);
}

#[derive(Default)]
struct Recorder {
    events: Rc<RefCell<Vec<String>>>,
}

impl ConfigChangeListener for Recorder {
    fn custom_tool_changed(&mut self, tools: &[ToolSpec]) {
        self.events
            .borrow_mut()
            .push(format!("custom-tools:{}", tools.len()));
    }

    fn keybinding_changed(&mut self, change: &KeybindingChange) {
        self.events
            .borrow_mut()
            .push(format!("keybindings:{}", change.affected.join(",")));
    }
}

#[test]
fn test_config_change_reaches_resolver_and_listeners() {
    let mut session = session();
    let recorder = Recorder::default();
    let events = Rc::clone(&recorder.events);
    session.notifier_mut().add_listener(Box::new(recorder));

    session.apply_config_change(&ConfigChangeEvent::CustomToolChanged {
        tools: vec![ToolSpec::new("tools.custom.fmt", "Format", "rustfmt").with_accelerator("C-S-f")],
    });
    session.apply_config_change(&ConfigChangeEvent::KeybindingChanged(
        KeybindingChange::new().unbind("tools.custom.fmt"),
    ));

    assert_eq!(
        *events.borrow(),
        vec!["custom-tools:1".to_string(), "keybindings:tools.custom.fmt".to_string()]
    );
    let fmt = session.resolver().lookup("tools.custom.fmt").unwrap();
    assert_eq!(fmt.accelerator(), None);

    session.execute("tools.custom.fmt").unwrap();
    assert_eq!(session.take_requests().len(), 1);
}

use mockito::Server;
use serde_json::{json, Value};
use simple_notes_core::{
    open_db_in_memory, EditorMode, KeyValueStore, NotePayload, NotesApp, NotesConfig,
    NotesRepository, RepositoryMode, SqliteKeyValueStore, StoreError, Theme, WELCOME_NOTE_TITLE,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// SQLite-backed store whose writes, or reads past a budget, can fail.
struct FlakyStore {
    inner: SqliteKeyValueStore,
    fail_writes: AtomicBool,
    reads_left: AtomicUsize,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: SqliteKeyValueStore::new(
                open_db_in_memory().expect("in-memory db should open"),
            ),
            fail_writes: AtomicBool::new(false),
            reads_left: AtomicUsize::new(usize::MAX),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::LockPoisoned("writes disabled"));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.reads_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map_err(|_| StoreError::LockPoisoned("reads disabled"))?;
        self.inner.get_json(key)
    }

    fn set_json(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set_json(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.remove(key)
    }
}

async fn started_app() -> NotesApp<FlakyStore> {
    let repo = NotesRepository::new(&NotesConfig::default(), FlakyStore::new());
    let mut app = NotesApp::new(repo);
    app.start().await;
    app
}

#[tokio::test]
async fn start_selects_the_welcome_note_in_stub_mode() {
    let app = started_app().await;

    assert_eq!(app.repository_mode(), RepositoryMode::Stub);
    assert_eq!(app.notes().len(), 1);
    assert_eq!(app.selected_note().unwrap().title, WELCOME_NOTE_TITLE);
    assert_eq!(app.editor_mode(), EditorMode::View);
    assert!(app.error().is_none());
}

#[tokio::test]
async fn creating_selects_the_new_note_and_returns_to_view() {
    let mut app = started_app().await;

    app.begin_create();
    assert_eq!(app.editor_mode(), EditorMode::Create);
    app.save(NotePayload::new("Groceries", "milk")).await;

    assert_eq!(app.editor_mode(), EditorMode::View);
    assert_eq!(app.notes().len(), 2);
    let selected = app.selected_note().unwrap();
    assert_eq!(selected.title, "Groceries");
    assert_eq!(selected.content, "milk");
}

#[tokio::test]
async fn editing_without_selection_is_ignored() {
    let mut app = started_app().await;
    let welcome = app.selected_note_id().unwrap().to_string();
    app.request_delete();
    app.confirm_delete().await;

    assert!(app.notes().is_empty());
    assert!(app.selected_note_id().is_none());
    assert!(app.repository().get_note(&welcome).await.unwrap().is_none());

    app.begin_edit();
    assert_eq!(app.editor_mode(), EditorMode::View);
    app.request_delete();
    assert!(!app.is_delete_dialog_open());
}

#[tokio::test]
async fn editing_updates_the_selected_note_in_place() {
    let mut app = started_app().await;
    let id = app.selected_note_id().unwrap().to_string();

    app.begin_edit();
    app.save(NotePayload::content("rewritten")).await;

    assert_eq!(app.editor_mode(), EditorMode::View);
    assert_eq!(app.selected_note_id(), Some(id.as_str()));
    let note = app.selected_note().unwrap();
    assert_eq!(note.title, WELCOME_NOTE_TITLE);
    assert_eq!(note.content, "rewritten");
}

#[tokio::test]
async fn cancelled_delete_keeps_the_note() {
    let mut app = started_app().await;

    app.request_delete();
    assert!(app.is_delete_dialog_open());
    app.cancel_delete();

    assert!(!app.is_delete_dialog_open());
    assert_eq!(app.notes().len(), 1);
}

#[tokio::test]
async fn confirmed_delete_selects_the_next_note() {
    let mut app = started_app().await;
    app.begin_create();
    app.save(NotePayload::title("doomed")).await;
    let doomed = app.selected_note_id().unwrap().to_string();

    app.request_delete();
    app.confirm_delete().await;

    assert!(!app.is_delete_dialog_open());
    assert_eq!(app.notes().len(), 1);
    assert_ne!(app.selected_note_id(), Some(doomed.as_str()));
    assert_eq!(app.selected_note().unwrap().title, WELCOME_NOTE_TITLE);
}

#[tokio::test]
async fn theme_toggles_between_light_and_dark() {
    let mut app = started_app().await;
    assert_eq!(app.theme(), Theme::Light);

    app.toggle_theme();
    assert_eq!(app.theme(), Theme::Dark);
    app.toggle_theme();
    assert_eq!(app.theme(), Theme::Light);
}

#[tokio::test]
async fn storage_failure_surfaces_as_save_error_and_keeps_editor_open() {
    let mut app = started_app().await;
    app.repository()
        .local()
        .kv()
        .fail_writes
        .store(true, Ordering::SeqCst);

    app.begin_create();
    app.save(NotePayload::new("lost", "")).await;

    assert_eq!(app.editor_mode(), EditorMode::Create);
    assert!(app.error().unwrap().starts_with("Failed to save note:"));
    assert_eq!(app.notes().len(), 1);

    app.cancel_edit();
    assert!(app.error().is_none());
}

#[tokio::test]
async fn selecting_a_note_leaves_the_editor() {
    let mut app = started_app().await;
    app.begin_create();
    app.save(NotePayload::title("second")).await;
    let welcome = app
        .notes()
        .iter()
        .find(|note| note.title == WELCOME_NOTE_TITLE)
        .unwrap()
        .id
        .clone();

    app.begin_edit();
    app.select_note(welcome.clone());

    assert_eq!(app.editor_mode(), EditorMode::View);
    assert_eq!(app.selected_note_id(), Some(welcome.as_str()));
}

#[tokio::test]
async fn failed_reload_after_create_keeps_editing_the_created_note() {
    let mut app = started_app().await;
    let kv = app.repository().local().kv();
    kv.reads_left.store(1, Ordering::SeqCst);

    app.begin_create();
    app.save(NotePayload::new("draft", "v1")).await;

    assert!(app.error().unwrap().starts_with("Failed to load notes:"));
    assert_eq!(app.editor_mode(), EditorMode::Edit);
    let created = app.selected_note_id().unwrap().to_string();
    assert!(created.starts_with("note_"));

    app.repository()
        .local()
        .kv()
        .reads_left
        .store(usize::MAX, Ordering::SeqCst);
    app.save(NotePayload::content("v2")).await;

    assert!(app.error().is_none());
    assert_eq!(app.editor_mode(), EditorMode::View);
    assert_eq!(app.notes().len(), 2);
    let note = app.selected_note().unwrap();
    assert_eq!(note.id, created);
    assert_eq!(note.content, "v2");
}

#[tokio::test]
async fn remote_create_without_body_clears_the_selection() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/notes")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([{"id": "r1", "title": "Remote"}]).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/notes")
        .with_status(204)
        .create_async()
        .await;

    let config = NotesConfig {
        request_timeout: Duration::from_millis(500),
        ..NotesConfig::with_remote(server.url())
    };
    let mut app = NotesApp::new(NotesRepository::new(&config, FlakyStore::new()));
    app.start().await;
    assert_eq!(app.repository_mode(), RepositoryMode::Remote);
    assert_eq!(app.selected_note_id(), Some("r1"));

    app.begin_create();
    app.save(NotePayload::title("acked")).await;

    assert!(app.error().is_none());
    assert_eq!(app.editor_mode(), EditorMode::View);
    assert!(app.selected_note_id().is_none());
}

//! Notes application controller.
//!
//! # Responsibility
//! - Drive the view/edit/create editor modes and the delete confirmation.
//! - Keep the list, selection, theme and repository badge in one place.
//! - Turn unrecoverable repository failures into user-visible error text.
//!
//! # Invariants
//! - Every user action clears the previous error.
//! - The selection always points at a listed note or is empty after refresh.
//! - Failed saves keep the editor open; failed deletes leave the list as is.

use crate::db::kv::KeyValueStore;
use crate::model::note::{Note, NoteId, NotePayload, RepositoryMode};
use crate::repo::notes_repository::NotesRepository;
use log::{error, info, warn};

/// Editor panel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    View,
    Edit,
    Create,
}

/// UI color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Stateful controller over a [`NotesRepository`].
pub struct NotesApp<S: KeyValueStore> {
    repo: NotesRepository<S>,
    notes: Vec<Note>,
    selected_note_id: Option<NoteId>,
    editor_mode: EditorMode,
    theme: Theme,
    repository_mode: RepositoryMode,
    error: Option<String>,
    delete_dialog_open: bool,
}

impl<S: KeyValueStore> NotesApp<S> {
    /// Creates an idle controller; call [`NotesApp::start`] to load notes.
    pub fn new(repo: NotesRepository<S>) -> Self {
        Self {
            repo,
            notes: Vec::new(),
            selected_note_id: None,
            editor_mode: EditorMode::View,
            theme: Theme::default(),
            repository_mode: RepositoryMode::Stub,
            error: None,
            delete_dialog_open: false,
        }
    }

    /// Initial load; selects the first note.
    pub async fn start(&mut self) {
        self.refresh(false).await;
    }

    /// Reloads notes and the repository badge.
    ///
    /// With `preserve_selection`, a still-listed selection is kept; otherwise
    /// the first note (if any) becomes selected.
    pub async fn refresh(&mut self, preserve_selection: bool) {
        self.error = None;
        match self.repo.list_notes().await {
            Ok(notes) => {
                self.notes = notes;
                self.repository_mode = self.repo.get_mode().await;

                let keep = preserve_selection
                    && self
                        .selected_note_id
                        .as_ref()
                        .is_some_and(|id| self.notes.iter().any(|note| &note.id == id));
                if !keep {
                    self.selected_note_id = self.notes.first().map(|note| note.id.clone());
                }
            }
            Err(err) => {
                error!("event=notes_refresh module=app status=error error={err}");
                self.error = Some(format!("Failed to load notes: {err}"));
            }
        }
    }

    pub fn select_note(&mut self, id: impl Into<NoteId>) {
        self.selected_note_id = Some(id.into());
        self.editor_mode = EditorMode::View;
        self.error = None;
    }

    pub fn begin_create(&mut self) {
        self.editor_mode = EditorMode::Create;
        self.error = None;
    }

    /// Enters edit mode; ignored without a selection.
    pub fn begin_edit(&mut self) {
        if self.selected_note_id.is_none() {
            return;
        }
        self.editor_mode = EditorMode::Edit;
        self.error = None;
    }

    pub fn cancel_edit(&mut self) {
        self.editor_mode = EditorMode::View;
        self.error = None;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    /// Persists the editor content for the current mode.
    ///
    /// Create selects the new note (none when the remote returned no body);
    /// edit keeps the selection. Both return to view mode once the list has
    /// been reloaded. When the write succeeds but the reload fails, the load
    /// error is kept and the editor stays open; a created note is then edited
    /// in place instead of being created again.
    pub async fn save(&mut self, payload: NotePayload) {
        self.error = None;
        match self.editor_mode {
            EditorMode::Create => match self.repo.create_note(&payload).await {
                Ok(created) => {
                    self.refresh(true).await;
                    self.selected_note_id = created.map(|note| note.id);
                    if self.error.is_some() {
                        if self.selected_note_id.is_some() {
                            self.editor_mode = EditorMode::Edit;
                        }
                        warn!(
                            "event=note_save module=app status=degraded action=create reload=failed"
                        );
                        return;
                    }
                    self.editor_mode = EditorMode::View;
                    info!("event=note_save module=app status=ok action=create");
                }
                Err(err) => self.fail("save", format!("Failed to save note: {err}")),
            },
            EditorMode::Edit => {
                let Some(id) = self.selected_note_id.clone() else {
                    return;
                };
                match self.repo.update_note(&id, &payload).await {
                    Ok(_) => {
                        self.refresh(true).await;
                        if self.error.is_some() {
                            warn!(
                                "event=note_save module=app status=degraded action=update note_id={id} reload=failed"
                            );
                            return;
                        }
                        self.editor_mode = EditorMode::View;
                        info!("event=note_save module=app status=ok action=update note_id={id}");
                    }
                    Err(err) => self.fail("save", format!("Failed to save note: {err}")),
                }
            }
            EditorMode::View => {}
        }
    }

    /// Opens the delete confirmation; ignored without a selection.
    pub fn request_delete(&mut self) {
        if self.selected_note_id.is_some() {
            self.delete_dialog_open = true;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.delete_dialog_open = false;
    }

    /// Deletes the selected note and reselects the first remaining note.
    pub async fn confirm_delete(&mut self) {
        let Some(id) = self.selected_note_id.clone() else {
            return;
        };
        self.delete_dialog_open = false;
        self.error = None;

        match self.repo.delete_note(&id).await {
            Ok(_) => {
                self.editor_mode = EditorMode::View;
                self.refresh(false).await;
                info!("event=note_delete module=app status=ok note_id={id}");
            }
            Err(err) => self.fail("delete", format!("Failed to delete note: {err}")),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn selected_note_id(&self) -> Option<&str> {
        self.selected_note_id.as_deref()
    }

    pub fn selected_note(&self) -> Option<&Note> {
        let id = self.selected_note_id.as_ref()?;
        self.notes.iter().find(|note| &note.id == id)
    }

    pub fn editor_mode(&self) -> EditorMode {
        self.editor_mode
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn repository_mode(&self) -> RepositoryMode {
        self.repository_mode
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_delete_dialog_open(&self) -> bool {
        self.delete_dialog_open
    }

    pub fn repository(&self) -> &NotesRepository<S> {
        &self.repo
    }

    fn fail(&mut self, action: &'static str, message: String) {
        error!("event=note_{action} module=app status=error error={message}");
        self.error = Some(message);
    }
}

//! Core domain logic for Simple Notes.
//! Owns the note model, local and remote storage, and the repository that
//! chooses between them.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod service;

pub use config::{ConfigError, FeatureFlags, NotesConfig, FLAG_USE_REMOTE_API};
pub use db::{open_db, open_db_in_memory, KeyValueStore, SqliteKeyValueStore, StoreError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{Note, NoteId, NotePayload, RepositoryMode, UNTITLED_TITLE};
pub use remote::client::{
    NoteListShape, RemoteError, RemoteNoteClient, RemotePayload, RemoteResult,
};
pub use repo::local_note_store::{LocalNoteStore, NOTES_STORAGE_KEY, WELCOME_NOTE_TITLE};
pub use repo::notes_repository::{NotesRepository, SessionContext};
pub use repo::{RepoError, RepoResult};
pub use service::notes_app::{EditorMode, NotesApp, Theme};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

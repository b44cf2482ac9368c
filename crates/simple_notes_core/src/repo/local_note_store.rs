//! Local note store over the key-value primitive.
//!
//! # Responsibility
//! - Provide durable client-side note CRUD under one namespaced key.
//! - Seed a single welcome note on first use (or after corruption).
//!
//! # Invariants
//! - Every write is a full read-modify-write of the whole note list.
//! - The read-modify-write cycle is serialized per store instance.
//! - `list` is ordered by `updated_at` descending; ties keep storage order.
//! - Missing ids are never errors: `get`/`update` return `None`, `delete`
//!   is a no-op.

use crate::db::kv::{KeyValueStore, StoreError, StoreResult};
use crate::model::note::{
    generate_note_id, next_timestamp_after, now_timestamp, parse_timestamp, Note, NotePayload,
    UNTITLED_TITLE,
};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard};

/// Key holding the JSON array of stored notes.
pub const NOTES_STORAGE_KEY: &str = "simple_notes_app.notes.v1";

pub const WELCOME_NOTE_TITLE: &str = "Welcome";
pub const WELCOME_NOTE_CONTENT: &str = "This is a simple notes app.\n\nUse the + New Note button to create notes, then edit or delete them from the main panel.";

/// Lenient on-disk record; missing fields are filled in on read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredNote {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl StoredNote {
    fn into_note(self) -> Note {
        Note {
            id: self.id,
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            created_at: Some(self.created_at.unwrap_or_else(now_timestamp)),
            updated_at: Some(self.updated_at.unwrap_or_else(now_timestamp)),
        }
    }
}

/// Note CRUD persisted through a [`KeyValueStore`].
pub struct LocalNoteStore<S: KeyValueStore> {
    kv: S,
    cycle: Mutex<()>,
}

impl<S: KeyValueStore> LocalNoteStore<S> {
    pub fn new(kv: S) -> Self {
        Self {
            kv,
            cycle: Mutex::new(()),
        }
    }

    /// Underlying key-value store.
    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// Lists all notes, seeding the welcome note when storage is empty.
    pub fn list(&self) -> StoreResult<Vec<Note>> {
        let _cycle = self.lock_cycle()?;
        let mut notes = self.read_all()?;
        // Stable sort: equal timestamps keep storage (newest-created) order.
        notes.sort_by(newest_first);
        Ok(notes)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Note>> {
        let _cycle = self.lock_cycle()?;
        Ok(self.read_all()?.into_iter().find(|note| note.id == id))
    }

    /// Creates and prepends a note; absent fields default to `"Untitled"`
    /// and empty content.
    pub fn create(&self, payload: &NotePayload) -> StoreResult<Note> {
        let _cycle = self.lock_cycle()?;
        let mut notes = self.read_all()?;

        let now = now_timestamp();
        let created = Note {
            id: generate_note_id(),
            title: payload
                .title
                .clone()
                .unwrap_or_else(|| UNTITLED_TITLE.to_string()),
            content: payload.content.clone().unwrap_or_default(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };

        notes.insert(0, created.clone());
        self.write_all(&notes)?;
        info!(
            "event=note_create module=local_store status=ok note_id={} total={}",
            created.id,
            notes.len()
        );
        Ok(created)
    }

    /// Merges provided fields onto an existing note and refreshes
    /// `updated_at`.
    pub fn update(&self, id: &str, payload: &NotePayload) -> StoreResult<Option<Note>> {
        let _cycle = self.lock_cycle()?;
        let mut notes = self.read_all()?;

        let Some(existing) = notes.iter_mut().find(|note| note.id == id) else {
            debug!("event=note_update module=local_store status=not_found note_id={id}");
            return Ok(None);
        };

        if let Some(title) = &payload.title {
            existing.title = title.clone();
        }
        if let Some(content) = &payload.content {
            existing.content = content.clone();
        }
        existing.updated_at = Some(next_timestamp_after(existing.updated_at.as_deref()));
        let updated = existing.clone();

        self.write_all(&notes)?;
        info!("event=note_update module=local_store status=ok note_id={id}");
        Ok(Some(updated))
    }

    /// Removes a note if present; always reports success.
    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let _cycle = self.lock_cycle()?;
        let mut notes = self.read_all()?;
        let before = notes.len();
        notes.retain(|note| note.id != id);

        if notes.len() == before {
            debug!("event=note_delete module=local_store status=not_found note_id={id}");
            return Ok(true);
        }
        self.write_all(&notes)?;
        info!("event=note_delete module=local_store status=ok note_id={id}");
        Ok(true)
    }

    fn lock_cycle(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.cycle
            .lock()
            .map_err(|_| StoreError::LockPoisoned("local note store"))
    }

    fn read_all(&self) -> StoreResult<Vec<Note>> {
        match self.kv.get_json(NOTES_STORAGE_KEY)? {
            Some(Value::Array(items)) => Ok(decode_notes(items)),
            other => {
                if other.is_some() {
                    warn!("event=notes_read module=local_store status=corrupt action=reseed");
                }
                self.seed()
            }
        }
    }

    fn seed(&self) -> StoreResult<Vec<Note>> {
        let now = now_timestamp();
        let seed = vec![Note {
            id: generate_note_id(),
            title: WELCOME_NOTE_TITLE.to_string(),
            content: WELCOME_NOTE_CONTENT.to_string(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        }];
        self.write_all(&seed)?;
        info!("event=notes_seed module=local_store status=ok count=1");
        Ok(seed)
    }

    fn write_all(&self, notes: &[Note]) -> StoreResult<()> {
        let value = serde_json::to_value(notes)?;
        self.kv.set_json(NOTES_STORAGE_KEY, &value)
    }
}

/// Orders by parsed `updated_at`; raw strings only when either side fails
/// to parse.
fn newest_first(a: &Note, b: &Note) -> Ordering {
    let parsed = |note: &Note| note.updated_at.as_deref().and_then(parse_timestamp);
    match (parsed(a), parsed(b)) {
        (Some(a_time), Some(b_time)) => b_time.cmp(&a_time),
        _ => b.updated_at.cmp(&a.updated_at),
    }
}

fn decode_notes(items: Vec<Value>) -> Vec<Note> {
    let total = items.len();
    let notes: Vec<Note> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<StoredNote>(item).ok())
        .map(StoredNote::into_note)
        .collect();
    if notes.len() != total {
        warn!(
            "event=notes_read module=local_store status=partial skipped={}",
            total - notes.len()
        );
    }
    notes
}

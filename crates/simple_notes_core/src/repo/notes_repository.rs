//! Notes repository with remote/local mode resolution.
//!
//! # Responsibility
//! - Decide once per session whether notes are served remotely or locally.
//! - Fall back to the local store, transparently, when a remote call fails.
//! - Normalize remote shapes into the canonical [`Note`].
//!
//! # Invariants
//! - Mode is resolved at most once per session; a failed probe means `Stub`.
//! - Mode only moves `Remote -> Stub`, never back.
//! - A remote failure is never reported to the caller; the same call is
//!   served by the local store instead.
//! - Only local storage failures surface as [`RepoError`].

use crate::config::NotesConfig;
use crate::db::kv::KeyValueStore;
use crate::model::note::{Note, NotePayload, RepositoryMode};
use crate::remote::client::{NoteListShape, RemoteError, RemoteNoteClient, RemotePayload};
use crate::repo::local_note_store::LocalNoteStore;
use crate::repo::RepoResult;
use log::{info, warn};
use serde_json::{Map, Value};
use std::time::Instant;
use tokio::sync::Mutex;

/// Session-scoped repository state.
///
/// The cached mode is guarded by an async mutex that stays locked across the
/// reachability probe, so concurrent first calls share one probe.
#[derive(Debug, Default)]
pub struct SessionContext {
    mode: Mutex<Option<RepositoryMode>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached mode without triggering resolution.
    pub async fn cached_mode(&self) -> Option<RepositoryMode> {
        *self.mode.lock().await
    }
}

/// Single entry point for note data, hiding which store serves each call.
pub struct NotesRepository<S: KeyValueStore> {
    remote: Option<RemoteNoteClient>,
    try_remote: bool,
    local: LocalNoteStore<S>,
    session: SessionContext,
}

impl<S: KeyValueStore> NotesRepository<S> {
    /// Builds a repository for one session from configuration.
    ///
    /// A missing or unusable base URL leaves remote unavailable; it is logged,
    /// not returned as an error.
    pub fn new(config: &NotesConfig, store: S) -> Self {
        let remote = match RemoteNoteClient::new(&config.api_base_url, config.request_timeout) {
            Ok(client) => Some(client),
            Err(err) => {
                info!(
                    "event=remote_init module=repo status=unavailable error_code={} error={}",
                    err.code(),
                    err
                );
                None
            }
        };
        Self::from_parts(remote, config.should_try_remote(), LocalNoteStore::new(store))
    }

    /// Builds a repository from already constructed parts.
    pub fn from_parts(
        remote: Option<RemoteNoteClient>,
        try_remote: bool,
        local: LocalNoteStore<S>,
    ) -> Self {
        Self {
            remote,
            try_remote,
            local,
            session: SessionContext::new(),
        }
    }

    pub fn local(&self) -> &LocalNoteStore<S> {
        &self.local
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Resolves (and caches) where this session's notes live.
    ///
    /// Never fails: an unreachable remote simply resolves to `Stub`.
    pub async fn resolve_mode(&self) -> RepositoryMode {
        let mut cached = self.session.mode.lock().await;
        if let Some(mode) = *cached {
            return mode;
        }

        let mode = match (&self.remote, self.try_remote) {
            (Some(remote), true) => probe(remote).await,
            _ => {
                info!(
                    "event=mode_resolve module=repo status=ok mode=stub reason=remote_disabled"
                );
                RepositoryMode::Stub
            }
        };
        *cached = Some(mode);
        mode
    }

    /// Mode for display purposes; resolves it on first use.
    pub async fn get_mode(&self) -> RepositoryMode {
        self.resolve_mode().await
    }

    pub async fn list_notes(&self) -> RepoResult<Vec<Note>> {
        if let Some(remote) = self.active_remote().await {
            match remote.list().await {
                Ok(shape) => return Ok(normalize_remote_list(shape)),
                Err(err) => self.downgrade("list", &err).await,
            }
        }
        Ok(self.local.list()?)
    }

    /// Looks a note up by id; a missing note is `None`, not an error.
    pub async fn get_note(&self, id: &str) -> RepoResult<Option<Note>> {
        if let Some(remote) = self.active_remote().await {
            match remote.get(id).await {
                Ok(payload) => return Ok(normalize_remote_payload(payload)),
                Err(err) => self.downgrade("get", &err).await,
            }
        }
        Ok(self.local.get(id)?)
    }

    /// Creates a note.
    ///
    /// Returns `None` only when a reachable remote acknowledges the create
    /// without a note body.
    pub async fn create_note(&self, payload: &NotePayload) -> RepoResult<Option<Note>> {
        if let Some(remote) = self.active_remote().await {
            match remote.create(payload).await {
                Ok(created) => return Ok(normalize_remote_payload(created)),
                Err(err) => self.downgrade("create", &err).await,
            }
        }
        Ok(Some(self.local.create(payload)?))
    }

    /// Applies a partial update; unspecified fields keep their values.
    pub async fn update_note(&self, id: &str, payload: &NotePayload) -> RepoResult<Option<Note>> {
        if let Some(remote) = self.active_remote().await {
            match remote.update(id, payload).await {
                Ok(updated) => return Ok(normalize_remote_payload(updated)),
                Err(err) => self.downgrade("update", &err).await,
            }
        }
        Ok(self.local.update(id, payload)?)
    }

    /// Deletes a note; deleting an unknown id still succeeds.
    pub async fn delete_note(&self, id: &str) -> RepoResult<bool> {
        if let Some(remote) = self.active_remote().await {
            match remote.delete(id).await {
                Ok(_) => return Ok(true),
                Err(err) => self.downgrade("delete", &err).await,
            }
        }
        Ok(self.local.delete(id)?)
    }

    async fn active_remote(&self) -> Option<&RemoteNoteClient> {
        match self.resolve_mode().await {
            RepositoryMode::Remote => self.remote.as_ref(),
            RepositoryMode::Stub => None,
        }
    }

    async fn downgrade(&self, operation: &'static str, err: &RemoteError) {
        *self.session.mode.lock().await = Some(RepositoryMode::Stub);
        warn!(
            "event=mode_downgrade module=repo status=fallback operation={operation} error_code={} http_status={} error={}",
            err.code(),
            err.status().unwrap_or(0),
            err
        );
    }
}

async fn probe(remote: &RemoteNoteClient) -> RepositoryMode {
    let started_at = Instant::now();
    match remote.ping().await {
        Ok(()) => {
            info!(
                "event=mode_resolve module=repo status=ok mode=remote duration_ms={}",
                started_at.elapsed().as_millis()
            );
            RepositoryMode::Remote
        }
        Err(err) => {
            warn!(
                "event=mode_resolve module=repo status=fallback mode=stub duration_ms={} error_code={} error={}",
                started_at.elapsed().as_millis(),
                err.code(),
                err
            );
            RepositoryMode::Stub
        }
    }
}

fn normalize_remote_list(shape: NoteListShape) -> Vec<Note> {
    let items = shape.into_items();
    items
        .iter()
        .filter_map(Value::as_object)
        .map(normalize_remote_note)
        .collect()
}

fn normalize_remote_payload(payload: RemotePayload) -> Option<Note> {
    match payload {
        RemotePayload::Json(Value::Object(object)) => Some(normalize_remote_note(&object)),
        RemotePayload::Json(_) | RemotePayload::Text(_) | RemotePayload::Empty => None,
    }
}

fn normalize_remote_note(object: &Map<String, Value>) -> Note {
    Note {
        id: scalar_text(object.get("id")).unwrap_or_default(),
        title: scalar_text(object.get("title")).unwrap_or_default(),
        content: scalar_text(object.get("content")).unwrap_or_default(),
        created_at: scalar_text(object.get("createdAt")),
        updated_at: scalar_text(object.get("updatedAt")),
    }
}

/// Strings verbatim, other non-null scalars stringified, null/absent as `None`.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_notes_are_normalized_to_canonical_shape() {
        let payload = RemotePayload::Json(json!({
            "id": 42,
            "title": null,
            "createdAt": "2024-01-01T00:00:00Z",
            "extra": "ignored"
        }));
        let note = normalize_remote_payload(payload).expect("object payload should normalize");
        assert_eq!(note.id, "42");
        assert_eq!(note.title, "");
        assert_eq!(note.content, "");
        assert_eq!(note.created_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(note.updated_at, None);
    }

    #[test]
    fn non_object_payloads_normalize_to_none() {
        assert!(normalize_remote_payload(RemotePayload::Empty).is_none());
        assert!(normalize_remote_payload(RemotePayload::Text("ok".into())).is_none());
        assert!(normalize_remote_payload(RemotePayload::Json(json!(null))).is_none());
    }

    #[test]
    fn remote_list_drops_non_object_items() {
        let shape = NoteListShape::Bare(vec![json!({"id": "a"}), json!(7), json!({"id": "b"})]);
        let ids: Vec<String> = normalize_remote_list(shape)
            .into_iter()
            .map(|note| note.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}

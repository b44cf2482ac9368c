//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical five-field note record returned to every caller.
//! - Provide id and timestamp generation for locally created notes.
//!
//! # Invariants
//! - `id` is assigned once at creation and never changes.
//! - `updated_at >= created_at`; local mutations strictly advance `updated_at`.
//! - Timestamps are ISO-8601 UTC strings with millisecond precision.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Title shown for notes whose stored title is blank.
pub const UNTITLED_TITLE: &str = "Untitled";

const NOTE_ID_PREFIX: &str = "note";
const NOTE_ID_RANDOM_HEX_CHARS: usize = 12;

/// Opaque note identifier.
///
/// Local ids look like `note_<millis-hex>_<random-hex>`; remote ids are
/// whatever the service assigns.
pub type NoteId = String;

/// Canonical note shape, identical regardless of which store served it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Carried verbatim from the remote; always set for local notes.
    pub created_at: Option<String>,
    /// Carried verbatim from the remote; always set for local notes.
    pub updated_at: Option<String>,
}

impl Note {
    /// Title for display, falling back to [`UNTITLED_TITLE`] when blank.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED_TITLE
        } else {
            self.title.as_str()
        }
    }
}

/// Create body and partial-update body.
///
/// Absent fields are omitted from the JSON body and, for updates, leave the
/// stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl NotePayload {
    /// Payload carrying both fields.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }
}

/// Where the repository currently serves notes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryMode {
    /// Served by the remote notes API.
    Remote,
    /// Served by the local note store.
    Stub,
}

impl RepositoryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Stub => "stub",
        }
    }
}

impl Display for RepositoryMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates a collision-resistant id for a locally created note.
///
/// Combines the wall clock in milliseconds with random bits from a v4 UUID.
pub fn generate_note_id() -> NoteId {
    let millis = Utc::now().timestamp_millis().max(0);
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{NOTE_ID_PREFIX}_{millis:x}_{}",
        &random[..NOTE_ID_RANDOM_HEX_CHARS]
    )
}

/// Current time as an ISO-8601 UTC string.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Returns "now", or one millisecond past `previous` when the clock has not
/// moved beyond it.
///
/// Unparseable `previous` values are ignored.
pub fn next_timestamp_after(previous: Option<&str>) -> String {
    let now = Utc::now();
    let floor = previous
        .and_then(parse_timestamp)
        .map(|prev| prev + Duration::milliseconds(1));
    match floor {
        Some(floor) if floor > now => format_timestamp(floor),
        _ => format_timestamp(now),
    }
}

/// Parses an ISO-8601 timestamp produced by this crate or a remote.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_distinct() {
        let first = generate_note_id();
        let second = generate_note_id();
        assert!(first.starts_with("note_"));
        assert_eq!(first.split('_').count(), 3);
        assert_ne!(first, second);
    }

    #[test]
    fn next_timestamp_is_strictly_after_previous() {
        let future = "2999-01-01T00:00:00.000Z";
        assert_eq!(
            next_timestamp_after(Some(future)),
            "2999-01-01T00:00:00.001Z"
        );

        let current = now_timestamp();
        assert!(next_timestamp_after(Some(current.as_str())) > current);
    }

    #[test]
    fn next_timestamp_ignores_garbage_previous() {
        let value = next_timestamp_after(Some("yesterday-ish"));
        assert!(parse_timestamp(&value).is_some());
    }

    #[test]
    fn display_title_defaults_blank_titles() {
        let note = Note {
            id: "n1".to_string(),
            title: "  ".to_string(),
            content: String::new(),
            created_at: None,
            updated_at: None,
        };
        assert_eq!(note.display_title(), "Untitled");
    }

    #[test]
    fn payload_omits_absent_fields() {
        let body = serde_json::to_value(NotePayload::title("X")).expect("payload should serialize");
        assert_eq!(body, serde_json::json!({"title": "X"}));
    }

    #[test]
    fn note_uses_camel_case_wire_names() {
        let note = Note {
            id: "n1".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            created_at: Some("a".to_string()),
            updated_at: Some("b".to_string()),
        };
        let value = serde_json::to_value(&note).expect("note should serialize");
        assert_eq!(value["createdAt"], "a");
        assert_eq!(value["updatedAt"], "b");
    }
}

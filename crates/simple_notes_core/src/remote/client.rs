//! Typed HTTP client for the remote notes API.
//!
//! # Responsibility
//! - Map note CRUD calls onto `{base}/notes` and `{base}/notes/{id}`.
//! - Turn every failure into a distinguishable [`RemoteError`] value.
//!
//! # Invariants
//! - A non-2xx status is always an error carrying status, reason and body.
//! - `204` or an empty body, whatever its content type, is
//!   [`RemotePayload::Empty`], never `{}`.
//! - A non-JSON body is not an error by itself.

use crate::model::note::NotePayload;
use log::debug;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

const JSON_CONTENT_TYPE: &str = "application/json";
const MAX_BODY_SNIPPET_CHARS: usize = 200;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote call failure.
#[derive(Debug)]
pub enum RemoteError {
    /// No usable base URL; remote cannot be attempted at all.
    Config(String),
    /// Network, DNS, TLS or timeout failure before a response arrived.
    Transport(reqwest::Error),
    /// The remote answered with a non-success status.
    Status {
        status: u16,
        reason: String,
        body: String,
        url: String,
    },
    /// A JSON content-type whose non-empty body did not parse.
    Decode(serde_json::Error),
}

impl RemoteError {
    /// HTTP status for protocol failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stable short code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "no_base_url",
            Self::Transport(err) if err.is_timeout() => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "http_status",
            Self::Decode(_) => "decode",
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) => write!(f, "remote not configured: {message}"),
            Self::Transport(err) => write!(f, "request failed: {err}"),
            Self::Status {
                status,
                reason,
                body,
                ..
            } => {
                write!(f, "request failed ({status}) {reason}")?;
                if !body.is_empty() {
                    write!(f, ": {}", body_snippet(body))?;
                }
                Ok(())
            }
            Self::Decode(err) => write!(f, "invalid JSON response: {err}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::Config(_) | Self::Status { .. } => None,
        }
    }
}

/// Successful response body, decoded by content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RemotePayload {
    Json(Value),
    Text(String),
    Empty,
}

/// Accepted shapes of a list response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NoteListShape {
    Bare(Vec<Value>),
    Wrapped { items: Vec<Value> },
    #[serde(skip_deserializing)]
    Unrecognized(Value),
}

impl NoteListShape {
    /// Decodes a list payload; anything unexpected becomes `Unrecognized`.
    pub fn from_payload(payload: RemotePayload) -> Self {
        match payload {
            RemotePayload::Json(value) => {
                Self::deserialize(&value).unwrap_or_else(|_| Self::Unrecognized(value))
            }
            RemotePayload::Text(text) => Self::Unrecognized(Value::String(text)),
            RemotePayload::Empty => Self::Unrecognized(Value::Null),
        }
    }

    /// Item sequence; empty for unrecognized shapes.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } => items,
            Self::Unrecognized(_) => Vec::new(),
        }
    }
}

/// REST client bound to one base URL.
#[derive(Debug, Clone)]
pub struct RemoteNoteClient {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteNoteClient {
    /// Builds a client; trailing slashes on `base_url` are ignored.
    ///
    /// # Errors
    /// - `Config` when the base URL is empty.
    /// - `Transport` when the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RemoteError::Config(
                "API base URL is not configured".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::Transport)?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reachability probe: a list request whose payload is discarded.
    pub async fn ping(&self) -> RemoteResult<()> {
        self.list().await.map(|_| ())
    }

    pub async fn list(&self) -> RemoteResult<NoteListShape> {
        let payload = self.send(Method::GET, "/notes", None).await?;
        Ok(NoteListShape::from_payload(payload))
    }

    pub async fn get(&self, id: &str) -> RemoteResult<RemotePayload> {
        self.send(Method::GET, &note_path(id), None).await
    }

    pub async fn create(&self, payload: &NotePayload) -> RemoteResult<RemotePayload> {
        self.send(Method::POST, "/notes", Some(payload)).await
    }

    pub async fn update(&self, id: &str, payload: &NotePayload) -> RemoteResult<RemotePayload> {
        self.send(Method::PUT, &note_path(id), Some(payload)).await
    }

    pub async fn delete(&self, id: &str) -> RemoteResult<RemotePayload> {
        self.send(Method::DELETE, &note_path(id), None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&NotePayload>,
    ) -> RemoteResult<RemotePayload> {
        let url = format!("{}{}", self.base_url, path);
        let started_at = Instant::now();

        let mut request: RequestBuilder = self
            .client
            .request(method.clone(), url.as_str())
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(RemoteError::Transport)?;
        debug!(
            "event=remote_request module=remote method={} path={} status={} duration_ms={}",
            method,
            path,
            response.status().as_u16(),
            started_at.elapsed().as_millis()
        );
        read_payload(response, url).await
    }
}

async fn read_payload(response: Response, url: String) -> RemoteResult<RemotePayload> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
            url,
        });
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(RemotePayload::Empty);
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(JSON_CONTENT_TYPE));

    let text = response.text().await.map_err(RemoteError::Transport)?;
    if text.trim().is_empty() {
        return Ok(RemotePayload::Empty);
    }
    if is_json {
        let value = serde_json::from_str(&text).map_err(RemoteError::Decode)?;
        return Ok(RemotePayload::Json(value));
    }
    Ok(RemotePayload::Text(text))
}

fn note_path(id: &str) -> String {
    format!("/notes/{}", urlencoding::encode(id))
}

fn body_snippet(body: &str) -> String {
    let flattened = body.replace(['\n', '\r'], " ");
    let mut snippet: String = flattened.chars().take(MAX_BODY_SNIPPET_CHARS).collect();
    if flattened.chars().count() > MAX_BODY_SNIPPET_CHARS {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_base_url_is_a_config_error() {
        let err = RemoteNoteClient::new(" / ", Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.code(), "no_base_url");
    }

    #[test]
    fn base_url_trailing_slashes_are_trimmed() {
        let client = RemoteNoteClient::new("http://api.test///", Duration::from_secs(1))
            .expect("non-empty base url should build a client");
        assert_eq!(client.base_url(), "http://api.test");
    }

    #[test]
    fn note_path_percent_encodes_ids() {
        assert_eq!(note_path("a b/c"), "/notes/a%20b%2Fc");
    }

    #[test]
    fn list_shapes_decode_bare_wrapped_and_other() {
        let bare = NoteListShape::from_payload(RemotePayload::Json(json!([{"id": "1"}])));
        assert_eq!(bare.into_items().len(), 1);

        let wrapped =
            NoteListShape::from_payload(RemotePayload::Json(json!({"items": [{"id": "1"}, {"id": "2"}]})));
        assert_eq!(wrapped.into_items().len(), 2);

        for other in [
            RemotePayload::Json(json!({"items": "nope"})),
            RemotePayload::Json(json!({"data": []})),
            RemotePayload::Text("hello".to_string()),
            RemotePayload::Empty,
        ] {
            assert!(NoteListShape::from_payload(other).into_items().is_empty());
        }
    }

    #[test]
    fn status_error_message_includes_status_reason_and_snippet() {
        let err = RemoteError::Status {
            status: 500,
            reason: "Internal Server Error".to_string(),
            body: format!("line1\n{}", "x".repeat(400)),
            url: "http://api.test/notes".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("request failed (500) Internal Server Error: line1 x"));
        assert!(message.ends_with("..."));
        assert!(!message.contains('\n'));
        assert_eq!(err.status(), Some(500));
    }
}

//! Environment-driven configuration.
//!
//! # Responsibility
//! - Resolve the remote base URL, feature flags and local storage location.
//! - Apply documented defaults for absent or empty values.
//!
//! # Invariants
//! - Values are trimmed; an empty value is treated as unset.
//! - Parsing never touches the network or the filesystem.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_BASE: &str = "SIMPLE_NOTES_API_BASE";
pub const ENV_BACKEND_URL: &str = "SIMPLE_NOTES_BACKEND_URL";
pub const ENV_FEATURE_FLAGS: &str = "SIMPLE_NOTES_FEATURE_FLAGS";
pub const ENV_EXPERIMENTS_ENABLED: &str = "SIMPLE_NOTES_EXPERIMENTS_ENABLED";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "SIMPLE_NOTES_REQUEST_TIMEOUT_MS";
pub const ENV_DB_PATH: &str = "SIMPLE_NOTES_DB_PATH";

/// Feature flag that forces the remote attempt on or off.
pub const FLAG_USE_REMOTE_API: &str = "useRemoteApi";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);
const DEFAULT_DB_PATH: &str = "simple_notes.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Parsed feature-flag map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFlags {
    flags: BTreeMap<String, Value>,
}

impl FeatureFlags {
    /// Parses a JSON object, falling back to a comma-separated list of names
    /// that are each set to `true`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::default();
        }

        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
            return Self::from_map(map);
        }

        let flags = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| (name.to_string(), Value::Bool(true)))
            .collect();
        Self { flags }
    }

    fn from_map(map: Map<String, Value>) -> Self {
        Self {
            flags: map.into_iter().collect(),
        }
    }

    /// Raw flag value, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.flags.get(name)
    }

    /// Truthiness of a present flag; `None` when the flag is absent.
    pub fn enabled(&self, name: &str) -> Option<bool> {
        self.get(name).map(is_truthy)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Effective runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NotesConfig {
    /// Remote base URL; empty when remote is not configured.
    pub api_base_url: String,
    pub feature_flags: FeatureFlags,
    /// Reserved switch for experimental behavior; unused by the repository.
    pub experiments_enabled: bool,
    /// Per-request timeout for remote calls.
    pub request_timeout: Duration,
    /// SQLite file backing the local key-value store.
    pub db_path: PathBuf,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            feature_flags: FeatureFlags::default(),
            experiments_enabled: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl NotesConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    /// - Returns `InvalidValue` when the timeout is not a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_base_url = read(ENV_API_BASE)
            .or_else(|| read(ENV_BACKEND_URL))
            .unwrap_or_default();
        let feature_flags = read(ENV_FEATURE_FLAGS)
            .map(|raw| FeatureFlags::parse(&raw))
            .unwrap_or_default();
        let experiments_enabled = read(ENV_EXPERIMENTS_ENABLED)
            .map(|raw| parse_bool_switch(&raw))
            .unwrap_or(false);

        let request_timeout = match read(ENV_REQUEST_TIMEOUT_MS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_REQUEST_TIMEOUT_MS,
                        value: raw,
                    })
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let db_path = read(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        Ok(Self {
            api_base_url,
            feature_flags,
            experiments_enabled,
            request_timeout,
            db_path,
        })
    }

    /// Config pointing at a remote base URL with all other defaults.
    pub fn with_remote(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Explicit remote override from feature flags, if any.
    pub fn remote_flag(&self) -> Option<bool> {
        self.feature_flags.enabled(FLAG_USE_REMOTE_API)
    }

    /// Whether a remote attempt should be made at all.
    ///
    /// Requires a base URL; an explicit flag then wins over the default of
    /// "attempt whenever a base URL is configured".
    pub fn should_try_remote(&self) -> bool {
        if self.api_base_url.trim().is_empty() {
            return false;
        }
        self.remote_flag().unwrap_or(true)
    }
}

fn parse_bool_switch(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

//! Repository layer: local note storage and the remote/local facade.
//!
//! # Responsibility
//! - Own the remote-vs-local decision and the fallback policy.
//! - Isolate key-value persistence details from callers.
//!
//! # Invariants
//! - Repository APIs surface only local storage failures; remote failures
//!   are absorbed by falling back to local storage.

use crate::db::kv::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod local_note_store;
pub mod notes_repository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Failure that no fallback can route around.
#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

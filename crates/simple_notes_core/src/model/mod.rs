//! Domain model for notes and repository state.
//!
//! # Responsibility
//! - Define the canonical note shape shared by local and remote storage.
//! - Keep id/timestamp generation in one place.

pub mod note;

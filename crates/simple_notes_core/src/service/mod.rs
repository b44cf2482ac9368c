//! Use-case services above the repository.
//!
//! # Responsibility
//! - Orchestrate repository calls into user-facing actions.
//! - Keep front ends (CLI, future UIs) free of storage decisions.

pub mod notes_app;

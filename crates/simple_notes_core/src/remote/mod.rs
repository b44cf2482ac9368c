//! Remote notes API boundary.
//!
//! # Responsibility
//! - Translate note CRUD calls into HTTP requests against a base URL.
//! - Report failures as values so callers can decide how to route around them.

pub mod client;

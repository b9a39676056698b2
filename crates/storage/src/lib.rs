//! Persisted client state for GradTrack.
//!
//! This crate provides a trait-based interface for storing the authenticated
//! session durably, with a JSON file implementation and an in-memory one.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{SessionStore, StorageError, Result};
pub use json_storage::{JsonSessionStore, SESSION_FILE};
pub use memory::MemorySessionStore;

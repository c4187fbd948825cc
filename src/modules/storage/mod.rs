//! Storage module for document payloads
//!
//! Provides the storage backend abstraction and the local filesystem
//! implementation used for uploaded documents.

mod local_storage;

pub use local_storage::{LocalStorage, StorageBackend};

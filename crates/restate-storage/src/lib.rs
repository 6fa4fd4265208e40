//! Key-value storage backends for persisted state.
//!
//! This crate provides the abstraction the rehydrator writes snapshots
//! through, along with an in-memory backend for tests and ephemeral use
//! and a file backend that survives process restarts.

use async_trait::async_trait;
use restate_types::{RestateError, StorageSettings};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub mod implementations;

pub use implementations::{FileStorage, MemoryStorage};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a stored value is not valid UTF-8 text.
	#[error("Encoding error: {0}")]
	Encoding(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

impl From<StorageError> for RestateError {
	fn from(err: StorageError) -> Self {
		RestateError::Storage(err.to_string())
	}
}

/// Trait defining the interface for string-keyed storage backends.
///
/// Implementations store UTF-8 text under string keys. Durable backends
/// must keep values across process lifetimes.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Short identifier of the backend kind.
	fn backend_type(&self) -> &'static str;

	/// Retrieves the value stored under `key`, if any.
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

	/// Stores `value` under `key`, replacing any previous value.
	async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn remove(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Storage backend type
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
	/// In-memory storage (lost on restart)
	Memory,
	/// File-based storage (persisted)
	File { path: PathBuf },
}

impl StorageBackend {
	/// Maps file settings to a backend; `None` when persistence is disabled.
	pub fn from_settings(settings: &StorageSettings) -> Option<Self> {
		match settings {
			StorageSettings::File { path } => Some(StorageBackend::File { path: path.clone() }),
			StorageSettings::Memory => Some(StorageBackend::Memory),
			StorageSettings::None => None,
		}
	}
}

/// Create storage instance based on backend type
pub fn create_storage(backend: StorageBackend) -> Arc<dyn StorageInterface> {
	match backend {
		StorageBackend::Memory => Arc::new(MemoryStorage::new()),
		StorageBackend::File { path } => Arc::new(FileStorage::new(path)),
	}
}

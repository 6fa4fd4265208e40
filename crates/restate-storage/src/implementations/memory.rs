//! In-memory storage implementation.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory storage implementation.
///
/// Clones share the same underlying map, so a test can keep a handle
/// to inspect what a rehydrator wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
	data: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	fn backend_type(&self) -> &'static str {
		"memory"
	}

	async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.data.get(key).map(|entry| entry.value().clone()))
	}

	async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
		self.data.insert(key.to_string(), value);
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.data.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.data.contains_key(key))
	}
}

//! Reading and writing the persisted snapshot.

use crate::config::RestateConfig;
use restate_storage::StorageInterface;
use restate_types::{select_slices, RestateError, Result, PERSIST_KEY};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Loads and saves the snapshot stored under [`PERSIST_KEY`].
///
/// Loads honour the slice restriction; saves always write the full state.
#[derive(Clone)]
pub struct SnapshotStore {
	storage: Option<Arc<dyn StorageInterface>>,
	states: Option<Vec<String>>,
}

impl SnapshotStore {
	pub fn new(storage: Option<Arc<dyn StorageInterface>>, states: Option<Vec<String>>) -> Self {
		Self { storage, states }
	}

	pub fn from_config(config: &RestateConfig) -> Self {
		Self::new(config.storage.clone(), config.states.clone())
	}

	/// Reads the raw snapshot as JSON.
	///
	/// An absent or empty value means there is no prior state, and so does
	/// a falsy top-level JSON value (`null`, `false`, `0`, `""`).
	pub async fn load_value(&self) -> Result<Option<Value>> {
		let Some(storage) = &self.storage else {
			return Ok(None);
		};

		let raw = match storage.get(PERSIST_KEY).await? {
			Some(raw) if !raw.is_empty() => raw,
			_ => return Ok(None),
		};

		let data: Value = serde_json::from_str(&raw)
			.map_err(|e| RestateError::MalformedSnapshot(e.to_string()))?;
		if is_falsy(&data) {
			return Ok(None);
		}

		info!(backend = storage.backend_type(), "Loaded state from storage");
		Ok(Some(select_slices(data, self.states.as_deref())))
	}

	/// Reads the snapshot and decodes it into the store's state type.
	pub async fn load<S: DeserializeOwned>(&self) -> Result<Option<S>> {
		match self.load_value().await? {
			Some(value) => serde_json::from_value(value)
				.map(Some)
				.map_err(|e| RestateError::MalformedSnapshot(e.to_string())),
			None => Ok(None),
		}
	}

	/// Overwrites the snapshot with `state`. A no-op without a backend.
	pub async fn save<S: Serialize + ?Sized>(&self, state: &S) -> Result<()> {
		match self.encode(state)? {
			Some(content) => self.write(content).await,
			None => {
				debug!("No storage configured, skipping save");
				Ok(())
			}
		}
	}

	/// Serializes `state` for [`SnapshotStore::write`]; `None` when
	/// persistence is disabled.
	pub fn encode<S: Serialize + ?Sized>(&self, state: &S) -> Result<Option<String>> {
		if self.storage.is_none() {
			return Ok(None);
		}

		serde_json::to_string(state)
			.map(Some)
			.map_err(|e| RestateError::Serialization(e.to_string()))
	}

	/// Writes an already encoded snapshot.
	pub async fn write(&self, content: String) -> Result<()> {
		if let Some(storage) = &self.storage {
			storage.set(PERSIST_KEY, content).await?;
		}
		Ok(())
	}

	/// Whether a snapshot is currently stored.
	pub async fn exists(&self) -> Result<bool> {
		match &self.storage {
			Some(storage) => Ok(storage.exists(PERSIST_KEY).await?),
			None => Ok(false),
		}
	}

	/// Removes the snapshot from the backend.
	pub async fn clear(&self) -> Result<()> {
		if let Some(storage) = &self.storage {
			storage.remove(PERSIST_KEY).await?;
		}
		Ok(())
	}
}

fn is_falsy(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(flag) => !flag,
		Value::Number(number) => number.as_f64() == Some(0.0),
		Value::String(text) => text.is_empty(),
		Value::Array(_) | Value::Object(_) => false,
	}
}

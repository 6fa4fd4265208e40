//! Runtime configuration of a rehydrator.

use restate_storage::{create_storage, FileStorage, StorageBackend, StorageInterface};
use restate_types::settings::{DEFAULT_DELAY_MS, DEFAULT_STORAGE_PATH};
use restate_types::RestateSettings;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a wrapped reducer.
///
/// The default persists every slice to the file backend under
/// `./data/restate` with a 3500ms debounce.
#[derive(Clone)]
pub struct RestateConfig {
	/// Slices restored on load; `None` restores everything
	pub states: Option<Vec<String>>,
	/// Backend holding the snapshot; `None` disables persistence
	pub storage: Option<Arc<dyn StorageInterface>>,
	/// Quiet period before a scheduled save runs
	pub delay: Duration,
}

impl Default for RestateConfig {
	fn default() -> Self {
		Self {
			states: None,
			storage: Some(Arc::new(FileStorage::new(DEFAULT_STORAGE_PATH))),
			delay: Duration::from_millis(DEFAULT_DELAY_MS),
		}
	}
}

impl fmt::Debug for RestateConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RestateConfig")
			.field("states", &self.states)
			.field("storage", &self.storage.as_ref().map(|s| s.backend_type()))
			.field("delay", &self.delay)
			.finish()
	}
}

impl RestateConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a config from loaded settings.
	pub fn from_settings(settings: &RestateSettings) -> Self {
		Self {
			states: settings.restate.states.clone(),
			storage: StorageBackend::from_settings(&settings.storage).map(create_storage),
			delay: Duration::from_millis(settings.restate.delay_ms),
		}
	}

	pub fn with_states<I, T>(mut self, states: I) -> Self
	where
		I: IntoIterator<Item = T>,
		T: Into<String>,
	{
		self.states = Some(states.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_storage(self, storage: impl StorageInterface + 'static) -> Self {
		self.with_shared_storage(Arc::new(storage))
	}

	pub fn with_shared_storage(mut self, storage: Arc<dyn StorageInterface>) -> Self {
		self.storage = Some(storage);
		self
	}

	pub fn without_storage(mut self) -> Self {
		self.storage = None;
		self
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}
}

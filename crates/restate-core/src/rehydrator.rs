//! The persistence meta-reducer.

use crate::{config::RestateConfig, debounce::Debouncer, persist::SnapshotStore, reducer::Reducer};
use restate_types::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Whether a wrapped reducer has produced a state yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// No call yet; the next uninitialized call restores from storage
	Cold,
	/// At least one state has been produced
	Warm,
}

/// Creates the meta-reducer factory for `config`.
pub fn restate(config: RestateConfig) -> Restate {
	Restate { config }
}

/// Wraps reducers with load-on-start and debounced saving.
#[derive(Debug, Clone)]
pub struct Restate {
	config: RestateConfig,
}

impl Restate {
	/// Wraps `reducer`, spawning its save worker on the current runtime.
	pub fn wrap<S, A, R>(&self, reducer: R) -> Result<Rehydrator<S, A, R>>
	where
		R: Reducer<S, A>,
		S: Clone + Serialize + DeserializeOwned + Send + 'static,
	{
		let store = SnapshotStore::from_config(&self.config);
		let saver = Debouncer::spawn(store.clone(), self.config.delay)?;

		Ok(Rehydrator {
			reducer,
			store,
			saver,
			warm: AtomicBool::new(false),
			_action: PhantomData,
		})
	}
}

/// A reducer that restores its state from storage and persists every
/// transition after a quiet period.
pub struct Rehydrator<S, A, R> {
	reducer: R,
	store: SnapshotStore,
	saver: Debouncer<S>,
	warm: AtomicBool,
	_action: PhantomData<fn(&A)>,
}

impl<S, A, R> Rehydrator<S, A, R>
where
	R: Reducer<S, A>,
	S: Clone + Serialize + DeserializeOwned + Send + 'static,
{
	/// Runs the wrapped reducer.
	///
	/// An uninitialized (`None`) state is first seeded from storage. The
	/// new state is returned as computed; its save happens in the
	/// background and can never change the result.
	pub async fn reduce(&self, state: Option<S>, action: &A) -> Result<S> {
		let state = match state {
			Some(state) => Some(state),
			None => self.load().await?,
		};

		if !self.warm.swap(true, Ordering::AcqRel) {
			debug!(restored = state.is_some(), "Rehydrator warmed up");
		}

		let new_state = self.reducer.reduce(state, action);
		self.schedule_save(new_state.clone());
		Ok(new_state)
	}

	/// Reads the persisted snapshot, restricted to the configured slices.
	pub async fn load(&self) -> Result<Option<S>> {
		self.store.load().await
	}

	/// Writes `state` immediately, bypassing the debounce.
	pub async fn save(&self, state: &S) -> Result<()> {
		self.store.save(state).await
	}

	/// Queues a debounced save of `state`.
	pub fn schedule_save(&self, state: S) {
		self.saver.schedule(state);
	}

	/// Writes any pending state now and reports the outcome.
	pub async fn flush(&self) -> Result<()> {
		self.saver.flush().await
	}

	/// Whether the wrapper has produced a state yet.
	pub fn phase(&self) -> Phase {
		if self.warm.load(Ordering::Acquire) {
			Phase::Warm
		} else {
			Phase::Cold
		}
	}

	/// Quiet period before a scheduled save runs.
	pub fn delay(&self) -> Duration {
		self.saver.delay()
	}

	/// Writes any pending state and stops the save worker.
	///
	/// Call this before the runtime exits: a dropped rehydrator only
	/// saves if the runtime outlives its worker.
	pub async fn shutdown(self) -> Result<()> {
		self.saver.shutdown().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use restate_storage::{FileStorage, MemoryStorage, StorageError, StorageInterface};
	use restate_types::{RestateError, Snapshot, PERSIST_KEY};
	use serde::Deserialize;
	use serde_json::json;
	use std::sync::atomic::AtomicUsize;
	use std::sync::Arc;
	use tokio::time::sleep;

	#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
	struct AppState {
		#[serde(default)]
		counter: i64,
		#[serde(default)]
		label: Option<String>,
	}

	enum Action {
		Increment,
		Rename(&'static str),
		Noop,
	}

	fn app_reducer(state: Option<AppState>, action: &Action) -> AppState {
		let mut state = state.unwrap_or_default();
		match action {
			Action::Increment => state.counter += 1,
			Action::Rename(label) => state.label = Some(label.to_string()),
			Action::Noop => {}
		}
		state
	}

	fn snapshot_reducer(state: Option<Snapshot>, _action: &Action) -> Snapshot {
		state.unwrap_or_default()
	}

	/// Memory backend that counts reads and writes.
	#[derive(Clone, Default)]
	struct CountingStorage {
		inner: MemoryStorage,
		reads: Arc<AtomicUsize>,
		writes: Arc<AtomicUsize>,
	}

	impl CountingStorage {
		fn reads(&self) -> usize {
			self.reads.load(Ordering::SeqCst)
		}

		fn writes(&self) -> usize {
			self.writes.load(Ordering::SeqCst)
		}

		async fn stored(&self) -> Option<serde_json::Value> {
			self.inner
				.get(PERSIST_KEY)
				.await
				.unwrap()
				.map(|raw| serde_json::from_str(&raw).unwrap())
		}
	}

	#[async_trait]
	impl StorageInterface for CountingStorage {
		fn backend_type(&self) -> &'static str {
			"counting"
		}

		async fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
			self.reads.fetch_add(1, Ordering::SeqCst);
			self.inner.get(key).await
		}

		async fn set(&self, key: &str, value: String) -> std::result::Result<(), StorageError> {
			self.writes.fetch_add(1, Ordering::SeqCst);
			self.inner.set(key, value).await
		}

		async fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
			self.inner.remove(key).await
		}

		async fn exists(&self, key: &str) -> std::result::Result<bool, StorageError> {
			self.inner.exists(key).await
		}
	}

	/// Backend whose every access fails.
	struct UnavailableStorage;

	#[async_trait]
	impl StorageInterface for UnavailableStorage {
		fn backend_type(&self) -> &'static str {
			"unavailable"
		}

		async fn get(&self, _key: &str) -> std::result::Result<Option<String>, StorageError> {
			Err(StorageError::Backend("storage unavailable".to_string()))
		}

		async fn set(&self, _key: &str, _value: String) -> std::result::Result<(), StorageError> {
			Err(StorageError::Backend("quota exceeded".to_string()))
		}

		async fn remove(&self, _key: &str) -> std::result::Result<(), StorageError> {
			Err(StorageError::Backend("storage unavailable".to_string()))
		}

		async fn exists(&self, _key: &str) -> std::result::Result<bool, StorageError> {
			Err(StorageError::Backend("storage unavailable".to_string()))
		}
	}

	fn config(storage: &CountingStorage, delay_ms: u64) -> RestateConfig {
		RestateConfig::new()
			.with_storage(storage.clone())
			.with_delay(Duration::from_millis(delay_ms))
	}

	#[tokio::test(start_paused = true)]
	async fn test_load_then_save_round_trips_snapshot() {
		let storage = CountingStorage::default();
		let snapshot = json!({"a": 1, "b": {"c": [1, 2, 3]}, "d": "text"});
		storage
			.inner
			.set(PERSIST_KEY, snapshot.to_string())
			.await
			.unwrap();

		let rehydrator = restate(config(&storage, 3500)).wrap(snapshot_reducer).unwrap();
		let state = rehydrator.reduce(None, &Action::Noop).await.unwrap();
		assert_eq!(serde_json::Value::Object(state), snapshot);

		sleep(Duration::from_millis(3501)).await;
		assert_eq!(storage.writes(), 1);
		assert_eq!(storage.stored().await, Some(snapshot));
	}

	#[tokio::test(start_paused = true)]
	async fn test_slice_filtering_on_load() {
		let storage = CountingStorage::default();
		storage
			.inner
			.set(PERSIST_KEY, r#"{"a":1,"b":2}"#.to_string())
			.await
			.unwrap();

		let rehydrator = restate(config(&storage, 100).with_states(["a"]))
			.wrap(snapshot_reducer)
			.unwrap();

		let loaded = rehydrator.load().await.unwrap().unwrap();
		assert_eq!(serde_json::Value::Object(loaded), json!({"a": 1}));
	}

	#[tokio::test(start_paused = true)]
	async fn test_filtered_slices_fall_back_to_defaults() {
		let storage = CountingStorage::default();
		storage
			.inner
			.set(PERSIST_KEY, r#"{"counter":3,"label":"kept out"}"#.to_string())
			.await
			.unwrap();

		let rehydrator = restate(config(&storage, 100).with_states(["counter"]))
			.wrap(app_reducer)
			.unwrap();

		let state = rehydrator.reduce(None, &Action::Increment).await.unwrap();
		assert_eq!(
			state,
			AppState {
				counter: 4,
				label: None
			}
		);

		// Saves write the full state, not just the restored slices
		rehydrator.flush().await.unwrap();
		assert_eq!(
			storage.stored().await,
			Some(json!({"counter": 4, "label": null}))
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_no_backend_is_noop() {
		let rehydrator = restate(RestateConfig::new().without_storage())
			.wrap(app_reducer)
			.unwrap();

		let state = rehydrator.reduce(None, &Action::Increment).await.unwrap();
		assert_eq!(state.counter, 1);
		rehydrator.save(&state).await.unwrap();
		rehydrator.flush().await.unwrap();
		assert_eq!(rehydrator.load().await.unwrap(), None);
	}

	#[tokio::test(start_paused = true)]
	async fn test_rapid_dispatches_collapse_into_one_save() {
		let storage = CountingStorage::default();
		let rehydrator = restate(config(&storage, 1000)).wrap(app_reducer).unwrap();

		let mut state = rehydrator.reduce(None, &Action::Increment).await.unwrap();
		for _ in 0..4 {
			sleep(Duration::from_millis(100)).await;
			state = rehydrator
				.reduce(Some(state), &Action::Increment)
				.await
				.unwrap();
		}
		assert_eq!(state.counter, 5);

		// Last dispatch happened 400ms in; its save is due at 1400ms
		sleep(Duration::from_millis(999)).await;
		assert_eq!(storage.writes(), 0);

		sleep(Duration::from_millis(2)).await;
		assert_eq!(storage.writes(), 1);
		assert_eq!(
			storage.stored().await,
			Some(json!({"counter": 5, "label": null}))
		);

		// No stale timer fires later
		sleep(Duration::from_millis(10_000)).await;
		assert_eq!(storage.writes(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_many_dispatches_never_write_stale_state() {
		let storage = CountingStorage::default();
		let rehydrator = restate(config(&storage, 1000)).wrap(app_reducer).unwrap();

		let mut state = rehydrator.reduce(None, &Action::Noop).await.unwrap();
		for _ in 0..20 {
			sleep(Duration::from_millis(50)).await;
			state = rehydrator
				.reduce(Some(state), &Action::Increment)
				.await
				.unwrap();
		}

		sleep(Duration::from_millis(5_000)).await;
		assert_eq!(storage.writes(), 1);
		assert_eq!(
			storage.stored().await,
			Some(json!({"counter": 20, "label": null}))
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_malformed_snapshot_fails_first_call() {
		let storage = CountingStorage::default();
		storage
			.inner
			.set(PERSIST_KEY, "definitely not json".to_string())
			.await
			.unwrap();

		let rehydrator = restate(config(&storage, 100)).wrap(app_reducer).unwrap();
		let result = rehydrator.reduce(None, &Action::Noop).await;
		assert!(matches!(result, Err(RestateError::MalformedSnapshot(_))));
		assert_eq!(rehydrator.phase(), Phase::Cold);
	}

	#[tokio::test(start_paused = true)]
	async fn test_load_only_when_uninitialized() {
		let storage = CountingStorage::default();
		let rehydrator = restate(config(&storage, 100)).wrap(app_reducer).unwrap();
		assert_eq!(rehydrator.phase(), Phase::Cold);

		let state = rehydrator.reduce(None, &Action::Increment).await.unwrap();
		assert_eq!(storage.reads(), 1);
		assert_eq!(rehydrator.phase(), Phase::Warm);

		let state = rehydrator
			.reduce(Some(state), &Action::Rename("todo"))
			.await
			.unwrap();
		assert_eq!(storage.reads(), 1);
		assert_eq!(state.label.as_deref(), Some("todo"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_storage_failures() {
		let rehydrator = restate(RestateConfig::new().with_storage(UnavailableStorage))
			.wrap(app_reducer)
			.unwrap();

		// Reads surface from the call that triggered them
		let result = rehydrator.reduce(None, &Action::Noop).await;
		assert!(matches!(result, Err(RestateError::Storage(_))));

		// Write failures never change the returned state
		let state = rehydrator
			.reduce(Some(AppState::default()), &Action::Increment)
			.await
			.unwrap();
		assert_eq!(state.counter, 1);

		let flushed = rehydrator.flush().await;
		assert!(matches!(flushed, Err(RestateError::Storage(_))));
	}

	#[tokio::test(start_paused = true)]
	async fn test_delay_comes_from_config() {
		let storage = CountingStorage::default();
		let rehydrator = restate(config(&storage, 250)).wrap(app_reducer).unwrap();
		assert_eq!(rehydrator.delay(), Duration::from_millis(250));
	}

	#[test]
	fn test_shutdown_persists_before_runtime_exits() {
		let storage = MemoryStorage::new();
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.unwrap();

		runtime.block_on(async {
			let rehydrator = restate(RestateConfig::new().with_storage(storage.clone()))
				.wrap(|state: Option<i64>, value: &i64| state.unwrap_or_default() + value)
				.unwrap();
			assert_eq!(rehydrator.reduce(None, &5).await.unwrap(), 5);
			rehydrator.shutdown().await.unwrap();
		});
		drop(runtime);

		let runtime = tokio::runtime::Builder::new_current_thread()
			.build()
			.unwrap();
		let stored = runtime.block_on(storage.get(PERSIST_KEY)).unwrap();
		assert_eq!(stored.as_deref(), Some("5"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_shutdown_reports_failed_final_save() {
		let rehydrator = restate(RestateConfig::new().with_storage(UnavailableStorage))
			.wrap(app_reducer)
			.unwrap();

		rehydrator.schedule_save(AppState::default());
		let outcome = rehydrator.shutdown().await;
		assert!(matches!(outcome, Err(RestateError::Storage(_))));
	}

	#[tokio::test]
	async fn test_file_backend_survives_restart() {
		let temp_dir = tempfile::TempDir::new().unwrap();
		let factory = restate(
			RestateConfig::new()
				.with_storage(FileStorage::new(temp_dir.path()))
				.with_delay(Duration::from_millis(20)),
		);

		let first = factory.wrap(app_reducer).unwrap();
		let state = first.reduce(None, &Action::Increment).await.unwrap();
		let state = first
			.reduce(Some(state), &Action::Rename("persisted"))
			.await
			.unwrap();
		first.shutdown().await.unwrap();

		let second = factory.wrap(app_reducer).unwrap();
		let restored = second.reduce(None, &Action::Noop).await.unwrap();
		assert_eq!(restored, state);
	}
}

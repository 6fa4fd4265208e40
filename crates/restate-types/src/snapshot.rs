//! Persisted snapshot format.
//!
//! A snapshot is a single JSON object mapping slice names to arbitrary
//! values. It is written wholesale under [`PERSIST_KEY`] on every save.

use serde_json::{Map, Value};

/// The single key owned by the rehydrator in any storage backend.
pub const PERSIST_KEY: &str = "__RESTATE__";

/// Top-level persisted mapping from slice name to slice value.
pub type Snapshot = Map<String, Value>;

/// Restricts a parsed snapshot to the configured slice names.
///
/// With no restriction the value is returned untouched. With a
/// restriction, only the named slices that are present in the snapshot
/// survive; a snapshot that is not a JSON object yields an empty one.
pub fn select_slices(data: Value, states: Option<&[String]>) -> Value {
	let Some(states) = states else {
		return data;
	};

	let mut source = match data {
		Value::Object(map) => map,
		_ => Snapshot::new(),
	};

	let mut selected = Snapshot::new();
	for name in states {
		if let Some(value) = source.remove(name) {
			selected.insert(name.clone(), value);
		}
	}

	Value::Object(selected)
}

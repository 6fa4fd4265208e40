//! File-facing settings for the rehydrator and its storage backend.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default debounce delay in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 3500;

/// Default directory of the durable file backend.
pub const DEFAULT_STORAGE_PATH: &str = "./data/restate";

/// Root of a restate configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestateSettings {
	#[serde(default)]
	pub restate: RehydratorSettings,
	#[serde(default)]
	pub storage: StorageSettings,
}

/// Rehydrator behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RehydratorSettings {
	/// Debounce delay for saves, in milliseconds
	#[serde(default = "default_delay_ms")]
	pub delay_ms: u64,
	/// Slice names restored on load; all slices when unset
	#[serde(default)]
	pub states: Option<Vec<String>>,
	/// Log filter used by the binary
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

impl Default for RehydratorSettings {
	fn default() -> Self {
		Self {
			delay_ms: DEFAULT_DELAY_MS,
			states: None,
			log_level: default_log_level(),
		}
	}
}

/// Which backend persists the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageSettings {
	/// One file per key under `path`
	File {
		#[serde(default = "default_storage_path")]
		path: PathBuf,
	},
	/// Process-local map, lost on exit
	Memory,
	/// Persistence disabled; saves are no-ops and loads find nothing
	None,
}

impl Default for StorageSettings {
	fn default() -> Self {
		StorageSettings::File {
			path: default_storage_path(),
		}
	}
}

fn default_delay_ms() -> u64 {
	DEFAULT_DELAY_MS
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_storage_path() -> PathBuf {
	PathBuf::from(DEFAULT_STORAGE_PATH)
}

//! Error types for state persistence.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RestateError>;

#[derive(Error, Debug)]
pub enum RestateError {
	#[error("Storage error: {0}")]
	Storage(String),

	#[error("Malformed persisted snapshot: {0}")]
	MalformedSnapshot(String),

	#[error("Serialization error: {0}")]
	Serialization(String),

	#[error("No Tokio runtime available: {0}")]
	NoRuntime(String),

	#[error("Save worker has shut down")]
	WorkerClosed,
}

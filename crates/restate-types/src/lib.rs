//! Shared types for the restate workspace.
//!
//! Holds the error taxonomy, the persisted snapshot helpers and the
//! serde-facing settings that the other crates build on.

pub mod errors;
pub mod settings;
pub mod snapshot;

pub use errors::{RestateError, Result};
pub use settings::{RehydratorSettings, RestateSettings, StorageSettings};
pub use snapshot::{select_slices, Snapshot, PERSIST_KEY};

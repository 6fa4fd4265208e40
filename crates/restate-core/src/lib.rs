//! State rehydration for reducer-driven stores.
//!
//! [`restate`] wraps a reducer so that the first call restores the last
//! persisted snapshot and every transition schedules a debounced save of
//! the resulting state.
//!
//! ```no_run
//! use restate_core::{restate, RestateConfig};
//! use std::time::Duration;
//!
//! # async fn run() -> restate_types::Result<()> {
//! let counter = |state: Option<i64>, delta: &i64| state.unwrap_or_default() + delta;
//! let store = restate(RestateConfig::new().with_delay(Duration::from_millis(500))).wrap(counter)?;
//!
//! let state = store.reduce(None, &1).await?;
//! let state = store.reduce(Some(state), &2).await?;
//! assert_eq!(state, 3);
//! store.flush().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod debounce;
pub mod persist;
pub mod reducer;
pub mod rehydrator;

pub use config::RestateConfig;
pub use debounce::Debouncer;
pub use persist::SnapshotStore;
pub use reducer::Reducer;
pub use rehydrator::{restate, Phase, Rehydrator, Restate};

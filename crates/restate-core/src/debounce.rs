//! Debounced background saving.
//!
//! A single worker task owns the pending state and one timer. Every
//! schedule replaces the pending state and pushes the timer back by the
//! full delay, so only the latest state is ever written and saves apply
//! in the order they were scheduled.

use crate::persist::SnapshotStore;
use restate_types::{RestateError, Result};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

enum Command<S> {
	Schedule(S),
	Flush(oneshot::Sender<Result<()>>),
}

/// Handle to the save worker of one wrapped reducer.
///
/// [`Debouncer::shutdown`] writes any pending state and waits for the
/// worker to exit. Merely dropping the handle closes the channel and the
/// worker still writes the pending state, but only if the runtime keeps
/// running long enough; a runtime that shuts down first cancels it.
pub struct Debouncer<S> {
	sender: mpsc::UnboundedSender<Command<S>>,
	worker: JoinHandle<Result<()>>,
	delay: Duration,
}

impl<S> Debouncer<S>
where
	S: Serialize + Send + 'static,
{
	/// Spawns the worker on the current Tokio runtime.
	pub fn spawn(store: SnapshotStore, delay: Duration) -> Result<Self> {
		let handle = tokio::runtime::Handle::try_current()
			.map_err(|e| RestateError::NoRuntime(e.to_string()))?;

		let (sender, receiver) = mpsc::unbounded_channel();
		let worker = handle.spawn(run(receiver, store, delay));

		Ok(Self {
			sender,
			worker,
			delay,
		})
	}

	/// Quiet period a scheduled save waits for.
	pub fn delay(&self) -> Duration {
		self.delay
	}

	/// Queues `state` to be saved once `delay` passes without another call.
	pub fn schedule(&self, state: S) {
		if self.sender.send(Command::Schedule(state)).is_err() {
			warn!("Save worker has shut down, dropping scheduled save");
		}
	}

	/// Saves the pending state now, if any, and returns the outcome.
	pub async fn flush(&self) -> Result<()> {
		let (reply, outcome) = oneshot::channel();
		self.sender
			.send(Command::Flush(reply))
			.map_err(|_| RestateError::WorkerClosed)?;
		outcome.await.map_err(|_| RestateError::WorkerClosed)?
	}

	/// Closes the channel, writes any pending state and waits for the
	/// worker to exit. Returns the outcome of that final save.
	pub async fn shutdown(self) -> Result<()> {
		let Debouncer { sender, worker, .. } = self;
		drop(sender);
		worker.await.map_err(|_| RestateError::WorkerClosed)?
	}
}

async fn persist(store: &SnapshotStore, encoded: Result<Option<String>>) -> Result<()> {
	match encoded? {
		Some(content) => {
			info!("Saving state to storage");
			store.write(content).await
		}
		None => {
			debug!("No storage configured, skipping save");
			Ok(())
		}
	}
}

async fn run<S: Serialize>(
	mut receiver: mpsc::UnboundedReceiver<Command<S>>,
	store: SnapshotStore,
	delay: Duration,
) -> Result<()> {
	while let Some(command) = receiver.recv().await {
		let mut pending = match command {
			Command::Schedule(state) => state,
			Command::Flush(reply) => {
				let _ = reply.send(Ok(()));
				continue;
			}
		};

		let timer = sleep(delay);
		tokio::pin!(timer);

		loop {
			tokio::select! {
				_ = &mut timer => {
					let encoded = store.encode(&pending);
					if let Err(e) = persist(&store, encoded).await {
						error!("Failed to save state: {}", e);
					}
					break;
				}
				command = receiver.recv() => match command {
					Some(Command::Schedule(state)) => {
						pending = state;
						timer.as_mut().reset(Instant::now() + delay);
					}
					Some(Command::Flush(reply)) => {
						let encoded = store.encode(&pending);
						let _ = reply.send(persist(&store, encoded).await);
						break;
					}
					None => {
						let encoded = store.encode(&pending);
						let outcome = persist(&store, encoded).await;
						if let Err(e) = &outcome {
							error!("Failed to save state on shutdown: {}", e);
						}
						return outcome;
					}
				},
			}
		}
	}

	debug!("Save worker stopped");
	Ok(())
}

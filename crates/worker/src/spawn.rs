use std::future::Future;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::TaskClass;

/// Spawns `fut` on the caller's runtime inside a `task` span carrying `class`.
///
/// Events logged by the task are attributed to its class. Under a paused test clock the
/// task shares the caller's timeline.
///
/// # Panics
///
/// Panics when called outside a tokio runtime. Completion watchers are only spawned from
/// within a synchronization pass, which always runs on one.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	let span = tracing::debug_span!("task", class = class.as_str());
	tracing::trace!(parent: &span, "spawned");
	tokio::spawn(fut.instrument(span))
}

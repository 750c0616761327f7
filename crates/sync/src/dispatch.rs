//! Registration dispatch strategies.
//!
//! Whether a registration blocks or is tracked is decided once, when the synchronizer is
//! built, from the configured [`DispatchPreference`] and the transport's capabilities.
//! Reconciliation code only ever sees a `dyn RegistrationDispatch`.

use std::sync::Arc;

use async_trait::async_trait;
use carmenu_protocol::EntryPayload;
use carmenu_worker::TaskClass;
use tracing::{debug, error, warn};

use crate::Result;
use crate::config::DispatchPreference;
use crate::entry::EntryIdentity;
use crate::handle::MenuHandle;
use crate::pending::PendingTracker;
use crate::transport::{Completion, MenuTransport};

/// Dispatch discipline in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
	/// Each registration returns once the remote side processed it.
	Blocking,
	/// Registrations are fired and tracked until their completion arrives.
	Tracked,
}

/// Issues one registration.
#[async_trait]
pub trait RegistrationDispatch: Send + Sync {
	/// Discipline implemented by this strategy.
	fn mode(&self) -> DispatchMode;

	/// Registers `identity` with `payload` in the container behind `handle`.
	async fn register(&self, transport: &dyn MenuTransport, handle: MenuHandle, identity: &EntryIdentity, payload: EntryPayload) -> Result<()>;
}

/// Blocks on every registration. Nothing is left pending afterwards.
#[derive(Debug, Default)]
pub struct BlockingDispatch;

#[async_trait]
impl RegistrationDispatch for BlockingDispatch {
	fn mode(&self) -> DispatchMode {
		DispatchMode::Blocking
	}

	async fn register(&self, transport: &dyn MenuTransport, handle: MenuHandle, identity: &EntryIdentity, payload: EntryPayload) -> Result<()> {
		debug!(identity = %identity, handle = %handle, "registering entry (blocking)");
		transport.register_entry(handle.raw(), identity, payload).await
	}
}

/// Fires registrations and settles them in `pending` when the remote acknowledges.
#[derive(Debug)]
pub struct TrackedDispatch {
	pending: Arc<PendingTracker>,
}

impl TrackedDispatch {
	/// Creates a strategy recording into `pending`.
	pub fn new(pending: Arc<PendingTracker>) -> Self {
		Self { pending }
	}

	/// Settles `identity` in the tracker once `completion` resolves.
	fn watch(&self, identity: EntryIdentity, handle: MenuHandle, completion: Completion) {
		let ticket = self.pending.record(identity.clone(), handle);
		let pending = self.pending.clone();
		carmenu_worker::spawn(TaskClass::Completion, async move {
			match completion.await {
				Ok(Ok(())) => {}
				Ok(Err(e)) => {
					error!(identity = %identity, handle = %handle, error = %e, "entry registration failed remotely");
				}
				Err(_) => {
					warn!(identity = %identity, handle = %handle, "registration completion dropped");
				}
			}
			pending.settle_ticket(&identity, ticket);
		});
	}
}

#[async_trait]
impl RegistrationDispatch for TrackedDispatch {
	fn mode(&self) -> DispatchMode {
		DispatchMode::Tracked
	}

	async fn register(&self, transport: &dyn MenuTransport, handle: MenuHandle, identity: &EntryIdentity, payload: EntryPayload) -> Result<()> {
		debug!(identity = %identity, handle = %handle, "registering entry (tracked)");
		let completion = transport.begin_register_entry(handle.raw(), identity, payload).await?;
		self.watch(identity.clone(), handle, completion);
		Ok(())
	}
}

/// Picks the dispatch strategy for `transport`.
pub fn select(preference: DispatchPreference, transport: &dyn MenuTransport, pending: Arc<PendingTracker>) -> Box<dyn RegistrationDispatch> {
	let tracked = match preference {
		DispatchPreference::Blocking => false,
		DispatchPreference::Auto => transport.supports_async(),
		DispatchPreference::Tracked => {
			if !transport.supports_async() {
				warn!("tracked dispatch requested but transport is blocking-only; falling back to blocking");
			}
			transport.supports_async()
		}
	};
	if tracked {
		Box::new(TrackedDispatch::new(pending))
	} else {
		Box::new(BlockingDispatch)
	}
}

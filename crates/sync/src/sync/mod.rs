//! Reconciliation of the remote menu against a desired entry list.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::SyncConfig;
use crate::dispatch::{self, DispatchMode, RegistrationDispatch};
use crate::entry::{EntryDescriptor, EntryIdentity, IconCompressor};
use crate::event::{MenuEvent, MenuEventHandler};
use crate::handle::{HandleLifecycle, HandleState, MenuHandle};
use crate::pending::{FlushOutcome, PendingTracker};
use crate::transport::MenuTransport;

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
	/// Whether the container was destroyed and recreated.
	pub rebuilt: bool,
	/// Registrations issued during the pass.
	pub registered: usize,
	/// Result of the closing flush.
	pub flush: FlushOutcome,
}

/// Keeps the head-unit menu consistent with a desired entry list.
///
/// Passes ([`Self::set_desired_entries`], [`Self::redraw`], [`Self::shutdown`]) are
/// serialized by one async lock that also owns the container lifecycle. Completions use
/// the [`PendingTracker`]'s own lock and are never blocked by a pass.
pub struct Synchronizer {
	transport: Arc<dyn MenuTransport>,
	icons: Arc<dyn IconCompressor>,
	config: SyncConfig,
	dispatch: Box<dyn RegistrationDispatch>,
	pending: Arc<PendingTracker>,
	/// Pass lock.
	lifecycle: Mutex<HandleLifecycle>,
	/// What the remote menu shows, as last registered. Written only under the pass lock.
	known: RwLock<HashMap<EntryIdentity, EntryDescriptor>>,
	/// Mirror of the active handle for event resolution outside a pass.
	active: RwLock<Option<MenuHandle>>,
}

impl std::fmt::Debug for Synchronizer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Synchronizer")
			.field("dispatch", &self.dispatch.mode())
			.field("active", &*self.active.read())
			.field("known", &self.known.read().len())
			.field("pending", &self.pending.count())
			.finish_non_exhaustive()
	}
}

impl Synchronizer {
	/// Creates a synchronizer over `transport`.
	///
	/// The dispatch strategy is fixed here from `config.dispatch` and the transport's
	/// capabilities. No remote call is made until the first pass.
	///
	/// # Errors
	///
	/// Returns [`crate::Error::Config`] if `config` fails [`SyncConfig::validate`].
	pub fn new(transport: Arc<dyn MenuTransport>, icons: Arc<dyn IconCompressor>, config: SyncConfig) -> Result<Self> {
		config.validate()?;
		let pending = Arc::new(PendingTracker::new());
		let dispatch = dispatch::select(config.dispatch, transport.as_ref(), pending.clone());
		info!(mode = ?dispatch.mode(), listener = %config.listener_id, "menu synchronizer ready");
		Ok(Self {
			lifecycle: Mutex::new(HandleLifecycle::new(config.listener_id.clone())),
			transport,
			icons,
			config,
			dispatch,
			pending,
			known: RwLock::new(HashMap::new()),
			active: RwLock::new(None),
		})
	}

	/// Dispatch discipline chosen at construction.
	pub fn dispatch_mode(&self) -> DispatchMode {
		self.dispatch.mode()
	}

	/// Configuration in use.
	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	/// The active container, if one exists.
	pub fn active_handle(&self) -> Option<MenuHandle> {
		*self.active.read()
	}

	/// Number of entries the remote menu is known to show.
	pub fn known_len(&self) -> usize {
		self.known.read().len()
	}

	/// Number of registrations still awaiting acknowledgment.
	pub fn pending_count(&self) -> usize {
		self.pending.count()
	}

	/// Makes the remote menu show exactly `entries`.
	///
	/// Entries already shown with the same name and category are left alone. If any shown
	/// entry was removed, renamed, or recategorized, the container is rebuilt and every
	/// entry is registered again. Registrations are optimistic: an entry counts as shown
	/// once its registration was issued. Ends with [`Self::flush`].
	///
	/// When an identity appears more than once, the first occurrence wins.
	///
	/// # Errors
	///
	/// Any transport failure aborts the pass and is returned as is; nothing is retried.
	/// Entries registered before the failure stay known. A rebuild that fails before the
	/// old container is gone keeps the known entries, so the next pass rebuilds again.
	pub async fn set_desired_entries(&self, entries: &[EntryDescriptor]) -> Result<PassReport> {
		let mut lifecycle = self.lifecycle.lock().await;

		let desired = dedupe(entries);
		let stale = self.count_stale(&desired);

		let before = lifecycle.active();
		let rebuilt = stale > 0 || matches!(lifecycle.state(), HandleState::Detached(_));
		let result = if rebuilt {
			info!(stale, "rebuilding menu container");
			lifecycle.reinit(self.transport.as_ref()).await
		} else {
			lifecycle.ensure_active(self.transport.as_ref()).await
		};
		self.publish_active(&lifecycle, before);
		let handle = result?;

		let mut registered = 0;
		for entry in desired {
			if self.known.read().contains_key(entry.identity()) {
				continue;
			}
			self.register(handle, entry).await?;
			self.known.write().insert(entry.identity().clone(), entry.clone());
			registered += 1;
		}

		let flush = self.flush().await;
		drop(lifecycle);

		info!(
			handle = %handle,
			rebuilt,
			registered,
			known = self.known_len(),
			pending = flush.pending,
			"menu pass complete"
		);
		Ok(PassReport { rebuilt, registered, flush })
	}

	/// Registers an already shown entry again, e.g. after its icon changed.
	///
	/// Returns `None` without touching the remote side when `entry` is not currently
	/// known. Membership and the container are never changed by a redraw.
	pub async fn redraw(&self, entry: &EntryDescriptor) -> Result<Option<FlushOutcome>> {
		let lifecycle = self.lifecycle.lock().await;

		if !self.known.read().contains_key(entry.identity()) {
			debug!(identity = %entry.identity(), "redraw skipped: entry not shown");
			return Ok(None);
		}
		let Some(handle) = lifecycle.active() else {
			debug!(identity = %entry.identity(), "redraw skipped: no active container");
			return Ok(None);
		};

		self.register(handle, entry).await?;
		self.known.write().insert(entry.identity().clone(), entry.clone());

		let flush = self.flush().await;
		drop(lifecycle);
		Ok(Some(flush))
	}

	/// Returns the descriptor the remote menu shows for `identity`.
	pub fn lookup(&self, identity: &EntryIdentity) -> Option<EntryDescriptor> {
		self.known.read().get(identity).cloned()
	}

	/// Waits, up to the configured ceiling, for outstanding registrations to settle.
	pub async fn flush(&self) -> FlushOutcome {
		let pending = self.pending.count();
		if pending > 0 {
			debug!(pending, "waiting for pending registrations");
		}
		let outcome = self.pending.wait_until_empty(self.config.flush_ceiling(), self.config.flush_poll()).await;
		if !outcome.settled {
			warn!(pending = outcome.pending, waited = ?outcome.waited, "flush ceiling reached with registrations outstanding");
		}
		outcome
	}

	/// Resolves an inbound event to the descriptor it concerns.
	///
	/// Events raised on a container other than the active one are stale and ignored.
	pub fn resolve_event(&self, event: &MenuEvent) -> Option<EntryDescriptor> {
		let active = self.active_handle();
		if active.map(|h| h.raw()) != Some(event.handle) {
			debug!(identity = %event.identity, event_handle = %event.handle, "ignoring event for inactive container");
			return None;
		}
		self.lookup(&event.identity)
	}

	/// Resolves `event` and hands it to `handler`. Returns whether it was delivered.
	pub fn dispatch_event(&self, event: &MenuEvent, handler: &dyn MenuEventHandler) -> bool {
		match self.resolve_event(event) {
			Some(entry) => {
				handler.on_entry_selected(&entry);
				true
			}
			None => false,
		}
	}

	/// Disposes the container and forgets every shown entry.
	pub async fn shutdown(&self) -> Result<()> {
		let mut lifecycle = self.lifecycle.lock().await;
		let before = lifecycle.active();
		let result = lifecycle.teardown(self.transport.as_ref()).await;
		self.publish_active(&lifecycle, before);
		result?;
		info!(pending = self.pending.count(), "menu synchronizer shut down");
		Ok(())
	}

	async fn register(&self, handle: MenuHandle, entry: &EntryDescriptor) -> Result<()> {
		let payload = entry.payload(self.icons.as_ref(), self.config.icon_size);
		self.dispatch
			.register(self.transport.as_ref(), handle, entry.identity(), payload)
			.await
	}

	/// Known entries that `desired` drops or shows in a different slot.
	fn count_stale(&self, desired: &[&EntryDescriptor]) -> usize {
		let by_identity: HashMap<&EntryIdentity, &EntryDescriptor> = desired.iter().map(|entry| (entry.identity(), *entry)).collect();
		self.known
			.read()
			.values()
			.filter(|previous| !by_identity.get(previous.identity()).is_some_and(|next| previous.same_slot(next)))
			.count()
	}

	/// Mirrors the lifecycle's active handle. Known state describes the container that was
	/// active as `before`, so it is dropped as soon as that container stops being active.
	fn publish_active(&self, lifecycle: &HandleLifecycle, before: Option<MenuHandle>) {
		let after = lifecycle.active();
		if after != before {
			let mut known = self.known.write();
			if !known.is_empty() {
				debug!(forgotten = known.len(), "active container changed; forgetting shown entries");
				known.clear();
			}
		}
		*self.active.write() = after;
	}
}

fn dedupe(entries: &[EntryDescriptor]) -> Vec<&EntryDescriptor> {
	let mut seen = HashSet::new();
	entries
		.iter()
		.filter(|entry| {
			let first = seen.insert(entry.identity());
			if !first {
				warn!(identity = %entry.identity(), "duplicate identity in desired entries; keeping the first");
			}
			first
		})
		.collect()
}

#[cfg(test)]
mod tests;

//! Remote menu container lifecycle.
//!
//! `Uninitialized -> Active -> (Destroyed -> Active)*`
//!
//! A replacement that fails halfway parks the container in `Detached`: the listener is
//! gone but the container and its entries are still shown. The next
//! [`HandleLifecycle::ensure_active`] disposes it before creating a fresh one.
//!
//! The container is the only thing the remote side can clear in one go, so replacing it
//! is how stale entries get removed. A handle is never destroyed without being replaced,
//! except by [`HandleLifecycle::teardown`] when the owner shuts down.

use std::fmt;

use carmenu_protocol::{CONTAINER_CAPABILITIES, CONTAINER_VERSION_TAG, RawHandle};
use carmenu_worker::GenerationClock;
use tracing::{debug, info, warn};

use crate::Result;
use crate::transport::MenuTransport;

/// Active container token.
///
/// `generation` increases with every create, so two handles from different lifetimes never
/// compare equal even when the remote side hands out the same raw token again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuHandle {
	raw: RawHandle,
	generation: u64,
}

impl MenuHandle {
	pub(crate) const fn new(raw: RawHandle, generation: u64) -> Self {
		Self { raw, generation }
	}

	/// Remote token.
	pub fn raw(&self) -> RawHandle {
		self.raw
	}

	/// Local lifetime counter, starting at 1.
	pub fn generation(&self) -> u64 {
		self.generation
	}
}

impl fmt::Display for MenuHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/g{}", self.raw, self.generation)
	}
}

/// Lifecycle state of the remote container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
	/// No container was created yet.
	Uninitialized,
	/// A container exists and receives registrations.
	Active(MenuHandle),
	/// The container exists but has no listener attached, after a failed detach-and-dispose
	/// or a failed attach right after creation.
	Detached(MenuHandle),
	/// The last container was destroyed and no replacement exists yet.
	Destroyed {
		/// The container that was destroyed.
		last: MenuHandle,
	},
}

/// Owns creation and replacement of the remote container.
#[derive(Debug)]
pub struct HandleLifecycle {
	state: HandleState,
	listener_id: String,
	generations: GenerationClock,
}

impl HandleLifecycle {
	/// Creates a lifecycle that will register `listener_id` on each container.
	pub fn new(listener_id: impl Into<String>) -> Self {
		Self {
			state: HandleState::Uninitialized,
			listener_id: listener_id.into(),
			generations: GenerationClock::new(),
		}
	}

	/// Current state.
	pub fn state(&self) -> HandleState {
		self.state
	}

	/// The active handle, if any.
	pub fn active(&self) -> Option<MenuHandle> {
		match self.state {
			HandleState::Active(handle) => Some(handle),
			_ => None,
		}
	}

	/// Returns the active handle, creating a container first if there is none.
	///
	/// A [`HandleState::Detached`] container is disposed first, so the returned handle
	/// may belong to a new, empty container.
	pub async fn ensure_active(&mut self, transport: &dyn MenuTransport) -> Result<MenuHandle> {
		match self.state {
			HandleState::Active(handle) => Ok(handle),
			_ => self.reinit(transport).await,
		}
	}

	/// Replaces the current container with a fresh one.
	///
	/// Detaches the listener from and disposes the current container, then creates a new
	/// one. A failed detach leaves the old container [`HandleState::Active`]. A failed
	/// disposal after the detach leaves it [`HandleState::Detached`]. If disposal succeeds
	/// but creation fails the state stays [`HandleState::Destroyed`]. In every case the
	/// next [`Self::ensure_active`] picks up from there.
	pub async fn reinit(&mut self, transport: &dyn MenuTransport) -> Result<MenuHandle> {
		self.teardown(transport).await?;
		self.create(transport).await
	}

	/// Disposes the current container without replacing it.
	pub async fn teardown(&mut self, transport: &dyn MenuTransport) -> Result<()> {
		match self.state {
			HandleState::Active(old) => {
				transport.remove_event_handler(old.raw, &self.listener_id).await?;
				self.state = HandleState::Detached(old);
				self.destroy(transport, old).await
			}
			HandleState::Detached(old) => self.destroy(transport, old).await,
			HandleState::Uninitialized | HandleState::Destroyed { .. } => Ok(()),
		}
	}

	async fn destroy(&mut self, transport: &dyn MenuTransport, old: MenuHandle) -> Result<()> {
		if let Err(e) = transport.destroy_container(old.raw).await {
			warn!(handle = %old, error = %e, "menu container detached but not destroyed");
			return Err(e);
		}
		self.state = HandleState::Destroyed { last: old };
		debug!(handle = %old, "menu container destroyed");
		Ok(())
	}

	async fn create(&mut self, transport: &dyn MenuTransport) -> Result<MenuHandle> {
		let raw = transport.create_container(CONTAINER_VERSION_TAG, &CONTAINER_CAPABILITIES).await?;
		let handle = MenuHandle::new(raw, self.generations.next());
		if let Err(e) = transport.add_event_handler(raw, &self.listener_id).await {
			// Nothing is routed to us from this container; dispose it on the next attempt.
			self.state = HandleState::Detached(handle);
			return Err(e);
		}
		self.state = HandleState::Active(handle);
		info!(handle = %handle, listener = %self.listener_id, "menu container active");
		Ok(handle)
	}
}

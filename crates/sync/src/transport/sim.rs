//! In-process head unit.
//!
//! Keeps containers and their entries in memory and records every call made against it.
//! Used by the `carmenu` binary for dry runs and by the test suite as the remote side.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use carmenu_protocol::{EntryPayload, RawHandle};
use carmenu_worker::TaskClass;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{Completion, MenuTransport};
use crate::entry::EntryIdentity;
use crate::{Error, Result};

/// Call surface the simulated head unit exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimMode {
	/// Blocking calls only, like a remote without an async proxy.
	BlockingOnly,
	/// Async registrations, acknowledged from a background task right away.
	AsyncAutoComplete,
	/// Async registrations whose acknowledgments are held until released by the caller.
	AsyncHeld,
}

/// Remote operation kinds, used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
	/// `create_container`.
	Create,
	/// `destroy_container`.
	Destroy,
	/// `add_event_handler`.
	AddHandler,
	/// `remove_event_handler`.
	RemoveHandler,
	/// `register_entry` and `begin_register_entry`.
	Register,
}

/// One recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
	/// A container was created.
	Create {
		/// Token handed out.
		handle: RawHandle,
	},
	/// A container was destroyed.
	Destroy {
		/// Token destroyed.
		handle: RawHandle,
	},
	/// An event handler was attached.
	AddHandler {
		/// Target container.
		handle: RawHandle,
		/// Listener id.
		listener: String,
	},
	/// An event handler was detached.
	RemoveHandler {
		/// Target container.
		handle: RawHandle,
		/// Listener id.
		listener: String,
	},
	/// An entry was registered.
	Register {
		/// Target container.
		handle: RawHandle,
		/// Entry key.
		identity: EntryIdentity,
		/// Payload as received.
		payload: EntryPayload,
		/// `true` for the blocking surface, `false` for `begin_register_entry`.
		blocking: bool,
	},
}

#[derive(Default)]
struct Container {
	listeners: Vec<String>,
	entries: BTreeMap<EntryIdentity, EntryPayload>,
}

struct HeldCompletion {
	identity: EntryIdentity,
	tx: oneshot::Sender<Result<()>>,
}

#[derive(Default)]
struct SimState {
	next_handle: i32,
	containers: HashMap<RawHandle, Container>,
	calls: Vec<RemoteCall>,
	held: Vec<HeldCompletion>,
	fail_next: HashSet<SimOp>,
}

impl SimState {
	fn check_failure(&mut self, op: SimOp, name: &'static str) -> Result<()> {
		if self.fail_next.remove(&op) {
			return Err(Error::transport(name, "injected failure"));
		}
		Ok(())
	}

	fn container_mut(&mut self, handle: RawHandle, op: &'static str) -> Result<&mut Container> {
		self.containers
			.get_mut(&handle)
			.ok_or_else(|| Error::transport(op, format!("unknown container {handle}")))
	}

	fn register(&mut self, handle: RawHandle, identity: &EntryIdentity, payload: EntryPayload, blocking: bool, op: &'static str) -> Result<()> {
		self.check_failure(SimOp::Register, op)?;
		self.container_mut(handle, op)?.entries.insert(identity.clone(), payload.clone());
		self.calls.push(RemoteCall::Register {
			handle,
			identity: identity.clone(),
			payload,
			blocking,
		});
		Ok(())
	}
}

/// In-memory head unit implementing [`MenuTransport`].
pub struct SimulatedHeadUnit {
	mode: SimMode,
	state: Mutex<SimState>,
}

impl SimulatedHeadUnit {
	/// Creates an empty head unit.
	pub fn new(mode: SimMode) -> Arc<Self> {
		Arc::new(Self {
			mode,
			state: Mutex::new(SimState {
				next_handle: 1,
				..SimState::default()
			}),
		})
	}

	/// Call surface of this head unit.
	pub fn mode(&self) -> SimMode {
		self.mode
	}

	/// Makes the next call of kind `op` fail.
	pub fn fail_next(&self, op: SimOp) {
		self.state.lock().fail_next.insert(op);
	}

	/// Every call recorded so far, oldest first.
	pub fn calls(&self) -> Vec<RemoteCall> {
		self.state.lock().calls.clone()
	}

	/// Forgets recorded calls. Containers and held acknowledgments are kept.
	pub fn clear_calls(&self) {
		self.state.lock().calls.clear();
	}

	/// Number of containers created so far.
	pub fn create_count(&self) -> usize {
		self.count(|call| matches!(call, RemoteCall::Create { .. }))
	}

	/// Number of containers destroyed so far.
	pub fn destroy_count(&self) -> usize {
		self.count(|call| matches!(call, RemoteCall::Destroy { .. }))
	}

	/// Registered identities in call order.
	pub fn registered(&self) -> Vec<EntryIdentity> {
		self.state
			.lock()
			.calls
			.iter()
			.filter_map(|call| match call {
				RemoteCall::Register { identity, .. } => Some(identity.clone()),
				_ => None,
			})
			.collect()
	}

	fn count(&self, pred: impl Fn(&RemoteCall) -> bool) -> usize {
		self.state.lock().calls.iter().filter(|call| pred(*call)).count()
	}

	/// Tokens of containers that currently exist.
	pub fn live_containers(&self) -> Vec<RawHandle> {
		let mut handles: Vec<_> = self.state.lock().containers.keys().copied().collect();
		handles.sort();
		handles
	}

	/// Entries displayed in one container, sorted by identity.
	pub fn entries(&self, handle: RawHandle) -> Vec<(EntryIdentity, EntryPayload)> {
		self.state
			.lock()
			.containers
			.get(&handle)
			.map(|c| c.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
			.unwrap_or_default()
	}

	/// Listener ids attached to one container.
	pub fn listeners(&self, handle: RawHandle) -> Vec<String> {
		self.state.lock().containers.get(&handle).map(|c| c.listeners.clone()).unwrap_or_default()
	}

	/// Number of acknowledgments held back in [`SimMode::AsyncHeld`].
	pub fn held_count(&self) -> usize {
		self.state.lock().held.len()
	}

	/// Acknowledges every held registration successfully. Returns how many were released.
	pub fn release_all(&self) -> usize {
		let held = std::mem::take(&mut self.state.lock().held);
		let released = held.len();
		for completion in held {
			let _ = completion.tx.send(Ok(()));
		}
		released
	}

	/// Acknowledges the held registrations for `identity`, with `outcome`.
	pub fn release(&self, identity: &EntryIdentity, outcome: Result<()>) -> bool {
		let completion = {
			let mut state = self.state.lock();
			let Some(index) = state.held.iter().position(|c| &c.identity == identity) else {
				return false;
			};
			state.held.remove(index)
		};
		let _ = completion.tx.send(outcome);
		true
	}

	/// Drops every held acknowledgment without sending it.
	pub fn drop_held(&self) -> usize {
		let held = std::mem::take(&mut self.state.lock().held);
		held.len()
	}
}

#[async_trait]
impl MenuTransport for SimulatedHeadUnit {
	async fn create_container(&self, _version_tag: &str, _capabilities: &[u8]) -> Result<RawHandle> {
		let mut state = self.state.lock();
		state.check_failure(SimOp::Create, "create_container")?;
		let handle = RawHandle(state.next_handle);
		state.next_handle += 1;
		state.containers.insert(handle, Container::default());
		state.calls.push(RemoteCall::Create { handle });
		Ok(handle)
	}

	async fn destroy_container(&self, handle: RawHandle) -> Result<()> {
		let mut state = self.state.lock();
		state.check_failure(SimOp::Destroy, "destroy_container")?;
		state
			.containers
			.remove(&handle)
			.ok_or_else(|| Error::transport("destroy_container", format!("unknown container {handle}")))?;
		state.calls.push(RemoteCall::Destroy { handle });
		Ok(())
	}

	async fn add_event_handler(&self, handle: RawHandle, listener_id: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.check_failure(SimOp::AddHandler, "add_event_handler")?;
		state.container_mut(handle, "add_event_handler")?.listeners.push(listener_id.to_string());
		state.calls.push(RemoteCall::AddHandler {
			handle,
			listener: listener_id.to_string(),
		});
		Ok(())
	}

	async fn remove_event_handler(&self, handle: RawHandle, listener_id: &str) -> Result<()> {
		let mut state = self.state.lock();
		state.check_failure(SimOp::RemoveHandler, "remove_event_handler")?;
		state.container_mut(handle, "remove_event_handler")?.listeners.retain(|l| l != listener_id);
		state.calls.push(RemoteCall::RemoveHandler {
			handle,
			listener: listener_id.to_string(),
		});
		Ok(())
	}

	async fn register_entry(&self, handle: RawHandle, identity: &EntryIdentity, payload: EntryPayload) -> Result<()> {
		self.state.lock().register(handle, identity, payload, true, "register_entry")
	}

	fn supports_async(&self) -> bool {
		self.mode != SimMode::BlockingOnly
	}

	async fn begin_register_entry(&self, handle: RawHandle, identity: &EntryIdentity, payload: EntryPayload) -> Result<Completion> {
		if self.mode == SimMode::BlockingOnly {
			return Err(Error::Unsupported("begin_register_entry"));
		}

		let (tx, rx) = oneshot::channel();
		{
			let mut state = self.state.lock();
			state.register(handle, identity, payload, false, "begin_register_entry")?;
			if self.mode == SimMode::AsyncHeld {
				state.held.push(HeldCompletion {
					identity: identity.clone(),
					tx,
				});
				return Ok(rx);
			}
		}

		carmenu_worker::spawn(TaskClass::Background, async move {
			let _ = tx.send(Ok(()));
		});
		Ok(rx)
	}
}

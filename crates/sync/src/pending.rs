//! Tracking of in-flight asynchronous registrations.
//!
//! Completions arrive on transport tasks, not on the thread running the reconciliation
//! pass, so the whole map sits behind one mutex of its own. That lock is never held
//! across an await and is independent of the pass lock, which keeps completion delivery
//! from waiting on a pass.

use std::collections::HashMap;
use std::time::Duration;

use carmenu_worker::GenerationClock;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::entry::EntryIdentity;
use crate::handle::MenuHandle;

/// Identifies one recorded registration.
///
/// A newer registration for the same identity supersedes the older one; settling with the
/// older ticket is then a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingTicket(u64);

#[derive(Debug)]
struct PendingOp {
	ticket: PendingTicket,
	handle: MenuHandle,
	issued_at: Instant,
}

/// Result of a bounded wait for outstanding registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutcome {
	/// Whether every registration settled before the ceiling.
	pub settled: bool,
	/// Registrations still outstanding when the wait returned.
	pub pending: usize,
	/// Time spent waiting.
	pub waited: Duration,
}

/// Map of in-flight registrations keyed by entry identity.
#[derive(Debug, Default)]
pub struct PendingTracker {
	ops: Mutex<HashMap<EntryIdentity, PendingOp>>,
	tickets: GenerationClock,
}

impl PendingTracker {
	/// Creates an empty tracker.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records an in-flight registration of `identity` against `handle`.
	///
	/// Replaces any older record for the same identity, so at most one operation per
	/// identity is ever tracked.
	pub fn record(&self, identity: EntryIdentity, handle: MenuHandle) -> PendingTicket {
		let ticket = PendingTicket(self.tickets.next());
		let op = PendingOp {
			ticket,
			handle,
			issued_at: Instant::now(),
		};
		if let Some(previous) = self.ops.lock().insert(identity.clone(), op) {
			debug!(
				identity = %identity,
				superseded = previous.ticket.0,
				ticket = ticket.0,
				"pending registration superseded"
			);
		}
		ticket
	}

	/// Removes the record for `identity`, whichever ticket it carries.
	///
	/// Returns `false` if nothing was pending; late or duplicate notifications are
	/// harmless.
	pub fn settle(&self, identity: &EntryIdentity) -> bool {
		let removed = self.ops.lock().remove(identity);
		if let Some(op) = &removed {
			debug!(identity = %identity, handle = %op.handle, elapsed = ?op.issued_at.elapsed(), "pending registration settled");
		}
		removed.is_some()
	}

	/// Removes the record for `identity` only if it is still the one issued as `ticket`.
	pub fn settle_ticket(&self, identity: &EntryIdentity, ticket: PendingTicket) -> bool {
		let mut ops = self.ops.lock();
		match ops.get(identity) {
			Some(op) if op.ticket == ticket => {
				let op = ops.remove(identity);
				drop(ops);
				if let Some(op) = op {
					debug!(identity = %identity, handle = %op.handle, elapsed = ?op.issued_at.elapsed(), "pending registration settled");
				}
				true
			}
			Some(_) => {
				debug!(identity = %identity, ticket = ticket.0, "ignoring completion for superseded registration");
				false
			}
			None => false,
		}
	}

	/// Number of outstanding registrations.
	pub fn count(&self) -> usize {
		self.ops.lock().len()
	}

	/// Whether `identity` has an outstanding registration.
	pub fn is_pending(&self, identity: &EntryIdentity) -> bool {
		self.ops.lock().contains_key(identity)
	}

	/// Waits until nothing is outstanding or `ceiling` has elapsed, checking every `poll`.
	///
	/// Best effort: returning with work still outstanding is not an error, and the
	/// records stay until their completions arrive.
	pub async fn wait_until_empty(&self, ceiling: Duration, poll: Duration) -> FlushOutcome {
		let start = Instant::now();
		let deadline = start + ceiling;
		loop {
			let pending = self.count();
			let now = Instant::now();
			if pending == 0 || now >= deadline {
				return FlushOutcome {
					settled: pending == 0,
					pending,
					waited: now - start,
				};
			}
			tokio::time::sleep(poll.min(deadline - now)).await;
		}
	}
}

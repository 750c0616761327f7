//! Remote menu service boundary.
//!
//! The head unit's menu service is consumed through [`MenuTransport`]. Every transport
//! offers blocking calls; transports that can also fire a registration and report its
//! delivery later advertise it through [`MenuTransport::supports_async`] and implement
//! [`MenuTransport::begin_register_entry`].

pub mod sim;

use async_trait::async_trait;
use carmenu_protocol::{EntryPayload, RawHandle};
use tokio::sync::oneshot;

use crate::entry::EntryIdentity;
use crate::{Error, Result};

/// Delivery signal for a non-blocking registration.
///
/// Resolves once the remote side has acknowledged the call, with success or failure. A
/// dropped sender also counts as settled.
pub type Completion = oneshot::Receiver<Result<()>>;

/// Remote menu service.
#[async_trait]
pub trait MenuTransport: Send + Sync {
	/// Creates a new menu container.
	async fn create_container(&self, version_tag: &str, capabilities: &[u8]) -> Result<RawHandle>;

	/// Disposes a menu container and every entry in it.
	async fn destroy_container(&self, handle: RawHandle) -> Result<()>;

	/// Routes container events to `listener_id`.
	async fn add_event_handler(&self, handle: RawHandle, listener_id: &str) -> Result<()>;

	/// Stops routing container events to `listener_id`.
	async fn remove_event_handler(&self, handle: RawHandle, listener_id: &str) -> Result<()>;

	/// Registers an entry and returns once the remote side has processed it.
	async fn register_entry(&self, handle: RawHandle, identity: &EntryIdentity, payload: EntryPayload) -> Result<()>;

	/// Whether [`Self::begin_register_entry`] is available.
	fn supports_async(&self) -> bool {
		false
	}

	/// Issues a registration without waiting for it.
	///
	/// Only called when [`Self::supports_async`] returns `true`.
	async fn begin_register_entry(&self, handle: RawHandle, identity: &EntryIdentity, payload: EntryPayload) -> Result<Completion> {
		let _ = (handle, identity, payload);
		Err(Error::Unsupported("begin_register_entry"))
	}
}

//! Inbound menu events.

use carmenu_protocol::RawHandle;

use crate::entry::{EntryDescriptor, EntryIdentity};

/// An event the head unit raised for one entry, e.g. the user selecting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEvent {
	/// Container the event was raised on.
	pub handle: RawHandle,
	/// Entry the event concerns.
	pub identity: EntryIdentity,
}

/// Receives events resolved back to their descriptors.
pub trait MenuEventHandler: Send + Sync {
	/// The user picked `entry` in the head-unit menu.
	fn on_entry_selected(&self, entry: &EntryDescriptor);
}

//! Menu entry descriptors.

use std::fmt;
use std::sync::Arc;

use carmenu_protocol::{AppCategory, EntryPayload};

use crate::priority::{priority, try_priority};
use crate::{Error, Result};

/// Stable key for one application's menu entry.
///
/// Used as the map key for both known state and pending registrations, and sent to the
/// head unit as the entry id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryIdentity(String);

impl EntryIdentity {
	/// Wraps a prebuilt key.
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	/// Derives the key for an application package: `"{namespace}.{package}"`.
	pub fn from_package(namespace: &str, package: &str) -> Self {
		Self(format!("{namespace}.{package}"))
	}

	/// Returns the key as sent over the wire.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EntryIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Opaque image handle for an entry icon.
///
/// Cheap to clone. The bytes are whatever the [`IconCompressor`] in use understands.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Icon(Arc<[u8]>);

impl Icon {
	/// Wraps raw image bytes.
	pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
		Self(bytes.into())
	}

	/// Raw image bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Debug for Icon {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Icon").field("len", &self.0.len()).finish()
	}
}

/// Turns an icon into the compressed bytes the head unit displays.
pub trait IconCompressor: Send + Sync {
	/// Compresses `icon` scaled to `width` x `height`.
	fn compress(&self, icon: &Icon, width: u32, height: u32) -> Vec<u8>;
}

/// Sends icon bytes unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughIcons;

impl IconCompressor for PassthroughIcons {
	fn compress(&self, icon: &Icon, _width: u32, _height: u32) -> Vec<u8> {
		icon.bytes().to_vec()
	}
}

/// Immutable description of one application entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
	identity: EntryIdentity,
	name: String,
	icon: Icon,
	category: AppCategory,
}

impl EntryDescriptor {
	/// Builds a descriptor.
	///
	/// Fails with [`Error::InvalidName`] when `name` has fewer than two letters, since no
	/// sort weight can be derived from it.
	pub fn new(identity: EntryIdentity, name: impl Into<String>, icon: Icon, category: AppCategory) -> Result<Self> {
		let name = name.into();
		if try_priority(&name).is_none() {
			return Err(Error::InvalidName(name));
		}
		Ok(Self {
			identity,
			name,
			icon,
			category,
		})
	}

	/// Entry key.
	pub fn identity(&self) -> &EntryIdentity {
		&self.identity
	}

	/// Display name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Icon handle.
	pub fn icon(&self) -> &Icon {
		&self.icon
	}

	/// Menu section.
	pub fn category(&self) -> AppCategory {
		self.category
	}

	/// Sort weight derived from the display name.
	pub fn weight(&self) -> i32 {
		priority(&self.name)
	}

	/// Returns `true` if `other` would render the same menu slot: same name and category.
	///
	/// Icon changes do not count; those are pushed with a redraw.
	pub fn same_slot(&self, other: &Self) -> bool {
		self.name == other.name && self.category == other.category
	}

	/// Builds the registration payload with a `size` x `size` icon.
	pub fn payload(&self, icons: &dyn IconCompressor, size: u32) -> EntryPayload {
		EntryPayload::build(&self.name, icons.compress(&self.icon, size, size), self.category, self.weight())
	}
}

//! Core wire types shared between the synchronizer and menu transports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version tag sent with every container create call.
pub const CONTAINER_VERSION_TAG: &str = "0";

/// Capability descriptor sent with every container create call.
pub const CONTAINER_CAPABILITIES: [u8; 8] = [0, 0, 0, 0, 0, 2, 0, 0];

/// Basecore protocol version written into payload field 0.
pub const BASECORE_VERSION: i32 = 145;

/// Main-state id meaning "unset", written into payload field 8.
pub const MAIN_STATE_UNSET: i32 = -1;

/// Raw container token returned by the head unit.
///
/// Tokens are only meaningful to the remote side and may be reused by it after a
/// container is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RawHandle(pub i32);

impl fmt::Display for RawHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "am#{}", self.0)
	}
}

/// Menu section an application entry is filed under.
///
/// The serialized names double as the wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppCategory {
	/// Contacts and address book.
	Addressbook,
	/// Media players.
	Multimedia,
	/// Maps and routing.
	Navigation,
	/// Connected services.
	OnlineServices,
	/// Telephony.
	Phone,
	/// Broadcast radio.
	Radio,
	/// Settings panels.
	Settings,
	/// Vehicle status.
	VehicleInformation,
}

impl AppCategory {
	/// Every category, in wire declaration order.
	pub const ALL: [Self; 8] = [
		Self::Addressbook,
		Self::Multimedia,
		Self::Navigation,
		Self::OnlineServices,
		Self::Phone,
		Self::Radio,
		Self::Settings,
		Self::VehicleInformation,
	];

	/// Wire label written into payload field 3.
	pub const fn as_wire(self) -> &'static str {
		match self {
			Self::Addressbook => "Addressbook",
			Self::Multimedia => "Multimedia",
			Self::Navigation => "Navigation",
			Self::OnlineServices => "OnlineServices",
			Self::Phone => "Phone",
			Self::Radio => "Radio",
			Self::Settings => "Settings",
			Self::VehicleInformation => "VehicleInformation",
		}
	}
}

impl fmt::Display for AppCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_wire())
	}
}

/// Error returned when parsing an unknown category label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unknown menu category: {}", self.0)
	}
}

impl std::error::Error for UnknownCategory {}

impl FromStr for AppCategory {
	type Err = UnknownCategory;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|category| category.as_wire().eq_ignore_ascii_case(s))
			.ok_or_else(|| UnknownCategory(s.to_string()))
	}
}

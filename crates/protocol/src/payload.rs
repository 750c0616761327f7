//! Registration payload for one menu entry.
//!
//! The head unit reads entries as a map from numeric field index to value. The indices
//! below are a compatibility contract with deployed firmware and must never be
//! renumbered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AppCategory, BASECORE_VERSION, MAIN_STATE_UNSET};

/// Payload field indices.
pub mod field {
	use std::ops::RangeInclusive;

	/// Basecore protocol version.
	pub const VERSION: u16 = 0;
	/// Display name.
	pub const NAME: u16 = 1;
	/// Compressed icon bytes.
	pub const ICON: u16 = 2;
	/// Category wire label.
	pub const CATEGORY: u16 = 3;
	/// Capability flag, always `true`.
	pub const CAPABLE: u16 = 4;
	/// Sort weight, higher renders first.
	pub const WEIGHT: u16 = 5;
	/// Main-state id.
	pub const MAIN_STATE: u16 = 8;
	/// Per-locale display names.
	pub const LOCALE_NAMES: RangeInclusive<u16> = 101..=123;
}

/// One payload value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
	/// Integer field.
	Int(i32),
	/// Boolean field.
	Bool(bool),
	/// String field.
	Str(String),
	/// Opaque byte field.
	Bytes(Vec<u8>),
}

impl PayloadValue {
	/// Returns the string content, if this is a string field.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(s) => Some(s),
			_ => None,
		}
	}

	/// Returns the integer content, if this is an integer field.
	pub fn as_int(&self) -> Option<i32> {
		match self {
			Self::Int(v) => Some(*v),
			_ => None,
		}
	}
}

/// Field-indexed registration payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryPayload {
	fields: BTreeMap<u16, PayloadValue>,
}

impl EntryPayload {
	/// Builds the payload for one entry.
	///
	/// The menu is not localized: every locale slot receives `name` unchanged.
	pub fn build(name: &str, icon: Vec<u8>, category: AppCategory, weight: i32) -> Self {
		let mut fields = BTreeMap::new();
		fields.insert(field::VERSION, PayloadValue::Int(BASECORE_VERSION));
		fields.insert(field::NAME, PayloadValue::Str(name.to_string()));
		fields.insert(field::ICON, PayloadValue::Bytes(icon));
		fields.insert(field::CATEGORY, PayloadValue::Str(category.as_wire().to_string()));
		fields.insert(field::CAPABLE, PayloadValue::Bool(true));
		fields.insert(field::WEIGHT, PayloadValue::Int(weight));
		fields.insert(field::MAIN_STATE, PayloadValue::Int(MAIN_STATE_UNSET));
		for index in field::LOCALE_NAMES {
			fields.insert(index, PayloadValue::Str(name.to_string()));
		}
		Self { fields }
	}

	/// Returns one field.
	pub fn get(&self, index: u16) -> Option<&PayloadValue> {
		self.fields.get(&index)
	}

	/// Iterates fields in index order.
	pub fn iter(&self) -> impl Iterator<Item = (u16, &PayloadValue)> {
		self.fields.iter().map(|(k, v)| (*k, v))
	}

	/// Number of populated fields.
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Returns `true` when no field is populated.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Display name carried in field 1.
	pub fn name(&self) -> Option<&str> {
		self.get(field::NAME).and_then(PayloadValue::as_str)
	}

	/// Weight carried in field 5.
	pub fn weight(&self) -> Option<i32> {
		self.get(field::WEIGHT).and_then(PayloadValue::as_int)
	}
}

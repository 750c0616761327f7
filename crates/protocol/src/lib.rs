//! Wire vocabulary for the head-unit application menu service.
//!
//! The remote menu is a container object holding application entries. Entries are
//! registered with a field-indexed payload whose numeric indices are fixed by the head
//! unit firmware; see [`payload`] for the layout.

#![warn(missing_docs)]

pub mod payload;
pub mod types;

pub use payload::{EntryPayload, PayloadValue};
pub use types::*;

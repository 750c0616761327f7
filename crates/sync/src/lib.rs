//! Remote application-menu synchronizer.
//!
//! A head unit exposes its launcher menu as a container object that can only be created,
//! destroyed, and filled entry by entry. [`Synchronizer`] keeps that container consistent
//! with a desired list of [`EntryDescriptor`]s:
//!
//! - entries whose name and category are unchanged are left alone;
//! - any removed, renamed, or recategorized entry forces the whole container to be
//!   rebuilt, since the remote side cannot edit entries in place;
//! - new entries are registered either with blocking calls or with tracked non-blocking
//!   calls, depending on what the [`MenuTransport`] supports;
//! - every pass ends with a bounded [`Synchronizer::flush`] that waits for outstanding
//!   registrations without ever blocking past its ceiling.
//!
//! [`SimulatedHeadUnit`] is an in-process transport that records every remote call.

#![warn(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod entry;
pub mod event;
pub mod handle;
pub mod pending;
pub mod priority;
pub mod sync;
pub mod transport;

pub use config::{DispatchPreference, SyncConfig};
pub use dispatch::DispatchMode;
pub use entry::{EntryDescriptor, EntryIdentity, Icon, IconCompressor, PassthroughIcons};
pub use event::{MenuEvent, MenuEventHandler};
pub use handle::{HandleLifecycle, HandleState, MenuHandle};
pub use pending::{FlushOutcome, PendingTicket, PendingTracker};
pub use priority::priority;
pub use sync::{PassReport, Synchronizer};
pub use transport::sim::{RemoteCall, SimMode, SimOp, SimulatedHeadUnit};
pub use transport::{Completion, MenuTransport};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A remote call failed outright. Fatal for the current pass; never retried here.
	#[error("remote {op} failed: {reason}")]
	Transport {
		/// Remote operation that failed.
		op: &'static str,
		/// Failure reported by the transport.
		reason: String,
	},
	/// The transport has no surface for the requested call.
	#[error("transport does not support {0}")]
	Unsupported(&'static str),
	/// A display name without two letters to derive a sort weight from.
	#[error("display name {0:?} needs at least two letters")]
	InvalidName(String),
	/// Configuration could not be parsed.
	#[error("invalid configuration: {0}")]
	Config(String),
}

impl Error {
	/// Builds a transport error for `op`.
	pub fn transport(op: &'static str, reason: impl Into<String>) -> Self {
		Self::Transport { op, reason: reason.into() }
	}
}

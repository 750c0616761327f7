//! Synchronizer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How registrations are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPreference {
	/// Tracked when the transport has an async surface, blocking otherwise.
	#[default]
	Auto,
	/// Always block on each registration.
	Blocking,
	/// Always use tracked non-blocking registrations. Falls back to blocking if the
	/// transport has no async surface.
	Tracked,
}

/// Settings for a [`crate::Synchronizer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	/// Event-handler id registered on every container.
	pub listener_id: String,
	/// Prefix for identities derived with [`crate::EntryIdentity::from_package`].
	pub identity_namespace: String,
	/// Longest a flush waits for outstanding registrations, in milliseconds.
	pub flush_ceiling_ms: u64,
	/// Poll interval while flushing, in milliseconds.
	pub flush_poll_ms: u64,
	/// Square icon size requested from the compressor.
	pub icon_size: u32,
	/// Registration dispatch preference.
	pub dispatch: DispatchPreference,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			listener_id: "carmenu".to_string(),
			identity_namespace: "carmenu".to_string(),
			flush_ceiling_ms: 2000,
			flush_poll_ms: 100,
			icon_size: 48,
			dispatch: DispatchPreference::Auto,
		}
	}
}

impl SyncConfig {
	/// Parses a TOML document. Missing keys keep their defaults.
	pub fn from_toml_str(source: &str) -> Result<Self> {
		let config: Self = toml::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	/// Checks values that deserialize fine but cannot work.
	pub fn validate(&self) -> Result<()> {
		if self.flush_poll_ms == 0 {
			return Err(Error::Config("flush_poll_ms must be > 0".into()));
		}
		if self.icon_size == 0 {
			return Err(Error::Config("icon_size must be > 0".into()));
		}
		Ok(())
	}

	/// Flush ceiling as a duration.
	pub fn flush_ceiling(&self) -> Duration {
		Duration::from_millis(self.flush_ceiling_ms)
	}

	/// Flush poll interval as a duration.
	pub fn flush_poll(&self) -> Duration {
		Duration::from_millis(self.flush_poll_ms)
	}
}

//! Menu file loading.
//!
//! ```toml
//! [sync]
//! dispatch = "tracked"
//!
//! [[entry]]
//! package = "org.example.maps"
//! name = "Maps"
//! category = "navigation"
//! icon = "icons/maps.png"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use carmenu_protocol::AppCategory;
use carmenu_sync::{EntryDescriptor, EntryIdentity, Icon, SyncConfig};
use serde::Deserialize;

/// Parsed menu file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuFile {
	/// Synchronizer settings.
	#[serde(default)]
	pub sync: SyncConfig,
	/// Desired entries, in display order.
	#[serde(default)]
	pub entry: Vec<EntrySpec>,
}

/// One `[[entry]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntrySpec {
	/// Application package the identity is derived from.
	pub package: String,
	/// Display name.
	pub name: String,
	/// Category label, case-insensitive.
	pub category: String,
	/// Icon file, relative to the menu file.
	pub icon: Option<PathBuf>,
}

impl MenuFile {
	/// Parses a menu document.
	pub fn parse(source: &str) -> Result<Self> {
		let menu: Self = toml::from_str(source).context("malformed menu file")?;
		menu.sync.validate()?;
		Ok(menu)
	}

	/// Reads and parses the menu file at `path`.
	pub fn load(path: &Path) -> Result<Self> {
		let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
		Self::parse(&source).with_context(|| format!("loading {}", path.display()))
	}

	/// Builds descriptors for every entry, resolving icons against `base_dir`.
	pub fn descriptors(&self, base_dir: &Path) -> Result<Vec<EntryDescriptor>> {
		self.entry
			.iter()
			.map(|spec| spec.descriptor(&self.sync.identity_namespace, base_dir))
			.collect()
	}
}

impl EntrySpec {
	fn descriptor(&self, namespace: &str, base_dir: &Path) -> Result<EntryDescriptor> {
		let category: AppCategory = self.category.parse().with_context(|| format!("entry {}", self.package))?;
		let icon = match &self.icon {
			Some(path) => {
				let path = base_dir.join(path);
				let bytes = std::fs::read(&path).with_context(|| format!("reading icon {}", path.display()))?;
				Icon::from_bytes(bytes)
			}
			None => Icon::default(),
		};
		let identity = EntryIdentity::from_package(namespace, &self.package);
		EntryDescriptor::new(identity, &self.name, icon, category).with_context(|| format!("entry {}", self.package))
	}
}

//! Carmenu dry-run driver.
//!
//! Loads a menu file, runs one synchronization pass against an in-process head unit and
//! reports what was sent.

mod cli;
mod menu;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use carmenu_protocol::EntryPayload;
use carmenu_sync::{PassthroughIcons, SimMode, SimulatedHeadUnit, Synchronizer};
use clap::Parser;
use cli::Cli;
use menu::MenuFile;
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct DumpedEntry<'a> {
	identity: &'a str,
	payload: &'a EntryPayload,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if cli.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let menu = MenuFile::load(&cli.menu)?;
	let base_dir = cli.menu.parent().unwrap_or(Path::new("."));
	let entries = menu.descriptors(base_dir)?;
	info!(menu = %cli.menu.display(), entries = entries.len(), "menu file loaded");

	let mode = if cli.blocking {
		SimMode::BlockingOnly
	} else {
		SimMode::AsyncAutoComplete
	};
	let remote = SimulatedHeadUnit::new(mode);
	let sync = Synchronizer::new(remote.clone(), Arc::new(PassthroughIcons), menu.sync)?;

	let report = sync.set_desired_entries(&entries).await?;
	info!(
		rebuilt = report.rebuilt,
		registered = report.registered,
		settled = report.flush.settled,
		waited = ?report.flush.waited,
		"synchronization finished"
	);

	if cli.dump_payloads {
		let handle = sync.active_handle().context("no active menu container after pass")?;
		for (identity, payload) in remote.entries(handle.raw()) {
			let line = serde_json::to_string(&DumpedEntry {
				identity: identity.as_str(),
				payload: &payload,
			})?;
			println!("{line}");
		}
	}

	sync.shutdown().await?;
	Ok(())
}

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "carmenu")]
#[command(about = "Synchronize an application menu file against a simulated head unit")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Menu file listing the desired entries
	#[arg(short, long, value_name = "FILE")]
	pub menu: PathBuf,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,

	/// Simulate a head unit without an async registration surface
	#[arg(long)]
	pub blocking: bool,

	/// Print every registered payload as JSON after the pass
	#[arg(long)]
	pub dump_payloads: bool,
}

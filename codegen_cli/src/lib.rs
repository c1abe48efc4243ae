use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

pub use files::*;
pub use script::*;

mod files;
mod script;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Keep generated regions of source files in sync with the presets that produce them.",
	long_about = "codegen checks and fixes regions of source files delimited by `codegen:start` \
	              and `codegen:end` markers.\n\nEach start marker names a preset and its options \
	              as an inline YAML mapping. The preset produces the content the region should \
	              hold.\n\nQuick start:\n  codegen check    Report regions that are out of \
	              date\n  codegen fix      Rewrite regions until nothing changes\n  codegen presets  \
	              List the available presets"
)]
pub struct CodegenCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Check that every generated region is up to date.
	///
	/// Runs the preset of each region and compares its output with the
	/// current content. Exits with status 1 when any problem is found.
	Check {
		/// Files or directories to check. Defaults to the whole project.
		paths: Vec<PathBuf>,

		/// Output format. Use `text` for humans, `json` for tools, or
		/// `github` for GitHub Actions annotations.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Show a unified diff for each out of date region.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// Rewrite out of date regions and insert missing end markers.
	///
	/// Fixes are applied repeatedly until the file stops changing. Exits with
	/// status 1 when problems without a fix remain.
	Fix {
		/// Files or directories to fix. Defaults to the whole project.
		paths: Vec<PathBuf>,

		/// Report which files would change without writing them.
		#[arg(long, default_value_t = false)]
		dry_run: bool,
	},
	/// List the presets available to start markers, including command
	/// presets from `codegen.toml`.
	Presets,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
	/// GitHub Actions annotation format. Emits `::error` annotations that
	/// appear inline on pull request diffs.
	Github,
}

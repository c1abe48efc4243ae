use serde_json::Value;
use serde_json::json;

use crate::CacheOptions;
use crate::Preset;
use crate::PresetContext;
use crate::PresetResult;

/// The JSON document written to the standard input of external
/// generators.
pub fn preset_input(ctx: &PresetContext<'_>) -> Value {
	json!({
		"filename": ctx.filename().to_string_lossy(),
		"existingContent": ctx.existing_content(),
		"options": ctx.options().to_value(),
	})
}

/// A preset backed by a shell command declared in `codegen.toml`.
///
/// The command string is a template rendered with the block's options, so
/// `cat {{ file }}` reads the `file` option. It runs in the directory of
/// the file being processed with [`preset_input`] on stdin, and its stdout
/// becomes the generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPreset {
	command: String,
	cache: bool,
}

impl CommandPreset {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			cache: false,
		}
	}

	/// Reuse the previous output while the block's fingerprint and the
	/// command itself are unchanged.
	#[must_use]
	pub fn cached(mut self, cache: bool) -> Self {
		self.cache = cache;
		self
	}

	pub fn command(&self) -> &str {
		&self.command
	}

	fn run(&self, ctx: &PresetContext<'_>, command: &str) -> PresetResult<String> {
		let input = serde_json::to_string(&preset_input(ctx))?;
		let output = ctx
			.dependencies()
			.process
			.run(command, ctx.dirname(), Some(&input))?;

		Ok(output)
	}
}

impl Preset for CommandPreset {
	fn generate(&self, ctx: &PresetContext<'_>) -> PresetResult<String> {
		let command = ctx
			.dependencies()
			.templates
			.render(&self.command, ctx.options())?;
		tracing::debug!(%command, "running command preset");

		if self.cache {
			ctx.cache(
				CacheOptions::new().extend_inputs([Value::String(command.clone())]),
				|| self.run(ctx, &command),
			)
		} else {
			self.run(ctx, &command)
		}
	}
}

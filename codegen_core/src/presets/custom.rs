use serde::Deserialize;

use crate::Preset;
use crate::PresetContext;
use crate::typed_preset;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomOptions {
	/// Module holding the generator, relative to the current file. Defaults
	/// to the current file.
	#[serde(default)]
	pub source: Option<String>,
	/// Export to call. Defaults to the module's default export.
	#[serde(default)]
	pub export: Option<String>,
	/// Drop any cached copy of the module before loading it. Defaults to
	/// `true` unless the `CI` environment variable is set.
	#[serde(default)]
	pub dev: Option<bool>,
}

/// Run a generator from a user module. All options, including the ones
/// above, are passed through to it.
///
/// `<!-- codegen:start {preset: custom, source: ./scripts/gen.sh, export: table} -->`
pub fn custom_preset() -> impl Preset {
	typed_preset(|ctx: &PresetContext<'_>, options: CustomOptions| {
		let dependencies = ctx.dependencies();
		let source = options
			.source
			.as_deref()
			.map_or_else(|| ctx.filename().to_path_buf(), |source| ctx.dirname().join(source));

		if !dependencies.fs.is_file(&source) {
			return Err(format!("Source path is not a file: {}", source.display()).into());
		}

		let reload = options
			.dev
			.unwrap_or_else(|| std::env::var_os("CI").is_none());
		let module = dependencies.modules.load(&source, reload)?;

		let Some(generator) = module.export(options.export.as_deref()) else {
			return Err(format!(
				"Couldn't find export {} from {}",
				options.export.as_deref().unwrap_or("function"),
				source.display()
			)
			.into());
		};

		tracing::debug!(source = %source.display(), export = ?options.export, "running custom preset");
		generator.generate(ctx)
	})
}

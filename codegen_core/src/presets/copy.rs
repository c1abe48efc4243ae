use serde::Deserialize;

use super::SourceFileOptions;
use super::read_source;
use crate::Preset;
use crate::PresetContext;
use crate::typed_preset;

/// Copy another file into the block.
///
/// ```js
/// // codegen:start {preset: copy, source: ../shared/schema.ts, excludeLines: ['^import']}
/// // codegen:end
/// ```
pub fn copy_preset() -> impl Preset {
	typed_preset(|ctx: &PresetContext<'_>, options: SourceFileOptions| {
		let existing = ctx.existing_content();
		let Some(content) = read_source(ctx, &options)? else {
			return Ok(existing.to_string());
		};

		if options.comparison.is_up_to_date(&content, existing) {
			return Ok(existing.to_string());
		}

		Ok(content)
	})
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrOptions {
	#[serde(flatten)]
	pub source: SourceFileOptions,
	/// Name of the generated constant.
	#[serde(rename = "const")]
	pub name: String,
	#[serde(default)]
	pub export: bool,
}

/// Capture another file as a string constant:
/// `const <name> = "<contents as a JSON string>"`.
pub fn str_preset() -> impl Preset {
	typed_preset(|ctx: &PresetContext<'_>, options: StrOptions| {
		let existing = ctx.existing_content();
		let Some(content) = read_source(ctx, &options.source)? else {
			return Ok(existing.to_string());
		};

		let literal = serde_json::to_string(&content)?;
		let mut generated = format!("const {} = {literal}", options.name);
		if options.export {
			generated = format!("export {generated}");
		}

		if options.source.comparison.is_up_to_date(&generated, existing) {
			return Ok(existing.to_string());
		}

		Ok(generated)
	})
}

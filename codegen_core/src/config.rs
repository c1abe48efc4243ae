use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::CodegenError;
use crate::CodegenResult;
use crate::CommandPreset;
use crate::PresetRegistry;
use crate::default_max_age;

pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["codegen.toml", ".codegen.toml", ".config/codegen.toml"];

/// Configuration loaded from `codegen.toml`.
///
/// ```toml
/// disable_gitignore = false
///
/// [cache]
/// max_age = "28d"
///
/// [presets.version]
/// command = "cat VERSION"
///
/// [include]
/// patterns = ["docs/**/*.md"]
///
/// [exclude]
/// patterns = ["vendor/"]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct CodegenConfig {
	#[serde(default)]
	pub cache: CacheConfig,
	/// Command presets keyed by name. They replace built-in presets with the
	/// same name.
	#[serde(default)]
	pub presets: BTreeMap<String, CommandPresetConfig>,
	#[serde(default)]
	pub include: IncludeConfig,
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// When `true`, `.gitignore` files are not consulted while walking the
	/// project.
	#[serde(default)]
	pub disable_gitignore: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheConfig {
	/// How long cached output stays valid, e.g. `"28d"` or `"12h"`.
	#[serde(default)]
	pub max_age: Option<String>,
}

impl CacheConfig {
	pub fn max_age(&self) -> CodegenResult<TimeDelta> {
		self.max_age
			.as_deref()
			.map_or_else(|| Ok(default_max_age()), parse_duration)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandPresetConfig {
	/// Shell command whose stdout is the generated content. Rendered as a
	/// template with the block's options first.
	pub command: String,
	/// Wrap the command in the hash cache.
	#[serde(default)]
	pub cache: bool,
}

/// Glob patterns, relative to the project root, that restrict which files
/// are scanned. Empty means every supported file.
#[derive(Debug, Default, Deserialize)]
pub struct IncludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// Gitignore-style patterns for files to skip.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl CodegenConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if there is no config file.
	pub fn load(root: &Path) -> CodegenResult<Option<CodegenConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		tracing::debug!(path = %config_path.display(), "loading config");
		let content = std::fs::read_to_string(&config_path)?;

		Self::parse(&content).map(Some)
	}

	pub fn parse(content: &str) -> CodegenResult<CodegenConfig> {
		let config: CodegenConfig =
			toml::from_str(content).map_err(|e| CodegenError::ConfigParse(e.to_string()))?;
		config.cache.max_age()?;

		Ok(config)
	}

	/// Built-in presets overlaid with the command presets from this config.
	pub fn registry(&self) -> PresetRegistry {
		let mut registry = PresetRegistry::builtin();
		for (name, preset) in &self.presets {
			registry.register(
				name.clone(),
				CommandPreset::new(preset.command.clone()).cached(preset.cache),
			);
		}

		registry
	}
}

/// Parse a duration such as `28d`, `2w`, `12h`, `30m` or `45s`.
pub fn parse_duration(text: &str) -> CodegenResult<TimeDelta> {
	let invalid = || CodegenError::InvalidDuration(text.to_string());
	let text = text.trim();
	let unit = text.chars().last().ok_or_else(invalid)?;
	let number: i64 = text[..text.len() - unit.len_utf8()]
		.trim()
		.parse()
		.map_err(|_| invalid())?;

	if number < 0 {
		return Err(invalid());
	}

	let duration = match unit {
		'w' => TimeDelta::try_weeks(number),
		'd' => TimeDelta::try_days(number),
		'h' => TimeDelta::try_hours(number),
		'm' => TimeDelta::try_minutes(number),
		's' => TimeDelta::try_seconds(number),
		_ => None,
	};

	duration.ok_or_else(invalid)
}

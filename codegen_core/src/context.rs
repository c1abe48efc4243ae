use std::cell::RefCell;
use std::ops::Range;
use std::path::Path;

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use serde_json::Value;

use crate::CacheDecision;
use crate::CacheHit;
use crate::CommentStyle;
use crate::Dependencies;
use crate::PresetOptions;
use crate::PresetRegistry;
use crate::PresetResult;
use crate::default_fingerprint;
use crate::evaluate;
use crate::hash_inputs;

/// A named content generator.
///
/// Any closure `Fn(&PresetContext<'_>) -> PresetResult<String>` is a preset.
pub trait Preset: Send + Sync {
	fn generate(&self, ctx: &PresetContext<'_>) -> PresetResult<String>;
}

impl<F> Preset for F
where
	F: Fn(&PresetContext<'_>) -> PresetResult<String> + Send + Sync,
{
	fn generate(&self, ctx: &PresetContext<'_>) -> PresetResult<String> {
		self(ctx)
	}
}

/// Pin a closure to the [`Preset`] signature so its argument types can be
/// inferred.
pub fn preset_fn<F>(generate: F) -> F
where
	F: Fn(&PresetContext<'_>) -> PresetResult<String> + Send + Sync,
{
	generate
}

/// Which values feed the cache fingerprint of a block.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FingerprintInputs {
	/// Path, surrounding file text and options.
	#[default]
	Default,
	/// The defaults followed by extra values.
	Extend(Vec<Value>),
	/// Only the given values.
	Replace(Vec<Value>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheOptions {
	/// Overrides the engine's default max age when set.
	pub max_age: Option<TimeDelta>,
	pub inputs: FingerprintInputs,
}

impl CacheOptions {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn max_age(mut self, max_age: TimeDelta) -> Self {
		self.max_age = Some(max_age);
		self
	}

	/// Add values to the default fingerprint, e.g. the contents of a file
	/// the preset reads.
	#[must_use]
	pub fn extend_inputs(mut self, inputs: impl IntoIterator<Item = Value>) -> Self {
		self.inputs = match self.inputs {
			FingerprintInputs::Default => FingerprintInputs::Extend(inputs.into_iter().collect()),
			FingerprintInputs::Extend(mut values) => {
				values.extend(inputs);
				FingerprintInputs::Extend(values)
			}
			FingerprintInputs::Replace(mut values) => {
				values.extend(inputs);
				FingerprintInputs::Replace(values)
			}
		};
		self
	}

	#[must_use]
	pub fn replace_inputs(mut self, inputs: impl IntoIterator<Item = Value>) -> Self {
		self.inputs = FingerprintInputs::Replace(inputs.into_iter().collect());
		self
	}
}

/// What happened to the cache while a preset ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CacheOutcome {
	Hit(CacheHit),
	Miss { input_hash: String },
}

/// Per-block state the engine shares with [`PresetContext::cache`].
pub(crate) struct CacheScope<'a> {
	pub relative_path: &'a str,
	/// Content ranges of every block in the file.
	pub block_ranges: &'a [Range<usize>],
	pub style: CommentStyle,
	pub now: DateTime<Utc>,
	pub default_max_age: TimeDelta,
	/// The block's content including any cache annotation.
	pub raw_existing: &'a str,
	pub outcome: &'a RefCell<Option<CacheOutcome>>,
}

/// Legacy view of a block, kept for generators written against the
/// `meta` based API.
#[derive(Debug, Clone, Copy)]
pub struct PresetMeta<'a> {
	pub filename: &'a Path,
	pub existing_content: &'a str,
}

/// Everything a preset can see about the block it is generating.
pub struct PresetContext<'a> {
	pub(crate) options: &'a PresetOptions,
	pub(crate) filename: &'a Path,
	pub(crate) existing_content: &'a str,
	pub(crate) source: &'a str,
	pub(crate) dependencies: &'a Dependencies,
	pub(crate) presets: &'a PresetRegistry,
	pub(crate) scope: CacheScope<'a>,
}

impl<'a> PresetContext<'a> {
	/// Options from the start marker, including the `preset` key.
	pub fn options(&self) -> &'a PresetOptions {
		self.options
	}

	pub fn filename(&self) -> &'a Path {
		self.filename
	}

	/// The directory containing the file being processed.
	pub fn dirname(&self) -> &'a Path {
		self.filename
			.parent()
			.filter(|parent| !parent.as_os_str().is_empty())
			.unwrap_or_else(|| Path::new("."))
	}

	/// The current content between the markers, without any cache
	/// annotation.
	pub fn existing_content(&self) -> &'a str {
		self.existing_content
	}

	/// The full text of the file being processed.
	pub fn source(&self) -> &'a str {
		self.source
	}

	pub fn dependencies(&self) -> &'a Dependencies {
		self.dependencies
	}

	pub fn presets(&self) -> &'a PresetRegistry {
		self.presets
	}

	#[deprecated(note = "use `PresetContext::filename` and `PresetContext::existing_content`")]
	pub fn meta(&self) -> PresetMeta<'a> {
		PresetMeta {
			filename: self.filename,
			existing_content: self.existing_content,
		}
	}

	/// Run a sibling preset against this block with different options.
	pub fn run_preset(&self, options: &PresetOptions) -> PresetResult<String> {
		let preset = self.presets.resolve(options.preset_name())?;
		let ctx = PresetContext {
			options,
			filename: self.filename,
			existing_content: self.existing_content,
			source: self.source,
			dependencies: self.dependencies,
			presets: self.presets,
			scope: CacheScope {
				relative_path: self.scope.relative_path,
				block_ranges: self.scope.block_ranges,
				style: self.scope.style,
				now: self.scope.now,
				default_max_age: self.scope.default_max_age,
				raw_existing: self.scope.raw_existing,
				outcome: self.scope.outcome,
			},
		};

		preset.generate(&ctx)
	}

	/// Reuse the block's cached content when its annotation is still valid,
	/// otherwise call `generate`.
	///
	/// The engine writes a fresh annotation above newly generated content.
	/// When several calls happen for one block the last one decides the
	/// annotation.
	pub fn cache<F>(&self, options: CacheOptions, generate: F) -> PresetResult<String>
	where
		F: FnOnce() -> PresetResult<String>,
	{
		let defaults = || {
			default_fingerprint(
				self.scope.relative_path,
				self.source,
				self.scope.block_ranges,
				self.options,
				self.scope.style,
			)
		};
		let inputs = match options.inputs {
			FingerprintInputs::Default => defaults(),
			FingerprintInputs::Extend(extra) => {
				let mut inputs = defaults();
				inputs.extend(extra);
				inputs
			}
			FingerprintInputs::Replace(inputs) => inputs,
		};
		let input_hash = hash_inputs(&inputs);
		let max_age = options.max_age.unwrap_or(self.scope.default_max_age);

		match evaluate(
			self.scope.raw_existing,
			self.scope.style,
			&input_hash,
			max_age,
			self.scope.now,
		) {
			CacheDecision::Reuse(hit) => {
				tracing::debug!(file = %self.filename.display(), "cache hit");
				let content = hit.content.clone();
				*self.scope.outcome.borrow_mut() = Some(CacheOutcome::Hit(hit));
				Ok(content)
			}
			CacheDecision::Regenerate(reason) => {
				tracing::debug!(
					file = %self.filename.display(),
					reason = reason.as_str(),
					"cache miss"
				);
				let content = generate()?;
				*self.scope.outcome.borrow_mut() = Some(CacheOutcome::Miss { input_hash });
				Ok(content)
			}
		}
	}
}

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use similar::TextDiff;

use crate::CacheRecord;
use crate::CodegenConfig;
use crate::CodegenResult;
use crate::CommentStyle;
use crate::Dependencies;
use crate::Diagnostic;
use crate::DiagnosticKind;
use crate::EOL;
use crate::LineIndex;
use crate::MarkerBlock;
use crate::MarkerSyntax;
use crate::Position;
use crate::PresetContext;
use crate::PresetOptions;
use crate::PresetRegistry;
use crate::ScanItem;
use crate::UnterminatedMarker;
use crate::apply_fixes;
use crate::context::CacheOutcome;
use crate::context::CacheScope;
use crate::default_max_age;
use crate::normalize;
use crate::scan;
use crate::split_annotation;
use crate::strip_trim_prefix;

/// How many times [`Codegen::fix`] re-lints after applying fixes.
pub const MAX_FIX_PASSES: usize = 10;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Result of fixing a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
	pub content: String,
	/// Lint passes that applied at least one fix.
	pub passes: usize,
	pub applied: usize,
	/// Diagnostics still reported by the final pass.
	pub remaining: Vec<Diagnostic>,
}

impl FixOutcome {
	pub fn is_changed(&self) -> bool {
		self.applied > 0
	}
}

/// Checks and fixes generated regions of source files.
#[derive(Clone)]
pub struct Codegen {
	registry: PresetRegistry,
	dependencies: Dependencies,
	root: Option<PathBuf>,
	max_age: TimeDelta,
	clock: Clock,
}

impl fmt::Debug for Codegen {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Codegen")
			.field("registry", &self.registry)
			.field("root", &self.root)
			.field("max_age", &self.max_age)
			.finish_non_exhaustive()
	}
}

impl Default for Codegen {
	fn default() -> Self {
		Self::new(PresetRegistry::builtin(), Dependencies::default())
	}
}

impl Codegen {
	pub fn new(registry: PresetRegistry, dependencies: Dependencies) -> Self {
		Self {
			registry,
			dependencies,
			root: None,
			max_age: default_max_age(),
			clock: Arc::new(Utc::now),
		}
	}

	/// Build an engine for the project at `root`, using the presets and cache
	/// settings from `config` when there is one.
	pub fn from_config(root: &Path, config: Option<&CodegenConfig>) -> CodegenResult<Self> {
		let Some(config) = config else {
			return Ok(Self::default().with_root(root));
		};

		Ok(Self::new(config.registry(), Dependencies::default())
			.with_root(root)
			.with_max_age(config.cache.max_age()?))
	}

	/// Paths are made relative to `root` before they are hashed.
	#[must_use]
	pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.root = Some(root.into());
		self
	}

	#[must_use]
	pub fn with_max_age(mut self, max_age: TimeDelta) -> Self {
		self.max_age = max_age;
		self
	}

	#[must_use]
	pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
		self.clock = Arc::new(clock);
		self
	}

	#[must_use]
	pub fn with_dependencies(mut self, dependencies: Dependencies) -> Self {
		self.dependencies = dependencies;
		self
	}

	pub fn registry(&self) -> &PresetRegistry {
		&self.registry
	}

	pub fn registry_mut(&mut self) -> &mut PresetRegistry {
		&mut self.registry
	}

	pub fn dependencies(&self) -> &Dependencies {
		&self.dependencies
	}

	/// Report every block in `text` whose content is not what its preset
	/// produces. Errors only when `path` has an unsupported extension.
	///
	/// Lines starting with `// codegen:trim` have that prefix removed before
	/// scanning, and fix ranges refer to the text after removal.
	#[tracing::instrument(skip_all, fields(path = %path.display()))]
	pub fn lint(&self, path: &Path, text: &str) -> CodegenResult<Vec<Diagnostic>> {
		let syntax = MarkerSyntax::for_path(path)?;
		let source = strip_trim_prefix(text);
		let index = LineIndex::new(&source);
		let relative_path = self.relative_path(path);
		let now = (self.clock)();

		let items = scan(&source, syntax);
		let block_ranges: Vec<Range<usize>> = items
			.iter()
			.filter_map(|item| {
				match item {
					ScanItem::Block(block) => Some(block.content_range.clone()),
					ScanItem::MissingEnd(_) => None,
				}
			})
			.collect();

		let mut diagnostics = Vec::new();
		for item in items {
			match item {
				ScanItem::MissingEnd(marker) => {
					diagnostics.push(missing_end(&marker, syntax.style, &index));
				}
				ScanItem::Block(block) => {
					let run = BlockRun {
						path,
						relative_path: &relative_path,
						source: &source,
						block: &block,
						block_ranges: &block_ranges,
						style: syntax.style,
						index: &index,
						now,
					};
					if let Some(diagnostic) = self.check_block(&run) {
						diagnostics.push(diagnostic);
					}
				}
			}
		}

		tracing::debug!(count = diagnostics.len(), "lint finished");
		Ok(diagnostics)
	}

	/// Apply fixes until the text stops changing or [`MAX_FIX_PASSES`] is
	/// reached.
	pub fn fix(&self, path: &Path, text: &str) -> CodegenResult<FixOutcome> {
		let mut content = strip_trim_prefix(text).into_owned();
		let mut passes = 0;
		let mut applied = 0;
		let mut remaining = self.lint(path, &content)?;

		while passes < MAX_FIX_PASSES && remaining.iter().any(Diagnostic::is_fixable) {
			let (fixed, count) = apply_fixes(&content, &remaining);
			if count == 0 || fixed == content {
				break;
			}

			content = fixed;
			applied += count;
			passes += 1;
			remaining = self.lint(path, &content)?;
		}

		Ok(FixOutcome {
			content,
			passes,
			applied,
			remaining,
		})
	}

	fn relative_path(&self, path: &Path) -> String {
		self.root
			.as_deref()
			.and_then(|root| path.strip_prefix(root).ok())
			.unwrap_or(path)
			.to_string_lossy()
			.replace('\\', "/")
	}

	fn check_block(&self, run: &BlockRun<'_>) -> Option<Diagnostic> {
		let block = run.block;
		let start = run.index.position(block.start_marker.clone());

		let options = match PresetOptions::parse(&block.raw_options) {
			Ok(options) => options,
			Err(error) => {
				tracing::debug!(%error, "invalid options");
				return Some(Diagnostic::new(
					DiagnosticKind::InvalidOptions,
					error.to_string(),
					start,
				));
			}
		};

		let preset = match self.registry.resolve(options.preset_name()) {
			Ok(preset) => preset,
			Err(unknown) => {
				return Some(Diagnostic::new(
					DiagnosticKind::UnknownPreset,
					unknown.to_string(),
					start,
				));
			}
		};
		let name = options.preset_name().unwrap_or("undefined");

		let raw_existing = &run.source[block.content_range.clone()];
		let existing = split_annotation(raw_existing, run.style)
			.map_or(raw_existing, |annotated| annotated.payload);
		let outcome = RefCell::new(None);
		let ctx = PresetContext {
			options: &options,
			filename: run.path,
			existing_content: existing,
			source: run.source,
			dependencies: &self.dependencies,
			presets: &self.registry,
			scope: CacheScope {
				relative_path: run.relative_path,
				block_ranges: run.block_ranges,
				style: run.style,
				now: run.now,
				default_max_age: self.max_age,
				raw_existing,
				outcome: &outcome,
			},
		};

		let generated = match catch_unwind(AssertUnwindSafe(|| preset.generate(&ctx))) {
			Ok(Ok(generated)) => generated,
			Ok(Err(error)) => {
				tracing::debug!(preset = name, %error, "preset failed");
				return Some(preset_failed(name, &error.to_string(), start));
			}
			Err(payload) => {
				let message = panic_message(payload.as_ref());
				tracing::debug!(preset = name, %message, "preset panicked");
				return Some(preset_failed(name, &message, start));
			}
		};

		let expected = match outcome.into_inner() {
			None => generated,
			Some(CacheOutcome::Hit(hit)) if normalize(&generated) == normalize(&hit.content) => {
				format!("{}{EOL}{generated}", hit.annotation)
			}
			Some(CacheOutcome::Hit(hit)) => {
				let record = CacheRecord::new(hit.record.input_hash, &generated, run.now);
				format!("{}{EOL}{generated}", record.to_line(run.style))
			}
			Some(CacheOutcome::Miss { input_hash }) => {
				let record = CacheRecord::new(input_hash, &generated, run.now);
				format!("{}{EOL}{generated}", record.to_line(run.style))
			}
		};

		let actual = normalize(raw_existing);
		let expected = normalize(&expected);
		if actual == expected {
			tracing::trace!(preset = name, "block up to date");
			return None;
		}

		tracing::debug!(preset = name, "block out of date");
		let diff = TextDiff::from_lines(&actual, &expected)
			.unified_diff()
			.context_radius(2)
			.header("existing", "expected")
			.to_string();

		Some(
			Diagnostic::new(
				DiagnosticKind::ContentMismatch,
				format!("content doesn't match:\n{diff}"),
				run.index.position(block.content_range.clone()),
			)
			.with_fix(block.content_range.clone(), format!("{expected}{EOL}")),
		)
	}
}

struct BlockRun<'a> {
	path: &'a Path,
	relative_path: &'a str,
	source: &'a str,
	block: &'a MarkerBlock,
	block_ranges: &'a [Range<usize>],
	style: CommentStyle,
	index: &'a LineIndex<'a>,
	now: DateTime<Utc>,
}

fn missing_end(marker: &UnterminatedMarker, style: CommentStyle, index: &LineIndex<'_>) -> Diagnostic {
	let end_marker = style.end_marker();
	let offset = marker.insertion_offset();

	Diagnostic::new(
		DiagnosticKind::MissingEndMarker,
		format!("couldn't find end marker (expected `{end_marker}`)"),
		index.position(marker.start_marker.clone()),
	)
	.with_fix(offset..offset, format!("{EOL}{end_marker}"))
}

fn preset_failed(name: &str, message: &str, position: Position) -> Diagnostic {
	Diagnostic::new(
		DiagnosticKind::PresetFailed,
		format!("Failed to run preset `{name}`: {message}"),
		position,
	)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	payload
		.downcast_ref::<&str>()
		.map(ToString::to_string)
		.or_else(|| payload.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "preset panicked".to_string())
}

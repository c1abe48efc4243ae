use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;

use crate::CacheOptions;
use crate::Codegen;
use crate::CodegenResult;
use crate::CommentStyle;
use crate::Dependencies;
use crate::GlobOptions;
use crate::MemoryFileSystem;
use crate::Preset;
use crate::PresetRegistry;
use crate::ScanItem;
use crate::normalize;
use crate::preset_fn;
use crate::scan;

pub fn fixed_now() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
		.single()
		.unwrap_or_default()
}

/// An engine rooted at `/project` with a fixed clock.
pub fn codegen_with(registry: PresetRegistry, dependencies: Dependencies) -> Codegen {
	Codegen::new(registry, dependencies)
		.with_root("/project")
		.with_clock(fixed_now)
}

/// The built-in presets over an empty memory file system.
pub fn builtin_codegen() -> Codegen {
	codegen_with(PresetRegistry::builtin(), memory_dependencies(MemoryFileSystem::new()))
}

pub fn memory_dependencies(fs: MemoryFileSystem) -> Dependencies {
	Dependencies::default().with_fs(fs)
}

/// Dependencies whose globber returns `files` filtered by the pattern and
/// ignore list, like a real glob over a flat directory.
pub fn glob_dependencies(files: &[&str]) -> Dependencies {
	let files: Vec<String> = files.iter().map(ToString::to_string).collect();

	Dependencies::default().with_glob(
		move |pattern: &str, options: &GlobOptions<'_>| -> CodegenResult<Vec<PathBuf>> {
			let include = crate::build_glob_set(&[pattern])?;
			let ignore = crate::build_glob_set(options.ignore)?;

			Ok(files
				.iter()
				.filter(|file| include.is_match(file.as_str()) && !ignore.is_match(file.as_str()))
				.map(PathBuf::from)
				.collect())
		},
	)
}

/// A preset returning `output` that counts how often it was called.
pub fn counting_preset(output: &'static str) -> (impl Preset + 'static, Arc<AtomicUsize>) {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);

	let preset = preset_fn(move |_ctx| {
		counter.fetch_add(1, Ordering::SeqCst);
		Ok(output.to_string())
	});

	(preset, calls)
}

/// Like [`counting_preset`] but routes generation through the cache.
pub fn cached_counting_preset(output: &'static str) -> (impl Preset + 'static, Arc<AtomicUsize>) {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);

	let preset = preset_fn(move |ctx| {
		ctx.cache(CacheOptions::new(), || {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(output.to_string())
		})
	});

	(preset, calls)
}

pub fn ts_path() -> &'static Path {
	Path::new("/project/src/index.ts")
}

pub fn md_path() -> &'static Path {
	Path::new("/project/readme.md")
}

pub fn yml_path() -> &'static Path {
	Path::new("/project/config.yml")
}

/// A single empty block for `path`, in the comment style its extension
/// uses.
pub fn block_text(path: &Path, options: &str, content: &str) -> String {
	let style = CommentStyle::for_path(path).unwrap();
	format!(
		"{}\n{content}{}\n",
		style.comment(&format!("codegen:start {options}")),
		style.end_marker()
	)
}

/// The normalized content of the first block in `text`.
pub fn first_block_content(path: &Path, text: &str) -> String {
	let syntax = CommentStyle::for_path(path).unwrap().syntax();
	scan(text, syntax)
		.into_iter()
		.find_map(|item| {
			match item {
				ScanItem::Block(block) => Some(normalize(&text[block.content_range])),
				ScanItem::MissingEnd(_) => None,
			}
		})
		.unwrap()
}

/// Fix an empty block with `options` and return what the preset wrote.
pub fn generated(codegen: &Codegen, path: &Path, options: &str) -> String {
	let outcome = codegen.fix(path, &block_text(path, options, "")).unwrap();
	assert!(
		outcome.remaining.is_empty(),
		"unexpected diagnostics: {:#?}",
		outcome.remaining
	);
	first_block_content(path, &outcome.content)
}

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::sync::Arc;
use std::thread;

use globset::Glob;
use globset::GlobBuilder;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::WalkBuilder;
use serde::Serialize;

use crate::CodegenError;
use crate::CodegenResult;
use crate::Preset;

/// Read-only file access for presets.
pub trait FileSystem: Send + Sync {
	fn read_to_string(&self, path: &Path) -> io::Result<String>;
	fn exists(&self, path: &Path) -> bool;
	fn is_file(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
	fn read_to_string(&self, path: &Path) -> io::Result<String> {
		std::fs::read_to_string(path)
	}

	fn exists(&self, path: &Path) -> bool {
		path.exists()
	}

	fn is_file(&self, path: &Path) -> bool {
		path.is_file()
	}
}

/// An in-memory file system. Directories exist implicitly when a file
/// below them does.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
	files: BTreeMap<PathBuf, String>,
}

impl MemoryFileSystem {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
		self.files.insert(path.into(), content.into());
		self
	}
}

impl FileSystem for MemoryFileSystem {
	fn read_to_string(&self, path: &Path) -> io::Result<String> {
		self.files.get(path).cloned().ok_or_else(|| {
			io::Error::new(
				io::ErrorKind::NotFound,
				format!("no such file: {}", path.display()),
			)
		})
	}

	fn exists(&self, path: &Path) -> bool {
		self.files.keys().any(|file| file.starts_with(path))
	}

	fn is_file(&self, path: &Path) -> bool {
		self.files.contains_key(path)
	}
}

#[derive(Debug, Clone, Copy)]
pub struct GlobOptions<'a> {
	/// Directory the pattern is relative to.
	pub cwd: &'a Path,
	/// Patterns for paths to leave out.
	pub ignore: &'a [String],
}

/// Expands a glob pattern into paths relative to [`GlobOptions::cwd`].
pub trait Globber: Send + Sync {
	fn glob(&self, pattern: &str, options: &GlobOptions<'_>) -> CodegenResult<Vec<PathBuf>>;
}

impl<F> Globber for F
where
	F: Fn(&str, &GlobOptions<'_>) -> CodegenResult<Vec<PathBuf>> + Send + Sync,
{
	fn glob(&self, pattern: &str, options: &GlobOptions<'_>) -> CodegenResult<Vec<PathBuf>> {
		self(pattern, options)
	}
}

/// Globs against the real file system. Hidden files and directories are
/// skipped and `*` never crosses a `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkGlobber;

impl Globber for WalkGlobber {
	fn glob(&self, pattern: &str, options: &GlobOptions<'_>) -> CodegenResult<Vec<PathBuf>> {
		let include = build_glob_set(&[pattern])?;
		let ignore = build_glob_set(options.ignore)?;
		let mut matches = Vec::new();

		let walker = WalkBuilder::new(options.cwd)
			.standard_filters(false)
			.hidden(true)
			.build();

		for entry in walker {
			let entry = match entry {
				Ok(entry) => entry,
				Err(error) => {
					tracing::warn!(%error, "skipping unreadable path while globbing");
					continue;
				}
			};

			if !entry.file_type().is_some_and(|kind| kind.is_file()) {
				continue;
			}

			let Ok(relative) = entry.path().strip_prefix(options.cwd) else {
				continue;
			};
			let key = relative.to_string_lossy().replace('\\', "/");

			if include.is_match(&key) && !ignore.is_match(&key) {
				matches.push(relative.to_path_buf());
			}
		}

		matches.sort();
		Ok(matches)
	}
}

/// Build a `GlobSet` from a list of glob pattern strings. A leading `./` is
/// ignored.
pub fn build_glob_set<S: AsRef<str>>(patterns: &[S]) -> CodegenResult<GlobSet> {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let pattern = pattern.as_ref();
		builder.add(compile_glob(pattern.strip_prefix("./").unwrap_or(pattern))?);
	}

	builder.build().map_err(|e| {
		CodegenError::InvalidPattern {
			pattern: patterns
				.iter()
				.map(AsRef::as_ref)
				.collect::<Vec<_>>()
				.join(", "),
			reason: e.to_string(),
		}
	})
}

fn compile_glob(pattern: &str) -> CodegenResult<Glob> {
	GlobBuilder::new(pattern)
		.literal_separator(true)
		.build()
		.map_err(|e| {
			CodegenError::InvalidPattern {
				pattern: pattern.to_string(),
				reason: e.to_string(),
			}
		})
}

/// Runs shell commands on behalf of presets.
pub trait ProcessRunner: Send + Sync {
	/// Run `command` in `cwd`, optionally feeding `stdin`, and return its
	/// standard output.
	fn run(&self, command: &str, cwd: &Path, stdin: Option<&str>) -> CodegenResult<String>;
}

impl<F> ProcessRunner for F
where
	F: Fn(&str, &Path, Option<&str>) -> CodegenResult<String> + Send + Sync,
{
	fn run(&self, command: &str, cwd: &Path, stdin: Option<&str>) -> CodegenResult<String> {
		self(command, cwd, stdin)
	}
}

/// Runs commands through `sh -c` (or `cmd /C` on windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ProcessRunner for ShellRunner {
	fn run(&self, command: &str, cwd: &Path, stdin: Option<&str>) -> CodegenResult<String> {
		let mut process = if cfg!(windows) {
			let mut process = Command::new("cmd");
			process.arg("/C");
			process
		} else {
			let mut process = Command::new("sh");
			process.arg("-c");
			process
		};

		let process_error = |reason: String| {
			CodegenError::Process {
				command: command.to_string(),
				reason,
			}
		};

		let mut child = process
			.arg(command)
			.current_dir(cwd)
			.stdin(if stdin.is_some() {
				Stdio::piped()
			} else {
				Stdio::null()
			})
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.map_err(|e| process_error(e.to_string()))?;

		// The child may fill stdout before it reads any input.
		let writer = match (stdin, child.stdin.take()) {
			(Some(input), Some(mut pipe)) => {
				let input = input.to_string();
				Some(thread::spawn(move || {
					match pipe.write_all(input.as_bytes()) {
						// Commands are free to ignore their input and exit early.
						Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
						result => result,
					}
				}))
			}
			_ => None,
		};

		let output = child
			.wait_with_output()
			.map_err(|e| process_error(e.to_string()))?;

		if let Some(writer) = writer {
			writer
				.join()
				.map_err(|_| process_error("stdin writer panicked".to_string()))?
				.map_err(|e| process_error(e.to_string()))?;
		}

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
			let reason = if stderr.is_empty() {
				format!(
					"command exited with status {}",
					output
						.status
						.code()
						.map_or_else(|| "unknown".to_string(), |code| code.to_string())
				)
			} else {
				stderr
			};

			return Err(process_error(reason));
		}

		Ok(String::from_utf8_lossy(&output.stdout).to_string())
	}
}

/// A loaded module exposing presets by export name. `None` asks for the
/// default export.
pub trait Module: Send + Sync {
	fn export(&self, name: Option<&str>) -> Option<Arc<dyn Preset>>;
}

/// Loads user modules for the `custom` preset.
pub trait ModuleLoader: Send + Sync {
	/// Load the module at `path`. With `reload` any cached copy is dropped
	/// first.
	fn load(&self, path: &Path, reload: bool) -> CodegenResult<Arc<dyn Module>>;
	/// Drop any cached copy of the module at `path`.
	fn invalidate(&self, path: &Path);
}

/// A module assembled in process from preset values.
#[derive(Clone, Default)]
pub struct PresetModule {
	default: Option<Arc<dyn Preset>>,
	exports: BTreeMap<String, Arc<dyn Preset>>,
}

impl fmt::Debug for PresetModule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PresetModule")
			.field("default", &self.default.is_some())
			.field("exports", &self.exports.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl PresetModule {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_default(mut self, preset: impl Preset + 'static) -> Self {
		self.default = Some(Arc::new(preset));
		self
	}

	#[must_use]
	pub fn with_export(mut self, name: impl Into<String>, preset: impl Preset + 'static) -> Self {
		self.exports.insert(name.into(), Arc::new(preset));
		self
	}
}

impl Module for PresetModule {
	fn export(&self, name: Option<&str>) -> Option<Arc<dyn Preset>> {
		match name {
			Some(name) => self.exports.get(name).cloned(),
			None => self.default.clone(),
		}
	}
}

/// Serves modules registered up front. Reloading is a no-op.
#[derive(Clone, Default)]
pub struct StaticModuleLoader {
	modules: BTreeMap<PathBuf, Arc<dyn Module>>,
}

impl fmt::Debug for StaticModuleLoader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StaticModuleLoader")
			.field("modules", &self.modules.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl StaticModuleLoader {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_module(mut self, path: impl Into<PathBuf>, module: impl Module + 'static) -> Self {
		self.modules.insert(path.into(), Arc::new(module));
		self
	}
}

impl ModuleLoader for StaticModuleLoader {
	fn load(&self, path: &Path, _reload: bool) -> CodegenResult<Arc<dyn Module>> {
		self.modules
			.get(path)
			.cloned()
			.ok_or_else(|| CodegenError::ModuleNotFound(path.display().to_string()))
	}

	fn invalidate(&self, _path: &Path) {}
}

/// Renders [minijinja](https://docs.rs/minijinja) templates for presets.
#[derive(Debug, Clone, Copy, Default)]
pub struct Templates;

impl Templates {
	/// Render `template` with `data` as its context. Undefined variables
	/// render as empty strings.
	pub fn render<S: Serialize>(&self, template: &str, data: &S) -> CodegenResult<String> {
		if !template.contains("{{") && !template.contains("{%") {
			return Ok(template.to_string());
		}

		let mut env = minijinja::Environment::new();
		env.set_keep_trailing_newline(true);
		env.set_undefined_behavior(minijinja::UndefinedBehavior::Chainable);
		env.add_template("__inline__", template)
			.map_err(|e| CodegenError::TemplateRender(e.to_string()))?;

		let template = env
			.get_template("__inline__")
			.map_err(|e| CodegenError::TemplateRender(e.to_string()))?;

		template
			.render(minijinja::Value::from_serialize(data))
			.map_err(|e| CodegenError::TemplateRender(e.to_string()))
	}
}

/// Host capabilities handed to every preset. Each one can be swapped for a
/// stub in tests.
#[derive(Clone)]
pub struct Dependencies {
	pub fs: Arc<dyn FileSystem>,
	pub glob: Arc<dyn Globber>,
	pub process: Arc<dyn ProcessRunner>,
	pub modules: Arc<dyn ModuleLoader>,
	pub templates: Templates,
}

impl fmt::Debug for Dependencies {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dependencies").finish_non_exhaustive()
	}
}

impl Default for Dependencies {
	fn default() -> Self {
		Self {
			fs: Arc::new(OsFileSystem),
			glob: Arc::new(WalkGlobber),
			process: Arc::new(ShellRunner),
			modules: Arc::new(StaticModuleLoader::default()),
			templates: Templates,
		}
	}
}

impl Dependencies {
	#[must_use]
	pub fn with_fs(mut self, fs: impl FileSystem + 'static) -> Self {
		self.fs = Arc::new(fs);
		self
	}

	#[must_use]
	pub fn with_glob(mut self, glob: impl Globber + 'static) -> Self {
		self.glob = Arc::new(glob);
		self
	}

	#[must_use]
	pub fn with_process(mut self, process: impl ProcessRunner + 'static) -> Self {
		self.process = Arc::new(process);
		self
	}

	#[must_use]
	pub fn with_modules(mut self, modules: impl ModuleLoader + 'static) -> Self {
		self.modules = Arc::new(modules);
		self
	}
}

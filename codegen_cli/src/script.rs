use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use codegen_core::CodegenError;
use codegen_core::CodegenResult;
use codegen_core::FileSystem;
use codegen_core::Module;
use codegen_core::ModuleLoader;
use codegen_core::OsFileSystem;
use codegen_core::Preset;
use codegen_core::PresetContext;
use codegen_core::PresetResult;
use codegen_core::preset_input;

/// Loads `custom` preset modules from executable scripts.
///
/// An export is run as `<script> <export>` (`<script> default` for the
/// default export) in the directory of the file being linted. The script
/// receives the preset input JSON on stdin and its stdout becomes the
/// generated content.
pub struct ScriptModuleLoader {
	fs: Arc<dyn FileSystem>,
	modules: Mutex<HashMap<PathBuf, Arc<ScriptModule>>>,
}

impl fmt::Debug for ScriptModuleLoader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScriptModuleLoader")
			.field("modules", &self.modules)
			.finish_non_exhaustive()
	}
}

impl Default for ScriptModuleLoader {
	fn default() -> Self {
		Self {
			fs: Arc::new(OsFileSystem),
			modules: Mutex::default(),
		}
	}
}

impl ScriptModuleLoader {
	pub fn new() -> Self {
		Self::default()
	}

	/// Look scripts up through `fs` instead of the real filesystem.
	#[must_use]
	pub fn with_fs(mut self, fs: impl FileSystem + 'static) -> Self {
		self.fs = Arc::new(fs);
		self
	}

	/// Number of scripts currently held.
	pub fn len(&self) -> usize {
		self.modules
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl ModuleLoader for ScriptModuleLoader {
	fn load(&self, path: &Path, reload: bool) -> CodegenResult<Arc<dyn Module>> {
		if reload {
			self.invalidate(path);
		}

		let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(module) = modules.get(path) {
			return Ok(Arc::clone(module) as Arc<dyn Module>);
		}

		if !self.fs.is_file(path) {
			return Err(CodegenError::ModuleNotFound(path.display().to_string()));
		}

		tracing::debug!(path = %path.display(), "loading script module");
		let module = Arc::new(ScriptModule {
			path: path.to_path_buf(),
		});
		modules.insert(path.to_path_buf(), Arc::clone(&module));

		Ok(module as Arc<dyn Module>)
	}

	fn invalidate(&self, path: &Path) {
		self.modules
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(path);
	}
}

#[derive(Debug)]
pub struct ScriptModule {
	path: PathBuf,
}

impl Module for ScriptModule {
	fn export(&self, name: Option<&str>) -> Option<Arc<dyn Preset>> {
		Some(Arc::new(ScriptExport {
			path: self.path.clone(),
			export: name.unwrap_or("default").to_string(),
		}))
	}
}

#[derive(Debug)]
struct ScriptExport {
	path: PathBuf,
	export: String,
}

impl Preset for ScriptExport {
	fn generate(&self, ctx: &PresetContext<'_>) -> PresetResult<String> {
		let command = format!(
			"{} {}",
			shell_quote(&self.path.to_string_lossy()),
			shell_quote(&self.export)
		);
		let input = serde_json::to_string(&preset_input(ctx))?;
		let output = ctx
			.dependencies()
			.process
			.run(&command, ctx.dirname(), Some(&input))?;

		Ok(output)
	}
}

/// Quote `value` as a single shell word.
fn shell_quote(value: &str) -> String {
	if cfg!(windows) {
		format!("\"{}\"", value.replace('"', "\\\""))
	} else {
		format!("'{}'", value.replace('\'', r"'\''"))
	}
}

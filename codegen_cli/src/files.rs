use std::path::Path;
use std::path::PathBuf;

use codegen_core::CodegenConfig;
use codegen_core::CodegenError;
use codegen_core::CodegenResult;
use codegen_core::CommentStyle;
use codegen_core::build_glob_set;
use globset::GlobSet;
use ignore::WalkBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

/// Decides which files under a project root are linted.
#[derive(Debug, Clone)]
pub struct FileSelection {
	root: PathBuf,
	include: Option<GlobSet>,
	exclude: Gitignore,
	disable_gitignore: bool,
}

impl FileSelection {
	/// Honour `[include]`, `[exclude]` and `disable_gitignore` from `config`.
	pub fn new(root: &Path, config: Option<&CodegenConfig>) -> CodegenResult<Self> {
		let include_patterns = config.map(|c| c.include.patterns.as_slice()).unwrap_or_default();
		let exclude_patterns = config.map(|c| c.exclude.patterns.as_slice()).unwrap_or_default();

		let include = if include_patterns.is_empty() {
			None
		} else {
			Some(build_glob_set(include_patterns)?)
		};

		Ok(Self {
			root: root.to_path_buf(),
			include,
			exclude: build_exclude_matcher(root, exclude_patterns)?,
			disable_gitignore: config.is_some_and(|c| c.disable_gitignore),
		})
	}

	/// Expand `paths` into the files to lint. Directories are walked, files
	/// are taken as given. With no paths the whole root is walked.
	pub fn collect(&self, paths: &[PathBuf]) -> CodegenResult<Vec<PathBuf>> {
		let mut files = Vec::new();

		if paths.is_empty() {
			self.walk(&self.root, &mut files);
		}

		for path in paths {
			let path = if path.is_absolute() {
				path.clone()
			} else {
				self.root.join(path)
			};

			if path.is_dir() {
				self.walk(&path, &mut files);
			} else if path.is_file() {
				files.push(path);
			} else {
				return Err(CodegenError::Io(std::io::Error::new(
					std::io::ErrorKind::NotFound,
					format!("no such file or directory: {}", path.display()),
				)));
			}
		}

		files.sort();
		files.dedup();
		Ok(files)
	}

	fn walk(&self, dir: &Path, files: &mut Vec<PathBuf>) {
		let exclude = self.exclude.clone();
		let walker = WalkBuilder::new(dir)
			.hidden(true)
			.parents(true)
			.ignore(false)
			.git_global(false)
			.git_ignore(!self.disable_gitignore)
			.git_exclude(!self.disable_gitignore)
			.require_git(false)
			.filter_entry(move |entry| {
				let is_dir = entry.file_type().is_some_and(|kind| kind.is_dir());
				let name = entry.file_name().to_string_lossy();

				if entry.depth() > 0 && is_dir && is_ignored_directory_name(&name) {
					return false;
				}

				!exclude.matched(entry.path(), is_dir).is_ignore()
			})
			.build();

		for entry in walker {
			let entry = match entry {
				Ok(entry) => entry,
				Err(error) => {
					tracing::warn!(%error, "skipping unreadable path");
					continue;
				}
			};

			if !entry.file_type().is_some_and(|kind| kind.is_file()) {
				continue;
			}

			let path = entry.path();
			if CommentStyle::for_path(path).is_err() || !self.is_included(path) {
				continue;
			}

			files.push(path.to_path_buf());
		}
	}

	fn is_included(&self, path: &Path) -> bool {
		let Some(include) = &self.include else {
			return true;
		};

		path.strip_prefix(&self.root)
			.is_ok_and(|relative| include.is_match(relative.to_string_lossy().replace('\\', "/")))
	}
}

fn is_ignored_directory_name(name: &str) -> bool {
	name == "node_modules" || name == "target"
}

/// Build a `Gitignore` matcher from the `[exclude]` patterns. They follow
/// `.gitignore` syntax and apply on top of any `.gitignore` rules.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> CodegenResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			CodegenError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}

	builder.build().map_err(|e| {
		CodegenError::InvalidPattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

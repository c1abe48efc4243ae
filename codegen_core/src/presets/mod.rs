//! Presets that ship with codegen.
//!
//! | name          | output                                                   |
//! |---------------|----------------------------------------------------------|
//! | `empty`       | nothing                                                  |
//! | `copy`        | the contents of another file                             |
//! | `str`         | another file captured in a string constant               |
//! | `barrel`      | re-exports of sibling modules                            |
//! | `markdownTOC` | a table of contents for the current markdown file        |
//! | `custom`      | whatever a user module returns                           |

use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::CodegenError;
use crate::CodegenResult;
use crate::PresetContext;
use crate::PresetRegistry;

pub use barrel::*;
pub use command::*;
pub use copy::*;
pub use custom::*;
pub use empty::*;
pub use markdown_toc::*;

mod barrel;
mod command;
mod copy;
mod custom;
mod empty;
mod markdown_toc;

pub(crate) fn register_builtin(registry: &mut PresetRegistry) {
	registry
		.register("empty", empty_preset())
		.register("copy", copy_preset())
		.register("str", str_preset())
		.register("barrel", barrel_preset())
		.register("markdownTOC", markdown_toc_preset())
		.register("custom", custom_preset());
}

static NON_WORD: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\W+").expect("non-word pattern is valid"));

/// Drop every non-word character and lowercase the rest.
pub fn simplify_content(content: &str) -> String {
	NON_WORD.replace_all(content, "").to_lowercase()
}

/// Whether two strings are equal once simplified with
/// [`simplify_content`].
pub fn equivalent_simplified(left: &str, right: &str) -> bool {
	simplify_content(left) == simplify_content(right)
}

/// How `copy` and `str` decide whether existing content is up to date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Comparison {
	/// Ignore differences in punctuation, whitespace and case.
	#[default]
	Simplified,
	Strict,
}

impl Comparison {
	pub fn is_up_to_date(self, generated: &str, existing: &str) -> bool {
		match self {
			Self::Simplified => equivalent_simplified(generated, existing),
			Self::Strict => generated == existing,
		}
	}
}

/// Options shared by `copy` and `str`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileOptions {
	/// Path of the file to read, relative to the file being processed.
	pub source: String,
	/// Only read `source` when this path exists. Otherwise the existing
	/// content is kept.
	#[serde(default)]
	pub only_if_exists: Option<String>,
	/// Regular expressions for lines to leave out.
	#[serde(default)]
	pub exclude_lines: Vec<String>,
	#[serde(default)]
	pub comparison: Comparison,
}

pub(crate) fn resolve_relative(ctx: &PresetContext<'_>, path: &str) -> PathBuf {
	let path = Path::new(path);
	if path.is_absolute() {
		path.to_path_buf()
	} else {
		ctx.dirname().join(path)
	}
}

/// Read the source file named by `options`, honouring `onlyIfExists` and
/// `excludeLines`. `None` means the file should not be read.
pub(crate) fn read_source(
	ctx: &PresetContext<'_>,
	options: &SourceFileOptions,
) -> CodegenResult<Option<String>> {
	let fs = &ctx.dependencies().fs;

	if let Some(guard) = &options.only_if_exists {
		if !fs.exists(&resolve_relative(ctx, guard)) {
			tracing::debug!(guard = %guard, "skipping copy, guard path is missing");
			return Ok(None);
		}
	}

	let content = fs.read_to_string(&resolve_relative(ctx, &options.source))?;
	if options.exclude_lines.is_empty() {
		return Ok(Some(content));
	}

	let patterns = options
		.exclude_lines
		.iter()
		.map(|pattern| {
			Regex::new(pattern).map_err(|e| {
				CodegenError::InvalidPattern {
					pattern: pattern.clone(),
					reason: e.to_string(),
				}
			})
		})
		.collect::<CodegenResult<Vec<_>>>()?;

	let kept = content
		.split('\n')
		.filter(|line| !patterns.iter().any(|pattern| pattern.is_match(line)))
		.collect::<Vec<_>>()
		.join("\n");

	Ok(Some(kept))
}

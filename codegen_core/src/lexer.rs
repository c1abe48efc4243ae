use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::CodegenError;
use crate::CodegenResult;

/// The comment flavour used for markers in a family of file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentStyle {
	/// `// codegen:start ...` for JavaScript and TypeScript sources.
	Slash,
	/// `<!-- codegen:start ... -->` for markdown.
	Html,
	/// `# codegen:start ...` for YAML, shell scripts and plain text.
	Hash,
}

impl CommentStyle {
	pub const ALL: [CommentStyle; 3] = [CommentStyle::Slash, CommentStyle::Html, CommentStyle::Hash];

	/// Choose the style for a file based on its extension.
	pub fn for_path(path: &Path) -> CodegenResult<Self> {
		let extension = path
			.extension()
			.and_then(|ext| ext.to_str())
			.unwrap_or_default();

		Self::for_extension(extension)
			.ok_or_else(|| CodegenError::UnsupportedExtension(format!(".{extension}")))
	}

	pub fn for_extension(extension: &str) -> Option<Self> {
		match extension.to_ascii_lowercase().as_str() {
			"ts" | "tsx" | "js" | "jsx" | "cjs" | "mjs" | "cts" | "mts" => Some(Self::Slash),
			"md" | "mdx" => Some(Self::Html),
			"yml" | "yaml" | "txt" | "sh" => Some(Self::Hash),
			_ => None,
		}
	}

	pub fn comment_open(self) -> &'static str {
		match self {
			Self::Slash => "//",
			Self::Html => "<!--",
			Self::Hash => "#",
		}
	}

	pub fn comment_close(self) -> &'static str {
		match self {
			Self::Html => " -->",
			Self::Slash | Self::Hash => "",
		}
	}

	/// Wrap `body` in a single line comment of this style.
	pub fn comment(self, body: &str) -> String {
		format!("{} {body}{}", self.comment_open(), self.comment_close())
	}

	/// The literal end marker inserted when a block is missing one.
	pub fn end_marker(self) -> String {
		self.comment("codegen:end")
	}

	pub fn syntax(self) -> &'static MarkerSyntax {
		match self {
			Self::Slash => &SLASH_SYNTAX,
			Self::Html => &HTML_SYNTAX,
			Self::Hash => &HASH_SYNTAX,
		}
	}
}

/// Compiled start and end marker patterns for one [`CommentStyle`].
#[derive(Debug)]
pub struct MarkerSyntax {
	pub style: CommentStyle,
	pub start: Regex,
	pub end: Regex,
}

static SLASH_SYNTAX: LazyLock<MarkerSyntax> = LazyLock::new(|| {
	MarkerSyntax::compile(
		CommentStyle::Slash,
		r"// codegen:start ?([^\r\n]*)",
		r"// codegen:end",
	)
});

static HTML_SYNTAX: LazyLock<MarkerSyntax> = LazyLock::new(|| {
	MarkerSyntax::compile(
		CommentStyle::Html,
		r"<!-- codegen:start (.*?) ?-->",
		r"<!-- codegen:end -->",
	)
});

static HASH_SYNTAX: LazyLock<MarkerSyntax> = LazyLock::new(|| {
	MarkerSyntax::compile(
		CommentStyle::Hash,
		r"# codegen:start ?([^\r\n]*)",
		r"# codegen:end",
	)
});

impl MarkerSyntax {
	fn compile(style: CommentStyle, start: &str, end: &str) -> Self {
		Self {
			style,
			start: Regex::new(start).expect("start marker pattern is valid"),
			end: Regex::new(end).expect("end marker pattern is valid"),
		}
	}

	pub fn for_path(path: &Path) -> CodegenResult<&'static Self> {
		CommentStyle::for_path(path).map(CommentStyle::syntax)
	}
}

/// A start marker paired with its end marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerBlock {
	/// Byte range of the start marker text.
	pub start_marker: Range<usize>,
	/// Byte range of the end marker text.
	pub end_marker: Range<usize>,
	/// Everything from just after the start marker's line terminator up to
	/// the end marker.
	pub content_range: Range<usize>,
	/// The raw options text captured from the start marker.
	pub raw_options: String,
}

impl MarkerBlock {
	pub fn start_offset(&self) -> usize {
		self.start_marker.start
	}

	pub fn end_offset(&self) -> usize {
		self.end_marker.start
	}
}

/// A start marker with no end marker before the next start marker (or the
/// end of the buffer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnterminatedMarker {
	pub start_marker: Range<usize>,
	pub raw_options: String,
}

impl UnterminatedMarker {
	/// Where a missing end marker should be inserted.
	pub fn insertion_offset(&self) -> usize {
		self.start_marker.end
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanItem {
	Block(MarkerBlock),
	MissingEnd(UnterminatedMarker),
}

struct StartMatch<'t> {
	range: Range<usize>,
	options: &'t str,
}

/// Find every valid marker in `text`, in source order.
///
/// A start marker is only valid at the beginning of the buffer or directly
/// after a newline. Each valid start marker pairs with the first end marker
/// that follows it and precedes the next valid start marker.
pub fn scan(text: &str, syntax: &MarkerSyntax) -> Vec<ScanItem> {
	let starts: Vec<StartMatch<'_>> = syntax
		.start
		.captures_iter(text)
		.filter_map(|captures| {
			let whole = captures.get(0)?;
			let at_line_start = whole.start() == 0 || text.as_bytes()[whole.start() - 1] == b'\n';

			at_line_start.then(|| {
				StartMatch {
					range: whole.range(),
					options: captures.get(1).map_or("", |group| group.as_str()),
				}
			})
		})
		.collect();

	let ends: Vec<Range<usize>> = syntax.end.find_iter(text).map(|m| m.range()).collect();

	starts
		.iter()
		.enumerate()
		.map(|(index, start)| {
			let limit = starts
				.get(index + 1)
				.map_or(text.len(), |next| next.range.start);
			let end = ends
				.iter()
				.find(|end| end.start >= start.range.end && end.end <= limit);

			match end {
				Some(end) => {
					let content_start = after_line_terminator(text, start.range.end).min(end.start);

					ScanItem::Block(MarkerBlock {
						start_marker: start.range.clone(),
						end_marker: end.clone(),
						content_range: content_start..end.start,
						raw_options: start.options.to_string(),
					})
				}
				None => {
					ScanItem::MissingEnd(UnterminatedMarker {
						start_marker: start.range.clone(),
						raw_options: start.options.to_string(),
					})
				}
			}
		})
		.collect()
}

fn after_line_terminator(text: &str, offset: usize) -> usize {
	let rest = &text[offset..];

	if rest.starts_with("\r\n") {
		offset + 2
	} else if rest.starts_with('\n') {
		offset + 1
	} else {
		offset
	}
}

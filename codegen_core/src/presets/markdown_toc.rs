use std::collections::HashMap;

use markdown::ParseOptions;
use markdown::mdast::Node;
use markdown::to_mdast;
use serde::Deserialize;

use crate::CodegenError;
use crate::CodegenResult;
use crate::Preset;
use crate::PresetContext;
use crate::typed_preset;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownTocOptions {
	/// Headings shallower than this are left out.
	#[serde(default = "default_min_depth")]
	pub min_depth: u8,
	/// Headings deeper than this are left out.
	#[serde(default)]
	pub max_depth: Option<u8>,
}

fn default_min_depth() -> u8 {
	2
}

/// A heading found in a markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
	pub depth: u8,
	pub text: String,
}

/// Generate a table of contents from the headings of the current file.
///
/// `<!-- codegen:start {preset: markdownTOC, minDepth: 2, maxDepth: 5} -->`
pub fn markdown_toc_preset() -> impl Preset {
	typed_preset(|ctx: &PresetContext<'_>, options: MarkdownTocOptions| {
		let min_depth = options.min_depth.max(1);
		let max_depth = options.max_depth.unwrap_or(u8::MAX);
		let headings = collect_headings(ctx.source())?;

		Ok(render_toc(
			headings
				.iter()
				.filter(|heading| heading.depth >= min_depth && heading.depth <= max_depth),
			min_depth,
		))
	})
}

pub fn collect_headings(content: &str) -> CodegenResult<Vec<Heading>> {
	let mdast = to_mdast(content, &ParseOptions::gfm())
		.map_err(|e| CodegenError::Markdown(e.to_string()))?;
	let mut headings = Vec::new();
	collect(&mdast, &mut headings);

	Ok(headings)
}

fn collect(node: &Node, headings: &mut Vec<Heading>) {
	match node {
		Node::Heading(heading) => {
			headings.push(Heading {
				depth: heading.depth,
				text: heading.children.iter().map(ToString::to_string).collect(),
			});
		}
		_ => {
			if let Some(children) = node.children() {
				for child in children {
					collect(child, headings);
				}
			}
		}
	}
}

/// GitHub style anchor for a heading.
pub fn slugify(text: &str) -> String {
	text.to_lowercase()
		.chars()
		.filter_map(|c| {
			if c.is_whitespace() {
				Some('-')
			} else if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
				Some(c)
			} else {
				None
			}
		})
		.collect()
}

fn render_toc<'h>(headings: impl Iterator<Item = &'h Heading>, min_depth: u8) -> String {
	let mut seen: HashMap<String, usize> = HashMap::new();

	headings
		.map(|heading| {
			let indent = " ".repeat(3 * usize::from(heading.depth.saturating_sub(min_depth)));
			let slug = slugify(&heading.text);
			let duplicates = seen.entry(slug.clone()).or_insert(0);
			let href = if *duplicates == 0 {
				slug
			} else {
				format!("{slug}-{duplicates}")
			};
			*duplicates += 1;

			format!("{indent}- [{}](#{href})", heading.text)
		})
		.collect::<Vec<_>>()
		.join("\n")
}

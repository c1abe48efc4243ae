use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::GlobOptions;
use crate::Preset;
use crate::PresetContext;
use crate::typed_preset;

/// Extensions dropped from import paths unless `extension` is set.
const DEFAULT_EXTENSIONS: [&str; 4] = ["js", "mjs", "ts", "tsx"];

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
	One(String),
	Many(Vec<String>),
}

impl OneOrMany {
	pub fn into_vec(self) -> Vec<String> {
		match self {
			Self::One(value) => vec![value],
			Self::Many(values) => values,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStyle {
	/// `import * as name from './name'`
	Star,
	/// `import name from './name'`
	Default,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportKeys {
	Path,
	#[default]
	CamelCase,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BarrelExport {
	Name(String),
	Named {
		name: String,
		#[serde(default)]
		keys: ExportKeys,
	},
}

impl BarrelExport {
	fn name(&self) -> &str {
		match self {
			Self::Name(name) | Self::Named { name, .. } => name,
		}
	}

	fn keys(&self) -> ExportKeys {
		match self {
			Self::Name(_) => ExportKeys::CamelCase,
			Self::Named { keys, .. } => *keys,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExtensionOption {
	Keep(bool),
	Map(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BarrelOptions {
	/// Glob for the files to include, relative to the current file's
	/// directory. Defaults to siblings with the same extension.
	#[serde(default)]
	pub include: Option<String>,
	#[serde(default)]
	pub exclude: Option<OneOrMany>,
	#[serde(default)]
	pub import: Option<ImportStyle>,
	#[serde(default)]
	pub export: Option<BarrelExport>,
	#[serde(default)]
	pub extension: Option<ExtensionOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BarrelEntry {
	import: String,
	identifier: String,
}

/// Re-export sibling modules from one place.
///
/// ```js
/// // codegen:start {preset: barrel, include: some/path/*.ts, exclude: some/path/*util.ts}
/// export * from './some/path/module-a'
/// export * from './some/path/module-b'
/// // codegen:end
/// ```
pub fn barrel_preset() -> impl Preset {
	typed_preset(|ctx: &PresetContext<'_>, options: BarrelOptions| {
		let cwd = ctx.dirname();
		let filename = ctx.filename();
		let ext = filename
			.extension()
			.and_then(|ext| ext.to_str())
			.unwrap_or_default();

		let pattern = options
			.include
			.clone()
			.unwrap_or_else(|| format!("*.{{{ext},{ext}x}}"));
		let ignore: Vec<String> = options
			.exclude
			.clone()
			.map(OneOrMany::into_vec)
			.unwrap_or_default()
			.into_iter()
			.map(|pattern| pattern.strip_prefix("./").unwrap_or(&pattern).to_string())
			.collect();

		let mut files = ctx.dependencies().glob.glob(
			&pattern,
			&GlobOptions {
				cwd,
				ignore: &ignore,
			},
		)?;
		let own = filename.file_name().map(|name| cwd.join(name));
		files.retain(|file| Some(cwd.join(file)) != own);

		let mut entries: Vec<BarrelEntry> = files
			.iter()
			.map(|file| barrel_entry(file, ext, options.extension.as_ref()))
			.collect();
		entries.sort_by(|a, b| locale_cmp(&a.import, &b.import));

		let expected = render_barrel(&entries, &options);

		if normalize_module(&expected) == normalize_module(ctx.existing_content()) {
			return Ok(ctx.existing_content().to_string());
		}

		Ok(expected)
	})
}

fn barrel_entry(file: &Path, ext: &str, extension: Option<&ExtensionOption>) -> BarrelEntry {
	let relative = file.to_string_lossy().replace('\\', "/");
	let import_path = if relative.starts_with("./") || relative.starts_with("../") {
		relative
	} else {
		format!("./{relative}")
	};

	let file_extension = file.extension().and_then(|ext| ext.to_str());
	let base = match file_extension {
		Some(file_ext) => import_path[..import_path.len() - file_ext.len() - 1].to_string(),
		None => import_path.clone(),
	};

	let import = match extension {
		None | Some(ExtensionOption::Keep(false)) => {
			if file_extension.is_some_and(|file_ext| DEFAULT_EXTENSIONS.contains(&file_ext)) {
				base.clone()
			} else {
				import_path
			}
		}
		Some(ExtensionOption::Keep(true)) => import_path,
		Some(ExtensionOption::Map(map)) => {
			match map.get(ext) {
				Some(mapped) if import_path.ends_with(ext) => {
					import_path.replacen(&format!(".{ext}"), &format!(".{mapped}"), 1)
				}
				_ => import_path,
			}
		}
	};

	let mut identifier = camel_case(&base);
	if !identifier.starts_with(|c: char| c.is_ascii_lowercase()) {
		identifier.insert(0, '_');
	}
	if let Some(stripped) = identifier.strip_suffix("Index") {
		identifier = stripped.to_string();
	}

	let first_letter = base.chars().find(char::is_ascii_alphabetic);
	if first_letter.is_some_and(|c| c.is_ascii_uppercase()) {
		identifier = upper_first(&identifier);
	}

	BarrelEntry { import, identifier }
}

fn render_barrel(entries: &[BarrelEntry], options: &BarrelOptions) -> String {
	let Some(style) = options.import else {
		return entries
			.iter()
			.map(|entry| format!("export * from '{}'", entry.import))
			.collect::<Vec<_>>()
			.join("\n");
	};

	let entries = disambiguate(entries);
	let import_prefix = match style {
		ImportStyle::Default => "",
		ImportStyle::Star => "* as ",
	};
	let imports = entries
		.iter()
		.map(|entry| format!("import {import_prefix}{} from '{}'", entry.identifier, entry.import))
		.collect::<Vec<_>>()
		.join("\n");

	let export = options.export.as_ref();
	let props: Vec<String> = if export.is_some_and(|export| export.keys() == ExportKeys::Path) {
		entries
			.iter()
			.map(|entry| format!("{}: {}", serde_json::Value::String(entry.import.clone()), entry.identifier))
			.collect()
	} else {
		entries.iter().map(|entry| entry.identifier.clone()).collect()
	};

	let export_prefix = match export.map(BarrelExport::name) {
		None => "export".to_string(),
		Some("default") => "export default".to_string(),
		Some(name) => format!("export const {name} ="),
	};

	format!("{imports}\n\n{export_prefix} {{\n {}\n}}\n", props.join(",\n "))
}

/// Give every entry sharing an identifier a `_1`, `_2`, ... suffix. Groups
/// keep the order in which their identifier first appears.
fn disambiguate(entries: &[BarrelEntry]) -> Vec<BarrelEntry> {
	let mut groups: Vec<(String, Vec<&BarrelEntry>)> = Vec::new();
	for entry in entries {
		match groups.iter_mut().find(|(identifier, _)| *identifier == entry.identifier) {
			Some((_, group)) => group.push(entry),
			None => groups.push((entry.identifier.clone(), vec![entry])),
		}
	}

	groups
		.into_iter()
		.flat_map(|(_, group)| {
			let ambiguous = group.len() > 1;
			group.into_iter().enumerate().map(move |(index, entry)| {
				BarrelEntry {
					import: entry.import.clone(),
					identifier: if ambiguous {
						format!("{}_{}", entry.identifier, index + 1)
					} else {
						entry.identifier.clone()
					},
				}
			})
		})
		.collect()
}

static TRAILING_COMMA: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r",\s*\}").expect("trailing comma pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Reduce module text to a form where quote style, semicolons, trailing
/// commas, whitespace and `/index` suffixes no longer matter.
fn normalize_module(code: &str) -> String {
	let code = code.replace('\'', "\"").replace("/index", "").replace(';', "\n");
	let code = TRAILING_COMMA.replace_all(&code, "}");
	WHITESPACE.replace_all(code.trim(), " ").into_owned()
}

/// Split text into words on punctuation, case changes and letter/digit
/// boundaries.
fn words(text: &str) -> Vec<String> {
	let mut words = Vec::new();

	for run in text.split(|c: char| !c.is_ascii_alphanumeric()) {
		let chars: Vec<char> = run.chars().collect();
		let mut current = String::new();

		for (index, &c) in chars.iter().enumerate() {
			if let Some(&previous) = index.checked_sub(1).and_then(|i| chars.get(i)) {
				let next = chars.get(index + 1);
				let boundary = (previous.is_ascii_lowercase() && c.is_ascii_uppercase())
					|| (previous.is_ascii_digit() != c.is_ascii_digit())
					|| (previous.is_ascii_uppercase()
						&& c.is_ascii_uppercase()
						&& next.is_some_and(char::is_ascii_lowercase));

				if boundary && !current.is_empty() {
					words.push(std::mem::take(&mut current));
				}
			}
			current.push(c);
		}

		if !current.is_empty() {
			words.push(current);
		}
	}

	words
}

fn camel_case(text: &str) -> String {
	words(text)
		.iter()
		.enumerate()
		.map(|(index, word)| {
			let lower = word.to_ascii_lowercase();
			if index == 0 { lower } else { upper_first(&lower) }
		})
		.collect()
}

fn upper_first(text: &str) -> String {
	let mut chars = text.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// Punctuation in the order a typical locale-aware string comparison sorts
/// it.
const PUNCTUATION_ORDER: &str = "_-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

fn collation_rank(c: char) -> (u8, u32) {
	if c.is_whitespace() {
		(0, 0)
	} else if let Some(position) = PUNCTUATION_ORDER.find(c) {
		(1, position as u32)
	} else if c.is_ascii_digit() {
		(2, c as u32)
	} else if c.is_alphabetic() {
		(3, c.to_lowercase().next().map_or(c as u32, |lower| lower as u32))
	} else {
		(1, 1000 + c as u32)
	}
}

/// Compare paths roughly the way a locale-aware comparison does:
/// punctuation before digits before letters, letters case-insensitive with
/// lowercase first on ties.
fn locale_cmp(a: &str, b: &str) -> Ordering {
	let primary = a.chars().map(collation_rank).cmp(b.chars().map(collation_rank));

	primary
		.then_with(|| {
			a.chars()
				.map(|c| c.is_uppercase())
				.cmp(b.chars().map(|c| c.is_uppercase()))
		})
		.then_with(|| a.cmp(b))
}

use std::ops::Range;

use serde::Deserialize;
use serde::Serialize;

use crate::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DiagnosticKind {
	MissingEndMarker,
	InvalidOptions,
	UnknownPreset,
	PresetFailed,
	ContentMismatch,
}

impl DiagnosticKind {
	pub fn code(self) -> &'static str {
		match self {
			Self::MissingEndMarker => "codegen::missing_end_marker",
			Self::InvalidOptions => "codegen::invalid_options",
			Self::UnknownPreset => "codegen::unknown_preset",
			Self::PresetFailed => "codegen::preset_failed",
			Self::ContentMismatch => "codegen::content_mismatch",
		}
	}
}

/// Replace the bytes in `range` with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
	pub range: Range<usize>,
	pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
	pub kind: DiagnosticKind,
	pub message: String,
	pub position: Position,
	pub fix: Option<Fix>,
}

impl Diagnostic {
	pub fn new(kind: DiagnosticKind, message: impl Into<String>, position: Position) -> Self {
		Self {
			kind,
			message: message.into(),
			position,
			fix: None,
		}
	}

	#[must_use]
	pub fn with_fix(mut self, range: Range<usize>, text: impl Into<String>) -> Self {
		self.fix = Some(Fix {
			range,
			text: text.into(),
		});
		self
	}

	pub fn is_fixable(&self) -> bool {
		self.fix.is_some()
	}
}

/// Apply every non-overlapping fix in `diagnostics` to `text`. Returns the
/// new text and the number of fixes applied. When two fixes overlap the one
/// starting first wins.
pub fn apply_fixes(text: &str, diagnostics: &[Diagnostic]) -> (String, usize) {
	let mut fixes: Vec<&Fix> = diagnostics
		.iter()
		.filter_map(|diagnostic| diagnostic.fix.as_ref())
		.filter(|fix| fix.range.start <= fix.range.end && fix.range.end <= text.len())
		.collect();
	fixes.sort_by_key(|fix| (fix.range.start, fix.range.end));

	let mut accepted: Vec<&Fix> = Vec::with_capacity(fixes.len());
	for fix in fixes {
		let overlaps = accepted
			.last()
			.is_some_and(|previous| fix.range.start < previous.range.end);

		if overlaps {
			tracing::debug!(start = fix.range.start, "skipping overlapping fix");
			continue;
		}

		accepted.push(fix);
	}

	let mut output = text.to_string();
	for fix in accepted.iter().rev() {
		output.replace_range(fix.range.clone(), &fix.text);
	}

	(output, accepted.len())
}

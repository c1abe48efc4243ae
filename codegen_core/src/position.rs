use std::ops::Range;

use serde::Deserialize;
use serde::Serialize;

/// The platform line terminator. Generated content is always normalized to
/// use it.
pub const EOL: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Trim surrounding whitespace and convert every line ending to [`EOL`].
pub fn normalize(content: &str) -> String {
	let trimmed = content.trim().replace("\r\n", "\n");

	if EOL == "\n" {
		trimmed
	} else {
		trimmed.replace('\n', EOL)
	}
}

/// A single location in a buffer. Lines are 1-based, columns are 0-based
/// and counted in characters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
	pub start: Point,
	pub end: Point,
}

impl Position {
	pub fn new(
		start_line: usize,
		start_column: usize,
		start_offset: usize,
		end_line: usize,
		end_column: usize,
		end_offset: usize,
	) -> Self {
		Self {
			start: Point {
				line: start_line,
				column: start_column,
				offset: start_offset,
			},
			end: Point {
				line: end_line,
				column: end_column,
				offset: end_offset,
			},
		}
	}
}

/// Converts byte offsets into line/column pairs for a single buffer.
pub struct LineIndex<'a> {
	text: &'a str,
	/// Byte offsets of the start of each line. `line_starts[0]` is always 0.
	line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
	pub fn new(text: &'a str) -> Self {
		let mut line_starts = vec![0];
		line_starts.extend(
			text.match_indices(EOL)
				.map(|(index, terminator)| index + terminator.len()),
		);

		Self { text, line_starts }
	}

	/// Offsets past the end of the buffer are clamped to its length.
	pub fn point(&self, offset: usize) -> Point {
		let offset = offset.min(self.text.len());
		let line_index = match self.line_starts.binary_search(&offset) {
			Ok(exact) => exact,
			Err(insert) => insert.saturating_sub(1),
		};
		let line_start = self.line_starts[line_index];
		let column = self
			.text
			.get(line_start..offset)
			.map_or(offset - line_start, |prefix| prefix.chars().count());

		Point {
			line: line_index + 1,
			column,
			offset,
		}
	}

	pub fn position(&self, range: Range<usize>) -> Position {
		Position {
			start: self.point(range.start),
			end: self.point(range.end),
		}
	}
}

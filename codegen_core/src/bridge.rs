//! Lets markers live in files that a host linter cannot parse as code.
//!
//! The host comments every line out with [`TRIM_PREFIX`] so the file parses
//! as an empty script, and the engine strips the prefix back off before
//! scanning.

use std::borrow::Cow;

use crate::EOL;

pub const TRIM_PREFIX: &str = "// codegen:trim";

/// Prefix every non-empty line of `text` with [`TRIM_PREFIX`]. Lines are
/// joined with [`EOL`].
pub fn comment_out(text: &str) -> String {
	text.split('\n')
		.map(|line| line.strip_suffix('\r').unwrap_or(line))
		.map(|line| {
			if line.is_empty() {
				String::new()
			} else {
				format!("{TRIM_PREFIX}{line}")
			}
		})
		.collect::<Vec<_>>()
		.join(EOL)
}

/// Remove [`TRIM_PREFIX`] from the start of every line. Text without the
/// prefix is returned untouched.
pub fn strip_trim_prefix(text: &str) -> Cow<'_, str> {
	if !text.contains(TRIM_PREFIX) {
		return Cow::Borrowed(text);
	}

	Cow::Owned(
		text.split_inclusive('\n')
			.map(|line| line.strip_prefix(TRIM_PREFIX).unwrap_or(line))
			.collect(),
	)
}

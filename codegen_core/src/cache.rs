use std::fmt::Write as _;
use std::ops::Range;
use std::sync::LazyLock;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::TimeDelta;
use chrono::Utc;
use regex::Regex;
use serde_json::Value;

use crate::CommentStyle;
use crate::PresetOptions;
use crate::normalize;

/// Cached output older than this is regenerated unless a preset or the
/// config file asks for something else.
pub const DEFAULT_MAX_AGE_WEEKS: i64 = 4;

pub fn default_max_age() -> TimeDelta {
	TimeDelta::weeks(DEFAULT_MAX_AGE_WEEKS)
}

const ANNOTATION_BODY: &str =
	r"codegen:hash \{input: ([0-9a-f]+), output: ([0-9a-f]+), timestamp: ([^\s}]+)\}";

static ANNOTATION_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
	CommentStyle::ALL.map(|style| {
		let pattern = format!(
			r"^\s*{} {ANNOTATION_BODY}{}\s*$",
			regex::escape(style.comment_open()),
			regex::escape(style.comment_close()),
		);
		Regex::new(&pattern).expect("annotation pattern is valid")
	})
});

fn annotation_pattern(style: CommentStyle) -> &'static Regex {
	let index = match style {
		CommentStyle::Slash => 0,
		CommentStyle::Html => 1,
		CommentStyle::Hash => 2,
	};

	&ANNOTATION_PATTERNS[index]
}

/// The metadata embedded as the first line of cached generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
	pub input_hash: String,
	pub output_hash: String,
	pub timestamp: DateTime<Utc>,
}

impl CacheRecord {
	/// Record `output` as generated now from inputs hashing to
	/// `input_hash`.
	pub fn new(input_hash: impl Into<String>, output: &str, timestamp: DateTime<Utc>) -> Self {
		Self {
			input_hash: input_hash.into(),
			output_hash: hash_content(output),
			timestamp,
		}
	}

	/// Parse an annotation line written in `style`.
	pub fn parse_line(line: &str, style: CommentStyle) -> Option<Self> {
		let captures = annotation_pattern(style).captures(line)?;
		let timestamp = DateTime::parse_from_rfc3339(&captures[3])
			.ok()?
			.with_timezone(&Utc);

		Some(Self {
			input_hash: captures[1].to_string(),
			output_hash: captures[2].to_string(),
			timestamp,
		})
	}

	pub fn to_line(&self, style: CommentStyle) -> String {
		style.comment(&format!(
			"codegen:hash {{input: {}, output: {}, timestamp: {}}}",
			self.input_hash,
			self.output_hash,
			self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
		))
	}

	pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
		now.signed_duration_since(self.timestamp)
	}
}

/// A cache annotation found at the top of a block's existing content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotated<'a> {
	pub record: CacheRecord,
	/// The annotation line exactly as written, without its terminator.
	pub line: &'a str,
	/// Everything after the annotation line.
	pub payload: &'a str,
}

/// Split a leading cache annotation off `existing`, if there is one.
pub fn split_annotation(existing: &str, style: CommentStyle) -> Option<Annotated<'_>> {
	let trimmed = existing.trim_start();
	let (first, payload) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
	let line = first.strip_suffix('\r').unwrap_or(first);
	let record = CacheRecord::parse_line(line, style)?;

	Some(Annotated {
		record,
		line,
		payload,
	})
}

/// Why cached content could not be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMiss {
	NoAnnotation,
	InputChanged,
	OutputTampered,
	Expired,
}

impl CacheMiss {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::NoAnnotation => "no annotation",
			Self::InputChanged => "inputs changed",
			Self::OutputTampered => "output edited by hand",
			Self::Expired => "expired",
		}
	}
}

/// Cached content that can be returned instead of regenerating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
	pub record: CacheRecord,
	pub annotation: String,
	pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
	Reuse(CacheHit),
	Regenerate(CacheMiss),
}

/// Decide whether the content already present in a block can be reused.
///
/// Reuse requires an annotation whose input hash equals `input_hash`, whose
/// output hash equals the hash of the content below it, and whose age is
/// strictly less than `max_age`.
pub fn evaluate(
	existing: &str,
	style: CommentStyle,
	input_hash: &str,
	max_age: TimeDelta,
	now: DateTime<Utc>,
) -> CacheDecision {
	let Some(annotated) = split_annotation(existing, style) else {
		return CacheDecision::Regenerate(CacheMiss::NoAnnotation);
	};

	if annotated.record.input_hash != input_hash {
		return CacheDecision::Regenerate(CacheMiss::InputChanged);
	}

	if annotated.record.output_hash != hash_content(annotated.payload) {
		return CacheDecision::Regenerate(CacheMiss::OutputTampered);
	}

	if annotated.record.age(now) >= max_age {
		return CacheDecision::Regenerate(CacheMiss::Expired);
	}

	CacheDecision::Reuse(CacheHit {
		annotation: annotated.line.to_string(),
		content: annotated.payload.to_string(),
		record: annotated.record,
	})
}

/// The default fingerprint of a block: its file path relative to the
/// project root, the file text without the content of any block in
/// `block_ranges` and without any cache annotations, and the block's
/// options.
///
/// `block_ranges` holds the content ranges of every block in the file,
/// including the block being fingerprinted.
pub fn default_fingerprint(
	relative_path: &str,
	source: &str,
	block_ranges: &[Range<usize>],
	options: &PresetOptions,
	style: CommentStyle,
) -> Vec<Value> {
	let mut ranges: Vec<&Range<usize>> = block_ranges.iter().collect();
	ranges.sort_by_key(|range| range.start);

	let mut surrounding = String::with_capacity(source.len());
	let mut offset = 0;
	for range in ranges {
		if range.start < offset || range.end > source.len() {
			continue;
		}
		surrounding.push_str(&source[offset..range.start]);
		offset = range.end;
	}
	surrounding.push_str(&source[offset..]);

	let pattern = annotation_pattern(style);
	let surrounding: String = surrounding
		.split_inclusive('\n')
		.filter(|line| !pattern.is_match(line.trim_end()))
		.collect();

	vec![
		Value::String(relative_path.to_string()),
		Value::String(surrounding),
		options.to_value(),
	]
}

/// Hash fingerprint inputs. Object keys are sorted so the hash does not
/// depend on insertion order.
pub fn hash_inputs(inputs: &[Value]) -> String {
	let mut canonical = String::new();
	write_canonical(&Value::Array(inputs.to_vec()), &mut canonical);
	blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// Hash generated content after normalization.
pub fn hash_content(content: &str) -> String {
	blake3::hash(normalize(content).as_bytes())
		.to_hex()
		.to_string()
}

fn write_canonical(value: &Value, out: &mut String) {
	match value {
		Value::Array(items) => {
			out.push('[');
			for (index, item) in items.iter().enumerate() {
				if index > 0 {
					out.push(',');
				}
				write_canonical(item, out);
			}
			out.push(']');
		}
		Value::Object(map) => {
			let mut entries: Vec<_> = map.iter().collect();
			entries.sort_by(|a, b| a.0.cmp(b.0));
			out.push('{');
			for (index, (key, item)) in entries.into_iter().enumerate() {
				if index > 0 {
					out.push(',');
				}
				let _ = write!(out, "{}:", Value::String(key.clone()));
				write_canonical(item, out);
			}
			out.push('}');
		}
		scalar => {
			let _ = write!(out, "{scalar}");
		}
	}
}

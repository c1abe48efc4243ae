use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::CodegenError;
use crate::Preset;
use crate::PresetContext;
use crate::PresetResult;

/// One problem found while validating preset options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
	/// Keys leading to the offending value. Empty for the options root.
	pub path: Vec<String>,
	pub message: String,
}

impl ValidationIssue {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			path: Vec::new(),
			message: message.into(),
		}
	}

	#[must_use]
	pub fn at(mut self, path: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.path = path.into_iter().map(Into::into).collect();
		self
	}
}

impl fmt::Display for ValidationIssue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.path.is_empty() {
			write!(f, "{}", self.message)
		} else {
			write!(f, "{} (at {})", self.message, self.path.join("."))
		}
	}
}

/// Render validation issues one per line.
pub fn prettify_issues(issues: &[ValidationIssue]) -> String {
	issues
		.iter()
		.map(|issue| format!("✖ {issue}"))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Checks raw options and turns them into a typed value.
pub trait Validator: Send + Sync {
	type Output;

	fn validate(&self, options: &Value) -> Result<Self::Output, Vec<ValidationIssue>>;
}

/// Validates options by deserializing them into `T`.
pub struct SerdeValidator<T>(PhantomData<fn() -> T>);

impl<T> SerdeValidator<T> {
	pub fn new() -> Self {
		Self(PhantomData)
	}
}

impl<T> Default for SerdeValidator<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> fmt::Debug for SerdeValidator<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SerdeValidator")
			.field(&std::any::type_name::<T>())
			.finish()
	}
}

impl<T: DeserializeOwned> Validator for SerdeValidator<T> {
	type Output = T;

	fn validate(&self, options: &Value) -> Result<T, Vec<ValidationIssue>> {
		T::deserialize(options).map_err(|e| vec![ValidationIssue::new(e.to_string())])
	}
}

/// A preset whose options are checked by a [`Validator`] before the
/// generator runs.
pub struct ValidatedPreset<V, F> {
	validator: V,
	generate: F,
}

impl<V, F> Preset for ValidatedPreset<V, F>
where
	V: Validator,
	F: Fn(&PresetContext<'_>, V::Output) -> PresetResult<String> + Send + Sync,
{
	fn generate(&self, ctx: &PresetContext<'_>) -> PresetResult<String> {
		let options = self
			.validator
			.validate(&ctx.options().to_value())
			.map_err(|issues| CodegenError::InvalidOptions(prettify_issues(&issues)))?;

		(self.generate)(ctx, options)
	}
}

/// Attach a validator to a generator. Invalid options fail the preset with
/// an `invalid options` error listing every issue.
pub fn define_preset<V, F>(validator: V, generate: F) -> ValidatedPreset<V, F>
where
	V: Validator,
	F: Fn(&PresetContext<'_>, V::Output) -> PresetResult<String> + Send + Sync,
{
	ValidatedPreset {
		validator,
		generate,
	}
}

/// Shorthand for [`define_preset`] with a [`SerdeValidator`].
pub fn typed_preset<T, F>(generate: F) -> ValidatedPreset<SerdeValidator<T>, F>
where
	T: DeserializeOwned,
	F: Fn(&PresetContext<'_>, T) -> PresetResult<String> + Send + Sync,
{
	define_preset(SerdeValidator::new(), generate)
}

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::Preset;
use crate::presets;

/// Raised when a start marker names a preset that is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown preset {}. Available presets: {}", .name.as_deref().unwrap_or("undefined"), .available.join(", "))]
pub struct UnknownPreset {
	pub name: Option<String>,
	pub available: Vec<String>,
}

/// Maps preset names to generators. Names are kept sorted.
#[derive(Clone, Default)]
pub struct PresetRegistry {
	presets: BTreeMap<String, Arc<dyn Preset>>,
}

impl fmt::Debug for PresetRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PresetRegistry")
			.field("presets", &self.presets.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl PresetRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding the presets that ship with codegen.
	pub fn builtin() -> Self {
		let mut registry = Self::new();
		presets::register_builtin(&mut registry);
		registry
	}

	/// Register `preset` under `name`, replacing any preset already
	/// registered with that name.
	pub fn register(&mut self, name: impl Into<String>, preset: impl Preset + 'static) -> &mut Self {
		self.register_arc(name, Arc::new(preset))
	}

	pub fn register_arc(&mut self, name: impl Into<String>, preset: Arc<dyn Preset>) -> &mut Self {
		let name = name.into();
		if self.presets.insert(name.clone(), preset).is_some() {
			tracing::debug!(preset = %name, "replaced registered preset");
		}
		self
	}

	#[must_use]
	pub fn with(mut self, name: impl Into<String>, preset: impl Preset + 'static) -> Self {
		self.register(name, preset);
		self
	}

	/// Copy every preset from `other` into this registry. Presets in `other`
	/// win on name collisions.
	pub fn merge(&mut self, other: &PresetRegistry) -> &mut Self {
		for (name, preset) in &other.presets {
			self.register_arc(name.clone(), Arc::clone(preset));
		}
		self
	}

	pub fn get(&self, name: &str) -> Option<Arc<dyn Preset>> {
		self.presets.get(name).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.presets.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.presets.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.presets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.presets.is_empty()
	}

	/// Look up the preset for a start marker. `None` means the options had
	/// no `preset` key.
	pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Preset>, UnknownPreset> {
		name.and_then(|name| self.get(name)).ok_or_else(|| {
			UnknownPreset {
				name: name.map(ToString::to_string),
				available: self.names().map(ToString::to_string).collect(),
			}
		})
	}
}

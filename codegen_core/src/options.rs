use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

use crate::CodegenError;
use crate::CodegenResult;

/// The decoded options of a start marker.
///
/// Options are written in YAML flow syntax, e.g.
/// `{preset: copy, source: ../README.md}`. The `preset` key selects the
/// generator, every other key is handed to it untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetOptions(Map<String, Value>);

impl PresetOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Decode the raw options text of a start marker.
	///
	/// An empty string or any document that is not a mapping decodes to an
	/// empty set of options. Malformed YAML is an error whose message starts
	/// with `Error parsing options.`.
	pub fn parse(raw: &str) -> CodegenResult<Self> {
		let document: serde_yaml_ng::Value = serde_yaml_ng::from_str(raw)
			.map_err(|e| CodegenError::OptionsParse(format!("Error parsing options. {e}")))?;
		let value = yaml_to_json(document)
			.map_err(|reason| CodegenError::OptionsParse(format!("Error parsing options. {reason}")))?;

		match value {
			Value::Object(map) => Ok(Self(map)),
			_ => Ok(Self::default()),
		}
	}

	pub fn preset_name(&self) -> Option<&str> {
		self.get_str("preset")
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.0.get(key).and_then(Value::as_str)
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
		self.0.insert(key.into(), value.into());
		self
	}

	#[must_use]
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(key, value);
		self
	}

	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	pub fn to_value(&self) -> Value {
		Value::Object(self.0.clone())
	}

	/// Deserialize the options into a typed struct.
	pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
		serde_json::from_value(self.to_value())
	}
}

impl From<Map<String, Value>> for PresetOptions {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}

/// Convert a YAML document into JSON. Tagged values and keys that are not
/// scalars are rejected.
fn yaml_to_json(value: serde_yaml_ng::Value) -> Result<Value, String> {
	let json = match value {
		serde_yaml_ng::Value::Null => Value::Null,
		serde_yaml_ng::Value::Bool(b) => Value::Bool(b),
		serde_yaml_ng::Value::Number(number) => {
			if let Some(i) = number.as_i64() {
				Value::from(i)
			} else if let Some(u) = number.as_u64() {
				Value::from(u)
			} else {
				let f = number.as_f64().unwrap_or(f64::NAN);
				serde_json::Number::from_f64(f)
					.map(Value::Number)
					.ok_or_else(|| format!("unconvertible number `{number}`"))?
			}
		}
		serde_yaml_ng::Value::String(s) => Value::String(s),
		serde_yaml_ng::Value::Sequence(items) => {
			let items: Result<Vec<Value>, String> = items.into_iter().map(yaml_to_json).collect();
			Value::Array(items?)
		}
		serde_yaml_ng::Value::Mapping(mapping) => {
			let mut map = Map::new();
			for (key, value) in mapping {
				map.insert(yaml_key(key)?, yaml_to_json(value)?);
			}
			Value::Object(map)
		}
		serde_yaml_ng::Value::Tagged(tagged) => {
			return Err(format!("unknown tag `{}`", tagged.tag));
		}
	};

	Ok(json)
}

fn yaml_key(key: serde_yaml_ng::Value) -> Result<String, String> {
	match key {
		serde_yaml_ng::Value::String(s) => Ok(s),
		serde_yaml_ng::Value::Bool(b) => Ok(b.to_string()),
		serde_yaml_ng::Value::Number(n) => Ok(n.to_string()),
		serde_yaml_ng::Value::Null => Ok("null".to_string()),
		other => Err(format!("unsupported mapping key `{other:?}`")),
	}
}

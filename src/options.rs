//! Adapter option construction and validation
//!
//! Options arrive either as an already-typed options object or as an
//! [`OptionMap`] (the structured-map form used by the registry's `build`).
//! Keys are normalized the same way adapter names are, so `cycle_check`,
//! `cycleCheck` and `CYCLE-CHECK` all address the same option. Unknown keys
//! are rejected with [`SerializerError::Validation`]; they are never silently
//! ignored. Every setter validates immediately rather than at encode time.

use crate::error::{SerializerError, SerializerResult};
use crate::value::Value;
use indexmap::IndexMap;

/// Structured option bag accepted by the registry and adapters
pub type OptionMap = IndexMap<String, Value>;

/// Normalizes adapter and option names: ASCII lowercase with `-`, `_`, `.`
/// and spaces stripped.
pub(crate) fn normalize_name(name: &str) -> String {
	name.chars()
		.filter(|c| !matches!(c, '-' | '_' | '.' | ' '))
		.map(|c| c.to_ascii_lowercase())
		.collect()
}

/// Typed, validated configuration for one adapter.
pub trait AdapterOptions: Default + Clone {
	/// Apply a single option. `key` arrives already normalized.
	fn set(&mut self, key: &str, value: &Value) -> SerializerResult<()>;

	/// Apply every entry of a structured map, failing on the first invalid
	/// or unknown key.
	fn apply(&mut self, map: &OptionMap) -> SerializerResult<()> {
		for (key, value) in map {
			self.set(&normalize_name(key), value)?;
		}
		Ok(())
	}

	/// Construct options from a structured map.
	fn from_map(map: &OptionMap) -> SerializerResult<Self> {
		let mut options = Self::default();
		options.apply(map)?;
		Ok(options)
	}
}

/// Options object for adapters that accept no configuration
#[derive(Debug, Default, Clone)]
pub struct BasicOptions;

impl AdapterOptions for BasicOptions {
	fn set(&mut self, key: &str, _value: &Value) -> SerializerResult<()> {
		Err(unknown_option(key))
	}
}

pub(crate) fn unknown_option(key: &str) -> SerializerError {
	SerializerError::Validation(format!("unknown option '{key}'"))
}

pub(crate) fn expect_bool(key: &str, value: &Value) -> SerializerResult<bool> {
	value
		.as_bool()
		.ok_or_else(|| SerializerError::Validation(format!("option '{key}' expects a boolean")))
}

pub(crate) fn expect_str<'a>(key: &str, value: &'a Value) -> SerializerResult<&'a str> {
	value
		.as_str()
		.ok_or_else(|| SerializerError::Validation(format!("option '{key}' expects a string")))
}

//! Native object format
//!
//! The crate's own binary representation of the full value lattice,
//! bincode-encoded with fixed-width little-endian tags. This is the only
//! format that applies a class allow-list while decoding records: resolving
//! an attacker-controlled class name during decode is a code-execution
//! vector in the runtimes this format interoperates with, so disallowed
//! classes decode as [`Value::Opaque`] placeholders instead of trusted
//! records.

use crate::adapter::Adapter;
use crate::error::{SerializerError, SerializerResult};
use crate::options::{AdapterOptions, OptionMap};
use crate::value::{Record, Value};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Record classes permitted to keep their identity during decode
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ClassAllowlist {
	/// Resolve every class name
	#[default]
	All,
	/// Resolve no class name; every record decodes as a placeholder
	None,
	/// Resolve exactly these class names
	Set(BTreeSet<String>),
}

impl ClassAllowlist {
	fn permits(&self, class: &str) -> bool {
		match self {
			ClassAllowlist::All => true,
			ClassAllowlist::None => false,
			ClassAllowlist::Set(names) => names.contains(class),
		}
	}
}

/// Options for [`NativeAdapter`]
#[derive(Debug, Clone, Default)]
pub struct NativeOptions {
	class_allowlist: ClassAllowlist,
}

impl NativeOptions {
	/// Replace the class allow-list
	pub fn set_class_allowlist(&mut self, allowlist: ClassAllowlist) -> &mut Self {
		self.class_allowlist = allowlist;
		self
	}

	/// The current allow-list
	pub fn class_allowlist(&self) -> &ClassAllowlist {
		&self.class_allowlist
	}
}

impl AdapterOptions for NativeOptions {
	fn set(&mut self, key: &str, value: &Value) -> SerializerResult<()> {
		match key {
			"classallowlist" => {
				let allowlist = match value {
					Value::Bool(true) => ClassAllowlist::All,
					Value::Bool(false) => ClassAllowlist::None,
					Value::List(items) => {
						let mut names = BTreeSet::new();
						for item in items {
							let name = item.as_str().ok_or_else(|| {
								SerializerError::Validation(
									"option 'class_allowlist' expects class names as strings"
										.to_string(),
								)
							})?;
							names.insert(name.to_string());
						}
						ClassAllowlist::Set(names)
					}
					_ => {
						return Err(SerializerError::Validation(
							"option 'class_allowlist' expects a boolean or a list of class names"
								.to_string(),
						));
					}
				};
				self.class_allowlist = allowlist;
				Ok(())
			}
			other => Err(crate::options::unknown_option(other)),
		}
	}
}

/// Wire representation. Tags are fixed-width little-endian u32 under
/// bincode's default configuration, which the input gate relies on.
#[derive(Serialize, Deserialize)]
enum Packed {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
	List(Vec<Packed>),
	Map(Vec<(String, Packed)>),
	Record {
		class: String,
		fields: Vec<(String, Packed)>,
	},
}

const PACKED_VARIANTS: u32 = 8;

/// The decode-failure indicator collides with an encoded `false`; inputs are
/// compared against this before the decoder runs.
static SERIALIZED_FALSE: Lazy<Vec<u8>> =
	Lazy::new(|| bincode::serialize(&Packed::Bool(false)).expect("encoding a boolean cannot fail"));

fn pack(value: &Value) -> Packed {
	match value {
		Value::Null => Packed::Null,
		Value::Bool(b) => Packed::Bool(*b),
		Value::Int(i) => Packed::Int(*i),
		Value::Float(f) => Packed::Float(*f),
		Value::Str(s) => Packed::Str(s.clone()),
		Value::List(items) => Packed::List(items.iter().map(pack).collect()),
		Value::Map(map) => Packed::Map(map.iter().map(|(k, v)| (k.clone(), pack(v))).collect()),
		Value::Record(record) | Value::Opaque(record) => Packed::Record {
			class: record.class.clone(),
			fields: record
				.fields
				.iter()
				.map(|(k, v)| (k.clone(), pack(v)))
				.collect(),
		},
	}
}

fn unpack(packed: Packed, allowlist: &ClassAllowlist) -> Value {
	match packed {
		Packed::Null => Value::Null,
		Packed::Bool(b) => Value::Bool(b),
		Packed::Int(i) => Value::Int(i),
		Packed::Float(f) => Value::Float(f),
		Packed::Str(s) => Value::Str(s),
		Packed::List(items) => Value::List(
			items
				.into_iter()
				.map(|item| unpack(item, allowlist))
				.collect(),
		),
		Packed::Map(entries) => {
			let mut map = IndexMap::with_capacity(entries.len());
			for (key, value) in entries {
				map.insert(key, unpack(value, allowlist));
			}
			Value::Map(map)
		}
		Packed::Record { class, fields } => {
			let mut out = IndexMap::with_capacity(fields.len());
			for (key, value) in fields {
				out.insert(key, unpack(value, allowlist));
			}
			let record = Record {
				class,
				fields: out,
			};
			if allowlist.permits(&record.class) {
				Value::Record(record)
			} else {
				Value::Opaque(record)
			}
		}
	}
}

fn type_tag_ok(form: &[u8]) -> bool {
	form.len() >= 4
		&& u32::from_le_bytes([form[0], form[1], form[2], form[3]]) < PACKED_VARIANTS
}

/// Serializer for the crate's native binary object format
///
/// # Example
///
/// ```rust
/// use grappelli::adapter::{Adapter, NativeAdapter};
/// use grappelli::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let adapter = NativeAdapter::new();
/// let bytes = adapter.serialize(&Value::Int(100))?;
/// assert_eq!(adapter.unserialize(&bytes)?, Value::Int(100));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct NativeAdapter {
	options: NativeOptions,
}

impl NativeAdapter {
	/// Create an adapter with default options (allow-list: all)
	pub fn new() -> Self {
		// Forces the sentinel before the first unserialize call.
		Lazy::force(&SERIALIZED_FALSE);
		Self::default()
	}

	/// Create an adapter with the given options
	pub fn with_options(options: NativeOptions) -> Self {
		Lazy::force(&SERIALIZED_FALSE);
		Self { options }
	}

	/// The adapter's options
	pub fn options(&self) -> &NativeOptions {
		&self.options
	}
}

impl Adapter for NativeAdapter {
	fn name(&self) -> &'static str {
		"native"
	}

	fn configure(&mut self, options: &OptionMap) -> SerializerResult<()> {
		self.options.apply(options)
	}

	fn serialize(&self, value: &Value) -> SerializerResult<Vec<u8>> {
		bincode::serialize(&pack(value))
			.map_err(|e| SerializerError::Serialization(format!("native encode error: {e}")))
	}

	fn unserialize(&self, form: &[u8]) -> SerializerResult<Value> {
		if !type_tag_ok(form) {
			return Err(SerializerError::Validation(
				"input does not begin with a recognized native type tag".to_string(),
			));
		}

		// A legitimately encoded `false` must short-circuit here.
		if form == SERIALIZED_FALSE.as_slice() {
			return Ok(Value::Bool(false));
		}

		let packed: Packed = bincode::deserialize(form)
			.map_err(|e| SerializerError::Deserialization(format!("native decode error: {e}")))?;
		Ok(unpack(packed, &self.options.class_allowlist))
	}
}

//! JSON adapter
//!
//! Serializes values as standard JSON text via serde_json. Records travel as
//! objects tagged with the reserved `__class` key; whether such objects come
//! back as plain maps or as records is controlled by
//! [`JsonOptions::set_object_decode`]. Decode failures surface serde_json's
//! own diagnostic (line and column), not a generic message.

use crate::adapter::Adapter;
use crate::error::{SerializerError, SerializerResult};
use crate::options::{expect_bool, expect_str, unknown_option, AdapterOptions, OptionMap};
use crate::value::{Record, Value, CLASS_KEY};
use indexmap::IndexMap;

/// Class name given to lifted expression markers
pub const EXPR_CLASS: &str = "Json.Expr";
/// Field carrying the expression text inside a lifted record
pub const EXPR_FIELD: &str = "expression";
/// In-band prefix marking a string as an embedded expression
pub const EXPR_MARKER: &str = "@expr:";

/// Nesting bound enforced when cycle checking is enabled
const MAX_ENCODE_DEPTH: usize = 512;

/// How `__class`-tagged JSON objects materialize during decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectDecodeType {
	/// Decode every object as a plain map (default)
	#[default]
	Map,
	/// Lift tagged objects into named records
	Record,
}

/// Options for [`JsonAdapter`]
#[derive(Debug, Clone, Default)]
pub struct JsonOptions {
	cycle_check: bool,
	enable_expr_finder: bool,
	object_decode: ObjectDecodeType,
}

impl JsonOptions {
	/// Enable or disable the bounded-nesting check during encode
	pub fn set_cycle_check(&mut self, flag: bool) -> &mut Self {
		self.cycle_check = flag;
		self
	}

	/// Whether the bounded-nesting check runs during encode
	pub fn cycle_check(&self) -> bool {
		self.cycle_check
	}

	/// Enable or disable lifting of `@expr:` markers during decode (and
	/// lowering of expression records during encode)
	pub fn set_enable_expr_finder(&mut self, flag: bool) -> &mut Self {
		self.enable_expr_finder = flag;
		self
	}

	/// Whether expression markers are lifted during decode
	pub fn enable_expr_finder(&self) -> bool {
		self.enable_expr_finder
	}

	/// Choose how tagged objects materialize during decode
	pub fn set_object_decode(&mut self, decode: ObjectDecodeType) -> &mut Self {
		self.object_decode = decode;
		self
	}

	/// How tagged objects materialize during decode
	pub fn object_decode(&self) -> ObjectDecodeType {
		self.object_decode
	}
}

impl AdapterOptions for JsonOptions {
	fn set(&mut self, key: &str, value: &Value) -> SerializerResult<()> {
		match key {
			"cyclecheck" => {
				self.cycle_check = expect_bool("cycle_check", value)?;
				Ok(())
			}
			"enableexprfinder" => {
				self.enable_expr_finder = expect_bool("enable_expr_finder", value)?;
				Ok(())
			}
			"objectdecode" | "objectdecodetype" => {
				let decode = match expect_str("object_decode", value)? {
					"map" => ObjectDecodeType::Map,
					"record" => ObjectDecodeType::Record,
					other => {
						return Err(SerializerError::Validation(format!(
							"unknown object decode type '{other}'; expected 'map' or 'record'"
						)));
					}
				};
				self.object_decode = decode;
				Ok(())
			}
			other => Err(unknown_option(other)),
		}
	}
}

/// JSON serializer
///
/// # Example
///
/// ```rust
/// use grappelli::adapter::{Adapter, JsonAdapter};
/// use grappelli::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let adapter = JsonAdapter::new();
/// let bytes = adapter.serialize(&Value::Int(100))?;
/// assert_eq!(bytes, b"100");
/// assert_eq!(adapter.unserialize(&bytes)?, Value::Int(100));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct JsonAdapter {
	options: JsonOptions,
}

impl JsonAdapter {
	/// Create an adapter with default options
	pub fn new() -> Self {
		Self::default()
	}

	/// Create an adapter with the given options
	pub fn with_options(options: JsonOptions) -> Self {
		Self { options }
	}

	/// The adapter's options
	pub fn options(&self) -> &JsonOptions {
		&self.options
	}
}

impl Adapter for JsonAdapter {
	fn name(&self) -> &'static str {
		"json"
	}

	fn configure(&mut self, options: &OptionMap) -> SerializerResult<()> {
		self.options.apply(options)
	}

	fn serialize(&self, value: &Value) -> SerializerResult<Vec<u8>> {
		if self.options.cycle_check {
			check_depth(value, 0)?;
		}

		let bytes = if self.options.enable_expr_finder {
			serde_json::to_vec(&lower_exprs(value))
		} else {
			serde_json::to_vec(value)
		};
		bytes.map_err(|e| SerializerError::Serialization(format!("JSON encode error: {e}")))
	}

	fn unserialize(&self, form: &[u8]) -> SerializerResult<Value> {
		let mut value: Value = serde_json::from_slice(form)
			.map_err(|e| SerializerError::Deserialization(format!("JSON decode error: {e}")))?;

		if self.options.object_decode == ObjectDecodeType::Map {
			value = demote_records(value);
		}
		if self.options.enable_expr_finder {
			value = lift_exprs(value);
		}
		Ok(value)
	}
}

fn check_depth(value: &Value, depth: usize) -> SerializerResult<()> {
	if depth > MAX_ENCODE_DEPTH {
		return Err(SerializerError::Serialization(format!(
			"cycle check: nesting exceeds {MAX_ENCODE_DEPTH} levels; \
			 the value graph is cyclic or pathologically deep"
		)));
	}
	match value {
		Value::List(items) => {
			for item in items {
				check_depth(item, depth + 1)?;
			}
		}
		Value::Map(map) => {
			for item in map.values() {
				check_depth(item, depth + 1)?;
			}
		}
		Value::Record(record) | Value::Opaque(record) => {
			for item in record.fields.values() {
				check_depth(item, depth + 1)?;
			}
		}
		_ => {}
	}
	Ok(())
}

/// Rewrites expression records into in-band marker strings for encoding.
fn lower_exprs(value: &Value) -> Value {
	match value {
		Value::Record(record)
			if record.class == EXPR_CLASS && record.fields.len() == 1 =>
		{
			match record.fields.get(EXPR_FIELD) {
				Some(Value::Str(code)) => Value::Str(format!("{EXPR_MARKER}{code}")),
				_ => value.clone(),
			}
		}
		Value::List(items) => Value::List(items.iter().map(lower_exprs).collect()),
		Value::Map(map) => Value::Map(
			map.iter()
				.map(|(k, v)| (k.clone(), lower_exprs(v)))
				.collect(),
		),
		Value::Record(record) => Value::Record(lower_record_fields(record)),
		Value::Opaque(record) => Value::Opaque(lower_record_fields(record)),
		other => other.clone(),
	}
}

fn lower_record_fields(record: &Record) -> Record {
	Record {
		class: record.class.clone(),
		fields: record
			.fields
			.iter()
			.map(|(k, v)| (k.clone(), lower_exprs(v)))
			.collect(),
	}
}

/// Lifts marker strings into expression records after decoding.
fn lift_exprs(value: Value) -> Value {
	match value {
		Value::Str(s) => match s.strip_prefix(EXPR_MARKER) {
			Some(code) => Value::Record(Record::new(EXPR_CLASS).with_field(EXPR_FIELD, code)),
			None => Value::Str(s),
		},
		Value::List(items) => Value::List(items.into_iter().map(lift_exprs).collect()),
		Value::Map(map) => Value::Map(
			map.into_iter()
				.map(|(k, v)| (k, lift_exprs(v)))
				.collect(),
		),
		Value::Record(mut record) => {
			record.fields = record
				.fields
				.into_iter()
				.map(|(k, v)| (k, lift_exprs(v)))
				.collect();
			Value::Record(record)
		}
		Value::Opaque(mut record) => {
			record.fields = record
				.fields
				.into_iter()
				.map(|(k, v)| (k, lift_exprs(v)))
				.collect();
			Value::Opaque(record)
		}
		other => other,
	}
}

/// Flattens records into plain maps, reinstating the class key first.
fn demote_records(value: Value) -> Value {
	match value {
		Value::Record(record) | Value::Opaque(record) => {
			let mut map = IndexMap::with_capacity(record.fields.len() + 1);
			map.insert(CLASS_KEY.to_string(), Value::Str(record.class));
			for (key, item) in record.fields {
				map.insert(key, demote_records(item));
			}
			Value::Map(map)
		}
		Value::List(items) => Value::List(items.into_iter().map(demote_records).collect()),
		Value::Map(map) => Value::Map(
			map.into_iter()
				.map(|(k, v)| (k, demote_records(v)))
				.collect(),
		),
		other => other,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Value::Null, "null")]
	#[case(Value::Bool(true), "true")]
	#[case(Value::Bool(false), "false")]
	#[case(Value::Int(100), "100")]
	#[case(Value::from("test"), "\"test\"")]
	fn scalars_encode_as_json(#[case] value: Value, #[case] expected: &str) {
		let adapter = JsonAdapter::new();
		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(bytes, expected.as_bytes());
		assert_eq!(adapter.unserialize(&bytes).unwrap(), value);
	}

	#[rstest]
	fn records_decode_as_maps_by_default() {
		let adapter = JsonAdapter::new();
		let value = Value::Record(Record::new("blog.Post").with_field("title", "hello"));
		let bytes = adapter.serialize(&value).unwrap();
		let back = adapter.unserialize(&bytes).unwrap();

		let map = back.as_map().expect("default decode type is map");
		assert_eq!(map[CLASS_KEY], Value::from("blog.Post"));
		assert_eq!(map["title"], Value::from("hello"));
	}

	#[rstest]
	fn records_round_trip_in_record_mode() {
		let mut options = JsonOptions::default();
		options.set_object_decode(ObjectDecodeType::Record);
		let adapter = JsonAdapter::with_options(options);

		let value = Value::Record(Record::new("blog.Post").with_field("title", "hello"));
		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(adapter.unserialize(&bytes).unwrap(), value);
	}

	#[rstest]
	fn syntax_errors_carry_the_parser_diagnostic() {
		let adapter = JsonAdapter::new();
		let err = adapter.unserialize(b"{\"open\": ").unwrap_err();
		let message = err.to_string();
		assert!(message.contains("line"), "missing diagnostic: {message}");
	}

	#[rstest]
	fn expr_markers_lift_only_when_enabled() {
		let form = br#"["@expr:now()", "plain"]"#;

		let adapter = JsonAdapter::new();
		let back = adapter.unserialize(form).unwrap();
		assert_eq!(back.as_list().unwrap()[0], Value::from("@expr:now()"));

		let mut options = JsonOptions::default();
		options.set_enable_expr_finder(true);
		let adapter = JsonAdapter::with_options(options);
		let back = adapter.unserialize(form).unwrap();

		let lifted = back.as_list().unwrap()[0].as_record().unwrap();
		assert_eq!(lifted.class, EXPR_CLASS);
		assert_eq!(lifted.fields[EXPR_FIELD], Value::from("now()"));
	}

	#[rstest]
	fn expr_records_round_trip_when_enabled() {
		let mut options = JsonOptions::default();
		options.set_enable_expr_finder(true);
		let adapter = JsonAdapter::with_options(options);

		let value = Value::Record(Record::new(EXPR_CLASS).with_field(EXPR_FIELD, "now()"));
		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(bytes, br#""@expr:now()""#);
		assert_eq!(adapter.unserialize(&bytes).unwrap(), value);
	}

	#[rstest]
	fn cycle_check_bounds_nesting() {
		let mut value = Value::Int(0);
		for _ in 0..(MAX_ENCODE_DEPTH + 10) {
			value = Value::List(vec![value]);
		}

		let mut options = JsonOptions::default();
		options.set_cycle_check(true);
		let adapter = JsonAdapter::with_options(options);

		let err = adapter.serialize(&value).unwrap_err();
		assert!(matches!(err, SerializerError::Serialization(_)));
		assert!(err.to_string().contains("cycle check"));
	}

	#[rstest]
	fn decode_type_option_validates_at_the_setter() {
		let mut map = OptionMap::new();
		map.insert("object_decode_type".to_string(), Value::from("stdclass"));

		let mut adapter = JsonAdapter::new();
		let result = adapter.configure(&map);
		assert!(matches!(result, Err(SerializerError::Validation(_))));
	}

	#[rstest]
	fn unknown_options_are_rejected() {
		let mut map = OptionMap::new();
		map.insert("pretty".to_string(), Value::Bool(true));

		let mut adapter = JsonAdapter::new();
		let result = adapter.configure(&map);
		assert!(matches!(result, Err(SerializerError::Validation(_))));
	}
}

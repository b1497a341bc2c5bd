//! Dynamic value lattice shared by all adapters
//!
//! Every adapter serializes and deserializes [`Value`], a dynamically typed
//! payload covering null, booleans, integers, floats, strings, ordered lists,
//! string-keyed maps and named records. Records carry a class identity; an
//! [`Value::Opaque`] record carries the same payload but marks the identity
//! as unresolved (see the native adapter's class allow-list).
//!
//! The serde bridge in this module maps the lattice onto the standard wire
//! shapes of any self-describing format: records travel as maps whose first
//! entry is the reserved [`CLASS_KEY`].

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

/// Reserved map key carrying a record's class name on the wire.
pub const CLASS_KEY: &str = "__class";

/// A named record: class identity plus ordered, string-keyed fields.
///
/// # Examples
///
/// ```rust
/// use grappelli::{Record, Value};
///
/// let record = Record::new("blog.Post").with_field("title", Value::from("hello"));
/// assert_eq!(record.class, "blog.Post");
/// assert_eq!(record.fields["title"], Value::from("hello"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
	/// The record's class name (e.g. `"blog.Post"`)
	pub class: String,

	/// Field values, in declaration order
	pub fields: IndexMap<String, Value>,
}

impl Record {
	/// Create an empty record with the given class name
	pub fn new(class: impl Into<String>) -> Self {
		Self {
			class: class.into(),
			fields: IndexMap::new(),
		}
	}

	/// Add a field, builder style
	pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.fields.insert(name.into(), value.into());
		self
	}
}

/// A dynamically typed serializable value.
///
/// # Examples
///
/// ```rust
/// use grappelli::Value;
///
/// let value = Value::List(vec![Value::Int(1), Value::from("two"), Value::Null]);
/// assert_eq!(value.as_list().map(|l| l.len()), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// The null value
	Null,
	/// A boolean
	Bool(bool),
	/// A signed 64-bit integer
	Int(i64),
	/// A 64-bit float
	Float(f64),
	/// A UTF-8 string
	Str(String),
	/// An ordered list
	List(Vec<Value>),
	/// A string-keyed map preserving insertion order
	Map(IndexMap<String, Value>),
	/// A named record with trusted class identity
	Record(Record),
	/// A named record whose class identity was NOT resolved during decode.
	///
	/// Field data and the original class name are preserved so the payload
	/// can be inspected or re-serialized, but the identity must not be
	/// trusted.
	Opaque(Record),
}

impl Value {
	/// Returns true for [`Value::Null`]
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Returns true for [`Value::Opaque`]
	pub fn is_opaque(&self) -> bool {
		matches!(self, Value::Opaque(_))
	}

	/// The boolean payload, if this is a boolean
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// The integer payload, if this is an integer
	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	/// The float payload, if this is a float
	pub fn as_float(&self) -> Option<f64> {
		match self {
			Value::Float(f) => Some(*f),
			_ => None,
		}
	}

	/// The string payload, if this is a string
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(s) => Some(s),
			_ => None,
		}
	}

	/// The list payload, if this is a list
	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items),
			_ => None,
		}
	}

	/// The map payload, if this is a map
	pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
		match self {
			Value::Map(map) => Some(map),
			_ => None,
		}
	}

	/// The record payload for either record variant
	pub fn as_record(&self) -> Option<&Record> {
		match self {
			Value::Record(r) | Value::Opaque(r) => Some(r),
			_ => None,
		}
	}
}

impl From<()> for Value {
	fn from(_: ()) -> Self {
		Value::Null
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Value::Int(v as i64)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Str(v.to_string())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Str(v)
	}
}

impl From<Vec<Value>> for Value {
	fn from(v: Vec<Value>) -> Self {
		Value::List(v)
	}
}

impl From<IndexMap<String, Value>> for Value {
	fn from(v: IndexMap<String, Value>) -> Self {
		Value::Map(v)
	}
}

impl From<Record> for Value {
	fn from(v: Record) -> Self {
		Value::Record(v)
	}
}

impl Serialize for Value {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			Value::Null => serializer.serialize_unit(),
			Value::Bool(b) => serializer.serialize_bool(*b),
			Value::Int(i) => serializer.serialize_i64(*i),
			Value::Float(f) => serializer.serialize_f64(*f),
			Value::Str(s) => serializer.serialize_str(s),
			Value::List(items) => {
				let mut seq = serializer.serialize_seq(Some(items.len()))?;
				for item in items {
					seq.serialize_element(item)?;
				}
				seq.end()
			}
			Value::Map(map) => {
				let mut out = serializer.serialize_map(Some(map.len()))?;
				for (key, value) in map {
					out.serialize_entry(key, value)?;
				}
				out.end()
			}
			Value::Record(record) | Value::Opaque(record) => {
				let mut out = serializer.serialize_map(Some(record.fields.len() + 1))?;
				out.serialize_entry(CLASS_KEY, &record.class)?;
				for (key, value) in &record.fields {
					out.serialize_entry(key, value)?;
				}
				out.end()
			}
		}
	}
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
	type Value = Value;

	fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
		formatter.write_str("a serializable value")
	}

	fn visit_unit<E>(self) -> Result<Value, E> {
		Ok(Value::Null)
	}

	fn visit_none<E>(self) -> Result<Value, E> {
		Ok(Value::Null)
	}

	fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
	where
		D: Deserializer<'de>,
	{
		Deserialize::deserialize(deserializer)
	}

	fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
		Ok(Value::Bool(v))
	}

	fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
		Ok(Value::Int(v))
	}

	fn visit_u64<E>(self, v: u64) -> Result<Value, E>
	where
		E: de::Error,
	{
		i64::try_from(v)
			.map(Value::Int)
			.map_err(|_| E::custom(format!("integer {v} is out of the supported range")))
	}

	fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
		Ok(Value::Float(v))
	}

	fn visit_str<E>(self, v: &str) -> Result<Value, E> {
		Ok(Value::Str(v.to_string()))
	}

	fn visit_string<E>(self, v: String) -> Result<Value, E> {
		Ok(Value::Str(v))
	}

	fn visit_bytes<E>(self, _v: &[u8]) -> Result<Value, E>
	where
		E: de::Error,
	{
		Err(E::custom("binary payloads are not part of the value model"))
	}

	fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
	where
		A: SeqAccess<'de>,
	{
		let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
		while let Some(item) = seq.next_element::<Value>()? {
			items.push(item);
		}
		Ok(Value::List(items))
	}

	fn visit_map<A>(self, mut access: A) -> Result<Value, A::Error>
	where
		A: MapAccess<'de>,
	{
		let mut map: IndexMap<String, Value> =
			IndexMap::with_capacity(access.size_hint().unwrap_or(0));
		while let Some((key, value)) = access.next_entry::<String, Value>()? {
			map.insert(key, value);
		}
		Ok(lift_record(map))
	}
}

/// Turns a decoded map back into a record when its first entry is the
/// reserved class key. Adapters that want plain maps demote the result.
fn lift_record(mut map: IndexMap<String, Value>) -> Value {
	let tagged = matches!(map.get_index(0), Some((key, Value::Str(_))) if key == CLASS_KEY);
	if !tagged {
		return Value::Map(map);
	}

	let class = match map.shift_remove_index(0) {
		Some((_, Value::Str(class))) => class,
		_ => unreachable!("first entry checked above"),
	};
	Value::Record(Record { class, fields: map })
}

impl<'de> Deserialize<'de> for Value {
	fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
	where
		D: Deserializer<'de>,
	{
		deserializer.deserialize_any(ValueVisitor)
	}
}

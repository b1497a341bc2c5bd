//! Markup packet adapter (requires the `markup` feature)
//!
//! A legacy XML envelope for data exchange: a `<packet>` element carrying an
//! optional `<header>` with a comment and a `<data>` element holding exactly
//! one value node. Kept for interoperability with systems that still speak
//! it; new code should prefer JSON or one of the binary adapters, and the
//! adapter logs a deprecation warning when constructed.
//!
//! Consumers of this envelope historically read a null result as a decode
//! failure, so a packet whose data is a lone null node is re-checked
//! structurally before an error is reported.

use crate::adapter::Adapter;
use crate::error::{SerializerError, SerializerResult};
use crate::options::{expect_str, AdapterOptions, OptionMap};
use crate::value::{Record, Value, CLASS_KEY};
use indexmap::IndexMap;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Envelope versions this adapter can emit and decode.
const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Options for [`MarkupAdapter`]
#[derive(Debug, Clone)]
pub struct MarkupOptions {
	comment: String,
	version: String,
}

impl Default for MarkupOptions {
	fn default() -> Self {
		Self {
			comment: String::new(),
			version: "1.0".to_string(),
		}
	}
}

impl MarkupOptions {
	/// Set the packet header comment. An empty comment omits the header.
	pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
		self.comment = comment.into();
		self
	}

	/// The packet header comment
	pub fn comment(&self) -> &str {
		&self.comment
	}

	/// Set the envelope version. Unknown versions are rejected immediately.
	pub fn set_version(&mut self, version: impl Into<String>) -> SerializerResult<&mut Self> {
		let version = version.into();
		if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
			return Err(SerializerError::Validation(format!(
				"invalid packet version '{version}'; supported versions: {}",
				SUPPORTED_VERSIONS.join(", ")
			)));
		}
		self.version = version;
		Ok(self)
	}

	/// The envelope version
	pub fn version(&self) -> &str {
		&self.version
	}
}

impl AdapterOptions for MarkupOptions {
	fn set(&mut self, key: &str, value: &Value) -> SerializerResult<()> {
		match key {
			"comment" => {
				self.comment = expect_str(key, value)?.to_string();
				Ok(())
			}
			"version" => {
				self.set_version(expect_str(key, value)?)?;
				Ok(())
			}
			other => Err(crate::options::unknown_option(other)),
		}
	}
}

/// Decode failures. A DOCTYPE is rejected outright; everything else is
/// reported as a malformed packet.
enum MarkupFailure {
	Doctype,
	Malformed,
}

type DecodeResult<T> = Result<T, MarkupFailure>;

struct Cursor<'a> {
	reader: Reader<&'a [u8]>,
}

impl<'a> Cursor<'a> {
	fn new(text: &'a str) -> Self {
		Self {
			reader: Reader::from_str(text),
		}
	}

	/// Next event with no skipping. Used inside text content, where
	/// whitespace is significant.
	fn raw_event(&mut self) -> DecodeResult<Event<'a>> {
		match self.reader.read_event() {
			Ok(Event::DocType(_)) => Err(MarkupFailure::Doctype),
			Ok(ev) => Ok(ev),
			Err(_) => Err(MarkupFailure::Malformed),
		}
	}

	/// Next structural event: declarations, comments, processing
	/// instructions and inter-element whitespace are skipped.
	fn next_event(&mut self) -> DecodeResult<Event<'a>> {
		loop {
			match self.raw_event()? {
				Event::Decl(_) | Event::Comment(_) | Event::PI(_) => continue,
				Event::Text(t) if t.unescape().map(|s| s.trim().is_empty()).unwrap_or(false) => {
					continue;
				}
				ev => return Ok(ev),
			}
		}
	}

	fn expect_end(&mut self, name: &[u8]) -> DecodeResult<()> {
		match self.next_event()? {
			Event::End(e) if e.name().as_ref() == name => Ok(()),
			_ => Err(MarkupFailure::Malformed),
		}
	}

	/// Consume events until the matching end tag of an already-opened
	/// element, tracking nesting depth.
	fn skip_to_end(&mut self, name: &[u8]) -> DecodeResult<()> {
		let mut depth = 0usize;
		loop {
			match self.next_event()? {
				Event::Start(_) => depth += 1,
				Event::End(e) => {
					if depth == 0 {
						return if e.name().as_ref() == name {
							Ok(())
						} else {
							Err(MarkupFailure::Malformed)
						};
					}
					depth -= 1;
				}
				Event::Eof => return Err(MarkupFailure::Malformed),
				_ => {}
			}
		}
	}

	/// Text content of an already-opened element, up to its end tag.
	fn read_text(&mut self, name: &[u8]) -> DecodeResult<String> {
		let mut out = String::new();
		loop {
			match self.raw_event()? {
				Event::Text(t) => {
					out.push_str(&t.unescape().map_err(|_| MarkupFailure::Malformed)?);
				}
				Event::CData(c) => {
					out.push_str(
						std::str::from_utf8(&c).map_err(|_| MarkupFailure::Malformed)?,
					);
				}
				Event::End(e) if e.name().as_ref() == name => return Ok(out),
				_ => return Err(MarkupFailure::Malformed),
			}
		}
	}
}

fn attr_value(e: &BytesStart, key: &[u8]) -> DecodeResult<Option<String>> {
	for attr in e.attributes() {
		let attr = attr.map_err(|_| MarkupFailure::Malformed)?;
		if attr.key.as_ref() == key {
			let value = attr.unescape_value().map_err(|_| MarkupFailure::Malformed)?;
			return Ok(Some(value.into_owned()));
		}
	}
	Ok(None)
}

fn decode_boolean(e: &BytesStart) -> DecodeResult<Value> {
	match attr_value(e, b"value")?.as_deref() {
		Some("true") => Ok(Value::Bool(true)),
		Some("false") => Ok(Value::Bool(false)),
		_ => Err(MarkupFailure::Malformed),
	}
}

fn decode_number(text: &str) -> DecodeResult<Value> {
	let text = text.trim();
	if let Ok(i) = text.parse::<i64>() {
		return Ok(Value::Int(i));
	}
	text.parse::<f64>()
		.map(Value::Float)
		.map_err(|_| MarkupFailure::Malformed)
}

fn read_array(cur: &mut Cursor<'_>, opening: &BytesStart) -> DecodeResult<Value> {
	let declared_len = match attr_value(opening, b"length")? {
		Some(raw) => Some(raw.parse::<usize>().map_err(|_| MarkupFailure::Malformed)?),
		None => None,
	};

	let mut items = Vec::new();
	loop {
		match cur.next_event()? {
			Event::End(e) if e.name().as_ref() == b"array" => break,
			ev => items.push(read_value_from(cur, ev)?),
		}
	}

	if let Some(len) = declared_len {
		if len != items.len() {
			return Err(MarkupFailure::Malformed);
		}
	}
	Ok(Value::List(items))
}

fn read_struct(cur: &mut Cursor<'_>) -> DecodeResult<Value> {
	let mut fields = IndexMap::new();
	loop {
		match cur.next_event()? {
			Event::End(e) if e.name().as_ref() == b"struct" => break,
			Event::Start(e) if e.name().as_ref() == b"var" => {
				let name = attr_value(&e, b"name")?.ok_or(MarkupFailure::Malformed)?;
				let value = read_value(cur)?;
				cur.expect_end(b"var")?;
				fields.insert(name, value);
			}
			_ => return Err(MarkupFailure::Malformed),
		}
	}
	Ok(lift_struct(fields))
}

/// A struct whose first member is the class marker decodes as a record.
fn lift_struct(mut fields: IndexMap<String, Value>) -> Value {
	let is_record = matches!(
		fields.get_index(0),
		Some((key, Value::Str(_))) if key == CLASS_KEY
	);
	if !is_record {
		return Value::Map(fields);
	}

	let (_, class) = fields.shift_remove_index(0).expect("first entry exists");
	let class = match class {
		Value::Str(class) => class,
		_ => unreachable!("checked above"),
	};
	Value::Record(Record { class, fields })
}

fn read_value(cur: &mut Cursor<'_>) -> DecodeResult<Value> {
	let ev = cur.next_event()?;
	read_value_from(cur, ev)
}

fn read_value_from(cur: &mut Cursor<'_>, ev: Event<'_>) -> DecodeResult<Value> {
	match ev {
		Event::Empty(e) => match e.name().as_ref() {
			b"null" => Ok(Value::Null),
			b"boolean" => decode_boolean(&e),
			b"string" => Ok(Value::Str(String::new())),
			b"array" => {
				match attr_value(&e, b"length")?.as_deref() {
					None | Some("0") => Ok(Value::List(Vec::new())),
					Some(_) => Err(MarkupFailure::Malformed),
				}
			}
			b"struct" => Ok(Value::Map(IndexMap::new())),
			_ => Err(MarkupFailure::Malformed),
		},
		Event::Start(e) => match e.name().as_ref() {
			b"null" => {
				cur.expect_end(b"null")?;
				Ok(Value::Null)
			}
			b"boolean" => {
				let value = decode_boolean(&e)?;
				cur.expect_end(b"boolean")?;
				Ok(value)
			}
			b"number" => decode_number(&cur.read_text(b"number")?),
			b"string" => Ok(Value::Str(cur.read_text(b"string")?)),
			b"array" => {
				let opening = e.to_owned();
				read_array(cur, &opening)
			}
			b"struct" => read_struct(cur),
			_ => Err(MarkupFailure::Malformed),
		},
		_ => Err(MarkupFailure::Malformed),
	}
}

fn decode_packet(text: &str) -> DecodeResult<Value> {
	let mut cur = Cursor::new(text);

	match cur.next_event()? {
		Event::Start(e) if e.name().as_ref() == b"packet" => {}
		_ => return Err(MarkupFailure::Malformed),
	}

	let mut ev = cur.next_event()?;
	if let Event::Start(e) = &ev {
		if e.name().as_ref() == b"header" {
			cur.skip_to_end(b"header")?;
			ev = cur.next_event()?;
		}
	}

	match ev {
		Event::Start(e) if e.name().as_ref() == b"data" => {}
		_ => return Err(MarkupFailure::Malformed),
	}

	let value = read_value(&mut cur)?;
	cur.expect_end(b"data")?;
	cur.expect_end(b"packet")?;
	match cur.next_event()? {
		Event::Eof => Ok(value),
		_ => Err(MarkupFailure::Malformed),
	}
}

/// Whether the document, stripped of inter-element whitespace, is a packet
/// whose data holds a single null node. Deliberately forgiving: this runs
/// only after the strict decoder has failed.
fn packet_holds_null(text: &str) -> bool {
	let mut compact = String::with_capacity(text.len());
	let mut in_tag = false;
	for c in text.chars() {
		match c {
			'<' => in_tag = true,
			'>' => in_tag = false,
			_ => {}
		}
		if in_tag || !c.is_whitespace() {
			compact.push(c);
		}
	}
	compact.contains("<data><null/></data>")
}

fn write_value(value: &Value, out: &mut String) -> SerializerResult<()> {
	match value {
		Value::Null => out.push_str("<null/>"),
		Value::Bool(b) => out.push_str(&format!("<boolean value='{b}'/>")),
		Value::Int(i) => out.push_str(&format!("<number>{i}</number>")),
		Value::Float(f) => {
			if !f.is_finite() {
				return Err(SerializerError::Serialization(
					"non-finite floats cannot be represented in a packet".to_string(),
				));
			}
			out.push_str(&format!("<number>{f:?}</number>"));
		}
		Value::Str(s) => {
			out.push_str("<string>");
			out.push_str(&escape(s.as_str()));
			out.push_str("</string>");
		}
		Value::List(items) => {
			out.push_str(&format!("<array length='{}'>", items.len()));
			for item in items {
				write_value(item, out)?;
			}
			out.push_str("</array>");
		}
		Value::Map(map) => {
			out.push_str("<struct>");
			for (key, item) in map {
				write_var(key, item, out)?;
			}
			out.push_str("</struct>");
		}
		Value::Record(record) | Value::Opaque(record) => {
			out.push_str("<struct>");
			write_var(CLASS_KEY, &Value::Str(record.class.clone()), out)?;
			for (key, item) in &record.fields {
				write_var(key, item, out)?;
			}
			out.push_str("</struct>");
		}
	}
	Ok(())
}

fn write_var(name: &str, value: &Value, out: &mut String) -> SerializerResult<()> {
	out.push_str(&format!("<var name='{}'>", escape(name)));
	write_value(value, out)?;
	out.push_str("</var>");
	Ok(())
}

/// Serializer for the legacy XML packet envelope
///
/// # Example
///
/// ```rust
/// use grappelli::adapter::{Adapter, MarkupAdapter};
/// use grappelli::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let adapter = MarkupAdapter::new();
/// let bytes = adapter.serialize(&Value::from("test"))?;
/// assert_eq!(adapter.unserialize(&bytes)?, Value::from("test"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MarkupAdapter {
	options: MarkupOptions,
}

impl MarkupAdapter {
	/// Create a markup packet adapter with default options
	pub fn new() -> Self {
		Self::with_options(MarkupOptions::default())
	}

	/// Create a markup packet adapter with the given options
	pub fn with_options(options: MarkupOptions) -> Self {
		tracing::warn!(
			"the markup packet format is deprecated; prefer json or a binary adapter"
		);
		Self { options }
	}

	/// The adapter's options
	pub fn options(&self) -> &MarkupOptions {
		&self.options
	}
}

impl Adapter for MarkupAdapter {
	fn name(&self) -> &'static str {
		"markup"
	}

	fn configure(&mut self, options: &OptionMap) -> SerializerResult<()> {
		self.options.apply(options)
	}

	fn serialize(&self, value: &Value) -> SerializerResult<Vec<u8>> {
		let mut out = String::new();
		out.push_str(&format!("<packet version='{}'>", self.options.version));
		if !self.options.comment.is_empty() {
			out.push_str(&format!(
				"<header><comment>{}</comment></header>",
				escape(self.options.comment.as_str())
			));
		}
		out.push_str("<data>");
		write_value(value, &mut out)?;
		out.push_str("</data></packet>");
		Ok(out.into_bytes())
	}

	fn unserialize(&self, form: &[u8]) -> SerializerResult<Value> {
		let text = std::str::from_utf8(form)
			.map_err(|_| SerializerError::Validation("packet must be UTF-8 text".to_string()))?;

		match decode_packet(text) {
			Ok(value) => Ok(value),
			Err(MarkupFailure::Doctype) => Err(SerializerError::Validation(
				"packet contains an illegal DOCTYPE declaration".to_string(),
			)),
			Err(MarkupFailure::Malformed) => {
				if packet_holds_null(text) {
					Ok(Value::Null)
				} else {
					Err(SerializerError::Deserialization(
						"malformed packet".to_string(),
					))
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Value::Null)]
	#[case(Value::Bool(true))]
	#[case(Value::Bool(false))]
	#[case(Value::Int(100))]
	#[case(Value::Float(1.5))]
	#[case(Value::from("test"))]
	#[case(Value::from(" padded "))]
	#[case(Value::from(""))]
	#[case(Value::List(Vec::new()))]
	#[case(Value::Map(IndexMap::new()))]
	#[case(Value::Record(Record::new("blog.Post").with_field("title", "hello")))]
	fn values_round_trip(#[case] value: Value) {
		let adapter = MarkupAdapter::new();
		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(adapter.unserialize(&bytes).unwrap(), value, "{:?}", value);
	}

	#[rstest]
	fn string_packet_has_the_expected_shape() {
		let adapter = MarkupAdapter::new();
		let bytes = adapter.serialize(&Value::from("a<b")).unwrap();
		assert_eq!(
			bytes,
			b"<packet version='1.0'><data><string>a&lt;b</string></data></packet>"
		);
	}

	#[rstest]
	fn comment_emits_a_header() {
		let mut options = MarkupOptions::default();
		options.set_comment("export");
		let adapter = MarkupAdapter::with_options(options);

		let text = String::from_utf8(adapter.serialize(&Value::Null).unwrap()).unwrap();
		assert!(text.contains("<header><comment>export</comment></header>"));
		assert_eq!(adapter.unserialize(text.as_bytes()).unwrap(), Value::Null);
	}

	#[rstest]
	fn headerless_packets_omit_the_header() {
		let adapter = MarkupAdapter::new();
		let text = String::from_utf8(adapter.serialize(&Value::Null).unwrap()).unwrap();
		assert!(!text.contains("<header>"));
	}

	#[rstest]
	fn nested_containers_round_trip() {
		let mut map = IndexMap::new();
		map.insert("items".to_string(), Value::List(vec![Value::Int(1), Value::Null]));
		map.insert(
			"post".to_string(),
			Value::Record(Record::new("blog.Post").with_field("title", "hello")),
		);
		let value = Value::Map(map);

		let adapter = MarkupAdapter::new();
		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(adapter.unserialize(&bytes).unwrap(), value);
	}

	#[rstest]
	fn declarations_and_whitespace_are_tolerated() {
		let adapter = MarkupAdapter::new();
		let text = "<?xml version='1.0'?>\n<packet version='1.0'>\n  <data>\n    <number>7</number>\n  </data>\n</packet>\n";
		assert_eq!(adapter.unserialize(text.as_bytes()).unwrap(), Value::Int(7));
	}

	#[rstest]
	fn doctype_is_rejected() {
		let adapter = MarkupAdapter::new();
		let text = "<!DOCTYPE packet [<!ENTITY x 'y'>]><packet version='1.0'><data><null/></data></packet>";
		let result = adapter.unserialize(text.as_bytes());
		assert!(matches!(result, Err(SerializerError::Validation(_))));
	}

	#[rstest]
	#[case(b"<packet version='1.0'><data>".as_slice())]
	#[case(b"<packet version='1.0'><data><bogus/></data></packet>".as_slice())]
	#[case(b"not markup at all".as_slice())]
	fn malformed_packets_are_decode_errors(#[case] form: &[u8]) {
		let adapter = MarkupAdapter::new();
		let result = adapter.unserialize(form);
		assert!(matches!(result, Err(SerializerError::Deserialization(_))));
	}

	#[rstest]
	fn array_length_mismatch_is_malformed() {
		let adapter = MarkupAdapter::new();
		let text = "<packet version='1.0'><data><array length='3'><number>1</number></array></data></packet>";
		let result = adapter.unserialize(text.as_bytes());
		assert!(matches!(result, Err(SerializerError::Deserialization(_))));
	}

	#[rstest]
	fn unsupported_version_is_rejected() {
		let mut options = MarkupOptions::default();
		let result = options.set_version("2.0");
		assert!(matches!(result, Err(SerializerError::Validation(_))));
	}

	#[rstest]
	fn version_option_is_validated_through_the_map() {
		let mut map = OptionMap::new();
		map.insert("version".to_string(), Value::from("2.0"));

		let mut adapter = MarkupAdapter::new();
		let result = adapter.configure(&map);
		assert!(matches!(result, Err(SerializerError::Validation(_))));
	}
}

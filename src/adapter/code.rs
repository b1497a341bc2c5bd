//! Code-literal adapter
//!
//! Serializes a value as a Rust-flavoured literal expression (`None`,
//! `true`, `[1, 2]`, `{"key": "value"}`, `blog.Post { title: "x" }`) and
//! deserializes by evaluating that literal through a restricted two-phase
//! path: a grammar pass building a literal AST, then an evaluation pass
//! producing a [`Value`]. The two failure classes are reported distinctly —
//! `syntax error: …` for grammar violations, `evaluation failed: …` for
//! overflowing integers, invalid escapes or duplicate keys — each carrying
//! the last diagnostic of the failing phase.
//!
//! # Security
//!
//! This format exists for exporting values into source code and fixtures.
//! Unserializing executes the input as a literal expression; do NOT feed it
//! untrusted input. The evaluator only accepts literals — it has no
//! identifiers, calls or operators — but the format's purpose is code, and
//! it is documented as unsafe for untrusted decode rather than hardened.

use crate::adapter::Adapter;
use crate::error::{SerializerError, SerializerResult};
use crate::options::{AdapterOptions, BasicOptions, OptionMap};
use crate::value::{Record, Value};
use indexmap::IndexMap;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, multispace0, one_of, satisfy};
use nom::combinator::{map, not, opt, recognize, value};
use nom::multi::{separated_list0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{IResult, Parser};
use once_cell::sync::Lazy;
use regex::Regex;

/// Fast-reject gate: the first significant byte must open a known literal.
static LITERAL_GATE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r#"^\s*[-0-9"\[{A-Za-z_]"#).expect("gate pattern is valid"));

/// Literal AST produced by the grammar pass. Numeric and string payloads
/// stay raw so conversion failures surface as evaluation errors.
#[derive(Debug, Clone)]
enum Expr {
	Null,
	Bool(bool),
	Int(String),
	Float(String),
	Str(String),
	List(Vec<Expr>),
	Map(Vec<(String, Expr)>),
	Record(String, Vec<(Key, Expr)>),
}

#[derive(Debug, Clone)]
enum Key {
	Ident(String),
	Quoted(String),
}

type PResult<'a, T> = IResult<&'a str, T>;

fn sp(input: &str) -> PResult<'_, &str> {
	multispace0(input)
}

/// Raw string body between quotes, escapes undecoded.
fn string_raw(input: &str) -> PResult<'_, String> {
	let (rest, _) = char('"').parse(input)?;
	let mut escaped = false;
	for (idx, c) in rest.char_indices() {
		if escaped {
			escaped = false;
			continue;
		}
		match c {
			'\\' => escaped = true,
			'"' => return Ok((&rest[idx + 1..], rest[..idx].to_string())),
			_ => {}
		}
	}
	Err(nom::Err::Failure(nom::error::Error::new(
		rest,
		nom::error::ErrorKind::Char,
	)))
}

fn string_expr(input: &str) -> PResult<'_, Expr> {
	map(string_raw, Expr::Str).parse(input)
}

fn number_expr(input: &str) -> PResult<'_, Expr> {
	let (rest, raw) = recognize((
		opt(char('-')),
		digit1,
		opt((char('.'), digit1)),
		opt((one_of("eE"), opt(one_of("+-")), digit1)),
	))
	.parse(input)?;

	let expr = if raw.contains(['.', 'e', 'E']) {
		Expr::Float(raw.to_string())
	} else {
		Expr::Int(raw.to_string())
	};
	Ok((rest, expr))
}

fn keyword_expr(input: &str) -> PResult<'_, Expr> {
	terminated(
		alt((
			value(Expr::Null, tag("None")),
			value(Expr::Bool(true), tag("true")),
			value(Expr::Bool(false), tag("false")),
		)),
		not(satisfy(|c: char| c.is_ascii_alphanumeric() || c == '_')),
	)
	.parse(input)
}

fn ident(input: &str) -> PResult<'_, &str> {
	recognize(pair(
		satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
		nom::bytes::complete::take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
	))
	.parse(input)
}

fn ident_path(input: &str) -> PResult<'_, &str> {
	recognize(separated_list1(char('.'), ident)).parse(input)
}

fn list_expr(input: &str) -> PResult<'_, Expr> {
	map(
		delimited(
			char('['),
			terminated(
				separated_list0(preceded(sp, char(',')), literal),
				opt(preceded(sp, char(','))),
			),
			preceded(sp, char(']')),
		),
		Expr::List,
	)
	.parse(input)
}

fn map_entry(input: &str) -> PResult<'_, (String, Expr)> {
	let (input, key) = preceded(sp, string_raw).parse(input)?;
	let (input, _) = preceded(sp, char(':')).parse(input)?;
	let (input, item) = literal(input)?;
	Ok((input, (key, item)))
}

fn map_expr(input: &str) -> PResult<'_, Expr> {
	map(
		delimited(
			char('{'),
			terminated(
				separated_list0(preceded(sp, char(',')), map_entry),
				opt(preceded(sp, char(','))),
			),
			preceded(sp, char('}')),
		),
		Expr::Map,
	)
	.parse(input)
}

fn record_field(input: &str) -> PResult<'_, (Key, Expr)> {
	let (input, key) = preceded(
		sp,
		alt((
			map(string_raw, Key::Quoted),
			map(ident, |s: &str| Key::Ident(s.to_string())),
		)),
	)
	.parse(input)?;
	let (input, _) = preceded(sp, char(':')).parse(input)?;
	let (input, item) = literal(input)?;
	Ok((input, (key, item)))
}

fn record_expr(input: &str) -> PResult<'_, Expr> {
	let (input, class) = ident_path(input)?;
	let (input, _) = preceded(sp, char('{')).parse(input)?;
	let (input, fields) = terminated(
		separated_list0(preceded(sp, char(',')), record_field),
		opt(preceded(sp, char(','))),
	)
	.parse(input)?;
	let (input, _) = preceded(sp, char('}')).parse(input)?;
	Ok((input, Expr::Record(class.to_string(), fields)))
}

fn literal(input: &str) -> PResult<'_, Expr> {
	preceded(
		sp,
		alt((
			string_expr,
			list_expr,
			map_expr,
			keyword_expr,
			number_expr,
			record_expr,
		)),
	)
	.parse(input)
}

/// Grammar pass. The returned diagnostic names the failing offset.
fn parse_literal(text: &str) -> Result<Expr, String> {
	match terminated(literal, sp).parse(text) {
		Ok(("", expr)) => Ok(expr),
		Ok((rest, _)) => Err(format!(
			"unexpected trailing characters at offset {}",
			text.len() - rest.len()
		)),
		Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(format!(
			"unexpected input at offset {}",
			text.len() - e.input.len()
		)),
		Err(nom::Err::Incomplete(_)) => Err("incomplete input".to_string()),
	}
}

fn decode_escapes(raw: &str) -> Result<String, String> {
	let mut out = String::with_capacity(raw.len());
	let mut chars = raw.chars();
	while let Some(c) = chars.next() {
		if c != '\\' {
			out.push(c);
			continue;
		}
		match chars.next() {
			Some('n') => out.push('\n'),
			Some('r') => out.push('\r'),
			Some('t') => out.push('\t'),
			Some('0') => out.push('\0'),
			Some('\\') => out.push('\\'),
			Some('"') => out.push('"'),
			Some('\'') => out.push('\''),
			Some('u') => {
				if chars.next() != Some('{') {
					return Err("malformed \\u escape: expected '{'".to_string());
				}
				let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
				let code = u32::from_str_radix(&hex, 16)
					.map_err(|_| format!("malformed \\u escape: '{hex}' is not hex"))?;
				let decoded = char::from_u32(code)
					.ok_or_else(|| format!("\\u escape {code:#x} is not a scalar value"))?;
				out.push(decoded);
			}
			Some(other) => return Err(format!("unknown escape sequence '\\{other}'")),
			None => return Err("dangling escape at end of string".to_string()),
		}
	}
	Ok(out)
}

/// Evaluation pass: literal AST to value.
fn eval(expr: Expr) -> Result<Value, String> {
	match expr {
		Expr::Null => Ok(Value::Null),
		Expr::Bool(b) => Ok(Value::Bool(b)),
		Expr::Int(raw) => raw
			.parse::<i64>()
			.map(Value::Int)
			.map_err(|_| format!("integer literal '{raw}' is out of range")),
		Expr::Float(raw) => raw
			.parse::<f64>()
			.map(Value::Float)
			.map_err(|_| format!("float literal '{raw}' is invalid")),
		Expr::Str(raw) => decode_escapes(&raw).map(Value::Str),
		Expr::List(items) => items
			.into_iter()
			.map(eval)
			.collect::<Result<Vec<_>, _>>()
			.map(Value::List),
		Expr::Map(entries) => {
			let mut out = IndexMap::with_capacity(entries.len());
			for (raw_key, item) in entries {
				let key = decode_escapes(&raw_key)?;
				if out.insert(key.clone(), eval(item)?).is_some() {
					return Err(format!("duplicate key '{key}'"));
				}
			}
			Ok(Value::Map(out))
		}
		Expr::Record(class, fields) => {
			let mut out = IndexMap::with_capacity(fields.len());
			for (key, item) in fields {
				let key = match key {
					Key::Ident(name) => name,
					Key::Quoted(raw) => decode_escapes(&raw)?,
				};
				if out.insert(key.clone(), eval(item)?).is_some() {
					return Err(format!("duplicate field '{key}' in record '{class}'"));
				}
			}
			Ok(Value::Record(Record {
				class,
				fields: out,
			}))
		}
	}
}

fn is_ident(text: &str) -> bool {
	let mut chars = text.chars();
	matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_ident_path(text: &str) -> bool {
	!text.is_empty() && text.split('.').all(is_ident)
}

fn render_string(s: &str, out: &mut String) {
	out.push('"');
	for c in s.chars() {
		match c {
			'"' => out.push_str("\\\""),
			'\\' => out.push_str("\\\\"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\t' => out.push_str("\\t"),
			c if (c as u32) < 0x20 => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
			c => out.push(c),
		}
	}
	out.push('"');
}

fn render(value: &Value, out: &mut String) -> SerializerResult<()> {
	match value {
		Value::Null => out.push_str("None"),
		Value::Bool(true) => out.push_str("true"),
		Value::Bool(false) => out.push_str("false"),
		Value::Int(i) => out.push_str(&i.to_string()),
		Value::Float(f) => {
			if !f.is_finite() {
				return Err(SerializerError::Serialization(
					"non-finite floats cannot be rendered as literals".to_string(),
				));
			}
			out.push_str(&format!("{f:?}"));
		}
		Value::Str(s) => render_string(s, out),
		Value::List(items) => {
			out.push('[');
			for (idx, item) in items.iter().enumerate() {
				if idx > 0 {
					out.push_str(", ");
				}
				render(item, out)?;
			}
			out.push(']');
		}
		Value::Map(map) => {
			out.push('{');
			for (idx, (key, item)) in map.iter().enumerate() {
				if idx > 0 {
					out.push_str(", ");
				}
				render_string(key, out);
				out.push_str(": ");
				render(item, out)?;
			}
			out.push('}');
		}
		Value::Record(record) | Value::Opaque(record) => {
			if !is_ident_path(&record.class) {
				return Err(SerializerError::Serialization(format!(
					"record class '{}' cannot be rendered as a literal",
					record.class
				)));
			}
			out.push_str(&record.class);
			out.push_str(" { ");
			for (idx, (key, item)) in record.fields.iter().enumerate() {
				if idx > 0 {
					out.push_str(", ");
				}
				if is_ident(key) {
					out.push_str(key);
				} else {
					render_string(key, out);
				}
				out.push_str(": ");
				render(item, out)?;
			}
			out.push_str(" }");
		}
	}
	Ok(())
}

/// Literal export serializer
///
/// # Example
///
/// ```rust
/// use grappelli::adapter::{Adapter, CodeAdapter};
/// use grappelli::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let adapter = CodeAdapter::new();
/// let bytes = adapter.serialize(&Value::List(vec![Value::Int(1), Value::Null]))?;
/// assert_eq!(bytes, b"[1, None]");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CodeAdapter {
	options: BasicOptions,
}

impl CodeAdapter {
	/// Create a code-literal adapter
	pub fn new() -> Self {
		Self::default()
	}
}

impl Adapter for CodeAdapter {
	fn name(&self) -> &'static str {
		"code"
	}

	fn configure(&mut self, options: &OptionMap) -> SerializerResult<()> {
		self.options.apply(options)
	}

	fn serialize(&self, value: &Value) -> SerializerResult<Vec<u8>> {
		let mut out = String::new();
		render(value, &mut out)?;
		Ok(out.into_bytes())
	}

	fn unserialize(&self, form: &[u8]) -> SerializerResult<Value> {
		let text = std::str::from_utf8(form).map_err(|_| {
			SerializerError::Validation("code literal must be UTF-8 text".to_string())
		})?;

		if !LITERAL_GATE.is_match(text) {
			return Err(SerializerError::Validation(
				"input does not begin with a recognized literal token".to_string(),
			));
		}

		let ast = parse_literal(text)
			.map_err(|diag| SerializerError::Deserialization(format!("syntax error: {diag}")))?;
		eval(ast).map_err(|diag| {
			SerializerError::Deserialization(format!("evaluation failed: {diag}"))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Value::Null, "None")]
	#[case(Value::Bool(true), "true")]
	#[case(Value::Bool(false), "false")]
	#[case(Value::Int(100), "100")]
	#[case(Value::Float(1.5), "1.5")]
	#[case(Value::Float(100.0), "100.0")]
	#[case(Value::from("test"), "\"test\"")]
	fn scalars_render_and_evaluate(#[case] value: Value, #[case] expected: &str) {
		let adapter = CodeAdapter::new();
		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(bytes, expected.as_bytes());
		assert_eq!(adapter.unserialize(&bytes).unwrap(), value);
	}

	#[rstest]
	fn containers_round_trip() {
		let mut map = IndexMap::new();
		map.insert("list".to_string(), Value::List(vec![Value::Int(1), Value::Null]));
		map.insert("quote\"key".to_string(), Value::from("x\ny"));
		let value = Value::Map(map);

		let adapter = CodeAdapter::new();
		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(adapter.unserialize(&bytes).unwrap(), value);
	}

	#[rstest]
	fn records_render_as_struct_literals() {
		let value = Value::Record(Record::new("blog.Post").with_field("title", "hello"));
		let adapter = CodeAdapter::new();

		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(bytes, br#"blog.Post { title: "hello" }"#);
		assert_eq!(adapter.unserialize(&bytes).unwrap(), value);
	}

	#[rstest]
	fn repeated_keywords_evaluate_independently() {
		let adapter = CodeAdapter::new();
		let back = adapter.unserialize(b"[None, true, false, None, true]").unwrap();
		assert_eq!(
			back,
			Value::List(vec![
				Value::Null,
				Value::Bool(true),
				Value::Bool(false),
				Value::Null,
				Value::Bool(true),
			])
		);
	}

	#[rstest]
	fn trailing_commas_are_accepted() {
		let adapter = CodeAdapter::new();
		let back = adapter.unserialize(b"[1, 2,]").unwrap();
		assert_eq!(back, Value::List(vec![Value::Int(1), Value::Int(2)]));
	}

	#[rstest]
	fn gate_rejects_unknown_openers() {
		let adapter = CodeAdapter::new();
		let result = adapter.unserialize(b"% not a literal");
		assert!(matches!(result, Err(SerializerError::Validation(_))));
	}

	#[rstest]
	fn grammar_violations_report_syntax_errors() {
		let adapter = CodeAdapter::new();
		let err = adapter.unserialize(b"[1, ").unwrap_err();
		assert!(err.to_string().contains("syntax error"), "{err}");
	}

	#[rstest]
	#[case(b"99999999999999999999999".as_slice())]
	#[case(br#""bad \q escape""#.as_slice())]
	#[case(br#"{"k": 1, "k": 2}"#.as_slice())]
	fn bad_literals_report_evaluation_failures(#[case] form: &[u8]) {
		let adapter = CodeAdapter::new();
		let err = adapter.unserialize(form).unwrap_err();
		assert!(err.to_string().contains("evaluation failed"), "{err}");
	}

	#[rstest]
	fn non_finite_floats_cannot_be_exported() {
		let adapter = CodeAdapter::new();
		let result = adapter.serialize(&Value::Float(f64::NAN));
		assert!(matches!(result, Err(SerializerError::Serialization(_))));
	}

	#[rstest]
	fn keywords_do_not_swallow_identifier_prefixes() {
		let adapter = CodeAdapter::new();
		// "Nonempty" is no keyword and no record follows, so this is a
		// grammar failure rather than None plus trailing junk.
		let err = adapter.unserialize(b"Nonempty").unwrap_err();
		assert!(err.to_string().contains("syntax error"), "{err}");
	}
}

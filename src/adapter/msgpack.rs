//! MessagePack adapter (requires the `msgpack` feature)
//!
//! Compact binary map format via rmp-serde. The backing format's historical
//! failure indicator is the same byte as an encoded integer zero, so the
//! encoding of `0` is cached once and compared before the decoder runs: a
//! legitimate zero payload always decodes as zero, never as a failure.

use crate::adapter::Adapter;
use crate::error::{SerializerError, SerializerResult};
use crate::options::{AdapterOptions, BasicOptions, OptionMap};
use crate::value::Value;
use once_cell::sync::Lazy;

/// Ambiguous failure indicator: the MessagePack encoding of integer `0`.
static SERIALIZED_ZERO: Lazy<Vec<u8>> =
	Lazy::new(|| rmp_serde::to_vec(&Value::Int(0)).expect("encoding an integer cannot fail"));

/// MessagePack serializer
///
/// # Example
///
/// ```rust
/// use grappelli::adapter::{Adapter, MsgPackAdapter};
/// use grappelli::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let adapter = MsgPackAdapter::new();
/// let bytes = adapter.serialize(&Value::Int(100))?;
/// assert_eq!(adapter.unserialize(&bytes)?, Value::Int(100));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MsgPackAdapter {
	options: BasicOptions,
}

impl MsgPackAdapter {
	/// Create a MessagePack adapter
	pub fn new() -> Self {
		Lazy::force(&SERIALIZED_ZERO);
		Self::default()
	}
}

impl Adapter for MsgPackAdapter {
	fn name(&self) -> &'static str {
		"msgpack"
	}

	fn configure(&mut self, options: &OptionMap) -> SerializerResult<()> {
		self.options.apply(options)
	}

	fn serialize(&self, value: &Value) -> SerializerResult<Vec<u8>> {
		rmp_serde::to_vec(value)
			.map_err(|e| SerializerError::Serialization(format!("MessagePack encode error: {e}")))
	}

	fn unserialize(&self, form: &[u8]) -> SerializerResult<Value> {
		// A legitimately encoded zero must short-circuit here.
		if form == SERIALIZED_ZERO.as_slice() {
			return Ok(Value::Int(0));
		}

		rmp_serde::from_slice(form)
			.map_err(|e| SerializerError::Deserialization(format!("MessagePack decode error: {e}")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Record;
	use rstest::rstest;

	#[rstest]
	#[case(Value::Null)]
	#[case(Value::Bool(true))]
	#[case(Value::Bool(false))]
	#[case(Value::Int(100))]
	#[case(Value::from("test"))]
	#[case(Value::Record(Record::new("blog.Post").with_field("title", "hello")))]
	fn values_round_trip(#[case] value: Value) {
		let adapter = MsgPackAdapter::new();
		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(adapter.unserialize(&bytes).unwrap(), value);
	}

	#[rstest]
	fn encoded_zero_is_not_a_decode_failure() {
		let adapter = MsgPackAdapter::new();
		let bytes = adapter.serialize(&Value::Int(0)).unwrap();
		assert_eq!(bytes, *SERIALIZED_ZERO);
		assert_eq!(adapter.unserialize(&bytes).unwrap(), Value::Int(0));
	}

	#[rstest]
	fn malformed_input_is_a_decode_error() {
		let adapter = MsgPackAdapter::new();
		// 0xc1 is reserved and never valid MessagePack.
		let result = adapter.unserialize(&[0xc1, 0x00]);
		assert!(matches!(result, Err(SerializerError::Deserialization(_))));
	}

	#[rstest]
	fn options_are_rejected() {
		let mut map = OptionMap::new();
		map.insert("anything".to_string(), Value::Bool(true));
		let mut adapter = MsgPackAdapter::new();
		assert!(adapter.configure(&map).is_err());
	}
}

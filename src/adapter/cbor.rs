//! CBOR adapter (requires the `cbor` feature)
//!
//! RFC 8949 compact binary format via ciborium. The backing format's
//! historical failure indicator is the same byte as an encoded null, so the
//! encoding of null (`0xf6`) is cached once and compared before the decoder
//! runs: a genuine null payload always decodes as null, never as a failure.

use crate::adapter::Adapter;
use crate::error::{SerializerError, SerializerResult};
use crate::options::{AdapterOptions, BasicOptions, OptionMap};
use crate::value::Value;
use once_cell::sync::Lazy;

/// Ambiguous failure indicator: the CBOR encoding of null.
static SERIALIZED_NULL: Lazy<Vec<u8>> = Lazy::new(|| {
	let mut buf = Vec::new();
	ciborium::ser::into_writer(&Value::Null, &mut buf).expect("encoding null cannot fail");
	buf
});

/// CBOR serializer
///
/// # Example
///
/// ```rust
/// use grappelli::adapter::{Adapter, CborAdapter};
/// use grappelli::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let adapter = CborAdapter::new();
/// let bytes = adapter.serialize(&Value::from("test"))?;
/// assert_eq!(adapter.unserialize(&bytes)?, Value::from("test"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CborAdapter {
	options: BasicOptions,
}

impl CborAdapter {
	/// Create a CBOR adapter
	pub fn new() -> Self {
		Lazy::force(&SERIALIZED_NULL);
		Self::default()
	}
}

impl Adapter for CborAdapter {
	fn name(&self) -> &'static str {
		"cbor"
	}

	fn configure(&mut self, options: &OptionMap) -> SerializerResult<()> {
		self.options.apply(options)
	}

	fn serialize(&self, value: &Value) -> SerializerResult<Vec<u8>> {
		let mut buf = Vec::new();
		ciborium::ser::into_writer(value, &mut buf)
			.map_err(|e| SerializerError::Serialization(format!("CBOR encode error: {e}")))?;
		Ok(buf)
	}

	fn unserialize(&self, form: &[u8]) -> SerializerResult<Value> {
		// A genuine null payload must short-circuit here.
		if form == SERIALIZED_NULL.as_slice() {
			return Ok(Value::Null);
		}

		ciborium::de::from_reader(form)
			.map_err(|e| SerializerError::Deserialization(format!("CBOR decode error: {e}")))
	}
}

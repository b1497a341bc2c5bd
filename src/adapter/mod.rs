//! Format adapters
//!
//! One adapter per serialization format, each exposing the same
//! serialize/unserialize pair over [`Value`]. Adapters are stateless across
//! calls except for their held options, and every adapter is `Send + Sync`,
//! so instances shared through the registry's `get` cache are safe for
//! concurrent use without external locking.
//!
//! ## Available adapters
//!
//! - [`NativeAdapter`] (always available): full-lattice binary format with a
//!   class allow-list for untrusted record decoding
//! - [`JsonAdapter`] (always available): human-readable, widely compatible
//! - [`CodeAdapter`] (always available): literal export; decode executes the
//!   literal and is NOT safe for untrusted input
//! - [`MsgPackAdapter`] (feature: `msgpack`): compact binary map format
//! - [`CborAdapter`] (feature: `cbor`): RFC 8949 compact binary format
//! - [`MarkupAdapter`] (feature: `markup`): legacy XML envelope, deprecated

use crate::error::SerializerResult;
use crate::options::OptionMap;
use crate::value::Value;

mod code;
mod json;
mod native;

pub use code::CodeAdapter;
pub use json::{JsonAdapter, JsonOptions, ObjectDecodeType};
pub use native::{ClassAllowlist, NativeAdapter, NativeOptions};

#[cfg(feature = "msgpack")]
mod msgpack;
#[cfg(feature = "msgpack")]
pub use msgpack::MsgPackAdapter;

#[cfg(feature = "cbor")]
mod cbor;
#[cfg(feature = "cbor")]
pub use cbor::CborAdapter;

#[cfg(feature = "markup")]
mod markup;
#[cfg(feature = "markup")]
pub use markup::{MarkupAdapter, MarkupOptions};

/// The capability every serialization format implements.
///
/// # Example
///
/// ```rust
/// use grappelli::adapter::{Adapter, JsonAdapter};
/// use grappelli::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let adapter = JsonAdapter::new();
/// let bytes = adapter.serialize(&Value::from("test"))?;
/// assert_eq!(adapter.unserialize(&bytes)?, Value::from("test"));
/// # Ok(())
/// # }
/// ```
pub trait Adapter: Send + Sync {
	/// The canonical identifier this adapter type registers under
	fn name(&self) -> &'static str;

	/// Apply a structured option map, validating every entry
	fn configure(&mut self, options: &OptionMap) -> SerializerResult<()>;

	/// Generate a storable representation of a value
	fn serialize(&self, value: &Value) -> SerializerResult<Vec<u8>>;

	/// Reconstruct a value from its stored representation
	fn unserialize(&self, form: &[u8]) -> SerializerResult<Value>;
}

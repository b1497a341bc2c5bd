//! Uniform serialization facade
//!
//! One [`Value`] data model, many wire formats. Every format is an
//! [`adapter::Adapter`] with the same serialize/unserialize pair, adapters
//! are created by name through an [`AdapterRegistry`], and a process-wide
//! [`facade`] serves callers that just want `serialize(&value)` with a
//! configurable default format.
//!
//! # Round-trip contract
//!
//! For every adapter and every representable value,
//! `unserialize(serialize(v)) == v`. Formats whose historical failure
//! indicator collides with a legitimate encoding (an encoded `false`, `0`
//! or null depending on the format) compare the input against that cached
//! encoding before decoding, so those payloads never surface as errors.
//!
//! # Example
//!
//! ```rust
//! use grappelli::{facade, Value};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = facade::serialize_with("json", &Value::from("test"), None)?;
//! assert_eq!(
//! 	facade::unserialize_with("json", &bytes, None)?,
//! 	Value::from("test")
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! - `msgpack`: the MessagePack adapter (default)
//! - `cbor`: the CBOR adapter (default)
//! - `markup`: the legacy XML packet adapter (default)
//!
//! Disabled adapters stay registered under their names and fail with
//! [`SerializerError::Unsupported`] when built.

pub mod adapter;
pub mod error;
pub mod facade;
pub mod options;
pub mod registry;
pub mod value;

pub use error::{SerializerError, SerializerResult};
pub use options::{AdapterOptions, BasicOptions, OptionMap};
pub use registry::{AdapterFactory, AdapterRegistry, AdapterSource, RegistryConfig};
pub use value::{Record, Value, CLASS_KEY};

//! Error taxonomy for the serialization facade
//!
//! Every operation fails synchronously with one of these variants; no
//! operation swallows a failure and returns a sentinel value instead.

use thiserror::Error;

/// Errors raised by adapters, the registry and the facade
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SerializerError {
	/// A structurally invalid configuration value, or input rejected by a
	/// format pre-check before the underlying codec ran
	#[error("validation failed: {0}")]
	Validation(String),

	/// The underlying codec could not encode the value
	#[error("serialization failed: {0}")]
	Serialization(String),

	/// The underlying codec could not decode the input
	#[error("unserialization failed: {0}")]
	Deserialization(String),

	/// The registry produced or was asked for something violating the
	/// adapter contract, or an unknown adapter name was requested
	#[error("adapter configuration error: {0}")]
	Configuration(String),

	/// A requested capability is unavailable in this build
	#[error("unsupported feature: {0}")]
	Unsupported(String),
}

/// Result alias used throughout the crate
pub type SerializerResult<T> = Result<T, SerializerError>;

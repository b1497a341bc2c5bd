//! Process-wide serialization facade
//!
//! Free functions over one shared registry and one default adapter, for
//! callers that want `serialize(&value)` without carrying a registry around.
//! The default adapter starts as the name `native` and is resolved through
//! the registry on first use, so a factory registered for `native` before
//! that first call takes effect.
//!
//! All facade state lives behind a process-wide lock; tests that touch it
//! should run serially and call [`reset_registry`] to restore a pristine
//! state.

use crate::adapter::Adapter;
use crate::error::SerializerResult;
use crate::options::OptionMap;
use crate::registry::AdapterRegistry;
use crate::value::Value;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

const DEFAULT_ADAPTER_NAME: &str = "native";

/// The default adapter is stored unresolved until first use.
enum DefaultSlot {
	Name(String),
	Ready(Arc<dyn Adapter>),
}

struct FacadeState {
	registry: Arc<AdapterRegistry>,
	default: DefaultSlot,
}

static STATE: Lazy<RwLock<FacadeState>> = Lazy::new(|| {
	RwLock::new(FacadeState {
		registry: Arc::new(AdapterRegistry::with_defaults()),
		default: DefaultSlot::Name(DEFAULT_ADAPTER_NAME.to_string()),
	})
});

/// An adapter given either by lookup name or as a ready instance
pub enum AdapterSpec {
	/// Resolve through the registry
	Name(String),
	/// Use this instance as-is
	Instance(Arc<dyn Adapter>),
}

impl From<&str> for AdapterSpec {
	fn from(name: &str) -> Self {
		AdapterSpec::Name(name.to_string())
	}
}

impl From<String> for AdapterSpec {
	fn from(name: String) -> Self {
		AdapterSpec::Name(name)
	}
}

impl From<Arc<dyn Adapter>> for AdapterSpec {
	fn from(adapter: Arc<dyn Adapter>) -> Self {
		AdapterSpec::Instance(adapter)
	}
}

/// Create an adapter from a name or pass an instance through.
///
/// Options only apply when building by name; combining them with an
/// existing instance is a configuration error because a shared instance
/// cannot be reconfigured.
pub fn factory(
	spec: impl Into<AdapterSpec>,
	options: Option<&OptionMap>,
) -> SerializerResult<Arc<dyn Adapter>> {
	match spec.into() {
		AdapterSpec::Instance(adapter) => {
			if options.is_some_and(|map| !map.is_empty()) {
				return Err(crate::error::SerializerError::Configuration(
					"options cannot be applied to an existing adapter instance".to_string(),
				));
			}
			Ok(adapter)
		}
		AdapterSpec::Name(name) => {
			let registry = registry();
			Ok(Arc::from(registry.build(&name, options)?))
		}
	}
}

/// Serialize with the process-wide default adapter
pub fn serialize(value: &Value) -> SerializerResult<Vec<u8>> {
	get_default_adapter()?.serialize(value)
}

/// Unserialize with the process-wide default adapter
pub fn unserialize(form: &[u8]) -> SerializerResult<Value> {
	get_default_adapter()?.unserialize(form)
}

/// Serialize with a named or given adapter. Options follow the same rule
/// as [`factory`]: they apply when building by name only.
pub fn serialize_with(
	spec: impl Into<AdapterSpec>,
	value: &Value,
	options: Option<&OptionMap>,
) -> SerializerResult<Vec<u8>> {
	factory(spec, options)?.serialize(value)
}

/// Unserialize with a named or given adapter. Options follow the same rule
/// as [`factory`]: they apply when building by name only.
pub fn unserialize_with(
	spec: impl Into<AdapterSpec>,
	form: &[u8],
	options: Option<&OptionMap>,
) -> SerializerResult<Value> {
	factory(spec, options)?.unserialize(form)
}

/// The process-wide default adapter, resolving it on first use.
pub fn get_default_adapter() -> SerializerResult<Arc<dyn Adapter>> {
	{
		let state = STATE.read();
		if let DefaultSlot::Ready(adapter) = &state.default {
			return Ok(Arc::clone(adapter));
		}
	}

	let mut state = STATE.write();
	// Another thread may have resolved it between the locks.
	if let DefaultSlot::Ready(adapter) = &state.default {
		return Ok(Arc::clone(adapter));
	}

	let name = match &state.default {
		DefaultSlot::Name(name) => name.clone(),
		DefaultSlot::Ready(_) => unreachable!("checked above"),
	};
	let adapter = state.registry.get(&name)?;
	state.default = DefaultSlot::Ready(Arc::clone(&adapter));
	Ok(adapter)
}

/// Replace the process-wide default adapter. Names resolve immediately, so
/// an unknown name fails here instead of at the next serialize call.
pub fn set_default_adapter(spec: impl Into<AdapterSpec>) -> SerializerResult<()> {
	let adapter = match spec.into() {
		AdapterSpec::Instance(adapter) => adapter,
		AdapterSpec::Name(name) => registry().get(&name)?,
	};
	tracing::debug!(adapter = %adapter.name(), "setting default adapter");
	STATE.write().default = DefaultSlot::Ready(adapter);
	Ok(())
}

/// Restore the default adapter to its initial unresolved name
pub fn reset_default_adapter() {
	STATE.write().default = DefaultSlot::Name(DEFAULT_ADAPTER_NAME.to_string());
}

/// The process-wide registry
pub fn registry() -> Arc<AdapterRegistry> {
	Arc::clone(&STATE.read().registry)
}

/// Replace the process-wide registry. The default adapter keeps pointing at
/// an already-resolved instance; an unresolved default name will resolve
/// through the new registry.
pub fn set_registry(registry: AdapterRegistry) {
	STATE.write().registry = Arc::new(registry);
}

/// Restore the facade to a pristine state: a freshly populated registry and
/// the initial default adapter name.
pub fn reset_registry() {
	let mut state = STATE.write();
	state.registry = Arc::new(AdapterRegistry::with_defaults());
	state.default = DefaultSlot::Name(DEFAULT_ADAPTER_NAME.to_string());
}

//! Adapter registry
//!
//! Maps adapter names to factories and hands out adapter instances. Lookup
//! names are normalized (ASCII lowercase, `-`, `_`, `.` and spaces stripped)
//! and may be aliases; every alias resolves to exactly one canonical name.
//! `build` always constructs a fresh instance, `get` shares one cached
//! instance per canonical name. The shared cache holds `Arc<dyn Adapter>`
//! and adapters are `Send + Sync`, so handed-out instances need no further
//! locking.

use crate::adapter::Adapter;
use crate::error::{SerializerError, SerializerResult};
use crate::options::{normalize_name, OptionMap};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Constructor for one adapter type
pub type AdapterFactory = Arc<dyn Fn() -> SerializerResult<Box<dyn Adapter>> + Send + Sync>;

fn factory<A, F>(make: F) -> AdapterFactory
where
	A: Adapter + 'static,
	F: Fn() -> A + Send + Sync + 'static,
{
	Arc::new(move || Ok(Box::new(make()) as Box<dyn Adapter>))
}

#[cfg(not(all(feature = "msgpack", feature = "cbor", feature = "markup")))]
fn unsupported_factory(name: &'static str, feature: &'static str) -> AdapterFactory {
	Arc::new(move || {
		Err(SerializerError::Unsupported(format!(
			"adapter '{name}' requires the '{feature}' feature"
		)))
	})
}

/// Anything that can answer adapter lookups. Implemented by
/// [`AdapterRegistry`]; consumers that only resolve adapters can depend on
/// this instead of the concrete registry.
pub trait AdapterSource {
	/// Whether a name or alias resolves to a registered adapter
	fn has_adapter(&self, name: &str) -> bool;

	/// A shared instance of the named adapter
	fn adapter(&self, name: &str) -> SerializerResult<Arc<dyn Adapter>>;
}

/// Declarative registry additions, merged key by key.
#[derive(Default, Clone)]
pub struct RegistryConfig {
	aliases: HashMap<String, String>,
	factories: HashMap<String, AdapterFactory>,
}

impl RegistryConfig {
	/// An empty configuration
	pub fn new() -> Self {
		Self::default()
	}

	/// Add an alias for a canonical name
	pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
		self.aliases
			.insert(normalize_name(alias), normalize_name(canonical));
		self
	}

	/// Add or replace a factory under a canonical name
	pub fn with_factory(mut self, name: &str, factory: AdapterFactory) -> Self {
		self.factories.insert(normalize_name(name), factory);
		self
	}
}

impl fmt::Debug for RegistryConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RegistryConfig")
			.field("aliases", &self.aliases)
			.field("factories", &self.factories.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Registry of adapter factories and shared instances
pub struct AdapterRegistry {
	factories: HashMap<String, AdapterFactory>,
	aliases: HashMap<String, String>,
	shared: Mutex<HashMap<String, Arc<dyn Adapter>>>,
}

impl AdapterRegistry {
	/// An empty registry
	pub fn new() -> Self {
		Self {
			factories: HashMap::new(),
			aliases: HashMap::new(),
			shared: Mutex::new(HashMap::new()),
		}
	}

	/// A registry with every built-in adapter registered. Adapters behind a
	/// disabled feature are registered with a factory that fails with
	/// [`SerializerError::Unsupported`], so their names still resolve.
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();

		registry.register("native", factory(crate::adapter::NativeAdapter::new));
		registry.alias("bincode", "native");
		registry.alias("serialize", "native");

		registry.register("json", factory(crate::adapter::JsonAdapter::new));

		registry.register("code", factory(crate::adapter::CodeAdapter::new));
		registry.alias("literal", "code");

		#[cfg(feature = "msgpack")]
		registry.register("msgpack", factory(crate::adapter::MsgPackAdapter::new));
		#[cfg(not(feature = "msgpack"))]
		registry.register("msgpack", unsupported_factory("msgpack", "msgpack"));
		registry.alias("messagepack", "msgpack");

		#[cfg(feature = "cbor")]
		registry.register("cbor", factory(crate::adapter::CborAdapter::new));
		#[cfg(not(feature = "cbor"))]
		registry.register("cbor", unsupported_factory("cbor", "cbor"));
		registry.alias("binary", "cbor");

		#[cfg(feature = "markup")]
		registry.register("markup", factory(crate::adapter::MarkupAdapter::new));
		#[cfg(not(feature = "markup"))]
		registry.register("markup", unsupported_factory("markup", "markup"));
		registry.alias("packet", "markup");

		registry
	}

	/// Register a factory under a canonical name, replacing any previous
	/// factory under that name and dropping its shared instance.
	pub fn register(&mut self, name: &str, factory: AdapterFactory) {
		let canonical = normalize_name(name);
		tracing::debug!(adapter = %canonical, "registering adapter factory");
		self.shared.lock().remove(&canonical);
		self.factories.insert(canonical, factory);
	}

	/// Point an alias at a canonical name. A canonical name always resolves
	/// to itself, even if an alias of the same spelling exists.
	pub fn alias(&mut self, alias: &str, canonical: &str) {
		self.aliases
			.insert(normalize_name(alias), normalize_name(canonical));
	}

	/// Merge configuration key by key. Later entries replace earlier ones.
	pub fn merge_config(&mut self, config: &RegistryConfig) {
		for (alias, canonical) in &config.aliases {
			self.alias(alias, canonical);
		}
		for (name, factory) in &config.factories {
			self.register(name, Arc::clone(factory));
		}
	}

	/// The canonical name a lookup name resolves to, if any.
	pub fn resolve(&self, name: &str) -> Option<String> {
		let normalized = normalize_name(name);
		if self.factories.contains_key(&normalized) {
			return Some(normalized);
		}
		self.aliases
			.get(&normalized)
			.filter(|canonical| self.factories.contains_key(*canonical))
			.cloned()
	}

	/// Whether a name or alias resolves to a registered adapter
	pub fn contains(&self, name: &str) -> bool {
		self.resolve(name).is_some()
	}

	/// Registered canonical names, unordered.
	pub fn names(&self) -> Vec<&str> {
		self.factories.keys().map(String::as_str).collect()
	}

	/// Build a fresh adapter instance, optionally configuring it. Unknown
	/// names and instances that fail the adapter contract are configuration
	/// errors; a factory's own failure passes through.
	pub fn build(
		&self,
		name: &str,
		options: Option<&OptionMap>,
	) -> SerializerResult<Box<dyn Adapter>> {
		let canonical = self.resolve(name).ok_or_else(|| {
			SerializerError::Configuration(format!("no adapter registered under name '{name}'"))
		})?;
		let factory = self
			.factories
			.get(&canonical)
			.expect("resolve returned a registered name");

		tracing::debug!(adapter = %canonical, "building adapter instance");
		let mut adapter = factory()?;
		if adapter.name().is_empty() {
			return Err(SerializerError::Configuration(format!(
				"factory for '{canonical}' produced an adapter with an empty name"
			)));
		}

		if let Some(options) = options {
			adapter.configure(options).map_err(|e| {
				SerializerError::Configuration(format!(
					"adapter '{canonical}' rejected its options: {e}"
				))
			})?;
		}
		Ok(adapter)
	}

	/// A shared, default-configured instance. Built once per canonical name
	/// and cached; later calls return the same instance.
	pub fn get(&self, name: &str) -> SerializerResult<Arc<dyn Adapter>> {
		let canonical = self.resolve(name).ok_or_else(|| {
			SerializerError::Configuration(format!("no adapter registered under name '{name}'"))
		})?;

		let mut shared = self.shared.lock();
		if let Some(adapter) = shared.get(&canonical) {
			return Ok(Arc::clone(adapter));
		}

		let adapter: Arc<dyn Adapter> = Arc::from(self.build(&canonical, None)?);
		shared.insert(canonical, Arc::clone(&adapter));
		Ok(adapter)
	}
}

impl Default for AdapterRegistry {
	fn default() -> Self {
		Self::with_defaults()
	}
}

impl fmt::Debug for AdapterRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AdapterRegistry")
			.field("factories", &self.factories.keys().collect::<Vec<_>>())
			.field("aliases", &self.aliases)
			.finish()
	}
}

impl AdapterSource for AdapterRegistry {
	fn has_adapter(&self, name: &str) -> bool {
		self.contains(name)
	}

	fn adapter(&self, name: &str) -> SerializerResult<Arc<dyn Adapter>> {
		self.get(name)
	}
}

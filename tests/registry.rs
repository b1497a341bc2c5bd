//! Registry behavior through the public API: name normalization, aliasing,
//! configuration merging and the shared-instance cache.

use grappelli::adapter::{Adapter, JsonAdapter};
use grappelli::{
	AdapterRegistry, AdapterSource, OptionMap, RegistryConfig, SerializerError, Value,
};
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[case("json")]
#[case("JSON")]
#[case("Json")]
fn spellings_of_one_name_build_the_same_adapter(#[case] spelling: &str) {
	let registry = AdapterRegistry::with_defaults();
	let adapter = registry.build(spelling, None).unwrap();
	assert_eq!(adapter.name(), "json");
}

#[rstest]
fn unknown_names_fail_as_configuration_errors() {
	let registry = AdapterRegistry::with_defaults();
	for call in [
		registry.build("no-such-format", None).map(|_| ()),
		registry.get("no-such-format").map(|_| ()),
	] {
		assert!(matches!(call, Err(SerializerError::Configuration(_))));
	}
}

#[rstest]
fn custom_factories_can_shadow_builtins() {
	let mut registry = AdapterRegistry::with_defaults();
	registry.register(
		"native",
		Arc::new(|| Ok(Box::new(JsonAdapter::new()) as Box<dyn Adapter>)),
	);

	let adapter = registry.build("native", None).unwrap();
	assert_eq!(adapter.name(), "json");

	// Aliases keep pointing at the canonical name, so they pick up the
	// shadowing factory too.
	let via_alias = registry.build("bincode", None).unwrap();
	assert_eq!(via_alias.name(), "json");
}

#[rstest]
fn merged_config_overrides_existing_entries() {
	let config = RegistryConfig::new()
		.with_alias("packet", "json")
		.with_factory(
			"extra",
			Arc::new(|| Ok(Box::new(JsonAdapter::new()) as Box<dyn Adapter>)),
		);

	let mut registry = AdapterRegistry::with_defaults();
	registry.merge_config(&config);

	assert_eq!(registry.resolve("packet").as_deref(), Some("json"));
	assert!(registry.contains("extra"));
	// Untouched entries survive the merge.
	assert!(registry.contains("native"));
}

#[rstest]
fn get_caches_one_instance_and_build_does_not() {
	let registry = AdapterRegistry::with_defaults();

	let shared_a = registry.get("json").unwrap();
	let shared_b = registry.get("json").unwrap();
	assert!(Arc::ptr_eq(&shared_a, &shared_b));

	let built: Arc<dyn Adapter> = Arc::from(registry.build("json", None).unwrap());
	assert!(!Arc::ptr_eq(&shared_a, &built));
}

#[rstest]
fn build_configures_the_fresh_instance() {
	let registry = AdapterRegistry::with_defaults();

	let mut options = OptionMap::new();
	options.insert("object_decode".to_string(), Value::from("record"));
	let adapter = registry.build("json", Some(&options)).unwrap();

	let back = adapter
		.unserialize(br#"{"__class":"blog.Post","title":"hello"}"#)
		.unwrap();
	assert!(matches!(back, Value::Record(_)));

	// The shared instance keeps its default configuration.
	let shared = registry.get("json").unwrap();
	let back = shared
		.unserialize(br#"{"__class":"blog.Post","title":"hello"}"#)
		.unwrap();
	assert!(matches!(back, Value::Map(_)));
}

#[rstest]
fn invalid_options_surface_as_configuration_errors() {
	let registry = AdapterRegistry::with_defaults();
	let mut options = OptionMap::new();
	options.insert("object_decode".to_string(), Value::from("tuple"));

	let result = registry.build("json", Some(&options));
	assert!(matches!(result, Err(SerializerError::Configuration(_))));
}

#[rstest]
fn registry_serves_lookups_as_an_adapter_source() {
	let registry = AdapterRegistry::with_defaults();
	let source: &dyn AdapterSource = &registry;

	assert!(source.has_adapter("literal"));
	let adapter = source.adapter("literal").unwrap();
	assert_eq!(adapter.name(), "code");
}

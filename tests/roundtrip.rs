//! Cross-adapter round-trip coverage: every adapter must reconstruct every
//! representable value, including the payloads that collide with a format's
//! historical failure indicator.

use grappelli::adapter::{
	Adapter, CodeAdapter, JsonAdapter, JsonOptions, NativeAdapter, ObjectDecodeType,
};
use grappelli::{Record, Value};
use indexmap::IndexMap;
use rstest::rstest;

fn adapters() -> Vec<Box<dyn Adapter>> {
	// JSON runs in record mode here; its default map mode intentionally
	// flattens records and is covered by the adapter's own tests.
	let mut json_options = JsonOptions::default();
	json_options.set_object_decode(ObjectDecodeType::Record);

	let mut adapters: Vec<Box<dyn Adapter>> = vec![
		Box::new(NativeAdapter::new()),
		Box::new(JsonAdapter::with_options(json_options)),
		Box::new(CodeAdapter::new()),
	];
	#[cfg(feature = "msgpack")]
	adapters.push(Box::new(grappelli::adapter::MsgPackAdapter::new()));
	#[cfg(feature = "cbor")]
	adapters.push(Box::new(grappelli::adapter::CborAdapter::new()));
	#[cfg(feature = "markup")]
	adapters.push(Box::new(grappelli::adapter::MarkupAdapter::new()));
	adapters
}

#[rstest]
#[case(Value::from("test"))]
#[case(Value::Bool(false))]
#[case(Value::Bool(true))]
#[case(Value::Null)]
#[case(Value::Int(100))]
#[case(Value::Int(0))]
#[case(Value::Record(Record::new("blog.Post").with_field("title", "hello")))]
fn every_adapter_round_trips(#[case] value: Value) {
	for adapter in adapters() {
		let bytes = adapter
			.serialize(&value)
			.unwrap_or_else(|e| panic!("{} failed to serialize {value:?}: {e}", adapter.name()));
		let back = adapter
			.unserialize(&bytes)
			.unwrap_or_else(|e| panic!("{} failed to unserialize {value:?}: {e}", adapter.name()));
		assert_eq!(back, value, "{} round trip", adapter.name());
	}
}

#[rstest]
fn nested_structures_survive_every_adapter() {
	let mut fields = IndexMap::new();
	fields.insert(
		"tags".to_string(),
		Value::List(vec![Value::from("a"), Value::from("b")]),
	);
	fields.insert("draft".to_string(), Value::Bool(false));

	let mut map = IndexMap::new();
	map.insert(
		"post".to_string(),
		Value::Record(Record {
			class: "blog.Post".to_string(),
			fields,
		}),
	);
	map.insert("count".to_string(), Value::Int(2));
	let value = Value::Map(map);

	for adapter in adapters() {
		let bytes = adapter.serialize(&value).unwrap();
		assert_eq!(
			adapter.unserialize(&bytes).unwrap(),
			value,
			"{} round trip",
			adapter.name()
		);
	}
}

#[rstest]
fn map_ordering_is_preserved() {
	let mut map = IndexMap::new();
	map.insert("zulu".to_string(), Value::Int(1));
	map.insert("alpha".to_string(), Value::Int(2));
	map.insert("mike".to_string(), Value::Int(3));
	let value = Value::Map(map);

	for adapter in adapters() {
		let bytes = adapter.serialize(&value).unwrap();
		let back = adapter.unserialize(&bytes).unwrap();
		let keys: Vec<&String> = back.as_map().unwrap().keys().collect();
		assert_eq!(keys, ["zulu", "alpha", "mike"], "{}", adapter.name());
	}
}

#[rstest]
fn garbage_never_round_trips_silently() {
	for adapter in adapters() {
		// 0xc1 is reserved in MessagePack and an incomplete tag in CBOR,
		// and the sequence is neither valid UTF-8 nor a known native tag.
		let result = adapter.unserialize(&[0xc1, 0xfe, 0xfd, 0xfc, 0xfb]);
		assert!(result.is_err(), "{} accepted garbage", adapter.name());
	}
}

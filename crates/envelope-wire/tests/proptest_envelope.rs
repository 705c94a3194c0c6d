// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-based tests for the envelope serialization core: round-trip,
//! canonical field order, metadata-key exclusion, wrapper equivalence, and
//! content-type classification (testable properties from the core's design).

use std::sync::Arc;

use envelope_wire::carrier::OriginalMessage;
use envelope_wire::codec::JsonCodec;
use envelope_wire::collaborators::{
    CallbackChain, MappingRegistry, StaticSource, SystemClock, UuidGenerator,
};
use envelope_wire::content_type::is_json_content_type;
use envelope_wire::orchestrator::{EnvelopeSerializer, EnvelopeSerializerOptions};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    #[serde(rename = "Street")]
    street: String,
    #[serde(rename = "Unit")]
    unit: u32,
    #[serde(rename = "ZipCode")]
    zip: String,
}

// ── Leaf strategies ─────────────────────────────────────────────────────

fn arb_payload_string() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,24}"
}

fn arb_metadata_key() -> impl Strategy<Value = String> {
    // Never collides with a known field name (that collision path is
    // exercised separately); these are ordinary caller-chosen metadata keys.
    "[a-z][a-z_]{1,12}".prop_filter("must not collide with a known field", |k| {
        !envelope_wire::envelope::is_known_field(k)
    })
}

fn arb_payload() -> impl Strategy<Value = Payload> {
    (arb_payload_string(), 0u32..100_000, "[0-9]{5}").prop_map(|(street, unit, zip)| Payload {
        street,
        unit,
        zip,
    })
}

fn arb_metadata() -> impl Strategy<Value = Vec<(String, serde_json::Value)>> {
    prop::collection::btree_map(arb_metadata_key(), arb_payload_string(), 0..4)
        .prop_map(|map| map.into_iter().map(|(k, v)| (k, serde_json::json!(v))).collect())
}

fn serializer() -> EnvelopeSerializer {
    let mut registry = MappingRegistry::new();
    registry.register::<Payload>("addressInfo", "Payload", Arc::new(JsonCodec::<Payload>::new()));
    let registry = Arc::new(registry);
    EnvelopeSerializer::new(
        EnvelopeSerializerOptions::default(),
        registry.clone(),
        registry,
        Arc::new(SystemClock),
        Arc::new(UuidGenerator),
        Arc::new(StaticSource("/backend/service".to_string())),
        CallbackChain::new(),
    )
}

fn escape_for_wrapper(json: &str) -> String {
    json.replace('\\', "\\\\").replace('"', "\\\"")
}

proptest! {
    /// Any JSON-shaped envelope survives create → serialize → convert,
    /// producing a byte-identical payload.
    #[test]
    fn create_serialize_convert_round_trip(payload in arb_payload()) {
        let serializer = serializer();
        let envelope = serializer.create_envelope(payload.clone()).unwrap();
        let json = serializer.serialize(envelope).unwrap();

        let original = OriginalMessage::from_body(json);
        let (received, _descriptor) = serializer.convert_to_envelope(original).unwrap();
        let data = received.data.as_any().downcast_ref::<Payload>().unwrap();
        prop_assert_eq!(data, &payload);
    }

    /// Arbitrary metadata entries (none colliding with a known field) survive
    /// the same round-trip and never corrupt the known fields.
    #[test]
    fn metadata_round_trips_alongside_known_fields(payload in arb_payload(), metadata in arb_metadata()) {
        let serializer = serializer();
        let mut envelope = serializer.create_envelope(payload).unwrap();
        for (k, v) in &metadata {
            envelope.metadata_set(k.clone(), v.clone());
        }
        let json = serializer.serialize(envelope).unwrap();

        let original = OriginalMessage::from_body(json);
        let (received, _descriptor) = serializer.convert_to_envelope(original).unwrap();
        for (k, v) in &metadata {
            prop_assert_eq!(received.metadata_get(k), Some(v));
        }
    }

    /// A serialized envelope emits its known fields in canonical order
    /// (`id, source, specversion, type, time, datacontenttype, data`),
    /// regardless of payload content.
    #[test]
    fn serialized_output_has_canonical_field_order(payload in arb_payload()) {
        let serializer = serializer();
        let envelope = serializer.create_envelope(payload).unwrap();
        let json = serializer.serialize(envelope).unwrap();

        let known = ["\"id\"", "\"source\"", "\"specversion\"", "\"type\"", "\"time\"", "\"datacontenttype\"", "\"data\""];
        let mut last_pos = 0usize;
        for key in known {
            let pos = json.find(key).expect("known field must appear");
            prop_assert!(pos >= last_pos, "{key} appeared out of canonical order");
            last_pos = pos;
        }
    }

    /// Unwrapping a notification-wrapped envelope and parsing the bare
    /// envelope directly must classify the same message identically
    /// (wrapper equivalence).
    #[test]
    fn wrapper_equivalence_for_notification(payload in arb_payload()) {
        let serializer = serializer();
        let envelope = serializer.create_envelope(payload.clone()).unwrap();
        let inner = serializer.serialize(envelope).unwrap();

        let bare = OriginalMessage::from_body(inner.clone());
        let (from_bare, _) = serializer.convert_to_envelope(bare).unwrap();

        let escaped = escape_for_wrapper(&inner);
        let wrapped = format!(
            r#"{{"Type":"Notification","MessageId":"mid-1","TopicArn":"arn:x","Message":"{escaped}"}}"#
        );
        let from_wrapped_original = OriginalMessage::from_body(wrapped);
        let (from_wrapped, _) = serializer.convert_to_envelope(from_wrapped_original).unwrap();

        let bare_data = from_bare.data.as_any().downcast_ref::<Payload>().unwrap();
        let wrapped_data = from_wrapped.data.as_any().downcast_ref::<Payload>().unwrap();
        prop_assert_eq!(bare_data, wrapped_data);
        prop_assert_eq!(&from_bare.id, &from_wrapped.id);
        prop_assert_eq!(&from_bare.type_id, &from_wrapped.type_id);
    }

    /// `application/json` and any `+json`/`*/json` MIME type classify as
    /// JSON-shaped; arbitrary non-JSON subtypes do not.
    #[test]
    fn content_type_classification_matches_json_suffix_rule(subtype in "[a-z]{1,10}") {
        let json_like = format!("application/{subtype}+json");
        prop_assert!(is_json_content_type(Some(&json_like)));

        let plain = format!("application/{subtype}");
        if subtype != "json" {
            prop_assert!(!is_json_content_type(Some(&plain)));
        }
    }
}

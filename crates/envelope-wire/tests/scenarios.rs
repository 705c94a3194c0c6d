// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end scenarios exercising the orchestrator across the three known
//! carrier shapes, plus the concrete failure modes a subscriber actually
//! hits in practice.

use std::sync::Arc;

use envelope_error::ErrorCode;
use serde::{Deserialize, Serialize};

use envelope_wire::carrier::OriginalMessage;
use envelope_wire::codec::JsonCodec;
use envelope_wire::collaborators::{
    CallbackChain, MappingRegistry, StaticSource, SystemClock, UuidGenerator,
};
use envelope_wire::orchestrator::{EnvelopeSerializer, EnvelopeSerializerOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AddressInfoList {
    #[serde(rename = "Items")]
    items: Vec<serde_json::Value>,
}

fn serializer() -> EnvelopeSerializer {
    let mut registry = MappingRegistry::new();
    registry.register::<AddressInfoList>(
        "addressInfoList",
        "AddressInfoList",
        Arc::new(JsonCodec::<AddressInfoList>::new()),
    );
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

// (1) Bare envelope, no wrapper, round-trips end to end.
#[test]
fn bare_envelope_round_trip() {
    let serializer = serializer();
    let message = AddressInfoList {
        items: vec![serde_json::json!({"street": "Main St", "unit": 12})],
    };
    let envelope = serializer.create_envelope(message.clone()).unwrap();
    let json = serializer.serialize(envelope).unwrap();

    let original = OriginalMessage::from_body(json);
    let (received, descriptor) = serializer.convert_to_envelope(original).unwrap();
    assert_eq!(descriptor.type_id, "addressInfoList");
    let data = received.data.as_any().downcast_ref::<AddressInfoList>().unwrap();
    assert_eq!(data, &message);
    let carrier = received.carrier.unwrap();
    assert!(carrier.notification.is_none());
    assert!(carrier.event_bridge.is_none());
}

// (2) Notification wrapper with a stringified inner payload (the `Message`
// field carries an escaped JSON string, as a real SNS delivery does).
#[test]
fn notification_wrapped_stringified_inner() {
    let serializer = serializer();
    let envelope = serializer
        .create_envelope(AddressInfoList { items: vec![] })
        .unwrap();
    let inner = serializer.serialize(envelope).unwrap();
    let escaped = escape_for_wrapper(&inner);
    let wrapped = format!(
        r#"{{"Type":"Notification","MessageId":"mid-1","TopicArn":"arn:aws:sns:us-east-1:123:topic","Timestamp":"2024-01-01T00:00:00Z","Message":"{escaped}"}}"#
    );

    let original = OriginalMessage::from_body(wrapped);
    let (received, descriptor) = serializer.convert_to_envelope(original).unwrap();
    assert_eq!(descriptor.type_id, "addressInfoList");
    let carrier = received.carrier.unwrap();
    let notification = carrier.notification.unwrap();
    assert_eq!(notification.message_id, "mid-1");
    assert_eq!(notification.topic_arn, "arn:aws:sns:us-east-1:123:topic");
}

// (3) Notification wrapper with a JSON-object inner payload (`Message` is a
// nested object rather than a stringified one — some publishers do this).
#[test]
fn notification_wrapped_object_inner() {
    let serializer = serializer();
    let envelope = serializer
        .create_envelope(AddressInfoList { items: vec![] })
        .unwrap();
    let inner = serializer.serialize(envelope).unwrap();
    let wrapped = format!(
        r#"{{"Type":"Notification","MessageId":"mid-2","TopicArn":"arn:x","Message":{inner}}}"#
    );

    let original = OriginalMessage::from_body(wrapped);
    let (received, descriptor) = serializer.convert_to_envelope(original).unwrap();
    assert_eq!(descriptor.type_id, "addressInfoList");
    assert!(received.carrier.unwrap().notification.is_some());
}

// (4) Event-bus wrapper with a stringified `detail` field.
#[test]
fn event_bridge_wrapped_stringified_detail() {
    let serializer = serializer();
    let envelope = serializer
        .create_envelope(AddressInfoList { items: vec![] })
        .unwrap();
    let inner = serializer.serialize(envelope).unwrap();
    let escaped = escape_for_wrapper(&inner);
    let wrapped = format!(
        r#"{{"id":"eid-1","detail-type":"addressInfoList","source":"/aws/messaging","time":"2024-01-01T00:00:00Z","account":"123456789012","region":"us-east-1","detail":"{escaped}"}}"#
    );

    let original = OriginalMessage::from_body(wrapped);
    let (received, descriptor) = serializer.convert_to_envelope(original).unwrap();
    assert_eq!(descriptor.type_id, "addressInfoList");
    let carrier = received.carrier.unwrap();
    let event_bridge = carrier.event_bridge.unwrap();
    assert_eq!(event_bridge.event_id.as_deref(), Some("eid-1"));
    assert_eq!(event_bridge.region.as_deref(), Some("us-east-1"));
}

// (5) Unknown type-id fails as `ConvertFailed`, with the list of registered
// types available for diagnostics via the subscriber registry itself.
#[test]
fn unknown_type_fails_convert_with_mapping_list_available() {
    let serializer = serializer();
    let body = r#"{"id":"id-1","specversion":"1.0","type":"notRegistered","time":"2024-01-01T00:00:00Z","data":{}}"#;
    let original = OriginalMessage::from_body(body);
    let err = serializer.convert_to_envelope(original).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConvertFailed);
    let inner = std::error::Error::source(&err).expect("convert failure wraps the reader's cause");
    assert!(inner.to_string().contains("addressInfoList"));
}

// (6) Malformed outer JSON fails as `ConvertFailed` (the queue-fallback
// parser's own terminal failure, wrapped by the orchestrator).
#[test]
fn malformed_outer_json_fails_convert() {
    let serializer = serializer();
    let original = OriginalMessage::from_body("{not valid json");
    let err = serializer.convert_to_envelope(original).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConvertFailed);
}

// Boundary (a): empty `data` object with an explicit JSON content-type
// still round-trips.
#[test]
fn empty_data_object_round_trips() {
    let serializer = serializer();
    let envelope = serializer
        .create_envelope(AddressInfoList { items: vec![] })
        .unwrap();
    let json = serializer.serialize(envelope).unwrap();
    assert!(json.contains(r#""Items":[]"#));

    let original = OriginalMessage::from_body(json);
    let (received, _) = serializer.convert_to_envelope(original).unwrap();
    let data = received.data.as_any().downcast_ref::<AddressInfoList>().unwrap();
    assert!(data.items.is_empty());
}

// A log_message_content=false serializer drops the JSON-parse cause from a
// convert failure while keeping the stable error code.
#[test]
fn redaction_drops_cause_but_keeps_code() {
    let mut registry = MappingRegistry::new();
    registry.register::<AddressInfoList>(
        "addressInfoList",
        "AddressInfoList",
        Arc::new(JsonCodec::<AddressInfoList>::new()),
    );
    let registry = Arc::new(registry);
    let options = EnvelopeSerializerOptions {
        log_message_content: false,
        ..EnvelopeSerializerOptions::default()
    };
    let serializer = EnvelopeSerializer::new(
        options,
        registry.clone(),
        registry,
        Arc::new(SystemClock),
        Arc::new(UuidGenerator),
        Arc::new(StaticSource("/svc".to_string())),
        CallbackChain::new(),
    );
    let original = OriginalMessage::from_body("{not valid json");
    let err = serializer.convert_to_envelope(original).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConvertFailed);
    let inner = std::error::Error::source(&err).expect("wrap always attaches the inner error");
    assert!(inner.source().is_none(), "redaction should drop the inner error's own cause");
}

// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! CloudEvents-shaped envelope serialization core: translates between
//! in-memory application messages and the wire-format JSON envelopes
//! transported through cloud message queues, including unwrapping the two
//! known upstream fan-out wrappers (a notification service, an event-bus
//! service) around the canonical envelope.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use envelope_wire::carrier::OriginalMessage;
//! use envelope_wire::codec::JsonCodec;
//! use envelope_wire::collaborators::{
//!     CallbackChain, MappingRegistry, StaticSource, SystemClock, UuidGenerator,
//! };
//! use envelope_wire::orchestrator::{EnvelopeSerializer, EnvelopeSerializerOptions};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct AddressInfoList {
//!     #[serde(rename = "Items")]
//!     items: Vec<serde_json::Value>,
//! }
//!
//! let mut registry = MappingRegistry::new();
//! registry.register::<AddressInfoList>(
//!     "addressInfoList",
//!     "AddressInfoList",
//!     Arc::new(JsonCodec::<AddressInfoList>::new()),
//! );
//! let registry = Arc::new(registry);
//!
//! let serializer = EnvelopeSerializer::new(
//!     EnvelopeSerializerOptions::default(),
//!     registry.clone(),
//!     registry,
//!     Arc::new(SystemClock),
//!     Arc::new(UuidGenerator),
//!     Arc::new(StaticSource("/backend/service".to_string())),
//!     CallbackChain::new(),
//! );
//!
//! let envelope = serializer
//!     .create_envelope(AddressInfoList { items: vec![] })
//!     .unwrap();
//! let json = serializer.serialize(envelope).unwrap();
//!
//! let (received, _mapping) = serializer
//!     .convert_to_envelope(OriginalMessage::from_body(json))
//!     .unwrap();
//! assert_eq!(received.type_id, "addressInfoList");
//! ```

pub mod builder;
pub mod carrier;
pub mod codec;
pub mod collaborators;
pub mod content_type;
pub mod envelope;
pub mod message;
pub mod orchestrator;
pub mod pool;
pub mod reader;
mod scan;
pub mod utf8_reader;
pub mod validate;
pub mod version;
pub mod wrappers;
pub mod writer;

pub use builder::EnvelopeBuilder;
pub use carrier::{CarrierMetadata, EventBridgeMetadata, NotificationMetadata, OriginalMessage, QueueMetadata};
pub use codec::{Codec, CodecKind, JsonCodec};
pub use envelope::Envelope;
pub use message::AnyMessage;
pub use orchestrator::{EnvelopeSerializer, EnvelopeSerializerOptions};
pub use reader::EnvelopeReader;
pub use validate::EnvelopeValidator;
pub use writer::EnvelopeWriter;

// SPDX-License-Identifier: MIT OR Apache-2.0
//! The envelope serializer orchestrator: wires the pooled scope, wrapper
//! parsers, writer, and reader behind three operations — `create_envelope`,
//! `serialize`, `convert_to_envelope` — and runs the four callback lists
//! around them.

use std::any::{type_name, TypeId};
use std::sync::{Arc, OnceLock};

use envelope_error::{EnvelopeError, ErrorCode, Result};

use crate::carrier::OriginalMessage;
use crate::collaborators::{
    CallbackChain, Clock, IdGenerator, PublisherRegistry, SourceProvider, SubscriberDescriptor,
    SubscriberRegistry,
};
use crate::envelope::Envelope;
use crate::message::AnyMessage;
use crate::pool::PooledScope;
use crate::reader::EnvelopeReader;
use crate::version::CURRENT_SPEC_VERSION;
use crate::wrappers::{parse_carrier, InnerPayload};
use crate::writer::EnvelopeWriter;

/// Construction-time settings.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeSerializerOptions {
    /// Zero rented pooled buffers on return to the pool. Default `true`.
    pub clean_rented_buffers: bool,
    /// When `false`, redact payload content from error causes and drop the
    /// inner cause of a JSON-parse failure. Default `true`.
    pub log_message_content: bool,
    /// Reserved for selecting the UTF-8 writer path over the legacy string
    /// path at construction time. This crate's writer already always
    /// takes the UTF-8-capable path when the codec supports it, so this
    /// flag currently has no runtime effect; it exists so options callers
    /// already wire up continue to compile if that changes.
    pub experimental_features_enabled: bool,
}

impl Default for EnvelopeSerializerOptions {
    fn default() -> Self {
        Self {
            clean_rented_buffers: true,
            log_message_content: true,
            experimental_features_enabled: false,
        }
    }
}

/// Wires the envelope core's components behind its three orchestrator
/// operations.
pub struct EnvelopeSerializer {
    options: EnvelopeSerializerOptions,
    publishers: Arc<dyn PublisherRegistry>,
    subscribers: Arc<dyn SubscriberRegistry>,
    clock: Arc<dyn Clock>,
    id_generator: Arc<dyn IdGenerator>,
    source_provider: Arc<dyn SourceProvider>,
    source_cache: OnceLock<String>,
    callbacks: CallbackChain,
}

impl EnvelopeSerializer {
    /// Construct a new orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        options: EnvelopeSerializerOptions,
        publishers: Arc<dyn PublisherRegistry>,
        subscribers: Arc<dyn SubscriberRegistry>,
        clock: Arc<dyn Clock>,
        id_generator: Arc<dyn IdGenerator>,
        source_provider: Arc<dyn SourceProvider>,
        callbacks: CallbackChain,
    ) -> Self {
        Self {
            options,
            publishers,
            subscribers,
            clock,
            id_generator,
            source_provider,
            source_cache: OnceLock::new(),
            callbacks,
        }
    }

    fn source(&self) -> String {
        self.source_cache
            .get_or_init(|| self.source_provider.compute())
            .clone()
    }

    /// **create-envelope**: generate id, capture current timestamp,
    /// resolve the publisher mapping for `message`'s static type, and
    /// return a populated envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::MissingMapping`] if no publisher mapping is
    /// registered for `T`.
    #[tracing::instrument(skip(self, message), fields(message_type = type_name::<T>()))]
    pub fn create_envelope<T>(&self, message: T) -> Result<Envelope>
    where
        T: AnyMessage + 'static,
    {
        let descriptor = self.publishers.get(TypeId::of::<T>()).ok_or_else(|| {
            EnvelopeError::new(
                ErrorCode::MissingMapping,
                format!("no publisher mapping registered for type {}", type_name::<T>()),
            )
        })?;
        tracing::debug!(type_id = %descriptor.type_id, "resolved publisher mapping");

        Ok(Envelope {
            id: self.id_generator.next(),
            source: Some(self.source()),
            spec_version: CURRENT_SPEC_VERSION.to_string(),
            type_id: descriptor.type_id,
            time: self.clock.now(),
            data_content_type: None,
            data: Box::new(message),
            metadata: Vec::new(),
            carrier: None,
        })
    }

    /// **serialize**: run the pre/post-serialize callbacks around
    /// [`crate::writer::EnvelopeWriter::write`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::SerializeFailed`] wrapping the original cause on
    /// any callback, mapping-lookup, or writer/codec failure. When
    /// `log_message_content` is `false`, a JSON-parse cause is dropped from
    /// the surfaced error.
    #[tracing::instrument(skip(self, envelope), fields(type_id = %envelope.type_id))]
    pub fn serialize(&self, mut envelope: Envelope) -> Result<String> {
        for hook in &self.callbacks.pre_serialize {
            hook(&mut envelope).map_err(|e| self.wrap(ErrorCode::SerializeFailed, "pre-serialize hook failed", e))?;
        }

        let type_id = envelope.data.as_any().type_id();
        let descriptor = self.publishers.get(type_id).ok_or_else(|| {
            EnvelopeError::new(
                ErrorCode::SerializeFailed,
                "no publisher mapping registered for the envelope's message type",
            )
        })?;

        let mut buf = Vec::new();
        EnvelopeWriter::write(&envelope, descriptor.codec.as_ref(), &mut buf)
            .map_err(|e| self.wrap(ErrorCode::SerializeFailed, "envelope write failed", e))?;
        let mut out = String::from_utf8(buf).map_err(|e| {
            EnvelopeError::new(ErrorCode::SerializeFailed, "writer produced invalid UTF-8").with_cause(e)
        })?;
        tracing::trace!(bytes = out.len(), "envelope serialized");

        for hook in &self.callbacks.post_serialize {
            out = hook(out).map_err(|e| self.wrap(ErrorCode::SerializeFailed, "post-serialize hook failed", e))?;
        }
        Ok(out)
    }

    /// **convert-to-envelope**: run the full receive-side state
    /// machine — pre-deserialize callbacks, UTF-8 encode into a pooled
    /// scope, wrapper-parser chain, envelope reader, attach carrier
    /// metadata, post-deserialize callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::ConvertFailed`] wrapping the original cause on
    /// any callback, parse, or codec failure; a failed call does not
    /// consume or mutate `original`.
    #[tracing::instrument(skip(self, original))]
    pub fn convert_to_envelope(&self, original: OriginalMessage) -> Result<(Envelope, SubscriberDescriptor)> {
        let mut body = original.body.clone();
        for hook in &self.callbacks.pre_deserialize {
            body = hook(body).map_err(|e| self.wrap(ErrorCode::ConvertFailed, "pre-deserialize hook failed", e))?;
        }

        let mut scope = PooledScope::new(self.options.clean_rented_buffers);
        scope.prepare_source(body.len());
        scope.source_mut().extend_from_slice(body.as_bytes());
        tracing::trace!(bytes = body.len(), "carrier body encoded into pooled scope");

        let (inner, carrier) = parse_carrier(&mut scope, &original);
        tracing::debug!(
            notification = carrier.notification.is_some(),
            event_bridge = carrier.event_bridge.is_some(),
            "wrapper-parser chain resolved"
        );

        // A payload unwrapped from a string-valued `Message`/`detail` field
        // lives in the scope's extra pool; moving it out with `take` yields
        // an owned buffer decoupled from `scope`, so the envelope reader can
        // freely rent its own pool buffers afterwards for unescaping `data`
        // without the borrow checker treating the two as aliasing the same
        // storage.
        let owned;
        let inner_bytes: &[u8] = match inner {
            InnerPayload::Slice(bytes) => bytes,
            InnerPayload::Pooled(handle) => {
                owned = scope.pool().take(handle);
                &owned
            }
        };

        let mut pool = scope.pool();
        let (mut envelope, descriptor) =
            EnvelopeReader::read_with_carrier(inner_bytes, &mut pool, self.subscribers.as_ref(), Some(carrier))
                .map_err(|e| self.wrap(ErrorCode::ConvertFailed, "envelope read failed", e))?;

        for hook in &self.callbacks.post_deserialize {
            hook(&mut envelope).map_err(|e| self.wrap(ErrorCode::ConvertFailed, "post-deserialize hook failed", e))?;
        }
        tracing::trace!(type_id = %envelope.type_id, "envelope materialized");

        Ok((envelope, descriptor))
    }

    /// Wrap `cause` as `code`, applying the `log_message_content` redaction
    /// rule to it first: when content logging is disabled *and* `cause` is
    /// itself a JSON-parse-originated failure
    /// ([`EnvelopeError::is_json_parse_failure`]), drop its inner cause.
    /// Any other cause — a hook's own domain error, a missing mapping, a
    /// codec failure unrelated to JSON — keeps its full chain regardless
    /// of this setting.
    fn wrap(&self, code: ErrorCode, message: &str, cause: EnvelopeError) -> EnvelopeError {
        let cause = if !self.options.log_message_content && cause.is_json_parse_failure() {
            cause.redacted()
        } else {
            cause
        };
        EnvelopeError::new(code, message.to_string()).with_cause(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::collaborators::{MappingRegistry, StaticSource, SystemClock, UuidGenerator};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Ping {
        n: u32,
    }

    fn orchestrator() -> (EnvelopeSerializer, Arc<MappingRegistry>) {
        let mut registry = MappingRegistry::new();
        registry.register::<Ping>("ping", "Ping", Arc::new(JsonCodec::<Ping>::new()));
        let registry = Arc::new(registry);
        let orchestrator = EnvelopeSerializer::new(
            EnvelopeSerializerOptions::default(),
            registry.clone(),
            registry.clone(),
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
            Arc::new(StaticSource("/svc/test".to_string())),
            CallbackChain::new(),
        );
        (orchestrator, registry)
    }

    #[test]
    fn create_envelope_resolves_publisher_mapping() {
        let (orchestrator, _registry) = orchestrator();
        let envelope = orchestrator.create_envelope(Ping { n: 1 }).unwrap();
        assert_eq!(envelope.type_id, "ping");
        assert_eq!(envelope.source.as_deref(), Some("/svc/test"));
        assert!(!envelope.id.is_empty());
    }

    #[test]
    fn create_envelope_missing_mapping_fails() {
        let (orchestrator, _registry) = orchestrator();
        #[derive(Debug)]
        struct Unmapped;
        let err = orchestrator.create_envelope(Unmapped).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingMapping);
    }

    #[test]
    fn serialize_round_trips_through_convert_to_envelope() {
        let (orchestrator, _registry) = orchestrator();
        let envelope = orchestrator.create_envelope(Ping { n: 42 }).unwrap();
        let json = orchestrator.serialize(envelope).unwrap();
        assert!(json.contains("\"type\":\"ping\""));

        let original = OriginalMessage::from_body(json);
        let (received, descriptor) = orchestrator.convert_to_envelope(original).unwrap();
        assert_eq!(descriptor.type_id, "ping");
        let data = received.data.as_any().downcast_ref::<Ping>().unwrap();
        assert_eq!(data.n, 42);
        assert!(received.carrier.is_some());
    }

    #[test]
    fn convert_to_envelope_unknown_type_is_convert_failed() {
        let (orchestrator, _registry) = orchestrator();
        let body = r#"{"id":"id-1","specversion":"1.0","type":"missing","time":"2024-01-01T00:00:00Z","data":{}}"#;
        let original = OriginalMessage::from_body(body);
        let err = orchestrator.convert_to_envelope(original).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConvertFailed);
    }

    #[test]
    fn convert_to_envelope_malformed_json_is_convert_failed() {
        let (orchestrator, _registry) = orchestrator();
        let original = OriginalMessage::from_body("not-json");
        let err = orchestrator.convert_to_envelope(original).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConvertFailed);
    }

    #[test]
    fn malformed_json_cause_is_redacted_when_content_logging_disabled() {
        let mut registry = MappingRegistry::new();
        registry.register::<Ping>("ping", "Ping", Arc::new(JsonCodec::<Ping>::new()));
        let registry = Arc::new(registry);
        let options = EnvelopeSerializerOptions {
            log_message_content: false,
            ..EnvelopeSerializerOptions::default()
        };
        let orchestrator = EnvelopeSerializer::new(
            options,
            registry.clone(),
            registry,
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
            Arc::new(StaticSource("/svc/test".to_string())),
            CallbackChain::new(),
        );
        let original = OriginalMessage::from_body("not-json");
        let err = orchestrator.convert_to_envelope(original).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConvertFailed);
        assert!(
            err.source.is_none(),
            "JSON-parse cause must be dropped when content logging is disabled"
        );
    }

    #[test]
    fn hook_failure_cause_survives_when_content_logging_disabled() {
        let mut registry = MappingRegistry::new();
        registry.register::<Ping>("ping", "Ping", Arc::new(JsonCodec::<Ping>::new()));
        let registry = Arc::new(registry);
        let callbacks = CallbackChain::new().with_pre_serialize(|_envelope| {
            Err(EnvelopeError::new(ErrorCode::Internal, "hook's own domain error"))
        });
        let options = EnvelopeSerializerOptions {
            log_message_content: false,
            ..EnvelopeSerializerOptions::default()
        };
        let orchestrator = EnvelopeSerializer::new(
            options,
            registry.clone(),
            registry,
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
            Arc::new(StaticSource("/svc/test".to_string())),
            callbacks,
        );
        let envelope = orchestrator.create_envelope(Ping { n: 1 }).unwrap();
        let err = orchestrator.serialize(envelope).unwrap_err();
        assert_eq!(err.code, ErrorCode::SerializeFailed);
        assert!(
            err.source.is_some(),
            "a hook's own domain error is not JSON-parse-originated and must keep its cause"
        );
    }

    #[test]
    fn pre_serialize_hook_runs_before_write() {
        let mut registry = MappingRegistry::new();
        registry.register::<Ping>("ping", "Ping", Arc::new(JsonCodec::<Ping>::new()));
        let registry = Arc::new(registry);
        let callbacks = CallbackChain::new().with_pre_serialize(|envelope| {
            envelope.metadata_set("injected", serde_json::json!(true));
            Ok(())
        });
        let orchestrator = EnvelopeSerializer::new(
            EnvelopeSerializerOptions::default(),
            registry.clone(),
            registry,
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
            Arc::new(StaticSource("/svc/test".to_string())),
            callbacks,
        );
        let envelope = orchestrator.create_envelope(Ping { n: 1 }).unwrap();
        let json = orchestrator.serialize(envelope).unwrap();
        assert!(json.contains("\"injected\":true"));
    }
}

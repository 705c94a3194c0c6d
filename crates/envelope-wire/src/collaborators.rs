// SPDX-License-Identifier: MIT OR Apache-2.0
//! External-collaborator contracts: the interfaces the core depends on but
//! does not itself implement in full — subscriber and publisher mapping
//! registries, a clock, an id-generator, a source-URI provider, and the
//! four callback lists.
//!
//! This module also ships simple in-memory default implementations of the
//! two registries and the clock/id-generator, so the orchestrator is usable
//! out of the box in tests and small deployments; a real message-bus
//! wiring layer would supply its own.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use envelope_error::Result;

use crate::codec::Codec;
use crate::envelope::Envelope;

// ---------------------------------------------------------------------------
// Subscriber / publisher mappings
// ---------------------------------------------------------------------------

/// A resolved subscriber mapping: what a received `type` string
/// deserializes into.
#[derive(Clone)]
pub struct SubscriberDescriptor {
    /// The `type` string this descriptor was registered under.
    pub type_id: String,
    /// Human-readable name of the target Rust type, for diagnostics only.
    pub target_type_name: &'static str,
    /// The codec used to materialize the carried message.
    pub codec: Arc<dyn Codec>,
}

/// Read-only registry mapping a `type` string to a [`SubscriberDescriptor`].
pub trait SubscriberRegistry: Send + Sync {
    /// Resolve the descriptor registered for `type_id`, if any.
    fn get(&self, type_id: &str) -> Option<SubscriberDescriptor>;

    /// List every registered `type` string, in registration order — used to
    /// build the diagnostic message for an unresolvable `type`.
    fn list(&self) -> Vec<String>;
}

/// A resolved publisher mapping: what `type` string a concrete Rust
/// message type publishes as.
#[derive(Clone)]
pub struct PublisherDescriptor {
    /// The `type` string to emit for this message type.
    pub type_id: String,
    /// The codec used to serialize the message.
    pub codec: Arc<dyn Codec>,
}

/// Read-only registry mapping a message's static Rust type to a
/// [`PublisherDescriptor`].
pub trait PublisherRegistry: Send + Sync {
    /// Resolve the descriptor registered for `type_id`, if any.
    fn get(&self, type_id: TypeId) -> Option<PublisherDescriptor>;
}

/// A simple in-memory [`SubscriberRegistry`]/[`PublisherRegistry`] pair,
/// built once at configuration time and shared read-only thereafter.
#[derive(Default)]
pub struct MappingRegistry {
    subscribers: HashMap<String, SubscriberDescriptor>,
    subscriber_order: Vec<String>,
    publishers: HashMap<TypeId, PublisherDescriptor>,
}

impl MappingRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bidirectional mapping: Rust type `T` publishes as
    /// `type_id` and, symmetrically, `type_id` deserializes back into `T`
    /// via `codec`.
    pub fn register<T: 'static>(
        &mut self,
        type_id: impl Into<String>,
        target_type_name: &'static str,
        codec: Arc<dyn Codec>,
    ) -> &mut Self {
        let type_id = type_id.into();
        self.publishers.insert(
            TypeId::of::<T>(),
            PublisherDescriptor {
                type_id: type_id.clone(),
                codec: codec.clone(),
            },
        );
        if !self.subscribers.contains_key(&type_id) {
            self.subscriber_order.push(type_id.clone());
        }
        self.subscribers.insert(
            type_id.clone(),
            SubscriberDescriptor {
                type_id,
                target_type_name,
                codec,
            },
        );
        self
    }
}

impl SubscriberRegistry for MappingRegistry {
    fn get(&self, type_id: &str) -> Option<SubscriberDescriptor> {
        self.subscribers.get(type_id).cloned()
    }

    fn list(&self) -> Vec<String> {
        self.subscriber_order.clone()
    }
}

impl PublisherRegistry for MappingRegistry {
    fn get(&self, type_id: TypeId) -> Option<PublisherDescriptor> {
        self.publishers.get(&type_id).cloned()
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Clock collaborator: `now() -> timestamp with offset`.
pub trait Clock: Send + Sync {
    /// The current time, with a UTC offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// A [`Clock`] backed by [`chrono::Utc::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().into()
    }
}

// ---------------------------------------------------------------------------
// Id generator
// ---------------------------------------------------------------------------

/// Id-generator collaborator: `next() -> non-empty string`.
pub trait IdGenerator: Send + Sync {
    /// Generate a fresh, non-empty id.
    fn next(&self) -> String;
}

/// An [`IdGenerator`] backed by random UUIDv4s.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

// ---------------------------------------------------------------------------
// Source provider
// ---------------------------------------------------------------------------

/// Source-URI-provider collaborator: `compute() -> URI` (may be relative).
/// Resolved lazily and cached by the orchestrator — the first call wins
/// and subsequent calls reuse the cached value.
pub trait SourceProvider: Send + Sync {
    /// Compute the source URI for this process. May be expensive; the
    /// orchestrator calls this at most once (barring benign redundant
    /// racing initializations).
    fn compute(&self) -> String;
}

/// A [`SourceProvider`] that always returns a fixed string, useful for
/// tests and simple static deployments.
#[derive(Debug, Clone)]
pub struct StaticSource(pub String);

impl SourceProvider for StaticSource {
    fn compute(&self) -> String {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Runs before an envelope is written to bytes; may mutate the envelope
/// (e.g. to inject tracing metadata) or fail the whole `serialize` call.
pub type PreSerializeHook = Box<dyn Fn(&mut Envelope) -> Result<()> + Send + Sync>;
/// Runs after an envelope has been serialized to a `String`; may transform
/// the string (e.g. to compress or sign it) or fail the whole call.
pub type PostSerializeHook = Box<dyn Fn(String) -> Result<String> + Send + Sync>;
/// Runs on a carrier message's raw body before it is unwrapped; may
/// transform the body (e.g. to decompress or verify it) or fail the whole
/// `convert_to_envelope` call.
pub type PreDeserializeHook = Box<dyn Fn(String) -> Result<String> + Send + Sync>;
/// Runs after a received envelope has been fully materialized; may mutate
/// it or fail the whole call.
pub type PostDeserializeHook = Box<dyn Fn(&mut Envelope) -> Result<()> + Send + Sync>;

/// The four ordered callback lists. Each list runs sequentially, in
/// registration order, each hook fully completing before the next starts.
#[derive(Default)]
pub struct CallbackChain {
    /// Hooks run before serialization, in registration order.
    pub pre_serialize: Vec<PreSerializeHook>,
    /// Hooks run after serialization, in registration order.
    pub post_serialize: Vec<PostSerializeHook>,
    /// Hooks run before a carrier body is unwrapped, in registration order.
    pub pre_deserialize: Vec<PreDeserializeHook>,
    /// Hooks run after an envelope has been materialized, in registration
    /// order.
    pub post_deserialize: Vec<PostDeserializeHook>,
}

impl CallbackChain {
    /// Construct an empty callback chain (no hooks registered).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-serialize hook, returning `self` for chaining at
    /// configuration time.
    #[must_use]
    pub fn with_pre_serialize(
        mut self,
        hook: impl Fn(&mut Envelope) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.pre_serialize.push(Box::new(hook));
        self
    }

    /// Register a post-serialize hook, returning `self` for chaining at
    /// configuration time.
    #[must_use]
    pub fn with_post_serialize(
        mut self,
        hook: impl Fn(String) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.post_serialize.push(Box::new(hook));
        self
    }

    /// Register a pre-deserialize hook, returning `self` for chaining at
    /// configuration time.
    #[must_use]
    pub fn with_pre_deserialize(
        mut self,
        hook: impl Fn(String) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.pre_deserialize.push(Box::new(hook));
        self
    }

    /// Register a post-deserialize hook, returning `self` for chaining at
    /// configuration time.
    #[must_use]
    pub fn with_post_deserialize(
        mut self,
        hook: impl Fn(&mut Envelope) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.post_deserialize.push(Box::new(hook));
        self
    }
}

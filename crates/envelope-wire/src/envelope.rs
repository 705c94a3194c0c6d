// SPDX-License-Identifier: MIT OR Apache-2.0
//! The canonical event envelope, v1.0 of the event shape carried on the wire.

use chrono::{DateTime, FixedOffset};

use crate::carrier::CarrierMetadata;
use crate::message::AnyMessage;

/// The seven known top-level property names, in canonical emit order.
/// Shared by the writer (to know what to skip when emitting metadata) and
/// the reader (to know what to route into `metadata` vs. a named field).
pub const KNOWN_FIELDS: [&str; 7] = [
    "id",
    "source",
    "specversion",
    "type",
    "time",
    "datacontenttype",
    "data",
];

/// `true` if `key` collides with one of the seven known envelope property
/// names.
#[must_use]
pub fn is_known_field(key: &str) -> bool {
    KNOWN_FIELDS.contains(&key)
}

/// The canonical event envelope, immutable once constructed and
/// returned to a caller.
#[derive(Debug)]
pub struct Envelope {
    /// Non-empty event id.
    pub id: String,
    /// URI reference (relative or absolute); `None` when the writer should
    /// omit the `source` property entirely.
    pub source: Option<String>,
    /// Always `"1.0"` on envelopes this crate emits; tolerated as any
    /// string on envelopes it reads.
    pub spec_version: String,
    /// Non-empty message-type-identifier string.
    pub type_id: String,
    /// Timestamp with offset.
    pub time: DateTime<FixedOffset>,
    /// MIME type of `data`; `None` means `application/json`.
    pub data_content_type: Option<String>,
    /// The carried message, type-erased.
    pub data: Box<dyn AnyMessage>,
    /// Additional top-level properties beyond the seven known ones, in
    /// insertion order. Never contains a key colliding with
    /// [`KNOWN_FIELDS`].
    pub metadata: Vec<(String, serde_json::Value)>,
    /// Transport-provenance metadata, attached by
    /// [`crate::orchestrator::EnvelopeSerializer::convert_to_envelope`] to
    /// every received envelope. `None` for envelopes built for publishing
    /// (via [`crate::orchestrator::EnvelopeSerializer::create_envelope`] or
    /// [`crate::builder::EnvelopeBuilder`]), which have no carrier to speak
    /// of yet.
    pub carrier: Option<CarrierMetadata>,
}

impl Envelope {
    /// Look up a metadata entry by exact key match.
    #[must_use]
    pub fn metadata_get(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or replace a metadata entry.
    ///
    /// Silently no-ops when `key` collides with a known field name —
    /// mirrors the writer's own skip rule so callers can't accidentally
    /// smuggle a colliding key through construction.
    pub fn metadata_set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        if is_known_field(&key) {
            return;
        }
        if let Some(entry) = self.metadata.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.metadata.push((key, value));
        }
    }
}

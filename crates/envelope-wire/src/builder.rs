// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ergonomic envelope construction, for tests and for callers who want to
//! hand-build an [`Envelope`] without going through
//! [`crate::orchestrator::EnvelopeSerializer::create_envelope`].
//!
//! # Examples
//!
//! ```
//! use envelope_wire::builder::EnvelopeBuilder;
//!
//! let envelope = EnvelopeBuilder::new("addressInfoList")
//!     .id("id-123")
//!     .source("/backend/service")
//!     .data(42u32)
//!     .build()
//!     .unwrap();
//! assert_eq!(envelope.type_id, "addressInfoList");
//! ```

use chrono::{DateTime, FixedOffset, Utc};

use envelope_error::{EnvelopeError, ErrorCode, Result};

use crate::envelope::Envelope;
use crate::message::AnyMessage;
use crate::version::CURRENT_SPEC_VERSION;

/// Fluent builder for an [`Envelope`].
///
/// `type_id` is fixed at construction; every other field is optional and
/// falls back to a sensible default on [`build`](Self::build) — except
/// `data`, whose absence raises [`ErrorCode::NullMessage`], since an
/// envelope with no message is never a value this crate's own pipeline
/// constructs.
#[derive(Debug)]
pub struct EnvelopeBuilder {
    id: Option<String>,
    source: Option<String>,
    spec_version: Option<String>,
    type_id: String,
    time: Option<DateTime<FixedOffset>>,
    data_content_type: Option<String>,
    data: Option<Box<dyn AnyMessage>>,
    metadata: Vec<(String, serde_json::Value)>,
}

impl EnvelopeBuilder {
    /// Start building an envelope of the given `type_id` (required —
    /// non-empty `type` is enforced at [`build`](Self::build)).
    #[must_use]
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            id: None,
            source: None,
            spec_version: None,
            type_id: type_id.into(),
            time: None,
            data_content_type: None,
            data: None,
            metadata: Vec::new(),
        }
    }

    /// Set the envelope id. Defaults to a fresh UUIDv4 on
    /// [`build`](Self::build) if left unset.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the `source` URI. Omitted from the emitted envelope if left
    /// unset.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Override `specversion`. Defaults to [`CURRENT_SPEC_VERSION`].
    #[must_use]
    pub fn spec_version(mut self, spec_version: impl Into<String>) -> Self {
        self.spec_version = Some(spec_version.into());
        self
    }

    /// Set the timestamp. Defaults to the current time on
    /// [`build`](Self::build) if left unset.
    #[must_use]
    pub fn time(mut self, time: DateTime<FixedOffset>) -> Self {
        self.time = Some(time);
        self
    }

    /// Override `datacontenttype`. Left as `None` (meaning
    /// `application/json`) if never called.
    #[must_use]
    pub fn data_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.data_content_type = Some(content_type.into());
        self
    }

    /// Set the carried message (required — see [`ErrorCode::NullMessage`]).
    #[must_use]
    pub fn data<T: AnyMessage + 'static>(mut self, data: T) -> Self {
        self.data = Some(Box::new(data));
        self
    }

    /// Insert or replace a metadata entry. Silently dropped if `key`
    /// collides with a known field name, mirroring
    /// [`Envelope::metadata_set`].
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let key = key.into();
        if crate::envelope::is_known_field(&key) {
            return self;
        }
        if let Some(entry) = self.metadata.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.metadata.push((key, value));
        }
        self
    }

    /// Build the [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::InvalidData`] if `type_id` is empty, or
    /// [`ErrorCode::NullMessage`] if [`data`](Self::data) was never called.
    pub fn build(self) -> Result<Envelope> {
        if self.type_id.is_empty() {
            return Err(EnvelopeError::new(
                ErrorCode::InvalidData,
                "envelope type must be non-empty",
            ));
        }
        let data = self.data.ok_or_else(|| {
            EnvelopeError::new(
                ErrorCode::NullMessage,
                "envelope data must be set before building",
            )
        })?;
        Ok(Envelope {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            source: self.source,
            spec_version: self.spec_version.unwrap_or_else(|| CURRENT_SPEC_VERSION.to_string()),
            type_id: self.type_id,
            time: self.time.unwrap_or_else(|| Utc::now().into()),
            data_content_type: self.data_content_type,
            data,
            metadata: self.metadata,
            carrier: None,
        })
    }
}

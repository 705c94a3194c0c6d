// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy with stable error codes for the envelope
//! serialization core.
//!
//! Every error raised by `envelope-wire` carries an [`ErrorCode`] (a
//! machine-readable, stable string tag), a human-readable message, an
//! optional cause chain, and arbitrary key-value context. Use the builder
//! returned by [`EnvelopeError::new`] to construct errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Pooled-buffer scope errors.
    Pool,
    /// Outer-wrapper recognition/extraction errors.
    Wrapper,
    /// Inner envelope construction/parse errors.
    Envelope,
    /// MIME content-type classification errors.
    ContentType,
    /// Subscriber/publisher mapping lookup errors.
    Mapping,
    /// User-supplied message codec errors.
    Codec,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pool => "pool",
            Self::Wrapper => "wrapper",
            Self::Envelope => "envelope",
            Self::ContentType => "content_type",
            Self::Mapping => "mapping",
            Self::Codec => "codec",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases. These are exactly the
/// five error kinds of the serialization core's contract, plus a handful of
/// leaf codes that distinguish *why* a `ConvertFailed`/`SerializeFailed`
/// happened when the context is useful for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No publisher/subscriber mapping exists for a message type.
    MissingMapping,
    /// Envelope JSON malformed, required field missing, unparseable
    /// timestamp, or unresolvable `type`.
    InvalidData,
    /// Any exception from the writer, codec, or callback during serialize.
    SerializeFailed,
    /// Any exception during outer/inner parse, codec, or callback during
    /// convert.
    ConvertFailed,
    /// `envelope.message` is absent at serialize time.
    NullMessage,

    /// The outer carrier body did not start with a JSON object or array
    /// (queue-fallback parser's own terminal failure mode).
    MalformedCarrier,
    /// The user-supplied codec raised while serializing or deserializing
    /// the carried message.
    CodecFailed,
    /// A content-type string could not be classified at all (reserved —
    /// the classifier is total and never actually returns this; kept for
    /// API stability should that change).
    ContentTypeUnclassifiable,

    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingMapping => ErrorCategory::Mapping,
            Self::InvalidData => ErrorCategory::Envelope,
            Self::SerializeFailed | Self::ConvertFailed => ErrorCategory::Envelope,
            Self::NullMessage => ErrorCategory::Envelope,
            Self::MalformedCarrier => ErrorCategory::Wrapper,
            Self::CodecFailed => ErrorCategory::Codec,
            Self::ContentTypeUnclassifiable => ErrorCategory::ContentType,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"INVALID_DATA"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingMapping => "MISSING_MAPPING",
            Self::InvalidData => "INVALID_DATA",
            Self::SerializeFailed => "SERIALIZE_FAILED",
            Self::ConvertFailed => "CONVERT_FAILED",
            Self::NullMessage => "NULL_MESSAGE",
            Self::MalformedCarrier => "MALFORMED_CARRIER",
            Self::CodecFailed => "CODEC_FAILED",
            Self::ContentTypeUnclassifiable => "CONTENT_TYPE_UNCLASSIFIABLE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EnvelopeError
// ---------------------------------------------------------------------------

/// Unified envelope-core error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use envelope_error::{EnvelopeError, ErrorCode};
///
/// let err = EnvelopeError::new(ErrorCode::InvalidData, "missing required field: type")
///     .with_context("field", "type");
/// ```
pub struct EnvelopeError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl EnvelopeError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_cause(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Drop the cause chain, keeping the code/message/context.
    ///
    /// Used by the orchestrator when `log_message_content` is disabled and
    /// [`is_json_parse_failure`](Self::is_json_parse_failure) says this
    /// particular cause is a JSON-parse error that could embed payload
    /// fragments (quoted offending bytes, partial field values) in its
    /// `Display` output. Callers should gate this behind that check rather
    /// than calling it unconditionally — a cause unrelated to JSON parsing
    /// (a hook's own domain error, a missing mapping, ...) must keep its
    /// chain intact even when content logging is disabled.
    #[must_use]
    pub fn redacted(mut self) -> Self {
        self.source = None;
        self
    }

    /// `true` when this error's own code is one the core only ever raises
    /// for a JSON-parse-originated failure: a malformed/unparseable
    /// envelope ([`ErrorCode::InvalidData`]) or a codec's own JSON
    /// encode/decode failure ([`ErrorCode::CodecFailed`]). This is exactly
    /// the "JSON-parse exception" the `log-message-content = false`
    /// redaction rule targets — any other code (a missing mapping, a
    /// hook's own domain error, ...) is never redacted.
    #[must_use]
    pub fn is_json_parse_failure(&self) -> bool {
        matches!(self.code, ErrorCode::InvalidData | ErrorCode::CodecFailed)
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("EnvelopeError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience `Result` alias used throughout `envelope-wire`.
pub type Result<T> = std::result::Result<T, EnvelopeError>;

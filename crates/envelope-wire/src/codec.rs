// SPDX-License-Identifier: MIT OR Apache-2.0
//! Message codec contract: how a concrete application message type is
//! turned into (and back out of) the envelope's `data` field. Dynamic
//! dispatch on concrete codec types is replaced by a tagged variant
//! ([`CodecKind`]) rather than runtime type probing.
//!
//! Writing a codec is a caller's job, not this crate's: it only calls
//! through this interface. [`Codec`] is the type-erased shape the
//! orchestrator and writer/reader actually operate on; [`JsonCodec`] is the
//! one concrete implementation this crate ships, enough to exercise the
//! pipeline in tests and benches and to serve as a reference for a
//! caller's own codec.

use std::any::type_name;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use envelope_error::{EnvelopeError, ErrorCode, Result};

use crate::message::AnyMessage;

/// Which of the two shapes a [`Codec`] implements.
///
/// A codec with the UTF-8 capability writes directly into the envelope
/// writer's buffer and deserializes directly from a byte slice, avoiding an
/// intermediate `String`. A string-based codec round-trips through `String`
/// and the orchestrator wraps its output as a JSON value or JSON string
/// token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    /// Implements [`Codec::write_utf8`]/[`Codec::deserialize_utf8`].
    Utf8Capable,
    /// Only implements [`Codec::serialize_string`]/[`Codec::deserialize_string`].
    StringBased,
}

/// Type-erased message codec.
///
/// Exactly one of the two method pairs is meaningful for a given codec,
/// selected by [`Codec::kind`]; the other pair's default implementation
/// returns [`ErrorCode::CodecFailed`] if mistakenly invoked.
pub trait Codec: Send + Sync {
    /// Which shape this codec implements.
    fn kind(&self) -> CodecKind;

    /// The MIME type this codec declares for `datacontenttype`.
    fn content_type(&self) -> &str;

    /// Write `value`'s JSON-shaped (or otherwise self-delimiting) encoding
    /// directly into `out`, with no intermediate allocation beyond what the
    /// encoding itself needs. Only called when [`Codec::kind`] is
    /// [`CodecKind::Utf8Capable`].
    fn write_utf8(&self, out: &mut Vec<u8>, value: &dyn AnyMessage) -> Result<()> {
        let _ = (out, value);
        Err(EnvelopeError::new(
            ErrorCode::CodecFailed,
            "codec does not implement the UTF-8 capability",
        ))
    }

    /// Deserialize a typed message directly from `bytes`. Only called when
    /// [`Codec::kind`] is [`CodecKind::Utf8Capable`].
    fn deserialize_utf8(&self, bytes: &[u8]) -> Result<Box<dyn AnyMessage>> {
        let _ = bytes;
        Err(EnvelopeError::new(
            ErrorCode::CodecFailed,
            "codec does not implement the UTF-8 capability",
        ))
    }

    /// Serialize `value` to a `String`. Only called when [`Codec::kind`] is
    /// [`CodecKind::StringBased`].
    fn serialize_string(&self, value: &dyn AnyMessage) -> Result<String> {
        let _ = value;
        Err(EnvelopeError::new(
            ErrorCode::CodecFailed,
            "codec does not implement the string-based capability",
        ))
    }

    /// Deserialize a typed message from a `&str`. Called whenever `data` is
    /// not JSON-shaped, or is JSON-shaped but the codec is not UTF-8
    /// capable — the slice is decoded to a string first and handed to the
    /// string-based codec.
    fn deserialize_string(&self, payload: &str) -> Result<Box<dyn AnyMessage>> {
        let _ = payload;
        Err(EnvelopeError::new(
            ErrorCode::CodecFailed,
            "codec does not implement the string-based capability",
        ))
    }
}

/// A UTF-8-capable [`Codec`] backed by `serde_json`, for a single concrete
/// message type `T`.
///
/// This is the default/example codec the crate ships: most application
/// message types can use this directly rather than writing their own.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Construct a codec for message type `T`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + AnyMessage + 'static,
{
    fn kind(&self) -> CodecKind {
        CodecKind::Utf8Capable
    }

    fn content_type(&self) -> &str {
        "application/json"
    }

    fn write_utf8(&self, out: &mut Vec<u8>, value: &dyn AnyMessage) -> Result<()> {
        let value = downcast::<T>(value)?;
        serde_json::to_writer(out, value).map_err(|e| {
            EnvelopeError::new(ErrorCode::CodecFailed, "failed to write JSON value").with_cause(e)
        })
    }

    fn deserialize_utf8(&self, bytes: &[u8]) -> Result<Box<dyn AnyMessage>> {
        let value: T = serde_json::from_slice(bytes).map_err(|e| {
            EnvelopeError::new(ErrorCode::CodecFailed, "failed to parse JSON value").with_cause(e)
        })?;
        Ok(Box::new(value))
    }

    fn serialize_string(&self, value: &dyn AnyMessage) -> Result<String> {
        let value = downcast::<T>(value)?;
        serde_json::to_string(value).map_err(|e| {
            EnvelopeError::new(ErrorCode::CodecFailed, "failed to serialize JSON value")
                .with_cause(e)
        })
    }

    fn deserialize_string(&self, payload: &str) -> Result<Box<dyn AnyMessage>> {
        let value: T = serde_json::from_str(payload).map_err(|e| {
            EnvelopeError::new(ErrorCode::CodecFailed, "failed to parse JSON value").with_cause(e)
        })?;
        Ok(Box::new(value))
    }
}

fn downcast<T: 'static>(value: &dyn AnyMessage) -> Result<&T> {
    value.as_any().downcast_ref::<T>().ok_or_else(|| {
        EnvelopeError::new(
            ErrorCode::CodecFailed,
            format!("expected message of type {}", type_name::<T>()),
        )
    })
}

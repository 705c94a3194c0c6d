// SPDX-License-Identifier: MIT OR Apache-2.0
//! Envelope reader: parse an inner event envelope, capture the
//! `data` slice without copying when possible, and materialize a typed
//! envelope via a registered subscriber mapping.

use chrono::{DateTime, FixedOffset};

use envelope_error::{EnvelopeError, ErrorCode, Result};

use crate::collaborators::{SubscriberDescriptor, SubscriberRegistry};
use crate::content_type::is_json_content_type;
use crate::envelope::{is_known_field, Envelope};
use crate::pool::{BufferHandle, ExtraPool};
use crate::scan::{Cursor, Span, StringToken};
use crate::utf8_reader::unescape_value;

/// Where the `data` value's bytes came from, mirroring
/// [`crate::wrappers::InnerPayload`] but scoped to the *inner* envelope's
/// own `data` field. Both variants are plain indices into
/// buffers owned elsewhere (the inner payload slice, or the pool), so this
/// type itself never borrows anything and needs no lifetime parameter.
enum DataBytes {
    /// Zero-copy span of the inner payload buffer; used when `data` is
    /// JSON-shaped.
    JsonSlice(Span),
    /// Unescaped bytes rented from the pool; used when `data` is not
    /// JSON-shaped (so it arrived as a JSON string token).
    Pooled(BufferHandle),
}

fn invalid_data(msg: impl Into<String>) -> EnvelopeError {
    EnvelopeError::new(ErrorCode::InvalidData, msg)
}

/// Result of parsing the inner envelope's bytes, before the subscriber
/// mapping and codec have materialized `data` into a typed message.
struct ParsedFields {
    id: Option<String>,
    source: Option<String>,
    spec_version: Option<String>,
    type_id: Option<String>,
    time_raw: Option<String>,
    data_content_type: Option<String>,
    data_is_json: bool,
    data_bytes: Option<DataBytes>,
    metadata: Vec<(String, serde_json::Value)>,
}

/// Streaming reader for the canonical envelope shape.
pub struct EnvelopeReader;

impl EnvelopeReader {
    /// Parse `bytes` (the inner payload, after any wrapper has been
    /// stripped), resolve the subscriber mapping for its `type`, and
    /// materialize a fully typed [`Envelope`].
    ///
    /// `pool` is used only when `data` turns out not to be JSON-shaped (it
    /// must then be unescaped into pooled bytes); a `data` value that is
    /// JSON-shaped is captured as a zero-copy slice of `bytes` instead.
    pub fn read(
        bytes: &[u8],
        pool: &mut ExtraPool<'_>,
        registry: &dyn SubscriberRegistry,
    ) -> Result<(Envelope, SubscriberDescriptor)> {
        Self::read_with_carrier(bytes, pool, registry, None)
    }

    /// As [`read`](Self::read), but attaches carrier metadata to the
    /// materialized envelope. Used by
    /// [`crate::orchestrator::EnvelopeSerializer::convert_to_envelope`],
    /// which has already run the wrapper-parser chain and has carrier
    /// metadata to attach.
    pub fn read_with_carrier(
        bytes: &[u8],
        pool: &mut ExtraPool<'_>,
        registry: &dyn SubscriberRegistry,
        carrier: Option<crate::carrier::CarrierMetadata>,
    ) -> Result<(Envelope, SubscriberDescriptor)> {
        let fields = Self::parse_fields(bytes, pool)?;

        let type_id = fields
            .type_id
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid_data("missing or empty required field: type"))?;

        let descriptor = registry.get(&type_id).ok_or_else(|| {
            let available = registry.list().join(", ");
            invalid_data(format!(
                "no subscriber mapping for type \"{type_id}\"; available mappings: [{available}]"
            ))
        })?;

        let id = fields
            .id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid_data("missing required field: id"))?;
        let spec_version = fields
            .spec_version
            .ok_or_else(|| invalid_data("missing required field: specversion"))?;
        if !crate::version::is_known_spec_version(&spec_version) {
            tracing::warn!(specversion = %spec_version, "unrecognized envelope specversion");
        }
        let time_raw = fields
            .time_raw
            .ok_or_else(|| invalid_data("missing required field: time"))?;
        let time = parse_timestamp(&time_raw)?;

        let data_bytes = fields
            .data_bytes
            .ok_or_else(|| invalid_data("missing required field: data"))?;

        let message = match data_bytes {
            DataBytes::JsonSlice(span) => {
                let slice = span.slice(bytes);
                materialize(&descriptor, slice, true)?
            }
            DataBytes::Pooled(handle) => {
                let slice = pool.buffer(handle);
                materialize(&descriptor, slice, false)?
            }
        };

        let envelope = Envelope {
            id,
            source: fields.source,
            spec_version,
            type_id,
            time,
            data_content_type: fields.data_content_type,
            data: message,
            metadata: fields.metadata,
            carrier,
        };
        Ok((envelope, descriptor))
    }

    fn parse_fields(bytes: &[u8], pool: &mut ExtraPool<'_>) -> Result<ParsedFields> {
        let mut cursor = Cursor::new(bytes);
        cursor
            .enter_object()
            .map_err(|e| invalid_data(format!("envelope JSON must start with object: {e}")))?;

        let mut id = None;
        let mut source = None;
        let mut spec_version = None;
        let mut type_id = None;
        let mut time_raw = None;
        let mut data_content_type: Option<String> = None;
        // Blank/absent content type is JSON-shaped by default; the reader
        // must assume this before `datacontenttype` has been seen, to
        // handle `data` arriving first in field order.
        let mut data_is_json = true;
        let mut data_bytes: Option<DataBytes> = None;
        let mut metadata = Vec::new();

        loop {
            let key = cursor
                .next_key()
                .map_err(|e| invalid_data(format!("malformed envelope JSON: {e}")))?;
            let Some(key) = key else { break };
            let key_str = std::str::from_utf8(key.content.slice(bytes))
                .map_err(|_| invalid_data("non-UTF-8 key in envelope JSON"))?;

            match key_str {
                "id" => id = Some(read_string(&mut cursor, bytes)?),
                "source" => source = Some(read_string(&mut cursor, bytes)?),
                "specversion" => spec_version = Some(read_string(&mut cursor, bytes)?),
                "type" => type_id = Some(read_string(&mut cursor, bytes)?),
                "time" => time_raw = Some(read_string(&mut cursor, bytes)?),
                "datacontenttype" => {
                    let ct = read_string(&mut cursor, bytes)?;
                    data_is_json = is_json_content_type(Some(&ct));
                    data_content_type = Some(ct);
                }
                "data" => {
                    if data_is_json {
                        let span = cursor
                            .skip_value()
                            .map_err(|e| invalid_data(format!("malformed data value: {e}")))?;
                        data_bytes = Some(DataBytes::JsonSlice(span));
                    } else {
                        cursor.skip_ws();
                        let tok = cursor.parse_string().map_err(|_| {
                            invalid_data("data must be a JSON string when datacontenttype is not JSON-shaped")
                        })?;
                        let handle = unescape_value(bytes, tok, pool)
                            .map_err(|e| invalid_data(format!("failed to unescape data: {e}")))?;
                        data_bytes = Some(DataBytes::Pooled(handle));
                    }
                }
                other if is_known_field(other) => {
                    // Unreachable in practice (all seven are matched
                    // above); guards against a known field name sneaking
                    // in here if that ever changes.
                    cursor
                        .skip_value()
                        .map_err(|e| invalid_data(format!("malformed value for {other}: {e}")))?;
                }
                other => {
                    let span = cursor
                        .skip_value()
                        .map_err(|e| invalid_data(format!("malformed value for {other}: {e}")))?;
                    let value: serde_json::Value = serde_json::from_slice(span.slice(bytes))
                        .map_err(|e| invalid_data(format!("malformed metadata value for {other}: {e}")))?;
                    metadata.push((other.to_string(), value));
                }
            }
        }

        Ok(ParsedFields {
            id,
            source,
            spec_version,
            type_id,
            time_raw,
            data_content_type,
            data_is_json,
            data_bytes,
            metadata,
        })
    }
}

fn read_string(cursor: &mut Cursor<'_>, bytes: &[u8]) -> Result<String> {
    let tok = cursor
        .parse_string()
        .map_err(|e| invalid_data(format!("expected string value: {e}")))?;
    decode_token(bytes, tok)
}

fn decode_token(bytes: &[u8], tok: StringToken) -> Result<String> {
    let mut buf = Vec::with_capacity(tok.content.end - tok.content.start);
    Cursor::decode_string_into(bytes, tok, &mut buf)
        .map_err(|e| invalid_data(format!("invalid string escape: {e}")))?;
    String::from_utf8(buf).map_err(|e| invalid_data(format!("non-UTF-8 string value: {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| invalid_data(format!("unparseable timestamp \"{raw}\": {e}")))
}

fn materialize(
    descriptor: &SubscriberDescriptor,
    slice: &[u8],
    is_json: bool,
) -> Result<Box<dyn crate::message::AnyMessage>> {
    if is_json {
        match descriptor.codec.kind() {
            crate::codec::CodecKind::Utf8Capable => descriptor.codec.deserialize_utf8(slice),
            crate::codec::CodecKind::StringBased => {
                let s = std::str::from_utf8(slice)
                    .map_err(|e| invalid_data(format!("data is not valid UTF-8: {e}")))?;
                descriptor.codec.deserialize_string(s)
            }
        }
    } else {
        let s = std::str::from_utf8(slice)
            .map_err(|e| invalid_data(format!("data is not valid UTF-8: {e}")))?;
        descriptor.codec.deserialize_string(s)
    }
}

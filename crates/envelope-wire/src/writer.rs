// SPDX-License-Identifier: MIT OR Apache-2.0
//! Envelope writer: emit a canonical event envelope into a
//! growable UTF-8 buffer using a streaming approach — each field is
//! written directly, with no intermediate `serde_json::Value` tree for the
//! envelope shell itself (only metadata values and, on the string-codec
//! path, the `data` value, are ever materialized as `Value`s).

use envelope_error::{EnvelopeError, ErrorCode, Result};

use crate::codec::{Codec, CodecKind};
use crate::content_type::is_json_content_type;
use crate::envelope::{is_known_field, Envelope};

/// Streaming writer for the canonical envelope shape.
pub struct EnvelopeWriter;

impl EnvelopeWriter {
    /// Write `envelope` into `out`, using `codec` to serialize `data`.
    ///
    /// `out` is not cleared first; callers that want a fresh buffer should
    /// pass an empty one (the orchestrator always does, since `out` is a
    /// buffer rented fresh for this call).
    pub fn write(envelope: &Envelope, codec: &dyn Codec, out: &mut Vec<u8>) -> Result<()> {
        out.push(b'{');
        write_field_sep(out, "id");
        write_json_string(out, &envelope.id)?;

        if let Some(source) = &envelope.source {
            out.push(b',');
            write_field_sep(out, "source");
            write_json_string(out, source)?;
        }

        out.push(b',');
        write_field_sep(out, "specversion");
        write_json_string(out, &envelope.spec_version)?;

        out.push(b',');
        write_field_sep(out, "type");
        write_json_string(out, &envelope.type_id)?;

        out.push(b',');
        write_field_sep(out, "time");
        write_json_string(out, &envelope.time.to_rfc3339())?;

        out.push(b',');
        write_data(envelope, codec, out)?;

        for (key, value) in &envelope.metadata {
            if is_known_field(key) || value.is_null() {
                continue;
            }
            out.push(b',');
            write_field_sep(out, key);
            serde_json::to_writer(&mut *out, value).map_err(|e| {
                EnvelopeError::new(ErrorCode::SerializeFailed, "failed to write metadata value")
                    .with_cause(e)
            })?;
        }

        out.push(b'}');
        Ok(())
    }
}

fn write_data(envelope: &Envelope, codec: &dyn Codec, out: &mut Vec<u8>) -> Result<()> {
    match codec.kind() {
        CodecKind::Utf8Capable => {
            let content_type = codec.content_type().to_string();
            write_field_sep(out, "datacontenttype");
            write_json_string(out, &content_type)?;
            out.push(b',');
            write_field_sep(out, "data");
            codec
                .write_utf8(out, envelope.data.as_ref())
                .map_err(|e| EnvelopeError::new(ErrorCode::SerializeFailed, "codec write failed").with_cause(e))?;
            Ok(())
        }
        CodecKind::StringBased => {
            let payload = codec.serialize_string(envelope.data.as_ref()).map_err(|e| {
                EnvelopeError::new(ErrorCode::SerializeFailed, "codec serialize failed")
                    .with_cause(e)
            })?;
            let content_type = codec.content_type().to_string();
            write_field_sep(out, "datacontenttype");
            write_json_string(out, &content_type)?;
            out.push(b',');
            write_field_sep(out, "data");
            if is_json_content_type(Some(&content_type)) {
                // The codec's own output is already valid JSON text; emit
                // it verbatim as a JSON value rather than re-quoting it.
                out.extend_from_slice(payload.trim().as_bytes());
            } else {
                write_json_string(out, &payload)?;
            }
            Ok(())
        }
    }
}

fn write_field_sep(out: &mut Vec<u8>, key: &str) {
    out.push(b'"');
    out.extend_from_slice(key.as_bytes());
    out.extend_from_slice(b"\":");
}

fn write_json_string(out: &mut Vec<u8>, value: &str) -> Result<()> {
    // Reuse serde_json's escaping rather than hand-rolling it.
    serde_json::to_writer(out, value).map_err(|e| {
        EnvelopeError::new(ErrorCode::SerializeFailed, "failed to write string field").with_cause(e)
    })
}

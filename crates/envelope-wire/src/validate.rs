// SPDX-License-Identifier: MIT OR Apache-2.0
//! Defensive pre-write validation: check a constructed [`Envelope`] against
//! its structural invariants before it is handed to
//! [`crate::writer::EnvelopeWriter`], and flag soft issues that are legal
//! but worth a caller's attention.

use crate::envelope::{is_known_field, Envelope};
use crate::version::is_known_spec_version;

/// Recommended maximum serialized size (bytes) for a single envelope, in
/// line with common cloud-queue message-size limits — payloads are expected
/// to fit the carrier service's limits, typically at or below 256 KiB.
pub const MAX_RECOMMENDED_PAYLOAD: usize = 256 * 1024;

/// A hard violation of the envelope's structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `id` is empty.
    #[error("envelope id must be non-empty")]
    EmptyId,
    /// `type` is empty.
    #[error("envelope type must be non-empty")]
    EmptyType,
    /// `metadata` contains a key colliding with a known field name —
    /// should be unreachable via [`crate::builder::EnvelopeBuilder`]
    /// or [`Envelope::metadata_set`], but a caller may have built the
    /// `metadata` vector by hand.
    #[error("metadata key \"{key}\" collides with a known envelope field")]
    MetadataKeyCollision {
        /// The colliding key.
        key: String,
    },
}

/// A soft, non-fatal observation about an envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationWarning {
    /// `specversion` is not one this crate recognizes.
    #[error("unrecognized specversion: \"{version}\"")]
    UnknownSpecVersion {
        /// The unrecognized version string.
        version: String,
    },
    /// `source` was not set; the emitted envelope will omit it entirely.
    #[error("envelope has no source URI set")]
    MissingSource,
    /// The envelope's serialized size exceeds [`MAX_RECOMMENDED_PAYLOAD`].
    #[error("envelope size {size} bytes exceeds recommended maximum of {max_recommended} bytes")]
    LargePayload {
        /// Actual size in bytes.
        size: usize,
        /// Recommended maximum size in bytes.
        max_recommended: usize,
    },
}

/// The result of validating a single [`Envelope`].
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// `true` when there are no errors (warnings are allowed).
    pub valid: bool,
    /// Hard errors found during validation.
    pub errors: Vec<ValidationError>,
    /// Soft warnings found during validation.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn push_error(&mut self, e: ValidationError) {
        self.valid = false;
        self.errors.push(e);
    }

    fn push_warning(&mut self, w: ValidationWarning) {
        self.warnings.push(w);
    }
}

/// Validates envelopes against their structural invariants ahead of serialization.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvelopeValidator;

impl EnvelopeValidator {
    /// Create a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate a single envelope's structural shape.
    #[must_use]
    pub fn validate(&self, envelope: &Envelope) -> ValidationResult {
        let mut result = ValidationResult::new();

        if envelope.id.is_empty() {
            result.push_error(ValidationError::EmptyId);
        }
        if envelope.type_id.is_empty() {
            result.push_error(ValidationError::EmptyType);
        }
        for (key, _) in &envelope.metadata {
            if is_known_field(key) {
                result.push_error(ValidationError::MetadataKeyCollision { key: key.clone() });
            }
        }
        if !is_known_spec_version(&envelope.spec_version) {
            result.push_warning(ValidationWarning::UnknownSpecVersion {
                version: envelope.spec_version.clone(),
            });
        }
        if envelope.source.is_none() {
            result.push_warning(ValidationWarning::MissingSource);
        }

        result
    }

    /// Check an already-serialized envelope's byte size against
    /// [`MAX_RECOMMENDED_PAYLOAD`], returning a warning if it is exceeded.
    #[must_use]
    pub fn check_serialized_size(&self, bytes: &[u8]) -> Option<ValidationWarning> {
        if bytes.len() > MAX_RECOMMENDED_PAYLOAD {
            Some(ValidationWarning::LargePayload {
                size: bytes.len(),
                max_recommended: MAX_RECOMMENDED_PAYLOAD,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EnvelopeBuilder;

    #[test]
    fn valid_envelope_has_no_errors() {
        let envelope = EnvelopeBuilder::new("ping")
            .source("/svc/a")
            .data(1u32)
            .build()
            .unwrap();
        let result = EnvelopeValidator::new().validate(&envelope);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn missing_source_is_a_warning_not_an_error() {
        let envelope = EnvelopeBuilder::new("ping").data(1u32).build().unwrap();
        let result = EnvelopeValidator::new().validate(&envelope);
        assert!(result.valid);
        assert!(result
            .warnings
            .contains(&ValidationWarning::MissingSource));
    }

    #[test]
    fn unknown_spec_version_is_a_warning() {
        let envelope = EnvelopeBuilder::new("ping")
            .spec_version("2.0")
            .data(1u32)
            .build()
            .unwrap();
        let result = EnvelopeValidator::new().validate(&envelope);
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::UnknownSpecVersion { version } if version == "2.0")));
    }

    #[test]
    fn oversized_serialized_payload_is_flagged() {
        let bytes = vec![0u8; MAX_RECOMMENDED_PAYLOAD + 1];
        let warning = EnvelopeValidator::new().check_serialized_size(&bytes);
        assert!(matches!(warning, Some(ValidationWarning::LargePayload { .. })));
    }
}

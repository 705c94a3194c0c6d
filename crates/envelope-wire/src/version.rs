// SPDX-License-Identifier: MIT OR Apache-2.0
//! The envelope's own `specversion` field.
//!
//! The CloudEvents-shaped `specversion` this crate emits is just the literal
//! string `"1.0"`; there is no version-negotiation handshake to perform.
//! This module only offers the one thing a reader can usefully do with an
//! unrecognised `specversion`: notice it, without failing the read.

/// The `specversion` value this crate always emits.
pub const CURRENT_SPEC_VERSION: &str = "1.0";

/// `specversion` strings this crate recognizes when reading an envelope.
const KNOWN_SPEC_VERSIONS: &[&str] = &["1.0"];

/// `true` if `version` is one this crate recognizes.
///
/// An unknown `specversion` is not a read failure; callers that care can
/// use this to log a warning.
#[must_use]
pub fn is_known_spec_version(version: &str) -> bool {
    KNOWN_SPEC_VERSIONS.contains(&version)
}

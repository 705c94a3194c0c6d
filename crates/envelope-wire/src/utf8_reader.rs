// SPDX-License-Identifier: MIT OR Apache-2.0
//! UTF-8 reader helpers: unescape a JSON string token into pooled UTF-8
//! bytes.

use crate::pool::{BufferHandle, ExtraPool};
use crate::scan::{Cursor, StringToken};

/// Unescape a scanned JSON string [`StringToken`] into a buffer rented from
/// `pool`, returning the handle.
///
/// Fast path: when the token has no escape sequences, the raw token bytes
/// are copied into a buffer sized exactly to the token length (no decoding
/// work, no growth). Slow path: a buffer sized to the escaped length (an
/// upper bound on the unescaped length, since every escape sequence is at
/// least as long as its decoded output) is rented and the decoded bytes are
/// written into it. The returned slice's lifetime is tied to the owning
/// [`crate::pool::PooledScope`].
pub fn unescape_value(
    source: &[u8],
    token: StringToken,
    pool: &mut ExtraPool<'_>,
) -> Result<BufferHandle, crate::scan::ScanError> {
    let raw_len = token.content.end - token.content.start;
    if !token.has_escapes {
        let handle = pool.rent(raw_len);
        pool.buffer_mut(handle)
            .extend_from_slice(token.content.slice(source));
        return Ok(handle);
    }
    let handle = pool.rent(raw_len);
    // `decode_string_into` appends; the buffer is already empty post-rent.
    let mut out = std::mem::take(pool.buffer_mut(handle));
    Cursor::decode_string_into(source, token, &mut out)?;
    *pool.buffer_mut(handle) = out;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PooledScope;
    use crate::scan::Cursor;

    #[test]
    fn fast_path_copies_raw_bytes_without_decoding() {
        let input = br#""plain text""#;
        let mut cursor = Cursor::new(input);
        let token = cursor.parse_string().unwrap();
        let mut scope = PooledScope::new(false);
        let mut pool = scope.pool();
        let handle = unescape_value(input, token, &mut pool).unwrap();
        assert_eq!(pool.buffer(handle), b"plain text");
    }

    #[test]
    fn slow_path_decodes_escapes() {
        let input = br#""line1\nline2""#;
        let mut cursor = Cursor::new(input);
        let token = cursor.parse_string().unwrap();
        let mut scope = PooledScope::new(false);
        let mut pool = scope.pool();
        let handle = unescape_value(input, token, &mut pool).unwrap();
        assert_eq!(pool.buffer(handle), b"line1\nline2");
    }

    #[test]
    fn decoded_length_never_exceeds_rented_capacity_upper_bound() {
        let input = br#""ABC""#; // "ABC"
        let mut cursor = Cursor::new(input);
        let token = cursor.parse_string().unwrap();
        let mut scope = PooledScope::new(false);
        let mut pool = scope.pool();
        let handle = unescape_value(input, token, &mut pool).unwrap();
        assert_eq!(pool.buffer(handle), b"ABC");
    }
}

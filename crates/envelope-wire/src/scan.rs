// SPDX-License-Identifier: MIT OR Apache-2.0
//! A minimal, single-pass JSON token scanner over a borrowed byte slice.
//!
//! This is deliberately not a general-purpose JSON parser: it only knows how
//! to walk a *top-level object*, read string tokens, and skip arbitrary
//! values while recording their byte span. That is exactly what the wrapper
//! parsers and the envelope reader need to recognise known top-level keys
//! and capture the `data`/`Message`/`detail` value as a zero-copy span of
//! the input buffer, without materialising a full `serde_json::Value` tree
//! for bytes nobody asked to look at.
//!
//! Full JSON *values* (objects/arrays that are not the `data` payload, e.g.
//! `MessageAttributes`) are handed to `serde_json` once their span has been
//! located here — this module only ever needs to track brace/bracket
//! balance and string-token boundaries, not field semantics. Decoding an
//! escaped string's content is likewise handed to `serde_json` rather than
//! hand-rolled (see [`Cursor::decode_string_into`]); only the byte-span
//! scanning here is hand-rolled.

/// A span `[start, end)` into the scanned byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// Resolve this span against `bytes`.
    #[must_use]
    pub fn slice<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        &bytes[self.start..self.end]
    }
}

/// A scanned JSON string token: the span of its *content* (between the
/// quotes, exclusive) plus whether it contains any backslash escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringToken {
    /// Span of the raw content bytes, not including the surrounding quotes.
    pub content: Span,
    /// `true` if the token contains at least one `\` escape sequence.
    pub has_escapes: bool,
}

/// Errors produced while scanning. All are recoverable — callers convert
/// them into a wrapper-parser "no match" or an `InvalidData` envelope error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Input ended before a complete token/value was read.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// Expected one byte, found another, at the given offset.
    #[error("expected {expected} at byte offset {pos}")]
    UnexpectedByte { expected: &'static str, pos: usize },
    /// A `\u` escape was not followed by four hex digits.
    #[error("invalid \\u escape at byte offset {pos}")]
    InvalidUnicodeEscape { pos: usize },
}

/// A cursor over a borrowed byte slice, positioned for single-pass,
/// non-backtracking JSON token scanning.
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Start a cursor at the beginning of `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current byte offset.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    /// Advance past ASCII JSON whitespace.
    pub fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: u8, expected: &'static str) -> Result<(), ScanError> {
        match self.bump() {
            Some(b) if b == want => Ok(()),
            Some(_) => Err(ScanError::UnexpectedByte {
                expected,
                pos: self.pos - 1,
            }),
            None => Err(ScanError::UnexpectedEof),
        }
    }

    /// Consume an opening `{`, skipping leading whitespace first.
    pub fn enter_object(&mut self) -> Result<(), ScanError> {
        self.skip_ws();
        self.expect(b'{', "object start '{'")
    }

    /// Parse a JSON string token. Cursor must be positioned on the opening
    /// quote (callers typically `skip_ws()` first).
    pub fn parse_string(&mut self) -> Result<StringToken, ScanError> {
        self.skip_ws();
        self.expect(b'"', "string '\"'")?;
        let content_start = self.pos;
        let mut has_escapes = false;
        loop {
            match self.bump() {
                None => return Err(ScanError::UnexpectedEof),
                Some(b'"') => {
                    let content_end = self.pos - 1;
                    return Ok(StringToken {
                        content: Span {
                            start: content_start,
                            end: content_end,
                        },
                        has_escapes,
                    });
                }
                Some(b'\\') => {
                    has_escapes = true;
                    match self.bump() {
                        None => return Err(ScanError::UnexpectedEof),
                        Some(b'u') => {
                            for _ in 0..4 {
                                match self.bump() {
                                    Some(h) if h.is_ascii_hexdigit() => {}
                                    _ => {
                                        return Err(ScanError::InvalidUnicodeEscape {
                                            pos: self.pos,
                                        });
                                    }
                                }
                            }
                        }
                        Some(_) => {} // any other escaped byte is a single unit
                    }
                }
                Some(_) => {}
            }
        }
    }

    /// Skip over one complete JSON value of any shape, returning its span
    /// (including delimiters, e.g. the quotes for a string, the braces for
    /// an object).
    pub fn skip_value(&mut self) -> Result<Span, ScanError> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(b'"') => {
                self.parse_string()?;
            }
            Some(b'{') => self.skip_balanced(b'{', b'}')?,
            Some(b'[') => self.skip_balanced(b'[', b']')?,
            Some(b't') => self.skip_literal(b"true")?,
            Some(b'f') => self.skip_literal(b"false")?,
            Some(b'n') => self.skip_literal(b"null")?,
            Some(b'-') | Some(b'0'..=b'9') => self.skip_number(),
            Some(_) => {
                return Err(ScanError::UnexpectedByte {
                    expected: "value",
                    pos: self.pos,
                });
            }
            None => return Err(ScanError::UnexpectedEof),
        }
        Ok(Span {
            start,
            end: self.pos,
        })
    }

    fn skip_literal(&mut self, lit: &[u8]) -> Result<(), ScanError> {
        for &want in lit {
            self.expect(want, "literal")?;
        }
        Ok(())
    }

    fn skip_number(&mut self) {
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
    }

    /// Skip a balanced `open`/`close` structure (object or array), correctly
    /// stepping over nested strings (so braces/brackets inside string
    /// literals don't confuse the depth count) and nested structures.
    fn skip_balanced(&mut self, open: u8, close: u8) -> Result<(), ScanError> {
        self.expect(open, "opening delimiter")?;
        let mut depth: u32 = 1;
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(ScanError::UnexpectedEof),
                Some(b'"') => {
                    self.parse_string()?;
                }
                Some(b) if b == open => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b) if b == close => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(b'{') => self.skip_balanced(b'{', b'}')?,
                Some(b'[') => self.skip_balanced(b'[', b']')?,
                Some(_) => {
                    self.pos += 1;
                }
            }
        }
    }

    /// Read the next top-level object key, returning `None` once the
    /// closing `}` is reached. Cursor must already be inside the object
    /// (after [`enter_object`](Self::enter_object), or after a prior
    /// `next_key`/value pair).
    pub fn next_key(&mut self) -> Result<Option<StringToken>, ScanError> {
        self.skip_ws();
        match self.peek() {
            Some(b'}') => {
                self.pos += 1;
                Ok(None)
            }
            Some(b',') => {
                self.pos += 1;
                self.skip_ws();
                let key = self.parse_string()?;
                self.skip_ws();
                self.expect(b':', "key/value separator ':'")?;
                Ok(Some(key))
            }
            Some(b'"') => {
                let key = self.parse_string()?;
                self.skip_ws();
                self.expect(b':', "key/value separator ':'")?;
                Ok(Some(key))
            }
            Some(_) => Err(ScanError::UnexpectedByte {
                expected: "',' or '}' or key",
                pos: self.pos,
            }),
            None => Err(ScanError::UnexpectedEof),
        }
    }

    /// Unescape a [`StringToken`] into `out`, appending decoded UTF-8 bytes.
    /// `bytes` must be the same slice this cursor scanned.
    ///
    /// The fast, no-escapes path copies the raw content bytes directly. The
    /// escaped path hands the token back to `serde_json` rather than
    /// hand-rolling `\uXXXX`/surrogate-pair decoding: `content.start` is
    /// always at least 1 since [`parse_string`](Self::parse_string) only
    /// ever produces a token after consuming its opening quote, so
    /// re-including both quotes around the content span reconstructs a
    /// standalone JSON string literal that `serde_json` can decode on its
    /// own. Only the boundary/escape-presence scanning stays hand-rolled
    /// here; the decode step matches `writer.rs`'s reuse of `serde_json` for
    /// string escaping.
    pub fn decode_string_into(
        bytes: &[u8],
        token: StringToken,
        out: &mut Vec<u8>,
    ) -> Result<(), ScanError> {
        let raw = token.content.slice(bytes);
        if !token.has_escapes {
            out.extend_from_slice(raw);
            return Ok(());
        }
        let quoted = &bytes[token.content.start - 1..token.content.end + 1];
        let decoded: String = serde_json::from_slice(quoted).map_err(|_| {
            ScanError::InvalidUnicodeEscape {
                pos: token.content.start,
            }
        })?;
        out.extend_from_slice(decoded.as_bytes());
        Ok(())
    }
}

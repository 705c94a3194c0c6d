// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wrapper parsers: recognize an outer envelope by cheap byte-scan, then
//! extract the inner payload slice and wrapper metadata.
//!
//! Each parser's `try_parse` is infallible from the caller's point of view:
//! any malformed-JSON/type-mismatch condition inside it is swallowed and
//! turned into `None`, never a propagated error — wrapper-parser failures
//! stay local to the parser that hit them.

use crate::carrier::{
    CarrierMetadata, EventBridgeMetadata, MessageAttribute, NotificationMetadata, OriginalMessage,
    QueueMetadata,
};
use crate::pool::{BufferHandle, PooledScope};
use crate::scan::{Cursor, Span};
use crate::utf8_reader::unescape_value;

/// How many leading bytes of the payload [`WrapperParser::quick_match`]
/// scans for sentinel substrings.
pub const QUICK_MATCH_WINDOW: usize = 2048;

/// The inner payload a wrapper parser extracted, either a zero-copy slice
/// of the original carrier body or bytes unescaped into a buffer rented
/// from the enclosing [`PooledScope`].
#[derive(Debug, Clone, Copy)]
pub enum InnerPayload<'s> {
    /// A zero-copy slice of the scope's source buffer.
    Slice(&'s [u8]),
    /// A handle to a buffer rented from the scope's extra pool, containing
    /// unescaped UTF-8 bytes.
    Pooled(BufferHandle),
}

impl<'s> InnerPayload<'s> {
    /// Resolve to the actual bytes, given the owning scope.
    #[must_use]
    pub fn resolve(&self, scope: &'s PooledScope) -> &'s [u8] {
        match self {
            InnerPayload::Slice(bytes) => bytes,
            InnerPayload::Pooled(handle) => scope.extra_buffer(*handle),
        }
    }
}

/// A wrapper recognizer/extractor.
pub trait WrapperParser: Send + Sync {
    /// Name used in diagnostics only.
    fn name(&self) -> &'static str;

    /// Cheap, allocation-free scan of the first [`QUICK_MATCH_WINDOW`]
    /// bytes of `bytes` for this wrapper's sentinel substrings. A hint, not
    /// the authority — a quick match that doesn't pan out in `try_parse`
    /// falls through to the next parser in the chain.
    fn quick_match(&self, bytes: &[u8]) -> bool;

    /// Attempt a full parse. `scope` is reborrowed for the duration of the
    /// call and, on success, the returned [`InnerPayload`] continues to
    /// borrow (or reference a pooled buffer inside) it.
    fn try_parse<'s>(
        &self,
        scope: &'s mut PooledScope,
        original: &OriginalMessage,
    ) -> Option<(InnerPayload<'s>, CarrierMetadata)>;
}

fn quick_match_window(bytes: &[u8]) -> &[u8] {
    let end = bytes.len().min(QUICK_MATCH_WINDOW);
    &bytes[..end]
}

fn contains_all(haystack: &[u8], needles: &[&str]) -> bool {
    let text = String::from_utf8_lossy(haystack);
    needles.iter().all(|n| text.contains(n))
}

// ---------------------------------------------------------------------------
// Notification parser
// ---------------------------------------------------------------------------

/// Recognizes a notification-service wrapper.
pub struct NotificationParser;

impl WrapperParser for NotificationParser {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn quick_match(&self, bytes: &[u8]) -> bool {
        let window = quick_match_window(bytes);
        contains_all(window, &["\"Type\":\"Notification\""])
            || contains_all(window, &["\"TopicArn\""])
    }

    fn try_parse<'s>(
        &self,
        scope: &'s mut PooledScope,
        original: &OriginalMessage,
    ) -> Option<(InnerPayload<'s>, CarrierMetadata)> {
        let (source, mut pool) = scope.source_and_pool();
        let mut cursor = Cursor::new(source);
        cursor.enter_object().ok()?;

        let mut is_notification = false;
        let mut topic_arn: Option<String> = None;
        let mut message_id: Option<String> = None;
        let mut timestamp: Option<String> = None;
        let mut subject: Option<String> = None;
        let mut unsubscribe_url: Option<String> = None;
        let mut message_attributes: Vec<(String, MessageAttribute)> = Vec::new();
        let mut message_span: Option<(Span, bool)> = None; // (span, is_string_token)

        loop {
            let key = match cursor.next_key().ok()? {
                Some(k) => k,
                None => break,
            };
            let key_str = std::str::from_utf8(key.content.slice(source)).ok()?;
            match key_str {
                "Type" => {
                    let tok = cursor.parse_string().ok()?;
                    let s = decode_to_string(source, tok)?;
                    is_notification = s == "Notification";
                }
                "TopicArn" => {
                    let tok = cursor.parse_string().ok()?;
                    topic_arn = Some(decode_to_string(source, tok)?);
                }
                "MessageId" => {
                    let tok = cursor.parse_string().ok()?;
                    message_id = Some(decode_to_string(source, tok)?);
                }
                "Timestamp" => {
                    let tok = cursor.parse_string().ok()?;
                    timestamp = Some(decode_to_string(source, tok)?);
                }
                "Subject" => {
                    let tok = cursor.parse_string().ok()?;
                    subject = Some(decode_to_string(source, tok)?);
                }
                "UnsubscribeURL" => {
                    let tok = cursor.parse_string().ok()?;
                    unsubscribe_url = Some(decode_to_string(source, tok)?);
                }
                "Message" => {
                    cursor.skip_ws();
                    let is_string = source.get(cursor.pos()).copied() == Some(b'"');
                    if is_string {
                        let tok = cursor.parse_string().ok()?;
                        message_span = Some((tok.content, true));
                    } else {
                        let span = cursor.skip_value().ok()?;
                        message_span = Some((span, false));
                    }
                }
                "MessageAttributes" => {
                    let span = cursor.skip_value().ok()?;
                    message_attributes = parse_message_attributes(span.slice(source));
                }
                _ => {
                    cursor.skip_value().ok()?;
                }
            }
        }

        if !is_notification {
            return None;
        }
        let topic_arn = topic_arn?;
        let message_id = message_id?;
        let (msg_span, was_string) = message_span?;

        let inner = if was_string {
            // Re-derive the StringToken's escape flag by checking for a
            // backslash inside the captured content span — cheap, single
            // pass, and exact (escapes are only ever introduced by `\`).
            let has_escapes = msg_span.slice(source).contains(&b'\\');
            let tok = crate::scan::StringToken {
                content: msg_span,
                has_escapes,
            };
            let handle = unescape_value(source, tok, &mut pool).ok()?;
            InnerPayload::Pooled(handle)
        } else {
            InnerPayload::Slice(msg_span.slice(source))
        };

        let notification = NotificationMetadata {
            topic_arn,
            message_id,
            timestamp,
            subject,
            unsubscribe_url,
            message_attributes,
        };
        let carrier = CarrierMetadata {
            queue: QueueMetadata::from(original),
            notification: Some(notification),
            event_bridge: None,
        };
        Some((inner, carrier))
    }
}

fn parse_message_attributes(bytes: &[u8]) -> Vec<(String, MessageAttribute)> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let Some(obj) = value.as_object() else {
        return Vec::new();
    };
    obj.iter()
        .filter_map(|(k, v)| {
            let attr_type = v.get("Type")?.as_str()?.to_string();
            let value = v.get("Value")?.as_str()?.to_string();
            Some((
                k.clone(),
                MessageAttribute {
                    attr_type,
                    value,
                },
            ))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Event-bus parser
// ---------------------------------------------------------------------------

/// Recognizes an event-bus wrapper.
pub struct EventBridgeParser;

impl WrapperParser for EventBridgeParser {
    fn name(&self) -> &'static str {
        "event_bridge"
    }

    fn quick_match(&self, bytes: &[u8]) -> bool {
        let window = quick_match_window(bytes);
        contains_all(window, &["\"detail-type\"", "\"detail\""])
    }

    fn try_parse<'s>(
        &self,
        scope: &'s mut PooledScope,
        original: &OriginalMessage,
    ) -> Option<(InnerPayload<'s>, CarrierMetadata)> {
        let (source, mut pool) = scope.source_and_pool();
        let mut cursor = Cursor::new(source);
        cursor.enter_object().ok()?;

        let mut event_id: Option<String> = None;
        let mut detail_type: Option<String> = None;
        let mut src: Option<String> = None;
        let mut time: Option<String> = None;
        let mut account: Option<String> = None;
        let mut region: Option<String> = None;
        let mut resources: Vec<String> = Vec::new();
        let mut detail_span: Option<(Span, bool)> = None;

        loop {
            let key = match cursor.next_key().ok()? {
                Some(k) => k,
                None => break,
            };
            let key_str = std::str::from_utf8(key.content.slice(source)).ok()?;
            match key_str {
                "id" => {
                    let tok = cursor.parse_string().ok()?;
                    event_id = Some(decode_to_string(source, tok)?);
                }
                "detail-type" => {
                    let tok = cursor.parse_string().ok()?;
                    detail_type = Some(decode_to_string(source, tok)?);
                }
                "source" => {
                    let tok = cursor.parse_string().ok()?;
                    src = Some(decode_to_string(source, tok)?);
                }
                "time" => {
                    let tok = cursor.parse_string().ok()?;
                    time = Some(decode_to_string(source, tok)?);
                }
                "account" => {
                    let tok = cursor.parse_string().ok()?;
                    account = Some(decode_to_string(source, tok)?);
                }
                "region" => {
                    let tok = cursor.parse_string().ok()?;
                    region = Some(decode_to_string(source, tok)?);
                }
                "resources" => {
                    let span = cursor.skip_value().ok()?;
                    let value: serde_json::Value = serde_json::from_slice(span.slice(source)).ok()?;
                    resources = value
                        .as_array()
                        .map(|arr| {
                            arr.iter()
                                .filter_map(|v| v.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default();
                }
                "detail" => {
                    cursor.skip_ws();
                    let is_string = source.get(cursor.pos()).copied() == Some(b'"');
                    if is_string {
                        let tok = cursor.parse_string().ok()?;
                        detail_span = Some((tok.content, true));
                    } else {
                        let span = cursor.skip_value().ok()?;
                        detail_span = Some((span, false));
                    }
                }
                _ => {
                    cursor.skip_value().ok()?;
                }
            }
        }

        let detail_type = detail_type?;
        let src = src?;
        let time = time?;
        let (d_span, was_string) = detail_span?;

        let inner = if was_string {
            let has_escapes = d_span.slice(source).contains(&b'\\');
            let tok = crate::scan::StringToken {
                content: d_span,
                has_escapes,
            };
            let handle = unescape_value(source, tok, &mut pool).ok()?;
            InnerPayload::Pooled(handle)
        } else {
            InnerPayload::Slice(d_span.slice(source))
        };

        let event_bridge = EventBridgeMetadata {
            event_id,
            detail_type,
            source: src,
            time,
            account,
            region,
            resources,
        };
        let carrier = CarrierMetadata {
            queue: QueueMetadata::from(original),
            notification: None,
            event_bridge: Some(event_bridge),
        };
        Some((inner, carrier))
    }
}

// ---------------------------------------------------------------------------
// Queue-fallback parser
// ---------------------------------------------------------------------------

/// The safety-net parser: no quick-match gate, always succeeds, returns
/// the original bytes unmodified.
pub struct QueueFallbackParser;

impl WrapperParser for QueueFallbackParser {
    fn name(&self) -> &'static str {
        "queue_fallback"
    }

    fn quick_match(&self, _bytes: &[u8]) -> bool {
        true
    }

    fn try_parse<'s>(
        &self,
        scope: &'s mut PooledScope,
        original: &OriginalMessage,
    ) -> Option<(InnerPayload<'s>, CarrierMetadata)> {
        let source = scope.source();
        let carrier = CarrierMetadata {
            queue: QueueMetadata::from(original),
            notification: None,
            event_bridge: None,
        };
        Some((InnerPayload::Slice(source), carrier))
    }
}

// Decoding (including `\u` escapes) happens entirely inside
// `Cursor::decode_string_into`; this helper just collects the bytes into a
// `String`.
fn decode_to_string(source: &[u8], token: crate::scan::StringToken) -> Option<String> {
    let mut buf = Vec::with_capacity(token.content.end - token.content.start);
    Cursor::decode_string_into(source, token, &mut buf).ok()?;
    String::from_utf8(buf).ok()
}

// ---------------------------------------------------------------------------
// Orchestrated chain
// ---------------------------------------------------------------------------

/// Run the fixed-order wrapper-parser chain: quick-matched parsers first,
/// in order; then, if none matched or all quick-matched attempts failed,
/// notification/event-bus are retried in order ignoring quick-match; only
/// then is queue-fallback consulted.
///
/// Queue-fallback is deliberately excluded from the first, quick-matched
/// pass. Its `quick_match` always returns `true` and its `try_parse`
/// always returns `Some`, so including it in that gated pass alongside the
/// other two would let it fire and return before notification/event-bus
/// ever got their safety-net retry, misclassifying any message whose
/// quick-match under-recognised it (a sentinel sitting outside the first
/// 2,048 bytes, say) as a bare message instead of correctly unwrapping it.
/// Queue-fallback is always the last parser tried, after the safety net
/// has had its chance.
pub fn parse_carrier<'s>(
    scope: &'s mut PooledScope,
    original: &OriginalMessage,
) -> (InnerPayload<'s>, CarrierMetadata) {
    let notification = NotificationParser;
    let event_bridge = EventBridgeParser;
    let fallback = QueueFallbackParser;

    let notification_quick_match = notification.quick_match(scope.source());
    let event_bridge_quick_match = event_bridge.quick_match(scope.source());

    if notification_quick_match {
        if let Some(result) = notification.try_parse(&mut *scope, original) {
            return result;
        }
    }
    if event_bridge_quick_match {
        if let Some(result) = event_bridge.try_parse(&mut *scope, original) {
            return result;
        }
    }

    // Safety net: retry notification/event-bus in order, ignoring
    // quick-match, before ever consulting queue-fallback's trivial match.
    if let Some(result) = notification.try_parse(&mut *scope, original) {
        return result;
    }
    if let Some(result) = event_bridge.try_parse(&mut *scope, original) {
        return result;
    }

    // Queue-fallback is the last parser tried and always succeeds.
    if let Some(result) = fallback.try_parse(&mut *scope, original) {
        return result;
    }

    // Unreachable: QueueFallbackParser::try_parse always returns Some.
    let carrier = CarrierMetadata {
        queue: QueueMetadata::from(original),
        notification: None,
        event_bridge: None,
    };
    (InnerPayload::Slice(scope.source()), carrier)
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Carrier metadata: the per-transport fields attached to a received
//! envelope by whichever wrapper parser accepted the body.

/// The raw message handed to [`crate::orchestrator::EnvelopeSerializer::convert_to_envelope`]
/// before any unwrapping happens. Stands in for the cloud-queue SDK's own
/// message type — out of scope here, only its interface is needed.
#[derive(Debug, Clone)]
pub struct OriginalMessage {
    /// The message body, exactly as received from the transport.
    pub body: String,
    /// Opaque handle used to acknowledge/delete the message. `None` for
    /// transports that don't have one (e.g. a local test harness).
    pub receipt_handle: Option<String>,
    /// The queue's own message id.
    pub message_id: Option<String>,
    /// Transport-level attributes (e.g. SQS message attributes), in
    /// whatever order the transport delivered them.
    pub attributes: Vec<(String, String)>,
}

impl OriginalMessage {
    /// Construct an `OriginalMessage` carrying just a body, with no
    /// transport metadata. Convenient for tests and for transports that
    /// genuinely have nothing else to offer.
    #[must_use]
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            receipt_handle: None,
            message_id: None,
            attributes: Vec::new(),
        }
    }
}

/// Queue-level metadata, always populated on any received message
/// regardless of which wrapper, if any, was recognised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueMetadata {
    /// Opaque receipt handle for acknowledging/deleting the message.
    pub receipt_handle: Option<String>,
    /// The queue's own message id.
    pub message_id: Option<String>,
    /// Transport-level attributes, insertion order preserved.
    pub attributes: Vec<(String, String)>,
}

impl From<&OriginalMessage> for QueueMetadata {
    fn from(original: &OriginalMessage) -> Self {
        Self {
            receipt_handle: original.receipt_handle.clone(),
            message_id: original.message_id.clone(),
            attributes: original.attributes.clone(),
        }
    }
}

/// A single entry of a notification wrapper's `MessageAttributes` map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttribute {
    /// The attribute's declared type (e.g. `"String"`, `"Number"`).
    pub attr_type: String,
    /// The attribute's value, always carried as a string.
    pub value: String,
}

/// Notification-wrapper metadata, present only when the
/// notification parser accepted the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMetadata {
    /// `TopicArn` field.
    pub topic_arn: String,
    /// `MessageId` field.
    pub message_id: String,
    /// `Timestamp` field, carried as the raw string (not reparsed here —
    /// only the inner envelope's own `time` field is validated as a
    /// timestamp; this one is opaque wrapper provenance).
    pub timestamp: Option<String>,
    /// `Subject` field.
    pub subject: Option<String>,
    /// `UnsubscribeURL` field.
    pub unsubscribe_url: Option<String>,
    /// `MessageAttributes`, insertion order preserved.
    pub message_attributes: Vec<(String, MessageAttribute)>,
}

/// Event-bus-wrapper metadata, present only when the event-bus
/// parser accepted the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBridgeMetadata {
    /// `id` field.
    pub event_id: Option<String>,
    /// `detail-type` field.
    pub detail_type: String,
    /// `source` field.
    pub source: String,
    /// `time` field, carried as the raw string for the same reason as
    /// [`NotificationMetadata::timestamp`].
    pub time: String,
    /// `account` field.
    pub account: Option<String>,
    /// `region` field.
    pub region: Option<String>,
    /// `resources` field.
    pub resources: Vec<String>,
}

/// The union of all carrier metadata attached to a received envelope.
/// `notification`/`event_bridge` are populated only by their respective
/// wrapper parser; `queue` is always populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarrierMetadata {
    /// Queue-level metadata, always present.
    pub queue: QueueMetadata,
    /// Notification-wrapper metadata, present iff the notification parser
    /// accepted the body.
    pub notification: Option<NotificationMetadata>,
    /// Event-bus-wrapper metadata, present iff the event-bus parser
    /// accepted the body.
    pub event_bridge: Option<EventBridgeMetadata>,
}

//! Vendor webhook event types and the event → delivery-status mapping.

use serde::{Deserialize, Serialize};

/// Delivery status of a sent message, as recorded on the local
/// message record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Opened,
    Clicked,
    Bounced,
    Delayed,
    Rejected,
    RecipientUnsubscribed,
    MarkedAsSpam,
}

impl DeliveryStatus {
    /// Label persisted on the message record.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "Sent",
            DeliveryStatus::Opened => "Opened",
            DeliveryStatus::Clicked => "Clicked",
            DeliveryStatus::Bounced => "Bounced",
            DeliveryStatus::Delayed => "Delayed",
            DeliveryStatus::Rejected => "Rejected",
            DeliveryStatus::RecipientUnsubscribed => "Recipient Unsubscribed",
            DeliveryStatus::MarkedAsSpam => "Marked As Spam",
        }
    }
}

/// Map a vendor event type to a delivery status.
///
/// Unknown event types map to `None` and cause no state change.
pub fn map_status(event_type: &str) -> Option<DeliveryStatus> {
    match event_type {
        "delivered" | "processed" => Some(DeliveryStatus::Sent),
        "open" => Some(DeliveryStatus::Opened),
        "click" => Some(DeliveryStatus::Clicked),
        "bounce" => Some(DeliveryStatus::Bounced),
        "deferred" => Some(DeliveryStatus::Delayed),
        "dropped" => Some(DeliveryStatus::Rejected),
        "group_unsubscribe" | "unsubscribe" => Some(DeliveryStatus::RecipientUnsubscribed),
        "spamreport" => Some(DeliveryStatus::MarkedAsSpam),
        _ => None,
    }
}

/// Event types that additionally mark the recipient as globally
/// unsubscribed.
///
/// The trigger list matches `spam_report` while the vendor's wire
/// event is `spamreport` (no underscore), so spam reports update the
/// delivery status but never fire the local unsubscribe. Inherited
/// from the source system; kept as documented behavior.
pub const UNSUBSCRIBE_TRIGGERS: [&str; 3] = ["spam_report", "bounce", "unsubscribe"];

/// Whether an event type triggers a local global unsubscribe.
pub fn is_unsubscribe_trigger(event_type: &str) -> bool {
    UNSUBSCRIBE_TRIGGERS.contains(&event_type)
}

/// One event object from the vendor's webhook batch.
///
/// The vendor posts a JSON array of these; category-specific extras
/// (url, asm_group_id, smtp-id, ...) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Vendor event type, e.g. "delivered" or "bounce"
    #[serde(default)]
    pub event: String,
    /// Recipient email address
    #[serde(default)]
    pub email: String,
    /// Vendor-internal message id
    #[serde(default)]
    pub sg_message_id: Option<String>,
    /// Locally issued message id echoed back via unique args
    #[serde(default)]
    pub message_id: Option<String>,
    /// Unix epoch seconds when the event occurred
    #[serde(default)]
    pub timestamp: Option<i64>,
}

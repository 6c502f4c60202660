//! Applying vendor webhook events to local message records.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::events::{is_unsubscribe_trigger, map_status, WebhookEvent};
use crate::store::Store;

/// Extract the local record id from a vendor message id.
///
/// Outbound messages embed `<local-id>@<site>` in their id; events
/// whose message ids lack this deployment's routing token were sent
/// by someone else and are ignored.
pub fn local_message_id<'a>(message_id: &'a str, site: &str) -> Option<&'a str> {
    // Any mix of spaces and angle brackets comes off both ends
    let trimmed = message_id.trim_matches(|c| c == ' ' || c == '<' || c == '>');
    let token = format!("@{}", site);

    if !trimmed.contains(token.as_str()) {
        return None;
    }

    trimmed.split('@').next()
}

/// Apply one webhook event: resolve the message record, verify the
/// recipient, persist the mapped delivery status, and create the
/// global unsubscribe entry for trigger events.
///
/// Returns whether a status was written. Unresolvable ids, unknown
/// records, foreign recipients, and unknown event types are silent
/// no-ops.
pub async fn apply_event(
    store: &Store,
    site: &str,
    event_type: &str,
    email: &str,
    message_id: Option<&str>,
) -> Result<bool> {
    let local_id = match message_id.and_then(|id| local_message_id(id, site)) {
        Some(id) => id,
        None => {
            debug!(message_id = ?message_id, "event_message_id_unresolvable");
            return Ok(false);
        }
    };

    let record = match store.get_message(local_id).await? {
        Some(record) => record,
        None => {
            debug!(local_id = %local_id, "event_message_record_missing");
            return Ok(false);
        }
    };

    // Anti-spoofing guard: a status update applies only if the event's
    // email is among the message's original recipients.
    if !record.recipients.iter().any(|recipient| recipient == email) {
        warn!(
            local_id = %local_id,
            email = %email,
            "event_recipient_not_in_message"
        );
        return Ok(false);
    }

    let status = match map_status(event_type) {
        Some(status) => status,
        None => {
            debug!(event = %event_type, "event_type_unknown");
            return Ok(false);
        }
    };

    store.set_delivery_status(&record.id, status.as_str()).await?;
    info!(
        local_id = %record.id,
        event = %event_type,
        status = status.as_str(),
        "delivery_status_updated"
    );

    if is_unsubscribe_trigger(event_type) {
        store.add_global_unsubscribe(email).await?;
        info!(email = %email, event = %event_type, "recipient_globally_unsubscribed");
    }

    Ok(true)
}

/// Apply a batch of events; per-event failures never abort the rest.
///
/// Returns the number of events that resulted in a status write.
pub async fn apply_batch(store: &Store, site: &str, events: &[WebhookEvent]) -> usize {
    let mut applied = 0;

    for event in events {
        match apply_event(
            store,
            site,
            &event.event,
            &event.email,
            event.message_id.as_deref(),
        )
        .await
        {
            Ok(true) => applied += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(
                    event = %event.event,
                    email = %event.email,
                    error = %e,
                    "event_apply_failed"
                );
            }
        }
    }

    applied
}

//! Turns guestbook events into addressed, rendered notifications.
//!
//! Handlers attach everything needed for rendering to the event payload, so
//! the only lookup left for the router is the recipient's email address.
//!
//! | Event                        | Recipient        | Payload keys |
//! |------------------------------|------------------|--------------|
//! | `guestbook.entry_submitted`  | `owner_id`       | `entry_id`, `memorial_name`, `author_name`, `status` |
//! | `guestbook.entry_approved`   | `author_id`      | `entry_id`, `memorial_name` |
//! | `guestbook.entry_rejected`   | `author_id`      | `entry_id`, `memorial_name`, `reason` |

use gather_core::platform_events::{
    GUESTBOOK_ENTRY_APPROVED, GUESTBOOK_ENTRY_REJECTED, GUESTBOOK_ENTRY_SUBMITTED,
};
use gather_core::types::DbId;

use crate::bus::PlatformEvent;

const SUBJECT_PREFIX: &str = "[GatherMemorials]";

/// A rendered notification for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient_user_id: DbId,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Render the notification for `event`, or `None` when the event type
    /// does not notify anyone or its payload lacks a recipient.
    pub fn for_event(event: &PlatformEvent) -> Option<Self> {
        let memorial = event.payload_str("memorial_name").unwrap_or("your memorial");
        match event.event_type.as_str() {
            GUESTBOOK_ENTRY_SUBMITTED => {
                let author = event.payload_str("author_name").unwrap_or("Someone");
                let awaiting = event.payload_str("status") == Some("pending");
                let body = if awaiting {
                    format!(
                        "{author} signed the guestbook for {memorial}.\n\
                         The entry is waiting for your review in the moderation queue."
                    )
                } else {
                    format!("{author} signed the guestbook for {memorial}.")
                };
                Some(Self {
                    recipient_user_id: event.payload_id("owner_id")?,
                    subject: format!("{SUBJECT_PREFIX} New guestbook entry for {memorial}"),
                    body,
                })
            }
            GUESTBOOK_ENTRY_APPROVED => Some(Self {
                recipient_user_id: event.payload_id("author_id")?,
                subject: format!("{SUBJECT_PREFIX} Your guestbook entry was published"),
                body: format!("Your message in the guestbook for {memorial} is now visible."),
            }),
            GUESTBOOK_ENTRY_REJECTED => {
                let mut body =
                    format!("Your message in the guestbook for {memorial} was not published.");
                if let Some(reason) = event.payload_str("reason") {
                    body.push_str(&format!("\nReason: {reason}"));
                }
                Some(Self {
                    recipient_user_id: event.payload_id("author_id")?,
                    subject: format!("{SUBJECT_PREFIX} Your guestbook entry was not published"),
                    body,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submitted_entry_notifies_owner() {
        let event = PlatformEvent::new(GUESTBOOK_ENTRY_SUBMITTED).with_payload(json!({
            "owner_id": 4,
            "entry_id": 10,
            "memorial_name": "Ada Lovelace",
            "author_name": "Charles",
            "status": "pending",
        }));
        let n = Notification::for_event(&event).unwrap();
        assert_eq!(n.recipient_user_id, 4);
        assert!(n.subject.contains("Ada Lovelace"));
        assert!(n.body.contains("Charles"));
        assert!(n.body.contains("moderation queue"));
    }

    #[test]
    fn rejection_includes_reason() {
        let event = PlatformEvent::new(GUESTBOOK_ENTRY_REJECTED).with_payload(json!({
            "author_id": 8,
            "memorial_name": "Ada Lovelace",
            "reason": "Off topic",
        }));
        let n = Notification::for_event(&event).unwrap();
        assert_eq!(n.recipient_user_id, 8);
        assert!(n.body.ends_with("Reason: Off topic"));
    }

    #[test]
    fn approval_without_recipient_is_skipped() {
        let event = PlatformEvent::new(GUESTBOOK_ENTRY_APPROVED);
        assert_eq!(Notification::for_event(&event), None);
    }

    #[test]
    fn unrelated_events_notify_nobody() {
        let event = PlatformEvent::new("memorial.published").with_payload(json!({"owner_id": 1}));
        assert_eq!(Notification::for_event(&event), None);
    }
}

//! Well-known platform event names.
//!
//! These are the `event_type` values published on the event bus, stored in
//! `event_log.event_type`, and matched by the notification router.

/// Source entity kinds attached to events.
pub const ENTITY_MEMORIAL: &str = "memorial";
pub const ENTITY_GUESTBOOK_ENTRY: &str = "guestbook_entry";
pub const ENTITY_PAYMENT: &str = "payment";
pub const ENTITY_USER: &str = "user";

/// A visitor submitted a guestbook entry. Notifies the memorial owner.
pub const GUESTBOOK_ENTRY_SUBMITTED: &str = "guestbook.entry_submitted";

/// A pending entry was approved. Notifies the author.
pub const GUESTBOOK_ENTRY_APPROVED: &str = "guestbook.entry_approved";

/// A pending entry was rejected. Notifies the author.
pub const GUESTBOOK_ENTRY_REJECTED: &str = "guestbook.entry_rejected";

/// An owner blocked a user from their memorials.
pub const USER_BLOCKED: &str = "guestbook.user_blocked";

pub const MEMORIAL_CREATED: &str = "memorial.created";
pub const MEMORIAL_PUBLISHED: &str = "memorial.published";
pub const MEMORIAL_ARCHIVED: &str = "memorial.archived";
pub const MEMORIAL_UNARCHIVED: &str = "memorial.unarchived";
pub const MEMORIAL_DELETED: &str = "memorial.deleted";

/// A checkout session was paid.
pub const PAYMENT_COMPLETED: &str = "payment.completed";

//! Guestbook entry state machine, moderation actions and submission rules.
//!
//! Entries only ever move forward: `pending → approved` or
//! `pending → rejected`. Once moderated an entry never returns to pending
//! and never flips between approved and rejected.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::platform_events;
use crate::status::GuestbookEntryStatus;
use crate::types::DbId;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Fewest words a message may contain.
pub const MIN_MESSAGE_WORDS: usize = 3;

/// Most words a message may contain.
pub const MAX_MESSAGE_WORDS: usize = 500;

/// Maximum length of the author's display name.
pub const MAX_AUTHOR_NAME_LENGTH: usize = 100;

/// Maximum length of the relationship field ("Friend", "Granddaughter", ...).
pub const MAX_RELATIONSHIP_LENGTH: usize = 100;

/// Maximum length of a moderation reason.
pub const MAX_MODERATION_REASON_LENGTH: usize = 1_000;

/// Largest batch accepted by bulk moderation.
pub const MAX_BULK_MODERATION: usize = 100;

/// Reason recorded on entries rejected because their author was blocked.
pub const BLOCKED_AUTHOR_REASON: &str = "Author blocked";

/* --------------------------------------------------------------------------
State machine
-------------------------------------------------------------------------- */

impl GuestbookEntryStatus {
    /// Whether moderation may move an entry from `self` to `next`.
    pub fn can_transition_to(self, next: GuestbookEntryStatus) -> bool {
        use GuestbookEntryStatus::*;
        match (self, next) {
            (Pending, Approved) | (Pending, Rejected) => true,
            (Pending, Pending) | (Approved, _) | (Rejected, _) => false,
        }
    }

    /// Whether the entry is still awaiting a decision.
    pub fn is_pending(self) -> bool {
        self == GuestbookEntryStatus::Pending
    }
}

/// Initial status for a freshly submitted entry.
///
/// Moderated guestbooks hold entries for review; unmoderated guestbooks
/// publish them immediately.
pub fn initial_status(guestbook_moderated: bool) -> GuestbookEntryStatus {
    if guestbook_moderated {
        GuestbookEntryStatus::Pending
    } else {
        GuestbookEntryStatus::Approved
    }
}

/// A moderation decision requested by an owner or moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    /// Status the entry ends up in.
    pub fn target_status(self) -> GuestbookEntryStatus {
        match self {
            ModerationAction::Approve => GuestbookEntryStatus::Approved,
            ModerationAction::Reject => GuestbookEntryStatus::Rejected,
        }
    }

    /// Event name published after the decision.
    pub fn event_type(self) -> &'static str {
        match self {
            ModerationAction::Approve => platform_events::GUESTBOOK_ENTRY_APPROVED,
            ModerationAction::Reject => platform_events::GUESTBOOK_ENTRY_REJECTED,
        }
    }
}

/// Check that `action` may be applied to an entry in `current` status.
pub fn ensure_can_moderate(
    entry_id: DbId,
    current: GuestbookEntryStatus,
    action: ModerationAction,
) -> Result<(), CoreError> {
    if current.can_transition_to(action.target_status()) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Guestbook entry {entry_id} is already {current} and cannot be moderated again"
        )))
    }
}

/* --------------------------------------------------------------------------
Validation
-------------------------------------------------------------------------- */

/// Count whitespace-separated words.
pub fn word_count(message: &str) -> usize {
    message.split_whitespace().count()
}

/// Validate the message length in words.
pub fn validate_message(message: &str) -> Result<(), CoreError> {
    let words = word_count(message);
    if words < MIN_MESSAGE_WORDS {
        return Err(CoreError::Validation(format!(
            "Message must contain at least {MIN_MESSAGE_WORDS} words"
        )));
    }
    if words > MAX_MESSAGE_WORDS {
        return Err(CoreError::Validation(format!(
            "Message must not exceed {MAX_MESSAGE_WORDS} words"
        )));
    }
    Ok(())
}

/// Validate the author-supplied fields of a submission.
pub fn validate_submission(
    author_name: &str,
    relationship: Option<&str>,
    message: &str,
    photo_url: Option<&str>,
) -> Result<(), CoreError> {
    let name = author_name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation(
            "author_name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_AUTHOR_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "author_name exceeds maximum length of {MAX_AUTHOR_NAME_LENGTH} characters"
        )));
    }
    if let Some(rel) = relationship {
        if rel.chars().count() > MAX_RELATIONSHIP_LENGTH {
            return Err(CoreError::Validation(format!(
                "relationship exceeds maximum length of {MAX_RELATIONSHIP_LENGTH} characters"
            )));
        }
    }
    if let Some(url) = photo_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(CoreError::Validation(
                "photo_url must be an http(s) URL".to_string(),
            ));
        }
    }
    validate_message(message)
}

/// Validate an optional moderation reason.
pub fn validate_moderation_reason(reason: Option<&str>) -> Result<(), CoreError> {
    match reason {
        Some(r) if r.chars().count() > MAX_MODERATION_REASON_LENGTH => {
            Err(CoreError::Validation(format!(
                "reason exceeds maximum length of {MAX_MODERATION_REASON_LENGTH} characters"
            )))
        }
        _ => Ok(()),
    }
}

/// Validate a bulk moderation id list: non-empty, bounded, no duplicates.
pub fn validate_bulk_ids(ids: &[DbId]) -> Result<Vec<DbId>, CoreError> {
    if ids.is_empty() {
        return Err(CoreError::Validation(
            "entry_ids must not be empty".to_string(),
        ));
    }
    if ids.len() > MAX_BULK_MODERATION {
        return Err(CoreError::Validation(format!(
            "At most {MAX_BULK_MODERATION} entries can be moderated at once"
        )));
    }
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() != ids.len() {
        return Err(CoreError::Validation(
            "entry_ids must not contain duplicates".to_string(),
        ));
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn pending_moves_to_either_decision() {
        assert!(GuestbookEntryStatus::Pending.can_transition_to(GuestbookEntryStatus::Approved));
        assert!(GuestbookEntryStatus::Pending.can_transition_to(GuestbookEntryStatus::Rejected));
    }

    #[test]
    fn moderated_entries_never_return_to_pending() {
        for from in [GuestbookEntryStatus::Approved, GuestbookEntryStatus::Rejected] {
            for to in GuestbookEntryStatus::ALL {
                assert!(!from.can_transition_to(*to), "{from} -> {to} must be illegal");
            }
        }
    }

    #[test]
    fn initial_status_follows_moderation_setting() {
        assert_eq!(initial_status(true), GuestbookEntryStatus::Pending);
        assert_eq!(initial_status(false), GuestbookEntryStatus::Approved);
    }

    #[test]
    fn remoderation_is_a_conflict() {
        let err = ensure_can_moderate(7, GuestbookEntryStatus::Approved, ModerationAction::Reject)
            .unwrap_err();
        assert_matches!(err, CoreError::Conflict(msg) if msg.contains("7"));
        assert!(
            ensure_can_moderate(7, GuestbookEntryStatus::Pending, ModerationAction::Reject).is_ok()
        );
    }

    #[test]
    fn action_maps_to_status_and_event() {
        assert_eq!(
            ModerationAction::Approve.target_status(),
            GuestbookEntryStatus::Approved
        );
        assert_eq!(ModerationAction::Reject.event_type(), "guestbook.entry_rejected");
    }

    #[test]
    fn message_word_bounds() {
        assert!(validate_message("too short").is_err());
        assert!(validate_message("just enough words").is_ok());
        let long = "word ".repeat(MAX_MESSAGE_WORDS);
        assert!(validate_message(&long).is_ok());
        let too_long = "word ".repeat(MAX_MESSAGE_WORDS + 1);
        assert!(validate_message(&too_long).is_err());
    }

    #[test]
    fn word_count_ignores_extra_whitespace() {
        assert_eq!(word_count("  she \n was   kind  "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn submission_requires_author_name_and_http_photo() {
        let msg = "we will miss you";
        assert!(validate_submission("Ann", None, msg, None).is_ok());
        assert!(validate_submission("  ", None, msg, None).is_err());
        assert!(validate_submission("Ann", None, msg, Some("ftp://x/y.png")).is_err());
        assert!(validate_submission("Ann", Some("Friend"), msg, Some("https://x/y.png")).is_ok());
    }

    #[test]
    fn bulk_ids_validation() {
        assert!(validate_bulk_ids(&[]).is_err());
        assert!(validate_bulk_ids(&[1, 2, 2]).is_err());
        let many: Vec<DbId> = (1..=(MAX_BULK_MODERATION as DbId + 1)).collect();
        assert!(validate_bulk_ids(&many).is_err());
        assert_eq!(validate_bulk_ids(&[3, 1]).unwrap(), vec![1, 3]);
    }

    #[test]
    fn moderation_reason_length() {
        assert!(validate_moderation_reason(None).is_ok());
        assert!(validate_moderation_reason(Some("off topic")).is_ok());
        assert!(validate_moderation_reason(Some(&"x".repeat(1_001))).is_err());
    }
}

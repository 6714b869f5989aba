//! Memorial lifecycle transitions, read gating and field validation.
//!
//! The lifecycle is a closed state machine over [`MemorialStatus`]:
//!
//! ```text
//! draft ──publish──▶ published ──archive──▶ archived
//!   │                    ▲  │                  │
//!   │                    └──┼───unarchive──────┘
//!   ▼                       ▼                  ▼
//! (hard delete)          deleted ◀─────────────┘
//! ```
//!
//! A draft is removed outright when deleted; published and archived
//! memorials are soft-deleted so the owner can still see what happened.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::CoreError;
use crate::status::{MemorialStatus, PrivacyLevel};

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Number of steps in the creation wizard.
pub const WIZARD_STEP_COUNT: i32 = 6;

/// Maximum length for any name field.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length for a place field.
pub const MAX_PLACE_LENGTH: usize = 200;

/// Maximum length for the biography and obituary.
pub const MAX_LONG_TEXT_LENGTH: usize = 50_000;

/// Minimum length for a memorial access password.
pub const MIN_MEMORIAL_PASSWORD_LENGTH: usize = 6;

/// Custom URLs that would shadow application routes.
pub const RESERVED_CUSTOM_URLS: &[&str] = &[
    "admin", "api", "auth", "create", "dashboard", "edit", "login", "logout", "memorial",
    "memorials", "new", "register", "settings", "signup",
];

static CUSTOM_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]{1,58})[a-z0-9]$").expect("valid regex"));

/* --------------------------------------------------------------------------
State machine
-------------------------------------------------------------------------- */

/// What a `DELETE` does to a memorial in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Remove the row (and its children) permanently.
    Hard,
    /// Mark the row `deleted` and stamp `deleted_at`.
    Soft,
}

impl MemorialStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: MemorialStatus) -> bool {
        use MemorialStatus::*;
        match (self, next) {
            (Draft, Published) => true,
            (Draft, Deleted) => true,
            (Published, Archived) => true,
            (Published, Deleted) => true,
            (Archived, Published) => true,
            (Archived, Deleted) => true,
            (Draft, Draft | Archived)
            | (Published, Draft | Published)
            | (Archived, Draft | Archived)
            | (Deleted, _) => false,
        }
    }

    /// How a delete request is carried out, or `None` if already deleted.
    pub fn delete_mode(self) -> Option<DeleteMode> {
        match self {
            MemorialStatus::Draft => Some(DeleteMode::Hard),
            MemorialStatus::Published | MemorialStatus::Archived => Some(DeleteMode::Soft),
            MemorialStatus::Deleted => None,
        }
    }

    /// Whether visitors (non-owners) may see the memorial at all.
    pub fn is_visible_to_visitors(self) -> bool {
        matches!(self, MemorialStatus::Published | MemorialStatus::Archived)
    }
}

/// Check a transition, producing a 409-style error when it is illegal.
pub fn ensure_transition(from: MemorialStatus, to: MemorialStatus) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Memorial cannot move from '{from}' to '{to}'"
        )))
    }
}

/* --------------------------------------------------------------------------
Read gating
-------------------------------------------------------------------------- */

/// The relationship of a reader to a memorial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    /// The owner (or an admin acting on their behalf).
    Owner,
    /// A delegated guestbook moderator. Privacy does not apply, but drafts
    /// and deleted memorials stay hidden.
    Moderator,
    /// Anyone else, with a flag for whether they presented a valid
    /// password-unlock token for this memorial.
    Visitor { unlocked: bool },
}

/// Outcome of a privacy check for a visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAccess {
    Allowed,
    /// Hidden entirely (draft or deleted): report as not found.
    Hidden,
    /// Visible status but private.
    Private,
    /// Password-protected and not unlocked.
    PasswordRequired,
}

/// Decide whether `viewer` may read a memorial with the given status/privacy.
pub fn read_access(status: MemorialStatus, privacy: PrivacyLevel, viewer: Viewer) -> ReadAccess {
    match viewer {
        Viewer::Owner => ReadAccess::Allowed,
        Viewer::Moderator if status.is_visible_to_visitors() => ReadAccess::Allowed,
        Viewer::Moderator => ReadAccess::Hidden,
        Viewer::Visitor { unlocked } => {
            if !status.is_visible_to_visitors() {
                return ReadAccess::Hidden;
            }
            match privacy {
                PrivacyLevel::Public => ReadAccess::Allowed,
                PrivacyLevel::Private => ReadAccess::Private,
                PrivacyLevel::Password if unlocked => ReadAccess::Allowed,
                PrivacyLevel::Password => ReadAccess::PasswordRequired,
            }
        }
    }
}

/* --------------------------------------------------------------------------
Validation
-------------------------------------------------------------------------- */

/// Validate a required name field (first/last name).
pub fn validate_required_name(field: &str, value: &str) -> Result<(), CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    validate_optional_text(field, Some(value), MAX_NAME_LENGTH)
}

/// Validate an optional free-text field against a maximum length.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Result<(), CoreError> {
    if let Some(v) = value {
        if v.chars().count() > max_len {
            return Err(CoreError::Validation(format!(
                "{field} exceeds maximum length of {max_len} characters"
            )));
        }
    }
    Ok(())
}

/// Validate the birth/death date pair against `today`.
///
/// Neither date may be in the future, and death may not precede birth.
pub fn validate_life_dates(
    birth: Option<NaiveDate>,
    death: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), CoreError> {
    if let Some(b) = birth {
        if b > today {
            return Err(CoreError::Validation(
                "birth_date must not be in the future".to_string(),
            ));
        }
    }
    if let Some(d) = death {
        if d > today {
            return Err(CoreError::Validation(
                "death_date must not be in the future".to_string(),
            ));
        }
    }
    if let (Some(b), Some(d)) = (birth, death) {
        if d < b {
            return Err(CoreError::Validation(
                "death_date must not be before birth_date".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validate a custom URL slug: lowercase letters, digits and inner hyphens,
/// 3 to 60 characters, no double hyphens, not reserved.
pub fn validate_custom_url(slug: &str) -> Result<(), CoreError> {
    if !CUSTOM_URL_RE.is_match(slug) {
        return Err(CoreError::Validation(format!(
            "Invalid custom URL '{slug}'. Use 3-60 lowercase letters, digits or hyphens, \
             starting and ending with a letter or digit"
        )));
    }
    if slug.contains("--") {
        return Err(CoreError::Validation(format!(
            "Invalid custom URL '{slug}'. Consecutive hyphens are not allowed"
        )));
    }
    if RESERVED_CUSTOM_URLS.contains(&slug) {
        return Err(CoreError::Validation(format!(
            "Custom URL '{slug}' is reserved"
        )));
    }
    Ok(())
}

/// Validate a wizard step number.
pub fn validate_wizard_step(step: i32) -> Result<(), CoreError> {
    if (1..=WIZARD_STEP_COUNT).contains(&step) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Wizard step {step} is out of range 1..={WIZARD_STEP_COUNT}"
        )))
    }
}

/// Validate and normalize the completed-steps list: every step in range,
/// sorted, deduplicated.
pub fn normalize_completed_steps(steps: &[i32]) -> Result<Vec<i32>, CoreError> {
    for step in steps {
        validate_wizard_step(*step)?;
    }
    let mut out = steps.to_vec();
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

/// Check that a privacy change is coherent with the password state.
///
/// Switching to [`PrivacyLevel::Password`] requires either a new password in
/// the same request or an already-stored hash.
pub fn validate_privacy_password(
    privacy: PrivacyLevel,
    new_password: Option<&str>,
    has_stored_password: bool,
) -> Result<(), CoreError> {
    if let Some(pw) = new_password {
        if pw.chars().count() < MIN_MEMORIAL_PASSWORD_LENGTH {
            return Err(CoreError::Validation(format!(
                "Memorial password must be at least {MIN_MEMORIAL_PASSWORD_LENGTH} characters long"
            )));
        }
    }
    if privacy == PrivacyLevel::Password && new_password.is_none() && !has_stored_password {
        return Err(CoreError::Validation(
            "A password is required for password-protected memorials".to_string(),
        ));
    }
    Ok(())
}

/// Display name for notifications and listings.
pub fn display_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

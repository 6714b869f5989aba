//! Heuristic spam detection for guestbook messages.
//!
//! Four independent signals are evaluated; a message is treated as spam when
//! at least [`SPAM_SIGNAL_THRESHOLD`] of them fire. A single signal (a link
//! to an online tribute, a shouted "WE LOVE YOU") is normal in condolence
//! messages and must not be enough on its own.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Number of signals that must fire for a message to be rejected.
pub const SPAM_SIGNAL_THRESHOLD: usize = 2;

/// A run of this many identical characters counts as a signal.
pub const LONG_RUN_LENGTH: usize = 10;

/// Capitalisation is only judged once a message has this many letters.
pub const MIN_LETTERS_FOR_CAPS_CHECK: usize = 20;

/// Upper-case share (percent of letters) above which caps count as a signal.
pub const MAX_UPPERCASE_PERCENT: usize = 60;

static SPAM_KEYWORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(viagra|cialis|casino|lottery|jackpot|bitcoin|crypto|forex|payday|loans?|porn|xxx|click here|buy now|free money|work from home|weight loss|earn \$|limited offer|act now)\b",
    )
    .expect("valid regex")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://\S+|www\.\S+|\b[a-z0-9-]+\.(com|net|org|info|biz|ru|xyz|top|io)\b)")
        .expect("valid regex")
});

/// Which heuristics fired for a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpamSignals {
    pub spam_keywords: bool,
    pub urls: bool,
    pub long_character_run: bool,
    pub excessive_caps: bool,
}

impl SpamSignals {
    /// Number of signals that fired.
    pub fn count(&self) -> usize {
        [
            self.spam_keywords,
            self.urls,
            self.long_character_run,
            self.excessive_caps,
        ]
        .iter()
        .filter(|s| **s)
        .count()
    }

    /// Whether the message should be rejected as spam.
    pub fn is_spam(&self) -> bool {
        self.count() >= SPAM_SIGNAL_THRESHOLD
    }
}

/// Evaluate every heuristic against `message`.
pub fn analyze(message: &str) -> SpamSignals {
    SpamSignals {
        spam_keywords: SPAM_KEYWORDS_RE.is_match(message),
        urls: URL_RE.is_match(message),
        long_character_run: longest_run(message) >= LONG_RUN_LENGTH,
        excessive_caps: has_excessive_caps(message),
    }
}

/// Shorthand for `analyze(message).is_spam()`.
pub fn is_spam(message: &str) -> bool {
    analyze(message).is_spam()
}

/// Length of the longest run of one repeated non-whitespace character.
fn longest_run(message: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut prev: Option<char> = None;
    for c in message.chars() {
        if c.is_whitespace() {
            current = 0;
            prev = None;
            continue;
        }
        if prev == Some(c) {
            current += 1;
        } else {
            current = 1;
            prev = Some(c);
        }
        longest = longest.max(current);
    }
    longest
}

fn has_excessive_caps(message: &str) -> bool {
    let letters: Vec<char> = message.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < MIN_LETTERS_FOR_CAPS_CHECK {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    upper * 100 > letters.len() * MAX_UPPERCASE_PERCENT
}

//! Normalizer: strips contact noise and symbols from extracted text before
//! it reaches the embedder or the skill matcher.
//!
//! Pass order matters:
//! 1. collapse whitespace
//! 2. remove emails and URLs (these need `@` and `:` which step 3 drops)
//! 3. replace every symbol outside `[a-z0-9 + # . / -]` with a space
//! 4. remove phone numbers, so `(555) 123-4567` is caught once the
//!    parentheses are gone
//! 5. collapse, trim, lower-case
//!
//! Stripping symbols can expose a URL that was glued to a word (`cv_www.x.dev`)
//! and removing one phone number can join its neighbours into another, so the
//! sequence is repeated until the text stops changing. Every repeat after the
//! first only removes matches, so the loop ends. The result is a fixed point,
//! which makes `normalize` idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[\w.-]+@[\w.-]+\.\w{2,4}\b").expect("valid regex"));

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid regex"));

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+?\b(?:\d{1,3}[\s-]?)?(?:\d{10}|\d{3}[\s-]\d{3}[\s-]\d{4})\b")
        .expect("valid regex")
});

/// Keeps `+`, `#` and `.` so tokens like `c++`, `c#` and `3.11` survive.
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9+#.\s/\-]").expect("valid regex"));

/// Normalizes raw extracted text. Never fails; empty input yields `""`.
pub fn normalize(raw_text: &str) -> String {
    if raw_text.trim().is_empty() {
        return String::new();
    }

    let mut current = clean_pass(raw_text);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(raw_text: &str) -> String {
    let text = WHITESPACE.replace_all(raw_text, " ");
    let text = EMAIL.replace_all(&text, " ");
    let text = URL.replace_all(&text, " ");
    let text = DISALLOWED.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = PHONE.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");

    text.trim().to_lowercase()
}

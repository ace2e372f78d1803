//! Helpers for what a chat front-end sends and shows.
//!
//! Message bodies are small fragments of inline markup (bold, italics,
//! emoji, the odd `<img>`). These functions decide whether a composed
//! fragment is worth sending and reduce received fragments for display.
//! None of this is a security boundary.

use std::sync::LazyLock;

use chrono::{DateTime, Local, TimeZone};
use regex::Regex;

/// Name sent when the display name is blank.
pub const ANONYMOUS_NAME: &str = "Anonimo";

// Patterns are string literals, so `expect` only fires if one is edited into
// an invalid regex; `all_patterns_compile` catches that.
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|h[1-6])\s*>").expect("valid line break pattern")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b").expect("valid image pattern"));
static SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<script\b[^>]*>.*?</script>").expect("valid script pattern")
});
static EVENT_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"on\w+="[^"]*""#).expect("valid event attribute pattern"));

/// Text a reader would see once markup is rendered.
///
/// Line-breaking tags become newlines, every other tag is dropped, and the
/// common character entities are decoded.
pub fn visible_text(markup: &str) -> String {
    let text = LINE_BREAK.replace_all(markup, "\n");
    let text = TAG.replace_all(&text, "");
    decode_entities(&text)
}

/// Whether a composed fragment should be sent at all.
///
/// Sendable when it has visible text beyond whitespace, or when it embeds
/// an image even with no text around it.
pub fn is_sendable(markup: &str) -> bool {
    !visible_text(markup).trim().is_empty() || IMAGE.is_match(markup)
}

/// Strip `<script>` blocks and inline `on*="..."` handlers.
///
/// Superficial by nature: it catches the obvious cases only.
pub fn sanitize_markup(markup: &str) -> String {
    let cleaned = SCRIPT.replace_all(markup, "");
    EVENT_ATTR.replace_all(&cleaned, "").into_owned()
}

/// Name actually sent for a display name: trimmed, or [`ANONYMOUS_NAME`]
/// when nothing is left.
pub fn display_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        ANONYMOUS_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `HH:MM` label for a point in time.
pub fn clock_label<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M").to_string()
}

/// `HH:MM` label for now, in local time.
///
/// Each client stamps messages itself on receipt, so two clients can show
/// different times for the same message.
pub fn local_timestamp() -> String {
    clock_label(&Local::now())
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

//! Fixed text patterns shared by the detector and the reply-merge step.
//! Everything here is pure string work: no clock, no store, no network.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::intent::{Day, TimeOfDay};
use crate::store::QueryScope;

fn question_opener() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(what|when|how|why|where|whose|which|who|show|tell|list|get|is|are|can|could|would)\b")
            .expect("question opener pattern")
    })
}

fn time_range() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches 10-11, 10:00-11:30, 8am-9pm, 08.00 - 09.00, 6 to 7
        Regex::new(r"(?i)(\d{1,2}(?:[:.]\d{2})?\s*(?:[ap]m)?)\s*(?:-|\x{2013}|\bto\b)\s*(\d{1,2}(?:[:.]\d{2})?\s*(?:[ap]m)?)")
            .expect("time range pattern")
    })
}

fn modify_verb() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(remove|delete|cancel|finish|complete|mark|rename)\s+(?:the\s+|my\s+|a\s+)?(.+)$")
            .expect("modify verb pattern")
    })
}

fn title_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:please\s+)?(?:add|create|new|task:?|remind me to|remember to)\s+")
            .expect("title prefix pattern")
    })
}

pub fn is_question(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.ends_with('?') || question_opener().is_match(trimmed)
}

/// Maps query text to the store scope it asks about.
pub fn query_scope(text: &str) -> QueryScope {
    let lower = text.to_lowercase();
    if lower.contains("tomorrow") {
        QueryScope::Tomorrow
    } else if lower.contains("week") {
        QueryScope::Week
    } else if lower.contains("today") {
        QueryScope::Today
    } else {
        QueryScope::All
    }
}

/// Collects every day-of-week mention. "daily" expands to the full week.
pub fn extract_days(text: &str) -> BTreeSet<Day> {
    let mut days = BTreeSet::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if token.eq_ignore_ascii_case("daily") || token.eq_ignore_ascii_case("everyday") {
            days.extend([Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri, Day::Sat, Day::Sun]);
        } else if let Some(day) = Day::parse(token) {
            days.insert(day);
        }
    }
    days
}

pub fn extract_time_range(text: &str) -> Option<(TimeOfDay, TimeOfDay)> {
    let caps = time_range().captures(text)?;
    let start = TimeOfDay::parse(caps.get(1)?.as_str())?;
    let end = TimeOfDay::parse(caps.get(2)?.as_str())?;
    Some((start, end))
}

/// Strips command prefixes ("add", "remind me to", ...) off a task title.
pub fn extract_title(text: &str) -> String {
    let stripped = title_prefix().replace(text.trim(), "");
    stripped.trim().trim_end_matches(['.', '!']).to_string()
}

/// The verb and leftover target text of a modification command, if the
/// utterance starts with one.
pub fn modify_command(text: &str) -> Option<(String, String)> {
    let caps = modify_verb().captures(text.trim())?;
    let verb = caps.get(1)?.as_str().to_lowercase();
    let mut target = caps.get(2)?.as_str().trim().to_string();
    // "mark X as done" / "mark X done"
    for suffix in [" as done", " as complete", " as completed", " done"] {
        if let Some(rest) = strip_suffix_ignore_case(&target, suffix) {
            target = rest.trim().to_string();
            break;
        }
    }
    Some((verb, target))
}

/// Case-insensitive ASCII suffix strip that never indexes `text` with a
/// length computed from a lowercased copy (lowercasing can change byte
/// length, e.g. U+212A to 'k').
fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = text.len().checked_sub(suffix.len())?;
    if !text.is_char_boundary(cut) {
        return None;
    }
    text[cut..]
        .eq_ignore_ascii_case(suffix)
        .then(|| &text[..cut])
}

const EVENT_FILLER: &[&str] = &[
    "class", "lecture", "event", "meeting", "appointment", "schedule", "add", "create", "new",
    "block", "out", "my", "a", "an", "the", "on", "at", "from", "for", "please", "time", "daily",
    "everyday", "to",
];

/// What's left of an event utterance once days, times, and scheduling filler
/// are removed. Usually the subject ("yoga", "physics").
pub fn event_title(text: &str) -> Option<String> {
    let without_times = time_range().replace_all(text, " ");
    let words: Vec<&str> = without_times
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| {
            let clean = token.trim_matches(|c: char| !c.is_alphanumeric());
            !clean.is_empty()
                && Day::parse(clean).is_none()
                && !clean.chars().all(|c| c.is_ascii_digit())
                && !EVENT_FILLER.contains(&clean.to_lowercase().as_str())
        })
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" ").trim_matches(|c: char| !c.is_alphanumeric()).to_string())
    }
}

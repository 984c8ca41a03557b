//! Deterministic detection layer. Fixed rules only: same utterance in, same
//! candidates out. Never touches the store, the network, or the clock.

pub mod patterns;

use crate::intent::{IntentCandidate, IntentPayload, Source, Utterance};
use crate::store::{ItemPatch, QueryFilter};

const QUERY_CONFIDENCE: f32 = 0.95;
const EVENT_FULL_CONFIDENCE: f32 = 0.9;
const TASK_CONFIDENCE: f32 = 0.85;
const MODIFY_CONFIDENCE: f32 = 0.8;
const EVENT_PARTIAL_CONFIDENCE: f32 = 0.5;
const MODIFY_NO_TARGET_CONFIDENCE: f32 = 0.4;

const EVENT_KEYWORDS: &[&str] = &[
    "class", "lecture", "event", "meeting", "appointment", "schedule", "block out",
];
const TASK_KEYWORDS: &[&str] = &["task", "assignment", "homework", "todo", "to-do", "due"];

#[derive(Debug, Default)]
pub struct Detector;

impl Detector {
    pub fn new() -> Self {
        Self
    }

    /// Produces candidates ordered by descending confidence. Questions are
    /// queries and nothing else; they can never become mutations downstream.
    pub fn detect(&self, utterance: &Utterance) -> Vec<IntentCandidate> {
        let text = utterance.text.trim();
        let lower = text.to_lowercase();

        if text.is_empty() {
            return vec![unknown("empty utterance")];
        }

        if patterns::is_question(text) {
            return vec![IntentCandidate::new(
                IntentPayload::Query {
                    filter: QueryFilter {
                        scope: patterns::query_scope(text),
                        text: None,
                    },
                },
                QUERY_CONFIDENCE,
                Source::Deterministic,
                "matches question pattern",
            )];
        }

        let mut candidates = Vec::new();

        if let Some((verb, target)) = patterns::modify_command(text) {
            let patch = patch_for_verb(&verb);
            let confidence = if target.is_empty() {
                MODIFY_NO_TARGET_CONFIDENCE
            } else {
                MODIFY_CONFIDENCE
            };
            candidates.push(IntentCandidate::new(
                IntentPayload::ModifyTask {
                    target: if target.is_empty() { None } else { Some(target) },
                    patch,
                },
                confidence,
                Source::Deterministic,
                format!("starts with modification verb '{}'", verb),
            ));
        }

        let days = patterns::extract_days(text);
        let range = patterns::extract_time_range(text);
        let event_complete = !days.is_empty() && range.is_some();

        if let (false, Some((start, end))) = (days.is_empty(), range) {
            candidates.push(IntentCandidate::new(
                IntentPayload::CreateEvent {
                    title: patterns::event_title(text),
                    days: days.clone(),
                    start: Some(start),
                    end: Some(end),
                },
                EVENT_FULL_CONFIDENCE,
                Source::Deterministic,
                "contains day names and a time range",
            ));
        } else if EVENT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            candidates.push(IntentCandidate::new(
                IntentPayload::CreateEvent {
                    title: patterns::event_title(text),
                    days,
                    start: range.map(|(s, _)| s),
                    end: range.map(|(_, e)| e),
                },
                EVENT_PARTIAL_CONFIDENCE,
                Source::Deterministic,
                "scheduling keyword without a full day/time slot",
            ));
        }

        // A complete event shape takes precedence over the task reading of
        // the same words; otherwise "add yoga class mon 10-11" stalls on a
        // false ambiguity.
        let task_signal = lower.starts_with("add ")
            || lower.starts_with("please add ")
            || lower.starts_with("remind me")
            || lower.starts_with("remember to ")
            || TASK_KEYWORDS.iter().any(|kw| lower.contains(kw));
        if task_signal && !event_complete {
            let title = patterns::extract_title(text);
            candidates.push(IntentCandidate::new(
                IntentPayload::CreateTask {
                    title: if title.is_empty() { None } else { Some(title) },
                    due: None,
                },
                TASK_CONFIDENCE,
                Source::Deterministic,
                "task keyword or add-command prefix",
            ));
        }

        if candidates.is_empty() {
            return vec![unknown("no structural match")];
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates
    }
}

fn unknown(reason: &str) -> IntentCandidate {
    IntentCandidate::new(IntentPayload::Unknown, 0.0, Source::Deterministic, reason)
}

fn patch_for_verb(verb: &str) -> ItemPatch {
    match verb {
        "remove" | "delete" | "cancel" => ItemPatch {
            removed: true,
            ..ItemPatch::default()
        },
        "finish" | "complete" | "mark" => ItemPatch {
            done: Some(true),
            ..ItemPatch::default()
        },
        // rename without the new title; the rule layer asks for it
        _ => ItemPatch::default(),
    }
}

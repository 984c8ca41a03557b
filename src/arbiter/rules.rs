//! Hard rules. Confidence never overrides these: a candidate missing a
//! required field is ineligible no matter how sure anything claims to be.

use crate::intent::{IntentCandidate, IntentPayload, RejectReason, ResolvedIntent};
use crate::store::{Item, ItemPatch, RefMatch, Store, StoreFault};

const MIN_TITLE_LEN: usize = 2;
const FALLBACK_EVENT_TITLE: &str = "Class";

/// Words that carry no task content on their own.
const TITLE_STOPWORDS: &[&str] = &[
    "a", "an", "the", "my", "me", "it", "this", "that", "new", "task", "todo", "something",
    "anything", "stuff", "thing", "please", "to", "do",
];

#[derive(Debug, Clone)]
pub enum RuleOutcome {
    /// Passed every hard rule; safe to hand to the executor.
    Eligible(ResolvedIntent),
    /// Rule-blocked but recoverable: the user can supply what's missing.
    NeedsDetail {
        question: String,
        options: Vec<String>,
    },
    /// The target reference matched more than one stored item.
    AmbiguousTarget {
        question: String,
        matches: Vec<Item>,
    },
    /// Not recoverable by asking; skipped during selection.
    Ineligible(RejectReason),
}

/// A title is meaningful if it survives trimming, meets the length floor, and
/// isn't made of stopwords alone.
pub fn meaningful_title(title: &str) -> bool {
    let trimmed = title.trim();
    if trimmed.len() < MIN_TITLE_LEN {
        return false;
    }
    !trimmed
        .split_whitespace()
        .all(|word| TITLE_STOPWORDS.contains(&word.to_lowercase().as_str()))
}

/// Validates one candidate against the hard rules for its kind. Store faults
/// bubble up untouched; the Arbiter turns them into a distinct Reject.
pub fn validate(candidate: &IntentCandidate, store: &dyn Store) -> Result<RuleOutcome, StoreFault> {
    match &candidate.payload {
        IntentPayload::Query { filter } => {
            // Queries are always eligible and always read-only.
            Ok(RuleOutcome::Eligible(ResolvedIntent::Query(filter.clone())))
        }

        IntentPayload::CreateTask { title, due } => match title {
            Some(t) if meaningful_title(t) => Ok(RuleOutcome::Eligible(ResolvedIntent::CreateTask {
                title: t.trim().to_string(),
                due: *due,
            })),
            _ => Ok(RuleOutcome::NeedsDetail {
                question: "What exactly should the task say?".to_string(),
                options: vec![
                    "Math homework".to_string(),
                    "Read chapter 5".to_string(),
                    "Prepare for exam".to_string(),
                ],
            }),
        },

        IntentPayload::CreateEvent { title, days, start, end } => {
            let mut missing = Vec::new();
            if days.is_empty() {
                missing.push("days");
            }
            if start.is_none() {
                missing.push("a start time");
            }
            if end.is_none() {
                missing.push("an end time");
            }
            if !missing.is_empty() {
                return Ok(RuleOutcome::NeedsDetail {
                    question: format!(
                        "To put this on the schedule I still need {}. What days and time is it?",
                        missing.join(", ")
                    ),
                    options: vec![
                        "Mon Wed 10-11".to_string(),
                        "Tue Thu 14-16".to_string(),
                        "Daily 9-10".to_string(),
                    ],
                });
            }
            match (start, end) {
                (Some(s), Some(e)) if s < e => Ok(RuleOutcome::Eligible(ResolvedIntent::CreateEvent {
                    title: title
                        .clone()
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| FALLBACK_EVENT_TITLE.to_string()),
                    days: days.clone(),
                    start: *s,
                    end: *e,
                })),
                _ => Ok(RuleOutcome::NeedsDetail {
                    question: "The start time has to be before the end time. What times should it run?"
                        .to_string(),
                    options: vec!["10:00-11:00".to_string(), "14:30-16:00".to_string()],
                }),
            }
        }

        IntentPayload::ModifyTask { target, patch } => {
            let target = match target {
                Some(t) if !t.trim().is_empty() => t.trim(),
                _ => {
                    return Ok(RuleOutcome::NeedsDetail {
                        question: "Which item should I change?".to_string(),
                        options: Vec::new(),
                    })
                }
            };
            if *patch == ItemPatch::default() {
                // e.g. "rename X" without the new name
                return Ok(RuleOutcome::NeedsDetail {
                    question: format!("What should change about '{}'?", target),
                    options: Vec::new(),
                });
            }
            match store.resolve_reference(target)? {
                RefMatch::Unique(id) => Ok(RuleOutcome::Eligible(ResolvedIntent::ModifyTask {
                    id,
                    patch: patch.clone(),
                })),
                RefMatch::Ambiguous(matches) => Ok(RuleOutcome::AmbiguousTarget {
                    question: format!("I found more than one item matching '{}'. Which one?", target),
                    matches,
                }),
                RefMatch::NotFound => Ok(RuleOutcome::Ineligible(RejectReason::TargetNotFound(
                    target.to_string(),
                ))),
            }
        }

        IntentPayload::Unknown => Ok(RuleOutcome::Ineligible(RejectReason::NoActionableIntent)),
    }
}

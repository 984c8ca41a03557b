//! Advisory suggestion layer. The AI service proposes, it never decides:
//! anything coming back here is untrusted input, and any failure degrades to
//! "no advice" without touching the deterministic path.

pub mod client;
pub use client::HttpSuggester;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::detect::patterns;
use crate::intent::{Day, IntentCandidate, IntentPayload, SessionId, Source, TimeOfDay, Utterance};
use crate::store::{ItemPatch, QueryFilter, QueryScope};

/// Short conversational context sent along with the utterance.
#[derive(Debug, Clone, Serialize)]
pub struct TurnContext {
    pub session: SessionId,
    pub pending_question: Option<String>,
}

/// Raw wire shape from the suggestion service. Deliberately loose; mapping
/// into candidates is where the distrust lives.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSuggestion {
    pub kind: String,
    #[serde(default)]
    pub fields: serde_json::Value,
    #[serde(default)]
    pub confidence: f32,
}

#[async_trait]
pub trait SuggestionService: Send + Sync {
    async fn suggest(
        &self,
        utterance: &Utterance,
        context: &TurnContext,
    ) -> anyhow::Result<Vec<RawSuggestion>>;
}

/// Suggester for advisory-less operation.
pub struct NullSuggester;

#[async_trait]
impl SuggestionService for NullSuggester {
    async fn suggest(
        &self,
        _utterance: &Utterance,
        _context: &TurnContext,
    ) -> anyhow::Result<Vec<RawSuggestion>> {
        Ok(Vec::new())
    }
}

/// Wraps a suggestion service with a hard timeout and defensive mapping.
pub struct Advisor {
    service: Arc<dyn SuggestionService>,
    timeout: Duration,
}

impl Advisor {
    pub fn new(service: Arc<dyn SuggestionService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Never fails. Faults, timeouts, and malformed responses all collapse
    /// to an empty candidate list; the deterministic path keeps going.
    pub async fn suggest(&self, utterance: &Utterance, context: &TurnContext) -> Vec<IntentCandidate> {
        match tokio::time::timeout(self.timeout, self.service.suggest(utterance, context)).await {
            Ok(Ok(raw)) => raw.into_iter().filter_map(map_suggestion).collect(),
            Ok(Err(e)) => {
                warn!(session = %utterance.session, "advisory suggestion failed: {e:#}");
                Vec::new()
            }
            Err(_) => {
                warn!(session = %utterance.session, timeout_ms = self.timeout.as_millis() as u64,
                      "advisory suggestion timed out");
                Vec::new()
            }
        }
    }
}

/// Maps one untrusted suggestion into a candidate, or drops it. Confidence is
/// clamped; unrecognized kinds and junk fields are discarded, not guessed at.
fn map_suggestion(raw: RawSuggestion) -> Option<IntentCandidate> {
    let fields = &raw.fields;
    let payload = match raw.kind.as_str() {
        "query" => IntentPayload::Query {
            filter: QueryFilter {
                scope: fields
                    .get("scope")
                    .and_then(|v| v.as_str())
                    .map(scope_from_str)
                    .unwrap_or(QueryScope::All),
                text: field_str(fields, "text"),
            },
        },
        "task" => IntentPayload::CreateTask {
            title: field_str(fields, "title"),
            due: fields
                .get("due")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok()),
        },
        "class" | "event" => IntentPayload::CreateEvent {
            title: field_str(fields, "title"),
            days: field_days(fields),
            start: field_time(fields, "start"),
            end: field_time(fields, "end"),
        },
        "modify" => IntentPayload::ModifyTask {
            target: field_str(fields, "target"),
            patch: ItemPatch {
                title: field_str(fields, "new_title"),
                done: fields.get("done").and_then(|v| v.as_bool()),
                removed: fields
                    .get("removed")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            },
        },
        other => {
            debug!(kind = other, "discarding advisory suggestion of unknown kind");
            return None;
        }
    };
    Some(IntentCandidate::new(
        payload,
        raw.confidence,
        Source::Advisory,
        "advisory suggestion",
    ))
}

fn scope_from_str(s: &str) -> QueryScope {
    match s {
        "today" => QueryScope::Today,
        "tomorrow" => QueryScope::Tomorrow,
        "week" => QueryScope::Week,
        _ => QueryScope::All,
    }
}

fn field_str(fields: &serde_json::Value, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn field_time(fields: &serde_json::Value, key: &str) -> Option<TimeOfDay> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(TimeOfDay::parse)
}

fn field_days(fields: &serde_json::Value) -> BTreeSet<Day> {
    match fields.get("days") {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter_map(Day::parse)
            .collect(),
        Some(serde_json::Value::String(s)) => patterns::extract_days(s),
        _ => BTreeSet::new(),
    }
}

//! Write-only hook for the analytics/learning collaborator. One record per
//! resolved turn; the core never reads anything back, and a missing sink
//! changes nothing about resolution.

use chrono::{DateTime, Utc};

use crate::intent::{Decision, IntentKind, Source, Utterance};

#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub session: String,
    pub utterance: String,
    pub decision: &'static str,
    pub kind: Option<IntentKind>,
    pub confidence: Option<f32>,
    pub source: Option<Source>,
    pub at: DateTime<Utc>,
}

impl TurnRecord {
    pub fn from_decision(utterance: &Utterance, decision: &Decision) -> Self {
        let (kind, confidence, source) = match decision {
            Decision::Execute { intent, provenance } => (
                Some(intent.kind()),
                Some(provenance.confidence),
                Some(provenance.source),
            ),
            Decision::Clarify(pending) => (
                pending.candidates.first().map(|c| c.kind()),
                pending.candidates.first().map(|c| c.confidence),
                pending.candidates.first().map(|c| c.source),
            ),
            Decision::Reject(_) => (None, None, None),
        };
        Self {
            session: utterance.session.to_string(),
            utterance: utterance.text.clone(),
            decision: decision.label(),
            kind,
            confidence,
            source,
            at: Utc::now(),
        }
    }
}

pub trait TurnSink: Send + Sync {
    fn record(&self, record: TurnRecord);
}

/// Default sink: emits each turn as a structured log event.
pub struct TracingSink;

impl TurnSink for TracingSink {
    fn record(&self, record: TurnRecord) {
        tracing::info!(
            target: "concord::turns",
            session = %record.session,
            utterance = %record.utterance,
            decision = record.decision,
            kind = record.kind.map(|k| k.label()),
            confidence = record.confidence.map(f64::from),
            "turn resolved"
        );
    }
}

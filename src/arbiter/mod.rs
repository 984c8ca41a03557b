//! Authority layer. Deterministic candidates carry authority, advisory ones
//! only ever reinforce them, and anything uncertain defers to the user
//! instead of guessing. Total: every input gets exactly one Decision.

pub mod rules;
pub mod session;

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ArbiterConfig, ReplyPolicy};
use crate::detect::patterns;
use crate::intent::{
    Decision, IntentCandidate, IntentKind, IntentPayload, PendingClarification, Provenance,
    RejectReason, Utterance,
};
use crate::store::Store;
use rules::RuleOutcome;
use session::{ClarificationLedger, SessionState};

/// Confidence granted to a pending candidate once the user's reply fills it
/// in or confirms it.
const REPLY_CONFIDENCE: f32 = 0.85;

const AFFIRMATIVE_WORDS: &[&str] = &["yes", "yeah", "yep", "sure", "ok", "okay"];
const NEGATIVE_WORDS: &[&str] = &["no", "nope", "nah", "cancel", "nevermind", "don't", "dont"];

pub struct Arbiter {
    config: ArbiterConfig,
    store: Arc<dyn Store>,
    ledger: ClarificationLedger,
}

impl Arbiter {
    pub fn new(config: ArbiterConfig, store: Arc<dyn Store>) -> Self {
        let ledger = ClarificationLedger::new(config.clarification_ttl);
        Self { config, store, ledger }
    }

    /// Open clarification question for a session, if one is pending. Handed
    /// to the suggester as context only.
    pub fn pending_question(&self, session: &crate::intent::SessionId) -> Option<String> {
        self.ledger.peek_question(session)
    }

    /// Clarification lifecycle state for a session.
    pub fn session_state(&self, session: &crate::intent::SessionId) -> SessionState {
        self.ledger.state(session)
    }

    /// The decision core. Merges deterministic and advisory candidates under
    /// the hard rules and confidence thresholds, and never throws for
    /// ordinary ambiguity: that's Clarify or Reject, not a fault.
    pub fn resolve(
        &self,
        utterance: &Utterance,
        deterministic: Vec<IntentCandidate>,
        advisory: Vec<IntentCandidate>,
    ) -> Decision {
        // 1. A live pending clarification absorbs the reply. Taking the
        // entry up front returns the session to Idle no matter what we
        // decide, so a duplicated reply can never execute twice.
        let pool = match self.ledger.take(&utterance.session) {
            Some(pending) => {
                if is_negative_reply(&utterance.text) {
                    info!(session = %utterance.session, "clarification declined");
                    return Decision::Reject(RejectReason::Declined);
                }
                if self.config.reply_policy == ReplyPolicy::DetectStandalone
                    && stands_alone(&deterministic, &pending, self.config.execute_threshold)
                {
                    debug!(session = %utterance.session, "reply supersedes pending clarification");
                    deterministic
                } else {
                    merge_reply(&pending, deterministic, &utterance.text)
                }
            }
            None => deterministic,
        };

        // 2. Advisory gate: advice may fill gaps and nudge confidence for
        // kinds the detector also saw, but an advisory-only kind is treated
        // as a possible hallucination and dropped.
        let pool = self.merge_advisory(pool, advisory);

        self.decide(utterance, pool)
    }

    fn merge_advisory(
        &self,
        pool: Vec<IntentCandidate>,
        advisory: Vec<IntentCandidate>,
    ) -> Vec<IntentCandidate> {
        let grounded_kinds: HashSet<IntentKind> = pool
            .iter()
            .map(IntentCandidate::kind)
            .filter(|k| *k != IntentKind::Unknown)
            .collect();

        let mut merged = pool;
        for advice in advisory {
            let kind = advice.kind();
            if kind == IntentKind::Unknown || !grounded_kinds.contains(&kind) {
                debug!(kind = kind.label(), "discarding advisory-only intent kind");
                continue;
            }
            for candidate in merged.iter_mut().filter(|c| c.kind() == kind) {
                *candidate = self.boost(candidate, &advice);
            }
        }
        merged
    }

    /// Folds one same-kind advisory candidate into a deterministic one:
    /// missing fields get filled, confidence gets a bounded bump. Monotonic
    /// and capped, so advice alone cannot carry a candidate to execution.
    fn boost(&self, candidate: &IntentCandidate, advice: &IntentCandidate) -> IntentCandidate {
        let mut payload = candidate.payload.clone();
        fill_missing_fields(&mut payload, &advice.payload);
        let confidence =
            (candidate.confidence + self.config.advisory_boost * advice.confidence).min(1.0);
        IntentCandidate::new(
            payload,
            confidence,
            candidate.source,
            format!("{}; advisory concurrence", candidate.reason),
        )
    }

    fn decide(&self, utterance: &Utterance, pool: Vec<IntentCandidate>) -> Decision {
        let mut pool = pool;
        pool.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut eligible: Vec<(IntentCandidate, crate::intent::ResolvedIntent)> = Vec::new();
        let mut blocked: Vec<(IntentCandidate, String, Vec<String>)> = Vec::new();
        let mut rejection: Option<RejectReason> = None;

        for candidate in pool {
            if candidate.kind() == IntentKind::Unknown {
                continue;
            }
            match rules::validate(&candidate, self.store.as_ref()) {
                Err(fault) => {
                    // Cannot safely guess around missing data; surface it.
                    warn!(session = %utterance.session, "store fault during resolution: {fault}");
                    return Decision::Reject(RejectReason::StoreFault(fault));
                }
                Ok(RuleOutcome::Eligible(resolved)) => eligible.push((candidate, resolved)),
                Ok(RuleOutcome::NeedsDetail { question, options }) => {
                    blocked.push((candidate, question, options))
                }
                Ok(RuleOutcome::AmbiguousTarget { question, matches }) => {
                    let options = matches.iter().map(|item| item.title.clone()).collect();
                    return self.defer(utterance, vec![candidate], question, options);
                }
                Ok(RuleOutcome::Ineligible(reason)) => rejection = Some(reason),
            }
        }

        if let Some((top, resolved)) = eligible.first() {
            if top.confidence >= self.config.execute_threshold {
                // Two rule-eligible readings of different kinds this close
                // together is genuine ambiguity, not a tie to break.
                if let Some((rival, _)) = eligible.iter().find(|(c, _)| c.kind() != top.kind()) {
                    if top.confidence - rival.confidence < self.config.ambiguity_margin {
                        let question = format!(
                            "Did you mean to {} or {}?",
                            describe(top.kind()),
                            describe(rival.kind())
                        );
                        let options = vec![
                            option_label(top.kind()),
                            option_label(rival.kind()),
                        ];
                        return self.defer(
                            utterance,
                            vec![top.clone(), rival.clone()],
                            question,
                            options,
                        );
                    }
                }
                info!(
                    session = %utterance.session,
                    kind = top.kind().label(),
                    confidence = top.confidence as f64,
                    "executing resolved intent"
                );
                return Decision::Execute {
                    intent: resolved.clone(),
                    provenance: Provenance {
                        confidence: top.confidence,
                        source: top.source,
                    },
                };
            }

            // Eligible but not confident enough: confirm rather than guess.
            let (question, options) = confirm_question(top);
            return self.defer(utterance, vec![top.clone()], question, options);
        }

        if let Some((candidate, question, options)) = blocked.into_iter().next() {
            return self.defer(utterance, vec![candidate], question, options);
        }

        Decision::Reject(rejection.unwrap_or(RejectReason::NoActionableIntent))
    }

    fn defer(
        &self,
        utterance: &Utterance,
        candidates: Vec<IntentCandidate>,
        question: String,
        options: Vec<String>,
    ) -> Decision {
        let pending = PendingClarification {
            utterance: utterance.clone(),
            candidates,
            question,
            options,
            asked_at: Utc::now(),
        };
        self.ledger.put(pending.clone());
        info!(session = %utterance.session, "awaiting clarification: {}", pending.question);
        Decision::Clarify(pending)
    }
}

/// Rebuilds the candidate pool from a pending clarification plus the reply:
/// pending candidates get their gaps filled from the reply text, and the
/// reply's own candidates join the pool as fresh interpretations.
fn merge_reply(
    pending: &PendingClarification,
    reply_candidates: Vec<IntentCandidate>,
    reply_text: &str,
) -> Vec<IntentCandidate> {
    let days = patterns::extract_days(reply_text);
    let range = patterns::extract_time_range(reply_text);
    let affirmative = is_affirmative_reply(reply_text);

    let mut pool = Vec::new();
    for candidate in &pending.candidates {
        let mut payload = candidate.payload.clone();
        let mut filled = false;

        match &mut payload {
            IntentPayload::CreateEvent { title, days: d, start, end } => {
                if d.is_empty() && !days.is_empty() {
                    *d = days.clone();
                    filled = true;
                }
                if let Some((s, e)) = range {
                    if start.is_none() {
                        *start = Some(s);
                        filled = true;
                    }
                    if end.is_none() {
                        *end = Some(e);
                        filled = true;
                    }
                }
                // Only trust the reply for a title when it actually talked
                // about the schedule; "yes please" is not a class name.
                if title.is_none() && filled {
                    *title = patterns::event_title(reply_text);
                }
            }
            IntentPayload::CreateTask { title, .. } => {
                if title.is_none() && !affirmative {
                    let t = patterns::extract_title(reply_text);
                    if rules::meaningful_title(&t) {
                        *title = Some(t);
                        filled = true;
                    }
                }
            }
            IntentPayload::ModifyTask { target, .. } => {
                if target.is_none() && !affirmative && !reply_text.trim().is_empty() {
                    *target = Some(reply_text.trim().to_string());
                    filled = true;
                }
            }
            _ => {}
        }

        let confidence = if filled || affirmative {
            candidate.confidence.max(REPLY_CONFIDENCE)
        } else {
            candidate.confidence
        };
        pool.push(IntentCandidate::new(
            payload,
            confidence,
            candidate.source,
            format!("{}; clarification reply merged", candidate.reason),
        ));
    }

    pool.extend(
        reply_candidates
            .into_iter()
            .filter(|c| c.kind() != IntentKind::Unknown),
    );
    pool
}

/// Fills gaps in `payload` from a same-kind advisory payload. Existing
/// deterministic fields always win.
fn fill_missing_fields(payload: &mut IntentPayload, advice: &IntentPayload) {
    match (payload, advice) {
        (
            IntentPayload::CreateEvent { title, days, start, end },
            IntentPayload::CreateEvent {
                title: a_title,
                days: a_days,
                start: a_start,
                end: a_end,
            },
        ) => {
            if title.is_none() {
                *title = a_title.clone();
            }
            if days.is_empty() {
                *days = a_days.clone();
            }
            if start.is_none() {
                *start = *a_start;
            }
            if end.is_none() {
                *end = *a_end;
            }
        }
        (
            IntentPayload::CreateTask { title, due },
            IntentPayload::CreateTask { title: a_title, due: a_due },
        ) => {
            if title.is_none() {
                *title = a_title.clone();
            }
            if due.is_none() {
                *due = *a_due;
            }
        }
        (
            IntentPayload::ModifyTask { target, .. },
            IntentPayload::ModifyTask { target: a_target, .. },
        ) => {
            if target.is_none() {
                *target = a_target.clone();
            }
        }
        _ => {}
    }
}

/// True when the reply resolves confidently to a kind the pending entry
/// never proposed; the DetectStandalone policy treats that as a fresh turn.
fn stands_alone(
    reply_candidates: &[IntentCandidate],
    pending: &PendingClarification,
    threshold: f32,
) -> bool {
    let pending_kinds: HashSet<IntentKind> =
        pending.candidates.iter().map(IntentCandidate::kind).collect();
    reply_candidates.iter().any(|c| {
        c.kind() != IntentKind::Unknown
            && !pending_kinds.contains(&c.kind())
            && c.confidence >= threshold
    })
}

fn first_word(text: &str) -> String {
    text.trim()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
        .to_lowercase()
}

fn is_affirmative_reply(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    AFFIRMATIVE_WORDS.contains(&first_word(text).as_str())
        || lower == "add it"
        || lower == "do it"
        || lower == "go ahead"
}

fn is_negative_reply(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    NEGATIVE_WORDS.contains(&first_word(text).as_str())
        || lower.contains("never mind")
        || lower.contains("leave it")
}

fn describe(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::Query => "look something up",
        IntentKind::CreateTask => "add a task",
        IntentKind::CreateEvent => "add a class to the schedule",
        IntentKind::ModifyTask => "change an existing item",
        IntentKind::Unknown => "do something else",
    }
}

fn option_label(kind: IntentKind) -> String {
    match kind {
        IntentKind::Query => "Just tell me".to_string(),
        IntentKind::CreateTask => "Add as task".to_string(),
        IntentKind::CreateEvent => "Add as class".to_string(),
        IntentKind::ModifyTask => "Change the item".to_string(),
        IntentKind::Unknown => "Neither".to_string(),
    }
}

fn confirm_question(candidate: &IntentCandidate) -> (String, Vec<String>) {
    match &candidate.payload {
        IntentPayload::CreateTask { title, .. } => (
            match title {
                Some(t) => format!("Should I add '{}' as a task?", t),
                None => "Should I add this as a task?".to_string(),
            },
            vec!["Yes, add it".to_string(), "No, cancel".to_string()],
        ),
        IntentPayload::CreateEvent { .. } => (
            "Should I put this on your schedule?".to_string(),
            vec!["Yes, add it".to_string(), "No, cancel".to_string()],
        ),
        IntentPayload::ModifyTask { target, .. } => (
            match target {
                Some(t) => format!("Do you want me to change '{}'?", t),
                None => "Which item should I change?".to_string(),
            },
            vec!["Yes".to_string(), "No, cancel".to_string()],
        ),
        _ => (
            "I'm not sure what you want me to do. Could you rephrase?".to_string(),
            Vec::new(),
        ),
    }
}

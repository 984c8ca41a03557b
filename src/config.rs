use std::time::Duration;

/// How a new utterance interacts with a pending clarification for the
/// same session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyPolicy {
    /// Always fold the new utterance into the pending candidate set.
    AlwaysMerge,
    /// If the new utterance stands on its own (a confident candidate of a
    /// kind the pending set never proposed), drop the pending entry and
    /// treat it as a fresh turn.
    DetectStandalone,
}

#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    /// Minimum confidence for direct execution. Below this the turn defers
    /// to the user.
    pub execute_threshold: f32,
    /// Two eligible candidates of different kinds closer than this are
    /// genuine ambiguity.
    pub ambiguity_margin: f32,
    /// Bounded additive increment a same-kind advisory candidate may
    /// contribute to a deterministic candidate's confidence. Advice can
    /// nudge a borderline candidate over the threshold, but a kind the
    /// detector never produced is dropped before this applies.
    pub advisory_boost: f32,
    /// Hard bound on the advisory call. On expiry the turn proceeds with no
    /// advisory candidates.
    pub advisory_timeout: Duration,
    /// Pending clarifications older than this are discarded unanswered.
    pub clarification_ttl: Duration,
    pub reply_policy: ReplyPolicy,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            execute_threshold: 0.65,
            ambiguity_margin: 0.15,
            advisory_boost: 0.15,
            advisory_timeout: Duration::from_millis(1500),
            clarification_ttl: Duration::from_secs(300),
            reply_policy: ReplyPolicy::AlwaysMerge,
        }
    }
}

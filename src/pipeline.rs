//! Turn orchestration: Detector -> Suggester -> Arbiter -> Executor, strictly
//! forward. One utterance per session is fully resolved before the next; the
//! only feedback path is a clarification reply re-entering the Arbiter.

use std::sync::Arc;
use tracing::debug;

use crate::advisory::{Advisor, SuggestionService, TurnContext};
use crate::arbiter::Arbiter;
use crate::config::ArbiterConfig;
use crate::detect::Detector;
use crate::executor::{ExecError, Executor};
use crate::intent::{ActionResult, Decision, SessionId, Utterance};
use crate::store::Store;
use crate::telemetry::{TurnRecord, TurnSink};

/// What the chat surface renders back to the user.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Done { result: ActionResult },
    NeedsReply { question: String, options: Vec<String> },
    Refused { reason: String },
}

pub struct Pipeline {
    detector: Detector,
    advisor: Advisor,
    arbiter: Arbiter,
    executor: Executor,
    sink: Option<Arc<dyn TurnSink>>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        suggester: Arc<dyn SuggestionService>,
        config: ArbiterConfig,
    ) -> Self {
        let advisor = Advisor::new(suggester, config.advisory_timeout);
        Self {
            detector: Detector::new(),
            advisor,
            arbiter: Arbiter::new(config, Arc::clone(&store)),
            executor: Executor::new(store),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TurnSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Resolves one utterance end to end. A conversational outcome (done,
    /// needs-reply, refused) is Ok; only a collaborator fault during
    /// execution surfaces as an operational error.
    pub async fn handle(&self, text: &str, session: &SessionId) -> Result<TurnOutcome, ExecError> {
        let utterance = Utterance::now(text, session.clone());

        let deterministic = self.detector.detect(&utterance);
        debug!(count = deterministic.len(), "deterministic candidates");

        let context = TurnContext {
            session: session.clone(),
            pending_question: self.arbiter.pending_question(session),
        };
        let advisory = self.advisor.suggest(&utterance, &context).await;
        debug!(count = advisory.len(), "advisory candidates");

        let decision = self.arbiter.resolve(&utterance, deterministic, advisory);
        if let Some(sink) = &self.sink {
            sink.record(TurnRecord::from_decision(&utterance, &decision));
        }

        match decision {
            Decision::Execute { intent, .. } => {
                let result = self.executor.execute(&intent)?;
                Ok(TurnOutcome::Done { result })
            }
            Decision::Clarify(pending) => Ok(TurnOutcome::NeedsReply {
                question: pending.question,
                options: pending.options,
            }),
            Decision::Reject(reason) => Ok(TurnOutcome::Refused {
                reason: reason.to_string(),
            }),
        }
    }
}

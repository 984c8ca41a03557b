use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use concord::advisory::{NullSuggester, RawSuggestion, SuggestionService, TurnContext};
use concord::config::ArbiterConfig;
use concord::intent::{ActionResult, SessionId, Utterance};
use concord::store::{ItemKind, MemoryStore, QueryFilter, Store};
use concord::telemetry::{TurnRecord, TurnSink};
use concord::{Pipeline, TurnOutcome};

/// Plays back a fixed set of suggestions regardless of input.
struct ScriptedSuggester {
    suggestions: Vec<RawSuggestion>,
}

#[async_trait]
impl SuggestionService for ScriptedSuggester {
    async fn suggest(
        &self,
        _utterance: &Utterance,
        _context: &TurnContext,
    ) -> anyhow::Result<Vec<RawSuggestion>> {
        Ok(self.suggestions.clone())
    }
}

/// Always errors, as a flaky or unreachable advisory service would.
struct FailingSuggester;

#[async_trait]
impl SuggestionService for FailingSuggester {
    async fn suggest(
        &self,
        _utterance: &Utterance,
        _context: &TurnContext,
    ) -> anyhow::Result<Vec<RawSuggestion>> {
        anyhow::bail!("connection refused")
    }
}

#[derive(Default)]
struct CollectingSink {
    records: Mutex<Vec<TurnRecord>>,
}

impl TurnSink for CollectingSink {
    fn record(&self, record: TurnRecord) {
        self.records.lock().expect("sink lock").push(record);
    }
}

fn pipeline(store: Arc<MemoryStore>) -> Pipeline {
    Pipeline::new(store, Arc::new(NullSuggester), ArbiterConfig::default())
}

#[tokio::test]
async fn a_question_resolves_to_results_without_mutating() {
    let store = Arc::new(MemoryStore::new());
    let pipe = pipeline(store.clone());
    let session = SessionId::new("p1");

    let outcome = pipe
        .handle("what's on my calendar tomorrow", &session)
        .await
        .expect("turn must resolve");

    match outcome {
        TurnOutcome::Done {
            result: ActionResult::Items(items),
        } => assert!(items.is_empty(), "empty store yields no items"),
        other => panic!("expected query results, got {:?}", other),
    }
    assert!(
        store.query(&QueryFilter::all()).expect("query").is_empty(),
        "a question must never write"
    );
}

#[tokio::test]
async fn a_confident_task_command_executes_in_one_turn() {
    let store = Arc::new(MemoryStore::new());
    let pipe = pipeline(store.clone());
    let session = SessionId::new("p2");

    let outcome = pipe.handle("add gym", &session).await.expect("turn must resolve");
    assert!(
        matches!(outcome, TurnOutcome::Done { result: ActionResult::Created(_) }),
        "got {:?}",
        outcome
    );

    let items = store.query(&QueryFilter::all()).expect("query");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "gym");
    assert_eq!(items[0].kind, ItemKind::Task);
}

#[tokio::test]
async fn a_vague_request_is_clarified_then_completed() {
    let store = Arc::new(MemoryStore::new());
    let pipe = pipeline(store.clone());
    let session = SessionId::new("p3");

    let outcome = pipe
        .handle("schedule something", &session)
        .await
        .expect("turn must resolve");
    let question = match outcome {
        TurnOutcome::NeedsReply { question, options } => {
            assert!(!options.is_empty(), "clarification should offer examples");
            question
        }
        other => panic!("vague scheduling must ask back, got {:?}", other),
    };
    assert!(question.contains("days"), "question: {}", question);

    let outcome = pipe
        .handle("yoga class Monday 6 to 7", &session)
        .await
        .expect("turn must resolve");
    assert!(
        matches!(outcome, TurnOutcome::Done { result: ActionResult::Created(_) }),
        "got {:?}",
        outcome
    );

    let items = store.query(&QueryFilter::all()).expect("query");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "yoga");
    assert_eq!(items[0].kind, ItemKind::Event);
    let schedule = items[0].schedule.as_ref().expect("event schedule");
    assert_eq!(schedule.start.hour, 6);
    assert_eq!(schedule.end.hour, 7);
}

#[tokio::test]
async fn a_duplicated_reply_cannot_execute_twice() {
    let store = Arc::new(MemoryStore::new());
    let pipe = pipeline(store.clone());
    let session = SessionId::new("p4");

    let outcome = pipe
        .handle("block out gym time 6-7", &session)
        .await
        .expect("turn must resolve");
    assert!(matches!(outcome, TurnOutcome::NeedsReply { .. }), "got {:?}", outcome);

    let outcome = pipe.handle("mondays", &session).await.expect("turn must resolve");
    assert!(
        matches!(outcome, TurnOutcome::Done { result: ActionResult::Created(_) }),
        "got {:?}",
        outcome
    );
    assert_eq!(store.query(&QueryFilter::all()).expect("query").len(), 1);

    // Same reply delivered again, e.g. a retried webhook. The pending entry
    // is gone, so this must not create a second event.
    let outcome = pipe.handle("mondays", &session).await.expect("turn must resolve");
    assert!(matches!(outcome, TurnOutcome::Refused { .. }), "got {:?}", outcome);
    assert_eq!(
        store.query(&QueryFilter::all()).expect("query").len(),
        1,
        "the duplicate must not execute"
    );
}

#[tokio::test]
async fn advisory_failure_degrades_to_deterministic_only() {
    let store = Arc::new(MemoryStore::new());
    let pipe = Pipeline::new(
        store.clone(),
        Arc::new(FailingSuggester),
        ArbiterConfig::default(),
    );
    let session = SessionId::new("p5");

    let outcome = pipe.handle("add gym", &session).await.expect("turn must resolve");
    assert!(
        matches!(outcome, TurnOutcome::Done { result: ActionResult::Created(_) }),
        "a dead advisory service must not block deterministic turns, got {:?}",
        outcome
    );
}

#[tokio::test]
async fn advisory_only_suggestions_are_refused() {
    let store = Arc::new(MemoryStore::new());
    let suggester = ScriptedSuggester {
        suggestions: vec![RawSuggestion {
            kind: "task".to_string(),
            fields: json!({ "title": "buy crypto" }),
            confidence: 0.99,
        }],
    };
    let pipe = Pipeline::new(store.clone(), Arc::new(suggester), ArbiterConfig::default());
    let session = SessionId::new("p6");

    // Nothing in the utterance supports the suggested task.
    let outcome = pipe.handle("hello there", &session).await.expect("turn must resolve");
    assert!(matches!(outcome, TurnOutcome::Refused { .. }), "got {:?}", outcome);
    assert!(
        store.query(&QueryFilter::all()).expect("query").is_empty(),
        "the hallucinated task must never reach the store"
    );
}

#[tokio::test]
async fn advisory_concurrence_fills_the_missing_slot() {
    let store = Arc::new(MemoryStore::new());
    let suggester = ScriptedSuggester {
        suggestions: vec![RawSuggestion {
            kind: "class".to_string(),
            fields: json!({
                "title": "Physics",
                "days": ["tue", "thu"],
                "start": "14:00",
                "end": "16:00"
            }),
            confidence: 0.9,
        }],
    };
    // The boost is bounded, so a keyword-only detection plus full advisory
    // concurrence sits just under the stock threshold. A deployment that
    // trusts its suggester runs with a slightly lower one.
    let config = ArbiterConfig {
        execute_threshold: 0.6,
        ..ArbiterConfig::default()
    };
    let pipe = Pipeline::new(store.clone(), Arc::new(suggester), config);
    let session = SessionId::new("p7");

    // The detector sees a scheduling keyword but no slot; the advisory
    // candidate of the same kind supplies it.
    let outcome = pipe
        .handle("schedule my physics class", &session)
        .await
        .expect("turn must resolve");
    assert!(
        matches!(outcome, TurnOutcome::Done { result: ActionResult::Created(_) }),
        "got {:?}",
        outcome
    );
    let items = store.query(&QueryFilter::all()).expect("query");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, ItemKind::Event);
}

#[tokio::test]
async fn every_turn_is_recorded_by_the_sink() {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(CollectingSink::default());
    let pipe = pipeline(store).with_sink(sink.clone());
    let session = SessionId::new("p8");

    pipe.handle("add gym", &session).await.expect("turn must resolve");
    pipe.handle("schedule something", &session).await.expect("turn must resolve");
    pipe.handle("never mind", &session).await.expect("turn must resolve");

    let records = sink.records.lock().expect("sink lock");
    assert_eq!(records.len(), 3, "one record per turn");
    assert_eq!(records[0].decision, "execute");
    assert_eq!(records[1].decision, "clarify");
    assert_eq!(records[2].decision, "reject");
    assert_eq!(records[0].session, "p8");
    assert_eq!(records[0].utterance, "add gym");
}

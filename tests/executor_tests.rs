use std::collections::BTreeSet;
use std::sync::Arc;

use concord::executor::{ExecError, Executor};
use concord::intent::{ActionResult, Day, ResolvedIntent, TimeOfDay};
use concord::store::{
    Item, ItemId, ItemKind, ItemPatch, MemoryStore, NewItem, QueryFilter, RefMatch, Store,
    StoreFault,
};

fn time(hour: u8, minute: u8) -> TimeOfDay {
    TimeOfDay::new(hour, minute).expect("test times are valid")
}

struct FaultStore;

impl Store for FaultStore {
    fn query(&self, _filter: &QueryFilter) -> Result<Vec<Item>, StoreFault> {
        Err(StoreFault::Unavailable("disk gone".to_string()))
    }
    fn create(&self, _item: NewItem) -> Result<ItemId, StoreFault> {
        Err(StoreFault::Unavailable("disk gone".to_string()))
    }
    fn modify(&self, _id: ItemId, _patch: &ItemPatch) -> Result<(), StoreFault> {
        Err(StoreFault::Unavailable("disk gone".to_string()))
    }
    fn resolve_reference(&self, _text: &str) -> Result<RefMatch, StoreFault> {
        Err(StoreFault::Unavailable("disk gone".to_string()))
    }
}

#[test]
fn create_task_stores_the_item() {
    let store = Arc::new(MemoryStore::new());
    let executor = Executor::new(store.clone());

    let result = executor
        .execute(&ResolvedIntent::CreateTask {
            title: "Math homework".to_string(),
            due: None,
        })
        .expect("create must succeed");

    let id = match result {
        ActionResult::Created(id) => id,
        other => panic!("expected Created, got {:?}", other),
    };
    let items = store.query(&QueryFilter::all()).expect("query");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, id);
    assert_eq!(items[0].title, "Math homework");
    assert_eq!(items[0].kind, ItemKind::Task);
    assert!(!items[0].done);
}

#[test]
fn create_event_stores_the_schedule() {
    let store = Arc::new(MemoryStore::new());
    let executor = Executor::new(store.clone());

    executor
        .execute(&ResolvedIntent::CreateEvent {
            title: "Physics".to_string(),
            days: BTreeSet::from([Day::Mon, Day::Wed]),
            start: time(10, 0),
            end: time(11, 0),
        })
        .expect("create must succeed");

    let items = store.query(&QueryFilter::all()).expect("query");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, ItemKind::Event);
    let schedule = items[0].schedule.as_ref().expect("event must carry a schedule");
    assert_eq!(schedule.days, BTreeSet::from([Day::Mon, Day::Wed]));
    assert_eq!(schedule.start, time(10, 0));
    assert_eq!(schedule.end, time(11, 0));
}

#[test]
fn blank_title_is_an_invariant_error() {
    let executor = Executor::new(Arc::new(MemoryStore::new()));
    let err = executor
        .execute(&ResolvedIntent::CreateTask {
            title: "   ".to_string(),
            due: None,
        })
        .expect_err("blank title must not reach the store");
    assert!(matches!(err, ExecError::Invariant(_)), "got {:?}", err);
}

#[test]
fn event_without_days_is_an_invariant_error() {
    let executor = Executor::new(Arc::new(MemoryStore::new()));
    let err = executor
        .execute(&ResolvedIntent::CreateEvent {
            title: "Physics".to_string(),
            days: BTreeSet::new(),
            start: time(10, 0),
            end: time(11, 0),
        })
        .expect_err("an event with no days must be refused");
    assert!(matches!(err, ExecError::Invariant(_)));
}

#[test]
fn inverted_time_range_is_an_invariant_error() {
    let executor = Executor::new(Arc::new(MemoryStore::new()));
    let err = executor
        .execute(&ResolvedIntent::CreateEvent {
            title: "Physics".to_string(),
            days: BTreeSet::from([Day::Mon]),
            start: time(11, 0),
            end: time(10, 0),
        })
        .expect_err("start must be before end");
    assert!(matches!(err, ExecError::Invariant(_)));
}

#[test]
fn query_reads_without_mutating() {
    let store = Arc::new(MemoryStore::new());
    store
        .create(NewItem {
            title: "Essay".to_string(),
            kind: ItemKind::Task,
            schedule: None,
            due: None,
        })
        .expect("seed");
    let executor = Executor::new(store.clone());

    let result = executor
        .execute(&ResolvedIntent::Query(QueryFilter::all()))
        .expect("query must succeed");
    match result {
        ActionResult::Items(items) => assert_eq!(items.len(), 1),
        other => panic!("expected Items, got {:?}", other),
    }
    assert_eq!(
        store.query(&QueryFilter::all()).expect("query").len(),
        1,
        "a query must leave the store untouched"
    );
}

#[test]
fn removal_patch_deletes_the_item() {
    let store = Arc::new(MemoryStore::new());
    let id = store
        .create(NewItem {
            title: "Old meeting".to_string(),
            kind: ItemKind::Task,
            schedule: None,
            due: None,
        })
        .expect("seed");
    let executor = Executor::new(store.clone());

    let result = executor
        .execute(&ResolvedIntent::ModifyTask {
            id,
            patch: ItemPatch {
                removed: true,
                ..ItemPatch::default()
            },
        })
        .expect("modify must succeed");
    assert_eq!(result, ActionResult::Modified(id));
    assert!(
        store.query(&QueryFilter::all()).expect("query").is_empty(),
        "removed items must not linger"
    );
}

#[test]
fn done_patch_marks_the_item() {
    let store = Arc::new(MemoryStore::new());
    let id = store
        .create(NewItem {
            title: "Essay".to_string(),
            kind: ItemKind::Task,
            schedule: None,
            due: None,
        })
        .expect("seed");
    let executor = Executor::new(store.clone());

    executor
        .execute(&ResolvedIntent::ModifyTask {
            id,
            patch: ItemPatch {
                done: Some(true),
                ..ItemPatch::default()
            },
        })
        .expect("modify must succeed");
    let items = store.query(&QueryFilter::all()).expect("query");
    assert!(items[0].done);
}

#[test]
fn store_faults_pass_through_unchanged() {
    let executor = Executor::new(Arc::new(FaultStore));
    let err = executor
        .execute(&ResolvedIntent::CreateTask {
            title: "Essay".to_string(),
            due: None,
        })
        .expect_err("fault must propagate");
    match err {
        ExecError::Store(StoreFault::Unavailable(msg)) => assert_eq!(msg, "disk gone"),
        other => panic!("expected the store fault, got {:?}", other),
    }
}

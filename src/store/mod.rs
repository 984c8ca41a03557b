use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::intent::{Day, TimeOfDay};

mod memory;
pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Task,
    Event,
}

/// Weekly recurrence slot for events/classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub days: BTreeSet<Day>,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub kind: ItemKind,
    pub schedule: Option<Schedule>,
    pub due: Option<NaiveDate>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub kind: ItemKind,
    pub schedule: Option<Schedule>,
    pub due: Option<NaiveDate>,
}

/// Sparse update. `removed` deletes the item outright.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub done: Option<bool>,
    pub removed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryScope {
    Today,
    Tomorrow,
    Week,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub scope: QueryScope,
    pub text: Option<String>,
}

impl QueryFilter {
    pub fn all() -> Self {
        Self { scope: QueryScope::All, text: None }
    }

    pub fn scoped(scope: QueryScope) -> Self {
        Self { scope, text: None }
    }
}

/// Result of resolving a free-text reference against stored items.
#[derive(Debug, Clone, PartialEq)]
pub enum RefMatch {
    Unique(ItemId),
    Ambiguous(Vec<Item>),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreFault {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("no item with id {0}")]
    Missing(ItemId),
}

/// Narrow interface to the schedule/task store. Persistence and conflict
/// resolution are the store's problem, not the pipeline's.
pub trait Store: Send + Sync {
    fn query(&self, filter: &QueryFilter) -> Result<Vec<Item>, StoreFault>;
    fn create(&self, item: NewItem) -> Result<ItemId, StoreFault>;
    fn modify(&self, id: ItemId, patch: &ItemPatch) -> Result<(), StoreFault>;
    fn resolve_reference(&self, text: &str) -> Result<RefMatch, StoreFault>;
}

//! Action execution layer. No inference and no decisions here: by the time
//! an intent arrives, ambiguity is gone. The executor re-checks the
//! structural invariants anyway rather than trusting the Arbiter blindly.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::intent::{ActionResult, ResolvedIntent};
use crate::store::{ItemKind, NewItem, Schedule, Store, StoreFault};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error(transparent)]
    Store(#[from] StoreFault),
}

pub struct Executor {
    store: Arc<dyn Store>,
}

impl Executor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Pure dispatch from a resolved intent to the corresponding store call.
    /// Store faults propagate unchanged.
    pub fn execute(&self, intent: &ResolvedIntent) -> Result<ActionResult, ExecError> {
        match intent {
            ResolvedIntent::Query(filter) => {
                let items = self.store.query(filter)?;
                info!(count = items.len(), "query executed");
                Ok(ActionResult::Items(items))
            }

            ResolvedIntent::CreateTask { title, due } => {
                if title.trim().is_empty() {
                    return Err(ExecError::Invariant("task title is blank".to_string()));
                }
                let id = self.store.create(NewItem {
                    title: title.clone(),
                    kind: ItemKind::Task,
                    schedule: None,
                    due: *due,
                })?;
                info!(%id, %title, "task created");
                Ok(ActionResult::Created(id))
            }

            ResolvedIntent::CreateEvent { title, days, start, end } => {
                if days.is_empty() {
                    return Err(ExecError::Invariant("event has no days".to_string()));
                }
                if start >= end {
                    return Err(ExecError::Invariant(format!(
                        "event start {} is not before end {}",
                        start, end
                    )));
                }
                let id = self.store.create(NewItem {
                    title: title.clone(),
                    kind: ItemKind::Event,
                    schedule: Some(Schedule {
                        days: days.clone(),
                        start: *start,
                        end: *end,
                    }),
                    due: None,
                })?;
                info!(%id, %title, "event created");
                Ok(ActionResult::Created(id))
            }

            ResolvedIntent::ModifyTask { id, patch } => {
                self.store.modify(*id, patch)?;
                info!(%id, "item modified");
                Ok(ActionResult::Modified(*id))
            }
        }
    }
}

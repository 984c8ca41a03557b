use chrono::{Datelike, Duration, Utc};
use std::sync::Mutex;

use super::{
    Item, ItemId, ItemPatch, NewItem, QueryFilter, QueryScope, RefMatch, Store, StoreFault,
};
use crate::intent::Day;

/// In-process reference store for the driver and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<Vec<Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        Self { items: Mutex::new(items) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Item>>, StoreFault> {
        self.items
            .lock()
            .map_err(|_| StoreFault::Unavailable("store lock poisoned".to_string()))
    }
}

fn in_scope(item: &Item, scope: QueryScope) -> bool {
    let today = Utc::now().date_naive();
    let on_day = |day: Day| {
        item.schedule
            .as_ref()
            .map(|s| s.days.contains(&day))
            .unwrap_or(false)
    };
    match scope {
        QueryScope::All => true,
        QueryScope::Today => on_day(Day::from_weekday(today.weekday())) || item.due == Some(today),
        QueryScope::Tomorrow => {
            let tomorrow = today + Duration::days(1);
            on_day(Day::from_weekday(tomorrow.weekday())) || item.due == Some(tomorrow)
        }
        QueryScope::Week => {
            item.schedule.is_some()
                || item
                    .due
                    .map(|d| d >= today && d < today + Duration::days(7))
                    .unwrap_or(false)
        }
    }
}

impl Store for MemoryStore {
    fn query(&self, filter: &QueryFilter) -> Result<Vec<Item>, StoreFault> {
        let items = self.lock()?;
        let needle = filter.text.as_ref().map(|t| t.to_lowercase());
        Ok(items
            .iter()
            .filter(|item| in_scope(item, filter.scope))
            .filter(|item| match &needle {
                Some(n) => item.title.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect())
    }

    fn create(&self, item: NewItem) -> Result<ItemId, StoreFault> {
        let mut items = self.lock()?;
        let id = ItemId::new();
        items.push(Item {
            id,
            title: item.title,
            kind: item.kind,
            schedule: item.schedule,
            due: item.due,
            done: false,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn modify(&self, id: ItemId, patch: &ItemPatch) -> Result<(), StoreFault> {
        let mut items = self.lock()?;
        let pos = items
            .iter()
            .position(|item| item.id == id)
            .ok_or(StoreFault::Missing(id))?;
        if patch.removed {
            items.remove(pos);
            return Ok(());
        }
        let item = &mut items[pos];
        if let Some(title) = &patch.title {
            item.title = title.clone();
        }
        if let Some(done) = patch.done {
            item.done = done;
        }
        Ok(())
    }

    fn resolve_reference(&self, text: &str) -> Result<RefMatch, StoreFault> {
        let items = self.lock()?;
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(RefMatch::NotFound);
        }

        let exact: Vec<&Item> = items
            .iter()
            .filter(|item| item.title.to_lowercase() == needle)
            .collect();
        if exact.len() == 1 {
            return Ok(RefMatch::Unique(exact[0].id));
        }

        let partial: Vec<&Item> = items
            .iter()
            .filter(|item| item.title.to_lowercase().contains(&needle))
            .collect();
        match partial.len() {
            0 => Ok(RefMatch::NotFound),
            1 => Ok(RefMatch::Unique(partial[0].id)),
            _ => Ok(RefMatch::Ambiguous(partial.into_iter().cloned().collect())),
        }
    }
}

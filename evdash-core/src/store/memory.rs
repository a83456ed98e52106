//! In-process event store.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::{EventStore, Publisher, Subscription};
use crate::error::{DashError, DashResult};
use crate::event::{EventDraft, EventId, EventRecord};

/// Keeps the collection in memory and pushes every change to subscribers.
pub struct MemoryStore {
    events: Mutex<Vec<EventRecord>>,
    next_id: AtomicU64,
    changes: Publisher,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_events(Vec::new())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store. Numeric seed ids are skipped by the id counter.
    pub fn with_events(events: Vec<EventRecord>) -> Self {
        let next = events
            .iter()
            .filter_map(|e| e.id.as_number())
            .max()
            .map_or(1, |max| max + 1);
        let changes = Publisher::new(events.clone());

        MemoryStore {
            events: Mutex::new(events),
            next_id: AtomicU64::new(next),
            changes,
        }
    }

    /// Replace the whole collection, as another client writing remotely would.
    pub fn replace_all(&self, events: Vec<EventRecord>) -> DashResult<()> {
        let mut guard = self.lock()?;
        *guard = events;
        self.changes.publish(guard.clone());
        Ok(())
    }

    fn lock(&self) -> DashResult<std::sync::MutexGuard<'_, Vec<EventRecord>>> {
        self.events
            .lock()
            .map_err(|_| DashError::Persistence("memory store poisoned".into()))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    fn medium(&self) -> &'static str {
        "memory"
    }

    async fn load_all(&self) -> DashResult<Vec<EventRecord>> {
        Ok(self.lock()?.clone())
    }

    async fn create(&self, draft: EventDraft) -> DashResult<EventRecord> {
        let draft = draft.validate()?;
        let id = EventId::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = EventRecord::from_draft(id, draft);

        let mut events = self.lock()?;
        events.push(record.clone());
        self.changes.publish(events.clone());

        debug!(id = %record.id, "created event in memory");
        Ok(record)
    }

    async fn update(&self, id: &EventId, draft: EventDraft) -> DashResult<EventRecord> {
        let draft = draft.validate()?;
        let mut events = self.lock()?;

        let slot = events
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| DashError::NotFound(id.clone()))?;
        let record = EventRecord::from_draft(id.clone(), draft);
        *slot = record.clone();
        self.changes.publish(events.clone());

        Ok(record)
    }

    async fn delete(&self, id: &EventId) -> DashResult<()> {
        let mut events = self.lock()?;
        let before = events.len();
        events.retain(|e| &e.id != id);

        if events.len() != before {
            self.changes.publish(events.clone());
        }
        Ok(())
    }

    fn subscribe(&self) -> Option<Subscription> {
        Some(self.changes.subscribe())
    }
}

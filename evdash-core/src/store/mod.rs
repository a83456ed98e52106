//! Event persistence.
//!
//! The dashboard talks to every medium through [`EventStore`]. Adapters:
//! - [`LocalStore`]: one JSON blob on disk, keyed by collection name
//! - [`RemoteStore`]: a per-identity document collection over HTTP
//! - [`MemoryStore`]: in-process, for tests and throwaway sessions

mod local;
mod memory;
mod remote;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use remote::{RemoteDocument, RemoteStore};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{DashError, DashResult};
use crate::event::{EventDraft, EventId, EventRecord};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Short medium name for logs and status lines.
    fn medium(&self) -> &'static str;

    /// The full current set, in no particular order.
    async fn load_all(&self) -> DashResult<Vec<EventRecord>>;

    /// Persist a new record; the store assigns its id.
    async fn create(&self, draft: EventDraft) -> DashResult<EventRecord>;

    /// Replace every mutable field of the record with `id`.
    async fn update(&self, id: &EventId, draft: EventDraft) -> DashResult<EventRecord>;

    /// Remove the record with `id`. Removing an absent id is not an error.
    async fn delete(&self, id: &EventId) -> DashResult<()>;

    /// Change notifications, for stores that can push them.
    fn subscribe(&self) -> Option<Subscription> {
        None
    }
}

/// One published state of a collection. `generation` goes up by one with
/// every publish, so a reader can tell which snapshots came after a point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub generation: u64,
    pub events: Vec<EventRecord>,
}

/// The sending half adapters use to push their collection to subscribers.
pub struct Publisher(watch::Sender<Snapshot>);

impl Publisher {
    pub fn new(events: Vec<EventRecord>) -> Self {
        let (tx, _) = watch::channel(Snapshot {
            generation: 0,
            events,
        });
        Publisher(tx)
    }

    pub fn publish(&self, events: Vec<EventRecord>) {
        self.0.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.events = events;
        });
    }

    /// Publish only if `events` differ from the last published set.
    pub fn publish_if_changed(&self, events: Vec<EventRecord>) -> bool {
        self.0.send_if_modified(|snapshot| {
            if snapshot.events == events {
                return false;
            }
            snapshot.generation += 1;
            snapshot.events = events;
            true
        })
    }

    /// True once every subscriber is gone.
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.0.subscribe())
    }
}

/// A live view of a store's collection. Dropping it unsubscribes.
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
    poller: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(rx: watch::Receiver<Snapshot>) -> Self {
        Subscription { rx, poller: None }
    }

    /// Tie a background task feeding this subscription to its lifetime.
    pub fn with_poller(mut self, poller: JoinHandle<()>) -> Self {
        self.poller = Some(poller);
        self
    }

    /// Wait for the next published snapshot.
    pub async fn changed(&mut self) -> DashResult<Snapshot> {
        self.rx
            .changed()
            .await
            .map_err(|_| DashError::Persistence("store stopped publishing changes".into()))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// The last published snapshot.
    pub fn current(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// A handle that reports the latest generation without consuming it.
    pub fn watermark(&self) -> Watermark {
        Watermark(self.rx.clone())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

pub struct Watermark(watch::Receiver<Snapshot>);

impl Watermark {
    /// Generation of the newest snapshot published so far.
    pub fn latest(&self) -> u64 {
        self.0.borrow().generation
    }
}

//! The dashboard controller.
//!
//! [`Dashboard`] owns the in-memory event set, the active [`FilterSpec`] and
//! the [`ViewState`]. Front ends feed it intents; it turns them into store
//! calls and applies the outcome. Everything lives behind one lock that is
//! never held across a store call, so a front end can keep reading state
//! while an intent is in flight.
//!
//! Concurrent edits to the same event by different clients are resolved
//! last-write-wins: whichever write reaches the store last is what everyone
//! sees after the next refresh. A local write is laid over snapshots that
//! were published before it finished, and any snapshot published after
//! that replaces it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{DashError, DashResult, ErrorKind};
use crate::event::{EventDraft, EventId, EventRecord, sort_newest_first};
use crate::filter::{FilterSpec, apply_filter};
use crate::store::{EventStore, Snapshot, Subscription, Watermark};
use crate::view::{ViewIntent, ViewState};

/// A store intent that has been issued and not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Load,
    Create,
    Update(EventId),
    Delete(EventId),
}

impl Pending {
    pub fn label(&self) -> &'static str {
        match self {
            Pending::Load => "load",
            Pending::Create | Pending::Update(_) => "save",
            Pending::Delete(_) => "delete",
        }
    }
}

/// The last failed intent, kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&DashError> for Failure {
    fn from(err: &DashError) -> Self {
        Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A local write that a store snapshot may not reflect yet.
#[derive(Debug, Clone)]
struct Override {
    change: Change,
    /// Newest snapshot generation when the write finished.
    generation: u64,
}

#[derive(Debug, Clone)]
enum Change {
    Saved { record: EventRecord, created: bool },
    Deleted,
}

#[derive(Default)]
struct DashState {
    /// Newest first.
    events: Vec<EventRecord>,
    filter: FilterSpec,
    visible: Vec<EventRecord>,
    view: ViewState,
    pending: Option<Pending>,
    last_error: Option<Failure>,
    overrides: HashMap<EventId, Override>,
    watermark: Option<Watermark>,
}

impl DashState {
    fn begin(&mut self, pending: Pending) -> DashResult<()> {
        self.ensure_idle()?;
        self.pending = Some(pending);
        Ok(())
    }

    fn ensure_idle(&self) -> DashResult<()> {
        match &self.pending {
            Some(pending) => Err(DashError::Busy(pending.label())),
            None => Ok(()),
        }
    }

    fn fail(&mut self, intent: &str, err: DashError) -> DashError {
        warn!(intent, error = %err, "intent failed");
        self.last_error = Some(Failure::from(&err));
        err
    }

    fn remember(&mut self, id: EventId, change: Change) {
        let generation = self.watermark.as_ref().map_or(0, Watermark::latest);
        self.overrides.insert(id, Override { change, generation });
    }

    fn find(&self, id: &EventId) -> Option<&EventRecord> {
        self.events.iter().find(|e| &e.id == id)
    }

    fn upsert(&mut self, record: EventRecord) {
        match self.events.iter_mut().find(|e| e.id == record.id) {
            Some(slot) => *slot = record,
            None => self.events.push(record),
        }
    }

    /// Replace the set with a store snapshot, keeping local writes the
    /// snapshot has not caught up with.
    ///
    /// An override retires once a snapshot agrees with it, once a snapshot
    /// newer than the write arrives, or when an edited event is missing.
    fn merge_snapshot(&mut self, snapshot: Snapshot) {
        let Snapshot { generation, mut events } = snapshot;

        self.overrides.retain(|id, local| {
            if generation > local.generation {
                return false;
            }

            match &local.change {
                Change::Saved { record, created } => {
                    match events.iter_mut().find(|e| &e.id == id) {
                        Some(existing) if existing == record => false,
                        Some(existing) => {
                            *existing = record.clone();
                            true
                        }
                        None if *created => {
                            events.push(record.clone());
                            true
                        }
                        None => false,
                    }
                }
                Change::Deleted => {
                    let before = events.len();
                    events.retain(|e| &e.id != id);
                    events.len() != before
                }
            }
        });

        self.events = events;
        self.refresh();
    }

    /// Re-sort, re-filter, and drop back to the list if the event on screen
    /// no longer exists.
    fn refresh(&mut self) {
        sort_newest_first(&mut self.events);
        self.visible = apply_filter(&self.events, &self.filter);

        let gone = match self.view.subject() {
            Some(id) => self.find(id).is_none(),
            None => false,
        };
        if gone {
            info!(view = self.view.name(), "event on screen is gone, returning to list");
            self.view = ViewState::List;
        }
    }
}

pub struct Dashboard {
    store: Arc<dyn EventStore>,
    state: Mutex<DashState>,
    subscription: tokio::sync::Mutex<Option<Subscription>>,
}

impl Dashboard {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Dashboard {
            store,
            state: Mutex::new(DashState::default()),
            subscription: tokio::sync::Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, DashState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn medium(&self) -> &'static str {
        self.store.medium()
    }

    /// Replace the in-memory set with the store's current contents.
    pub async fn load(&self) -> DashResult<()> {
        self.state().begin(Pending::Load)?;

        let result = self.store.load_all().await;

        let mut state = self.state();
        state.pending = None;
        match result {
            Ok(events) => {
                debug!(medium = self.store.medium(), events = events.len(), "loaded events");
                state.overrides.clear();
                state.events = events;
                state.last_error = None;
                state.refresh();
                Ok(())
            }
            Err(e) => Err(state.fail("load", e)),
        }
    }

    pub fn set_filter(&self, filter: FilterSpec) {
        let mut guard = self.state();
        let state = &mut *guard;
        state.visible = apply_filter(&state.events, &filter);
        state.filter = filter;
    }

    pub fn filter(&self) -> FilterSpec {
        self.state().filter.clone()
    }

    /// Every loaded event, newest first.
    pub fn events(&self) -> Vec<EventRecord> {
        self.state().events.clone()
    }

    /// The events passing the active filter, newest first.
    pub fn visible(&self) -> Vec<EventRecord> {
        self.state().visible.clone()
    }

    pub fn view(&self) -> ViewState {
        self.state().view.clone()
    }

    /// The record the current view is about.
    pub fn current(&self) -> Option<EventRecord> {
        let state = self.state();
        state.view.subject().and_then(|id| state.find(id)).cloned()
    }

    pub fn pending(&self) -> Option<Pending> {
        self.state().pending.clone()
    }

    pub fn last_error(&self) -> Option<Failure> {
        self.state().last_error.clone()
    }

    fn navigate(&self, intent: ViewIntent) -> DashResult<ViewState> {
        let mut state = self.state();
        state.ensure_idle()?;

        let next = state.view.transition(&intent)?;
        debug!(from = state.view.name(), to = next.name(), %intent, "view transition");
        state.view = next.clone();
        Ok(next)
    }

    pub fn select(&self, id: &EventId) -> DashResult<ViewState> {
        if self.state().find(id).is_none() {
            return Err(DashError::NotFound(id.clone()));
        }
        self.navigate(ViewIntent::Select(id.clone()))
    }

    pub fn back(&self) -> DashResult<ViewState> {
        self.navigate(ViewIntent::Back)
    }

    pub fn create_new(&self) -> DashResult<ViewState> {
        self.navigate(ViewIntent::CreateNew)
    }

    pub fn request_edit(&self) -> DashResult<ViewState> {
        self.navigate(ViewIntent::RequestEdit)
    }

    pub fn request_delete(&self) -> DashResult<ViewState> {
        self.navigate(ViewIntent::RequestDelete)
    }

    pub fn cancel(&self) -> DashResult<ViewState> {
        self.navigate(ViewIntent::Cancel)
    }

    /// Accept the open confirmation dialog.
    ///
    /// From `ConfirmDelete(e)` this deletes `e`. On success `e` is dropped
    /// from the local set right away and the view returns to the list; on
    /// failure the view goes back to `Details(e)`.
    pub async fn confirm(&self) -> DashResult<ViewState> {
        let target = {
            let mut state = self.state();
            state.ensure_idle()?;
            let target = match &state.view {
                ViewState::ConfirmDelete(id) => Some(id.clone()),
                _ => None,
            };
            if let Some(id) = &target {
                state.begin(Pending::Delete(id.clone()))?;
            }
            target
        };

        let Some(id) = target else {
            return self.navigate(ViewIntent::Confirm);
        };

        let result = self.store.delete(&id).await;

        let mut state = self.state();
        state.pending = None;
        match result {
            Ok(()) => {
                state.events.retain(|e| e.id != id);
                state.remember(id.clone(), Change::Deleted);
                state.view = state.view.transition(&ViewIntent::Deleted).unwrap_or_default();
                state.last_error = None;
                state.refresh();

                info!(%id, "deleted event");
                Ok(state.view.clone())
            }
            Err(e) => {
                state.view = ViewState::Details(id);
                Err(state.fail("delete", e))
            }
        }
    }

    /// Submit the edit form: create when the view is `Edit(None)`, replace
    /// the event otherwise. Invalid drafts never reach the store.
    pub async fn save(&self, draft: EventDraft) -> DashResult<ViewState> {
        let (target, draft) = {
            let mut state = self.state();
            state.ensure_idle()?;

            let target = match &state.view {
                ViewState::Edit(target) => target.clone(),
                other => {
                    return Err(DashError::InvalidTransition {
                        from: other.name(),
                        intent: "save".into(),
                    });
                }
            };

            let draft = match draft.validate() {
                Ok(draft) => draft,
                Err(e) => return Err(state.fail("save", e)),
            };

            state.begin(match &target {
                Some(id) => Pending::Update(id.clone()),
                None => Pending::Create,
            })?;
            (target, draft)
        };

        let result = match &target {
            Some(id) => self.store.update(id, draft).await,
            None => self.store.create(draft).await,
        };

        let mut state = self.state();
        state.pending = None;
        match result {
            Ok(record) => {
                let id = record.id.clone();
                let created = target.is_none();
                state.remember(id.clone(), Change::Saved { record: record.clone(), created });
                state.upsert(record);
                state.view = state
                    .view
                    .transition(&ViewIntent::Saved(id.clone()))
                    .unwrap_or_else(|_| ViewState::Details(id.clone()));
                state.last_error = None;
                state.refresh();

                info!(%id, created, "saved event");
                Ok(state.view.clone())
            }
            Err(e) => Err(state.fail("save", e)),
        }
    }

    /// Start following store changes. Returns `false` for stores that cannot
    /// push them; callers then refresh with [`Dashboard::load`].
    pub async fn watch(&self) -> bool {
        let mut subscription = self.subscription.lock().await;
        if subscription.is_none() {
            *subscription = self.store.subscribe();
            self.state().watermark = subscription.as_ref().map(Subscription::watermark);
        }
        subscription.is_some()
    }

    /// Wait for the next store snapshot and merge it. Returns `false` right
    /// away when not watching.
    pub async fn next_change(&self) -> DashResult<bool> {
        let snapshot = {
            let mut subscription = self.subscription.lock().await;
            let Some(subscription) = subscription.as_mut() else {
                return Ok(false);
            };
            subscription.changed().await?
        };

        debug!(
            medium = self.store.medium(),
            generation = snapshot.generation,
            events = snapshot.events.len(),
            "store changed"
        );
        self.state().merge_snapshot(snapshot);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Publisher};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use tokio::sync::Notify;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn record(id: &str, name: &str, when: DateTime<Utc>) -> EventRecord {
        EventRecord::from_draft(EventId::from(id), EventDraft::new(name, when))
    }

    fn seed() -> Vec<EventRecord> {
        vec![
            record("1", "Standup", at(2024, 1, 10, 9)),
            record("2", "Launch", at(2024, 2, 1, 10)),
        ]
    }

    fn names(events: &[EventRecord]) -> Vec<&str> {
        events.iter().map(|e| e.name.as_str()).collect()
    }

    async fn loaded(store: Arc<MemoryStore>) -> Dashboard {
        let dash = Dashboard::new(store);
        dash.load().await.unwrap();
        dash
    }

    /// Reads work; every write fails.
    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl EventStore for ReadOnlyStore {
        fn medium(&self) -> &'static str {
            "read-only"
        }

        async fn load_all(&self) -> DashResult<Vec<EventRecord>> {
            self.0.load_all().await
        }

        async fn create(&self, _draft: EventDraft) -> DashResult<EventRecord> {
            Err(DashError::Persistence("medium offline".into()))
        }

        async fn update(&self, _id: &EventId, _draft: EventDraft) -> DashResult<EventRecord> {
            Err(DashError::Persistence("medium offline".into()))
        }

        async fn delete(&self, _id: &EventId) -> DashResult<()> {
            Err(DashError::Persistence("medium offline".into()))
        }
    }

    /// Holds every create until the gate opens.
    struct GatedStore {
        inner: MemoryStore,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl EventStore for GatedStore {
        fn medium(&self) -> &'static str {
            "gated"
        }

        async fn load_all(&self) -> DashResult<Vec<EventRecord>> {
            self.inner.load_all().await
        }

        async fn create(&self, draft: EventDraft) -> DashResult<EventRecord> {
            self.gate.notified().await;
            self.inner.create(draft).await
        }

        async fn update(&self, id: &EventId, draft: EventDraft) -> DashResult<EventRecord> {
            self.inner.update(id, draft).await
        }

        async fn delete(&self, id: &EventId) -> DashResult<()> {
            self.inner.delete(id).await
        }
    }

    /// Writes land in `inner`; subscribers only see what the test publishes
    /// on `feed`, like a poller that has not caught up yet.
    struct LaggingStore {
        inner: MemoryStore,
        feed: Publisher,
    }

    impl LaggingStore {
        fn new(events: Vec<EventRecord>) -> Self {
            LaggingStore {
                inner: MemoryStore::with_events(events.clone()),
                feed: Publisher::new(events),
            }
        }
    }

    #[async_trait]
    impl EventStore for LaggingStore {
        fn medium(&self) -> &'static str {
            "lagging"
        }

        async fn load_all(&self) -> DashResult<Vec<EventRecord>> {
            self.inner.load_all().await
        }

        async fn create(&self, draft: EventDraft) -> DashResult<EventRecord> {
            self.inner.create(draft).await
        }

        async fn update(&self, id: &EventId, draft: EventDraft) -> DashResult<EventRecord> {
            self.inner.update(id, draft).await
        }

        async fn delete(&self, id: &EventId) -> DashResult<()> {
            self.inner.delete(id).await
        }

        fn subscribe(&self) -> Option<Subscription> {
            Some(self.feed.subscribe())
        }
    }

    async fn edit_location(dash: &Dashboard, id: &str, location: &str) {
        dash.select(&EventId::from(id)).unwrap();
        dash.request_edit().unwrap();
        dash.confirm().await.unwrap();
        let draft = dash.current().unwrap().to_draft().with_location(location);
        dash.save(draft).await.unwrap();
    }

    fn ids(events: &[EventRecord]) -> Vec<String> {
        events.iter().map(|e| e.id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_sorts_newest_first() {
        let dash = loaded(Arc::new(MemoryStore::with_events(seed()))).await;

        assert_eq!(names(&dash.visible()), ["Launch", "Standup"]);
        assert_eq!(dash.view(), ViewState::List);
        assert_eq!(dash.pending(), None);
    }

    #[tokio::test]
    async fn test_filter_narrows_visible_events() {
        let dash = loaded(Arc::new(MemoryStore::with_events(seed()))).await;

        let january = FilterSpec::from_inputs(
            None,
            None,
            Some("2024-01-01"),
            Some("2024-01-31"),
            chrono_tz::UTC,
        )
        .unwrap();
        dash.set_filter(january);
        assert_eq!(names(&dash.visible()), ["Standup"]);
        assert_eq!(dash.events().len(), 2);

        dash.set_filter(FilterSpec::default());
        assert_eq!(dash.visible().len(), 2);
    }

    #[tokio::test]
    async fn test_select_and_back() {
        let dash = loaded(Arc::new(MemoryStore::with_events(seed()))).await;

        let view = dash.select(&EventId::from("1")).unwrap();
        assert_eq!(view, ViewState::Details(EventId::from("1")));
        assert_eq!(dash.current().unwrap().name, "Standup");

        assert_eq!(dash.back().unwrap(), ViewState::List);
        assert_eq!(dash.current(), None);
    }

    #[tokio::test]
    async fn test_select_unknown_event_is_not_found() {
        let dash = loaded(Arc::new(MemoryStore::with_events(seed()))).await;

        let result = dash.select(&EventId::from("404"));
        assert!(matches!(result, Err(DashError::NotFound(_))));
        assert_eq!(dash.view(), ViewState::List);
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_store() {
        let store = Arc::new(MemoryStore::with_events(seed()));
        let dash = loaded(store.clone()).await;
        dash.create_new().unwrap();

        let result = dash.save(EventDraft::new("", at(2024, 3, 1, 9))).await;

        assert!(matches!(result, Err(DashError::Validation(_))));
        assert_eq!(dash.view(), ViewState::Edit(None));
        assert_eq!(dash.last_error().unwrap().kind, ErrorKind::Validation);
        assert_eq!(dash.events().len(), 2);
        assert_eq!(store.load_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_lands_on_details() {
        let store = Arc::new(MemoryStore::with_events(seed()));
        let dash = loaded(store.clone()).await;
        dash.create_new().unwrap();

        let view = dash.save(EventDraft::new("Retro", at(2024, 3, 1, 15))).await.unwrap();

        let ViewState::Details(id) = view else {
            panic!("expected details, got {view:?}");
        };
        assert_eq!(id, EventId::from(3u64));
        assert_eq!(dash.current().unwrap().name, "Retro");
        assert_eq!(names(&dash.visible()), ["Retro", "Launch", "Standup"]);
        assert_eq!(store.load_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_edit_requires_confirmation_then_replaces() {
        let dash = loaded(Arc::new(MemoryStore::with_events(seed()))).await;
        let id = EventId::from("1");

        dash.select(&id).unwrap();
        assert_eq!(dash.request_edit().unwrap(), ViewState::ConfirmEdit(id.clone()));
        assert_eq!(dash.confirm().await.unwrap(), ViewState::Edit(Some(id.clone())));

        let draft = dash.current().unwrap().to_draft().with_location("Room 4");
        let view = dash.save(draft).await.unwrap();

        assert_eq!(view, ViewState::Details(id));
        assert_eq!(dash.current().unwrap().location.as_deref(), Some("Room 4"));
    }

    #[tokio::test]
    async fn test_delete_removes_locally_and_returns_to_list() {
        let store = Arc::new(MemoryStore::with_events(seed()));
        let dash = loaded(store.clone()).await;
        let id = EventId::from("2");

        dash.select(&id).unwrap();
        dash.request_delete().unwrap();
        assert_eq!(dash.confirm().await.unwrap(), ViewState::List);

        assert_eq!(names(&dash.events()), ["Standup"]);
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_delete_returns_to_details() {
        let store = Arc::new(ReadOnlyStore(MemoryStore::with_events(seed())));
        let dash = Dashboard::new(store);
        dash.load().await.unwrap();
        let id = EventId::from("2");

        dash.select(&id).unwrap();
        dash.request_delete().unwrap();
        let result = dash.confirm().await;

        assert!(matches!(result, Err(DashError::Persistence(_))));
        assert_eq!(dash.view(), ViewState::Details(id));
        assert_eq!(dash.events().len(), 2);
        assert_eq!(dash.last_error().unwrap().kind, ErrorKind::Persistence);
        assert_eq!(dash.pending(), None);
    }

    #[tokio::test]
    async fn test_failed_save_stays_in_edit() {
        let store = Arc::new(ReadOnlyStore(MemoryStore::with_events(seed())));
        let dash = Dashboard::new(store);
        dash.load().await.unwrap();
        dash.create_new().unwrap();

        let result = dash.save(EventDraft::new("Retro", at(2024, 3, 1, 15))).await;

        assert!(matches!(result, Err(DashError::Persistence(_))));
        assert_eq!(dash.view(), ViewState::Edit(None));
        assert_eq!(dash.events().len(), 2);
    }

    #[tokio::test]
    async fn test_confirm_outside_dialog_is_invalid() {
        let dash = loaded(Arc::new(MemoryStore::with_events(seed()))).await;

        let result = dash.confirm().await;
        assert!(matches!(result, Err(DashError::InvalidTransition { from: "list", .. })));
    }

    #[tokio::test]
    async fn test_second_intent_while_pending_is_busy() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            gate: gate.clone(),
        });
        let dash = Dashboard::new(store);
        dash.create_new().unwrap();

        let (first, second) = tokio::join!(
            dash.save(EventDraft::new("First", at(2024, 3, 1, 9))),
            async {
                assert_eq!(dash.pending(), Some(Pending::Create));
                let second = dash.save(EventDraft::new("Second", at(2024, 3, 2, 9))).await;
                assert!(dash.back().is_err());
                gate.notify_one();
                second
            }
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(DashError::Busy("save"))));
        assert_eq!(names(&dash.events()), ["First"]);
        assert_eq!(dash.pending(), None);
    }

    #[tokio::test]
    async fn test_stale_snapshot_does_not_resurrect_deleted_event() {
        let store = Arc::new(LaggingStore::new(seed()));
        let dash = Dashboard::new(store.clone());
        dash.load().await.unwrap();
        assert!(dash.watch().await);

        // Published before the delete finished
        store.feed.publish(seed());

        dash.select(&EventId::from("2")).unwrap();
        dash.request_delete().unwrap();
        dash.confirm().await.unwrap();

        assert!(dash.next_change().await.unwrap());
        assert_eq!(names(&dash.events()), ["Standup"]);

        // Anything published afterwards is taken as is
        store.feed.publish(vec![seed()[0].clone()]);
        dash.next_change().await.unwrap();
        store.feed.publish(seed());
        dash.next_change().await.unwrap();
        assert_eq!(names(&dash.events()), ["Launch", "Standup"]);
    }

    #[tokio::test]
    async fn test_stale_snapshot_keeps_local_edit() {
        let store = Arc::new(LaggingStore::new(seed()));
        let dash = Dashboard::new(store.clone());
        dash.load().await.unwrap();
        dash.watch().await;

        store.feed.publish(seed());
        edit_location(&dash, "1", "Room 4").await;

        dash.next_change().await.unwrap();
        assert_eq!(dash.current().unwrap().location.as_deref(), Some("Room 4"));
    }

    #[tokio::test]
    async fn test_stale_snapshot_keeps_created_event() {
        let store = Arc::new(LaggingStore::new(seed()));
        let dash = Dashboard::new(store.clone());
        dash.load().await.unwrap();
        dash.watch().await;

        store.feed.publish(seed());
        dash.create_new().unwrap();
        dash.save(EventDraft::new("Retro", at(2024, 3, 1, 15))).await.unwrap();

        dash.next_change().await.unwrap();
        assert_eq!(names(&dash.events()), ["Retro", "Launch", "Standup"]);
    }

    #[tokio::test]
    async fn test_removal_by_another_client_after_local_edit_wins() {
        let store = Arc::new(MemoryStore::with_events(seed()));
        let dash = loaded(store.clone()).await;
        dash.watch().await;
        edit_location(&dash, "1", "Room 4").await;

        // Another client replaces the collection before we see our own save
        store.replace_all(vec![seed()[1].clone()]).unwrap();
        dash.next_change().await.unwrap();

        assert_eq!(ids(&dash.events()), ids(&store.load_all().await.unwrap()));
        assert_eq!(ids(&dash.events()), ["2"]);
        assert_eq!(dash.view(), ViewState::List);
        assert!(matches!(dash.select(&EventId::from("1")), Err(DashError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_later_edit_by_another_client_wins() {
        let store = Arc::new(MemoryStore::with_events(seed()));
        let dash = loaded(store.clone()).await;
        dash.watch().await;
        edit_location(&dash, "1", "Room 4").await;

        let theirs = seed()[0].to_draft().with_location("Room 9");
        store.update(&EventId::from("1"), theirs).await.unwrap();
        dash.next_change().await.unwrap();

        assert_eq!(dash.current().unwrap().location.as_deref(), Some("Room 9"));
        let mut stored = store.load_all().await.unwrap();
        sort_newest_first(&mut stored);
        assert_eq!(dash.events(), stored);
    }

    #[tokio::test]
    async fn test_view_falls_back_when_event_disappears() {
        let store = Arc::new(MemoryStore::with_events(seed()));
        let dash = loaded(store.clone()).await;
        dash.watch().await;
        dash.select(&EventId::from("2")).unwrap();

        // Another client deletes the event on screen
        store.replace_all(vec![seed()[0].clone()]).unwrap();
        dash.next_change().await.unwrap();

        assert_eq!(dash.view(), ViewState::List);
        assert_eq!(names(&dash.visible()), ["Standup"]);
    }

    #[tokio::test]
    async fn test_next_change_without_push_support() {
        let dash = Dashboard::new(Arc::new(ReadOnlyStore(MemoryStore::new())));

        assert!(!dash.watch().await);
        assert!(!dash.next_change().await.unwrap());
    }
}

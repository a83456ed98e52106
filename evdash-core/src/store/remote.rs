//! Remote document collection over HTTP.
//!
//! Each identity owns one collection at `{base_url}/users/{uid}/{collection}`:
//! - `GET` the collection lists every document
//! - `POST` to the collection creates one; the service assigns its id
//! - `PUT` / `DELETE` on `{collection}/{id}` replace or remove one document
//!
//! Identities are anonymous. The service hands one out from
//! `POST {base_url}/auth/anonymous` and we keep it in `identity.toml` so the
//! same collection comes back on the next run.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{EventStore, Publisher, Subscription};
use crate::config::RemoteSettings;
use crate::error::{DashError, DashResult};
use crate::event::{EventDraft, EventId, EventRecord, parse_instant};

/// A document as the service stores it. `date` is an RFC 3339 instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl From<RemoteDocument> for EventRecord {
    fn from(doc: RemoteDocument) -> Self {
        let occurs_at = doc.date.as_deref().and_then(|d| parse_instant(d, chrono_tz::UTC));
        EventRecord {
            id: EventId::from(doc.id),
            name: doc.name,
            location: doc.location,
            description: doc.description,
            occurs_at,
        }
    }
}

/// Request body for create and replace; the id travels in the URL.
#[derive(Debug, Serialize)]
struct DocumentBody<'a> {
    name: &'a str,
    location: Option<&'a str>,
    description: Option<&'a str>,
    date: Option<String>,
}

impl<'a> From<&'a EventDraft> for DocumentBody<'a> {
    fn from(draft: &'a EventDraft) -> Self {
        DocumentBody {
            name: &draft.name,
            location: draft.location.as_deref(),
            description: draft.description.as_deref(),
            date: draft.occurs_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Identity {
    uid: String,
}

impl Identity {
    /// `None` only when no identity has been saved yet.
    fn load(path: &Path) -> DashResult<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content).map(Some).map_err(|e| {
            DashError::Config(format!("{} is not a valid identity file: {e}", path.display()))
        })
    }

    fn save(&self, path: &Path) -> DashResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DashError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        // The uid is the only key to this collection
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

#[derive(Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: String,
    collection: String,
    uid: String,
    api_key: Option<String>,
    poll_interval: Duration,
    /// Completed writes, so a poll overlapping one can be discarded.
    writes: Arc<AtomicU64>,
}

impl RemoteStore {
    /// Connect to the service, signing in anonymously unless the settings
    /// carry a `user_id` or a previous identity is cached at `identity_path`.
    pub async fn connect(settings: &RemoteSettings, identity_path: &Path) -> DashResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| DashError::persistence("Failed to build HTTP client", e))?;

        let mut store = RemoteStore {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
            uid: String::new(),
            api_key: settings.api_key.clone(),
            poll_interval: settings.poll_interval(),
            writes: Arc::new(AtomicU64::new(0)),
        };

        store.uid = match &settings.user_id {
            Some(uid) => uid.clone(),
            None => match Identity::load(identity_path)? {
                Some(identity) => identity.uid,
                None => {
                    let identity = store.sign_in_anonymously().await?;
                    identity.save(identity_path)?;
                    info!(uid = %identity.uid, "signed in anonymously");
                    identity.uid
                }
            },
        };

        Ok(store)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    async fn sign_in_anonymously(&self) -> DashResult<Identity> {
        let url = format!("{}/auth/anonymous", self.base_url);
        let response = self.send(self.request(Method::POST, &url)).await?;
        let response = expect_success(response).await?;

        response
            .json()
            .await
            .map_err(|e| DashError::persistence("Failed to parse sign-in response", e))
    }

    fn collection_url(&self) -> String {
        format!("{}/users/{}/{}", self.base_url, self.uid, self.collection)
    }

    fn document_url(&self, id: &EventId) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> DashResult<Response> {
        request
            .send()
            .await
            .map_err(|e| DashError::persistence("Request to event service failed", e))
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::AcqRel);
    }

    async fn parse_document(response: Response) -> DashResult<EventRecord> {
        let doc: RemoteDocument = response
            .json()
            .await
            .map_err(|e| DashError::persistence("Failed to parse event document", e))?;
        Ok(doc.into())
    }
}

/// Non-success statuses become `PersistenceError`, carrying the body text.
async fn expect_success(response: Response) -> DashResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DashError::Persistence(format!("event service returned {status}: {body}")))
}

#[async_trait]
impl EventStore for RemoteStore {
    fn medium(&self) -> &'static str {
        "remote"
    }

    async fn load_all(&self) -> DashResult<Vec<EventRecord>> {
        let url = self.collection_url();
        debug!(%url, "listing events");

        let response = expect_success(self.send(self.request(Method::GET, &url)).await?).await?;
        let docs: Vec<RemoteDocument> = response
            .json()
            .await
            .map_err(|e| DashError::persistence("Failed to parse event list", e))?;

        Ok(docs.into_iter().map(EventRecord::from).collect())
    }

    async fn create(&self, draft: EventDraft) -> DashResult<EventRecord> {
        let draft = draft.validate()?;
        let request = self
            .request(Method::POST, &self.collection_url())
            .json(&DocumentBody::from(&draft));

        let response = expect_success(self.send(request).await?).await?;
        let record = Self::parse_document(response).await?;
        self.wrote();

        info!(id = %record.id, name = %record.name, "created remote event");
        Ok(record)
    }

    async fn update(&self, id: &EventId, draft: EventDraft) -> DashResult<EventRecord> {
        let draft = draft.validate()?;
        let request = self
            .request(Method::PUT, &self.document_url(id))
            .json(&DocumentBody::from(&draft));

        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DashError::NotFound(id.clone()));
        }
        let response = expect_success(response).await?;
        self.wrote();

        // Some services answer a replace with an empty body
        let record = match Self::parse_document(response).await {
            Ok(record) => record,
            Err(_) => EventRecord::from_draft(id.clone(), draft),
        };

        info!(%id, "updated remote event");
        Ok(record)
    }

    async fn delete(&self, id: &EventId) -> DashResult<()> {
        let response = self
            .send(self.request(Method::DELETE, &self.document_url(id)))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%id, "delete of absent remote event ignored");
            return Ok(());
        }
        expect_success(response).await?;
        self.wrote();

        info!(%id, "deleted remote event");
        Ok(())
    }

    /// Polls the collection and publishes it whenever it changes. A poll
    /// that overlaps a write through this store is dropped, so every
    /// published snapshot is at least as new as the writes before it.
    /// Must be called from within a Tokio runtime.
    fn subscribe(&self) -> Option<Subscription> {
        let publisher = Publisher::new(Vec::new());
        let subscription = publisher.subscribe();
        let store = self.clone();

        let poller = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while !publisher.is_closed() {
                ticker.tick().await;
                let writes_before = store.writes.load(Ordering::Acquire);

                match store.load_all().await {
                    Ok(_) if store.writes.load(Ordering::Acquire) != writes_before => {
                        debug!("write landed during poll, waiting for the next one");
                    }
                    Ok(mut events) => {
                        events.sort_by(|a, b| a.id.cmp(&b.id));
                        publisher.publish_if_changed(events);
                    }
                    Err(e) => warn!(error = %e, "polling remote events failed"),
                }
            }
        });

        Some(subscription.with_poller(poller))
    }
}

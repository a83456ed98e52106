//! Local key/value blob storage.
//!
//! A collection is one JSON array at `<data_dir>/<collection>.json`. Rows use
//! the loose browser-era shape (`id`, `name`, `location`, `description`,
//! `date`, `time`, `timestamp`) and are normalized on read. The id high-water
//! mark lives next to it in `<collection>.last_id`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{EventStore, Publisher, Subscription};
use crate::error::{DashError, DashResult};
use crate::event::{EventDraft, EventForm, EventId, EventRecord, combine_date_time, parse_instant};

pub struct LocalStore {
    dir: PathBuf,
    collection: String,
    tz: Tz,
    /// Serializes read-modify-write cycles on the blob.
    lock: Mutex<()>,
    changes: Publisher,
}

/// One row as found in the blob. Every field is optional because older
/// writers were inconsistent about which ones they filled in.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRow {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

impl StoredRow {
    fn from_record(record: &EventRecord, tz: Tz) -> Self {
        let id = match record.id.as_number() {
            Some(n) => Value::from(n),
            None => Value::from(record.id.as_str()),
        };
        let form = EventForm::from_record(record, tz);

        StoredRow {
            id: Some(id),
            name: Some(record.name.clone()),
            location: record.location.clone(),
            description: record.description.clone(),
            date: record.occurs_at.map(|_| form.date),
            time: record.occurs_at.map(|_| form.time),
            timestamp: record
                .occurs_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    fn into_record(self, tz: Tz) -> Option<EventRecord> {
        let id = self.id.as_ref().and_then(id_from_value)?;
        let occurs_at = self.occurs_at(tz);
        if occurs_at.is_none() {
            warn!(%id, "stored event has no usable date; it will not match date filters");
        }

        Some(EventRecord {
            id,
            name: self.name.unwrap_or_default(),
            location: self.location,
            description: self.description,
            occurs_at,
        })
    }

    /// `timestamp` wins; then `date` as a full instant; then `date` + `time`;
    /// then `date` alone as the start of that day.
    fn occurs_at(&self, tz: Tz) -> Option<DateTime<Utc>> {
        if let Some(at) = self.timestamp.as_deref().and_then(|t| parse_instant(t, tz)) {
            return Some(at);
        }

        let date = self.date.as_deref()?;
        if date.contains('T') {
            if let Some(at) = parse_instant(date, tz) {
                return Some(at);
            }
        }
        if let Some(time) = self.time.as_deref().filter(|t| !t.trim().is_empty()) {
            if let Ok(at) = combine_date_time(date, time, tz) {
                return Some(at);
            }
        }
        parse_instant(date, tz)
    }
}

fn id_from_value(value: &Value) -> Option<EventId> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .map(EventId::from),
        Value::String(s) if !s.trim().is_empty() => Some(EventId::from(s.trim())),
        _ => None,
    }
}

fn row_id(row: &Value) -> Option<EventId> {
    row.get("id").and_then(id_from_value)
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>, collection: impl Into<String>, tz: Tz) -> Self {
        let changes = Publisher::new(Vec::new());
        LocalStore {
            dir: dir.into(),
            collection: collection.into(),
            tz,
            lock: Mutex::new(()),
            changes,
        }
    }

    pub fn blob_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.collection))
    }

    fn last_id_path(&self) -> PathBuf {
        self.dir.join(format!("{}.last_id", self.collection))
    }

    async fn read_rows(&self) -> DashResult<Vec<Value>> {
        let path = self.blob_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            DashError::Serialization(format!("{} is not an event list: {e}", path.display()))
        })
    }

    async fn write_rows(&self, rows: &[Value]) -> DashResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let content = serde_json::to_string_pretty(rows)
            .map_err(|e| DashError::Serialization(e.to_string()))?;
        let path = self.blob_path();
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), rows = rows.len(), "wrote event blob");
        Ok(())
    }

    fn records_from(&self, rows: &[Value]) -> Vec<EventRecord> {
        rows.iter()
            .filter_map(|row| match serde_json::from_value::<StoredRow>(row.clone()) {
                Ok(stored) => stored.into_record(self.tz),
                Err(e) => {
                    warn!(error = %e, "skipping malformed stored event");
                    None
                }
            })
            .collect()
    }

    fn encode(&self, record: &EventRecord) -> DashResult<Value> {
        serde_json::to_value(StoredRow::from_record(record, self.tz))
            .map_err(|e| DashError::Serialization(e.to_string()))
    }

    /// Millisecond timestamp, bumped past every id ever handed out.
    async fn next_id(&self, rows: &[Value]) -> DashResult<u64> {
        let last_path = self.last_id_path();
        let last_issued = read_last_id(&last_path).await?;
        let highest_present = rows
            .iter()
            .filter_map(row_id)
            .filter_map(|id| id.as_number())
            .max()
            .unwrap_or(0);

        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let id = now.max(last_issued + 1).max(highest_present + 1);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&last_path, id.to_string()).await?;
        Ok(id)
    }

    fn publish(&self, rows: &[Value]) {
        self.changes.publish(self.records_from(rows));
    }
}

async fn read_last_id(path: &Path) -> DashResult<u64> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content.trim().parse().unwrap_or(0)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl EventStore for LocalStore {
    fn medium(&self) -> &'static str {
        "local"
    }

    async fn load_all(&self) -> DashResult<Vec<EventRecord>> {
        let rows = self.read_rows().await?;
        Ok(self.records_from(&rows))
    }

    async fn create(&self, draft: EventDraft) -> DashResult<EventRecord> {
        let draft = draft.validate()?;
        let _guard = self.lock.lock().await;

        let mut rows = self.read_rows().await?;
        let id = EventId::from(self.next_id(&rows).await?);
        let record = EventRecord::from_draft(id, draft);

        rows.push(self.encode(&record)?);
        self.write_rows(&rows).await?;
        self.publish(&rows);

        info!(id = %record.id, name = %record.name, "created event");
        Ok(record)
    }

    async fn update(&self, id: &EventId, draft: EventDraft) -> DashResult<EventRecord> {
        let draft = draft.validate()?;
        let _guard = self.lock.lock().await;

        let mut rows = self.read_rows().await?;
        let slot = rows
            .iter_mut()
            .find(|row| row_id(row).as_ref() == Some(id))
            .ok_or_else(|| DashError::NotFound(id.clone()))?;

        let record = EventRecord::from_draft(id.clone(), draft);
        *slot = self.encode(&record)?;
        self.write_rows(&rows).await?;
        self.publish(&rows);

        info!(%id, "updated event");
        Ok(record)
    }

    async fn delete(&self, id: &EventId) -> DashResult<()> {
        let _guard = self.lock.lock().await;

        let mut rows = self.read_rows().await?;
        let before = rows.len();
        rows.retain(|row| row_id(row).as_ref() != Some(id));

        if rows.len() == before {
            debug!(%id, "delete of absent event ignored");
            return Ok(());
        }

        self.write_rows(&rows).await?;
        self.publish(&rows);

        info!(%id, "deleted event");
        Ok(())
    }

    /// Changes made through this store instance. Writes by other processes
    /// show up on the next `load_all`.
    fn subscribe(&self) -> Option<Subscription> {
        Some(self.changes.subscribe())
    }
}

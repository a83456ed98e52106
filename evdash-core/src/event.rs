//! Event records and their normalization.
//!
//! The canonical record carries one absolute instant (`occurs_at`). The split
//! date + time representation used by entry forms only exists at the
//! presentation boundary, see [`EventForm`].

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{DashError, DashResult};

/// Opaque identifier assigned by the store when a record is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        EventId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form, for stores whose ids are millisecond timestamps.
    pub fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        EventId(id.to_string())
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        EventId(id)
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        EventId(id.to_string())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored event.
///
/// `occurs_at` is only ever `None` for legacy rows whose date fields could not
/// be turned into an instant; such rows are listed but never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occurs_at: Option<DateTime<Utc>>,
}

impl EventRecord {
    pub fn from_draft(id: EventId, draft: EventDraft) -> Self {
        EventRecord {
            id,
            name: draft.name,
            location: draft.location,
            description: draft.description,
            occurs_at: draft.occurs_at,
        }
    }

    /// The mutable fields of this record, e.g. to prefill an edit.
    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            name: self.name.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            occurs_at: self.occurs_at,
        }
    }
}

/// Every mutable field of an event. Used for both create and full-replace update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventDraft {
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occurs_at: Option<DateTime<Utc>>,
}

impl EventDraft {
    pub fn new(name: impl Into<String>, occurs_at: DateTime<Utc>) -> Self {
        EventDraft {
            name: name.into(),
            occurs_at: Some(occurs_at),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the persistence invariants and normalize blank optional fields.
    pub fn validate(self) -> DashResult<Self> {
        if self.name.trim().is_empty() {
            return Err(DashError::Validation("event name is required".into()));
        }
        if self.occurs_at.is_none() {
            return Err(DashError::Validation(
                "event date and time are required".into(),
            ));
        }

        Ok(EventDraft {
            location: non_blank(self.location),
            description: non_blank(self.description),
            ..self
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Split date + time fields, as typed into an entry form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventForm {
    pub name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM` or `HH:MM:SS`
    pub time: String,
    pub location: String,
    pub description: String,
}

impl EventForm {
    pub fn from_record(record: &EventRecord, tz: Tz) -> Self {
        let (date, time) = match record.occurs_at {
            Some(at) => {
                let local = at.with_timezone(&tz);
                (
                    local.format("%Y-%m-%d").to_string(),
                    local.format("%H:%M").to_string(),
                )
            }
            None => (String::new(), String::new()),
        };

        EventForm {
            name: record.name.clone(),
            date,
            time,
            location: record.location.clone().unwrap_or_default(),
            description: record.description.clone().unwrap_or_default(),
        }
    }

    /// Combine the date and time fields into one instant in `tz`.
    pub fn into_draft(self, tz: Tz) -> DashResult<EventDraft> {
        let occurs_at = combine_date_time(&self.date, &self.time, tz)?;

        EventDraft {
            name: self.name,
            location: Some(self.location),
            description: Some(self.description),
            occurs_at: Some(occurs_at),
        }
        .validate()
    }
}

/// Combine a `YYYY-MM-DD` date and an `HH:MM[:SS]` time, read in `tz`.
pub fn combine_date_time(date: &str, time: &str, tz: Tz) -> DashResult<DateTime<Utc>> {
    let (date, time) = (date.trim(), time.trim());
    if date.is_empty() || time.is_empty() {
        return Err(DashError::Validation(
            "event date and time are required".into(),
        ));
    }

    let date = parse_date(date).ok_or_else(|| {
        DashError::Validation(format!("invalid date '{date}', expected YYYY-MM-DD"))
    })?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .map_err(|_| DashError::Validation(format!("invalid time '{time}', expected HH:MM")))?;

    localize(date.and_time(time), tz).ok_or_else(|| {
        DashError::Validation(format!("{date} {time} does not exist in {tz}"))
    })
}

/// Parse any of the instant spellings found in stored records.
///
/// Accepts RFC 3339 with an offset, a naive `YYYY-MM-DDTHH:MM[:SS]` (read in
/// `tz`) and a bare `YYYY-MM-DD` (start of that day in `tz`).
pub fn parse_instant(value: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    const FORMATS: [&str; 4] =
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return localize(naive, tz);
        }
    }

    parse_date(value)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| localize(naive, tz))
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Wall-clock time in `tz` to UTC. Ambiguous times resolve to the earlier
/// instant; times skipped by a DST jump have no instant.
pub(crate) fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Newest `occurs_at` first; records without an instant go last.
pub fn sort_newest_first(events: &mut [EventRecord]) {
    events.sort_by(|a, b| {
        let by_time = match (a.occurs_at, b.occurs_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_time.then_with(|| a.id.cmp(&b.id))
    });
}

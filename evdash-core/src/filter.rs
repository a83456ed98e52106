//! Filtering of the loaded event set.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::{DashError, DashResult};
use crate::event::{EventRecord, localize, parse_date};

/// Inclusive date range on `occurs_at`.
/// None values mean unbounded in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        DateRange {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Parse filter-bar dates into a range of whole days in `tz`.
    /// - `from`: YYYY-MM-DD, start of that day
    /// - `to`: YYYY-MM-DD, last instant of that day
    ///
    /// Returns `None` when neither side is given.
    pub fn from_args(from: Option<&str>, to: Option<&str>, tz: Tz) -> DashResult<Option<Self>> {
        let from = nonempty(from).map(|s| parse_day_start(s, tz)).transpose()?;
        let to = nonempty(to).map(|s| parse_day_end(s, tz)).transpose()?;

        if from.is_none() && to.is_none() {
            return Ok(None);
        }
        Ok(Some(DateRange { from, to }))
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

fn nonempty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse YYYY-MM-DD as start of day in `tz`
fn parse_day_start(s: &str, tz: Tz) -> DashResult<DateTime<Utc>> {
    let date = parse_date(s).ok_or_else(|| invalid_date(s))?;
    date.and_hms_opt(0, 0, 0)
        .and_then(|naive| localize(naive, tz))
        .ok_or_else(|| invalid_date(s))
}

/// Parse YYYY-MM-DD as the last instant of that day in `tz`
fn parse_day_end(s: &str, tz: Tz) -> DashResult<DateTime<Utc>> {
    let date = parse_date(s).ok_or_else(|| invalid_date(s))?;
    let next = date.succ_opt().ok_or_else(|| invalid_date(s))?;
    next.and_hms_opt(0, 0, 0)
        .and_then(|naive| localize(naive, tz))
        .map(|start_of_next| start_of_next - Duration::milliseconds(1))
        .ok_or_else(|| invalid_date(s))
}

fn invalid_date(s: &str) -> DashError {
    DashError::Validation(format!("Invalid date format '{s}'. Expected YYYY-MM-DD"))
}

/// What the list view is currently narrowed to. Empty fields constrain nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSpec {
    /// Case-insensitive substring of the event name.
    pub search: String,
    /// Case-insensitive substring of the event location.
    pub location: String,
    pub date_range: Option<DateRange>,
}

impl FilterSpec {
    /// Build a spec from raw filter-bar inputs; text is trimmed.
    pub fn from_inputs(
        search: Option<&str>,
        location: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
        tz: Tz,
    ) -> DashResult<Self> {
        Ok(FilterSpec {
            search: search.unwrap_or_default().trim().to_string(),
            location: location.unwrap_or_default().trim().to_string(),
            date_range: DateRange::from_args(from, to, tz)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.location.is_empty() && self.active_range().is_none()
    }

    fn active_range(&self) -> Option<&DateRange> {
        self.date_range.as_ref().filter(|r| !r.is_unbounded())
    }

    pub fn matches(&self, event: &EventRecord) -> bool {
        if !self.search.is_empty() && !contains_ignore_case(&event.name, &self.search) {
            return false;
        }

        if !self.location.is_empty() {
            let location = event.location.as_deref().unwrap_or_default();
            if !contains_ignore_case(location, &self.location) {
                return false;
            }
        }

        match (self.active_range(), event.occurs_at) {
            (None, _) => true,
            (Some(range), Some(at)) => range.contains(at),
            // An undated event can't satisfy a date constraint
            (Some(_), None) => false,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// The events matching `spec`, in their original order.
pub fn apply_filter(events: &[EventRecord], spec: &FilterSpec) -> Vec<EventRecord> {
    events.iter().filter(|e| spec.matches(e)).cloned().collect()
}

//! Terminal rendering for dashboard types.
//!
//! Times are shown in the configured zone, so every renderer takes it.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use evdash_core::{ErrorKind, EventRecord, Failure};
use owo_colors::OwoColorize;

/// Extension trait for colored terminal rendering in a time zone.
pub trait Render {
    fn render(&self, tz: Tz) -> String;
}

impl Render for EventRecord {
    /// One list row: time, name, location and id.
    fn render(&self, tz: Tz) -> String {
        let time = match self.occurs_at {
            Some(at) => format!("{:>7}", at.with_timezone(&tz).format("%H:%M")),
            None => format!("{:>7}", "--:--"),
        };
        let location = match &self.location {
            Some(location) => format!(" @ {location}"),
            None => String::new(),
        };
        let id = format!("#{}", self.id);

        format!("  {} {}{} {}", time, self.name.bold(), location.dimmed(), id.dimmed())
    }
}

/// Every field of one event, for `show` and confirmation prompts.
pub fn render_details(event: &EventRecord, tz: Tz) -> String {
    let mut lines = vec![format!("{}", event.name.bold())];

    let when = match event.occurs_at {
        Some(at) => at.with_timezone(&tz).format("%A %-d %B %Y, %H:%M %Z").to_string(),
        None => "no date".dimmed().to_string(),
    };
    lines.push(format!("  {}  {}", "When".dimmed(), when));

    if let Some(location) = &event.location {
        lines.push(format!("  {} {}", "Where".dimmed(), location));
    }
    if let Some(description) = &event.description {
        lines.push(String::new());
        lines.extend(description.lines().map(|l| format!("  {l}")));
    }
    lines.push(format!("  {}", format!("#{}", event.id).dimmed()));

    lines.join("\n")
}

/// Events grouped under day headings. Expects newest-first input.
pub fn render_list(events: &[EventRecord], tz: Tz) -> String {
    let mut lines = Vec::new();
    let mut current_day: Option<String> = None;

    for event in events {
        let label = day_label(event.occurs_at, tz);
        if current_day.as_ref() != Some(&label) {
            if current_day.is_some() {
                lines.push(String::new());
            }
            lines.push(format!("{}", label.bold()));
            current_day = Some(label);
        }
        lines.push(event.render(tz));
    }

    lines.join("\n")
}

/// "Today", "Tomorrow", "Yesterday", or e.g. "Wed Feb 25 2026".
fn day_label(at: Option<DateTime<Utc>>, tz: Tz) -> String {
    let Some(at) = at else {
        return "Undated".to_string();
    };

    let today = Utc::now().with_timezone(&tz).date_naive();
    let date = at.with_timezone(&tz).date_naive();

    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => date.format("%a %b %-d %Y").to_string(),
    }
}

/// A failed intent, colored by what went wrong.
pub fn render_failure(failure: &Failure) -> String {
    match failure.kind {
        ErrorKind::Validation => failure.message.yellow().to_string(),
        ErrorKind::NotFound | ErrorKind::Usage => failure.message.red().to_string(),
        ErrorKind::Persistence => {
            format!("{} (nothing was changed)", failure.message).red().to_string()
        }
    }
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

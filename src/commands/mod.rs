pub mod delete;
pub mod edit;
pub mod list;
pub mod new;
pub mod show;
pub mod watch;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use dialoguer::Input;
use evdash_core::{Dashboard, EventDraft, EventForm};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Event fields given on the command line.
pub struct FormArgs {
    pub name: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl FormArgs {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.location.is_none()
            && self.description.is_none()
    }

    /// Overwrite the fields of `form` that were given.
    pub fn apply_to(self, form: &mut EventForm) {
        let fields = [
            (self.name, &mut form.name),
            (self.date, &mut form.date),
            (self.time, &mut form.time),
            (self.location, &mut form.location),
            (self.description, &mut form.description),
        ];
        for (given, field) in fields {
            if let Some(value) = given {
                *field = value;
            }
        }
    }
}

/// Load the store's events into the dashboard behind a spinner.
pub async fn load(dash: &Dashboard) -> Result<()> {
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.dim} {msg}") {
        progress.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    progress.set_message(format!("Loading {} events...", dash.medium()));
    progress.enable_steady_tick(Duration::from_millis(100));

    let result = dash.load().await;
    progress.finish_and_clear();

    result.context("Could not load events")
}

/// Ask for every field of `form`, offering the current values as defaults,
/// until they make a valid event.
pub fn prompt_form(mut form: EventForm, tz: Tz) -> Result<EventDraft> {
    form.name = prompt_text("  Name", &form.name)?;

    loop {
        form.date = prompt_text("  Date (YYYY-MM-DD)", &form.date)?;
        form.time = prompt_text("  Time (HH:MM)", &form.time)?;
        match evdash_core::event::combine_date_time(&form.date, &form.time, tz) {
            Ok(_) => break,
            Err(e) => eprintln!("  {}", e.to_string().red()),
        }
    }

    form.location = prompt_text("  Where? (skip)", &form.location)?;
    form.description = prompt_text("  Notes (skip)", &form.description)?;

    Ok(form.into_draft(tz)?)
}

fn prompt_text(prompt: &str, current: &str) -> Result<String> {
    let input = Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .default(current.to_string())
        .show_default(!current.is_empty())
        .interact_text()?;
    Ok(input.trim().to_string())
}

use anyhow::Result;
use chrono_tz::Tz;
use evdash_core::{Dashboard, EventForm};
use owo_colors::OwoColorize;

use super::FormArgs;
use crate::render::{render_details, render_failure};

pub async fn run(dash: &Dashboard, fields: FormArgs, tz: Tz) -> Result<()> {
    let interactive = fields.name.is_none() || fields.date.is_none() || fields.time.is_none();

    dash.create_new()?;

    let mut form = EventForm::default();
    fields.apply_to(&mut form);

    let draft = if interactive {
        super::prompt_form(form, tz)?
    } else {
        form.into_draft(tz)?
    };

    if let Err(e) = dash.save(draft).await {
        if let Some(failure) = dash.last_error() {
            eprintln!("  {}", render_failure(&failure));
        }
        return Err(e.into());
    }

    if interactive {
        println!();
    }
    if let Some(event) = dash.current() {
        println!("{}", "  Created".green());
        println!("{}", render_details(&event, tz));
    }

    Ok(())
}

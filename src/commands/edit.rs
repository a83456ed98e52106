use anyhow::Result;
use chrono_tz::Tz;
use dialoguer::Confirm;
use evdash_core::{Dashboard, EventForm, EventId};
use owo_colors::OwoColorize;

use super::FormArgs;
use crate::render::{render_details, render_failure};

pub async fn run(dash: &Dashboard, id: &EventId, fields: FormArgs, tz: Tz) -> Result<()> {
    super::load(dash).await?;
    dash.select(id)?;
    dash.request_edit()?;

    let Some(event) = dash.current() else {
        anyhow::bail!("Event {id} disappeared while loading");
    };

    let interactive = fields.is_empty();

    // With explicit fields the command line already is the confirmation
    if interactive {
        println!("{}", render_details(&event, tz));
        println!();
        let confirmed = Confirm::new()
            .with_prompt(format!("Edit \"{}\"?", event.name))
            .default(true)
            .interact()?;

        if !confirmed {
            dash.cancel()?;
            return Ok(());
        }
    }
    dash.confirm().await?;

    let mut form = EventForm::from_record(&event, tz);
    let draft = if interactive {
        super::prompt_form(form, tz)?
    } else {
        fields.apply_to(&mut form);
        form.into_draft(tz)?
    };

    if let Err(e) = dash.save(draft).await {
        if let Some(failure) = dash.last_error() {
            eprintln!("  {}", render_failure(&failure));
        }
        return Err(e.into());
    }

    if let Some(event) = dash.current() {
        println!("{}", "  Updated".green());
        println!("{}", render_details(&event, tz));
    }

    Ok(())
}

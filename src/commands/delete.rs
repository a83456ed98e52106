use anyhow::Result;
use chrono_tz::Tz;
use dialoguer::Confirm;
use evdash_core::{Dashboard, EventId};
use owo_colors::OwoColorize;

use crate::render::{render_details, render_failure};

pub async fn run(dash: &Dashboard, id: &EventId, yes: bool, tz: Tz) -> Result<()> {
    super::load(dash).await?;
    dash.select(id)?;
    dash.request_delete()?;

    let Some(event) = dash.current() else {
        anyhow::bail!("Event {id} disappeared while loading");
    };

    // Confirm unless --yes
    if !yes {
        println!("{}", render_details(&event, tz));
        println!();
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete \"{}\"?", event.name))
            .default(false)
            .interact()?;

        if !confirmed {
            dash.cancel()?;
            return Ok(());
        }
    }

    if let Err(e) = dash.confirm().await {
        if let Some(failure) = dash.last_error() {
            eprintln!("  {}", render_failure(&failure));
        }
        return Err(e.into());
    }

    println!("{}", format!("  Deleted: {}", event.name).red());
    Ok(())
}

use anyhow::Result;
use chrono_tz::Tz;
use evdash_core::{Dashboard, EventId};

use crate::render::render_details;

pub async fn run(dash: &Dashboard, id: &EventId, tz: Tz) -> Result<()> {
    super::load(dash).await?;
    dash.select(id)?;

    if let Some(event) = dash.current() {
        println!("{}", render_details(&event, tz));
    }

    Ok(())
}

use anyhow::Result;
use chrono_tz::Tz;
use evdash_core::{Dashboard, FilterSpec};
use owo_colors::OwoColorize;

use crate::render::{pluralize, render_list};

pub async fn run(dash: &Dashboard, filter: FilterSpec, tz: Tz) -> Result<()> {
    super::load(dash).await?;
    dash.set_filter(filter);

    print_visible(dash, tz);
    Ok(())
}

/// The filtered list, or a note when nothing matches.
pub fn print_visible(dash: &Dashboard, tz: Tz) {
    let visible = dash.visible();
    let total = dash.events().len();

    if visible.is_empty() {
        if total == 0 {
            println!("{}", "No events yet. Create one with `evdash new`".dimmed());
        } else {
            println!("{}", format!("No events match ({total} hidden by the filter)").dimmed());
        }
        return;
    }

    println!("{}", render_list(&visible, tz));

    let hidden = total - visible.len();
    if hidden > 0 {
        println!();
        println!(
            "{}",
            format!("{} {} hidden by the filter", hidden, pluralize("event", hidden)).dimmed()
        );
    }
}

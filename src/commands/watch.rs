use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use evdash_core::{Dashboard, DashboardConfig, FilterSpec, StoreConfig};
use owo_colors::OwoColorize;
use tracing::debug;

use super::list::print_visible;

/// How often to re-read stores whose changes made by other processes are
/// not pushed to us.
const RELOAD_INTERVAL: Duration = Duration::from_secs(2);

pub async fn run(
    dash: &Dashboard,
    filter: FilterSpec,
    config: &DashboardConfig,
    tz: Tz,
) -> Result<()> {
    super::load(dash).await?;
    dash.set_filter(filter);
    redraw(dash, tz);

    // The remote poller already re-reads the collection on its own schedule
    let pushes_everything = matches!(config.store, StoreConfig::Remote(_) | StoreConfig::Memory);
    let watching = dash.watch().await;
    let reload_every = match &config.store {
        StoreConfig::Remote(remote) => remote.poll_interval(),
        _ => RELOAD_INTERVAL,
    };

    loop {
        let before = dash.visible();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = next_change(dash, watching, pushes_everything, reload_every) => changed?,
        }

        if dash.visible() != before {
            redraw(dash, tz);
        }
    }

    Ok(())
}

/// Wait for a pushed change, falling back to a reload when nothing arrives
/// within `interval` and the store cannot push every change.
async fn next_change(
    dash: &Dashboard,
    watching: bool,
    pushes_everything: bool,
    interval: Duration,
) -> Result<()> {
    if watching && pushes_everything {
        dash.next_change().await?;
        return Ok(());
    }

    if watching {
        if let Ok(changed) = tokio::time::timeout(interval, dash.next_change()).await {
            changed?;
            return Ok(());
        }
    } else {
        tokio::time::sleep(interval).await;
    }

    debug!(medium = dash.medium(), "reloading events");
    dash.load().await?;
    Ok(())
}

fn redraw(dash: &Dashboard, tz: Tz) {
    let now = Utc::now().with_timezone(&tz).format("%H:%M:%S");
    println!();
    println!("{}", format!("-- {} events, updated {} --", dash.medium(), now).dimmed());
    print_visible(dash, tz);
}

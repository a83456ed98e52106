mod commands;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use evdash_core::{Dashboard, DashboardConfig, EventId, FilterSpec};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "evdash")]
#[command(about = "Browse, filter and manage your events from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Only events whose name contains this text
    #[arg(short, long)]
    search: Option<String>,

    /// Only events whose location contains this text
    #[arg(short, long)]
    location: Option<String>,

    /// Only events on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Only events on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List events, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show one event in full
    Show { id: String },
    /// Create an event (prompts for anything not given)
    New {
        name: Option<String>,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Time (HH:MM)
        #[arg(short, long)]
        time: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },
    /// Change an event (prompts for every field if none is given)
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Time (HH:MM)
        #[arg(short, long)]
        time: Option<String>,

        /// New location (empty to clear)
        #[arg(short, long)]
        location: Option<String>,

        /// New description (empty to clear)
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete an event
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Keep the list on screen and redraw it when events change
    Watch {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = DashboardConfig::load().context("Could not load configuration")?;
    let tz = config.timezone()?;
    let store = config.open_store().await.context("Could not open event store")?;
    let dash = Dashboard::new(store);

    match cli.command {
        Commands::List { filter } => {
            let filter = filter_spec(&filter, tz)?;
            commands::list::run(&dash, filter, tz).await
        }
        Commands::Show { id } => commands::show::run(&dash, &EventId::from(id), tz).await,
        Commands::New {
            name,
            date,
            time,
            location,
            description,
        } => {
            let fields = commands::FormArgs {
                name,
                date,
                time,
                location,
                description,
            };
            commands::new::run(&dash, fields, tz).await
        }
        Commands::Edit {
            id,
            name,
            date,
            time,
            location,
            description,
        } => {
            let fields = commands::FormArgs {
                name,
                date,
                time,
                location,
                description,
            };
            commands::edit::run(&dash, &EventId::from(id), fields, tz).await
        }
        Commands::Delete { id, yes } => {
            commands::delete::run(&dash, &EventId::from(id), yes, tz).await
        }
        Commands::Watch { filter } => {
            let filter = filter_spec(&filter, tz)?;
            commands::watch::run(&dash, filter, &config, tz).await
        }
    }
}

fn filter_spec(args: &FilterArgs, tz: chrono_tz::Tz) -> Result<FilterSpec> {
    Ok(FilterSpec::from_inputs(
        args.search.as_deref(),
        args.location.as_deref(),
        args.from.as_deref(),
        args.to.as_deref(),
        tz,
    )?)
}

/// Diagnostics go to stderr, filtered by `EVDASH_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("EVDASH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

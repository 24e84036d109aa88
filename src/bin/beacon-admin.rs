use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use beacon::config::{Config, StoreBackend};
use beacon::models::AccessEvent;
use beacon::query::QueryEngine;
use beacon::store::{EventStore, FileStore, SqliteStore};

#[derive(Parser)]
#[command(name = "beacon-admin")]
#[command(about = "Beacon log inspection CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show aggregate statistics
    Stats,
    /// Show the most recent events
    Last {
        /// How many events to show
        #[arg(default_value_t = 10)]
        n: usize,
    },
    /// Search events by exact IP
    Ip { addr: String },
    /// Search events by city (case-insensitive substring)
    City { query: String },
    /// Search events by country (case-insensitive substring)
    Country { query: String },
    /// Issue a new tracking link
    Issue { label: String },
    /// List issued tracking links
    Links,
}

fn print_event(event: &AccessEvent) {
    let ts = event
        .timestamp
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    let place = match (event.geo.city.as_deref(), event.geo.country.as_deref()) {
        (Some(city), Some(country)) => format!("{city}, {country}"),
        (Some(city), None) => city.to_string(),
        (None, Some(country)) => country.to_string(),
        (None, None) => "unknown location".to_string(),
    };
    let target = event
        .code
        .as_deref()
        .map(|code| format!("code {code}"))
        .or_else(|| event.path.as_deref().map(|path| format!("/{path}")))
        .unwrap_or_else(|| "-".to_string());
    println!("{ts}  {}  {place}  [{target}]  {}", event.ip, event.ua);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let store: Arc<dyn EventStore> = match config.store.backend {
        StoreBackend::File => Arc::new(FileStore::new(&config.store.data_dir)),
        StoreBackend::Sqlite => Arc::new(
            SqliteStore::new(&config.store.database_url, config.store.max_connections).await?,
        ),
    };
    store.init().await?;

    let queries = QueryEngine::new(Arc::clone(&store));

    match cli.command {
        Commands::Stats => {
            let stats = queries.stats().await?;
            println!("Total events:     {}", stats.total);
            println!("Unique IPs:       {}", stats.unique_ips);
            println!("Unique cities:    {}", stats.unique_cities);
            println!("Unique countries: {}", stats.unique_countries);
            if let Some(first) = stats.first_seen {
                println!("First event:      {}", first.to_rfc3339());
            }
            if let Some(last) = stats.last_seen {
                println!("Last event:       {}", last.to_rfc3339());
            }
        }
        Commands::Last { n } => {
            for event in queries.last_n(n).await? {
                print_event(&event);
            }
        }
        Commands::Ip { addr } => {
            let events = queries.by_ip(&addr).await?;
            println!("{} event(s) for {}", events.len(), addr);
            for event in events {
                print_event(&event);
            }
        }
        Commands::City { query } => {
            let events = queries.by_city(&query).await?;
            println!("{} event(s) matching city '{}'", events.len(), query);
            for event in events {
                print_event(&event);
            }
        }
        Commands::Country { query } => {
            let events = queries.by_country(&query).await?;
            println!("{} event(s) matching country '{}'", events.len(), query);
            for event in events {
                print_event(&event);
            }
        }
        Commands::Issue { label } => {
            let link = beacon::links::issue(store.as_ref(), &label).await?;
            println!("✓ Issued code '{}' for label '{}'", link.code, link.label);
        }
        Commands::Links => {
            for link in store.list_links().await? {
                println!(
                    "{}  {}  (created {})",
                    link.code,
                    link.label,
                    link.created_at.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}

//! cityclock - temperature and local time for a handful of cities
//!
//! Drives the app-side repository and the widget-side timeline against the
//! shared container from the command line.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cityclock_core::{classify, Config, Coordinate, FreshnessState};
use cityclock_sync::LocationUpdateOutcome;
use uuid::Uuid;

mod app;

use app::App;

#[derive(Parser, Debug)]
#[command(name = "cityclock")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults to the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List tracked cities
    #[command(alias = "ls")]
    List,

    /// Add the city at a coordinate
    Add {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Display name instead of the geocoded one
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove a city by id
    Remove { id: Uuid },

    /// Move cities at the given positions to sit before `to`
    Move {
        #[arg(required = true)]
        from: Vec<usize>,
        #[arg(long)]
        to: usize,
    },

    /// Deliver a significant location change
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Refresh temperatures of stale cities
    Refresh {
        /// Refresh every city, fresh or not
        #[arg(long)]
        all: bool,
    },

    /// Print the widget timeline as JSON
    Timeline,

    /// Let the widget refresh the primary city if it is stale
    WidgetRefresh,

    /// Print a new timeline whenever the app signals a reload
    Watch {
        /// Polling interval in seconds
        #[arg(long, default_value = "2")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    cityclock_core::init()?;

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let (config, _) = Config::load_validated_from(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let app = App::new(config)?;
    let result = run(&app, cli.command).await;
    app.shutdown();
    result
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::List => list(app),
        Commands::Add { lat, lon, name } => {
            let city = app.add_city_at(Coordinate::new(lat, lon), name).await?;
            println!("Added {} ({})", city.name, city.id);
        }
        Commands::Remove { id } => {
            let city = app.repository().remove_city(id)?;
            println!("Removed {}", city.name);
        }
        Commands::Move { from, to } => {
            if app.repository().move_cities(&from, to) {
                list(app);
            } else {
                println!("Order unchanged");
            }
        }
        Commands::Locate { lat, lon } => {
            match app.location_handler().handle(Coordinate::new(lat, lon)).await {
                LocationUpdateOutcome::GeocodeFailed => {
                    println!("Location stored; place could not be resolved");
                }
                LocationUpdateOutcome::Updated {
                    record,
                    weather_refreshed,
                } => {
                    let note = if weather_refreshed { "" } else { " (weather unavailable)" };
                    println!("Current location: {}{}", record.name, note);
                }
                LocationUpdateOutcome::Rejected(rejection) => {
                    println!("{}", rejection.user_message());
                }
            }
        }
        Commands::Refresh { all } => {
            let refresher = app.weather_refresher();
            let summary = if all {
                refresher.refresh_all().await
            } else {
                refresher.refresh_stale().await
            };
            println!(
                "{} refreshed, {} failed, {} skipped",
                summary.refreshed, summary.failed, summary.skipped
            );
        }
        Commands::Timeline => {
            let timeline = app.widget().timeline.build_timeline(app.clock().now());
            println!("{}", serde_json::to_string_pretty(&timeline)?);
        }
        Commands::WidgetRefresh => {
            let outcome = app.widget().refresher.refresh_if_stale(app.clock().now()).await;
            println!("{:?}", outcome);
        }
        Commands::Watch { interval } => {
            let mut widget = app.widget();
            loop {
                widget.watch.wait(Duration::from_secs(interval.max(1))).await;
                let timeline = widget.timeline.build_timeline(app.clock().now());
                println!("{}", serde_json::to_string_pretty(&timeline)?);
            }
        }
    }
    Ok(())
}

fn list(app: &App) {
    let now = app.clock().now();
    let threshold = app.config().freshness.threshold();
    let unit = app.config().weather.temperature_unit.as_query();

    for city in app.repository().cities() {
        let marker = if city.is_primary { "*" } else { " " };
        let temperature = city
            .temperature
            .map(|t| format!("{:.1} {}", t, unit))
            .unwrap_or_else(|| "--".to_string());
        let freshness = match classify(city.last_updated, now, threshold) {
            FreshnessState::Fresh => "fresh",
            FreshnessState::Loading => "loading",
            FreshnessState::Stale => "stale",
            FreshnessState::Unavailable => "unavailable",
        };
        println!(
            "{} {} {:<20} {:<3} {:>16} {:<11} {}",
            city.sort_order,
            marker,
            city.name,
            city.country_code,
            temperature,
            freshness,
            city.id
        );
    }
}

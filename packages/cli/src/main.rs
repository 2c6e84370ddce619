#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Share2Care data pipeline.
//!
//! Builds the static map files the dashboard overlays and runs ad-hoc
//! price forecasts against the configured price table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use share2care_cli_utils::{MultiProgress, StepsBar, init_logger};
use share2care_forecast::registry::all_backends;
use share2care_forecast::{ForecastRequest, backend_availability};
use share2care_forecast_models::{ForecastMethod, Frequency, PriceForecast};
use share2care_pipeline::{
    BuildReport, DATA_DIR_ENV, LogProgress, PipelineConfig, PipelinePaths, ProgressCallback,
    build_admin_counts, build_all, build_ipc_geojson, build_severity_geojson,
    ensure_processed_maps, load_prices,
};

#[derive(Parser)]
#[command(name = "share2care", about = "Share2Care severity maps and price forecasts")]
struct Cli {
    /// Pipeline config file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Base directory that the raw and processed directories resolve against
    #[arg(long, global = true, env = DATA_DIR_ENV, default_value = ".")]
    data_dir: PathBuf,
    /// Log build steps instead of drawing a progress bar
    #[arg(long, global = true)]
    no_progress: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the severity and IPC hazard maps
    BuildAll,
    /// Build the severity-by-region map only
    Severity,
    /// Build the IPC hazard map only
    Ipc,
    /// Write activity counts per admin code (CSV)
    AdminCounts,
    /// Build the maps only if either output is missing
    Ensure,
    /// List commodities and markets in the price table
    Commodities,
    /// Forecast prices for a commodity/market series
    Forecast {
        /// Commodity name (case-insensitive exact match)
        #[arg(long)]
        commodity: Option<String>,
        /// Market name (case-insensitive exact match)
        #[arg(long)]
        market: Option<String>,
        /// Number of future periods
        #[arg(long, default_value_t = share2care_forecast::DEFAULT_PERIODS)]
        periods: usize,
        /// Series frequency (`D`, `W` or `M`)
        #[arg(long, default_value = "D")]
        freq: Frequency,
        /// Preferred backend (`seasonal`, `auto_arima`, `autoregressive`)
        #[arg(long, default_value = "seasonal")]
        method: ForecastMethod,
        /// Write the forecast as JSON to this file instead of printing a table
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List forecasting backends and whether they are available
    Backends,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli, &multi) {
        log::error!("{e}");
        return Err(e);
    }
    Ok(())
}

fn run(cli: Cli, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let paths = config.resolve(&cli.data_dir);
    let progress = || -> Arc<dyn ProgressCallback> {
        if cli.no_progress {
            Arc::new(LogProgress::default())
        } else {
            StepsBar::new(multi)
        }
    };

    match cli.command {
        Commands::BuildAll => {
            let report = build_all(&paths, progress().as_ref())?;
            print_report(&report);
        }
        Commands::Severity => {
            let summary = build_severity_geojson(&paths)?;
            println!(
                "{}: {} regions ({} with a score)",
                summary.path.display(),
                summary.features,
                summary.matched
            );
        }
        Commands::Ipc => {
            let summary = build_ipc_geojson(&paths)?;
            println!("{}: {} areas", summary.path.display(), summary.features);
        }
        Commands::AdminCounts => {
            let counts = build_admin_counts(&paths)?;
            println!(
                "{}: {} admin codes",
                paths.admin_counts.display(),
                counts.len()
            );
        }
        Commands::Ensure => {
            match ensure_processed_maps(&paths, progress().as_ref())? {
                Some(report) => print_report(&report),
                None => println!("Processed maps are up to date"),
            }
        }
        Commands::Commodities => list_commodities(&paths)?,
        Commands::Forecast {
            commodity,
            market,
            periods,
            freq,
            method,
            output,
        } => {
            let request = ForecastRequest {
                commodity,
                market,
                periods,
                frequency: freq,
                method,
            };
            let forecast = share2care_pipeline::forecast(&paths, &request)?;
            if forecast.method != method {
                log::warn!("'{method}' unavailable; forecast produced by '{}'", forecast.method);
            }
            match output {
                Some(path) => write_forecast_json(&forecast, &path)?,
                None => print_forecast(&forecast),
            }
        }
        Commands::Backends => list_backends(),
    }

    Ok(())
}

fn print_report(report: &BuildReport) {
    for summary in [&report.severity, &report.hazard] {
        println!(
            "{:<50} {:>6} features",
            summary.path.display().to_string(),
            summary.features
        );
    }
}

fn list_commodities(paths: &PipelinePaths) -> Result<(), Box<dyn std::error::Error>> {
    let prices = load_prices(paths)?;
    println!("Commodities ({}):", prices.commodities().len());
    for commodity in prices.commodities() {
        println!("  {commodity}");
    }
    println!("Markets ({}):", prices.markets().len());
    for market in prices.markets() {
        println!("  {market}");
    }
    Ok(())
}

fn list_backends() {
    let configs = all_backends();
    println!("{:<16} {:<9} {:<10} NAME", "ID", "PRIORITY", "AVAILABLE");
    println!("{}", "-".repeat(70));
    for (method, available) in backend_availability() {
        let Some(config) = configs.iter().find(|c| c.method() == method) else {
            continue;
        };
        println!(
            "{:<16} {:<9} {:<10} {}",
            config.id,
            config.priority,
            if available { "yes" } else { "no" },
            config.name
        );
    }
}

fn print_forecast(forecast: &PriceForecast) {
    let fmt_bound = |b: Option<f64>| b.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));

    println!(
        "{:<12} {:<9} {:>12} {:>12} {:>12}",
        "DATE", "KIND", "PRICE", "LOWER", "UPPER"
    );
    println!("{}", "-".repeat(61));
    for (i, point) in forecast.points.iter().enumerate() {
        let kind = if i < forecast.observed_points {
            "observed"
        } else {
            "forecast"
        };
        println!(
            "{:<12} {:<9} {:>12.2} {:>12} {:>12}",
            point.date,
            kind,
            point.predicted_price,
            fmt_bound(point.lower_bound),
            fmt_bound(point.upper_bound)
        );
    }
    println!(
        "\n{} ({} observations, {} periods ahead)",
        forecast.method,
        forecast.history.len(),
        forecast.future().len()
    );
}

fn write_forecast_json(
    forecast: &PriceForecast,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(forecast)?)?;
    log::info!(
        "Wrote {} forecast points to {}",
        forecast.points.len(),
        path.display()
    );
    Ok(())
}

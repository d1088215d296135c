//! Great Lakes wave monitor.
//!
//! Downloads wave-model forecasts and buoy observations, draws one
//! forecast-versus-observation chart per station and uploads the charts:
//! - `forecast`: partial GRIB2 download of one model cycle
//! - `buoys`: NDBC realtime files for every station
//! - `plot`: station charts from the downloaded data
//! - `upload`: copy files to the configured object store
//! - `run`: all of the above on the configured schedule

mod download;
mod idx;
mod pipeline;
mod scheduler;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use wave_common::MonitorConfig;

use download::{Downloader, ForecastCycle, ForecastOutcome, REQUEST_TIMEOUT};
use pipeline::PlotOptions;

#[derive(Parser, Debug)]
#[command(name = "wave-monitor")]
#[command(about = "Great Lakes wave forecasts compared against buoy observations")]
struct Args {
    /// Configuration file
    #[arg(long, env = "MONITOR_CONFIG", default_value = "config/monitor.yaml", global = true)]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download one forecast cycle
    Forecast {
        /// Cycle as YYYY-MM-DD/HH (default: current UTC hour)
        #[arg(short = 't', long = "time-str")]
        time_str: Option<String>,
    },
    /// Download observations for every station
    Buoys,
    /// Draw station charts
    Plot {
        /// First day of forecast files, YYYY-MM-DD
        #[arg(short, long)]
        start: Option<NaiveDate>,
        /// Last day of forecast files, YYYY-MM-DD
        #[arg(short, long)]
        end: Option<NaiveDate>,
        /// Forecast reader threads
        #[arg(short = 'n', long = "nproc")]
        nproc: Option<usize>,
    },
    /// Upload files to the object store
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Run the download, plot and upload schedule until interrupted
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);
    if args.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let config = MonitorConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    info!(
        config = %args.config.display(),
        stations = config.stations.len(),
        "Starting wave monitor"
    );

    match args.command {
        Command::Forecast { time_str } => {
            let cycle = match time_str {
                Some(s) => ForecastCycle::parse(&s)?,
                None => ForecastCycle::containing(Utc::now()),
            };
            let downloader = Downloader::new(REQUEST_TIMEOUT)?;
            let outcome = downloader
                .download_forecast(cycle, &config.forecast, &config.paths.data_dir)
                .await?;
            if outcome == ForecastOutcome::NotAvailable {
                info!(date = %cycle.date, hour = cycle.hour, "Forecast cycle not available yet");
            }
        }
        Command::Buoys => {
            let downloader = Downloader::new(REQUEST_TIMEOUT)?;
            downloader
                .download_buoys(&config.stations, &config.observations, &config.paths.data_dir)
                .await?;
        }
        Command::Plot { start, end, nproc } => {
            let options = PlotOptions { start, end, nproc };
            let written = pipeline::plot(&config, options).await?;
            info!(charts = written.len(), dir = %config.paths.plot_dir.display(), "Charts written");
        }
        Command::Upload { files } => {
            let failed = pipeline::upload(&config, &files).await?;
            if failed > 0 {
                bail!("{} of {} uploads failed", failed, files.len());
            }
        }
        Command::Run => {
            let downloader = Downloader::new(REQUEST_TIMEOUT)?;
            scheduler::run_forever(&config, &downloader).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_arguments() {
        let args = Args::try_parse_from([
            "wave-monitor",
            "plot",
            "-s",
            "2020-10-01",
            "-e",
            "2020-10-08",
            "--nproc",
            "8",
        ])
        .unwrap();

        match args.command {
            Command::Plot { start, end, nproc } => {
                assert_eq!(start, NaiveDate::from_ymd_opt(2020, 10, 1));
                assert_eq!(end, NaiveDate::from_ymd_opt(2020, 10, 8));
                assert_eq!(nproc, Some(8));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "wave-monitor",
            "forecast",
            "-t",
            "2020-10-08/07",
            "--config",
            "other.yaml",
            "--json",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("other.yaml"));
        assert!(args.json);
        match args.command {
            Command::Forecast { time_str } => assert_eq!(time_str.as_deref(), Some("2020-10-08/07")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_upload_requires_files() {
        assert!(Args::try_parse_from(["wave-monitor", "upload"]).is_err());
    }
}

//! Plot and upload jobs.
//!
//! A plot pass reads every forecast file in the requested date range, pairs
//! each station with its forecast cells and observations and writes one chart
//! per station to `{plot_dir}/{id}.png`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use grid_locator::build_comparisons;
use renderer::{save_chart, ChartStyle, ChartWindow};
use storage::ImageStore;
use tracing::{debug, info, instrument, warn};
use wave_common::{ForecastRun, MonitorConfig, ObservationSeries};

use crate::download::Downloader;

/// Options of a plot pass.
#[derive(Debug, Clone, Default)]
pub struct PlotOptions {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Forecast reader threads
    pub nproc: Option<usize>,
}

/// Chart window for a plot pass.
///
/// Dates given on the command line mean midnight UTC; without them the
/// window covers the last `history_days` up to `now`.
pub fn plot_window(
    options: &PlotOptions,
    config: &MonitorConfig,
    now: DateTime<Utc>,
) -> ChartWindow {
    let midnight = |d: NaiveDate| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN));
    let start = options
        .start
        .map(midnight)
        .unwrap_or_else(|| now - Duration::days(config.forecast.history_days as i64));
    let end = options.end.map(midnight).unwrap_or(now);

    ChartWindow {
        start,
        end,
        now,
        horizon_hours: config.forecast.horizon_hours,
    }
}

/// Sorted `*.grib2` files below `{data_dir}/{YYYY-MM-DD}` for every day from
/// `start` to `end`. Days without a directory are skipped.
pub fn forecast_files(data_dir: &Path, start: NaiveDate, end: NaiveDate) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for day in start.iter_days().take_while(|d| *d <= end) {
        let dir = data_dir.join(day.format("%Y-%m-%d").to_string());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e).with_context(|| format!("failed to list {}", dir.display())),
        };

        for entry in entries {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "grib2") {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Decode forecast files, dropping the ones that fail. Runs come back oldest
/// first.
pub fn read_runs(files: &[PathBuf], nproc: Option<usize>) -> Vec<ForecastRun> {
    let mut runs: Vec<ForecastRun> = grib2_parser::read_forecast_files(files, nproc)
        .into_iter()
        .filter_map(|(path, result)| match result {
            Ok(run) => Some(run),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable forecast file");
                None
            }
        })
        .collect();

    runs.sort_by_key(|run| run.run_time);
    runs
}

/// Observations of every station that has a readable file in `data_dir`.
pub fn read_observations(config: &MonitorConfig) -> HashMap<String, ObservationSeries> {
    let mut observations = HashMap::new();
    for station in config.stations.stations() {
        match ndbc_parser::read_station_file(&config.paths.data_dir, &station.id) {
            Ok(series) => {
                observations.insert(station.id.clone(), series);
            }
            Err(e) => {
                warn!(station = %station.id, error = %e, "No observations, plotting forecast only");
            }
        }
    }
    observations
}

/// Render every station chart. Returns the written image paths in station
/// order.
pub fn plot_stations(
    config: &MonitorConfig,
    options: &PlotOptions,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>> {
    let window = plot_window(options, config, now);
    let files = forecast_files(
        &config.paths.data_dir,
        window.start.date_naive(),
        window.end.date_naive(),
    )?;
    info!(
        files = files.len(),
        start = %window.start,
        end = %window.end,
        "Reading forecast files"
    );

    let runs = read_runs(&files, options.nproc);
    let observations = read_observations(config);
    let comparisons = build_comparisons(
        &runs,
        &config.stations,
        &observations,
        config.forecast.horizon_hours as usize,
    )?;

    std::fs::create_dir_all(&config.paths.plot_dir).with_context(|| {
        format!("failed to create {}", config.paths.plot_dir.display())
    })?;

    let style = ChartStyle::default();
    let mut written = Vec::with_capacity(comparisons.len());
    for comparison in &comparisons {
        let path = config
            .paths
            .plot_dir
            .join(format!("{}.png", comparison.station.id));
        save_chart(comparison, &window, &style, &path)
            .with_context(|| format!("failed to plot {}", comparison.station.id))?;
        debug!(path = %path.display(), "Wrote chart");
        written.push(path);
    }

    info!(runs = runs.len(), charts = written.len(), "Plot pass complete");
    Ok(written)
}

/// Plot pass on the blocking pool.
pub async fn plot(config: &MonitorConfig, options: PlotOptions) -> Result<Vec<PathBuf>> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || plot_stations(&config, &options, Utc::now()))
        .await
        .context("plot task panicked")?
}

/// Upload files to the configured object store. Returns how many failed.
#[instrument(skip_all, fields(files = files.len()))]
pub async fn upload(config: &MonitorConfig, files: &[PathBuf]) -> Result<usize> {
    let store = ImageStore::from_config(&config.storage)?;
    let results = store.upload_files(files).await;
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    info!(uploaded = results.len() - failed, failed, "Upload complete");
    Ok(failed)
}

/// The `*.png` files in `dir`, sorted.
pub fn chart_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "png"))
        .collect();
    files.sort();
    Ok(files)
}

/// Refresh observations, redraw every chart and upload them.
pub async fn plot_cycle(config: &MonitorConfig, downloader: &Downloader) -> Result<()> {
    downloader
        .download_buoys(&config.stations, &config.observations, &config.paths.data_dir)
        .await?;

    plot(config, PlotOptions::default()).await?;

    let charts = chart_files(&config.paths.plot_dir)?;
    upload(config, &charts).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::grib::build_file;
    use test_utils::{ndbc, temp_dir_with, write_file, Grib2Builder, SAMPLE_CONFIG_YAML};
    use wave_common::Parameter;

    fn config_in(dir: &Path) -> MonitorConfig {
        let mut config = MonitorConfig::from_yaml(SAMPLE_CONFIG_YAML).unwrap();
        config.paths.data_dir = dir.join("data");
        config.paths.plot_dir = dir.join("images");
        config
    }

    fn forecast_file(day: u8, hour: u8) -> Vec<u8> {
        let messages: Vec<Vec<u8>> = Parameter::all()
            .iter()
            .flat_map(|&param| {
                (0..3).map(move |fh| {
                    Grib2Builder::for_parameter(param)
                        .with_reference_time(2020, 10, day, hour)
                        .with_forecast_hour(fh)
                        .build()
                })
            })
            .collect();
        build_file(&messages)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 10, d).unwrap()
    }

    #[test]
    fn test_forecast_files_in_range_sorted() {
        let dir = temp_dir_with(&[
            ("2020-10-07/glwu.grlc_2p5km.t19z.grib2", &b"x"[..]),
            ("2020-10-08/glwu.grlc_2p5km.t07z.grib2", &b"x"[..]),
            ("2020-10-08/glwu.grlc_2p5km.t01z.grib2", &b"x"[..]),
            ("2020-10-08/notes.txt", &b"x"[..]),
            ("2020-10-10/glwu.grlc_2p5km.t07z.grib2", &b"x"[..]),
        ]);

        let files = forecast_files(dir.path(), date(7), date(9)).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "2020-10-07/glwu.grlc_2p5km.t19z.grib2",
                "2020-10-08/glwu.grlc_2p5km.t01z.grib2",
                "2020-10-08/glwu.grlc_2p5km.t07z.grib2",
            ]
        );
    }

    #[test]
    fn test_default_window_covers_history() {
        let config = MonitorConfig::from_yaml(SAMPLE_CONFIG_YAML).unwrap();
        let now = Utc.with_ymd_and_hms(2020, 10, 8, 15, 30, 0).unwrap();

        let window = plot_window(&PlotOptions::default(), &config, now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2020, 10, 3, 15, 30, 0).unwrap());
        assert_eq!(window.end, now);
        assert_eq!(window.horizon_hours, 84);

        let options = PlotOptions {
            start: Some(date(1)),
            end: Some(date(4)),
            nproc: None,
        };
        let window = plot_window(&options, &config, now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2020, 10, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2020, 10, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_unreadable_files_are_skipped_and_runs_sorted() {
        let dir = temp_dir_with(&[
            ("2020-10-08/b.grib2", &forecast_file(8, 7)[..]),
            ("2020-10-08/a.grib2", &forecast_file(8, 19)[..]),
            ("2020-10-08/c.grib2", &b"not a grib file"[..]),
        ]);
        let files = forecast_files(dir.path(), date(8), date(8)).unwrap();
        assert_eq!(files.len(), 3);

        let runs = read_runs(&files, Some(2));
        assert_eq!(runs.len(), 2);
        assert!(runs[0].run_time < runs[1].run_time);
    }

    #[test]
    fn test_plot_writes_one_chart_per_station() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let data = &config.paths.data_dir;
        write_file(data, "2020-10-08/glwu.grlc_2p5km.t07z.grib2", &forecast_file(8, 7));
        write_file(data, "45214.txt", ndbc::BUOY_45214.as_bytes());
        write_file(data, "CHII2.txt", ndbc::CMAN_CHII2.as_bytes());
        write_file(data, "MCYI3.txt", ndbc::NOT_FOUND.as_bytes());

        let options = PlotOptions {
            start: Some(date(7)),
            end: Some(date(8)),
            nproc: None,
        };
        let now = Utc.with_ymd_and_hms(2020, 10, 8, 15, 0, 0).unwrap();
        let written = plot_stations(&config, &options, now).unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["CHII2.png", "MCYI3.png", "KNSW3.png", "MLWW3.png", "45214.png"]
        );
        for path in &written {
            let bytes = std::fs::read(path).unwrap();
            assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        }
        assert_eq!(chart_files(&config.paths.plot_dir).unwrap().len(), 5);
    }

    #[test]
    fn test_plot_without_forecasts_still_draws() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_file(&config.paths.data_dir, "45214.txt", ndbc::BUOY_45214.as_bytes());

        let now = Utc.with_ymd_and_hms(2020, 10, 8, 15, 0, 0).unwrap();
        let written = plot_stations(&config, &PlotOptions::default(), now).unwrap();
        assert_eq!(written.len(), 5);
    }

    #[tokio::test]
    async fn test_upload_to_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.storage.bucket = dir.path().join("bucket").display().to_string();
        config.storage.prefix = "images".to_string();

        write_file(&config.paths.plot_dir, "45214.png", b"png bytes");
        let mut files = chart_files(&config.paths.plot_dir).unwrap();
        files.push(config.paths.plot_dir.join("missing.png"));

        let failed = upload(&config, &files).await.unwrap();
        assert_eq!(failed, 1);
        assert_eq!(
            std::fs::read(dir.path().join("bucket/images/45214.png")).unwrap(),
            b"png bytes"
        );
    }
}

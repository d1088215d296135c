//! Forecast and buoy downloads.
//!
//! Forecast files are fetched partially: the `.idx` inventory names the
//! byte offset of every record, and only the records of the configured
//! variables are requested with HTTP Range headers. Bytes are appended to a
//! `.partial` file which is renamed once every range has arrived.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use futures::StreamExt;
use reqwest::{header, Client, Response, StatusCode};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use wave_common::config::{ForecastConfig, ObservationConfig};
use wave_common::StationRegistry;

use crate::idx::{parse_inventory, select_ranges, ByteRange};

/// Timeout for one HTTP request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Files smaller than this are treated as failed downloads.
pub const MIN_COMPLETE_BYTES: u64 = 10;

/// One model cycle: run date and hour (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastCycle {
    pub date: NaiveDate,
    pub hour: u32,
}

impl ForecastCycle {
    /// Parse `YYYY-MM-DD/HH`.
    pub fn parse(value: &str) -> Result<Self> {
        let (date, hour) = value
            .trim()
            .split_once('/')
            .ok_or_else(|| anyhow!("expected YYYY-MM-DD/HH, got '{}'", value))?;

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid cycle date '{}'", date))?;
        let hour: u32 = hour
            .parse()
            .with_context(|| format!("invalid cycle hour '{}'", hour))?;
        if hour > 23 {
            bail!("cycle hour out of range: {}", hour);
        }

        Ok(Self { date, hour })
    }

    /// Cycle of the hour containing `time`.
    pub fn containing(time: DateTime<Utc>) -> Self {
        Self {
            date: time.date_naive(),
            hour: time.hour(),
        }
    }

    pub fn run_time(&self) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(self.hour, 0, 0).unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&NaiveDateTime::new(self.date, time))
    }

    pub fn url(&self, config: &ForecastConfig) -> String {
        format!(
            "{}{}/{}",
            config.base_url,
            self.date.format("%Y%m%d"),
            config.file_name(self.hour)
        )
    }

    /// `{data_dir}/{YYYY-MM-DD}/{file}`.
    pub fn local_path(&self, config: &ForecastConfig, data_dir: &Path) -> PathBuf {
        data_dir
            .join(self.date.format("%Y-%m-%d").to_string())
            .join(config.file_name(self.hour))
    }
}

/// Result of a forecast download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    AlreadyPresent(PathBuf),
    /// The inventory is not published yet
    NotAvailable,
}

/// HTTP client for model and buoy files.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch the configured variables of one cycle.
    #[instrument(skip(self, config, data_dir), fields(date = %cycle.date, hour = cycle.hour))]
    pub async fn download_forecast(
        &self,
        cycle: ForecastCycle,
        config: &ForecastConfig,
        data_dir: &Path,
    ) -> Result<ForecastOutcome> {
        let final_path = cycle.local_path(config, data_dir);
        if is_complete(&final_path).await {
            info!(path = %final_path.display(), "File already exists, skipping download");
            return Ok(ForecastOutcome::AlreadyPresent(final_path));
        }

        let url = cycle.url(config);
        let idx_url = format!("{}.idx", url);
        let response = self
            .client
            .get(&idx_url)
            .send()
            .await
            .context("inventory request failed")?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                info!(url = %idx_url, "Forecast not yet available");
                return Ok(ForecastOutcome::NotAvailable);
            }
            status => bail!("inventory request returned {}", status),
        }

        let inventory = response.text().await.context("failed to read inventory")?;
        let records = parse_inventory(&inventory)?;
        let ranges = select_ranges(&records, &config.variables);
        if ranges.is_empty() {
            bail!(
                "none of {:?} listed in {} ({} records)",
                config.variables,
                idx_url,
                records.len()
            );
        }
        debug!(records = records.len(), ranges = ranges.len(), "Parsed inventory");

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_path = partial_path(&final_path);
        // Ranges are appended, so a leftover from an interrupted run must go.
        fs::remove_file(&temp_path).await.ok();

        let mut bytes = 0;
        for range in &ranges {
            bytes += self.fetch_range(&url, range, &temp_path).await?;
        }

        if bytes < MIN_COMPLETE_BYTES {
            fs::remove_file(&temp_path).await.ok();
            bail!("download of {} produced only {} bytes", url, bytes);
        }

        fs::rename(&temp_path, &final_path)
            .await
            .context("Failed to move completed download")?;

        info!(path = %final_path.display(), bytes, "Download completed");
        Ok(ForecastOutcome::Downloaded {
            path: final_path,
            bytes,
        })
    }

    /// Request one byte range and append it to `path`.
    async fn fetch_range(&self, url: &str, range: &ByteRange, path: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .header(header::RANGE, range.header_value())
            .send()
            .await
            .context("HTTP request failed")?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT => {}
            // A server ignoring Range sends the whole file, which is useless
            // once appended to other ranges.
            StatusCode::OK => bail!("server ignored range {}", range.header_value()),
            status => bail!("HTTP error {} for {}", status, range.header_value()),
        }

        let written = stream_to_file(response, path).await?;
        if let Some(expected) = range.len() {
            if written != expected {
                bail!(
                    "range {} returned {} bytes, expected {}",
                    range.header_value(),
                    written,
                    expected
                );
            }
        }
        Ok(written)
    }

    /// Fetch the realtime file of every station into `{data_dir}/{id}.txt`.
    ///
    /// Returns the ids that failed; each failure is logged and the remaining
    /// stations are still fetched.
    pub async fn download_buoys(
        &self,
        registry: &StationRegistry,
        config: &ObservationConfig,
        data_dir: &Path,
    ) -> Result<Vec<String>> {
        fs::create_dir_all(data_dir).await?;

        let mut failed = Vec::new();
        for station in registry.stations() {
            let url = format!("{}{}.txt", config.base_url, station.id);
            let path = ndbc_parser::station_file_path(data_dir, &station.id);

            match self.fetch_whole(&url, &path).await {
                Ok(bytes) => debug!(station = %station.id, bytes, "Fetched buoy data"),
                Err(e) => {
                    warn!(station = %station.id, url = %url, error = %e, "Buoy download failed");
                    failed.push(station.id.clone());
                }
            }
        }

        info!(
            stations = registry.len(),
            failed = failed.len(),
            "Buoy downloads finished"
        );
        Ok(failed)
    }

    /// Download `url` to `path`, replacing it only on success.
    async fn fetch_whole(&self, url: &str, path: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP error: {}", status);
        }

        let temp_path = partial_path(path);
        fs::remove_file(&temp_path).await.ok();
        let bytes = stream_to_file(response, &temp_path).await?;
        fs::rename(&temp_path, path).await?;
        Ok(bytes)
    }
}

/// Stream a response body onto the end of `path`.
async fn stream_to_file(response: Response, path: &Path) -> Result<u64> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .context("Failed to open output file")?;

    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Error reading response chunk")?;
        file.write_all(&chunk)
            .await
            .context("Error writing to file")?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

async fn is_complete(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.len() >= MIN_COMPLETE_BYTES)
        .unwrap_or(false)
}

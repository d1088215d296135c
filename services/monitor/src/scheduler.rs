//! Wall-clock job scheduler.
//!
//! Forecast downloads fire at fixed UTC times each day, the plot cycle at
//! fixed minutes past every hour. The next fire time is computed from the
//! schedule alone so it can be tested without a clock.

use anyhow::Result;
use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use tracing::{error, info, warn};
use wave_common::config::{parse_hh_mm, ScheduleConfig};
use wave_common::MonitorConfig;

use crate::download::{Downloader, ForecastCycle, ForecastOutcome};
use crate::pipeline;

/// Scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    /// Fetch the model cycle of the current hour
    Forecast,
    /// Fetch observations, plot and upload
    PlotCycle,
}

/// Parsed schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// (hour, minute) UTC
    forecast_times: Vec<(u32, u32)>,
    plot_minutes: Vec<u32>,
}

impl Schedule {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let mut forecast_times = config
            .forecast_downloads
            .iter()
            .map(|t| parse_hh_mm(t))
            .collect::<Result<Vec<_>, _>>()?;
        forecast_times.sort_unstable();
        forecast_times.dedup();

        let mut plot_minutes: Vec<u32> = config
            .plot_minutes
            .iter()
            .copied()
            .filter(|&m| m < 60)
            .collect();
        plot_minutes.sort_unstable();
        plot_minutes.dedup();

        Ok(Self {
            forecast_times,
            plot_minutes,
        })
    }

    /// Jobs scheduled at exactly `time` (to the minute).
    fn jobs_at(&self, time: DateTime<Utc>) -> Vec<Job> {
        let mut jobs = Vec::new();
        if self
            .forecast_times
            .contains(&(time.hour(), time.minute()))
        {
            jobs.push(Job::Forecast);
        }
        if self.plot_minutes.contains(&time.minute()) {
            jobs.push(Job::PlotCycle);
        }
        jobs
    }

    /// Earliest fire time strictly after `after`, with every job due then.
    /// `None` when nothing is scheduled.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<(DateTime<Utc>, Vec<Job>)> {
        if self.forecast_times.is_empty() && self.plot_minutes.is_empty() {
            return None;
        }

        let minute = Duration::minutes(1);
        let mut candidate = after.duration_trunc(minute).ok()? + minute;
        // Every job fires at least once a day.
        for _ in 0..=24 * 60 {
            let jobs = self.jobs_at(candidate);
            if !jobs.is_empty() {
                return Some((candidate, jobs));
            }
            candidate += minute;
        }
        None
    }
}

/// Run one scheduled job.
pub async fn run_job(job: Job, config: &MonitorConfig, downloader: &Downloader) -> Result<()> {
    match job {
        Job::Forecast => {
            let cycle = ForecastCycle::containing(Utc::now());
            match downloader
                .download_forecast(cycle, &config.forecast, &config.paths.data_dir)
                .await?
            {
                ForecastOutcome::NotAvailable => info!(
                    date = %cycle.date,
                    hour = cycle.hour,
                    "Cycle not published, waiting for next tick"
                ),
                outcome => info!(?outcome, "Forecast job finished"),
            }
            Ok(())
        }
        Job::PlotCycle => pipeline::plot_cycle(config, downloader).await,
    }
}

/// Run jobs until Ctrl-C.
pub async fn run_forever(config: &MonitorConfig, downloader: &Downloader) -> Result<()> {
    let schedule = Schedule::from_config(&config.schedule)?;

    loop {
        let now = Utc::now();
        let Some((at, jobs)) = schedule.next_after(now) else {
            warn!("Nothing scheduled, exiting");
            return Ok(());
        };
        info!(at = %at, jobs = ?jobs, "Next scheduled run");

        let wait = (at - now).to_std().unwrap_or_default();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down scheduler");
                return Ok(());
            }
            _ = tokio::time::sleep(wait) => {}
        }

        for job in jobs {
            if let Err(e) = run_job(job, config, downloader).await {
                error!(job = ?job, error = %e, "Scheduled job failed");
            }
        }
    }
}

//! Assembly of decoded fields into forecast runs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, instrument, warn};
use wave_common::{ForecastField, ForecastRun, Parameter};

use crate::reader::{Grib2Field, Grib2Reader};
use crate::{Grib2Error, Grib2Result};

/// Build a run from the fields of one file.
///
/// The first wanted field fixes the grid and run time. Fields on a different
/// grid or from a different run are skipped. The time axis is the set of
/// valid times every parameter has, so a parameter with fewer steps shortens
/// the whole run.
pub fn assemble_run(fields: Vec<Grib2Field>, source: &str) -> Grib2Result<ForecastRun> {
    let mut fields = fields.into_iter().filter(|f| f.parameter().is_some());
    let first = fields
        .next()
        .ok_or_else(|| Grib2Error::NoFields(source.to_string()))?;

    let grid_def = first.grid.clone();
    let run_time = first.reference_time;

    let mut by_param: BTreeMap<Parameter, BTreeMap<DateTime<Utc>, Vec<f32>>> = BTreeMap::new();

    for field in std::iter::once(first).chain(fields) {
        let name = field.short_name();
        if field.grid != grid_def {
            warn!(source, name = %name, "Field on a different grid, skipping");
            continue;
        }
        if field.reference_time != run_time {
            warn!(source, name = %name, reference = %field.reference_time, "Field from another run, skipping");
            continue;
        }
        let (Some(param), Some(valid)) = (field.parameter(), field.valid_time()) else {
            warn!(source, name = %name, "Field without a usable valid time, skipping");
            continue;
        };
        by_param.entry(param).or_default().insert(valid, field.values);
    }

    let mut common: Option<BTreeSet<DateTime<Utc>>> = None;
    for steps in by_param.values() {
        let times: BTreeSet<_> = steps.keys().copied().collect();
        common = Some(match common {
            Some(c) => c.intersection(&times).copied().collect(),
            None => times,
        });
    }
    let valid_times: Vec<DateTime<Utc>> = common.unwrap_or_default().into_iter().collect();

    let grid = grid_def.coordinates()?;
    let (rows, cols) = grid.shape();

    let mut run_fields = BTreeMap::new();
    for (param, mut steps) in by_param {
        let slabs = valid_times
            .iter()
            .filter_map(|t| steps.remove(t))
            .collect::<Vec<_>>();
        run_fields.insert(param, ForecastField::from_steps(rows, cols, slabs)?);
    }

    debug!(
        source,
        %run_time,
        steps = valid_times.len(),
        rows,
        cols,
        "Assembled forecast run"
    );

    Ok(ForecastRun::new(run_time, valid_times, grid, run_fields, source)?)
}

/// Decode a forecast run from GRIB2 bytes, unpacking only the fields we use.
pub fn read_forecast_bytes(data: Bytes, source: &str) -> Grib2Result<ForecastRun> {
    let mut reader = Grib2Reader::new(data);
    let fields = reader.read_fields(|discipline, product| product.parameter(discipline).is_some())?;
    assemble_run(fields, source)
}

/// Read and decode one forecast file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_forecast_file(path: &Path) -> Grib2Result<ForecastRun> {
    let data = std::fs::read(path)?;
    read_forecast_bytes(Bytes::from(data), &path.display().to_string())
}

/// Read many forecast files, each independently.
///
/// With `workers` set the reads run on a pool of that many threads. Results
/// come back in the order of `paths` whatever the completion order.
pub fn read_forecast_files(
    paths: &[PathBuf],
    workers: Option<usize>,
) -> Vec<(PathBuf, Grib2Result<ForecastRun>)> {
    let read = |path: &PathBuf| (path.clone(), read_forecast_file(path));

    let Some(workers) = workers.filter(|&n| n > 1) else {
        return paths.iter().map(read).collect();
    };

    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| paths.par_iter().map(read).collect()),
        Err(e) => {
            warn!(error = %e, "Failed to start reader pool, reading sequentially");
            paths.iter().map(read).collect()
        }
    }
}

//! Decoded forecast runs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ForecastGrid, GridIndex, WaveError, WaveResult};

/// Physical quantities extracted from the wave model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Parameter {
    /// Significant height of combined wind waves and swell (m)
    WaveHeight,
    /// Wind speed (m/s)
    WindSpeed,
    /// Wind direction, degrees true, direction the wind blows from
    WindDirection,
}

impl Parameter {
    /// GRIB2 short name as listed in NCEP inventories.
    pub fn short_name(self) -> &'static str {
        match self {
            Parameter::WaveHeight => "HTSGW",
            Parameter::WindSpeed => "WIND",
            Parameter::WindDirection => "WDIR",
        }
    }

    pub fn all() -> [Parameter; 3] {
        [
            Parameter::WaveHeight,
            Parameter::WindSpeed,
            Parameter::WindDirection,
        ]
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Parameter {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HTSGW" => Ok(Parameter::WaveHeight),
            "WIND" => Ok(Parameter::WindSpeed),
            "WDIR" => Ok(Parameter::WindDirection),
            other => Err(WaveError::Config(format!("unknown parameter: {}", other))),
        }
    }
}

/// One quantity over every time step and grid cell, indexed (time, row, column).
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastField {
    steps: usize,
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl ForecastField {
    /// Stack per-step slabs (each row-major `rows * cols`) into a field.
    pub fn from_steps(rows: usize, cols: usize, steps: Vec<Vec<f32>>) -> WaveResult<Self> {
        let cells = rows * cols;
        let mut values = Vec::with_capacity(cells * steps.len());
        let nsteps = steps.len();

        for (t, slab) in steps.into_iter().enumerate() {
            if slab.len() != cells {
                return Err(WaveError::InvalidGrid(format!(
                    "time step {} has {} values, grid has {} cells",
                    t,
                    slab.len(),
                    cells
                )));
            }
            values.extend(slab);
        }

        Ok(Self {
            steps: nsteps,
            rows,
            cols,
            values,
        })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.steps, self.rows, self.cols)
    }

    /// Value at one time step and cell.
    pub fn get(&self, step: usize, index: GridIndex) -> Option<f32> {
        if step >= self.steps || index.row >= self.rows || index.col >= self.cols {
            return None;
        }
        let offset = step * self.rows * self.cols + index.flat(self.cols);
        self.values.get(offset).copied()
    }

    /// Time series at one cell, truncated to `max_steps`.
    pub fn series_at(&self, index: GridIndex, max_steps: usize) -> WaveResult<Vec<f32>> {
        if index.row >= self.rows || index.col >= self.cols {
            return Err(WaveError::IndexOutOfBounds {
                row: index.row,
                col: index.col,
                rows: self.rows,
                cols: self.cols,
            });
        }

        let cells = self.rows * self.cols;
        let flat = index.flat(self.cols);
        Ok((0..self.steps.min(max_steps))
            .map(|t| self.values[t * cells + flat])
            .collect())
    }

    /// Drop time steps beyond `steps`.
    pub fn truncate(&mut self, steps: usize) {
        if steps < self.steps {
            self.values.truncate(steps * self.rows * self.cols);
            self.steps = steps;
        }
    }
}

/// A single model run read from one forecast file.
#[derive(Debug, Clone)]
pub struct ForecastRun {
    /// Model initialization time
    pub run_time: DateTime<Utc>,
    /// Valid time of each step
    pub valid_times: Vec<DateTime<Utc>>,
    /// Grid geometry of this file
    pub grid: ForecastGrid,
    /// Decoded quantities
    pub fields: BTreeMap<Parameter, ForecastField>,
    /// Where the run was read from
    pub source: String,
}

impl ForecastRun {
    /// Assemble a run, checking that every field matches the grid and the
    /// time axis. Fields with extra steps are truncated to the time axis.
    pub fn new(
        run_time: DateTime<Utc>,
        valid_times: Vec<DateTime<Utc>>,
        grid: ForecastGrid,
        mut fields: BTreeMap<Parameter, ForecastField>,
        source: impl Into<String>,
    ) -> WaveResult<Self> {
        let (rows, cols) = grid.shape();
        let steps = fields
            .values()
            .map(ForecastField::steps)
            .chain(std::iter::once(valid_times.len()))
            .min()
            .unwrap_or(0);

        for (param, field) in fields.iter_mut() {
            let (_, frows, fcols) = field.shape();
            if (frows, fcols) != (rows, cols) {
                return Err(WaveError::InvalidGrid(format!(
                    "{} field is {}x{}, grid is {}x{}",
                    param, frows, fcols, rows, cols
                )));
            }
            field.truncate(steps);
        }

        let mut valid_times = valid_times;
        valid_times.truncate(steps);

        Ok(Self {
            run_time,
            valid_times,
            grid,
            fields,
            source: source.into(),
        })
    }

    /// Number of time steps available in every field.
    pub fn steps(&self) -> usize {
        self.valid_times.len()
    }

    pub fn field(&self, param: Parameter) -> Option<&ForecastField> {
        self.fields.get(&param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn tiny_grid() -> ForecastGrid {
        ForecastGrid::from_rows(
            vec![vec![-88.0, -87.0], vec![-88.0, -87.0]],
            vec![vec![42.0, 42.0], vec![43.0, 43.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_parameter_names() {
        for param in Parameter::all() {
            assert_eq!(param.short_name().parse::<Parameter>().unwrap(), param);
        }
        assert!("TMP".parse::<Parameter>().is_err());
    }

    #[test]
    fn test_series_at_cell() {
        let field = ForecastField::from_steps(
            2,
            2,
            vec![vec![0.0, 1.0, 2.0, 3.0], vec![10.0, 11.0, 12.0, 13.0]],
        )
        .unwrap();

        assert_eq!(field.series_at(GridIndex::new(1, 0), 10).unwrap(), vec![2.0, 12.0]);
        assert_eq!(field.series_at(GridIndex::new(0, 1), 1).unwrap(), vec![1.0]);
        assert!(field.series_at(GridIndex::new(2, 0), 10).is_err());
    }

    #[test]
    fn test_run_truncates_to_shortest_field() {
        let run_time = Utc.with_ymd_and_hms(2020, 10, 8, 7, 0, 0).unwrap();
        let times: Vec<_> = (0..3).map(|h| run_time + Duration::hours(h)).collect();

        let mut fields = BTreeMap::new();
        fields.insert(
            Parameter::WaveHeight,
            ForecastField::from_steps(2, 2, vec![vec![1.0; 4]; 3]).unwrap(),
        );
        fields.insert(
            Parameter::WindSpeed,
            ForecastField::from_steps(2, 2, vec![vec![5.0; 4]; 2]).unwrap(),
        );

        let run = ForecastRun::new(run_time, times, tiny_grid(), fields, "test").unwrap();
        assert_eq!(run.steps(), 2);
        assert_eq!(run.field(Parameter::WaveHeight).unwrap().steps(), 2);
    }

    #[test]
    fn test_run_rejects_mismatched_field() {
        let run_time = Utc.with_ymd_and_hms(2020, 10, 8, 7, 0, 0).unwrap();
        let mut fields = BTreeMap::new();
        fields.insert(
            Parameter::WaveHeight,
            ForecastField::from_steps(3, 1, vec![vec![1.0; 3]]).unwrap(),
        );

        let result = ForecastRun::new(run_time, vec![run_time], tiny_grid(), fields, "test");
        assert!(matches!(result, Err(WaveError::InvalidGrid(_))));
    }
}

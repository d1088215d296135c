//! Station comparison charts.
//!
//! - Two stacked panels (wave height, 10 m wind speed) on a shared time axis
//! - Segment glyphs for tick labels
//! - PNG encoding (indexed when the palette fits)

pub mod chart;
pub mod error;
pub mod glyphs;
pub mod png;
pub mod style;

pub use chart::{
    nice_ticks, render_chart, render_chart_png, save_chart, wave_height_limits,
    wind_speed_limits, ChartWindow,
};
pub use error::{RenderError, RenderResult};
pub use style::{ChartStyle, ColorStop};

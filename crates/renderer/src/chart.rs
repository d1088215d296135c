//! Two-panel station chart: wave height over wind speed on a shared time axis.
//!
//! Past forecast runs are drawn thin on a purple ramp, the newest run thick on
//! top of them. Observations are red markers, and observed wind direction is
//! drawn as short arrows anchored on the wind markers. A dashed line marks the
//! current time.

use std::path::Path;

use chrono::{DateTime, Duration, DurationRound, Utc};
use grid_locator::{ForecastSeries, StationComparison, TimeSeries, WindVector};
use tiny_skia::{
    Color, FillRule, LineCap, Mask, Paint, PathBuilder, Pixmap, Rect, Stroke, StrokeDash,
    Transform,
};
use tracing::{debug, instrument};

use crate::glyphs::{draw_text, Anchor, TextMetrics};
use crate::style::{hex_color, ChartStyle};
use crate::{png, RenderError, RenderResult};

const MARGIN_LEFT: f32 = 80.0;
const MARGIN_RIGHT: f32 = 30.0;
const MARGIN_TOP: f32 = 30.0;
const MARGIN_BOTTOM: f32 = 50.0;
const PANEL_GAP: f32 = 40.0;
const TICK_LENGTH: f32 = 7.5;
const AXIS_WIDTH: f32 = 2.0;

/// Headroom above the newest run's peak wave height, in feet.
const WAVE_HEADROOM_FT: f64 = 5.0;

/// Time span shown on a chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub now: DateTime<Utc>,
    pub horizon_hours: u32,
}

impl ChartWindow {
    /// `[start, end + horizon]`.
    pub fn x_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.start,
            self.end + Duration::hours(self.horizon_hours as i64),
        )
    }
}

/// Wave panel y range: zero to the newest run's peak plus headroom.
pub fn wave_height_limits(latest: Option<&ForecastSeries>) -> (f64, f64) {
    let peak = latest
        .and_then(|s| s.wave_height_ft.max())
        .unwrap_or(0.0)
        .max(0.0);
    (0.0, peak + WAVE_HEADROOM_FT)
}

/// Wind panel y range: zero to twice the newest run's peak.
pub fn wind_speed_limits(latest: Option<&ForecastSeries>) -> (f64, f64) {
    match latest.and_then(|s| s.wind_speed_kt.max()) {
        Some(peak) if peak > 0.0 => (0.0, peak * 2.0),
        _ => (0.0, 10.0),
    }
}

/// Evenly spaced tick values covering `[lo, hi]` with a 1-2-5 step.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    if !(hi > lo) || target == 0 {
        return vec![lo];
    }
    let raw = (hi - lo) / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);

    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

/// Midnight UTC of every day in the range, every other day past ten days.
pub fn day_ticks(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let every = if end - start > Duration::days(10) { 2 } else { 1 };
    let Ok(mut t) = start.duration_trunc(Duration::days(1)) else {
        return Vec::new();
    };
    if t < start {
        t += Duration::days(1);
    }

    let mut ticks = Vec::new();
    while t <= end {
        ticks.push(t);
        t += Duration::days(every);
    }
    ticks
}

fn format_value(v: f64, step: f64) -> String {
    if step >= 1.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.1}", v)
    }
}

/// Data-to-pixel mapping of one panel.
#[derive(Debug, Clone, Copy)]
struct Axes {
    rect: Rect,
    t0: i64,
    t1: i64,
    y0: f64,
    y1: f64,
}

impl Axes {
    fn x(&self, t: DateTime<Utc>) -> f32 {
        let span = (self.t1 - self.t0).max(1) as f64;
        let f = (t.timestamp() - self.t0) as f64 / span;
        self.rect.left() + (f * self.rect.width() as f64) as f32
    }

    fn y(&self, v: f64) -> f32 {
        let span = if self.y1 > self.y0 { self.y1 - self.y0 } else { 1.0 };
        let f = (v - self.y0) / span;
        self.rect.bottom() - (f * self.rect.height() as f64) as f32
    }
}

struct Canvas<'a> {
    pixmap: Pixmap,
    style: &'a ChartStyle,
}

impl Canvas<'_> {
    fn paint(color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;
        paint
    }

    fn stroke(width: f32) -> Stroke {
        Stroke {
            width,
            line_cap: LineCap::Round,
            ..Stroke::default()
        }
    }

    fn clip(&self, axes: &Axes) -> Option<Mask> {
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
        let path = PathBuilder::from_rect(axes.rect);
        mask.fill_path(&path, FillRule::Winding, false, Transform::identity());
        Some(mask)
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), paint: &Paint, stroke: &Stroke) {
        let mut pb = PathBuilder::new();
        pb.move_to(from.0, from.1);
        pb.line_to(to.0, to.1);
        if let Some(path) = pb.finish() {
            self.pixmap
                .stroke_path(&path, paint, stroke, Transform::identity(), None);
        }
    }

    /// Polyline through the finite values, broken at gaps.
    fn series(
        &mut self,
        axes: &Axes,
        series: &TimeSeries,
        color: Color,
        width: f32,
        mask: Option<&Mask>,
    ) {
        let mut pb = PathBuilder::new();
        let mut pen_down = false;
        for (t, v) in series.iter() {
            if !v.is_finite() {
                pen_down = false;
                continue;
            }
            let (x, y) = (axes.x(t), axes.y(v));
            if pen_down {
                pb.line_to(x, y);
            } else {
                pb.move_to(x, y);
                pen_down = true;
            }
        }
        if let Some(path) = pb.finish() {
            self.pixmap.stroke_path(
                &path,
                &Self::paint(color),
                &Self::stroke(width),
                Transform::identity(),
                mask,
            );
        }
    }

    fn markers(&mut self, axes: &Axes, series: &TimeSeries, mask: Option<&Mask>) {
        let paint = Self::paint(hex_color(&self.style.observation));
        for (t, v) in series.iter() {
            let radius = self.style.observation_radius;
            if let Some(dot) = PathBuilder::from_circle(axes.x(t), axes.y(v), radius) {
                self.pixmap
                    .fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), mask);
            }
        }
    }

    fn wind_vectors(&mut self, axes: &Axes, vectors: &[WindVector], mask: Option<&Mask>) {
        let len = self.style.wind_vector_length;
        let head = len * 0.35;
        let mut pb = PathBuilder::new();
        for w in vectors {
            let (x, y) = (axes.x(w.time), axes.y(w.speed));
            // screen y points down
            let (dx, dy) = (w.u as f32, -(w.v as f32));
            let (tip_x, tip_y) = (x + dx * len, y + dy * len);
            pb.move_to(x, y);
            pb.line_to(tip_x, tip_y);

            let angle = dy.atan2(dx);
            for side in [-1.0f32, 1.0] {
                let a = angle + std::f32::consts::PI + side * 0.5;
                pb.move_to(tip_x, tip_y);
                pb.line_to(tip_x + a.cos() * head, tip_y + a.sin() * head);
            }
        }
        if let Some(path) = pb.finish() {
            self.pixmap.stroke_path(
                &path,
                &Self::paint(hex_color(&self.style.wind_vector)),
                &Self::stroke(1.5),
                Transform::identity(),
                mask,
            );
        }
    }

    fn now_line(&mut self, axes: &Axes, now: DateTime<Utc>) {
        let x = axes.x(now);
        if x < axes.rect.left() || x > axes.rect.right() {
            return;
        }
        let stroke = Stroke {
            width: 1.5,
            dash: StrokeDash::new(vec![8.0, 6.0], 0.0),
            ..Stroke::default()
        };
        let paint = Self::paint(hex_color(&self.style.now_line));
        self.line((x, axes.rect.top()), (x, axes.rect.bottom()), &paint, &stroke);
    }

    /// Left and bottom spines with y tick labels; x tick labels when
    /// `date_labels` is set.
    fn frame(&mut self, axes: &Axes, ticks: &[DateTime<Utc>], date_labels: bool) {
        let paint = Self::paint(hex_color(&self.style.axis));
        let label = Self::paint(hex_color(&self.style.label));
        let spine = Self::stroke(AXIS_WIDTH);
        let r = axes.rect;
        let offset = 5.0;

        self.line((r.left() - offset, r.top()), (r.left() - offset, r.bottom()), &paint, &spine);
        self.line((r.left(), r.bottom() + offset), (r.right(), r.bottom() + offset), &paint, &spine);

        let yticks = nice_ticks(axes.y0, axes.y1, 5);
        let step = if yticks.len() > 1 { yticks[1] - yticks[0] } else { 1.0 };
        for v in &yticks {
            let y = axes.y(*v);
            let x = r.left() - offset;
            self.line((x - TICK_LENGTH, y), (x, y), &paint, &spine);
            draw_text(
                &mut self.pixmap,
                x - TICK_LENGTH - 6.0,
                y,
                Anchor::Right,
                &format_value(*v, step),
                self.style.font_size,
                &label,
            );
        }

        let font = TextMetrics::new(self.style.font_size);
        for t in ticks {
            let x = axes.x(*t);
            let y = r.bottom() + offset;
            self.line((x, y), (x, y + TICK_LENGTH), &paint, &spine);
            if date_labels {
                draw_text(
                    &mut self.pixmap,
                    x,
                    y + TICK_LENGTH + 6.0 + font.char_height / 2.0,
                    Anchor::Center,
                    &t.format("%m/%d %H").to_string(),
                    self.style.font_size,
                    &label,
                );
            }
        }
    }
}

/// Draw the chart for one station.
pub fn render_chart(
    comparison: &StationComparison,
    window: &ChartWindow,
    style: &ChartStyle,
) -> RenderResult<Pixmap> {
    let invalid = || RenderError::InvalidSize {
        width: style.width,
        height: style.height,
    };
    let mut pixmap = Pixmap::new(style.width, style.height).ok_or_else(invalid)?;
    pixmap.fill(hex_color(&style.background));

    let (w, h) = (style.width as f32, style.height as f32);
    let plot_w = w - MARGIN_LEFT - MARGIN_RIGHT;
    let panel_h = (h - MARGIN_TOP - MARGIN_BOTTOM - PANEL_GAP) / 2.0;
    let top_rect = Rect::from_xywh(MARGIN_LEFT, MARGIN_TOP, plot_w, panel_h).ok_or_else(invalid)?;
    let bottom_rect = Rect::from_xywh(MARGIN_LEFT, MARGIN_TOP + panel_h + PANEL_GAP, plot_w, panel_h)
        .ok_or_else(invalid)?;

    let (x0, x1) = window.x_range();
    let latest = comparison.latest();
    let (wave_lo, wave_hi) = wave_height_limits(latest);
    let (wind_lo, wind_hi) = wind_speed_limits(latest);
    let wave = Axes {
        rect: top_rect,
        t0: x0.timestamp(),
        t1: x1.timestamp(),
        y0: wave_lo,
        y1: wave_hi,
    };
    let wind = Axes {
        rect: bottom_rect,
        y0: wind_lo,
        y1: wind_hi,
        ..wave
    };

    let mut canvas = Canvas { pixmap, style };
    let wave_clip = canvas.clip(&wave);
    let wind_clip = canvas.clip(&wind);

    let past = comparison.forecasts.len().saturating_sub(1);
    let colors = style.past_colors(past);
    for (run, color) in comparison.forecasts.iter().zip(colors) {
        canvas.series(&wave, &run.wave_height_ft, color, style.past_width, wave_clip.as_ref());
        canvas.series(&wind, &run.wind_speed_kt, color, style.past_width, wind_clip.as_ref());
    }
    if let Some(run) = latest {
        let color = hex_color(&style.current_run);
        canvas.series(&wave, &run.wave_height_ft, color, style.current_width, wave_clip.as_ref());
        canvas.series(&wind, &run.wind_speed_kt, color, style.current_width, wind_clip.as_ref());
    }

    if let Some(observed) = &comparison.observed {
        canvas.wind_vectors(&wind, &observed.wind_vectors, wind_clip.as_ref());
        canvas.markers(&wind, &observed.wind_speed_kt, wind_clip.as_ref());
        if observed.has_wave_heights() {
            canvas.markers(&wave, &observed.wave_height_ft, wave_clip.as_ref());
        }
    }

    canvas.now_line(&wave, window.now);
    canvas.now_line(&wind, window.now);

    let ticks = day_ticks(x0, x1);
    canvas.frame(&wave, &ticks, false);
    canvas.frame(&wind, &ticks, true);

    debug!(
        station = %comparison.station.id,
        runs = comparison.forecasts.len(),
        observed = comparison.observed.is_some(),
        "Rendered station chart"
    );
    Ok(canvas.pixmap)
}

/// Draw the chart for one station and encode it as PNG.
pub fn render_chart_png(
    comparison: &StationComparison,
    window: &ChartWindow,
    style: &ChartStyle,
) -> RenderResult<Vec<u8>> {
    png::encode_pixmap(&render_chart(comparison, window, style)?)
}

/// Render a station's chart to `path`.
#[instrument(skip_all, fields(station = %comparison.station.id, path = %path.display()))]
pub fn save_chart(
    comparison: &StationComparison,
    window: &ChartWindow,
    style: &ChartStyle,
    path: &Path,
) -> RenderResult<()> {
    let bytes = render_chart_png(comparison, window, style)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 10, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(nice_ticks(0.0, 7.3, 5), vec![0.0, 2.0, 4.0, 6.0]);
        let small = nice_ticks(0.0, 0.9, 4);
        assert_eq!(small.len(), 2);
        assert!((small[1] - 0.5).abs() < 1e-12);
        assert_eq!(nice_ticks(3.0, 3.0, 5), vec![3.0]);
    }

    #[test]
    fn test_day_ticks() {
        let ticks = day_ticks(t(3, 13), t(6, 0));
        assert_eq!(ticks, vec![t(4, 0), t(5, 0), t(6, 0)]);

        let long = day_ticks(t(1, 0), t(20, 0));
        assert_eq!(long[1] - long[0], Duration::days(2));
    }

    #[test]
    fn test_window_extends_by_horizon() {
        let window = ChartWindow {
            start: t(3, 12),
            end: t(8, 12),
            now: t(8, 12),
            horizon_hours: 84,
        };
        assert_eq!(window.x_range(), (t(3, 12), t(12, 0)));
    }

    #[test]
    fn test_limits_without_runs() {
        assert_eq!(wave_height_limits(None), (0.0, 5.0));
        assert_eq!(wind_speed_limits(None), (0.0, 10.0));
    }

    #[test]
    fn test_axes_mapping() {
        let axes = Axes {
            rect: Rect::from_xywh(100.0, 50.0, 200.0, 100.0).unwrap(),
            t0: t(1, 0).timestamp(),
            t1: t(2, 0).timestamp(),
            y0: 0.0,
            y1: 10.0,
        };
        assert_eq!(axes.x(t(1, 12)), 200.0);
        assert_eq!(axes.y(0.0), 150.0);
        assert_eq!(axes.y(10.0), 50.0);
    }
}

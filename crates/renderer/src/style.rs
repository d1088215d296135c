//! Colors and sizes used when drawing station charts.

use tiny_skia::Color;

/// Color stop for a ramp, `value` in 0..=1.
#[derive(Debug, Clone)]
pub struct ColorStop {
    pub value: f32,
    pub color: String,
}

impl ColorStop {
    pub fn new(value: f32, color: &str) -> Self {
        Self {
            value,
            color: color.to_string(),
        }
    }
}

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Opaque color from a hex string, mid grey when it does not parse.
pub fn hex_color(hex: &str) -> Color {
    let (r, g, b) = hex_to_rgb(hex).unwrap_or((200, 200, 200));
    Color::from_rgba8(r, g, b, 255)
}

/// Linear interpolation between the stops surrounding `t`.
pub fn ramp_color(stops: &[ColorStop], t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let (low, high) = match stops.iter().position(|s| s.value >= t) {
        Some(0) => return hex_color(&stops[0].color),
        Some(i) => (&stops[i - 1], &stops[i]),
        None => return hex_color(stops.last().map_or("", |s| s.color.as_str())),
    };

    let span = high.value - low.value;
    let f = if span.abs() < f32::EPSILON {
        0.0
    } else {
        (t - low.value) / span
    };
    let (r1, g1, b1) = hex_to_rgb(&low.color).unwrap_or((200, 200, 200));
    let (r2, g2, b2) = hex_to_rgb(&high.color).unwrap_or((200, 200, 200));
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - f) + b as f32 * f).round() as u8;
    Color::from_rgba8(mix(r1, r2), mix(g1, g2), mix(b1, b2), 255)
}

/// Appearance of a station chart.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub axis: String,
    pub label: String,
    pub current_run: String,
    pub current_width: f32,
    pub past_width: f32,
    /// Past runs, oldest at 0
    pub past_ramp: Vec<ColorStop>,
    pub observation: String,
    pub observation_radius: f32,
    pub wind_vector: String,
    /// Arrow length in pixels
    pub wind_vector_length: f32,
    pub now_line: String,
    pub font_size: f32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 800,
            background: "#1c1c2a".into(),
            axis: "#e0e0e0".into(),
            label: "#e0e0e0".into(),
            current_run: "#00ffff".into(),
            current_width: 4.0,
            past_width: 2.0,
            // reversed "Purples": dark for old runs, pale for recent ones
            past_ramp: vec![
                ColorStop::new(0.0, "#3f007d"),
                ColorStop::new(0.25, "#6a51a3"),
                ColorStop::new(0.5, "#9e9ac8"),
                ColorStop::new(0.75, "#dadaeb"),
                ColorStop::new(1.0, "#fcfbfd"),
            ],
            observation: "#ff0000".into(),
            observation_radius: 3.0,
            wind_vector: "#84fa75".into(),
            wind_vector_length: 18.0,
            now_line: "#ffffff".into(),
            font_size: 14.0,
        }
    }
}

impl ChartStyle {
    /// Colors for `count` past runs, oldest first.
    pub fn past_colors(&self, count: usize) -> Vec<Color> {
        (0..count)
            .map(|i| {
                let t = if count > 1 {
                    i as f32 / (count - 1) as f32
                } else {
                    0.0
                };
                ramp_color(&self.past_ramp, t)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(c: Color) -> (u8, u8, u8) {
        let c = c.to_color_u8();
        (c.red(), c.green(), c.blue())
    }

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF0000"), Some((255, 0, 0)));
        assert_eq!(hex_to_rgb("84fa75"), Some((0x84, 0xfa, 0x75)));
        assert_eq!(hex_to_rgb("#GGGGGG"), None);
        assert_eq!(hex_to_rgb("#FFF"), None);
    }

    #[test]
    fn test_ramp_endpoints_and_midpoint() {
        let stops = vec![ColorStop::new(0.0, "#000000"), ColorStop::new(1.0, "#ffffff")];
        assert_eq!(rgb(ramp_color(&stops, 0.0)), (0, 0, 0));
        assert_eq!(rgb(ramp_color(&stops, 1.0)), (255, 255, 255));
        assert_eq!(rgb(ramp_color(&stops, 0.5)), (128, 128, 128));
        assert_eq!(rgb(ramp_color(&stops, 7.0)), (255, 255, 255));
    }

    #[test]
    fn test_past_colors_oldest_darkest() {
        let style = ChartStyle::default();
        let colors = style.past_colors(4);
        assert_eq!(colors.len(), 4);
        let brightness = |c: Color| {
            let (r, g, b) = rgb(c);
            r as u32 + g as u32 + b as u32
        };
        assert!(colors.windows(2).all(|w| brightness(w[0]) < brightness(w[1])));
        assert_eq!(rgb(style.past_colors(1)[0]), (0x3f, 0x00, 0x7d));
    }
}

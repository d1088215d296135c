//! Stroke-segment glyphs for axis tick labels.
//!
//! Only digits and the separators used in value and date labels are drawn;
//! anything else leaves a blank cell.

use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

type Segment = ((f32, f32), (f32, f32));

/// Segments of one character in a unit cell centred on the origin,
/// x in -0.5..0.5 and y in -0.5..0.5 pointing down.
fn segments(ch: char) -> &'static [Segment] {
    const T: f32 = -0.5;
    const B: f32 = 0.5;
    const L: f32 = -0.5;
    const R: f32 = 0.5;
    match ch {
        '0' => &[((L, T), (R, T)), ((R, T), (R, B)), ((R, B), (L, B)), ((L, B), (L, T))],
        '1' => &[((0.0, T), (0.0, B))],
        '2' => &[
            ((L, T), (R, T)),
            ((R, T), (R, 0.0)),
            ((R, 0.0), (L, 0.0)),
            ((L, 0.0), (L, B)),
            ((L, B), (R, B)),
        ],
        '3' => &[((L, T), (R, T)), ((R, T), (R, B)), ((R, B), (L, B)), ((L, 0.0), (R, 0.0))],
        '4' => &[((L, T), (L, 0.0)), ((L, 0.0), (R, 0.0)), ((R, T), (R, B))],
        '5' => &[
            ((R, T), (L, T)),
            ((L, T), (L, 0.0)),
            ((L, 0.0), (R, 0.0)),
            ((R, 0.0), (R, B)),
            ((R, B), (L, B)),
        ],
        '6' => &[
            ((R, T), (L, T)),
            ((L, T), (L, B)),
            ((L, B), (R, B)),
            ((R, B), (R, 0.0)),
            ((R, 0.0), (L, 0.0)),
        ],
        '7' => &[((L, T), (R, T)), ((R, T), (0.0, B))],
        '8' => &[
            ((L, T), (R, T)),
            ((R, T), (R, B)),
            ((R, B), (L, B)),
            ((L, B), (L, T)),
            ((L, 0.0), (R, 0.0)),
        ],
        '9' => &[
            ((L, 0.0), (R, 0.0)),
            ((R, 0.0), (R, T)),
            ((R, T), (L, T)),
            ((L, T), (L, 0.0)),
            ((R, 0.0), (R, B)),
        ],
        '-' => &[((L, 0.0), (R, 0.0))],
        '.' => &[((0.0, 0.35), (0.0, 0.45))],
        ':' => &[((0.0, -0.25), (0.0, -0.15)), ((0.0, 0.15), (0.0, 0.25))],
        '/' => &[((R, T), (L, B))],
        _ => &[],
    }
}

/// Horizontal text measurements for a font size.
#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub char_width: f32,
    pub char_height: f32,
    pub spacing: f32,
}

impl TextMetrics {
    pub fn new(font_size: f32) -> Self {
        Self {
            char_width: font_size * 0.6,
            char_height: font_size,
            spacing: font_size * 0.25,
        }
    }

    pub fn text_width(&self, text: &str) -> f32 {
        let n = text.chars().count() as f32;
        if n == 0.0 {
            return 0.0;
        }
        n * (self.char_width + self.spacing) - self.spacing
    }
}

/// Where `(x, y)` sits relative to the drawn text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Text ends at x
    Right,
    /// Text is centred on x
    Center,
}

/// Draw `text` vertically centred on `y`.
pub fn draw_text(
    pixmap: &mut Pixmap,
    x: f32,
    y: f32,
    anchor: Anchor,
    text: &str,
    font_size: f32,
    paint: &Paint,
) {
    let m = TextMetrics::new(font_size);
    let left = match anchor {
        Anchor::Right => x - m.text_width(text),
        Anchor::Center => x - m.text_width(text) / 2.0,
    };

    let stroke = Stroke {
        width: (m.char_width * 0.15).max(1.0),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    let mut pb = PathBuilder::new();
    for (i, ch) in text.chars().enumerate() {
        let cx = left + i as f32 * (m.char_width + m.spacing) + m.char_width / 2.0;
        for ((x1, y1), (x2, y2)) in segments(ch) {
            pb.move_to(cx + x1 * m.char_width, y + y1 * m.char_height);
            pb.line_to(cx + x2 * m.char_width, y + y2 * m.char_height);
        }
    }

    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, paint, &stroke, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    #[test]
    fn test_label_characters_have_glyphs() {
        for ch in "0123456789-./:".chars() {
            assert!(!segments(ch).is_empty(), "no glyph for {:?}", ch);
        }
        assert!(segments(' ').is_empty());
    }

    #[test]
    fn test_text_width() {
        let m = TextMetrics::new(10.0);
        assert_eq!(m.text_width(""), 0.0);
        assert!((m.text_width("12") - (2.0 * 6.0 + 2.5)).abs() < 1e-6);
    }

    #[test]
    fn test_draw_text_marks_pixels_left_of_anchor() {
        let mut pixmap = Pixmap::new(100, 40).unwrap();
        let mut paint = Paint::default();
        paint.set_color(Color::WHITE);

        draw_text(&mut pixmap, 60.0, 20.0, Anchor::Right, "10", 14.0, &paint);

        let lit = |x: u32| (0..40).any(|y| pixmap.pixel(x, y).map_or(false, |p| p.alpha() > 0));
        assert!((40..60).any(lit));
        assert!(!(70..100).any(lit));
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ActorBox, Point, Size};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor(raw.to_string());
        let hex = raw.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(invalid)
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Anything an actor can be drawn onto.
pub trait Surface {
    fn fill_rect(&mut self, top_left: Point, size: Size, color: Color);
}

/// Fills the box with `color`, then an inset half-size box with `inner_color`.
pub fn draw_rect<S: Surface + ?Sized>(
    surface: &mut S,
    actor_box: &ActorBox,
    color: Color,
    inner_color: Color,
) {
    surface.fill_rect(actor_box.top_left(), actor_box.size, color);

    let inner = ActorBox {
        center: actor_box.center,
        size: Size::new(actor_box.size.width / 2.0, actor_box.size.height / 2.0),
    };
    surface.fill_rect(inner.top_left(), inner.size, inner_color);
}

/// Coarse raster where each cell records the last color painted over its center.
#[derive(Clone, Debug)]
pub struct GridSurface {
    cols: usize,
    rows: usize,
    cell_size: f32,
    cells: Vec<Option<Color>>,
}

impl GridSurface {
    pub fn new(cols: usize, rows: usize, cell_size: f32) -> Self {
        Self {
            cols,
            rows,
            cell_size,
            cells: vec![None; cols * rows],
        }
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<Color> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells.get(row * self.cols + col).copied().flatten()
    }

    /// Renders one string per row, asking `glyph` for painted cells.
    pub fn to_lines(&self, mut glyph: impl FnMut(usize, usize, Option<Color>) -> char) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| glyph(col, row, self.cell(col, row)))
                    .collect()
            })
            .collect()
    }
}

impl Surface for GridSurface {
    fn fill_rect(&mut self, top_left: Point, size: Size, color: Color) {
        for row in 0..self.rows {
            let cy = (row as f32 + 0.5) * self.cell_size;
            if cy < top_left.y || cy >= top_left.y + size.height {
                continue;
            }
            for col in 0..self.cols {
                let cx = (col as f32 + 0.5) * self.cell_size;
                if cx < top_left.x || cx >= top_left.x + size.width {
                    continue;
                }
                if let Some(cell) = self.cells.get_mut(row * self.cols + col) {
                    *cell = Some(color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<(Point, Size, Color)>,
    }

    impl Surface for RecordingSurface {
        fn fill_rect(&mut self, top_left: Point, size: Size, color: Color) {
            self.calls.push((top_left, size, color));
        }
    }

    #[test]
    fn color_parses_hex_and_displays_lowercase() {
        let color: Color = "#FFcc00".parse().expect("color should parse");
        assert_eq!(color, Color::rgb(255, 204, 0));
        assert_eq!(color.to_string(), "#ffcc00");
    }

    #[test]
    fn color_rejects_malformed_values() {
        for raw in ["ffcc00", "#ffcc0", "#ggcc00", "#ffcc001", ""] {
            assert!(raw.parse::<Color>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn color_deserializes_from_json_string() {
        let color: Color = serde_json::from_str(r##""#102030""##).expect("color should deserialize");
        assert_eq!(color, Color::rgb(16, 32, 48));
    }

    #[test]
    fn draw_rect_paints_outer_then_inner_box() {
        let mut surface = RecordingSurface::default();
        let outer = Color::rgb(255, 255, 0);
        let inner = Color::rgb(0, 0, 0);
        let actor_box = ActorBox {
            center: Point::new(50.0, 40.0),
            size: Size::new(20.0, 10.0),
        };

        draw_rect(&mut surface, &actor_box, outer, inner);

        assert_eq!(
            surface.calls,
            vec![
                (Point::new(40.0, 35.0), Size::new(20.0, 10.0), outer),
                (Point::new(45.0, 37.5), Size::new(10.0, 5.0), inner),
            ]
        );
    }

    #[test]
    fn grid_surface_marks_cells_whose_center_is_covered() {
        let mut surface = GridSurface::new(4, 3, 10.0);
        let color = Color::rgb(1, 2, 3);
        surface.fill_rect(Point::new(10.0, 0.0), Size::new(20.0, 10.0), color);

        assert_eq!(surface.cell(0, 0), None);
        assert_eq!(surface.cell(1, 0), Some(color));
        assert_eq!(surface.cell(2, 0), Some(color));
        assert_eq!(surface.cell(1, 1), None);
        assert_eq!(surface.cell(9, 9), None);

        let lines = surface.to_lines(|_, _, painted| if painted.is_some() { 'x' } else { ' ' });
        assert_eq!(lines, vec![" xx ", "    ", "    "]);
    }
}

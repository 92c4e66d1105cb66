use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::hex_color;

pub const GRID_SURFACE_SIZE: u32 = 1024;

/// Repeat factor applied to the grid texture on the floor plane.
pub const GRID_REPEAT: [f32; 2] = [8.0, 8.0];

/// Square line grid on a transparent background.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPattern {
    pub step: u32,
    pub line_width: f32,
    pub stroke: Color,
}

impl Default for GridPattern {
    fn default() -> Self {
        Self {
            step: 128,
            line_width: 4.0,
            stroke: hex_color(0xff00ff),
        }
    }
}

impl GridPattern {
    /// Line coordinates from 0 to `extent` inclusive.
    pub fn line_positions(&self, extent: u32) -> Vec<f32> {
        (0..=extent)
            .step_by(self.step.max(1) as usize)
            .map(|value| value as f32)
            .collect()
    }

    pub fn paint(&self, pixmap: &mut Pixmap) {
        pixmap.fill(Color::TRANSPARENT);

        let width = pixmap.width() as f32;
        let height = pixmap.height() as f32;
        let mut builder = PathBuilder::new();
        for position in self.line_positions(pixmap.width().max(pixmap.height())) {
            builder.move_to(position, 0.0);
            builder.line_to(position, height);
            builder.move_to(0.0, position);
            builder.line_to(width, position);
        }
        let Some(path) = builder.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(self.stroke);
        let stroke = Stroke {
            width: self.line_width,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_cover_both_edges() {
        let positions = GridPattern::default().line_positions(GRID_SURFACE_SIZE);
        assert_eq!(positions.len(), 9);
        assert_eq!(positions.first(), Some(&0.0));
        assert_eq!(positions.last(), Some(&1024.0));
    }

    #[test]
    fn cells_stay_transparent() {
        let mut pixmap = Pixmap::new(GRID_SURFACE_SIZE, GRID_SURFACE_SIZE).unwrap();
        GridPattern::default().paint(&mut pixmap);

        assert_eq!(pixmap.pixel(64, 64).unwrap().alpha(), 0);

        let line = pixmap.pixel(128, 64).unwrap().demultiply();
        assert_eq!(
            (line.red(), line.green(), line.blue(), line.alpha()),
            (255, 0, 255, 255)
        );
    }
}

use tiny_skia::{Color, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use crate::hex_color;

pub const BRICK_SURFACE_SIZE: u32 = 1024;

/// Masonry outline pattern used on the pyramid faces.
#[derive(Debug, Clone, PartialEq)]
pub struct BrickPattern {
    pub rows: u32,
    pub cols: u32,
    pub line_width: f32,
    pub stroke: Color,
    pub background: Color,
}

impl Default for BrickPattern {
    fn default() -> Self {
        Self {
            rows: 16,
            cols: 8,
            line_width: 4.0,
            stroke: hex_color(0x00f3ff),
            background: Color::BLACK,
        }
    }
}

impl BrickPattern {
    /// Outlined rectangles in surface coordinates. Odd rows shift by half a
    /// brick, and columns `-1..=cols` are emitted so shifted rows reach both
    /// edges. The final entry is the full surface border.
    pub fn outlines(&self, width: f32, height: f32) -> Vec<Rect> {
        let brick_width = width / self.cols as f32;
        let brick_height = height / self.rows as f32;
        let mut rects = Vec::with_capacity((self.rows * (self.cols + 2) + 1) as usize);

        for row in 0..self.rows {
            let offset = (row % 2) as f32 * (brick_width / 2.0);
            let y = row as f32 * brick_height;
            for col in -1..=self.cols as i32 {
                let x = col as f32 * brick_width + offset;
                if let Some(rect) = Rect::from_xywh(x, y, brick_width, brick_height) {
                    rects.push(rect);
                }
            }
        }

        if let Some(border) = Rect::from_xywh(0.0, 0.0, width, height) {
            rects.push(border);
        }
        rects
    }

    pub fn paint(&self, pixmap: &mut Pixmap) {
        pixmap.fill(self.background);

        let mut builder = PathBuilder::new();
        for rect in self.outlines(pixmap.width() as f32, pixmap.height() as f32) {
            builder.push_rect(rect);
        }
        let Some(path) = builder.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(self.stroke);
        let stroke = Stroke {
            width: self.line_width,
            line_join: LineJoin::Miter,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_offset_columns_and_border() {
        let pattern = BrickPattern::default();
        let rects = pattern.outlines(1024.0, 1024.0);
        assert_eq!(rects.len(), 16 * 10 + 1);

        let first = rects[0];
        assert_eq!(first.x(), -128.0);
        assert_eq!(first.width(), 128.0);
        assert_eq!(first.height(), 64.0);

        // second row is shifted by half a brick
        let shifted = rects[10];
        assert_eq!(shifted.x(), -64.0);
        assert_eq!(shifted.y(), 64.0);

        let border = rects[rects.len() - 1];
        assert_eq!((border.x(), border.y()), (0.0, 0.0));
        assert_eq!((border.width(), border.height()), (1024.0, 1024.0));
    }

    #[test]
    fn painted_surface_is_opaque_with_cyan_mortar() {
        let pattern = BrickPattern::default();
        let mut pixmap = Pixmap::new(BRICK_SURFACE_SIZE, BRICK_SURFACE_SIZE).unwrap();
        pattern.paint(&mut pixmap);

        let inside = pixmap.pixel(64, 32).unwrap().demultiply();
        assert_eq!(
            (inside.red(), inside.green(), inside.blue(), inside.alpha()),
            (0, 0, 0, 255)
        );

        let line = pixmap.pixel(128, 32).unwrap().demultiply();
        assert_eq!(line.red(), 0);
        assert!(line.green() > 200);
        assert!(line.blue() > 200);
        assert_eq!(line.alpha(), 255);
    }
}

use tiny_skia::{
    BlendMode, Color, GradientStop, LinearGradient, Paint, Pixmap, Point, Rect, SpreadMode,
    Transform,
};

use crate::hex_color;

pub const SUN_SURFACE_SIZE: u32 = 512;

/// A horizontal band erased from the sun disc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripeBand {
    pub index: u32,
    pub y: f32,
    pub thickness: f32,
}

/// Gradient sun with stripes that slide downward and thin out as they go.
#[derive(Debug, Clone, PartialEq)]
pub struct SunStripes {
    pub count: u32,
    pub spacing: f32,
    /// Pixels per second.
    pub speed: f32,
    pub loop_range: f32,
    pub horizon: f32,
    pub max_thickness: f32,
    pub min_thickness: f32,
    pub shrink: f32,
    pub gradient: [(f32, Color); 3],
}

impl Default for SunStripes {
    fn default() -> Self {
        Self {
            count: 8,
            spacing: 60.0,
            speed: 50.0,
            loop_range: 650.0,
            horizon: 200.0,
            max_thickness: 20.0,
            min_thickness: 1.0,
            shrink: 18.0,
            gradient: [
                (0.0, hex_color(0xffff88)),
                (0.5, hex_color(0xffaa00)),
                (1.0, hex_color(0xff3388)),
            ],
        }
    }
}

impl SunStripes {
    /// Time for one stripe to travel the whole loop.
    pub fn period(&self) -> f32 {
        self.loop_range / self.speed
    }

    pub fn position(&self, index: u32, elapsed: f32) -> f32 {
        let travelled = (elapsed * self.speed).rem_euclid(self.loop_range);
        (index as f32 * self.spacing + travelled).rem_euclid(self.loop_range)
    }

    pub fn thickness(&self, y: f32) -> f32 {
        let size = SUN_SURFACE_SIZE as f32;
        (self.max_thickness - (y / size) * self.shrink)
            .clamp(self.min_thickness, self.max_thickness)
    }

    pub fn bands(&self, elapsed: f32) -> impl Iterator<Item = StripeBand> + '_ {
        (0..self.count).map(move |index| {
            let y = self.position(index, elapsed);
            StripeBand {
                index,
                y,
                thickness: self.thickness(y),
            }
        })
    }

    /// Bands below the horizon; only these are cut out of the disc.
    pub fn visible_bands(&self, elapsed: f32) -> impl Iterator<Item = StripeBand> + '_ {
        self.bands(elapsed).filter(|band| band.y > self.horizon)
    }

    pub fn paint(&self, pixmap: &mut Pixmap, elapsed: f32) {
        let width = pixmap.width() as f32;
        let height = pixmap.height() as f32;
        let Some(full) = Rect::from_xywh(0.0, 0.0, width, height) else {
            return;
        };

        let stops = self
            .gradient
            .iter()
            .map(|(offset, color)| GradientStop::new(*offset, *color))
            .collect();
        let shader = LinearGradient::new(
            Point::from_xy(0.0, 0.0),
            Point::from_xy(0.0, height),
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        );

        let mut fill = Paint::default();
        match shader {
            Some(shader) => fill.shader = shader,
            None => fill.set_color(self.gradient[0].1),
        }
        fill.blend_mode = BlendMode::Source;
        pixmap.fill_rect(full, &fill, Transform::identity(), None);

        let mut cut = Paint::default();
        cut.set_color(Color::BLACK);
        cut.blend_mode = BlendMode::DestinationOut;
        for band in self.visible_bands(elapsed) {
            if let Some(rect) = Rect::from_xywh(0.0, band.y, width, band.thickness) {
                pixmap.fill_rect(rect, &cut, Transform::identity(), None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_stay_inside_loop() {
        let sun = SunStripes::default();
        for step in 0..400 {
            let elapsed = step as f32 * 0.173;
            for band in sun.bands(elapsed) {
                assert!(band.y >= 0.0 && band.y < 650.0, "{band:?} at {elapsed}");
                let expected = (20.0 - band.y / 512.0 * 18.0).clamp(1.0, 20.0);
                assert!((band.thickness - expected).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn wraparound_is_seamless() {
        let sun = SunStripes::default();
        assert!((sun.period() - 13.0).abs() < 1e-6);
        for elapsed in [0.0_f32, 1.5, 4.25, 12.9, 30.0] {
            for index in 0..sun.count {
                let now = sun.position(index, elapsed);
                let later = sun.position(index, elapsed + sun.period());
                let diff = (now - later).abs();
                let wrapped = diff.min(650.0 - diff);
                assert!(wrapped < 1e-2, "band {index} at {elapsed}: {now} vs {later}");
            }
        }
    }

    #[test]
    fn stripes_start_at_spacing_multiples() {
        let sun = SunStripes::default();
        let positions: Vec<f32> = sun.bands(0.0).map(|band| band.y).collect();
        assert_eq!(
            positions,
            vec![0.0, 60.0, 120.0, 180.0, 240.0, 300.0, 360.0, 420.0]
        );
        assert_eq!(sun.visible_bands(0.0).count(), 4);
    }

    #[test]
    fn thickness_clamps_to_one_pixel() {
        let sun = SunStripes::default();
        assert_eq!(sun.thickness(0.0), 20.0);
        assert_eq!(sun.thickness(640.0), 1.0);
        assert!((sun.thickness(256.0) - 11.0).abs() < 1e-6);
    }

    #[test]
    fn erased_band_is_transparent() {
        let sun = SunStripes::default();
        let mut pixmap = Pixmap::new(SUN_SURFACE_SIZE, SUN_SURFACE_SIZE).unwrap();
        sun.paint(&mut pixmap, 0.0);

        // band 4 sits at y = 240 with thickness ~11.6
        assert_eq!(pixmap.pixel(100, 245).unwrap().alpha(), 0);
        // above the horizon nothing is cut
        assert_eq!(pixmap.pixel(100, 125).unwrap().alpha(), 255);
        let top = pixmap.pixel(10, 0).unwrap().demultiply();
        assert_eq!((top.red(), top.alpha()), (255, 255));
        assert!(top.green() > 240);
    }
}

use painter::GlyphSource;

use crate::assembler::AvatarScene;
use crate::clock::{BoxedTimeSource, TimeSample};

/// Receives the scene once per tick, after every mutation for that tick.
pub trait FrameSink {
    type Error;

    fn present(&mut self, scene: &AvatarScene) -> Result<(), Self::Error>;
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub sample: TimeSample,
    /// Seconds since the previous tick.
    pub delta: f64,
    pub sun_repainted: bool,
    pub name_tag_repainted: bool,
}

/// Owns the scene and advances it once per display refresh.
///
/// A tick reads the clock, scrolls the floor, repaints the dynamic
/// surfaces, spins the pyramid, settles the orbit controls and finally
/// hands the scene to the frame sink. Input handlers go through the driver
/// too, so nothing mutates the scene outside of this type.
pub struct AnimationDriver {
    scene: AvatarScene,
    clock: BoxedTimeSource,
    last_seconds: f64,
    ticks: u64,
}

impl AnimationDriver {
    pub fn new(scene: AvatarScene, clock: BoxedTimeSource) -> Self {
        Self {
            scene,
            clock,
            last_seconds: 0.0,
            ticks: 0,
        }
    }

    pub fn scene(&self) -> &AvatarScene {
        &self.scene
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs the per-tick updates and then presents the frame.
    pub fn tick<S>(&mut self, sink: &mut S) -> Result<TickReport, S::Error>
    where
        S: FrameSink + ?Sized,
    {
        let report = self.advance();
        sink.present(&self.scene)?;
        Ok(report)
    }

    /// Runs the per-tick updates without presenting.
    pub fn advance(&mut self) -> TickReport {
        let sample = self.clock.sample();
        let delta = (sample.seconds - self.last_seconds).max(0.0);
        self.last_seconds = sample.seconds;

        self.scene.scroll_floor(delta);
        let (sun_repainted, name_tag_repainted) = self.scene.repaint_dynamic(sample.seconds);
        self.scene.spin_pyramid(sample.seconds);
        self.scene.update_controls();
        self.ticks += 1;

        tracing::trace!(
            tick = self.ticks,
            seconds = sample.seconds,
            delta,
            "advanced animation"
        );

        TickReport {
            sample,
            delta,
            sun_repainted,
            name_tag_repainted,
        }
    }

    /// Sets the pixelation block size used from the next rendered frame.
    pub fn set_pixel_size(&mut self, value: u32) -> bool {
        let changed = self.scene.post_mut().set_pixel_size(value);
        if changed {
            tracing::info!(pixel_size = self.scene.post().pixel_size(), "pixel size changed");
        }
        changed
    }

    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        self.scene.camera_mut().set_viewport(width, height);
    }

    pub fn orbit(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        self.scene.controls_mut().rotate(dx, dy, viewport_height);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.scene.controls_mut().zoom(steps);
    }

    pub fn set_glyphs(&mut self, glyphs: GlyphSource) {
        self.scene.set_glyphs(glyphs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{assemble, SceneOptions};
    use crate::clock::{FixedTimeSource, SteppedTimeSource};
    use std::convert::Infallible;
    use std::f64::consts::TAU;

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<(u64, u64, f64)>,
    }

    impl FrameSink for RecordingSink {
        type Error = Infallible;

        fn present(&mut self, scene: &AvatarScene) -> Result<(), Self::Error> {
            let handles = scene.handles();
            self.frames.push((
                scene.surface(handles.sun_surface).version(),
                scene.surface(handles.name_surface).version(),
                scene.pyramid_spin(),
            ));
            Ok(())
        }
    }

    fn driver(step: f64) -> AnimationDriver {
        let scene = assemble(SceneOptions::default()).unwrap();
        AnimationDriver::new(scene, Box::new(SteppedTimeSource::new(step)))
    }

    #[test]
    fn repaint_happens_before_present() {
        let mut driver = driver(1.0 / 60.0);
        let mut sink = RecordingSink::default();

        for _ in 0..3 {
            driver.tick(&mut sink).unwrap();
        }

        assert_eq!(sink.frames.len(), 3);
        assert_eq!(sink.frames[0].0, 1);
        assert_eq!(sink.frames[2].0, 3);
        // name tag content is static: painted once on the first tick
        assert!(sink.frames.iter().all(|frame| frame.1 == 1));
        assert!((sink.frames[0].2 - 0.002).abs() < 1e-12);
    }

    #[test]
    fn pyramid_rotation_counts_ticks() {
        let mut driver = driver(1.0 / 60.0);
        let ticks = 5_000u64;
        for _ in 0..ticks {
            driver.advance();
        }
        let expected = (0.002 * ticks as f64).rem_euclid(TAU);
        assert!((driver.scene().pyramid_spin() - expected).abs() < 1e-9);

        let pyramid = driver.scene().handles().pyramid;
        let rotation = driver.scene().graph().node(pyramid).transform.rotation;
        assert!((rotation.y as f64 - expected).abs() < 1e-5);
        let elapsed = (ticks - 1) as f64 / 60.0;
        assert!((rotation.x as f64 - (elapsed * 0.3).sin() * 0.05).abs() < 1e-6);
    }

    #[test]
    fn floor_offset_tracks_elapsed_time() {
        let mut driver = driver(0.25);
        let mut last = None;
        for _ in 0..101 {
            last = Some(driver.advance());
        }
        let elapsed = last.unwrap().sample.seconds;
        assert_eq!(elapsed, 25.0);

        let expected = (-0.15 * elapsed).rem_euclid(1.0);
        let offset = driver.scene().floor_offset();
        assert!((offset - expected).abs() < 1e-9, "{offset} vs {expected}");
        assert!((0.0..1.0).contains(&offset));
    }

    #[test]
    fn first_tick_measures_from_clock_start() {
        let scene = assemble(SceneOptions::default()).unwrap();
        let mut driver = AnimationDriver::new(scene, Box::new(FixedTimeSource::new(2.0)));

        let first = driver.advance();
        assert_eq!(first.delta, 2.0);
        assert!(first.name_tag_repainted);

        let second = driver.advance();
        assert_eq!(second.delta, 0.0);
        assert!(second.sun_repainted);
        assert!(!second.name_tag_repainted);
    }

    #[test]
    fn pixel_size_change_reaches_next_frame() {
        let mut driver = driver(1.0 / 60.0);
        let bloom = driver.scene().post().bloom().clone();

        assert!(driver.set_pixel_size(7));
        assert!(!driver.set_pixel_size(7));

        struct PixelProbe(Vec<u32>);
        impl FrameSink for PixelProbe {
            type Error = Infallible;
            fn present(&mut self, scene: &AvatarScene) -> Result<(), Infallible> {
                self.0.push(scene.post().pixel_size());
                Ok(())
            }
        }

        let mut probe = PixelProbe(Vec::new());
        driver.tick(&mut probe).unwrap();
        assert_eq!(probe.0, vec![7]);
        assert_eq!(driver.scene().post().bloom(), &bloom);
    }

    #[test]
    fn glyph_change_triggers_one_name_tag_repaint() {
        let mut driver = driver(0.1);
        driver.advance();
        driver.set_glyphs(GlyphSource::Bitmap);
        assert!(driver.advance().name_tag_repainted);
        assert!(!driver.advance().name_tag_repainted);
    }

    #[test]
    fn sink_errors_propagate() {
        struct Failing;
        impl FrameSink for Failing {
            type Error = &'static str;
            fn present(&mut self, _: &AvatarScene) -> Result<(), &'static str> {
                Err("surface lost")
            }
        }

        let mut driver = driver(0.1);
        assert_eq!(driver.tick(&mut Failing).unwrap_err(), "surface lost");
        assert_eq!(driver.ticks(), 1);
    }
}

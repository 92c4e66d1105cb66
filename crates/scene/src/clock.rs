use std::time::{Duration, Instant};

/// Snapshot of the animation clock for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds since the clock started.
    pub seconds: f64,
    /// Monotonic tick counter.
    pub frame_index: u64,
}

impl TimeSample {
    /// Creates a new time sample.
    pub fn new(seconds: f64, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Where the animation driver reads elapsed time from.
///
/// The driver owns exactly one source and calls [`TimeSource::sample`] once
/// per tick. Swapping the source is how the viewer, headless stills and
/// tests share one animation path.
pub trait TimeSource: Send {
    /// Restarts the clock at zero and rewinds the frame counter.
    fn reset(&mut self);
    /// Produces the sample for the next tick. Each call advances the frame
    /// counter by one.
    fn sample(&mut self) -> TimeSample;
}

/// Owned, type-erased time source held by the animation driver.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Wall clock backed by `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.origin.elapsed().as_secs_f64(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Always reports the same timestamp; used for headless stills.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f64,
    frame: u64,
}

impl FixedTimeSource {
    /// Creates a source pinned at `time` seconds.
    pub fn new(time: f64) -> Self {
        Self { time, frame: 0 }
    }

    pub fn from_duration(at: Duration) -> Self {
        Self::new(at.as_secs_f64())
    }

    pub fn time(&self) -> f64 {
        self.time
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.time, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Advances by a constant step on every sample, starting at zero.
///
/// Sample `n` reports `n * step` seconds, so replaying a run produces the
/// same timestamps regardless of how long each frame took to render.
#[derive(Debug, Clone, Copy)]
pub struct SteppedTimeSource {
    /// Seconds added per sample.
    step: f64,
    /// Index of the next sample to hand out.
    frame: u64,
}

impl SteppedTimeSource {
    /// Creates a source that advances by `step` seconds per sample.
    pub fn new(step: f64) -> Self {
        Self { step, frame: 0 }
    }

    /// Step matching a display refreshing at `hz`.
    pub fn per_second(hz: f64) -> Self {
        Self::new(1.0 / hz)
    }
}

impl TimeSource for SteppedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.step * self.frame as f64, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

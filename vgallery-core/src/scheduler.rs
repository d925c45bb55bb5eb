use std::time::{Duration, Instant};

/// Fixed-rate frame pacing for the main loop.
pub struct FrameClock {
    frame_duration: Duration,
    last_frame: Instant,
    frame_start: Instant,
}

impl FrameClock {
    pub fn new(framerate: u32) -> Self {
        let now = Instant::now();
        Self {
            frame_duration: Duration::from_secs_f64(1.0 / framerate.max(1) as f64),
            last_frame: now,
            frame_start: now,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Mark the start of a frame and return seconds elapsed since the previous one.
    pub fn begin(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.frame_start = now;
        dt.as_secs_f32()
    }

    /// Sleep out the remainder of the frame budget. Returns how long the frame's
    /// work took, and whether it overran the budget.
    pub fn finish(&self) -> (Duration, bool) {
        let elapsed = self.frame_start.elapsed();
        if elapsed < self.frame_duration {
            spin_sleep::sleep(self.frame_duration - elapsed);
            (elapsed, false)
        } else {
            (elapsed, true)
        }
    }
}

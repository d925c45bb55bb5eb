use hdrhistogram::{CreationError, Histogram};
use log::info;
use std::time::{Duration, Instant};

/// Frame-time statistics, reported once the loop ends.
pub struct FrameStats {
    histogram: Histogram<u64>,
    started: Instant,
    overruns: u64,
}

impl FrameStats {
    pub fn new() -> Result<Self, CreationError> {
        // microseconds, up to one minute per frame
        let histogram = Histogram::new_with_bounds(1, 60_000_000, 3)?;
        Ok(Self { histogram, started: Instant::now(), overruns: 0 })
    }

    pub fn record(&mut self, work: Duration, overran: bool) {
        self.histogram.saturating_record(work.as_micros().max(1) as u64);
        if overran {
            self.overruns += 1;
        }
    }

    pub fn frames(&self) -> u64 {
        self.histogram.len()
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn fps(&self) -> f64 {
        let secs = self.started.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.frames() as f64 / secs
        } else {
            0.0
        }
    }

    pub fn report(&self) {
        if self.frames() == 0 {
            return;
        }
        info!(
            "{} frames, {:.1} fps, work p50 {}us p99 {}us max {}us, {} over budget",
            self.frames(),
            self.fps(),
            self.histogram.value_at_quantile(0.5),
            self.histogram.value_at_quantile(0.99),
            self.histogram.max(),
            self.overruns
        );
    }
}

//! Frame time management for the effect loop.

use std::time::{Duration, Instant};

/// Tracks frame timing. Either driven by the wall clock (`update`) or stepped
/// by the host with a fixed delta (`advance`), never both in the same run.
#[derive(Debug)]
pub struct Time {
    /// Time of the last wall-clock sample.
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Sample the wall clock at the start of a new frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.step(delta);
    }

    /// Step the clock by a fixed amount (headless runs, tests).
    pub fn advance(&mut self, seconds: f32) {
        self.step(Duration::from_secs_f32(seconds.max(0.0)));
    }

    fn step(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.frame_count += 1;
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get total elapsed time in seconds. This is the monotonic frame time
    /// handed to effect updates.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_elapsed_and_frames() {
        let mut time = Time::new();
        for _ in 0..60 {
            time.advance(1.0 / 60.0);
        }
        assert_eq!(time.frame_count(), 60);
        assert!((time.elapsed_seconds() - 1.0).abs() < 1e-3);
        assert!((time.delta_seconds() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn advance_ignores_negative_steps() {
        let mut time = Time::new();
        time.advance(-1.0);
        assert_eq!(time.elapsed_seconds(), 0.0);
        assert_eq!(time.frame_count(), 1);
    }
}

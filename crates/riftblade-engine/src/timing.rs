//! Simulation timing.
//!
//! Provides the fixed combat tick, wall-clock pacing for realtime runs and
//! step-cost tracking for the encounter report.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Most fixed ticks a single wall-clock frame may catch up on.
const MAX_CATCH_UP_TICKS: u32 = 10;

/// Fixed-timestep clock for the combat simulation.
#[derive(Debug)]
pub struct FrameTiming {
    /// Target ticks per second
    tick_rate: u32,
    /// Fixed tick length in milliseconds
    tick_ms: f32,
    /// Wall-clock budget per tick
    frame_budget: Duration,
    /// Time of last frame start
    last_frame: Instant,
    /// Accumulated wall-clock time not yet simulated
    accumulator_ms: f32,
    /// Maximum delta accepted per frame
    max_delta_ms: f32,
    /// Recent simulation step costs in milliseconds
    step_times: VecDeque<f32>,
    /// Maximum samples for averaging
    max_samples: usize,
    /// Ticks simulated so far
    ticks: u64,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameTiming {
    /// Create a new clock.
    ///
    /// # Arguments
    /// * `tick_rate` - Fixed simulation ticks per second
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            tick_ms: 1000.0 / tick_rate as f32,
            frame_budget: Duration::from_secs_f64(1.0 / f64::from(tick_rate)),
            last_frame: Instant::now(),
            accumulator_ms: 0.0,
            max_delta_ms: 250.0,
            step_times: VecDeque::with_capacity(240),
            max_samples: 240,
            ticks: 0,
        }
    }

    /// Target ticks per second.
    #[must_use]
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Fixed tick length in milliseconds.
    #[must_use]
    pub fn tick_ms(&self) -> f32 {
        self.tick_ms
    }

    /// Ticks simulated so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated time so far.
    #[must_use]
    pub fn simulated_ms(&self) -> f64 {
        self.ticks as f64 * f64::from(self.tick_ms)
    }

    /// Wall-clock milliseconds since the last call, clamped.
    pub fn delta_ms(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;
        dt.min(self.max_delta_ms)
    }

    /// Accumulate wall-clock time.
    /// Returns the number of fixed ticks that should be simulated.
    pub fn accumulate(&mut self, delta_ms: f32) -> u32 {
        self.accumulator_ms += delta_ms.max(0.0);
        let mut count = 0;

        while self.accumulator_ms >= self.tick_ms && count < MAX_CATCH_UP_TICKS {
            self.accumulator_ms -= self.tick_ms;
            count += 1;
        }

        // Still behind: drop the backlog instead of spiralling
        if self.accumulator_ms > self.tick_ms * 2.0 {
            self.accumulator_ms = 0.0;
        }

        count
    }

    /// Records the cost of one simulated tick.
    pub fn record_step(&mut self, cost: Duration) {
        self.ticks += 1;
        self.step_times.push_back(cost.as_secs_f32() * 1000.0);
        if self.step_times.len() > self.max_samples {
            self.step_times.pop_front();
        }
    }

    /// Average cost of recent ticks in milliseconds.
    #[must_use]
    pub fn average_step_ms(&self) -> f32 {
        if self.step_times.is_empty() {
            return 0.0;
        }
        self.step_times.iter().sum::<f32>() / self.step_times.len() as f32
    }

    /// Sleep for the remainder of the tick budget.
    pub fn sleep_remainder(&self) {
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
    }

    /// Reset timing (call after loading).
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.accumulator_ms = 0.0;
        self.step_times.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_timing_creation() {
        let timing = FrameTiming::new(50);
        assert_eq!(timing.tick_rate(), 50);
        assert!((timing.tick_ms() - 20.0).abs() < 0.001);
        assert_eq!(FrameTiming::new(0).tick_rate(), 1);
    }

    #[test]
    fn test_fixed_timestep() {
        let mut timing = FrameTiming::new(50);
        assert_eq!(timing.accumulate(45.0), 2);
        // 5 ms carried over
        assert_eq!(timing.accumulate(15.0), 1);
        assert_eq!(timing.accumulate(0.0), 0);
    }

    #[test]
    fn test_accumulate_spiral_prevention() {
        let mut timing = FrameTiming::new(60);
        let updates = timing.accumulate(1000.0);
        assert_eq!(updates, MAX_CATCH_UP_TICKS);
        assert_eq!(timing.accumulate(0.0), 0);
    }

    #[test]
    fn test_frame_timing_max_delta() {
        let mut timing = FrameTiming::new(60);
        std::thread::sleep(Duration::from_millis(300));
        assert!(timing.delta_ms() <= 250.0);
    }

    #[test]
    fn test_step_tracking() {
        let mut timing = FrameTiming::new(50);
        timing.record_step(Duration::from_millis(2));
        timing.record_step(Duration::from_millis(4));
        assert_eq!(timing.ticks(), 2);
        assert!((timing.average_step_ms() - 3.0).abs() < 0.01);
        assert!((timing.simulated_ms() - 40.0).abs() < 1e-9);

        timing.reset();
        assert_eq!(timing.average_step_ms(), 0.0);
        assert_eq!(timing.ticks(), 2);
    }
}

use std::time::{Duration, Instant};

/// Fixed-step game timer.
///
/// Real time is accumulated and handed out in whole logical steps of
/// `target` length. The caller runs one update per step returned by
/// [`StepTimer::tick`].
///
/// Measured deltas are clamped to `max_delta` so a debugger pause or a long
/// stall does not produce a burst of catch-up steps, and deltas within
/// 1/4000 s of the target are snapped to it so vsync jitter does not slowly
/// drift the accumulator.
#[derive(Debug, Clone)]
pub struct StepTimer {
    last: Instant,
    target: Duration,
    max_delta: Duration,
    snap_tolerance: Duration,
    left_over: Duration,
    elapsed: Duration,
    total: Duration,
    frame_count: u64,
    frames_this_second: u32,
    second_counter: Duration,
    frames_per_second: u32,
}

impl StepTimer {
    pub const DEFAULT_STEPS_PER_SECOND: u32 = 60;

    pub fn new() -> Self {
        Self::with_rate(Self::DEFAULT_STEPS_PER_SECOND)
    }

    pub fn with_rate(steps_per_second: u32) -> Self {
        Self {
            last: Instant::now(),
            target: Duration::from_secs(1) / steps_per_second.max(1),
            max_delta: Duration::from_millis(100),
            snap_tolerance: Duration::from_secs(1) / 4000,
            left_over: Duration::ZERO,
            elapsed: Duration::ZERO,
            total: Duration::ZERO,
            frame_count: 0,
            frames_this_second: 0,
            second_counter: Duration::ZERO,
            frames_per_second: 0,
        }
    }

    /// Measures real time since the previous tick and returns how many
    /// logical steps are due.
    pub fn tick(&mut self) -> u32 {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last);
        self.last = now;
        self.advance(delta)
    }

    /// Feeds an explicit real-time delta into the accumulator.
    pub fn advance(&mut self, delta: Duration) -> u32 {
        let mut delta = delta.min(self.max_delta);

        let drift = if delta > self.target {
            delta - self.target
        } else {
            self.target - delta
        };
        if drift < self.snap_tolerance {
            delta = self.target;
        }

        self.left_over += delta;

        let mut steps = 0;
        while self.left_over >= self.target {
            self.left_over -= self.target;
            self.elapsed = self.target;
            self.total += self.target;
            self.frame_count += 1;
            steps += 1;
        }

        self.frames_this_second += 1;
        self.second_counter += delta;
        if self.second_counter >= Duration::from_secs(1) {
            self.frames_per_second = self.frames_this_second;
            self.frames_this_second = 0;
            self.second_counter -= Duration::from_secs(1);
        }

        steps
    }

    /// Drops accumulated time, e.g. after the window was suspended.
    pub fn reset_elapsed_time(&mut self) {
        self.last = Instant::now();
        self.left_over = Duration::ZERO;
        self.frames_per_second = 0;
        self.frames_this_second = 0;
        self.second_counter = Duration::ZERO;
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn total_seconds(&self) -> f64 {
        self.total.as_secs_f64()
    }

    /// Number of logical steps taken since construction.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new()
    }
}
